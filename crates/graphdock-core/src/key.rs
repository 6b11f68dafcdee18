//! Attachment keys
//!
//! A key ties exactly one widget record to one logical input slot:
//! `node_id:slot_name`, plus a disambiguator suffix when sibling slots share
//! a name. The disambiguator is minted once per physical element, stored as
//! an attribute on that element, and reused on every later scan so repeated
//! discovery never forks a second registration for the same element.

use crate::error::AttachError;
use graphdock_host::{ElementId, HostEditor, NodeId};
use ulid::Ulid;

/// Attribute carrying a once-minted slot disambiguator on a host element.
pub const SLOT_TAG_ATTR: &str = "data-dock-slot-tag";

/// Composite identifier for one overlay attachment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttachmentKey {
    node: NodeId,
    slot: String,
    disambiguator: Option<String>,
}

impl AttachmentKey {
    /// Key for a uniquely named slot
    #[must_use]
    pub fn new(node: NodeId, slot: impl Into<String>) -> Self {
        Self {
            node,
            slot: slot.into(),
            disambiguator: None,
        }
    }

    /// Key refined with an element-bound disambiguator
    #[must_use]
    pub fn disambiguated(node: NodeId, slot: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            node,
            slot: slot.into(),
            disambiguator: Some(tag.into()),
        }
    }

    /// Node this key belongs to
    #[inline]
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Slot name component
    #[inline]
    #[must_use]
    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Disambiguator suffix, if any
    #[inline]
    #[must_use]
    pub fn disambiguator(&self) -> Option<&str> {
        self.disambiguator.as_deref()
    }
}

impl std::fmt::Display for AttachmentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.disambiguator {
            Some(tag) => write!(f, "{}:{}#{}", self.node, self.slot, tag),
            None => write!(f, "{}:{}", self.node, self.slot),
        }
    }
}

/// Read the disambiguator tag off an element, minting and storing one if
/// the element has none yet.
///
/// The tag lives on the element, so its lifetime matches the element's: a
/// recreated element gets a new tag, a merely relocated one keeps its tag.
///
/// # Errors
/// `AttachError::Host` if the element vanished before the tag could be
/// written.
pub fn ensure_slot_tag(host: &dyn HostEditor, element: ElementId) -> Result<String, AttachError> {
    if let Some(tag) = host.attribute(element, SLOT_TAG_ATTR) {
        return Ok(tag);
    }
    // Short suffix is enough; uniqueness only matters among siblings.
    let tag = Ulid::new().to_string()[20..].to_ascii_lowercase();
    host.set_attribute(element, SLOT_TAG_ATTR, &tag)?;
    Ok(tag)
}
