//! Mount guard
//!
//! A per-element claim flag, stored as an attribute on the host element so
//! its lifetime is tied to the element's. Without it, two discovery passes
//! triggered by rapid host events could each build a record for the same
//! physical element and permanently leak one overlay.

use crate::key::AttachmentKey;
use graphdock_host::{ElementId, HostEditor};
use std::sync::Arc;

/// Attribute carrying the owning attachment key on a claimed element.
pub const CLAIM_ATTR: &str = "data-dock-claim";

/// Claim bookkeeping over host elements.
#[derive(Debug, Clone)]
pub struct MountGuard {
    host: Arc<dyn HostEditor>,
}

impl MountGuard {
    /// Create a guard over a host
    #[inline]
    #[must_use]
    pub fn new(host: Arc<dyn HostEditor>) -> Self {
        Self { host }
    }

    /// Claim an element for a key.
    ///
    /// Fails if a different key already owns the element. Re-claiming with
    /// the owning key succeeds, so retried attachments stay idempotent.
    pub fn try_claim(&self, element: ElementId, key: &AttachmentKey) -> bool {
        let key = key.to_string();
        match self.host.attribute(element, CLAIM_ATTR) {
            Some(owner) if owner == key => true,
            Some(_) => false,
            None => self.host.set_attribute(element, CLAIM_ATTR, &key).is_ok(),
        }
    }

    /// Key currently claiming an element, if any.
    #[must_use]
    pub fn owner(&self, element: ElementId) -> Option<String> {
        self.host.attribute(element, CLAIM_ATTR)
    }

    /// Clear the claim so the element may be reclaimed after a later
    /// re-render.
    pub fn release(&self, element: ElementId) {
        self.host.remove_attribute(element, CLAIM_ATTR);
    }
}
