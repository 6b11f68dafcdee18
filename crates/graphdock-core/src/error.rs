//! Error types for the attachment layer
//!
//! Everything here is recovered internally; nothing surfaces to an end
//! user. The worst visible symptom of any of these is a temporarily missing
//! overlay, healed by the next successful discovery pass.

use graphdock_host::{HostError, NodeId};

/// Attachment lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    /// Target tree state is absent; retried on the next trigger.
    #[error("node {node} slot {slot:?} is not yet renderable")]
    NotYetRenderable {
        /// Node whose slot could not be placed
        node: NodeId,
        /// Slot name
        slot: String,
    },

    /// Multiple equally plausible anchor candidates. Resolved internally by
    /// the deterministic fallback order; logged at low severity.
    #[error("ambiguous match for node {node} slot {slot:?}: {candidates} candidates")]
    AmbiguousMatch {
        /// Node being resolved
        node: NodeId,
        /// Slot name
        slot: String,
        /// Number of tied candidates
        candidates: usize,
    },

    /// The target element already carries a different attachment's claim.
    /// The new attempt aborts; the existing claim is retained.
    #[error("element already claimed by {owner}")]
    AlreadyClaimed {
        /// Key of the claim holder
        owner: String,
    },

    /// The record was destroyed while an operation was suspended.
    #[error("record {key} was destroyed mid-operation")]
    Destroyed {
        /// Key of the destroyed record
        key: String,
    },

    /// The slot is not eligible for an overlay.
    #[error("node {node} slot {slot:?} is not eligible for an overlay")]
    NotEligible {
        /// Node checked
        node: NodeId,
        /// Slot name
        slot: String,
    },

    /// The node schema does not declare the requested slot.
    #[error("node {node} has no slot at index {index}")]
    UnknownSlot {
        /// Node checked
        node: NodeId,
        /// Schema index requested
        index: usize,
    },

    /// A host mutation failed under us.
    #[error("host error: {0}")]
    Host(#[from] HostError),
}

impl AttachError {
    /// Whether the next discovery trigger may succeed where this failed.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotYetRenderable { .. } | Self::AlreadyClaimed { .. } | Self::Host(_)
        )
    }
}

/// A single cleanup callback failed during teardown.
///
/// Isolated per callback so sibling cleanups still run; logged, never
/// rethrown.
#[derive(Debug, thiserror::Error)]
#[error("cleanup {label:?} failed: {reason}")]
pub struct TeardownError {
    /// Which cleanup failed
    pub label: String,
    /// Why
    pub reason: String,
}

impl TeardownError {
    /// Create a teardown error
    #[must_use]
    pub fn new(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            reason: reason.into(),
        }
    }
}
