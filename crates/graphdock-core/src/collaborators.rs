//! Collaborator contracts
//!
//! The feature side of the overlay (undo history, tag vocabulary,
//! translation) and policy hooks live behind these traits. The lifecycle
//! core invokes them only at well-defined points (bind, blur, destroy) and
//! never inspects their internal formats.

use crate::key::AttachmentKey;
use graphdock_host::{InputSlot, NodeId, NodeRef};

/// Undo/redo content storage for a slot.
pub trait HistoryStore: Send + Sync {
    /// Seed the undo baseline when a slot is first bound.
    fn init_undo_state(&self, node: NodeId, slot: &str, value: &str);

    /// Record a committed value (called on blur).
    fn add_history(&self, node: NodeId, slot: &str, value: &str);

    /// Step back. `None` when nothing to undo.
    fn undo(&self, node: NodeId, slot: &str) -> Option<String>;

    /// Step forward. `None` when nothing to redo.
    fn redo(&self, node: NodeId, slot: &str) -> Option<String>;

    /// Whether `undo` would yield content.
    fn can_undo(&self, node: NodeId, slot: &str) -> bool;

    /// Whether `redo` would yield content.
    fn can_redo(&self, node: NodeId, slot: &str) -> bool;

    /// Drop all stored content for a node. Called by per-node cleanup,
    /// deliberately not by the bulk-relocate sweep.
    fn invalidate_node(&self, node: NodeId);
}

/// Tag/translation lookup caches.
pub trait SuggestionCache: Send + Sync {
    /// Tag completions for a prefix.
    fn lookup_tags(&self, prefix: &str) -> Vec<String>;

    /// Cached translation for a text, if one exists.
    fn cached_translation(&self, text: &str) -> Option<String>;

    /// Drop cached entries for a node. Called by per-node cleanup,
    /// deliberately not by the bulk-relocate sweep.
    fn invalidate_node(&self, node: NodeId);
}

/// Eligibility check consulted before any attachment is attempted.
pub trait CapabilityCheck: Send + Sync {
    /// Whether this slot gets an overlay at all.
    fn overlay_allowed(&self, node: &NodeRef, slot: &InputSlot) -> bool;
}

/// Veto hook for automatic collapses.
///
/// The orchestrator always asks before auto-collapsing and never overrides
/// a "no" (e.g. an operation is in flight, or a menu tied to the record is
/// open).
pub trait CollapseVeto: Send + Sync {
    /// `true` keeps the overlay expanded.
    fn veto_collapse(&self, key: &AttachmentKey) -> bool;
}

/// Default eligibility: multi-line text-capable slots only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextSlotsOnly;

impl CapabilityCheck for TextSlotsOnly {
    fn overlay_allowed(&self, _node: &NodeRef, slot: &InputSlot) -> bool {
        slot.multiline
    }
}

/// Default veto: never object.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVeto;

impl CollapseVeto for NoVeto {
    fn veto_collapse(&self, _key: &AttachmentKey) -> bool {
        false
    }
}

/// History store that remembers nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHistory;

impl HistoryStore for NoopHistory {
    fn init_undo_state(&self, _node: NodeId, _slot: &str, _value: &str) {}
    fn add_history(&self, _node: NodeId, _slot: &str, _value: &str) {}
    fn undo(&self, _node: NodeId, _slot: &str) -> Option<String> {
        None
    }
    fn redo(&self, _node: NodeId, _slot: &str) -> Option<String> {
        None
    }
    fn can_undo(&self, _node: NodeId, _slot: &str) -> bool {
        false
    }
    fn can_redo(&self, _node: NodeId, _slot: &str) -> bool {
        false
    }
    fn invalidate_node(&self, _node: NodeId) {}
}

/// Suggestion cache that knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSuggestions;

impl SuggestionCache for NoopSuggestions {
    fn lookup_tags(&self, _prefix: &str) -> Vec<String> {
        Vec::new()
    }
    fn cached_translation(&self, _text: &str) -> Option<String> {
        None
    }
    fn invalidate_node(&self, _node: NodeId) {}
}
