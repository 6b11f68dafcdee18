//! Widget records
//!
//! One record per live attachment. Records are shared (`Arc`) between the
//! orchestrator, the registry, and in-flight discovery continuations, so
//! every mutable bit sits behind a lock and every resumption re-checks the
//! destroyed flag before trusting anything else.

use crate::key::AttachmentKey;
use graphdock_host::{ElementId, InputSlot, NodeId};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Overlay control buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonKind {
    /// Undo/redo history
    History,
    /// Tag vocabulary
    Tag,
    /// Translation
    Translate,
    /// Editor expansion
    Expand,
}

impl ButtonKind {
    /// All buttons, in overlay order
    pub const ALL: [ButtonKind; 4] = [
        ButtonKind::History,
        ButtonKind::Tag,
        ButtonKind::Translate,
        ButtonKind::Expand,
    ];
}

/// Lifecycle state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachState {
    /// Created, not yet placed
    Uninitialized,
    /// Container resolution in progress
    Positioning,
    /// Placed and live, expanded
    Attached,
    /// Placed and live, collapsed
    Collapsed,
    /// Torn down
    Destroyed,
}

/// Cleanup callback stored on a record; runs exactly once at destroy.
pub type Cleanup = Box<dyn FnOnce() -> Result<(), String> + Send>;

#[derive(Debug, Default)]
struct Flags {
    transitioning: bool,
    input_events_bound: bool,
}

/// A live overlay attachment.
pub struct WidgetRecord {
    key: AttachmentKey,
    node_id: NodeId,
    slot_name: String,
    /// Last-known-good slot schema, refreshed on rebind
    slots: Mutex<Vec<InputSlot>>,
    /// Owned overlay root element
    overlay: ElementId,
    /// Overlay buttons by kind
    buttons: HashMap<ButtonKind, ElementId>,
    /// Host element this record is bound to; re-resolved on rebind and
    /// re-validated for liveness before every use
    bound: Mutex<Option<ElementId>>,
    state: Mutex<AttachState>,
    flags: Mutex<Flags>,
    cleanups: Mutex<Vec<(String, Cleanup)>>,
}

impl std::fmt::Debug for WidgetRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetRecord")
            .field("key", &self.key)
            .field("state", &*self.state.lock())
            .field("bound", &*self.bound.lock())
            .finish_non_exhaustive()
    }
}

impl WidgetRecord {
    /// Create a record in the `Uninitialized` state.
    #[must_use]
    pub fn new(
        key: AttachmentKey,
        slots: Vec<InputSlot>,
        overlay: ElementId,
        buttons: HashMap<ButtonKind, ElementId>,
    ) -> Self {
        let node_id = key.node();
        let slot_name = key.slot().to_string();
        Self {
            key,
            node_id,
            slot_name,
            slots: Mutex::new(slots),
            overlay,
            buttons,
            bound: Mutex::new(None),
            state: Mutex::new(AttachState::Uninitialized),
            flags: Mutex::new(Flags::default()),
            cleanups: Mutex::new(Vec::new()),
        }
    }

    /// Attachment key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &AttachmentKey {
        &self.key
    }

    /// Owning node id
    #[inline]
    #[must_use]
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Slot name
    #[inline]
    #[must_use]
    pub fn slot_name(&self) -> &str {
        &self.slot_name
    }

    /// Overlay root element
    #[inline]
    #[must_use]
    pub fn overlay(&self) -> ElementId {
        self.overlay
    }

    /// Overlay button element by kind
    #[inline]
    #[must_use]
    pub fn button(&self, kind: ButtonKind) -> Option<ElementId> {
        self.buttons.get(&kind).copied()
    }

    /// Current bound host element, if any
    #[inline]
    #[must_use]
    pub fn bound_element(&self) -> Option<ElementId> {
        *self.bound.lock()
    }

    /// Update the bound host element
    pub fn set_bound_element(&self, element: Option<ElementId>) {
        *self.bound.lock() = element;
    }

    /// Last-known-good slot schema
    #[must_use]
    pub fn slots(&self) -> Vec<InputSlot> {
        self.slots.lock().clone()
    }

    /// Refresh the last-known-good slot schema
    pub fn update_slots(&self, slots: Vec<InputSlot>) {
        *self.slots.lock() = slots;
    }

    /// Current lifecycle state
    #[inline]
    #[must_use]
    pub fn state(&self) -> AttachState {
        *self.state.lock()
    }

    /// Move to a new lifecycle state. No-op once destroyed.
    pub fn set_state(&self, state: AttachState) {
        let mut guard = self.state.lock();
        if *guard != AttachState::Destroyed {
            *guard = state;
        }
    }

    /// Whether the record has been torn down.
    #[inline]
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        *self.state.lock() == AttachState::Destroyed
    }

    /// Whether the record is placed and live.
    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        matches!(
            *self.state.lock(),
            AttachState::Attached | AttachState::Collapsed
        )
    }

    /// Whether the overlay is currently collapsed.
    #[inline]
    #[must_use]
    pub fn is_collapsed(&self) -> bool {
        *self.state.lock() == AttachState::Collapsed
    }

    /// Mark the record destroyed. Returns `false` if it already was, so the
    /// caller runs teardown exactly once.
    pub fn mark_destroyed(&self) -> bool {
        let mut guard = self.state.lock();
        if *guard == AttachState::Destroyed {
            return false;
        }
        *guard = AttachState::Destroyed;
        true
    }

    /// Whether a rebind is in flight for this record.
    #[inline]
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.flags.lock().transitioning
    }

    /// Set or clear the rebind-in-flight flag.
    pub fn set_transitioning(&self, value: bool) {
        self.flags.lock().transitioning = value;
    }

    /// Whether input events have been wired to the bound element.
    #[inline]
    #[must_use]
    pub fn input_events_bound(&self) -> bool {
        self.flags.lock().input_events_bound
    }

    /// Record that input events are wired.
    pub fn set_input_events_bound(&self, value: bool) {
        self.flags.lock().input_events_bound = value;
    }

    /// Store a cleanup callback to run at destroy.
    pub fn push_cleanup(&self, label: impl Into<String>, cleanup: Cleanup) {
        self.cleanups.lock().push((label.into(), cleanup));
    }

    /// Take all stored cleanups. Subsequent calls return an empty list, so
    /// each callback can only ever run once.
    #[must_use]
    pub fn take_cleanups(&self) -> Vec<(String, Cleanup)> {
        std::mem::take(&mut *self.cleanups.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> WidgetRecord {
        WidgetRecord::new(
            AttachmentKey::new(NodeId(1), "text"),
            vec![InputSlot::text("text")],
            ElementId::new(),
            HashMap::new(),
        )
    }

    #[test]
    fn state_transitions() {
        let r = record();
        assert_eq!(r.state(), AttachState::Uninitialized);
        r.set_state(AttachState::Positioning);
        r.set_state(AttachState::Attached);
        assert!(r.is_attached());
        assert!(!r.is_collapsed());
        r.set_state(AttachState::Collapsed);
        assert!(r.is_attached());
        assert!(r.is_collapsed());
    }

    #[test]
    fn destroyed_is_terminal() {
        let r = record();
        assert!(r.mark_destroyed());
        assert!(!r.mark_destroyed());
        r.set_state(AttachState::Attached);
        assert!(r.is_destroyed());
    }

    #[test]
    fn cleanups_drain_once() {
        let r = record();
        r.push_cleanup("a", Box::new(|| Ok(())));
        r.push_cleanup("b", Box::new(|| Err("boom".into())));
        assert_eq!(r.take_cleanups().len(), 2);
        assert!(r.take_cleanups().is_empty());
    }
}
