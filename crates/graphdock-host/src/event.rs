//! Events crossing the host boundary

use crate::ids::ElementId;

/// A batch of subtree changes reported by the host.
///
/// The host coalesces mutations however it likes; consumers only learn which
/// elements were touched and re-evaluate their own predicates against the
/// current tree. A batch carries no before/after detail on purpose.
#[derive(Debug, Clone, Default)]
pub struct MutationBatch {
    /// Elements added, removed, relocated, or re-attributed in this batch
    pub touched: Vec<ElementId>,
}

impl MutationBatch {
    /// Batch touching a single element
    #[inline]
    #[must_use]
    pub fn single(element: ElementId) -> Self {
        Self {
            touched: vec![element],
        }
    }
}

/// Kind of input activity on a bound element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEventKind {
    /// Content changed
    Input,
    /// Focus left the element
    Blur,
}

/// Input activity the host forwards for a bound element.
#[derive(Debug, Clone)]
pub struct InputEvent {
    /// Element the event fired on
    pub element: ElementId,
    /// Event kind
    pub kind: InputEventKind,
    /// Current element value
    pub value: String,
}
