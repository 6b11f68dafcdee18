//! The host editor contract
//!
//! One trait covers everything the overlay layer needs from the editor.
//! Every method is a best-effort query over the tree as it exists right
//! now: the host renders asynchronously and out of order, so `None` always
//! means "not there yet", never "permanently absent".

use crate::event::MutationBatch;
use crate::ids::{ElementId, NodeId};
use crate::schema::NodeRef;
use tokio::sync::broadcast;

/// Receiver half of the host's mutation stream.
pub type MutationReceiver = broadcast::Receiver<MutationBatch>;

/// Errors a host mutation can surface.
///
/// Queries degrade to `None`/empty instead; only mutating calls report
/// failure, and callers are expected to treat it as "skip", not abort.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The element no longer exists in the host tree
    #[error("element {0} is gone")]
    ElementGone(ElementId),

    /// The node no longer exists in the host model
    #[error("node {0} is gone")]
    NodeGone(NodeId),
}

/// The externally owned node-graph editor.
///
/// The editor owns the element tree and the node model. The overlay layer
/// only ever appends or removes its own overlay subtree and sets transient
/// attributes on host elements; it never deletes host content.
///
/// Implementations must be callable from interleaved async tasks; all
/// methods are synchronous snapshots of current tree state.
pub trait HostEditor: Send + Sync + std::fmt::Debug {
    /// Resolve a node by id against the current model.
    ///
    /// Returns a fresh snapshot every call. Callers must not cache the
    /// result long-term; the host may swap the underlying object while the
    /// id persists.
    fn resolve_node(&self, id: NodeId) -> Option<NodeRef>;

    /// The single authoritative flag selecting the rendering backend.
    /// `true` means the newer widget-per-slot backend is active.
    fn new_backend_active(&self) -> bool;

    /// Root element of a node's rendered subtree, if rendered.
    fn node_root(&self, id: NodeId) -> Option<ElementId>;

    /// The input element the legacy backend exposes directly for a slot.
    ///
    /// Only meaningful under the legacy backend, where the host hands out
    /// the element and the overlay layer walks up to a wrapper from it.
    fn legacy_input_element(&self, id: NodeId, slot_name: &str) -> Option<ElementId>;

    /// Whether an element is still connected to the document.
    fn is_connected(&self, element: ElementId) -> bool;

    /// Parent of an element.
    fn parent(&self, element: ElementId) -> Option<ElementId>;

    /// Nearest host-defined wrapper at or above an element.
    fn wrapper_of(&self, element: ElementId) -> Option<ElementId>;

    /// Whether `element` lies inside the subtree rooted at `ancestor`.
    fn contains_descendant(&self, ancestor: ElementId, element: ElementId) -> bool;

    /// Text-capable input elements inside a subtree, in document order.
    fn text_inputs_in(&self, root: ElementId) -> Vec<ElementId>;

    /// Label-ish text associated with an element: placeholder, aria-label,
    /// associated label content. Used for fuzzy slot matching.
    fn label_hints(&self, element: ElementId) -> Vec<String>;

    /// Current text value of an input element.
    fn value(&self, element: ElementId) -> Option<String>;

    /// Read an attribute off an element.
    fn attribute(&self, element: ElementId, name: &str) -> Option<String>;

    /// Set an attribute on an element.
    ///
    /// # Errors
    /// `HostError::ElementGone` if the element no longer exists.
    fn set_attribute(&self, element: ElementId, name: &str, value: &str) -> Result<(), HostError>;

    /// Remove an attribute from an element. A no-op if absent.
    fn remove_attribute(&self, element: ElementId, name: &str);

    /// Create a detached overlay root element owned by the caller.
    fn create_overlay_root(&self) -> ElementId;

    /// Create a detached child element (overlay buttons).
    fn create_child(&self) -> ElementId;

    /// Append `child` under `parent`, re-parenting if already attached.
    ///
    /// # Errors
    /// `HostError::ElementGone` if either element no longer exists.
    fn append_child(&self, parent: ElementId, child: ElementId) -> Result<(), HostError>;

    /// Remove an element (and its subtree) from the tree. A no-op if gone.
    fn remove_element(&self, element: ElementId);

    /// Subscribe to the host mutation stream.
    fn mutations(&self) -> MutationReceiver;
}
