//! Node and input-slot schemas
//!
//! A `NodeRef` is a snapshot of what the host currently declares for a node:
//! its type name, its input slots, and category flags that influence how the
//! overlay layer treats it. Snapshots are cheap and meant to be re-taken.

use crate::ids::NodeId;
use serde::{Deserialize, Serialize};

/// A node's logical input slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSlot {
    /// Slot name as declared by the node schema. Sibling slots may share a
    /// name; disambiguation is the overlay layer's problem.
    pub name: String,
    /// Whether the slot is a multi-line text-capable input.
    pub multiline: bool,
}

impl InputSlot {
    /// Create a multi-line text slot
    #[inline]
    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            multiline: true,
        }
    }

    /// Create a single-line (non-text-capable) slot
    #[inline]
    #[must_use]
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            multiline: false,
        }
    }
}

/// Category flags the host declares per node type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCategoryFlags {
    /// The node renders its text editor lazily; an empty subtree at
    /// discovery time is expected rather than an error.
    pub lazy_editor: bool,
}

/// Snapshot of a node as the host currently declares it.
///
/// Owned by the host; the overlay layer resolves it by id at point of use
/// and never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    /// Stable node id
    pub id: NodeId,
    /// Declared node type name
    pub type_name: String,
    /// Declared input slots, in schema order
    pub slots: Vec<InputSlot>,
    /// Category flags for this node type
    pub category: NodeCategoryFlags,
}

impl NodeRef {
    /// Create a node snapshot
    #[must_use]
    pub fn new(id: NodeId, type_name: impl Into<String>) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            slots: Vec::new(),
            category: NodeCategoryFlags::default(),
        }
    }

    /// Add input slots
    #[must_use]
    pub fn with_slots(mut self, slots: Vec<InputSlot>) -> Self {
        self.slots = slots;
        self
    }

    /// Mark the node type as rendering its editor lazily
    #[must_use]
    pub fn with_lazy_editor(mut self) -> Self {
        self.category.lazy_editor = true;
        self
    }

    /// Slot at a schema index
    #[inline]
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&InputSlot> {
        self.slots.get(index)
    }

    /// Ordinal of the slot at `index` among the node's text-capable slots.
    ///
    /// Drives positional matching: the n-th text slot in the schema maps to
    /// the n-th text-capable element found in the node's subtree.
    #[must_use]
    pub fn text_ordinal(&self, index: usize) -> Option<usize> {
        if !self.slots.get(index)?.multiline {
            return None;
        }
        Some(
            self.slots[..index]
                .iter()
                .filter(|s| s.multiline)
                .count(),
        )
    }

    /// How many slots share the name of the slot at `index`
    #[must_use]
    pub fn name_arity(&self, index: usize) -> usize {
        let Some(slot) = self.slots.get(index) else {
            return 0;
        };
        self.slots.iter().filter(|s| s.name == slot.name).count()
    }
}
