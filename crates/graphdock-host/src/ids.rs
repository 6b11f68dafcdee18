//! Identity types shared across the host boundary
//!
//! Node ids are assigned by the editor and persist across re-renders; the
//! object behind an id may be replaced at any time, so an id is the only
//! thing worth holding on to. Element ids name physical elements in the
//! host tree and die with them.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Stable node identity assigned by the host editor.
///
/// The host may replace the underlying node object (e.g. across subgraph
/// navigation) while the id persists, so consumers must re-resolve the node
/// at point of use rather than caching a `NodeRef`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a physical element in the host tree.
///
/// Valid only while the element is connected; the host recreates elements
/// without notice, so liveness must be re-checked before every use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId(pub Ulid);

impl ElementId {
    /// Generate a fresh element id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_display() {
        assert_eq!(NodeId(42).to_string(), "42");
    }

    #[test]
    fn element_ids_are_unique() {
        assert_ne!(ElementId::new(), ElementId::new());
    }
}
