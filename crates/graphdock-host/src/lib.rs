//! graphdock-host: the boundary between the overlay layer and the editor
//!
//! The node-graph editor owns its element tree, its node model, and its
//! render cycle. This crate defines the contract the overlay core consumes:
//! node lookup by id, input-slot schemas, element tree queries, attribute
//! access, overlay mounting, the single backend flag, and a mutation
//! broadcast stream. The core never touches a concrete host directly.

#![warn(unreachable_pub)]

pub mod event;
pub mod ids;
pub mod schema;
pub mod tree;

pub use event::{InputEvent, InputEventKind, MutationBatch};
pub use ids::{ElementId, NodeId};
pub use schema::{InputSlot, NodeCategoryFlags, NodeRef};
pub use tree::{HostEditor, HostError, MutationReceiver};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
