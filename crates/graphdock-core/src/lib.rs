//! graphdock-core: overlay attachment lifecycle
//!
//! Docks control overlays (history/tag/translate/expand buttons) onto
//! text-input slots of an externally owned node-graph editor. The host
//! renders asynchronously and out of order, recreates or relocates
//! elements without notice, and exposes two mutually exclusive rendering
//! backends for the same logical input; this crate owns the
//! reconciliation: discovery, claiming, registration, and lifecycle
//! state transitions for every overlay record.
//!
//! # Example
//!
//! ```rust,ignore
//! use graphdock_core::{DockConfig, LifecycleOrchestrator};
//! use std::sync::Arc;
//!
//! # async fn example(host: Arc<dyn graphdock_host::HostEditor>) {
//! let dock = Arc::new(LifecycleOrchestrator::new(host, DockConfig::new()));
//! Arc::clone(&dock).watch_mode();
//!
//! // Host selection hook fires:
//! let attached = dock.scan(&[graphdock_host::NodeId(3)]).await;
//! tracing::info!(attached, "overlays placed");
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod collaborators;
pub mod config;
pub mod discovery;
pub mod error;
pub mod guard;
pub mod key;
pub mod mode;
pub mod orchestrator;
pub mod record;
pub mod registry;
pub mod resolver;

pub use collaborators::{
    CapabilityCheck, CollapseVeto, HistoryStore, NoVeto, NoopHistory, NoopSuggestions,
    SuggestionCache, TextSlotsOnly,
};
pub use config::{DiscoveryConfig, DockConfig};
pub use discovery::{AsyncDiscovery, DiscoveryPhase};
pub use error::{AttachError, TeardownError};
pub use guard::{MountGuard, CLAIM_ATTR};
pub use key::{ensure_slot_tag, AttachmentKey, SLOT_TAG_ATTR};
pub use mode::{RenderMode, RenderModeOracle, SubscriptionId, TransitionFn, TransitionFut};
pub use orchestrator::{DockStats, LifecycleOrchestrator, BOUND_ATTR, COLLAPSED_ATTR, OVERLAY_ATTR};
pub use record::{AttachState, ButtonKind, Cleanup, WidgetRecord};
pub use registry::{AttachmentRegistry, RegisterOutcome};
pub use resolver::{ContainerInfo, ContainerResolver};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
