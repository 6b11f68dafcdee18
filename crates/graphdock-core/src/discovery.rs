//! Asynchronous discovery
//!
//! Bounded, observer-based waiting for a tree condition to become true.
//! Each attempt is an explicit little machine: `Idle` (immediate check) →
//! `Waiting` (subscribed to the host mutation stream, re-checking per
//! batch) → `Settled`, raced against a timeout that detaches the observer.
//!
//! Every await in here is a suspension point: the registry and guard state
//! may have changed by the time control returns, so callers re-check their
//! record before finishing an attachment. A timeout cancels only its own
//! attempt; `None` always means "not ready yet", never permanent failure.

use crate::config::DiscoveryConfig;
use crate::mode::RenderMode;
use crate::resolver::{ContainerInfo, ContainerResolver};
use graphdock_host::{ElementId, HostEditor, NodeId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;

/// Phase of a single discovery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryPhase {
    /// Immediate predicate check
    Idle,
    /// Subscribed to the mutation stream
    Waiting,
    /// Predicate held
    Settled,
}

/// Observer-based discovery over the host mutation stream.
#[derive(Debug, Clone)]
pub struct AsyncDiscovery {
    host: Arc<dyn HostEditor>,
    config: DiscoveryConfig,
}

impl AsyncDiscovery {
    /// Create a discovery helper
    #[inline]
    #[must_use]
    pub fn new(host: Arc<dyn HostEditor>, config: DiscoveryConfig) -> Self {
        Self { host, config }
    }

    /// Wait until `predicate` yields an element, or until `timeout`.
    ///
    /// The predicate is evaluated immediately, so the common already-exists
    /// case resolves without suspending. Otherwise it is re-evaluated on
    /// each mutation batch touching `scope` (or on every batch when no
    /// scope is given). Timeout detaches the observer and yields `None`.
    pub async fn wait_for<P>(
        &self,
        scope: Option<ElementId>,
        timeout: Duration,
        predicate: P,
    ) -> Option<ElementId>
    where
        P: Fn(&dyn HostEditor) -> Option<ElementId>,
    {
        let mut phase = DiscoveryPhase::Idle;
        if let Some(found) = predicate(&*self.host) {
            tracing::trace!(?phase, %found, "discovery settled synchronously");
            return Some(found);
        }

        let mut rx = self.host.mutations();
        phase = DiscoveryPhase::Waiting;
        let deadline = Instant::now() + timeout;

        loop {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Ok(batch)) => {
                    if !self.touches_scope(scope, &batch.touched) {
                        continue;
                    }
                    if let Some(found) = predicate(&*self.host) {
                        phase = DiscoveryPhase::Settled;
                        tracing::trace!(?phase, %found, "discovery settled");
                        return Some(found);
                    }
                }
                // Lagged: batches were dropped, re-check unconditionally.
                Ok(Err(RecvError::Lagged(_))) => {
                    if let Some(found) = predicate(&*self.host) {
                        return Some(found);
                    }
                }
                Ok(Err(RecvError::Closed)) => return predicate(&*self.host),
                Err(_) => {
                    tracing::trace!(?phase, ?scope, "discovery timed out");
                    return None;
                }
            }
        }
    }

    fn touches_scope(&self, scope: Option<ElementId>, touched: &[ElementId]) -> bool {
        let Some(root) = scope else {
            return true;
        };
        touched
            .iter()
            .any(|&t| t == root || self.host.contains_descendant(root, t))
    }

    /// Resolve a container for a slot, waiting out the host's asynchronous
    /// rendering where needed.
    ///
    /// Tries an immediate resolve, then mode-specific waits (the node's
    /// container first, then the anchor inside it), then a small bounded
    /// delayed-retry loop as a final safety net. `None` on exhaustion means
    /// "not ready yet"; the next host trigger retries discovery.
    pub async fn find_with_retry(
        &self,
        node: NodeId,
        slot_index: usize,
        slot_name: &str,
        mode: RenderMode,
        bound: Option<ElementId>,
        resolver: &ContainerResolver,
    ) -> Option<ContainerInfo> {
        let attempt = || {
            self.host
                .resolve_node(node)
                .and_then(|n| resolver.resolve(&n, slot_index, mode, bound))
        };

        if let Some(info) = attempt() {
            return Some(info);
        }

        match mode {
            RenderMode::BackendA | RenderMode::Unknown => {
                self.wait_for(None, self.config.timeout(), |h| {
                    h.legacy_input_element(node, slot_name)
                        .filter(|&el| h.is_connected(el))
                })
                .await;
            }
            RenderMode::BackendB => {
                let root = self
                    .wait_for(None, self.config.container_timeout(), |h| h.node_root(node))
                    .await;
                if let Some(root) = root {
                    self.wait_for(Some(root), self.config.timeout(), |h| {
                        let n = h.resolve_node(node)?;
                        resolver.resolve(&n, slot_index, mode, bound)?.anchor
                    })
                    .await;
                }
            }
        }
        if let Some(info) = attempt() {
            return Some(info);
        }

        for retry in 0..self.config.max_retries {
            tokio::time::sleep(self.config.retry_interval()).await;
            if let Some(info) = attempt() {
                return Some(info);
            }
            tracing::trace!(%node, slot = slot_name, retry, "delayed retry missed");
        }
        None
    }
}
