//! Render-mode oracle
//!
//! The host exposes one boolean flag selecting which of two mutually
//! exclusive rendering backends is active. The oracle caches the reading
//! with a short TTL, and serializes mode-transition notifications: a
//! transition detected while one is still being applied is queued and
//! applied immediately after, never concurrently.

use crate::config::DockConfig;
use futures::future::BoxFuture;
use graphdock_host::HostEditor;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use ulid::Ulid;

/// Which rendering backend the host is using.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Legacy backend: the host hands out input elements directly
    BackendA,
    /// Widget-per-slot backend: inputs are found inside the node subtree
    BackendB,
    /// Not yet observed
    #[default]
    Unknown,
}

impl RenderMode {
    fn from_flag(new_backend: bool) -> Self {
        if new_backend {
            Self::BackendB
        } else {
            Self::BackendA
        }
    }
}

/// Future returned by a transition callback.
pub type TransitionFut = BoxFuture<'static, Result<(), String>>;

/// A mode-transition callback: `(from, to)`.
///
/// Callbacks may be asynchronous; the oracle awaits each one before calling
/// the next. An error is logged and does not block sibling callbacks or
/// release of the transition lock.
pub type TransitionFn = Arc<dyn Fn(RenderMode, RenderMode) -> TransitionFut + Send + Sync>;

/// Handle for unsubscribing a transition callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Ulid);

#[derive(Debug, Clone, Copy)]
struct Cached {
    mode: RenderMode,
    at: Instant,
}

#[derive(Default)]
struct TransitionQueue {
    in_flight: bool,
    pending: VecDeque<(RenderMode, RenderMode)>,
}

/// Detects and broadcasts the active rendering backend.
pub struct RenderModeOracle {
    host: Arc<dyn HostEditor>,
    ttl: Duration,
    cached: Mutex<Option<Cached>>,
    /// Last mode delivered to subscribers
    applied: Mutex<RenderMode>,
    subscribers: Mutex<Vec<(SubscriptionId, TransitionFn)>>,
    queue: Mutex<TransitionQueue>,
}

impl std::fmt::Debug for RenderModeOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderModeOracle")
            .field("ttl", &self.ttl)
            .field("applied", &*self.applied.lock())
            .finish_non_exhaustive()
    }
}

impl RenderModeOracle {
    /// Create an oracle for a host.
    #[must_use]
    pub fn new(host: Arc<dyn HostEditor>, config: &DockConfig) -> Self {
        Self {
            host,
            ttl: config.mode_ttl(),
            cached: Mutex::new(None),
            applied: Mutex::new(RenderMode::Unknown),
            subscribers: Mutex::new(Vec::new()),
            queue: Mutex::new(TransitionQueue::default()),
        }
    }

    /// Read the active mode, using the cached value unless it is stale or
    /// `force_refresh` is set.
    #[must_use]
    pub fn detect(&self, force_refresh: bool) -> RenderMode {
        let mut cached = self.cached.lock();
        if !force_refresh {
            if let Some(c) = *cached {
                if c.at.elapsed() < self.ttl {
                    return c.mode;
                }
            }
        }
        let mode = RenderMode::from_flag(self.host.new_backend_active());
        *cached = Some(Cached {
            mode,
            at: Instant::now(),
        });
        mode
    }

    /// Cached read; shorthand for `detect(false)`.
    #[inline]
    #[must_use]
    pub fn current(&self) -> RenderMode {
        self.detect(false)
    }

    /// Register a transition callback.
    pub fn subscribe(&self, callback: TransitionFn) -> SubscriptionId {
        let id = SubscriptionId(Ulid::new());
        self.subscribers.lock().push((id, callback));
        id
    }

    /// Remove a transition callback. Returns `true` if it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscribers.lock();
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        subs.len() != before
    }

    /// Force a fresh reading and, if the mode changed since the last
    /// delivered transition, notify subscribers.
    ///
    /// Transitions are strictly serialized: if one is being applied when
    /// another is detected, the new one is queued and applied immediately
    /// after the in-flight one finishes.
    pub async fn refresh(&self) {
        let mode = self.detect(true);
        let from = {
            let mut applied = self.applied.lock();
            if *applied == mode {
                return;
            }
            let from = *applied;
            *applied = mode;
            from
        };
        tracing::info!(?from, to = ?mode, "render mode transition");
        self.queue.lock().pending.push_back((from, mode));
        self.drive().await;
    }

    /// Drain the transition queue. Only one driver runs at a time; callers
    /// that find a driver in flight leave their queued transition to it.
    async fn drive(&self) {
        {
            let mut q = self.queue.lock();
            if q.in_flight {
                return;
            }
            q.in_flight = true;
        }
        loop {
            // Pop and lock-release must be one critical section so a
            // transition queued after the final pop gets its own driver.
            let next = {
                let mut q = self.queue.lock();
                match q.pending.pop_front() {
                    Some(t) => t,
                    None => {
                        q.in_flight = false;
                        return;
                    }
                }
            };
            let callbacks: Vec<TransitionFn> = self
                .subscribers
                .lock()
                .iter()
                .map(|(_, cb)| Arc::clone(cb))
                .collect();
            for cb in callbacks {
                if let Err(reason) = cb(next.0, next.1).await {
                    tracing::warn!(from = ?next.0, to = ?next.1, %reason, "mode transition callback failed");
                }
            }
        }
    }
}
