//! Lifecycle orchestration
//!
//! Composes the oracle, resolver, discovery, registry, and guard into the
//! record state transitions: `Uninitialized → Positioning → Attached →
//! (Collapsed ⇄ Expanded) → Destroyed`, with full rollback on a failed
//! positioning and a distinct bulk-relocate path for host-wide re-renders.
//!
//! Attachment for a given key is not ordered against the host's own render
//! cycle, so every operation here is idempotent and state-checked: after
//! any await the world may have moved, and the destroyed flag is re-checked
//! before anything is trusted.

use crate::collaborators::{
    CapabilityCheck, CollapseVeto, HistoryStore, NoVeto, NoopHistory, NoopSuggestions,
    SuggestionCache, TextSlotsOnly,
};
use crate::config::DockConfig;
use crate::discovery::AsyncDiscovery;
use crate::error::{AttachError, TeardownError};
use crate::guard::MountGuard;
use crate::key::{ensure_slot_tag, AttachmentKey, SLOT_TAG_ATTR};
use crate::mode::{RenderModeOracle, SubscriptionId};
use crate::record::{AttachState, ButtonKind, WidgetRecord};
use crate::registry::{AttachmentRegistry, RegisterOutcome};
use crate::resolver::{ContainerInfo, ContainerResolver};
use graphdock_host::{ElementId, HostEditor, InputEvent, InputEventKind, NodeId, NodeRef};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Attribute marking an element whose input events are already wired.
pub const BOUND_ATTR: &str = "data-dock-bound";
/// Attribute marking a collapsed overlay root.
pub const COLLAPSED_ATTR: &str = "data-dock-collapsed";
/// Attribute marking overlay roots owned by this layer.
pub const OVERLAY_ATTR: &str = "data-dock-overlay";

/// Lifecycle counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DockStats {
    /// Live records right now
    pub live: usize,
    /// Successful attachments
    pub creates: u64,
    /// Create calls that converged on an existing record
    pub existing_hits: u64,
    /// Failed positionings rolled back
    pub rollbacks: u64,
    /// Successful rebinds
    pub rebinds: u64,
    /// Records torn down
    pub destroys: u64,
    /// Bulk-relocate sweeps
    pub bulk_relocates: u64,
    /// Cleanup callbacks that failed during teardown
    pub cleanup_failures: u64,
}

/// Orchestrates overlay lifecycles against one host editor.
pub struct LifecycleOrchestrator {
    host: Arc<dyn HostEditor>,
    oracle: Arc<RenderModeOracle>,
    resolver: ContainerResolver,
    discovery: AsyncDiscovery,
    registry: AttachmentRegistry,
    guard: MountGuard,
    history: Arc<dyn HistoryStore>,
    suggestions: Arc<dyn SuggestionCache>,
    capability: Arc<dyn CapabilityCheck>,
    veto: Arc<dyn CollapseVeto>,
    stats: Mutex<DockStats>,
}

impl std::fmt::Debug for LifecycleOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleOrchestrator")
            .field("registry", &self.registry.len())
            .field("stats", &*self.stats.lock())
            .finish_non_exhaustive()
    }
}

impl LifecycleOrchestrator {
    /// Create an orchestrator with default collaborators.
    #[must_use]
    pub fn new(host: Arc<dyn HostEditor>, config: DockConfig) -> Self {
        let oracle = Arc::new(RenderModeOracle::new(Arc::clone(&host), &config));
        Self {
            resolver: ContainerResolver::new(Arc::clone(&host)),
            discovery: AsyncDiscovery::new(Arc::clone(&host), config.discovery.clone()),
            registry: AttachmentRegistry::new(),
            guard: MountGuard::new(Arc::clone(&host)),
            history: Arc::new(NoopHistory),
            suggestions: Arc::new(NoopSuggestions),
            capability: Arc::new(TextSlotsOnly),
            veto: Arc::new(NoVeto),
            stats: Mutex::new(DockStats::default()),
            oracle,
            host,
        }
    }

    /// Swap in a history store
    #[must_use]
    pub fn with_history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = history;
        self
    }

    /// Swap in a suggestion cache
    #[must_use]
    pub fn with_suggestions(mut self, suggestions: Arc<dyn SuggestionCache>) -> Self {
        self.suggestions = suggestions;
        self
    }

    /// Swap in an eligibility check
    #[must_use]
    pub fn with_capability(mut self, capability: Arc<dyn CapabilityCheck>) -> Self {
        self.capability = capability;
        self
    }

    /// Swap in a collapse veto
    #[must_use]
    pub fn with_veto(mut self, veto: Arc<dyn CollapseVeto>) -> Self {
        self.veto = veto;
        self
    }

    /// Render-mode oracle driving this orchestrator.
    #[inline]
    #[must_use]
    pub fn oracle(&self) -> &Arc<RenderModeOracle> {
        &self.oracle
    }

    /// Attachment registry (read access for embedders and tests).
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &AttachmentRegistry {
        &self.registry
    }

    /// Subscribe the orchestrator to mode transitions: every confirmed
    /// transition rebinds all live records.
    pub fn watch_mode(self: Arc<Self>) -> SubscriptionId {
        let weak = Arc::downgrade(&self);
        self.oracle.subscribe(Arc::new(move |_, _| {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(this) = weak.upgrade() {
                    this.rebind_all().await;
                }
                Ok(())
            })
        }))
    }

    /// Lifecycle counters snapshot.
    #[must_use]
    pub fn stats(&self) -> DockStats {
        let mut stats = *self.stats.lock();
        stats.live = self.registry.live_records().len();
        stats
    }

    // ------------------------------------------------------------------
    // create
    // ------------------------------------------------------------------

    /// Attach an overlay to the slot at `slot_index` of a node.
    ///
    /// Idempotent: a second call for a slot that already has a live record
    /// hands that record back, including calls racing an in-flight first
    /// one. On any positioning failure the rollback is total: no registry
    /// entry, no stray overlay, no claim left behind.
    ///
    /// # Errors
    /// Retryable errors (`NotYetRenderable`, `AlreadyClaimed`) mean "try
    /// again on the next host trigger"; they are never user-facing.
    pub async fn create(
        &self,
        node_id: NodeId,
        slot_index: usize,
    ) -> Result<Arc<WidgetRecord>, AttachError> {
        let node = self
            .host
            .resolve_node(node_id)
            .ok_or(AttachError::NotYetRenderable {
                node: node_id,
                slot: format!("slot[{slot_index}]"),
            })?;
        let slot = node
            .slot(slot_index)
            .ok_or(AttachError::UnknownSlot {
                node: node_id,
                index: slot_index,
            })?
            .clone();
        if !self.capability.overlay_allowed(&node, &slot) {
            return Err(AttachError::NotEligible {
                node: node_id,
                slot: slot.name,
            });
        }

        if node.name_arity(slot_index) <= 1 {
            self.create_unique(&node, slot_index, &slot.name).await
        } else {
            self.create_disambiguated(&node, slot_index, &slot.name).await
        }
    }

    /// Common case: the slot name is unique on the node, so the key is
    /// known up front and the record can be registered before discovery,
    /// so concurrent creates converge on it and a destroy during our
    /// awaits is observable.
    async fn create_unique(
        &self,
        node: &NodeRef,
        slot_index: usize,
        slot_name: &str,
    ) -> Result<Arc<WidgetRecord>, AttachError> {
        let key = AttachmentKey::new(node.id, slot_name);
        if let Some(existing) = self.registry.get(&key) {
            self.stats.lock().existing_hits += 1;
            self.complete_pending(&existing).await;
            return Ok(existing);
        }

        let (overlay, buttons) = self.build_overlay()?;
        let record = Arc::new(WidgetRecord::new(
            key.clone(),
            node.slots.clone(),
            overlay,
            buttons,
        ));
        record.set_state(AttachState::Positioning);
        match self.registry.register(Arc::clone(&record)) {
            RegisterOutcome::Existing(existing) => {
                self.host.remove_element(overlay);
                self.stats.lock().existing_hits += 1;
                self.complete_pending(&existing).await;
                return Ok(existing);
            }
            RegisterOutcome::Inserted => {}
        }

        let mode = self.oracle.current();
        let info = self
            .discovery
            .find_with_retry(node.id, slot_index, slot_name, mode, None, &self.resolver)
            .await;

        // Suspension point behind us: the record may have been destroyed
        // by a cleanup sweep while discovery was parked.
        if record.is_destroyed() {
            self.host.remove_element(record.overlay());
            return Err(AttachError::Destroyed {
                key: key.to_string(),
            });
        }
        let Some(info) = info else {
            self.rollback(&record, "container not found");
            return Err(AttachError::NotYetRenderable {
                node: node.id,
                slot: slot_name.to_string(),
            });
        };
        self.finish_attach(record, info)
    }

    /// Sibling slots share this name: the key needs the element-bound
    /// disambiguator, so resolution runs first and registration follows.
    async fn create_disambiguated(
        &self,
        node: &NodeRef,
        slot_index: usize,
        slot_name: &str,
    ) -> Result<Arc<WidgetRecord>, AttachError> {
        let (overlay, buttons) = self.build_overlay()?;

        let mode = self.oracle.current();
        let info = self
            .discovery
            .find_with_retry(node.id, slot_index, slot_name, mode, None, &self.resolver)
            .await;
        let anchor = info.as_ref().and_then(|i| i.anchor);
        let (Some(info), Some(anchor)) = (info, anchor) else {
            self.host.remove_element(overlay);
            self.stats.lock().rollbacks += 1;
            return Err(AttachError::NotYetRenderable {
                node: node.id,
                slot: slot_name.to_string(),
            });
        };

        let tag = match ensure_slot_tag(&*self.host, anchor) {
            Ok(tag) => tag,
            Err(e) => {
                self.host.remove_element(overlay);
                self.stats.lock().rollbacks += 1;
                return Err(e);
            }
        };
        let key = AttachmentKey::disambiguated(node.id, slot_name, tag);
        if let Some(existing) = self.registry.get(&key) {
            self.host.remove_element(overlay);
            self.stats.lock().existing_hits += 1;
            return Ok(existing);
        }

        let record = Arc::new(WidgetRecord::new(
            key,
            node.slots.clone(),
            overlay,
            buttons,
        ));
        record.set_state(AttachState::Positioning);
        match self.registry.register(Arc::clone(&record)) {
            RegisterOutcome::Existing(existing) => {
                self.host.remove_element(overlay);
                self.stats.lock().existing_hits += 1;
                Ok(existing)
            }
            RegisterOutcome::Inserted => self.finish_attach(record, info),
        }
    }

    /// A record attached through the pending path has no anchor yet; each
    /// create converging on it retries binding the late-rendered editor.
    async fn complete_pending(&self, record: &Arc<WidgetRecord>) {
        if !record.is_attached() || record.bound_element().is_some() {
            return;
        }
        if let Err(e) = self.rebind(record).await {
            tracing::debug!(key = %record.key(), error = %e, "pending anchor not ready");
        }
    }

    /// Build the owned overlay subtree: a root plus one button per kind.
    fn build_overlay(
        &self,
    ) -> Result<(ElementId, HashMap<ButtonKind, ElementId>), AttachError> {
        let overlay = self.host.create_overlay_root();
        self.host.set_attribute(overlay, OVERLAY_ATTR, "1")?;
        let mut buttons = HashMap::new();
        for kind in ButtonKind::ALL {
            let button = self.host.create_child();
            self.host.append_child(overlay, button)?;
            buttons.insert(kind, button);
        }
        Ok((overlay, buttons))
    }

    /// Claim the anchor, mount the overlay, wire events. Any failure here
    /// still rolls the whole attachment back.
    fn finish_attach(
        &self,
        record: Arc<WidgetRecord>,
        info: ContainerInfo,
    ) -> Result<Arc<WidgetRecord>, AttachError> {
        if let Some(anchor) = info.anchor {
            if !self.guard.try_claim(anchor, record.key()) {
                let owner = self.guard.owner(anchor).unwrap_or_default();
                self.rollback(&record, "element claimed by another key");
                return Err(AttachError::AlreadyClaimed { owner });
            }
            record.set_bound_element(Some(anchor));
        }

        if let Err(e) = self.host.append_child(info.container, record.overlay()) {
            if let Some(anchor) = record.bound_element() {
                self.guard.release(anchor);
                record.set_bound_element(None);
            }
            self.rollback(&record, "container rejected overlay");
            return Err(e.into());
        }

        if let Some(anchor) = info.anchor {
            self.bind_input_events(&record, anchor);
            let baseline = self.host.value(anchor).unwrap_or_default();
            self.history
                .init_undo_state(record.node_id(), record.slot_name(), &baseline);
        }

        record.set_state(AttachState::Attached);
        self.stats.lock().creates += 1;
        tracing::info!(key = %record.key(), pending = info.pending, "overlay attached");
        Ok(record)
    }

    /// Undo a failed positioning: registry entry removed, partial overlay
    /// removed, record terminal. The guard is the caller's to release
    /// since only it knows whether a claim was made.
    fn rollback(&self, record: &WidgetRecord, reason: &str) {
        if record.mark_destroyed() {
            self.stats.lock().rollbacks += 1;
        }
        self.registry.remove(record.key());
        self.host.remove_element(record.overlay());
        record.set_bound_element(None);
        tracing::debug!(key = %record.key(), reason, "positioning rolled back");
    }

    /// Wire input events to an element exactly once, flagged on the
    /// element itself so a re-discovered element is never double-bound.
    fn bind_input_events(&self, record: &WidgetRecord, anchor: ElementId) {
        let key = record.key().to_string();
        if self.host.attribute(anchor, BOUND_ATTR).as_deref() == Some(key.as_str()) {
            return;
        }
        if self.host.set_attribute(anchor, BOUND_ATTR, &key).is_ok() {
            record.set_input_events_bound(true);
        }
    }

    // ------------------------------------------------------------------
    // rebind
    // ------------------------------------------------------------------

    /// Re-resolve a record's container after a mode transition or element
    /// swap, transferring the claim and event bindings and re-parenting
    /// the overlay.
    ///
    /// # Errors
    /// `NotYetRenderable` when the node's new tree is not up yet; the next
    /// trigger retries.
    pub async fn rebind(&self, record: &Arc<WidgetRecord>) -> Result<(), AttachError> {
        if record.is_destroyed() {
            return Err(AttachError::Destroyed {
                key: record.key().to_string(),
            });
        }
        if record.is_transitioning() {
            return Ok(());
        }
        record.set_transitioning(true);
        let result = self.rebind_inner(record).await;
        record.set_transitioning(false);
        result
    }

    async fn rebind_inner(&self, record: &Arc<WidgetRecord>) -> Result<(), AttachError> {
        let node = self
            .host
            .resolve_node(record.node_id())
            .ok_or(AttachError::NotYetRenderable {
                node: record.node_id(),
                slot: record.slot_name().to_string(),
            })?;
        record.update_slots(node.slots.clone());

        let mode = self.oracle.current();
        let slot_index =
            self.slot_index_for(&node, record, mode)
                .ok_or(AttachError::NotYetRenderable {
                    node: node.id,
                    slot: record.slot_name().to_string(),
                })?;

        // Drop a dead binding before resolving so the reuse step cannot
        // hand a disconnected element back.
        let bound = record
            .bound_element()
            .filter(|&el| self.host.is_connected(el));
        let info = match self.resolver.resolve(&node, slot_index, mode, bound) {
            Some(info) => info,
            None => self
                .discovery
                .find_with_retry(
                    node.id,
                    slot_index,
                    record.slot_name(),
                    mode,
                    bound,
                    &self.resolver,
                )
                .await
                .ok_or(AttachError::NotYetRenderable {
                    node: node.id,
                    slot: record.slot_name().to_string(),
                })?,
        };
        if record.is_destroyed() {
            return Err(AttachError::Destroyed {
                key: record.key().to_string(),
            });
        }

        let old = record.bound_element();
        if info.anchor != old {
            // Claim the new anchor before touching the old one: a failed
            // transfer must leave the record owning exactly what it owned.
            if let Some(anchor) = info.anchor {
                if !self.guard.try_claim(anchor, record.key()) {
                    let owner = self.guard.owner(anchor).unwrap_or_default();
                    return Err(AttachError::AlreadyClaimed { owner });
                }
            }
            if let Some(old) = old {
                self.guard.release(old);
                self.host.remove_attribute(old, BOUND_ATTR);
            }
            if let Some(anchor) = info.anchor {
                self.bind_input_events(record, anchor);
                // A recreated element lost its stored tag; re-stamp it so
                // later scans derive the same key for this record.
                if let Some(tag) = record.key().disambiguator() {
                    if self.host.attribute(anchor, SLOT_TAG_ATTR).is_none() {
                        let _ = self.host.set_attribute(anchor, SLOT_TAG_ATTR, tag);
                    }
                }
                // First binding of a pending record seeds history here,
                // matching what finish_attach does for the direct path.
                if old.is_none() {
                    let baseline = self.host.value(anchor).unwrap_or_default();
                    self.history
                        .init_undo_state(record.node_id(), record.slot_name(), &baseline);
                }
            }
            record.set_bound_element(info.anchor);
        }

        self.host.append_child(info.container, record.overlay())?;
        self.stats.lock().rebinds += 1;
        tracing::debug!(key = %record.key(), ?mode, "record rebound");
        Ok(())
    }

    /// Schema index for a record's slot. With duplicate-named siblings the
    /// element's stored tag picks the right one.
    fn slot_index_for(
        &self,
        node: &NodeRef,
        record: &WidgetRecord,
        mode: crate::mode::RenderMode,
    ) -> Option<usize> {
        let matching: Vec<usize> = node
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.name == record.slot_name())
            .map(|(i, _)| i)
            .collect();
        match (matching.as_slice(), record.key().disambiguator()) {
            ([], _) => None,
            ([only], _) => Some(*only),
            (many, None) => Some(many[0]),
            (many, Some(tag)) => {
                let tagged = many.iter().copied().find(|&idx| {
                    self.resolver
                        .resolve(node, idx, mode, record.bound_element())
                        .and_then(|i| i.anchor)
                        .and_then(|el| self.host.attribute(el, SLOT_TAG_ATTR))
                        .as_deref()
                        == Some(tag)
                });
                tagged.or_else(|| self.sibling_rank_index(node, record, many))
            }
        }
    }

    /// Stored tags died with recreated elements. Assign each sibling record
    /// a distinct index by its rank among the node's records for this name,
    /// instead of piling every twin onto the first schema index.
    fn sibling_rank_index(
        &self,
        node: &NodeRef,
        record: &WidgetRecord,
        many: &[usize],
    ) -> Option<usize> {
        let mut keys: Vec<String> = self
            .registry
            .records_for_node(node.id)
            .into_iter()
            .filter(|r| r.slot_name() == record.slot_name())
            .map(|r| r.key().to_string())
            .collect();
        keys.sort_unstable();
        let rank = keys
            .iter()
            .position(|k| k == &record.key().to_string())
            .unwrap_or(0);
        many.get(rank).copied().or(Some(many[0]))
    }

    /// Rebind every live record, skipping (and logging) individual
    /// failures so one stale record never blocks its siblings.
    pub async fn rebind_all(&self) {
        for record in self.registry.live_records() {
            if let Err(e) = self.rebind(&record).await {
                tracing::debug!(key = %record.key(), error = %e, "rebind skipped");
            }
        }
    }

    // ------------------------------------------------------------------
    // collapse / expand
    // ------------------------------------------------------------------

    /// Collapse an overlay. `automatic` collapses consult the veto
    /// predicate, and a "no" is final. Returns whether the collapse
    /// happened.
    pub fn collapse(&self, record: &WidgetRecord, automatic: bool) -> bool {
        if !record.is_attached() || record.is_collapsed() {
            return false;
        }
        if automatic && self.veto.veto_collapse(record.key()) {
            tracing::debug!(key = %record.key(), "auto-collapse vetoed");
            return false;
        }
        let _ = self
            .host
            .set_attribute(record.overlay(), COLLAPSED_ATTR, "1");
        record.set_state(AttachState::Collapsed);
        true
    }

    /// Expand a collapsed overlay.
    pub fn expand(&self, record: &WidgetRecord) {
        if !record.is_attached() {
            return;
        }
        self.host.remove_attribute(record.overlay(), COLLAPSED_ATTR);
        record.set_state(AttachState::Attached);
    }

    // ------------------------------------------------------------------
    // destroy / cleanup
    // ------------------------------------------------------------------

    /// Tear a record down, reversing `create` in strict order: overlay
    /// detached, every stored cleanup run (isolated per callback), guard
    /// released, registry entry removed, references cleared. Idempotent;
    /// repeat calls are no-ops.
    pub fn destroy(&self, record: &WidgetRecord) {
        if !record.mark_destroyed() {
            return;
        }
        self.host.remove_element(record.overlay());

        for (label, cleanup) in record.take_cleanups() {
            if let Err(reason) = cleanup() {
                let err = TeardownError::new(label, reason);
                tracing::warn!(key = %record.key(), %err, "cleanup callback failed");
                self.stats.lock().cleanup_failures += 1;
            }
        }

        if let Some(bound) = record.bound_element() {
            self.guard.release(bound);
            self.host.remove_attribute(bound, BOUND_ATTR);
        }
        self.registry.remove(record.key());
        record.set_bound_element(None);
        self.stats.lock().destroys += 1;
        tracing::info!(key = %record.key(), "overlay destroyed");
    }

    /// Ordinary per-node cleanup: destroy the node's records and
    /// invalidate collaborator caches.
    pub fn cleanup_node(&self, node: NodeId) {
        for record in self.registry.records_for_node(node) {
            self.destroy(&record);
        }
        self.history.invalidate_node(node);
        self.suggestions.invalidate_node(node);
        tracing::info!(%node, "node cleaned up");
    }

    /// Bulk-relocate sweep for a host-wide re-render (e.g. a workflow
    /// switch): destroys UI/registry state for every record but leaves
    /// collaborator caches alone: the switch is expected to recreate
    /// equivalent overlays moments later, and clearing caches would be
    /// user-visibly lossy.
    pub fn relocate_cleanup(&self) {
        let records = self.registry.live_records();
        let count = records.len();
        for record in records {
            self.destroy(&record);
        }
        self.stats.lock().bulk_relocates += 1;
        tracing::info!(count, "bulk relocate sweep");
    }

    // ------------------------------------------------------------------
    // host triggers
    // ------------------------------------------------------------------

    /// Attach overlays to every eligible slot of the given nodes. Used by
    /// the host's selection/visibility hook and by periodic rescans.
    /// Returns how many records are attached (fresh or pre-existing).
    pub async fn scan(&self, nodes: &[NodeId]) -> usize {
        let mut attached = 0;
        for &node_id in nodes {
            let Some(node) = self.host.resolve_node(node_id) else {
                continue;
            };
            for index in 0..node.slots.len() {
                match self.create(node_id, index).await {
                    Ok(_) => attached += 1,
                    Err(AttachError::NotEligible { .. }) => {}
                    Err(e) if e.is_retryable() => {
                        tracing::debug!(%node_id, index, error = %e, "scan attach deferred");
                    }
                    Err(e) => {
                        tracing::debug!(%node_id, index, error = %e, "scan attach failed");
                    }
                }
            }
        }
        attached
    }

    /// Route a host input event to the matching trigger.
    pub fn notify_event(&self, key: &AttachmentKey, event: &InputEvent) {
        match event.kind {
            InputEventKind::Input => self.notify_input(key, event.element),
            InputEventKind::Blur => self.notify_blur(key, event.element, &event.value),
        }
    }

    /// Blur on a bound (or swapped-in) element: adopt the element if the
    /// host replaced it, then commit the value to history.
    pub fn notify_blur(&self, key: &AttachmentKey, element: ElementId, value: &str) {
        let Some(record) = self.registry.get(key) else {
            return;
        };
        self.adopt_element(&record, element);
        self.history
            .add_history(record.node_id(), record.slot_name(), value);
    }

    /// Input activity on a bound (or swapped-in) element: adopt only.
    pub fn notify_input(&self, key: &AttachmentKey, element: ElementId) {
        if let Some(record) = self.registry.get(key) {
            self.adopt_element(&record, element);
        }
    }

    /// The host silently swapped the element under a record; move the
    /// binding over if the new element is live and unclaimed.
    fn adopt_element(&self, record: &Arc<WidgetRecord>, element: ElementId) {
        if record.bound_element() == Some(element) || !self.host.is_connected(element) {
            return;
        }
        if !self.guard.try_claim(element, record.key()) {
            tracing::debug!(key = %record.key(), %element, "swap adoption blocked by claim");
            return;
        }
        if let Some(old) = record.bound_element() {
            self.guard.release(old);
            self.host.remove_attribute(old, BOUND_ATTR);
        }
        self.bind_input_events(record, element);
        record.set_bound_element(Some(element));
        tracing::debug!(key = %record.key(), %element, "bound element adopted");
    }
}
