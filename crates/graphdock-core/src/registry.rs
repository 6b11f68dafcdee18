//! Attachment registry
//!
//! Canonical map of attachment key to live widget record. The registry is
//! an owned value injected into the orchestrator, with an explicit
//! lifecycle; it enforces at most one non-destroyed record per key.

use crate::key::AttachmentKey;
use crate::record::WidgetRecord;
use dashmap::DashMap;
use std::sync::Arc;

/// Outcome of a `register` call.
#[derive(Debug)]
pub enum RegisterOutcome {
    /// The record now owns the key.
    Inserted,
    /// A live record already owned the key; the caller's record was not
    /// stored and the existing one is returned.
    Existing(Arc<WidgetRecord>),
}

/// Key → live record map.
#[derive(Debug, Default)]
pub struct AttachmentRegistry {
    records: DashMap<AttachmentKey, Arc<WidgetRecord>>,
}

impl AttachmentRegistry {
    /// Create an empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record under its key.
    ///
    /// If a non-destroyed record already holds the key this is a no-op that
    /// hands back the existing record. A destroyed leftover is replaced.
    pub fn register(&self, record: Arc<WidgetRecord>) -> RegisterOutcome {
        let entry = self.records.entry(record.key().clone());
        match entry {
            dashmap::Entry::Occupied(mut occupied) => {
                if occupied.get().is_destroyed() {
                    occupied.insert(record);
                    RegisterOutcome::Inserted
                } else {
                    RegisterOutcome::Existing(Arc::clone(occupied.get()))
                }
            }
            dashmap::Entry::Vacant(vacant) => {
                vacant.insert(record);
                RegisterOutcome::Inserted
            }
        }
    }

    /// Live record for a key, if any.
    #[must_use]
    pub fn get(&self, key: &AttachmentKey) -> Option<Arc<WidgetRecord>> {
        self.records
            .get(key)
            .map(|r| Arc::clone(r.value()))
            .filter(|r| !r.is_destroyed())
    }

    /// Whether a live record holds the key.
    #[inline]
    #[must_use]
    pub fn has(&self, key: &AttachmentKey) -> bool {
        self.get(key).is_some()
    }

    /// Remove the entry for a key.
    pub fn remove(&self, key: &AttachmentKey) -> Option<Arc<WidgetRecord>> {
        self.records.remove(key).map(|(_, r)| r)
    }

    /// Snapshot of all live records.
    #[must_use]
    pub fn live_records(&self) -> Vec<Arc<WidgetRecord>> {
        self.records
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .filter(|r| !r.is_destroyed())
            .collect()
    }

    /// Snapshot of live records bound to one node.
    #[must_use]
    pub fn records_for_node(&self, node: graphdock_host::NodeId) -> Vec<Arc<WidgetRecord>> {
        self.live_records()
            .into_iter()
            .filter(|r| r.node_id() == node)
            .collect()
    }

    /// Number of entries, destroyed leftovers included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry holds no entries at all.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphdock_host::{ElementId, InputSlot, NodeId};
    use std::collections::HashMap;

    fn record(key: AttachmentKey) -> Arc<WidgetRecord> {
        Arc::new(WidgetRecord::new(
            key,
            vec![InputSlot::text("text")],
            ElementId::new(),
            HashMap::new(),
        ))
    }

    #[test]
    fn register_enforces_at_most_one() {
        let registry = AttachmentRegistry::new();
        let key = AttachmentKey::new(NodeId(1), "text");

        let first = record(key.clone());
        assert!(matches!(
            registry.register(Arc::clone(&first)),
            RegisterOutcome::Inserted
        ));

        let second = record(key.clone());
        match registry.register(second) {
            RegisterOutcome::Existing(existing) => {
                assert!(Arc::ptr_eq(&existing, &first));
            }
            RegisterOutcome::Inserted => panic!("duplicate key must not insert"),
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn destroyed_leftover_is_replaced() {
        let registry = AttachmentRegistry::new();
        let key = AttachmentKey::new(NodeId(1), "text");

        let stale = record(key.clone());
        registry.register(Arc::clone(&stale));
        stale.mark_destroyed();
        assert!(registry.get(&key).is_none());

        let fresh = record(key.clone());
        assert!(matches!(
            registry.register(Arc::clone(&fresh)),
            RegisterOutcome::Inserted
        ));
        let got = registry.get(&key).expect("fresh record is live");
        assert!(Arc::ptr_eq(&got, &fresh));
    }

    #[test]
    fn node_scoped_snapshot() {
        let registry = AttachmentRegistry::new();
        registry.register(record(AttachmentKey::new(NodeId(1), "text")));
        registry.register(record(AttachmentKey::new(NodeId(1), "prompt")));
        registry.register(record(AttachmentKey::new(NodeId(2), "text")));

        assert_eq!(registry.records_for_node(NodeId(1)).len(), 2);
        assert_eq!(registry.records_for_node(NodeId(2)).len(), 1);
        assert_eq!(registry.live_records().len(), 3);
    }

    #[test]
    fn remove_clears_entry() {
        let registry = AttachmentRegistry::new();
        let key = AttachmentKey::new(NodeId(1), "text");
        registry.register(record(key.clone()));
        assert!(registry.has(&key));
        assert!(registry.remove(&key).is_some());
        assert!(!registry.has(&key));
        assert!(registry.is_empty());
    }
}
