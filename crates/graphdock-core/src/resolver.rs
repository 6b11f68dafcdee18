//! Container resolution
//!
//! Given a node and an input slot, find the best current attachment point
//! in the host tree. Resolution is synchronous and best-effort over
//! whatever the host has rendered so far; the async layer in `discovery`
//! retries it as the tree fills in.
//!
//! The two backends need different strategies. The legacy backend hands the
//! input element out directly and we walk up to its wrapper. The widget
//! backend gives us only the node's subtree, so an ordered fallback chain
//! runs until one step succeeds: reuse a still-valid binding, positional
//! match by text-slot ordinal, normalized label match, sole-candidate
//! fallback, and finally a pending marker for lazily rendering node types.

use crate::error::AttachError;
use crate::mode::RenderMode;
use graphdock_host::{ElementId, HostEditor, NodeCategoryFlags, NodeRef};
use std::sync::Arc;

/// A resolved attachment point.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    /// Element the overlay is appended into
    pub container: ElementId,
    /// Input element the record binds to; `None` only when `pending`
    pub anchor: Option<ElementId>,
    /// Mode the resolution ran under
    pub mode: RenderMode,
    /// Slot name the anchor was matched for
    pub matched_slot: String,
    /// Category flags of the node
    pub category: NodeCategoryFlags,
    /// The node is expected to render its editor later; attach to the
    /// container now and bind the anchor on a later pass
    pub pending: bool,
}

/// Backend-aware attachment-point resolver.
#[derive(Debug, Clone)]
pub struct ContainerResolver {
    host: Arc<dyn HostEditor>,
}

impl ContainerResolver {
    /// Create a resolver over a host
    #[inline]
    #[must_use]
    pub fn new(host: Arc<dyn HostEditor>) -> Self {
        Self { host }
    }

    /// Resolve the attachment point for the slot at `slot_index`.
    ///
    /// `bound` is the record's current element, consulted first under the
    /// widget backend so a still-valid binding is never churned. Returns
    /// `None` when nothing usable is rendered yet.
    #[must_use]
    pub fn resolve(
        &self,
        node: &NodeRef,
        slot_index: usize,
        mode: RenderMode,
        bound: Option<ElementId>,
    ) -> Option<ContainerInfo> {
        match mode {
            RenderMode::BackendA => self.resolve_legacy(node, slot_index),
            RenderMode::BackendB => self.resolve_widget(node, slot_index, bound),
            RenderMode::Unknown => self
                .resolve_legacy(node, slot_index)
                .or_else(|| self.resolve_widget(node, slot_index, bound)),
        }
    }

    /// Legacy backend: the host exposes the input element, walk up to the
    /// nearest wrapper. Fails while the element is not yet connected.
    fn resolve_legacy(&self, node: &NodeRef, slot_index: usize) -> Option<ContainerInfo> {
        let slot = node.slot(slot_index)?;
        let anchor = self.host.legacy_input_element(node.id, &slot.name)?;
        if !self.host.is_connected(anchor) {
            return None;
        }
        let container = self.host.wrapper_of(anchor).unwrap_or(anchor);
        Some(ContainerInfo {
            container,
            anchor: Some(anchor),
            mode: RenderMode::BackendA,
            matched_slot: slot.name.clone(),
            category: node.category,
            pending: false,
        })
    }

    /// Widget backend: ordered fallback chain over the node subtree.
    fn resolve_widget(
        &self,
        node: &NodeRef,
        slot_index: usize,
        bound: Option<ElementId>,
    ) -> Option<ContainerInfo> {
        let slot = node.slot(slot_index)?;
        let root = self.host.node_root(node.id)?;

        // 1. Reuse an already-bound element still inside the node subtree.
        if let Some(prev) = bound {
            if self.host.is_connected(prev) && self.host.contains_descendant(root, prev) {
                return Some(self.widget_info(node, root, prev, &slot.name));
            }
        }

        let candidates = self.host.text_inputs_in(root);

        // 2. Positional match: ordinal among the node's text-capable slots.
        if let Some(ordinal) = node.text_ordinal(slot_index) {
            if let Some(&anchor) = candidates.get(ordinal) {
                return Some(self.widget_info(node, root, anchor, &slot.name));
            }
        }

        // 3. Normalized label/placeholder match.
        if let Some(anchor) = self.fuzzy_match(node, &slot.name, &candidates) {
            return Some(self.widget_info(node, root, anchor, &slot.name));
        }

        // 4. Sole-candidate fallback: one element, accept unconditionally.
        if let [only] = candidates.as_slice() {
            return Some(self.widget_info(node, root, *only, &slot.name));
        }

        // 5. Known-lazy editors: hand back the container with a pending
        // marker so the caller attaches now and binds later.
        if node.category.lazy_editor {
            return Some(ContainerInfo {
                container: root,
                anchor: None,
                mode: RenderMode::BackendB,
                matched_slot: slot.name.clone(),
                category: node.category,
                pending: true,
            });
        }

        None
    }

    fn widget_info(
        &self,
        node: &NodeRef,
        root: ElementId,
        anchor: ElementId,
        slot_name: &str,
    ) -> ContainerInfo {
        let container = self
            .host
            .wrapper_of(anchor)
            .or_else(|| self.host.parent(anchor))
            .unwrap_or(root);
        ContainerInfo {
            container,
            anchor: Some(anchor),
            mode: RenderMode::BackendB,
            matched_slot: slot_name.to_string(),
            category: node.category,
            pending: false,
        }
    }

    /// Compare the normalized slot name against each candidate's label
    /// hints. Ties are resolved deterministically by document order and
    /// logged at low severity.
    fn fuzzy_match(
        &self,
        node: &NodeRef,
        slot_name: &str,
        candidates: &[ElementId],
    ) -> Option<ElementId> {
        let wanted = normalize(slot_name);
        if wanted.is_empty() {
            return None;
        }
        let matches: Vec<ElementId> = candidates
            .iter()
            .copied()
            .filter(|&el| {
                self.host
                    .label_hints(el)
                    .iter()
                    .map(|h| normalize(h))
                    .any(|h| !h.is_empty() && (h == wanted || h.contains(&wanted) || wanted.contains(&h)))
            })
            .collect();
        if matches.len() > 1 {
            let ambiguity = AttachError::AmbiguousMatch {
                node: node.id,
                slot: slot_name.to_string(),
                candidates: matches.len(),
            };
            tracing::debug!(%ambiguity, "taking first candidate in document order");
        }
        matches.first().copied()
    }
}

/// Lowercase alphanumerics only; everything else is separator noise.
fn normalize(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
