//! Testing utilities for the graphdock workspace
//!
//! `SimHost` is an in-memory host editor: a real element tree with
//! parent/child links, attributes, label hints, a legacy-input table, and
//! a mutation broadcast stream, all driveable from tests mid-wait. The
//! recording collaborators capture every call so scenarios can assert
//! what the lifecycle layer did and did not invoke.

use graphdock_core::collaborators::{CollapseVeto, HistoryStore, SuggestionCache};
use graphdock_core::key::AttachmentKey;
use graphdock_host::{
    ElementId, HostEditor, HostError, InputSlot, MutationBatch, NodeId, NodeRef,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------
// SimHost
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElemKind {
    Plain,
    Wrapper,
    TextInput,
    Overlay,
}

#[derive(Debug, Clone)]
struct ElementData {
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    attrs: HashMap<String, String>,
    hints: Vec<String>,
    value: String,
    kind: ElemKind,
    /// Whether a parentless element counts as document-attached.
    rooted: bool,
}

impl ElementData {
    fn new(kind: ElemKind, rooted: bool) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            attrs: HashMap::new(),
            hints: Vec::new(),
            value: String::new(),
            kind,
            rooted,
        }
    }
}

#[derive(Debug, Clone)]
struct SimNode {
    schema: NodeRef,
    root: Option<ElementId>,
    legacy: HashMap<String, ElementId>,
}

#[derive(Debug, Default)]
struct World {
    elements: HashMap<ElementId, ElementData>,
    nodes: HashMap<NodeId, SimNode>,
    new_backend: bool,
}

/// In-memory host editor for tests.
#[derive(Debug)]
pub struct SimHost {
    world: Mutex<World>,
    mutations: broadcast::Sender<MutationBatch>,
}

impl Default for SimHost {
    fn default() -> Self {
        let (mutations, _) = broadcast::channel(256);
        Self {
            world: Mutex::new(World::default()),
            mutations,
        }
    }
}

impl SimHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn broadcast(&self, touched: Vec<ElementId>) {
        let batch = match touched.as_slice() {
            [one] => MutationBatch::single(*one),
            _ => MutationBatch { touched },
        };
        let _ = self.mutations.send(batch);
    }

    fn insert(&self, kind: ElemKind, rooted: bool) -> ElementId {
        let id = ElementId::new();
        self.world
            .lock()
            .elements
            .insert(id, ElementData::new(kind, rooted));
        id
    }

    /// Select which backend `new_backend_active` reports.
    pub fn set_new_backend(&self, active: bool) {
        self.world.lock().new_backend = active;
    }

    /// A plain, document-attached element.
    pub fn make_element(&self) -> ElementId {
        let id = self.insert(ElemKind::Plain, true);
        self.broadcast(vec![id]);
        id
    }

    /// Declare a node in the host model (no tree yet).
    pub fn define_node(&self, schema: NodeRef) {
        let id = schema.id;
        self.world.lock().nodes.insert(
            id,
            SimNode {
                schema,
                root: None,
                legacy: HashMap::new(),
            },
        );
    }

    /// Render a node's widget-backend subtree root, without any inputs.
    pub fn render_widget_shell(&self, node: NodeId) -> ElementId {
        let root = self.insert(ElemKind::Plain, true);
        {
            let mut world = self.world.lock();
            let sim = world.nodes.get_mut(&node).expect("node not defined");
            sim.root = Some(root);
        }
        self.broadcast(vec![root]);
        root
    }

    /// Append a text-capable input inside the node's widget subtree.
    pub fn add_text_input(&self, node: NodeId, hints: &[&str]) -> ElementId {
        let input = self.insert(ElemKind::TextInput, false);
        let root = {
            let mut world = self.world.lock();
            let root = world
                .nodes
                .get(&node)
                .and_then(|n| n.root)
                .expect("widget shell not rendered");
            let data = world.elements.get_mut(&input).expect("fresh element");
            data.parent = Some(root);
            data.hints = hints.iter().map(|h| (*h).to_string()).collect();
            world
                .elements
                .get_mut(&root)
                .expect("root exists")
                .children
                .push(input);
            root
        };
        self.broadcast(vec![root, input]);
        input
    }

    /// Shell plus one input per text slot, hinted with the slot's name.
    pub fn render_widget_node(&self, node: NodeId) -> ElementId {
        let schema = self
            .world
            .lock()
            .nodes
            .get(&node)
            .map(|n| n.schema.clone())
            .expect("node not defined");
        let root = self.render_widget_shell(node);
        for slot in schema.slots.iter().filter(|s| s.multiline) {
            self.add_text_input(node, &[slot.name.as_str()]);
        }
        root
    }

    /// Render a legacy-backend input: wrapper with the input inside,
    /// registered in the legacy-input table.
    pub fn render_legacy_input(&self, node: NodeId, slot_name: &str) -> ElementId {
        let wrapper = self.insert(ElemKind::Wrapper, true);
        let input = self.insert(ElemKind::TextInput, false);
        {
            let mut world = self.world.lock();
            let data = world.elements.get_mut(&input).expect("fresh element");
            data.parent = Some(wrapper);
            world
                .elements
                .get_mut(&wrapper)
                .expect("fresh wrapper")
                .children
                .push(input);
            let sim = world.nodes.get_mut(&node).expect("node not defined");
            sim.legacy.insert(slot_name.to_string(), input);
        }
        self.broadcast(vec![wrapper, input]);
        input
    }

    /// Tear down everything the host rendered for a node.
    pub fn derender_node(&self, node: NodeId) {
        let (root, legacy): (Option<ElementId>, Vec<ElementId>) = {
            let mut world = self.world.lock();
            let Some(sim) = world.nodes.get_mut(&node) else {
                return;
            };
            let root = sim.root.take();
            let legacy = sim.legacy.drain().map(|(_, el)| el).collect();
            (root, legacy)
        };
        if let Some(root) = root {
            self.remove_element(root);
        }
        for el in legacy {
            if let Some(wrapper) = self.parent(el) {
                self.remove_element(wrapper);
            } else {
                self.remove_element(el);
            }
        }
    }

    /// Set an input's value.
    pub fn set_value(&self, element: ElementId, value: &str) {
        if let Some(data) = self.world.lock().elements.get_mut(&element) {
            data.value = value.to_string();
        }
        self.broadcast(vec![element]);
    }

    /// Whether the element exists at all (connected or not).
    #[must_use]
    pub fn element_exists(&self, element: ElementId) -> bool {
        self.world.lock().elements.contains_key(&element)
    }

    /// All overlay root elements currently in existence.
    #[must_use]
    pub fn overlay_elements(&self) -> Vec<ElementId> {
        self.world
            .lock()
            .elements
            .iter()
            .filter(|(_, d)| d.kind == ElemKind::Overlay)
            .map(|(id, _)| *id)
            .collect()
    }

    fn top_ancestor(world: &World, mut el: ElementId) -> Option<ElementId> {
        loop {
            let data = world.elements.get(&el)?;
            match data.parent {
                Some(parent) => el = parent,
                None => return Some(el),
            }
        }
    }

    fn collect_subtree(world: &World, el: ElementId, out: &mut Vec<ElementId>) {
        out.push(el);
        if let Some(data) = world.elements.get(&el) {
            for &child in &data.children {
                Self::collect_subtree(world, child, out);
            }
        }
    }
}

impl HostEditor for SimHost {
    fn resolve_node(&self, id: NodeId) -> Option<NodeRef> {
        self.world.lock().nodes.get(&id).map(|n| n.schema.clone())
    }

    fn new_backend_active(&self) -> bool {
        self.world.lock().new_backend
    }

    fn node_root(&self, id: NodeId) -> Option<ElementId> {
        let world = self.world.lock();
        world
            .nodes
            .get(&id)?
            .root
            .filter(|el| world.elements.contains_key(el))
    }

    fn legacy_input_element(&self, id: NodeId, slot_name: &str) -> Option<ElementId> {
        let world = self.world.lock();
        world
            .nodes
            .get(&id)?
            .legacy
            .get(slot_name)
            .copied()
            .filter(|el| world.elements.contains_key(el))
    }

    fn is_connected(&self, element: ElementId) -> bool {
        let world = self.world.lock();
        Self::top_ancestor(&world, element)
            .and_then(|top| world.elements.get(&top))
            .is_some_and(|d| d.rooted)
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.world.lock().elements.get(&element)?.parent
    }

    fn wrapper_of(&self, element: ElementId) -> Option<ElementId> {
        let world = self.world.lock();
        let mut current = Some(element);
        while let Some(el) = current {
            let data = world.elements.get(&el)?;
            if data.kind == ElemKind::Wrapper {
                return Some(el);
            }
            current = data.parent;
        }
        None
    }

    fn contains_descendant(&self, ancestor: ElementId, element: ElementId) -> bool {
        let world = self.world.lock();
        let mut current = world.elements.get(&element).and_then(|d| d.parent);
        while let Some(el) = current {
            if el == ancestor {
                return true;
            }
            current = world.elements.get(&el).and_then(|d| d.parent);
        }
        false
    }

    fn text_inputs_in(&self, root: ElementId) -> Vec<ElementId> {
        let world = self.world.lock();
        let mut subtree = Vec::new();
        Self::collect_subtree(&world, root, &mut subtree);
        subtree
            .into_iter()
            .filter(|el| {
                world
                    .elements
                    .get(el)
                    .is_some_and(|d| d.kind == ElemKind::TextInput)
            })
            .collect()
    }

    fn label_hints(&self, element: ElementId) -> Vec<String> {
        self.world
            .lock()
            .elements
            .get(&element)
            .map(|d| d.hints.clone())
            .unwrap_or_default()
    }

    fn value(&self, element: ElementId) -> Option<String> {
        let world = self.world.lock();
        let data = world.elements.get(&element)?;
        (data.kind == ElemKind::TextInput).then(|| data.value.clone())
    }

    fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        self.world
            .lock()
            .elements
            .get(&element)?
            .attrs
            .get(name)
            .cloned()
    }

    fn set_attribute(&self, element: ElementId, name: &str, value: &str) -> Result<(), HostError> {
        let mut world = self.world.lock();
        let data = world
            .elements
            .get_mut(&element)
            .ok_or(HostError::ElementGone(element))?;
        data.attrs.insert(name.to_string(), value.to_string());
        drop(world);
        self.broadcast(vec![element]);
        Ok(())
    }

    fn remove_attribute(&self, element: ElementId, name: &str) {
        let mut world = self.world.lock();
        if let Some(data) = world.elements.get_mut(&element) {
            data.attrs.remove(name);
        }
    }

    fn create_overlay_root(&self) -> ElementId {
        self.insert(ElemKind::Overlay, false)
    }

    fn create_child(&self) -> ElementId {
        self.insert(ElemKind::Plain, false)
    }

    fn append_child(&self, parent: ElementId, child: ElementId) -> Result<(), HostError> {
        {
            let mut world = self.world.lock();
            if !world.elements.contains_key(&parent) {
                return Err(HostError::ElementGone(parent));
            }
            if !world.elements.contains_key(&child) {
                return Err(HostError::ElementGone(child));
            }
            let old_parent = world.elements.get(&child).and_then(|d| d.parent);
            if let Some(old) = old_parent {
                if let Some(data) = world.elements.get_mut(&old) {
                    data.children.retain(|&c| c != child);
                }
            }
            world.elements.get_mut(&child).expect("checked").parent = Some(parent);
            let parent_data = world.elements.get_mut(&parent).expect("checked");
            if !parent_data.children.contains(&child) {
                parent_data.children.push(child);
            }
        }
        self.broadcast(vec![parent, child]);
        Ok(())
    }

    fn remove_element(&self, element: ElementId) {
        let touched = {
            let mut world = self.world.lock();
            if !world.elements.contains_key(&element) {
                return;
            }
            let mut subtree = Vec::new();
            Self::collect_subtree(&world, element, &mut subtree);
            let parent = world.elements.get(&element).and_then(|d| d.parent);
            if let Some(parent) = parent {
                if let Some(data) = world.elements.get_mut(&parent) {
                    data.children.retain(|&c| c != element);
                }
            }
            for el in &subtree {
                world.elements.remove(el);
            }
            // Stale host references die with the elements.
            for sim in world.nodes.values_mut() {
                if sim.root.is_some_and(|r| subtree.contains(&r)) {
                    sim.root = None;
                }
                sim.legacy.retain(|_, el| !subtree.contains(el));
            }
            let mut touched = subtree;
            touched.extend(parent);
            touched
        };
        self.broadcast(touched);
    }

    fn mutations(&self) -> broadcast::Receiver<MutationBatch> {
        self.mutations.subscribe()
    }
}

// ---------------------------------------------------------------------
// Recording collaborators
// ---------------------------------------------------------------------

#[derive(Debug, Default)]
struct SlotHistory {
    past: Vec<String>,
    future: Vec<String>,
}

/// History store that records every call and keeps working undo stacks.
#[derive(Debug, Default)]
pub struct RecordingHistory {
    slots: Mutex<HashMap<(NodeId, String), SlotHistory>>,
    inits: Mutex<Vec<(NodeId, String, String)>>,
    invalidated: Mutex<Vec<NodeId>>,
}

impl RecordingHistory {
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn inits(&self) -> Vec<(NodeId, String, String)> {
        self.inits.lock().clone()
    }

    #[must_use]
    pub fn invalidated(&self) -> Vec<NodeId> {
        self.invalidated.lock().clone()
    }

    #[must_use]
    pub fn entries(&self, node: NodeId, slot: &str) -> Vec<String> {
        self.slots
            .lock()
            .get(&(node, slot.to_string()))
            .map(|s| s.past.clone())
            .unwrap_or_default()
    }
}

impl HistoryStore for RecordingHistory {
    fn init_undo_state(&self, node: NodeId, slot: &str, value: &str) {
        self.inits
            .lock()
            .push((node, slot.to_string(), value.to_string()));
        self.slots
            .lock()
            .entry((node, slot.to_string()))
            .or_default();
    }

    fn add_history(&self, node: NodeId, slot: &str, value: &str) {
        let mut slots = self.slots.lock();
        let entry = slots.entry((node, slot.to_string())).or_default();
        entry.past.push(value.to_string());
        entry.future.clear();
    }

    fn undo(&self, node: NodeId, slot: &str) -> Option<String> {
        let mut slots = self.slots.lock();
        let entry = slots.get_mut(&(node, slot.to_string()))?;
        let value = entry.past.pop()?;
        entry.future.push(value);
        entry.past.last().cloned().or_else(|| Some(String::new()))
    }

    fn redo(&self, node: NodeId, slot: &str) -> Option<String> {
        let mut slots = self.slots.lock();
        let entry = slots.get_mut(&(node, slot.to_string()))?;
        let value = entry.future.pop()?;
        entry.past.push(value.clone());
        Some(value)
    }

    fn can_undo(&self, node: NodeId, slot: &str) -> bool {
        self.slots
            .lock()
            .get(&(node, slot.to_string()))
            .is_some_and(|s| !s.past.is_empty())
    }

    fn can_redo(&self, node: NodeId, slot: &str) -> bool {
        self.slots
            .lock()
            .get(&(node, slot.to_string()))
            .is_some_and(|s| !s.future.is_empty())
    }

    fn invalidate_node(&self, node: NodeId) {
        self.invalidated.lock().push(node);
        self.slots.lock().retain(|(n, _), _| *n != node);
    }
}

/// Suggestion cache that records invalidations.
#[derive(Debug, Default)]
pub struct RecordingSuggestions {
    invalidated: Mutex<Vec<NodeId>>,
}

impl RecordingSuggestions {
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn invalidated(&self) -> Vec<NodeId> {
        self.invalidated.lock().clone()
    }
}

impl SuggestionCache for RecordingSuggestions {
    fn lookup_tags(&self, _prefix: &str) -> Vec<String> {
        Vec::new()
    }

    fn cached_translation(&self, _text: &str) -> Option<String> {
        None
    }

    fn invalidate_node(&self, node: NodeId) {
        self.invalidated.lock().push(node);
    }
}

/// Collapse veto switchable from the test body.
#[derive(Debug, Default)]
pub struct GateVeto {
    blocked: AtomicBool,
}

impl GateVeto {
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }
}

impl CollapseVeto for GateVeto {
    fn veto_collapse(&self, _key: &AttachmentKey) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------

/// A prompt-style node: one scalar slot, one text slot named "text".
#[must_use]
pub fn prompt_node(id: NodeId) -> NodeRef {
    NodeRef::new(id, "PromptNode").with_slots(vec![
        InputSlot::scalar("seed"),
        InputSlot::text("text"),
    ])
}

/// A node with two sibling text slots both named "text".
#[must_use]
pub fn twin_text_node(id: NodeId) -> NodeRef {
    NodeRef::new(id, "TwinText").with_slots(vec![
        InputSlot::text("text"),
        InputSlot::text("text"),
    ])
}
