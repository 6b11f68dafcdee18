//! End-to-end lifecycle scenarios against the simulated host.

use graphdock_core::{
    AsyncDiscovery, AttachError, ContainerResolver, DiscoveryConfig, DockConfig,
    LifecycleOrchestrator, RenderMode, RenderModeOracle, BOUND_ATTR, CLAIM_ATTR, COLLAPSED_ATTR,
};
use graphdock_host::{HostEditor, InputEvent, InputEventKind, InputSlot, NodeId, NodeRef};
use graphdock_test_utils::{prompt_node, twin_text_node, GateVeto, RecordingHistory, RecordingSuggestions, SimHost};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn fast_config() -> DockConfig {
    DockConfig::new().with_discovery(DiscoveryConfig {
        timeout_ms: 200,
        container_timeout_ms: 100,
        max_retries: 2,
        retry_interval_ms: 20,
    })
}

fn dock(host: &Arc<SimHost>) -> LifecycleOrchestrator {
    LifecycleOrchestrator::new(Arc::clone(host) as Arc<dyn HostEditor>, fast_config())
}

// ---------------------------------------------------------------------
// create
// ---------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn concurrent_creates_converge_on_one_record() {
    init_tracing();
    let host = SimHost::shared();
    host.set_new_backend(true);
    host.define_node(prompt_node(NodeId(7)));
    let dock = dock(&host);

    // The node renders only after both creates are in flight.
    let h = Arc::clone(&host);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        h.render_widget_node(NodeId(7));
    });

    let (a, b) = tokio::join!(dock.create(NodeId(7), 1), dock.create(NodeId(7), 1));
    let a = a.expect("first create");
    let b = b.expect("second create");
    assert!(Arc::ptr_eq(&a, &b), "both callers share one record");
    assert!(a.is_attached());

    let stats = dock.stats();
    assert_eq!(stats.creates, 1);
    assert_eq!(stats.existing_hits, 1);
    assert_eq!(stats.live, 1);
    assert_eq!(host.overlay_elements().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_positioning_rolls_back_completely() {
    let host = SimHost::shared();
    host.set_new_backend(true);
    // Node declared but never rendered: discovery must exhaust its budget.
    host.define_node(prompt_node(NodeId(3)));
    let dock = dock(&host);

    let err = dock.create(NodeId(3), 1).await.expect_err("nothing to find");
    assert!(matches!(err, AttachError::NotYetRenderable { .. }));
    assert!(err.is_retryable());

    assert!(dock.registry().is_empty(), "no registry residue");
    assert!(host.overlay_elements().is_empty(), "no stray overlay");
    let stats = dock.stats();
    assert_eq!(stats.rollbacks, 1);
    assert_eq!(stats.creates, 0);
}

#[tokio::test]
async fn scan_attaches_only_eligible_slots() {
    let host = SimHost::shared();
    host.set_new_backend(true);
    host.define_node(prompt_node(NodeId(1)));
    host.render_widget_node(NodeId(1));
    let dock = dock(&host);

    // One scalar slot, one text slot: exactly one overlay.
    assert_eq!(dock.scan(&[NodeId(1), NodeId(99)]).await, 1);
    assert_eq!(dock.registry().len(), 1);

    // Re-scan converges on the existing record.
    assert_eq!(dock.scan(&[NodeId(1)]).await, 1);
    assert_eq!(dock.stats().existing_hits, 1);
}

#[tokio::test]
async fn pending_attachment_binds_late_rendered_editor() {
    init_tracing();
    let host = SimHost::shared();
    host.set_new_backend(true);
    let node = NodeRef::new(NodeId(11), "ShowText")
        .with_slots(vec![InputSlot::text("text")])
        .with_lazy_editor();
    host.define_node(node);
    host.render_widget_shell(NodeId(11));
    let history = RecordingHistory::shared();
    let dock = dock(&host).with_history(Arc::clone(&history) as _);

    let record = dock.create(NodeId(11), 0).await.expect("pending attach");
    assert!(record.is_attached());
    assert_eq!(record.bound_element(), None, "editor not rendered yet");
    assert!(history.inits().is_empty());

    // The editor renders on the host's own schedule; the next scan pass
    // must bind it instead of short-circuiting on the live record.
    let editor = host.add_text_input(NodeId(11), &["text"]);
    assert_eq!(dock.scan(&[NodeId(11)]).await, 1);
    assert_eq!(record.bound_element(), Some(editor));
    assert_eq!(host.attribute(editor, CLAIM_ATTR), Some(record.key().to_string()));
    assert_eq!(host.attribute(editor, BOUND_ATTR), Some(record.key().to_string()));
    assert_eq!(history.inits().len(), 1, "baseline seeded at first bind");
    assert_eq!(dock.registry().len(), 1);
}

// ---------------------------------------------------------------------
// destroy
// ---------------------------------------------------------------------

#[tokio::test]
async fn destroy_reverses_create_completely() {
    init_tracing();
    let host = SimHost::shared();
    host.set_new_backend(true);
    host.define_node(prompt_node(NodeId(4)));
    host.render_widget_node(NodeId(4));
    let dock = dock(&host);

    let record = dock.create(NodeId(4), 1).await.expect("attach");
    let anchor = record.bound_element().expect("bound");
    let overlay = record.overlay();
    assert_eq!(host.attribute(anchor, CLAIM_ATTR), Some(record.key().to_string()));
    assert_eq!(host.attribute(anchor, BOUND_ATTR), Some(record.key().to_string()));

    let ran = Arc::new(Mutex::new(0u32));
    let n = Arc::clone(&ran);
    record.push_cleanup("counter", Box::new(move || {
        *n.lock() += 1;
        Ok(())
    }));
    record.push_cleanup("broken", Box::new(|| Err("boom".to_string())));

    dock.destroy(&record);
    assert!(record.is_destroyed());
    assert!(!host.element_exists(overlay), "overlay subtree removed");
    assert_eq!(host.attribute(anchor, CLAIM_ATTR), None, "claim released");
    assert_eq!(host.attribute(anchor, BOUND_ATTR), None, "binding unwired");
    assert!(dock.registry().get(record.key()).is_none());
    assert_eq!(*ran.lock(), 1, "cleanup ran exactly once");

    // Second destroy is a no-op.
    dock.destroy(&record);
    let stats = dock.stats();
    assert_eq!(stats.destroys, 1);
    assert_eq!(stats.cleanup_failures, 1);
    assert_eq!(*ran.lock(), 1);
}

#[tokio::test]
async fn cleanup_node_invalidates_collaborator_caches() {
    let host = SimHost::shared();
    host.set_new_backend(true);
    host.define_node(prompt_node(NodeId(5)));
    host.render_widget_node(NodeId(5));
    let history = RecordingHistory::shared();
    let suggestions = RecordingSuggestions::shared();
    let dock = dock(&host)
        .with_history(Arc::clone(&history) as _)
        .with_suggestions(Arc::clone(&suggestions) as _);

    dock.create(NodeId(5), 1).await.expect("attach");
    dock.cleanup_node(NodeId(5));

    assert!(dock.registry().is_empty());
    assert_eq!(history.invalidated(), vec![NodeId(5)]);
    assert_eq!(suggestions.invalidated(), vec![NodeId(5)]);
}

#[tokio::test]
async fn bulk_relocate_spares_collaborator_caches() {
    let host = SimHost::shared();
    host.set_new_backend(true);
    for id in [NodeId(1), NodeId(2)] {
        host.define_node(prompt_node(id));
        host.render_widget_node(id);
    }
    let history = RecordingHistory::shared();
    let suggestions = RecordingSuggestions::shared();
    let dock = dock(&host)
        .with_history(Arc::clone(&history) as _)
        .with_suggestions(Arc::clone(&suggestions) as _);

    dock.create(NodeId(1), 1).await.expect("attach");
    dock.create(NodeId(2), 1).await.expect("attach");

    dock.relocate_cleanup();
    assert!(dock.registry().is_empty());
    assert!(host.overlay_elements().is_empty());
    // The workflow switch rebuilds overlays moments later; stored history
    // and cached suggestions must survive it.
    assert!(history.invalidated().is_empty());
    assert!(suggestions.invalidated().is_empty());

    let stats = dock.stats();
    assert_eq!(stats.destroys, 2);
    assert_eq!(stats.bulk_relocates, 1);
}

// ---------------------------------------------------------------------
// mode transitions / rebind
// ---------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn mode_transitions_apply_sequentially() {
    init_tracing();
    let host = SimHost::shared();
    host.set_new_backend(false);
    let oracle = Arc::new(RenderModeOracle::new(
        Arc::clone(&host) as Arc<dyn HostEditor>,
        &DockConfig::new().with_mode_ttl_ms(0),
    ));

    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    oracle.subscribe(Arc::new(move |from, to| {
        let sink = Arc::clone(&sink);
        Box::pin(async move {
            sink.lock().push(format!("start {from:?}->{to:?}"));
            tokio::time::sleep(Duration::from_millis(10)).await;
            sink.lock().push(format!("end {from:?}->{to:?}"));
            Ok(())
        })
    }));

    // First transition suspends mid-callback; the second is detected while
    // it is still in flight and must queue behind it.
    let o = Arc::clone(&oracle);
    let first = tokio::spawn(async move { o.refresh().await });
    tokio::task::yield_now().await;
    host.set_new_backend(true);
    oracle.refresh().await;
    first.await.expect("driver task");

    assert_eq!(
        *log.lock(),
        vec![
            "start Unknown->BackendA".to_string(),
            "end Unknown->BackendA".to_string(),
            "start BackendA->BackendB".to_string(),
            "end BackendA->BackendB".to_string(),
        ]
    );
}

#[tokio::test]
async fn backend_switch_rebinds_every_record() {
    init_tracing();
    let host = SimHost::shared();
    host.set_new_backend(false);
    let nodes = [NodeId(1), NodeId(2), NodeId(3)];
    for id in nodes {
        host.define_node(prompt_node(id));
        host.render_legacy_input(id, "text");
    }

    let dock = Arc::new(dock(&host));
    Arc::clone(&dock).watch_mode();
    dock.oracle().refresh().await; // settle on the legacy backend

    let mut records = Vec::new();
    let mut legacy_anchors = Vec::new();
    for id in nodes {
        let record = dock.create(id, 1).await.expect("legacy attach");
        legacy_anchors.push(record.bound_element().expect("bound"));
        records.push(record);
    }

    // Host-wide backend switch. During the changeover both trees coexist;
    // the widget tree is authoritative as soon as the flag flips.
    host.set_new_backend(true);
    for id in nodes {
        host.render_widget_node(id);
    }
    dock.oracle().refresh().await;

    let mut anchors = Vec::new();
    for (record, id) in records.iter().zip(nodes) {
        let anchor = record.bound_element().expect("rebound");
        assert!(host.is_connected(anchor));
        let root = host.node_root(id).expect("widget root");
        assert!(host.contains_descendant(root, anchor), "bound inside the new tree");
        assert_eq!(host.attribute(anchor, CLAIM_ATTR), Some(record.key().to_string()));
        anchors.push(anchor);
    }
    for old in legacy_anchors {
        assert_eq!(host.attribute(old, CLAIM_ATTR), None, "legacy claim released");
    }
    anchors.sort_unstable();
    anchors.dedup();
    assert_eq!(anchors.len(), nodes.len(), "no element double-claimed");
    assert_eq!(dock.stats().rebinds, 3);
    assert_eq!(host.overlay_elements().len(), 3);
}

#[tokio::test]
async fn failed_claim_transfer_keeps_old_ownership() {
    let host = SimHost::shared();
    host.set_new_backend(true);
    host.define_node(prompt_node(NodeId(12)));
    host.render_widget_node(NodeId(12));
    let dock = dock(&host);

    let record = dock.create(NodeId(12), 1).await.expect("attach");
    let old = record.bound_element().expect("bound");

    // The host moves the input out of the node subtree and renders a fresh
    // one that a competing claim already owns.
    let stray = host.make_element();
    host.append_child(stray, old).expect("reparent");
    let fresh = host.add_text_input(NodeId(12), &["text"]);
    host.set_attribute(fresh, CLAIM_ATTR, "99:other").expect("claim");

    let err = dock.rebind(&record).await.expect_err("transfer must fail");
    assert!(matches!(err, AttachError::AlreadyClaimed { .. }));
    assert_eq!(record.bound_element(), Some(old), "binding unchanged");
    assert_eq!(
        host.attribute(old, CLAIM_ATTR),
        Some(record.key().to_string()),
        "old claim stays with the record"
    );
    assert_eq!(host.attribute(fresh, CLAIM_ATTR), Some("99:other".to_string()));

    // Teardown releases only what the record owns.
    dock.destroy(&record);
    assert_eq!(host.attribute(old, CLAIM_ATTR), None);
    assert_eq!(host.attribute(fresh, CLAIM_ATTR), Some("99:other".to_string()));
}

// ---------------------------------------------------------------------
// disambiguation
// ---------------------------------------------------------------------

#[tokio::test]
async fn sibling_slots_keep_distinct_stable_keys() {
    let host = SimHost::shared();
    host.set_new_backend(true);
    host.define_node(twin_text_node(NodeId(9)));
    host.render_widget_node(NodeId(9));
    let dock = dock(&host);

    let first = dock.create(NodeId(9), 0).await.expect("first sibling");
    let second = dock.create(NodeId(9), 1).await.expect("second sibling");
    assert_ne!(first.key(), second.key());
    assert!(first.key().disambiguator().is_some());
    assert!(second.key().disambiguator().is_some());
    let bindings = (first.bound_element(), second.bound_element());
    assert_ne!(bindings.0, bindings.1);

    // Repeated creates and rebinds must keep the element-to-key mapping.
    for _ in 0..10 {
        let a = dock.create(NodeId(9), 0).await.expect("stable");
        let b = dock.create(NodeId(9), 1).await.expect("stable");
        assert!(Arc::ptr_eq(&a, &first));
        assert!(Arc::ptr_eq(&b, &second));
        dock.rebind(&first).await.expect("rebind");
        dock.rebind(&second).await.expect("rebind");
        assert_eq!((first.bound_element(), second.bound_element()), bindings);
    }
    assert_eq!(dock.registry().len(), 2);
}

#[tokio::test]
async fn recreated_twin_inputs_rebind_to_distinct_elements() {
    init_tracing();
    let host = SimHost::shared();
    host.set_new_backend(true);
    host.define_node(twin_text_node(NodeId(13)));
    host.render_widget_node(NodeId(13));
    let dock = dock(&host);

    let first = dock.create(NodeId(13), 0).await.expect("first twin");
    let second = dock.create(NodeId(13), 1).await.expect("second twin");

    // The host recreates both inputs; the stored tags die with the
    // elements.
    host.remove_element(first.bound_element().expect("bound"));
    host.remove_element(second.bound_element().expect("bound"));
    host.add_text_input(NodeId(13), &["text"]);
    host.add_text_input(NodeId(13), &["text"]);

    dock.rebind(&first).await.expect("first rebind");
    dock.rebind(&second).await.expect("second rebind");
    let a = first.bound_element().expect("rebound");
    let b = second.bound_element().expect("rebound");
    assert_ne!(a, b, "twins spread across distinct elements");

    // Re-stamped tags keep later scans converging on the same records.
    assert_eq!(dock.scan(&[NodeId(13)]).await, 2);
    assert_eq!(dock.registry().len(), 2);
    assert_eq!((first.bound_element(), second.bound_element()), (Some(a), Some(b)));
}

// ---------------------------------------------------------------------
// discovery timing
// ---------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn discovery_exhausts_budget_without_render() {
    let host = SimHost::shared();
    host.define_node(prompt_node(NodeId(2)));
    let discovery = AsyncDiscovery::new(
        Arc::clone(&host) as Arc<dyn HostEditor>,
        fast_config().discovery,
    );
    let resolver = ContainerResolver::new(Arc::clone(&host) as Arc<dyn HostEditor>);

    let info = discovery
        .find_with_retry(NodeId(2), 1, "text", RenderMode::BackendB, None, &resolver)
        .await;
    assert!(info.is_none(), "budget exhausted means not-ready, not panic");
}

#[tokio::test(start_paused = true)]
async fn late_render_resolves_mid_wait() {
    let host = SimHost::shared();
    host.define_node(prompt_node(NodeId(2)));
    let discovery = AsyncDiscovery::new(
        Arc::clone(&host) as Arc<dyn HostEditor>,
        fast_config().discovery,
    );
    let resolver = ContainerResolver::new(Arc::clone(&host) as Arc<dyn HostEditor>);

    let h = Arc::clone(&host);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        h.render_widget_node(NodeId(2));
    });

    let info = discovery
        .find_with_retry(NodeId(2), 1, "text", RenderMode::BackendB, None, &resolver)
        .await
        .expect("resolved once the host caught up");
    let anchor = info.anchor.expect("anchor");
    assert!(host.is_connected(anchor));
}

// ---------------------------------------------------------------------
// collapse / expand
// ---------------------------------------------------------------------

#[tokio::test]
async fn automatic_collapse_honors_veto() {
    let host = SimHost::shared();
    host.set_new_backend(true);
    host.define_node(prompt_node(NodeId(6)));
    host.render_widget_node(NodeId(6));
    let veto = GateVeto::shared();
    veto.set_blocked(true);
    let dock = dock(&host).with_veto(Arc::clone(&veto) as _);

    let record = dock.create(NodeId(6), 1).await.expect("attach");

    // Vetoed: the overlay stays expanded and the "no" is final.
    assert!(!dock.collapse(&record, true));
    assert!(!record.is_collapsed());
    assert_eq!(host.attribute(record.overlay(), COLLAPSED_ATTR), None);

    // A user-driven collapse never consults the veto.
    assert!(dock.collapse(&record, false));
    assert!(record.is_collapsed());
    assert_eq!(host.attribute(record.overlay(), COLLAPSED_ATTR), Some("1".into()));

    dock.expand(&record);
    assert!(!record.is_collapsed());
    assert_eq!(host.attribute(record.overlay(), COLLAPSED_ATTR), None);

    veto.set_blocked(false);
    assert!(dock.collapse(&record, true));
}

// ---------------------------------------------------------------------
// host event triggers
// ---------------------------------------------------------------------

#[tokio::test]
async fn blur_commits_history_and_adopts_swapped_element() {
    let host = SimHost::shared();
    host.set_new_backend(true);
    host.define_node(prompt_node(NodeId(8)));
    host.render_widget_node(NodeId(8));
    let history = RecordingHistory::shared();
    let dock = dock(&host).with_history(Arc::clone(&history) as _);

    let record = dock.create(NodeId(8), 1).await.expect("attach");
    let original = record.bound_element().expect("bound");
    assert_eq!(history.inits().len(), 1, "baseline seeded at bind");

    // The host silently swaps the input element under the record.
    let replacement = host.add_text_input(NodeId(8), &["text"]);
    dock.notify_input(record.key(), replacement);
    assert_eq!(record.bound_element(), Some(replacement));
    assert_eq!(host.attribute(replacement, CLAIM_ATTR), Some(record.key().to_string()));
    assert_eq!(host.attribute(original, CLAIM_ATTR), None, "old claim released");

    host.set_value(replacement, "a castle on a hill");
    dock.notify_event(
        record.key(),
        &InputEvent {
            element: replacement,
            kind: InputEventKind::Blur,
            value: "a castle on a hill".to_string(),
        },
    );
    assert_eq!(
        history.entries(NodeId(8), "text"),
        vec!["a castle on a hill".to_string()]
    );
}
