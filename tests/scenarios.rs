//! Black-box scenario tests (S1-S5) exercising the composition root's
//! public surface end to end.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use conv_core::cache::{AntiLeakCache, Strategy};
use conv_core::hierarchy::HierarchyEngine;
use conv_core::queue::IndexingQueue;
use conv_core::radix::RadixIndex;
use conv_core::skeleton::SkeletonStore;
use conv_core::{EngineConfig, TaskId};
use tempfile::TempDir;
use test_utils::{assistant_spawns_subtask, config_for, storage_root, ui_opening_message, write_task};

fn engine(tmp: &TempDir) -> (Arc<SkeletonStore>, HierarchyEngine) {
    let radix = Arc::new(Mutex::new(RadixIndex::new()));
    let store = Arc::new(SkeletonStore::new(
        config_for(tmp),
        radix.clone(),
        Arc::new(IndexingQueue::new()),
    ));
    let hierarchy = HierarchyEngine::new(store.clone(), radix, Duration::from_secs(300));
    (store, hierarchy)
}

/// S1: a child whose parent is discovered only after the child itself is
/// scanned still reconnects once reconstruction runs.
#[tokio::test]
async fn s1_orphan_reconnection() {
    let tmp = TempDir::new().unwrap();
    let root = storage_root(&tmp);

    write_task(
        &root,
        "child-first",
        "",
        &ui_opening_message("refactor the billing module completely"),
    );
    write_task(
        &root,
        "parent-second",
        &assistant_spawns_subtask("refactor the billing module"),
        "",
    );

    let (store, hierarchy) = engine(&tmp);
    store.scan(false, None, None).await;
    hierarchy.reconstruct().await;

    let child = store.get(&TaskId::new("child-first")).unwrap();
    assert_eq!(child.parent_task_id, Some(TaskId::new("parent-second")));
}

/// S2: when two parents both declare a prefix that matches a child's
/// opening text, the parent with the longer matching prefix wins.
#[tokio::test]
async fn s2_longest_prefix_wins() {
    let tmp = TempDir::new().unwrap();
    let root = storage_root(&tmp);

    write_task(
        &root,
        "parent-short",
        &assistant_spawns_subtask("migrate the database"),
        "",
    );
    write_task(
        &root,
        "parent-long",
        &assistant_spawns_subtask("migrate the database to postgres"),
        "",
    );
    write_task(
        &root,
        "child",
        "",
        &ui_opening_message("migrate the database to postgres with zero downtime"),
    );

    let (store, hierarchy) = engine(&tmp);
    store.scan(false, None, None).await;
    hierarchy.reconstruct().await;

    let child = store.get(&TaskId::new("child")).unwrap();
    assert_eq!(child.parent_task_id, Some(TaskId::new("parent-long")));
}

/// S3: a candidate parent assignment that would close a cycle is rejected;
/// the child keeps whatever parent it already had (here, none).
#[tokio::test]
async fn s3_cycle_rejection() {
    let tmp = TempDir::new().unwrap();
    let root = storage_root(&tmp);

    write_task(&root, "task-a", "", &ui_opening_message("rotate the credentials"));
    write_task(
        &root,
        "task-b",
        &assistant_spawns_subtask("rotate the credentials"),
        "",
    );

    let (store, hierarchy) = engine(&tmp);
    store.scan(false, None, None).await;

    let mut b = store.get(&TaskId::new("task-b")).unwrap();
    b.set_parent(TaskId::new("task-a"));
    store.save(b).await.unwrap();

    hierarchy.reconstruct().await;

    let a = store.get(&TaskId::new("task-a")).unwrap();
    assert!(a.parent_task_id.is_none());
}

/// S4: an already-expired deadline causes `reconstruct` to report a
/// timeout with zero progress made, rather than hanging or panicking.
#[tokio::test]
async fn s4_timeout_partial() {
    let tmp = TempDir::new().unwrap();
    let root = storage_root(&tmp);
    write_task(&root, "task-a", "", &ui_opening_message("index every file in the repo"));

    let radix = Arc::new(Mutex::new(RadixIndex::new()));
    let store = Arc::new(SkeletonStore::new(
        config_for(&tmp),
        radix.clone(),
        Arc::new(IndexingQueue::new()),
    ));
    store.scan(false, None, None).await;

    let hierarchy = HierarchyEngine::new(store.clone(), radix, Duration::from_secs(0));
    let report = hierarchy.reconstruct().await;

    assert!(report.timeout_reached);
    assert_eq!(report.phase1_processed, 0);
    assert_eq!(report.resolved_count, 0);
}

/// S5: once the anti-leak cache's global total approaches its ceiling,
/// the eviction cascade frees enough room that a sustained write burst
/// never overruns the configured bound.
#[test]
fn s5_eviction_cascade() {
    let mut config = EngineConfig::default();
    config.anti_leak_ceiling_bytes = 4 * 1024 * 1024;
    config.anti_leak_alert_bytes = 4 * 1024 * 1024;
    let cache = AntiLeakCache::new(&config);

    let chunk = vec![0u8; 128 * 1024];
    for i in 0..128 {
        let _ = cache.store(&format!("entry-{i}"), chunk.clone(), Strategy::Aggressive, Duration::from_secs(3600));
    }

    let stats = cache.stats();
    assert!(stats.total_size_gb * 1024.0 * 1024.0 * 1024.0 <= config.anti_leak_ceiling_bytes as f64 + f64::EPSILON);
    assert!(cache.get("entry-127").is_some());
}
