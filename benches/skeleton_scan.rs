//! Skeleton Store scan throughput (§4.A).
//!
//! Run with: `cargo bench --bench skeleton_scan`

use std::sync::{Arc, Mutex};

use conv_core::radix::RadixIndex;
use conv_core::queue::IndexingQueue;
use conv_core::skeleton::SkeletonStore;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::TempDir;
use test_utils::{config_for, storage_root, ui_opening_message, write_task};
use tokio::runtime::Runtime;

fn rt() -> &'static Runtime {
    static RUNTIME: std::sync::OnceLock<Runtime> = std::sync::OnceLock::new();
    RUNTIME.get_or_init(|| Runtime::new().expect("failed to create runtime"))
}

fn populated_store(task_count: usize) -> (TempDir, SkeletonStore) {
    let tmp = TempDir::new().unwrap();
    let root = storage_root(&tmp);
    for i in 0..task_count {
        write_task(
            &root,
            &format!("task-{i}"),
            "",
            &ui_opening_message(&format!("do benchmark task number {i}")),
        );
    }
    let store = SkeletonStore::new(
        config_for(&tmp),
        Arc::new(Mutex::new(RadixIndex::new())),
        Arc::new(IndexingQueue::new()),
    );
    (tmp, store)
}

fn bench_cold_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("skeleton_scan_cold");
    for &count in &[10usize, 100, 500] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let (_tmp, store) = populated_store(count);
                rt().block_on(async {
                    let report = store.scan(false, None, None).await;
                    black_box(report);
                });
            });
        });
    }
    group.finish();
}

fn bench_warm_rescan(c: &mut Criterion) {
    let mut group = c.benchmark_group("skeleton_scan_warm");
    group.bench_function("500_tasks_cache_hit", |b| {
        let (_tmp, store) = populated_store(500);
        rt().block_on(async {
            store.scan(false, None, None).await;
        });
        b.iter(|| {
            rt().block_on(async {
                let report = store.scan(false, None, None).await;
                black_box(report);
            });
        });
    });
    group.finish();
}

criterion_group!(benches, bench_cold_scan, bench_warm_rescan);
criterion_main!(benches);
