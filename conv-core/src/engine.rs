//! The composition root (§9: "owned top-level values ... constructed
//! exactly once and passed by reference/capability to every component").
//!
//! Every module-level mutable singleton the source language leaned on —
//! the cache manager, the prefix index, the skeleton map — is instead one
//! field here, constructed once and shared via `Arc`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cache::{consistency_audit_loop, ttl_sweep_loop, AntiLeakCache};
use crate::config::EngineConfig;
use crate::hierarchy::{HierarchyEngine, ReconstructionReport};
use crate::queue::IndexingQueue;
use crate::radix::RadixIndex;
use crate::skeleton::{ScanReport, SkeletonStore};
use crate::types::TaskId;

/// Owns the Skeleton Store, Radix Index, Hierarchy Reconstruction Engine,
/// Anti-Leak Cache, and Indexing Queue, plus the two background loops the
/// cache manager requires. Construct exactly once per process.
pub struct ConversationIndex {
    pub store: Arc<SkeletonStore>,
    pub radix: Arc<Mutex<RadixIndex>>,
    pub hierarchy: HierarchyEngine,
    pub cache: Arc<AntiLeakCache>,
    pub queue: Arc<IndexingQueue>,
    shutdown: watch::Sender<bool>,
    background: Vec<JoinHandle<()>>,
}

impl ConversationIndex {
    /// Wire up every component and spawn the cache manager's TTL-sweep and
    /// consistency-audit background loops. Must be called from within a
    /// running Tokio runtime.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let radix = Arc::new(Mutex::new(RadixIndex::new()));
        let queue = Arc::new(IndexingQueue::new());
        let store = Arc::new(SkeletonStore::new(
            config.clone(),
            radix.clone(),
            queue.clone(),
        ));
        let hierarchy = HierarchyEngine::new(store.clone(), radix.clone(), config.reconstruction_deadline);
        let cache = Arc::new(AntiLeakCache::new(&config));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let background = vec![
            tokio::spawn(ttl_sweep_loop(
                cache.clone(),
                config.ttl_sweep_interval,
                shutdown_rx.clone(),
            )),
            tokio::spawn(consistency_audit_loop(
                cache.clone(),
                config.consistency_audit_interval,
                shutdown_rx,
            )),
        ];

        Self {
            store,
            radix,
            hierarchy,
            cache,
            queue,
            shutdown: shutdown_tx,
            background,
        }
    }

    pub async fn scan(
        &self,
        force_rebuild: bool,
        workspace_filter: Option<&str>,
        task_ids: Option<&HashSet<TaskId>>,
    ) -> ScanReport {
        self.store.scan(force_rebuild, workspace_filter, task_ids).await
    }

    pub async fn reconstruct(&self) -> ReconstructionReport {
        self.hierarchy.reconstruct().await
    }

    /// One full cycle: scan, then reconstruct. The common entry point for
    /// a periodic driver.
    pub async fn run_cycle(
        &self,
        force_rebuild: bool,
        workspace_filter: Option<&str>,
    ) -> (ScanReport, ReconstructionReport) {
        let scan_report = self.scan(force_rebuild, workspace_filter, None).await;
        let reconstruction_report = self.reconstruct().await;
        (scan_report, reconstruction_report)
    }

    /// Signal both background loops to stop and wait for them to exit.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        for handle in self.background.drain(..) {
            let _ = handle.await;
        }
    }
}
