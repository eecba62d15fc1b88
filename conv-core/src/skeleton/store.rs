//! The Skeleton Store (§4.A): discovers raw directories, builds/refreshes
//! skeletons, persists them atomically, and serves the in-memory mirror.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::config::EngineConfig;
use crate::constants::defaults;
use crate::error::{Error, Result};
use crate::queue::IndexingQueue;
use crate::radix::RadixIndex;
use crate::retry::{RetryConfig, RetryPolicy};
use crate::types::{Skeleton, TaskId};

use super::discovery::detect_storage_locations;
use super::io::{read_json_bom_tolerant, skeleton_path, write_json_atomic};
use super::raw::{analyze_raw_task_dir, is_valid_task_dir};

/// Result of one `scan()` invocation (§4.A).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Skeletons freshly analyzed and written this scan.
    pub built: usize,
    /// Raw directories discovered but invalid, or that failed to analyze
    /// (resource-missing / parse-failed); scanning continues past these.
    pub skipped: usize,
    /// Skeletons whose cache was already fresh and simply loaded.
    pub cached_size: usize,
}

/// In-memory mirror plus on-disk persistence of every skeleton.
pub struct SkeletonStore {
    config: EngineConfig,
    skeletons: RwLock<HashMap<TaskId, Skeleton>>,
    /// The storage root each task's raw directory was discovered under,
    /// so `save` knows which sibling `.skeletons/` directory to write to.
    task_roots: RwLock<HashMap<TaskId, PathBuf>>,
    radix: Arc<Mutex<RadixIndex>>,
    queue: Arc<IndexingQueue>,
}

impl SkeletonStore {
    #[must_use]
    pub fn new(config: EngineConfig, radix: Arc<Mutex<RadixIndex>>, queue: Arc<IndexingQueue>) -> Self {
        Self {
            config,
            skeletons: RwLock::new(HashMap::new()),
            task_roots: RwLock::new(HashMap::new()),
            radix,
            queue,
        }
    }

    #[must_use]
    pub fn detect_storage_locations(&self) -> Vec<PathBuf> {
        detect_storage_locations(&self.config)
    }

    #[must_use]
    pub fn queue(&self) -> &Arc<IndexingQueue> {
        &self.queue
    }

    /// In-memory lookup; never touches disk.
    #[must_use]
    pub fn get(&self, task_id: &TaskId) -> Option<Skeleton> {
        self.skeletons.read().unwrap().get(task_id).cloned()
    }

    #[must_use]
    pub fn all(&self) -> Vec<Skeleton> {
        self.skeletons.read().unwrap().values().cloned().collect()
    }

    /// The raw storage directory `task_id` was discovered under, if it has
    /// been seen by a prior `scan`. Used by the hierarchy engine to reparse
    /// raw files for Phase 1 and for opening-text recomputation.
    #[must_use]
    pub fn raw_dir_for(&self, task_id: &TaskId) -> Option<PathBuf> {
        let root = self.task_roots.read().unwrap().get(task_id).cloned()?;
        Some(root.join(task_id.as_str()))
    }

    /// Persist `skeleton`, retrying per §4.A (the initial write plus up to
    /// 3 retries, backing off 200 ms -> 400 ms -> 800 ms between them — 4
    /// total write attempts; see [`crate::retry`] for why the three listed
    /// delays are read as 3 retries rather than 3 total tries), and refresh
    /// the in-memory mirror on success.
    #[instrument(skip(self, skeleton), fields(task_id = %skeleton.task_id))]
    pub async fn save(&self, skeleton: Skeleton) -> Result<()> {
        let root = self
            .task_roots
            .read()
            .unwrap()
            .get(&skeleton.task_id)
            .cloned()
            .ok_or_else(|| Error::InputInvalid {
                component: "skeleton_store",
                context: format!(
                    "save called for unknown task {}: never scanned",
                    skeleton.task_id
                ),
            })?;

        let path = skeleton_path(&root, skeleton.task_id.as_str());
        let task_id = skeleton.task_id.clone();

        let mut policy = RetryPolicy::with_config(
            RetryConfig::new()
                .with_max_retries(defaults::SAVE_MAX_RETRIES)
                .with_base_delay(defaults::SAVE_BASE_DELAY),
        );

        let result = policy
            .execute(|| async { write_json_atomic(&path, &skeleton) })
            .await;

        match result {
            Ok(()) => {
                self.skeletons
                    .write()
                    .unwrap()
                    .insert(task_id, skeleton);
                Ok(())
            }
            Err(e) => {
                warn!(error = ?e, "persist failed after retry budget exhausted");
                Err(Error::PersistFailed {
                    task_id,
                    context: e.to_string(),
                })
            }
        }
    }

    /// Record that `task_id` completed downstream (embedding) processing
    /// and persist the change (used by F).
    pub async fn mark_indexed(&self, task_id: &TaskId, indexed_at: DateTime<Utc>) -> Result<()> {
        let Some(mut skeleton) = self.get(task_id) else {
            return Err(Error::ResourceMissing {
                task_id: Some(task_id.clone()),
                context: "mark_indexed called for unknown task".to_string(),
            });
        };
        skeleton.processing_state.last_processed_at = Some(indexed_at);
        self.save(skeleton).await
    }

    /// Scan every discovered raw storage location, building or refreshing
    /// skeletons per the §4.A state machine.
    #[instrument(skip(self))]
    pub async fn scan(
        &self,
        force_rebuild: bool,
        workspace_filter: Option<&str>,
        task_ids: Option<&std::collections::HashSet<TaskId>>,
    ) -> ScanReport {
        let mut report = ScanReport::default();
        for root in self.detect_storage_locations() {
            self.scan_root(&root, force_rebuild, workspace_filter, task_ids, &mut report)
                .await;
        }
        report
    }

    async fn scan_root(
        &self,
        root: &Path,
        force_rebuild: bool,
        workspace_filter: Option<&str>,
        task_ids: Option<&std::collections::HashSet<TaskId>>,
        report: &mut ScanReport,
    ) {
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "failed to read storage root");
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() || path.file_name().map(|n| n == ".skeletons").unwrap_or(false) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let task_id = TaskId::new(name);

            if let Some(allowlist) = task_ids {
                if !allowlist.contains(&task_id) {
                    continue;
                }
            }

            self.scan_task(root, &task_id, &path, force_rebuild, workspace_filter, task_ids.is_some(), report)
                .await;
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn scan_task(
        &self,
        root: &Path,
        task_id: &TaskId,
        raw_dir: &Path,
        force_rebuild: bool,
        workspace_filter: Option<&str>,
        ignore_workspace_filter: bool,
        report: &mut ScanReport,
    ) {
        if !is_valid_task_dir(raw_dir) {
            report.skipped += 1;
            return;
        }

        self.task_roots
            .write()
            .unwrap()
            .insert(task_id.clone(), root.to_path_buf());

        let skeleton_file = skeleton_path(root, task_id.as_str());
        let cached: Option<Skeleton> = read_json_bom_tolerant(&skeleton_file).ok();

        let workspace = cached.as_ref().and_then(|s| s.workspace.clone());
        if !ignore_workspace_filter {
            if let Some(filter) = workspace_filter {
                let matches = workspace
                    .as_deref()
                    .map(|w| w.to_lowercase().contains(&filter.to_lowercase()))
                    .unwrap_or(false);
                if !matches {
                    return;
                }
            }
        }

        let reference_timestamp = match super::raw::reference_timestamp(raw_dir) {
            Ok(ts) => ts,
            Err(e) => {
                debug!(task_id = %task_id, error = %e, "resource missing during scan");
                report.skipped += 1;
                return;
            }
        };

        let cached_mtime = std::fs::metadata(&skeleton_file)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        let needs_rebuild = force_rebuild
            || cached.is_none()
            || cached_mtime.map(|m| m < reference_timestamp).unwrap_or(true);

        if !needs_rebuild {
            if let Some(skeleton) = cached {
                self.skeletons
                    .write()
                    .unwrap()
                    .insert(task_id.clone(), skeleton);
                report.cached_size += 1;
            }
            return;
        }

        match analyze_raw_task_dir(raw_dir) {
            Ok(analysis) => {
                let created_at = cached
                    .as_ref()
                    .map(|s| s.timestamps.created_at)
                    .unwrap_or(analysis.reference_timestamp);
                let mut skeleton = cached.unwrap_or_else(|| Skeleton::new(task_id.clone(), created_at));
                skeleton.counts = analysis.counts;
                skeleton.timestamps.created_at = created_at;
                skeleton.timestamps.last_activity = analysis.reference_timestamp;
                skeleton.source_checksums = Some(analysis.source_checksums);
                skeleton.processing_state.phase1_completed =
                    !analysis.child_task_instruction_prefixes.is_empty();
                for prefix in analysis.child_task_instruction_prefixes {
                    skeleton.add_child_prefix(prefix);
                }

                {
                    let mut radix = self.radix.lock().unwrap();
                    for prefix in &skeleton.child_task_instruction_prefixes {
                        radix.add(task_id.clone(), prefix);
                    }
                }

                match self.save(skeleton).await {
                    Ok(()) => {
                        // §4.F: A enqueues after every successful write.
                        self.queue.enqueue(task_id.clone());
                        report.built += 1;
                    }
                    Err(e) => {
                        warn!(task_id = %task_id, error = %e, "persist failed during scan");
                        report.skipped += 1;
                    }
                }
            }
            Err(e) => {
                debug!(task_id = %task_id, error = %e, "analyze failed during scan");
                report.skipped += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with_root() -> (TempDir, SkeletonStore) {
        let tmp = TempDir::new().unwrap();
        let mut config = EngineConfig::default();
        config.workspace_root_override = Some(tmp.path().to_path_buf());
        let store = SkeletonStore::new(
            config,
            Arc::new(Mutex::new(RadixIndex::new())),
            Arc::new(crate::queue::IndexingQueue::new()),
        );
        (tmp, store)
    }

    fn make_task_dir(storage_root: &Path, task_id: &str) -> PathBuf {
        let dir = storage_root.join(task_id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("ui_messages.json"),
            r#"[{"say":"task","text":"Do the thing"}]"#,
        )
        .unwrap();
        dir
    }

    fn storage_root(tmp: &TempDir) -> PathBuf {
        let root = tmp
            .path()
            .join("Code")
            .join("User")
            .join("globalStorage")
            .join("rooveterinaryinc.roo-cline")
            .join("tasks");
        std::fs::create_dir_all(&root).unwrap();
        root
    }

    #[tokio::test]
    async fn scan_builds_skeleton_for_valid_task_dir() {
        let (tmp, store) = store_with_root();
        let root = storage_root(&tmp);
        make_task_dir(&root, "task-1");

        let report = store.scan(false, None, None).await;
        assert_eq!(report.built, 1);
        assert_eq!(report.skipped, 0);

        let skeleton = store.get(&TaskId::new("task-1")).unwrap();
        assert_eq!(skeleton.task_id, TaskId::new("task-1"));
    }

    #[tokio::test]
    async fn second_scan_without_force_rebuild_uses_cache() {
        let (tmp, store) = store_with_root();
        let root = storage_root(&tmp);
        make_task_dir(&root, "task-1");

        store.scan(false, None, None).await;
        let report = store.scan(false, None, None).await;
        assert_eq!(report.built, 0);
        assert_eq!(report.cached_size, 1);
    }

    #[tokio::test]
    async fn force_rebuild_always_rebuilds() {
        let (tmp, store) = store_with_root();
        let root = storage_root(&tmp);
        make_task_dir(&root, "task-1");

        store.scan(false, None, None).await;
        let report = store.scan(true, None, None).await;
        assert_eq!(report.built, 1);
    }

    #[tokio::test]
    async fn invalid_directory_is_skipped() {
        let (tmp, store) = store_with_root();
        let root = storage_root(&tmp);
        std::fs::create_dir_all(root.join("not-a-task")).unwrap();

        let report = store.scan(false, None, None).await;
        assert_eq!(report.skipped, 1);
        assert_eq!(report.built, 0);
    }

    #[tokio::test]
    async fn task_ids_filter_restricts_scan() {
        let (tmp, store) = store_with_root();
        let root = storage_root(&tmp);
        make_task_dir(&root, "task-1");
        make_task_dir(&root, "task-2");

        let mut allow = std::collections::HashSet::new();
        allow.insert(TaskId::new("task-1"));
        let report = store.scan(false, None, Some(&allow)).await;
        assert_eq!(report.built, 1);
        assert!(store.get(&TaskId::new("task-2")).is_none());
    }

    #[tokio::test]
    async fn mark_indexed_persists_timestamp() {
        let (tmp, store) = store_with_root();
        let root = storage_root(&tmp);
        make_task_dir(&root, "task-1");
        store.scan(false, None, None).await;

        let now = Utc::now();
        store.mark_indexed(&TaskId::new("task-1"), now).await.unwrap();
        let skeleton = store.get(&TaskId::new("task-1")).unwrap();
        assert_eq!(skeleton.processing_state.last_processed_at, Some(now));
    }
}
