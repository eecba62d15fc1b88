//! Phase 1 — prefix materialization (§4.D).

use tracing::{debug, warn};

use crate::skeleton::{analyze_raw_task_dir, SkeletonStore};

/// Reparse every skeleton not yet marked `phase1_completed`, updating its
/// `child_task_instruction_prefixes`. Returns `(processed, instructions_extracted)`.
///
/// Skeletons whose prefixes were already populated by the Skeleton Store's
/// own `ANALYZE` step carry `phase1_completed = true` and are skipped here —
/// this phase only covers skeletons loaded straight from a pre-existing
/// cache that predates prefix extraction, or that failed extraction the
/// first time around.
pub async fn run_phase1(store: &SkeletonStore) -> (usize, usize) {
    let mut processed = 0usize;
    let mut extracted = 0usize;

    for mut skeleton in store.all() {
        if skeleton.processing_state.phase1_completed {
            continue;
        }

        let Some(raw_dir) = store.raw_dir_for(&skeleton.task_id) else {
            debug!(task_id = %skeleton.task_id, "no known raw directory, skipping phase 1");
            continue;
        };

        match analyze_raw_task_dir(&raw_dir) {
            Ok(analysis) => {
                for prefix in &analysis.child_task_instruction_prefixes {
                    skeleton.add_child_prefix(prefix);
                }
                extracted += analysis.child_task_instruction_prefixes.len();
                skeleton.processing_state.phase1_completed = true;
                processed += 1;

                if let Err(e) = store.save(skeleton).await {
                    warn!(error = ?e, "phase 1 persist failed, will reconcile on next scan");
                }
            }
            Err(e) => {
                warn!(task_id = %skeleton.task_id, error = ?e, "phase 1 parse failed");
                skeleton.processing_state.record_error(e.to_string());
                let _ = store.save(skeleton).await;
            }
        }
    }

    (processed, extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::radix::RadixIndex;
    use crate::types::TaskId;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn make_store(tmp: &TempDir) -> (std::path::PathBuf, SkeletonStore) {
        let root = tmp
            .path()
            .join("Code")
            .join("User")
            .join("globalStorage")
            .join("rooveterinaryinc.roo-cline")
            .join("tasks");
        std::fs::create_dir_all(&root).unwrap();
        let mut config = EngineConfig::default();
        config.workspace_root_override = Some(tmp.path().to_path_buf());
        let store = SkeletonStore::new(
            config,
            Arc::new(Mutex::new(RadixIndex::new())),
            Arc::new(crate::queue::IndexingQueue::new()),
        );
        (root, store)
    }

    fn write_task(root: &Path, task_id: &str, api_history: &str) {
        let dir = root.join(task_id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("api_conversation_history.json"), api_history).unwrap();
    }

    #[tokio::test]
    async fn phase1_extracts_prefixes_for_unprocessed_skeletons() {
        let tmp = TempDir::new().unwrap();
        let (root, store) = make_store(&tmp);
        write_task(
            &root,
            "parent-1",
            r#"[{"role":"assistant","content":[{"type":"text","text":"<new_task><message>build the widget</message></new_task>"}]}]"#,
        );

        store.scan(false, None, None).await;
        let (processed, extracted) = run_phase1(&store).await;
        // scan's own ANALYZE already set phase1_completed, so phase1 here
        // should find nothing left to do.
        assert_eq!(processed, 0);
        assert_eq!(extracted, 0);

        let skeleton = store.get(&TaskId::new("parent-1")).unwrap();
        assert_eq!(
            skeleton.child_task_instruction_prefixes,
            vec!["build the widget".to_string()]
        );
    }
}
