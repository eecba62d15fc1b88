//! The canonical owned records of §3: `TaskId` and `Skeleton`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::defaults::PREFIX_LENGTH;

/// An opaque, canonical task identifier.
///
/// Equal to the raw-task-directory name it was derived from (I1). Never
/// parsed for timestamp information — directory names are opaque handles in
/// this crate, not encoded dates, confirmed by the reference task-storage
/// layout this spec describes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Creation and most-recent-activity timestamps for a skeleton.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Aggregate counters accumulated during `ANALYZE` (§4.A).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Counts {
    pub messages: u64,
    pub actions: u64,
    pub total_bytes: u64,
}

/// Per-skeleton progress flags for the two-phase hierarchy reconstruction
/// (§4.D), plus any processing-error strings accumulated across restarts
/// (§7 class 3: "retained across restarts via `processing_state.errors`").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingState {
    pub phase1_completed: bool,
    pub phase2_completed: bool,
    pub last_processed_at: Option<DateTime<Utc>>,
    pub errors: Vec<String>,
}

impl ProcessingState {
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}

/// Hashes of the three raw files, used to detect a skeleton gone stale
/// relative to its raw directory without relying solely on mtimes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceChecksums {
    pub task_metadata: Option<String>,
    pub api_conversation_history: Option<String>,
    pub ui_messages: Option<String>,
}

/// The canonical owned record derived from a raw task directory (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skeleton {
    pub task_id: TaskId,
    pub parent_task_id: Option<TaskId>,
    pub workspace: Option<String>,
    pub timestamps: Timestamps,
    pub counts: Counts,
    pub child_task_instruction_prefixes: Vec<String>,
    pub processing_state: ProcessingState,
    pub source_checksums: Option<SourceChecksums>,

    /// Unknown fields are preserved verbatim on round-trip (§9: "unknown
    /// fields preserved via an opaque extension map to survive format
    /// evolution"). Never populated by this crate; only carried through.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Skeleton {
    #[must_use]
    pub fn new(task_id: TaskId, created_at: DateTime<Utc>) -> Self {
        Self {
            task_id,
            parent_task_id: None,
            workspace: None,
            timestamps: Timestamps {
                created_at,
                last_activity: created_at,
            },
            counts: Counts::default(),
            child_task_instruction_prefixes: Vec::new(),
            processing_state: ProcessingState::default(),
            source_checksums: None,
            extra: BTreeMap::new(),
        }
    }

    /// Append a normalized child-task instruction prefix, keeping the
    /// sequence deduplicated and insertion-ordered (I3).
    pub fn add_child_prefix(&mut self, prefix: impl Into<String>) {
        let prefix = normalize_prefix(&prefix.into());
        if !self.child_task_instruction_prefixes.contains(&prefix) {
            self.child_task_instruction_prefixes.push(prefix);
        }
    }

    /// Attempt to set `parent_task_id`, rejecting a self-loop (I4).
    ///
    /// Returns `false` (and leaves `parent_task_id` unchanged) if `parent`
    /// equals this skeleton's own `task_id`.
    #[must_use]
    pub fn set_parent(&mut self, parent: TaskId) -> bool {
        if parent == self.task_id {
            return false;
        }
        self.parent_task_id = Some(parent);
        true
    }

    #[must_use]
    pub fn is_orphan(&self) -> bool {
        self.parent_task_id.is_none()
    }
}

/// Normalize text into the canonical form used for prefixes and opening-text
/// comparisons (I3, §4.D step 2): lowercase, whitespace-collapsed, truncated
/// to [`PREFIX_LENGTH`] chars.
#[must_use]
pub fn normalize_prefix(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let lowercased = collapsed.to_lowercase();
    lowercased.chars().take(PREFIX_LENGTH).collect()
}
