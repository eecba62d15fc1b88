//! The Indexing Queue & Scheduler (§4.F): a set-semantics queue that
//! propagates "this skeleton is now stable" events to an external
//! downstream consumer (typically a semantic-embedding worker).

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::debug;

use crate::types::TaskId;

struct QueueInner {
    order: VecDeque<TaskId>,
    members: HashSet<TaskId>,
}

/// Membership-deduplicated, insertion-ordered queue of task IDs awaiting
/// downstream processing. `enqueue` is called by the Skeleton Store after
/// every successful write and by the Hierarchy Engine after every parent
/// link assignment.
pub struct IndexingQueue {
    inner: Mutex<QueueInner>,
    enabled: AtomicBool,
}

impl Default for IndexingQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexingQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                order: VecDeque::new(),
                members: HashSet::new(),
            }),
            enabled: AtomicBool::new(true),
        }
    }

    /// Record `task_id`, deduplicated (P6). Recorded even when the queue is
    /// disabled — only `take_batch` observes the `enabled` flag.
    pub fn enqueue(&self, task_id: TaskId) {
        let mut inner = self.inner.lock().unwrap();
        if inner.members.insert(task_id.clone()) {
            inner.order.push_back(task_id);
        }
    }

    /// Drain up to `max_n` entries in insertion order. Returns empty while
    /// disabled, without discarding anything already queued.
    pub fn take_batch(&self, max_n: usize) -> Vec<TaskId> {
        if !self.is_enabled() {
            return Vec::new();
        }
        let mut inner = self.inner.lock().unwrap();
        let mut batch = Vec::with_capacity(max_n.min(inner.order.len()));
        for _ in 0..max_n {
            let Some(task_id) = inner.order.pop_front() else {
                break;
            };
            inner.members.remove(&task_id);
            batch.push(task_id);
        }
        debug!(drained = batch.len(), "indexing queue take_batch");
        batch
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
