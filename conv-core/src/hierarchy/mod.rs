//! The Hierarchy Reconstruction Engine (§4.D): two-phase, checkpointed
//! parent/child resolution across the in-memory skeleton set.

mod phase1;
mod phase2;
mod report;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::instrument;

pub use report::ReconstructionReport;

use crate::radix::RadixIndex;
use crate::skeleton::SkeletonStore;

/// Owns no state of its own beyond the deadline; everything it touches is
/// borrowed from the composition root's [`SkeletonStore`] and
/// [`RadixIndex`] (§9: "owned top-level values ... passed by reference").
pub struct HierarchyEngine {
    store: Arc<SkeletonStore>,
    radix: Arc<Mutex<RadixIndex>>,
    deadline: Duration,
}

impl HierarchyEngine {
    #[must_use]
    pub fn new(store: Arc<SkeletonStore>, radix: Arc<Mutex<RadixIndex>>, deadline: Duration) -> Self {
        Self {
            store,
            radix,
            deadline,
        }
    }

    /// Run Phase 1 then Phase 2, checking the global deadline at each of
    /// the four checkpoints named in §4.D. Always returns a report, even on
    /// an early timeout; re-invocation resumes safely.
    #[instrument(skip(self))]
    pub async fn reconstruct(&self) -> ReconstructionReport {
        let deadline = Instant::now() + self.deadline;
        let mut report = ReconstructionReport::default();

        // Checkpoint: before Phase 1.
        if Instant::now() >= deadline {
            report.timeout_reached = true;
            return report;
        }

        let (processed, extracted) = phase1::run_phase1(&self.store).await;
        report.phase1_processed = processed;
        report.phase1_instructions_extracted = extracted;

        // Checkpoint: before Phase 2 (which itself brackets the
        // resolution/persistence loop with a per-candidate deadline check,
        // satisfying the "before/after persistence loop" checkpoints with
        // partial-progress semantics).
        if Instant::now() >= deadline {
            report.timeout_reached = true;
            return report;
        }

        let (resolved, unresolved, timed_out) =
            phase2::run_phase2(&self.store, &self.radix, deadline).await;
        report.resolved_count = resolved;
        report.unresolved_count = unresolved;
        report.timeout_reached = timed_out;

        report
    }
}
