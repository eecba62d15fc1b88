//! Phase 2 — strict resolution (§4.D).

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::radix::RadixIndex;
use crate::skeleton::{opening_text_for_dir, SkeletonStore};
use crate::types::{Skeleton, TaskId};

/// Rebuild the radix index from the current union of every in-memory
/// skeleton's prefixes (§5: "always rebuilt at the start of Phase 2 ...
/// to guarantee freshness").
pub fn rebuild_radix(store: &SkeletonStore, radix: &Mutex<RadixIndex>) {
    let mut index = radix.lock().unwrap();
    index.clear();
    for skeleton in store.all() {
        for prefix in &skeleton.child_task_instruction_prefixes {
            index.add(skeleton.task_id.clone(), prefix);
        }
    }
}

/// Run Phase 2 to completion or until `deadline` passes. Returns
/// `(resolved_count, unresolved_count, timeout_reached)`.
pub async fn run_phase2(
    store: &SkeletonStore,
    radix: &Mutex<RadixIndex>,
    deadline: Instant,
) -> (usize, usize, bool) {
    rebuild_radix(store, radix);

    let candidates: Vec<Skeleton> = store
        .all()
        .into_iter()
        .filter(|s| s.is_orphan() && !s.processing_state.phase2_completed)
        .collect();

    let mut resolved = 0usize;
    let mut unresolved = 0usize;

    for child in candidates {
        if Instant::now() >= deadline {
            return (resolved, unresolved, true);
        }
        if resolve_one(store, radix, child).await {
            resolved += 1;
        } else {
            unresolved += 1;
        }
    }

    (resolved, unresolved, false)
}

/// Resolve a single candidate child. Returns `true` if a parent was
/// assigned. Always marks `phase2_completed = true` (step 8) regardless of
/// outcome, and always persists (best-effort: a persist failure leaves the
/// in-memory link set and is reconciled on the next scan).
async fn resolve_one(store: &SkeletonStore, radix: &Mutex<RadixIndex>, child: Skeleton) -> bool {
    let opening = match store
        .raw_dir_for(&child.task_id)
        .and_then(|dir| opening_text_for_dir(&dir).ok().flatten())
    {
        Some(o) => o,
        None => {
            finish(store, child, None).await;
            return false;
        }
    };

    let candidate_ids = radix.lock().unwrap().exact_lookup(&opening);

    let mut scored: Vec<(TaskId, usize, DateTime<Utc>)> = Vec::new();
    for candidate_id in candidate_ids {
        if candidate_id == child.task_id {
            continue;
        }
        let Some(parent) = store.get(&candidate_id) else {
            continue;
        };
        let matched_len = longest_matching_prefix_len(&parent, &opening);
        if matched_len == 0 {
            continue;
        }
        if would_introduce_cycle(store, &child.task_id, &candidate_id) {
            debug!(child = %child.task_id, candidate = %candidate_id, "cycle rejected");
            continue;
        }
        scored.push((candidate_id, matched_len, parent.timestamps.last_activity));
    }

    let winner = disambiguate(&scored, child.timestamps.created_at);
    if winner.is_none() {
        info!(child = %child.task_id, candidates = scored.len(), "unresolved after disambiguation");
    }
    let resolved = winner.is_some();
    finish(store, child, winner).await;
    resolved
}

async fn finish(store: &SkeletonStore, mut child: Skeleton, winner: Option<TaskId>) {
    child.processing_state.phase2_completed = true;
    let task_id = child.task_id.clone();
    let assigned_parent = winner.is_some();
    if let Some(winner) = winner {
        child.set_parent(winner);
    }
    match store.save(child).await {
        Ok(()) => {
            if assigned_parent {
                // §4.F: D enqueues after every parent link assignment.
                store.queue().enqueue(task_id);
            }
        }
        Err(e) => {
            warn!(error = ?e, "phase 2 persist failed, will reconcile on next scan");
        }
    }
}

/// The length (in chars) of the longest entry in `parent`'s declared
/// prefixes that is an exact prefix of `opening`, or 0 if none match.
fn longest_matching_prefix_len(parent: &Skeleton, opening: &str) -> usize {
    parent
        .child_task_instruction_prefixes
        .iter()
        .filter(|p| opening.starts_with(p.as_str()))
        .map(|p| p.chars().count())
        .max()
        .unwrap_or(0)
}

/// Walk the proposed parent chain starting at `candidate`; reject if
/// `child` would be reachable (step 5).
fn would_introduce_cycle(store: &SkeletonStore, child: &TaskId, candidate: &TaskId) -> bool {
    let mut visited = HashSet::new();
    let mut current = Some(candidate.clone());
    while let Some(cur) = current {
        if cur == *child {
            return true;
        }
        if !visited.insert(cur.clone()) {
            break;
        }
        current = store.get(&cur).and_then(|s| s.parent_task_id);
    }
    false
}

/// Step 6: (a) longest match wins; (b) among ties, the candidate whose
/// `last_activity` precedes the child's `created_at` and is most recent;
/// (c) if still tied, unresolved.
fn disambiguate(
    scored: &[(TaskId, usize, DateTime<Utc>)],
    child_created_at: DateTime<Utc>,
) -> Option<TaskId> {
    let max_len = scored.iter().map(|(_, len, _)| *len).max()?;
    let longest: Vec<_> = scored.iter().filter(|(_, len, _)| *len == max_len).collect();
    if longest.len() == 1 {
        return Some(longest[0].0.clone());
    }

    let mut eligible: Vec<_> = longest
        .into_iter()
        .filter(|(_, _, last_activity)| *last_activity < child_created_at)
        .collect();
    eligible.sort_by_key(|(_, _, last_activity)| *last_activity);

    let (candidate, _, best_activity) = eligible.last()?;
    let tied = eligible
        .iter()
        .filter(|(_, _, last_activity)| last_activity == best_activity)
        .count();
    if tied == 1 {
        Some(candidate.clone())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tid(s: &str) -> TaskId {
        TaskId::new(s)
    }

    fn scored_entry(id: &str, len: usize, last_activity: DateTime<Utc>) -> (TaskId, usize, DateTime<Utc>) {
        (tid(id), len, last_activity)
    }

    #[test]
    fn disambiguate_prefers_longest_match() {
        let now = Utc::now();
        let scored = vec![
            scored_entry("a", 13, now),
            scored_entry("c", 28, now),
        ];
        assert_eq!(disambiguate(&scored, now), Some(tid("c")));
    }

    #[test]
    fn disambiguate_unresolved_when_fully_tied() {
        let now = Utc::now();
        let scored = vec![scored_entry("a", 10, now), scored_entry("b", 10, now)];
        // both candidates have last_activity == now, neither precedes
        // child_created_at == now, so the eligible set is empty.
        assert_eq!(disambiguate(&scored, now), None);
    }

    #[test]
    fn disambiguate_empty_scored_is_none() {
        assert_eq!(disambiguate(&[], Utc::now()), None);
    }

    /// P1: disambiguate never returns the child's own id — `resolve_one`
    /// already filters self-candidates out of `scored` before this point,
    /// so no winner can close a zero-length cycle back to the child.
    #[test]
    fn p1_disambiguate_never_returns_a_candidate_absent_from_scored() {
        let now = Utc::now();
        let scored = vec![scored_entry("only-candidate", 5, now - chrono::Duration::seconds(1))];
        let winner = disambiguate(&scored, now).unwrap();
        assert!(scored.iter().any(|(id, _, _)| *id == winner));
    }

    /// P2: `longest_matching_prefix_len` — the function that feeds
    /// `scored` — returns 0 (excluded from candidacy) unless the parent
    /// has a declared prefix that is an exact prefix of the opening text.
    #[test]
    fn p2_prefix_justification_requires_exact_prefix_match() {
        let mut parent = Skeleton::new(tid("parent"), Utc::now());
        parent.add_child_prefix("build the widget");
        assert_eq!(longest_matching_prefix_len(&parent, "build the widget now"), "build the widget".len());
        assert_eq!(longest_matching_prefix_len(&parent, "unrelated text"), 0);
    }
}
