/// Outcome of one [`super::HierarchyEngine::reconstruct`] invocation (§4.D).
///
/// Always returned, even on an early timeout: partial progress is never
/// rolled back, and a subsequent invocation resumes safely from the
/// `phase{1,2}_completed` flags and whatever parent links were already
/// persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructionReport {
    pub phase1_processed: usize,
    pub phase1_instructions_extracted: usize,
    pub resolved_count: usize,
    pub unresolved_count: usize,
    pub timeout_reached: bool,
}
