//! Default values for every configurable knob named in §4 and §5.
//!
//! Grouped the way the teacher's `constants::defaults` module groups them —
//! one `const` per knob, each traceable to a spec line.

use std::time::Duration;

pub mod defaults {
    use super::Duration;

    /// Normalized child-task-instruction-prefix truncation length (§3 I3,
    /// §4.D step 2: "the normalized first N characters").
    pub const PREFIX_LENGTH: usize = 192;

    /// Skeleton store save retry count, i.e. retries *after* the initial
    /// write (§4.A: "up to 3 attempts, back-off 200 -> 400 -> 800 ms" reads
    /// as 3 retries, each preceded by the next delay in that list — the
    /// initial write has no backoff before it, so the full schedule is 4
    /// total write attempts. See [`crate::retry`].
    pub const SAVE_MAX_RETRIES: u32 = 3;
    /// Skeleton store save base backoff (doubles 200 -> 400 -> 800 ms across
    /// the 3 retries above).
    pub const SAVE_BASE_DELAY: Duration = Duration::from_millis(200);

    /// Anti-leak cache ceiling in bytes (§4.E: default 220 GB).
    pub const ANTI_LEAK_CEILING_BYTES: u64 = 220 * 1024 * 1024 * 1024;
    /// Anti-leak alert threshold in bytes (§4.E: default 200 GB).
    pub const ANTI_LEAK_ALERT_BYTES: u64 = 200 * 1024 * 1024 * 1024;
    /// Fraction of the ceiling that triggers the pre-check eviction cascade
    /// (§4.E.1: "if >= 90% of the ceiling").
    pub const ANTI_LEAK_PRECHECK_FRACTION: f64 = 0.90;
    /// Per-operation alert timeout for the anti-leak manager (§4.E / §5).
    pub const PROCESSING_TIMEOUT: Duration = Duration::from_secs(30);
    /// TTL sweep cadence (§4.E background loops).
    pub const TTL_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
    /// Consistency audit cadence, minimum (§4.E background loops: ">= 24h").
    pub const CONSISTENCY_AUDIT_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

    /// Health-status thresholds (§4.E health status derivation).
    pub const HEALTH_CRITICAL_FRACTION: f64 = 0.95;
    pub const HEALTH_WARNING_FRACTION: f64 = 0.80;
    pub const HEALTH_WARNING_MIN_HIT_RATE: f64 = 0.30;
    pub const HEALTH_WARNING_ALERT_COUNT: u64 = 10;

    /// Hierarchy reconstruction global deadline (§4.D / §5: default 300s / 5min).
    pub const RECONSTRUCTION_DEADLINE: Duration = Duration::from_secs(300);

    /// Indexing queue defaults (§4.F has no explicit numeric defaults; these
    /// mirror the teacher's queue worker/back-pressure conventions).
    pub const QUEUE_MAX_SIZE: usize = 10_000;
}
