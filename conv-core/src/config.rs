//! Environment-driven configuration (§6 "Environment configuration").
//!
//! Mirrors the override-via-env convention the teacher's CLI config layer
//! uses, but scoped to only the knobs the core itself consumes.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::defaults;

/// Every tunable the core reads from the environment, with the spec's
/// defaults applied when the variable is absent or unparsable.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// `ROO_EXTENSIONS_PATH` — workspace-root override for filesystem probes.
    pub workspace_root_override: Option<PathBuf>,
    /// `SHARED_STATE_PATH` / `ROOSYNC_SHARED_PATH` — shared-state inventory
    /// directory override. Consumed-not-owned: the core never writes here.
    pub shared_state_path: Option<PathBuf>,
    /// `ROOSYNC_MACHINE_ID` — identity tag for any outbound local-machine
    /// record. Stored on skeletons written by this process but never
    /// required for core operation.
    pub machine_id: Option<String>,

    pub anti_leak_ceiling_bytes: u64,
    pub anti_leak_alert_bytes: u64,
    pub ttl_sweep_interval: Duration,
    pub consistency_audit_interval: Duration,
    pub processing_timeout: Duration,
    pub reconstruction_deadline: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workspace_root_override: None,
            shared_state_path: None,
            machine_id: None,
            anti_leak_ceiling_bytes: defaults::ANTI_LEAK_CEILING_BYTES,
            anti_leak_alert_bytes: defaults::ANTI_LEAK_ALERT_BYTES,
            ttl_sweep_interval: defaults::TTL_SWEEP_INTERVAL,
            consistency_audit_interval: defaults::CONSISTENCY_AUDIT_INTERVAL,
            processing_timeout: defaults::PROCESSING_TIMEOUT,
            reconstruction_deadline: defaults::RECONSTRUCTION_DEADLINE,
        }
    }
}

impl EngineConfig {
    /// Build a config from built-in defaults overridden by whatever
    /// recognized environment variables are present. Unparsable numeric
    /// overrides are ignored (defaults kept) and logged — a malformed
    /// environment value for a non-essential tunable must never stop the
    /// core from serving unaffected operations (§7 class 7).
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.workspace_root_override = env::var_os("ROO_EXTENSIONS_PATH").map(PathBuf::from);

        config.shared_state_path = env::var_os("SHARED_STATE_PATH")
            .or_else(|| env::var_os("ROOSYNC_SHARED_PATH"))
            .map(PathBuf::from);

        config.machine_id = env::var("ROOSYNC_MACHINE_ID").ok();

        if let Some(v) = env_u64("CONV_CORE_ANTI_LEAK_CEILING_BYTES") {
            config.anti_leak_ceiling_bytes = v;
        }
        if let Some(v) = env_u64("CONV_CORE_ANTI_LEAK_ALERT_BYTES") {
            config.anti_leak_alert_bytes = v;
        }
        if let Some(v) = env_duration_secs("CONV_CORE_TTL_SWEEP_INTERVAL_SECS") {
            config.ttl_sweep_interval = v;
        }
        if let Some(v) = env_duration_secs("CONV_CORE_CONSISTENCY_AUDIT_INTERVAL_SECS") {
            config.consistency_audit_interval = v;
        }
        if let Some(v) = env_duration_secs("CONV_CORE_PROCESSING_TIMEOUT_SECS") {
            config.processing_timeout = v;
        }
        if let Some(v) = env_duration_secs("CONV_CORE_RECONSTRUCTION_DEADLINE_SECS") {
            config.reconstruction_deadline = v;
        }

        config
    }
}

fn env_u64(key: &str) -> Option<u64> {
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(key, raw, "ignoring unparsable environment override");
                None
            }
        },
        Err(_) => None,
    }
}

fn env_duration_secs(key: &str) -> Option<Duration> {
    env_u64(key).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = EngineConfig::default();
        assert_eq!(config.anti_leak_ceiling_bytes, 220 * 1024 * 1024 * 1024);
        assert_eq!(config.anti_leak_alert_bytes, 200 * 1024 * 1024 * 1024);
        assert_eq!(config.reconstruction_deadline, Duration::from_secs(300));
    }
}
