//! Entry and strategy shapes for the Anti-Leak Cache Manager (§4.E).

use std::time::Duration;

use chrono::{DateTime, Utc};

/// The closed set of caching strategies, each with its own cap (percent of
/// the global ceiling), max age, and eviction priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Aggressive,
    Moderate,
    Conservative,
    Bypass,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Aggressive,
        Strategy::Moderate,
        Strategy::Conservative,
        Strategy::Bypass,
    ];

    /// Emergency-eviction visiting order (§4.E.1), distinct from priority
    /// number because `bypass` and `aggressive` share priority 1.
    pub const EMERGENCY_ORDER: [Strategy; 4] = [
        Strategy::Bypass,
        Strategy::Aggressive,
        Strategy::Moderate,
        Strategy::Conservative,
    ];

    #[must_use]
    pub fn cap_fraction(self) -> f64 {
        match self {
            Strategy::Aggressive => 0.25,
            Strategy::Moderate => 0.50,
            Strategy::Conservative => 0.30,
            Strategy::Bypass => 0.05,
        }
    }

    #[must_use]
    pub fn max_age(self) -> Duration {
        match self {
            Strategy::Aggressive => Duration::from_secs(60 * 60),
            Strategy::Moderate => Duration::from_secs(6 * 60 * 60),
            Strategy::Conservative => Duration::from_secs(24 * 60 * 60),
            Strategy::Bypass => Duration::from_secs(5 * 60),
        }
    }

    #[must_use]
    pub fn eviction_priority(self) -> u8 {
        match self {
            Strategy::Aggressive | Strategy::Bypass => 1,
            Strategy::Moderate => 2,
            Strategy::Conservative => 3,
        }
    }
}

/// One cached artifact (§4.E "Entry").
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Vec<u8>,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub access_count: u64,
    pub ttl: Duration,
    pub strategy: Strategy,
    pub locked: bool,
}

impl CacheEntry {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.created_at);
        age.to_std().map(|age| age > self.ttl).unwrap_or(false)
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.payload.is_empty() || self.size_bytes == 0
    }
}

/// Per-strategy size accounting surfaced by [`super::AntiLeakCache::stats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StrategyStats {
    pub entry_count: usize,
    pub total_bytes: u64,
}

/// Aggregate observational snapshot (§4.E `stats()`).
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub total_size_gb: f64,
    pub ceiling_gb: f64,
    pub entry_count: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
    pub alert_count: u64,
}

/// Derived health classification (§4.E "Health status derivation").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}
