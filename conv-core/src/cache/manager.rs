//! The Anti-Leak Cache Manager (§4.E): a bounded store for derived
//! artifacts — skeletons, the prefix index, query caches — with a
//! preventive/emergency/forced eviction cascade guarding every admission.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::config::EngineConfig;
use crate::constants::defaults;
use crate::error::{Error, Result};

use super::eviction::{emergency_evict, forced_evict, preventive_evict, strategy_bytes, total_bytes};
use super::types::{CacheEntry, CacheStats, HealthStatus, Strategy};

const GIGABYTE: f64 = 1024.0 * 1024.0 * 1024.0;

pub struct AntiLeakCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ceiling_bytes: u64,
    alert_bytes: u64,
    enabled: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
    alert_count: AtomicU64,
}

impl AntiLeakCache {
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ceiling_bytes: config.anti_leak_ceiling_bytes,
            alert_bytes: config.anti_leak_alert_bytes,
            enabled: AtomicBool::new(true),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            alert_count: AtomicU64::new(0),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Admit `payload` under `key`, running the §4.E.1 pre-check cascade
    /// first. Rejects outright if the manager is disabled.
    #[instrument(skip(self, payload), fields(key, size = payload.len()))]
    pub fn store(&self, key: &str, payload: Vec<u8>, strategy: Strategy, ttl: Duration) -> Result<()> {
        if !self.is_enabled() {
            return Err(Error::ResourceLimit {
                component: "anti_leak_cache",
                context: "cache disabled".to_string(),
            });
        }

        let size_bytes = payload.len() as u64;
        let now = Utc::now();

        let mut entries = self.entries.lock().unwrap();
        self.precheck(&mut entries, strategy, size_bytes);

        entries.insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                payload,
                size_bytes,
                created_at: now,
                last_accessed_at: now,
                access_count: 0,
                ttl,
                strategy,
                locked: false,
            },
        );

        Ok(())
    }

    /// §4.E.1: evict ahead of admission if the projected total crosses the
    /// pre-check threshold, escalating preventive -> emergency -> forced.
    fn precheck(&self, entries: &mut HashMap<String, CacheEntry>, strategy: Strategy, incoming_bytes: u64) {
        let projected = total_bytes(entries) + incoming_bytes;
        let threshold = (self.ceiling_bytes as f64 * defaults::ANTI_LEAK_PRECHECK_FRACTION) as u64;

        if projected < threshold {
            return;
        }

        self.alert_count.fetch_add(1, Ordering::SeqCst);
        warn!(projected, threshold, "anti-leak pre-check threshold crossed");

        preventive_evict(entries, strategy, incoming_bytes, self.ceiling_bytes);

        let projected_after_preventive = total_bytes(entries) + incoming_bytes;
        if projected_after_preventive <= self.ceiling_bytes {
            return;
        }
        let deficit = projected_after_preventive - self.ceiling_bytes;
        emergency_evict(entries, deficit);

        let projected_after_emergency = total_bytes(entries) + incoming_bytes;
        if projected_after_emergency <= self.ceiling_bytes {
            return;
        }
        let deficit = projected_after_emergency - self.ceiling_bytes;
        forced_evict(entries, deficit);
    }

    /// Read `key`, refreshing its LRU metadata. A TTL-expired entry is
    /// evicted lazily and reported as a miss.
    pub fn get(&self, key: &str) -> Option<(Vec<u8>, chrono::DateTime<Utc>)> {
        let mut entries = self.entries.lock().unwrap();
        let now = Utc::now();

        if let Some(entry) = entries.get(key) {
            if entry.is_expired(now) {
                entries.remove(key);
                self.misses.fetch_add(1, Ordering::SeqCst);
                return None;
            }
        } else {
            self.misses.fetch_add(1, Ordering::SeqCst);
            return None;
        }

        let entry = entries.get_mut(key).expect("checked above");
        entry.last_accessed_at = now;
        entry.access_count += 1;
        self.hits.fetch_add(1, Ordering::SeqCst);
        Some((entry.payload.clone(), entry.created_at))
    }

    /// Mark `key` locked: never evicted until explicitly released.
    pub fn lock_entry(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().unwrap();
        entries
            .get_mut(key)
            .map(|e| e.locked = true)
            .is_some()
    }

    pub fn unlock_entry(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().unwrap();
        entries
            .get_mut(key)
            .map(|e| e.locked = false)
            .is_some()
    }

    /// Manual TTL sweep (§4.E `cleanup()`). Returns `(evicted, freed_gb)`.
    pub fn cleanup(&self) -> (usize, f64) {
        let mut entries = self.entries.lock().unwrap();
        let now = Utc::now();
        let expired: Vec<String> = entries
            .values()
            .filter(|e| e.is_expired(now))
            .map(|e| e.key.clone())
            .collect();

        let mut freed_bytes = 0u64;
        for key in &expired {
            if let Some(entry) = entries.remove(key) {
                freed_bytes += entry.size_bytes;
            }
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "ttl sweep evicted entries");
        }

        (expired.len(), freed_bytes as f64 / GIGABYTE)
    }

    /// Validate every entry (§4.E consistency audit); evict corrupt ones.
    /// Returns the number evicted.
    pub fn consistency_audit(&self) -> usize {
        let mut entries = self.entries.lock().unwrap();
        let corrupt: Vec<String> = entries
            .values()
            .filter(|e| !e.is_valid())
            .map(|e| e.key.clone())
            .collect();
        for key in &corrupt {
            entries.remove(key);
        }
        if !corrupt.is_empty() {
            warn!(count = corrupt.len(), "consistency audit evicted corrupt entries");
        }
        corrupt.len()
    }

    pub fn reset(&self) {
        self.entries.lock().unwrap().clear();
        self.hits.store(0, Ordering::SeqCst);
        self.misses.store(0, Ordering::SeqCst);
        self.alert_count.store(0, Ordering::SeqCst);
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock().unwrap();
        let total = total_bytes(&entries);
        let hits = self.hits.load(Ordering::SeqCst);
        let misses = self.misses.load(Ordering::SeqCst);
        let total_requests = hits + misses;

        CacheStats {
            total_size_gb: total as f64 / GIGABYTE,
            ceiling_gb: self.ceiling_bytes as f64 / GIGABYTE,
            entry_count: entries.len(),
            hit_count: hits,
            miss_count: misses,
            hit_rate: if total_requests == 0 {
                1.0
            } else {
                hits as f64 / total_requests as f64
            },
            alert_count: self.alert_count.load(Ordering::SeqCst),
        }
    }

    #[must_use]
    pub fn health_check(&self) -> HealthStatus {
        let stats = self.stats();
        let fraction = if self.ceiling_bytes == 0 {
            0.0
        } else {
            stats.total_size_gb / stats.ceiling_gb
        };

        if fraction > defaults::HEALTH_CRITICAL_FRACTION {
            HealthStatus::Critical
        } else if fraction > defaults::HEALTH_WARNING_FRACTION
            || stats.hit_rate < defaults::HEALTH_WARNING_MIN_HIT_RATE
            || stats.alert_count > defaults::HEALTH_WARNING_ALERT_COUNT
        {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        }
    }

    #[must_use]
    pub fn strategy_bytes(&self, strategy: Strategy) -> u64 {
        strategy_bytes(&self.entries.lock().unwrap(), strategy)
    }

    #[must_use]
    pub fn alert_bytes(&self) -> u64 {
        self.alert_bytes
    }
}
