//! The §4.E.1 anti-leak pre-check eviction cascade: preventive, then
//! emergency, then forced.

use std::collections::HashMap;

use tracing::{info, warn};

use super::types::{CacheEntry, Strategy};

#[must_use]
pub fn total_bytes(entries: &HashMap<String, CacheEntry>) -> u64 {
    entries.values().map(|e| e.size_bytes).sum()
}

#[must_use]
pub fn strategy_bytes(entries: &HashMap<String, CacheEntry>, strategy: Strategy) -> u64 {
    entries
        .values()
        .filter(|e| e.strategy == strategy)
        .map(|e| e.size_bytes)
        .sum()
}

/// Evict, oldest-accessed-first, unlocked entries of `strategy` until that
/// strategy's own cap (a fraction of `ceiling_bytes`) would accommodate
/// `incoming_bytes`. Returns bytes freed.
pub fn preventive_evict(
    entries: &mut HashMap<String, CacheEntry>,
    strategy: Strategy,
    incoming_bytes: u64,
    ceiling_bytes: u64,
) -> u64 {
    let cap = (ceiling_bytes as f64 * strategy.cap_fraction()) as u64;
    let mut freed = 0u64;

    loop {
        let current = strategy_bytes(entries, strategy);
        if current + incoming_bytes <= cap {
            break;
        }
        let Some(victim_key) = oldest_unlocked_key(entries, Some(strategy)) else {
            break;
        };
        if let Some(entry) = entries.remove(&victim_key) {
            info!(key = %victim_key, strategy = ?strategy, "preventive eviction");
            freed += entry.size_bytes;
        } else {
            break;
        }
    }

    freed
}

/// Visit strategies in `Strategy::EMERGENCY_ORDER`, evicting oldest entries
/// of each until `deficit_bytes` has been freed or every strategy is
/// exhausted.
pub fn emergency_evict(entries: &mut HashMap<String, CacheEntry>, deficit_bytes: u64) -> u64 {
    let mut freed = 0u64;

    for strategy in Strategy::EMERGENCY_ORDER {
        while freed < deficit_bytes {
            let Some(victim_key) = oldest_unlocked_key(entries, Some(strategy)) else {
                break;
            };
            if let Some(entry) = entries.remove(&victim_key) {
                warn!(key = %victim_key, strategy = ?strategy, "emergency eviction");
                freed += entry.size_bytes;
            } else {
                break;
            }
        }
        if freed >= deficit_bytes {
            break;
        }
    }

    freed
}

/// Last resort: evict globally oldest non-locked entries regardless of
/// strategy until `deficit_bytes` has been freed.
pub fn forced_evict(entries: &mut HashMap<String, CacheEntry>, deficit_bytes: u64) -> u64 {
    let mut freed = 0u64;
    while freed < deficit_bytes {
        let Some(victim_key) = oldest_unlocked_key(entries, None) else {
            break;
        };
        if let Some(entry) = entries.remove(&victim_key) {
            warn!(key = %victim_key, "forced eviction");
            freed += entry.size_bytes;
        } else {
            break;
        }
    }
    freed
}

/// The key of the oldest (by `last_accessed_at`), non-locked entry,
/// optionally restricted to one strategy.
fn oldest_unlocked_key(
    entries: &HashMap<String, CacheEntry>,
    strategy: Option<Strategy>,
) -> Option<String> {
    entries
        .values()
        .filter(|e| !e.locked)
        .filter(|e| strategy.map(|s| e.strategy == s).unwrap_or(true))
        .min_by_key(|e| e.last_accessed_at)
        .map(|e| e.key.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::time::Duration;

    fn entry(key: &str, strategy: Strategy, size_bytes: u64, age_secs: i64) -> CacheEntry {
        let created = Utc::now() - ChronoDuration::seconds(age_secs);
        CacheEntry {
            key: key.to_string(),
            payload: vec![0u8; 1],
            size_bytes,
            created_at: created,
            last_accessed_at: created,
            access_count: 0,
            ttl: Duration::from_secs(3600),
            strategy,
            locked: false,
        }
    }

    #[test]
    fn preventive_eviction_frees_until_cap_holds() {
        let mut entries = HashMap::new();
        for i in 0..4 {
            let e = entry(&format!("a{i}"), Strategy::Aggressive, 2, (4 - i) as i64);
            entries.insert(e.key.clone(), e);
        }
        // ceiling 10, aggressive cap 25% = 2 bytes (rounded by cap calc);
        // force eviction by using a ceiling where cap < current + incoming.
        let freed = preventive_evict(&mut entries, Strategy::Aggressive, 2, 10);
        assert!(freed > 0);
        assert!(strategy_bytes(&entries, Strategy::Aggressive) + 2 <= (10f64 * 0.25) as u64);
    }

    #[test]
    fn locked_entries_are_never_evicted() {
        let mut entries = HashMap::new();
        let mut e = entry("locked", Strategy::Aggressive, 100, 100);
        e.locked = true;
        entries.insert(e.key.clone(), e);
        let freed = forced_evict(&mut entries, 100);
        assert_eq!(freed, 0);
        assert!(entries.contains_key("locked"));
    }

    #[test]
    fn emergency_eviction_visits_bypass_before_conservative() {
        let mut entries = HashMap::new();
        entries.insert(
            "c".to_string(),
            entry("c", Strategy::Conservative, 5, 10),
        );
        entries.insert("byp".to_string(), entry("byp", Strategy::Bypass, 5, 10));
        let freed = emergency_evict(&mut entries, 5);
        assert_eq!(freed, 5);
        assert!(!entries.contains_key("byp"));
        assert!(entries.contains_key("c"));
    }
}
