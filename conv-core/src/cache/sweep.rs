//! The Anti-Leak Cache Manager's cooperative background loops (§4.E):
//! a TTL sweep every 5 min and a consistency audit every >= 24 h, both
//! driven by a single timer wheel owned by the composition root (§9).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use super::manager::AntiLeakCache;

/// Runs until `shutdown` reports `true`. Intended to be spawned once by the
/// composition root alongside [`consistency_audit_loop`].
pub async fn ttl_sweep_loop(
    cache: Arc<AntiLeakCache>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await; // first tick fires immediately; skip it

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let (evicted, freed_gb) = cache.cleanup();
                debug!(evicted, freed_gb, "ttl sweep tick");
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("ttl sweep loop shutting down");
                    return;
                }
            }
        }
    }
}

/// Runs until `shutdown` reports `true`.
pub async fn consistency_audit_loop(
    cache: Arc<AntiLeakCache>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let evicted = cache.consistency_audit();
                debug!(evicted, "consistency audit tick");
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("consistency audit loop shutting down");
                    return;
                }
            }
        }
    }
}
