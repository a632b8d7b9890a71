//! Periodic sweep of the failed-login tracker.
//!
//! Lazy pruning only touches keys that see new failures; the sweeper bounds
//! memory for keys that never come back.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use custodia_core::Clock;
use custodia_security::FailedLoginTracker;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweeperStats {
    pub sweeps: u64,
    pub keys_dropped: u64,
}

/// Handle to a running sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
    stats: Arc<Mutex<SweeperStats>>,
}

impl SweeperHandle {
    pub fn stats(&self) -> SweeperStats {
        self.stats.lock().map(|s| *s).unwrap_or_default()
    }

    /// Stop the sweeper and wait for the task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.join.await;
    }
}

/// Spawn a tokio task that sweeps `tracker` every `interval`.
///
/// Must be called from within a tokio runtime.
pub fn spawn_tracker_sweeper(
    tracker: Arc<FailedLoginTracker>,
    clock: Arc<dyn Clock>,
    interval: Duration,
) -> SweeperHandle {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
    let stats = Arc::new(Mutex::new(SweeperStats::default()));
    let task_stats = stats.clone();

    let join = tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "tracker sweeper started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = ticker.tick() => {
                    let dropped = tracker.sweep(clock.now());
                    debug!(dropped, remaining = tracker.tracked_keys(), "failed-login tracker swept");
                    if let Ok(mut s) = task_stats.lock() {
                        s.sweeps += 1;
                        s.keys_dropped += dropped as u64;
                    }
                }
            }
        }

        info!("tracker sweeper stopped");
    });

    SweeperHandle {
        shutdown: Some(shutdown_tx),
        join,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use custodia_core::{IdentityFingerprint, ManualClock};
    use custodia_security::FailedLoginConfig;

    #[tokio::test]
    async fn sweeper_drops_stale_keys_and_stops_on_shutdown() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(t0));
        let tracker = Arc::new(FailedLoginTracker::new(FailedLoginConfig::default(), clock.clone()));
        tracker
            .record_failure(&IdentityFingerprint::of_login("alice@acme.test"), None, t0)
            .unwrap();

        clock.advance(chrono::Duration::minutes(10));
        let handle = spawn_tracker_sweeper(tracker.clone(), clock.clone(), Duration::from_millis(10));

        let mut waited = 0;
        while tracker.tracked_keys() > 0 && waited < 100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            waited += 1;
        }
        assert_eq!(tracker.tracked_keys(), 0);
        assert!(handle.stats().sweeps >= 1);
        assert_eq!(handle.stats().keys_dropped, 1);

        handle.shutdown().await;
    }
}
