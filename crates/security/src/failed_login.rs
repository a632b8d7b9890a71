//! Sliding-window counter of authentication failures.
//!
//! State is process-local and resets on restart. Under horizontal scaling each
//! instance sees only its own share of a distributed attack.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};

use custodia_core::{Clock, IdentityFingerprint};

use crate::TrackerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedLoginConfig {
    /// A key is over threshold when it has strictly more failures than this.
    pub threshold: u32,
    pub window: Duration,
    /// Upper bound on tracked identities plus tracked IPs.
    pub max_tracked_keys: usize,
}

impl Default for FailedLoginConfig {
    fn default() -> Self {
        Self {
            threshold: 5,
            window: Duration::minutes(5),
            max_tracked_keys: 100_000,
        }
    }
}

impl FailedLoginConfig {
    /// Whether the `count`-th failure constitutes a breach to report.
    ///
    /// The first breach is the failure that takes the count past the
    /// threshold; after that, every further `threshold + 1` failures within the
    /// window is another breach.
    pub fn is_breach(&self, count: u32) -> bool {
        let step = self.threshold.saturating_add(1);
        count >= step && (count - step) % step == 0
    }
}

/// Counts after recording one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureCount {
    pub identity: u32,
    /// `None` when no IP was supplied or the IP could not be tracked.
    pub ip: Option<u32>,
    pub breached: bool,
}

#[derive(Debug)]
struct Windows<K> {
    entries: HashMap<K, VecDeque<DateTime<Utc>>>,
}

impl<K> Default for Windows<K> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Hash + Eq + Clone> Windows<K> {
    fn prune(queue: &mut VecDeque<DateTime<Utc>>, cutoff: DateTime<Utc>) {
        while queue.front().is_some_and(|t| *t <= cutoff) {
            queue.pop_front();
        }
    }

    fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    fn record(&mut self, key: &K, at: DateTime<Utc>, window: Duration) -> u32 {
        let queue = self.entries.entry(key.clone()).or_default();
        Self::prune(queue, at - window);
        let pos = queue.partition_point(|t| *t <= at);
        queue.insert(pos, at);
        queue.len() as u32
    }

    fn count(&mut self, key: &K, now: DateTime<Utc>, window: Duration) -> u32 {
        let Some(queue) = self.entries.get_mut(key) else {
            return 0;
        };
        Self::prune(queue, now - window);
        let count = queue.len() as u32;
        if count == 0 {
            self.entries.remove(key);
        }
        count
    }

    fn clear(&mut self, key: &K) {
        self.entries.remove(key);
    }

    fn sweep(&mut self, now: DateTime<Utc>, window: Duration) -> usize {
        let cutoff = now - window;
        let before = self.entries.len();
        self.entries.retain(|_, queue| {
            Self::prune(queue, cutoff);
            !queue.is_empty()
        });
        before - self.entries.len()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Default)]
struct State {
    identities: Windows<IdentityFingerprint>,
    ips: Windows<IpAddr>,
}

impl State {
    fn tracked_keys(&self) -> usize {
        self.identities.len() + self.ips.len()
    }
}

/// Per-identity and per-IP failure windows behind one lock, so concurrent
/// increments on the same key are never lost.
pub struct FailedLoginTracker {
    config: FailedLoginConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

impl FailedLoginTracker {
    pub fn new(config: FailedLoginConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            state: Mutex::new(State::default()),
        }
    }

    pub fn config(&self) -> &FailedLoginConfig {
        &self.config
    }

    /// Windows are well-formed after every mutation; a poisoned lock is
    /// recovered rather than reported.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("failed-login tracker lock was poisoned; recovering state");
            self.state.clear_poison();
            poisoned.into_inner()
        })
    }

    /// Record one failure and return the counts inside the window ending at `at`.
    ///
    /// When the key budget is exhausted a sweep runs first; if the identity is
    /// still new and there is no room, the failure is refused with
    /// [`TrackerError::AtCapacity`] rather than evicting live keys.
    pub fn record_failure(
        &self,
        identity: &IdentityFingerprint,
        ip: Option<IpAddr>,
        at: DateTime<Utc>,
    ) -> Result<FailureCount, TrackerError> {
        let window = self.config.window;
        let max = self.config.max_tracked_keys;
        let mut state = self.lock();

        if !state.identities.contains(identity) && state.tracked_keys() >= max {
            let dropped = state.identities.sweep(at, window) + state.ips.sweep(at, window);
            tracing::debug!(dropped, "failed-login tracker swept at capacity");
            if state.tracked_keys() >= max {
                return Err(TrackerError::AtCapacity(max));
            }
        }
        let identity_count = state.identities.record(identity, at, window);

        let ip_count = match ip {
            Some(ip) if state.ips.contains(&ip) || state.tracked_keys() < max => {
                Some(state.ips.record(&ip, at, window))
            }
            Some(_) => {
                tracing::debug!("failed-login tracker has no room for a new source ip");
                None
            }
            None => None,
        };

        Ok(FailureCount {
            identity: identity_count,
            ip: ip_count,
            breached: self.config.is_breach(identity_count),
        })
    }

    /// Failures for `identity` inside the window ending now.
    pub fn count(&self, identity: &IdentityFingerprint) -> u32 {
        let now = self.clock.now();
        self.lock().identities.count(identity, now, self.config.window)
    }

    pub fn is_over_threshold(&self, identity: &IdentityFingerprint) -> bool {
        self.count(identity) > self.config.threshold
    }

    pub fn ip_count(&self, ip: IpAddr) -> u32 {
        let now = self.clock.now();
        self.lock().ips.count(&ip, now, self.config.window)
    }

    pub fn is_ip_over_threshold(&self, ip: IpAddr) -> bool {
        self.ip_count(ip) > self.config.threshold
    }

    /// Forget the identity's failures after a successful login. IP windows are
    /// left alone: one good password does not vouch for the whole source.
    pub fn record_success(&self, identity: &IdentityFingerprint) {
        self.lock().identities.clear(identity);
    }

    /// Drop every key with no failure newer than `now - window`. Returns the
    /// number of keys removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let window = self.config.window;
        let mut state = self.lock();
        state.identities.sweep(now, window) + state.ips.sweep(now, window)
    }

    pub fn tracked_keys(&self) -> usize {
        self.lock().tracked_keys()
    }
}

impl core::fmt::Debug for FailedLoginTracker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FailedLoginTracker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use custodia_core::ManualClock;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn tracker(config: FailedLoginConfig) -> (FailedLoginTracker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(t0()));
        (FailedLoginTracker::new(config, clock.clone()), clock)
    }

    fn identity() -> IdentityFingerprint {
        IdentityFingerprint::of_login("alice@acme.test")
    }

    #[test]
    fn poisoned_lock_keeps_counting() {
        let (tracker, _clock) = tracker(FailedLoginConfig::default());
        let tracker = Arc::new(tracker);
        let h = identity();
        tracker.record_failure(&h, None, t0()).unwrap();

        let holder = tracker.clone();
        let _ = std::thread::spawn(move || {
            let _guard = holder.state.lock().unwrap();
            panic!("panicked while holding the tracker lock");
        })
        .join();
        assert!(tracker.state.is_poisoned());

        assert_eq!(tracker.count(&h), 1);
        assert!(!tracker.state.is_poisoned());
        assert_eq!(tracker.record_failure(&h, None, t0()).unwrap().identity, 2);
        assert_eq!(tracker.tracked_keys(), 1);
        tracker.record_success(&h);
        assert_eq!(tracker.count(&h), 0);
        assert_eq!(tracker.sweep(t0() + Duration::hours(1)), 0);
    }

    #[test]
    fn sixth_failure_within_window_crosses_threshold_of_five() {
        let (tracker, clock) = tracker(FailedLoginConfig::default());
        let h = identity();

        for i in 0..5 {
            let at = t0() + Duration::seconds(30 * i);
            let counted = tracker.record_failure(&h, None, at).unwrap();
            assert!(!counted.breached);
        }
        clock.set(t0() + Duration::seconds(150));
        assert!(!tracker.is_over_threshold(&h));

        let sixth = tracker.record_failure(&h, None, t0() + Duration::seconds(180)).unwrap();
        assert_eq!(sixth.identity, 6);
        assert!(sixth.breached);
        clock.set(t0() + Duration::seconds(180));
        assert!(tracker.is_over_threshold(&h));
    }

    #[test]
    fn failures_outside_window_do_not_count() {
        let (tracker, clock) = tracker(FailedLoginConfig::default());
        let h = identity();
        for i in 0..6 {
            tracker.record_failure(&h, None, t0() + Duration::minutes(i)).unwrap();
        }
        clock.set(t0() + Duration::minutes(11));
        assert_eq!(tracker.count(&h), 0);
        assert!(!tracker.is_over_threshold(&h));
    }

    #[test]
    fn identity_and_ip_are_tracked_independently() {
        let (tracker, _clock) = tracker(FailedLoginConfig::default());
        let ip: IpAddr = "203.0.113.7".parse().unwrap();
        for (i, login) in ["a@x.test", "b@x.test", "c@x.test"].iter().enumerate() {
            let counted = tracker
                .record_failure(&IdentityFingerprint::of_login(login), Some(ip), t0() + Duration::seconds(i as i64))
                .unwrap();
            assert_eq!(counted.identity, 1);
            assert_eq!(counted.ip, Some(i as u32 + 1));
        }
        assert_eq!(tracker.ip_count(ip), 3);
        assert!(!tracker.is_ip_over_threshold(ip));
    }

    #[test]
    fn success_clears_identity_but_not_ip() {
        let (tracker, _clock) = tracker(FailedLoginConfig::default());
        let h = identity();
        let ip: IpAddr = "198.51.100.1".parse().unwrap();
        tracker.record_failure(&h, Some(ip), t0()).unwrap();
        tracker.record_success(&h);
        assert_eq!(tracker.count(&h), 0);
        assert_eq!(tracker.ip_count(ip), 1);
    }

    #[test]
    fn sweep_drops_stale_keys() {
        let (tracker, _clock) = tracker(FailedLoginConfig::default());
        tracker
            .record_failure(&identity(), Some("192.0.2.1".parse().unwrap()), t0())
            .unwrap();
        assert_eq!(tracker.tracked_keys(), 2);
        assert_eq!(tracker.sweep(t0() + Duration::minutes(1)), 0);
        assert_eq!(tracker.sweep(t0() + Duration::minutes(6)), 2);
        assert_eq!(tracker.tracked_keys(), 0);
    }

    #[test]
    fn full_tracker_refuses_new_keys_but_keeps_counting_known_ones() {
        let config = FailedLoginConfig {
            max_tracked_keys: 2,
            ..FailedLoginConfig::default()
        };
        let (tracker, _clock) = tracker(config);
        let a = IdentityFingerprint::of_login("a@x.test");
        let b = IdentityFingerprint::of_login("b@x.test");
        let c = IdentityFingerprint::of_login("c@x.test");

        tracker.record_failure(&a, None, t0()).unwrap();
        tracker.record_failure(&b, None, t0()).unwrap();
        assert_eq!(
            tracker.record_failure(&c, None, t0()),
            Err(TrackerError::AtCapacity(2))
        );
        assert_eq!(tracker.record_failure(&a, None, t0()).unwrap().identity, 2);

        // Once the old keys age out the sweep makes room.
        let later = t0() + Duration::minutes(10);
        assert_eq!(tracker.record_failure(&c, None, later).unwrap().identity, 1);
    }

    #[test]
    fn breaches_repeat_every_threshold_plus_one_failures() {
        let config = FailedLoginConfig::default();
        let breaches: Vec<u32> = (1..=18).filter(|n| config.is_breach(*n)).collect();
        assert_eq!(breaches, vec![6, 12, 18]);
    }

    #[test]
    fn concurrent_failures_are_not_lost() {
        let (tracker, _clock) = tracker(FailedLoginConfig {
            threshold: 1_000,
            ..FailedLoginConfig::default()
        });
        let tracker = Arc::new(tracker);
        let h = identity();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                let h = h.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        tracker.record_failure(&h, None, t0()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(tracker.count(&h), 400);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn over_threshold_iff_more_than_threshold_failures_in_window(
            threshold in 0u32..10,
            offsets in proptest::collection::vec(0i64..600, 0..30),
        ) {
            let config = FailedLoginConfig { threshold, ..FailedLoginConfig::default() };
            let (tracker, clock) = tracker(config);
            let h = identity();
            for offset in &offsets {
                tracker.record_failure(&h, None, t0() + Duration::seconds(*offset)).unwrap();
            }
            let now = t0() + Duration::seconds(600);
            clock.set(now);
            let in_window = offsets.iter().filter(|o| **o > 300).count() as u32;
            prop_assert_eq!(tracker.count(&h), in_window);
            prop_assert_eq!(tracker.is_over_threshold(&h), in_window > threshold);
        }
    }
}
