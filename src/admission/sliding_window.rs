//! Sliding window admission.
//!
//! Each client keeps a log of request timestamps. Every check trims the log
//! to the trailing window before deciding, so the count always reflects a
//! continuously moving interval rather than discrete buckets. The O(n)
//! compaction per check is acceptable because the log never grows past the
//! configured limit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::trace;

use super::policy::AdmissionPolicy;
use super::store::{ClientStore, LastSeen};

/// Per-client request timestamp log.
#[derive(Debug)]
pub struct SlidingWindowState {
    timestamps: Vec<Instant>,
    last_seen: Instant,
}

impl SlidingWindowState {
    /// Number of requests currently counted against the window.
    pub fn tracked_requests(&self) -> usize {
        self.timestamps.len()
    }
}

impl LastSeen for SlidingWindowState {
    fn last_seen(&self) -> Instant {
        self.last_seen
    }
}

/// Sliding window rate limiter over a shared client store.
pub struct SlidingWindowLimiter {
    store: Arc<ClientStore<SlidingWindowState>>,
    limit: usize,
    window: Duration,
}

impl SlidingWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            store: Arc::new(ClientStore::new()),
            limit: limit as usize,
            window,
        }
    }

    /// Handle to the backing store, used to wire up the expiry sweeper.
    pub fn store(&self) -> Arc<ClientStore<SlidingWindowState>> {
        Arc::clone(&self.store)
    }

    /// Check whether `key` may proceed, recording this request if so.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut clients = self.store.lock();
        match clients.get_mut(key) {
            Some(state) => {
                state.last_seen = now;
                // Drop timestamps that have aged out of the trailing window.
                state
                    .timestamps
                    .retain(|t| now.duration_since(*t) < self.window);

                if state.timestamps.len() >= self.limit {
                    trace!(
                        client = %key,
                        tracked = state.timestamps.len(),
                        "sliding window limit reached"
                    );
                    false
                } else {
                    state.timestamps.push(now);
                    true
                }
            }
            None => {
                clients.insert(
                    key.to_string(),
                    SlidingWindowState {
                        timestamps: vec![now],
                        last_seen: now,
                    },
                );
                true
            }
        }
    }
}

impl AdmissionPolicy for SlidingWindowLimiter {
    fn allow(&self, client_key: &str) -> bool {
        self.allow_at(client_key, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    #[test]
    fn denies_the_request_over_the_limit() {
        let limiter = SlidingWindowLimiter::new(5, Duration::from_secs(30));
        let start = Instant::now();

        for i in 0..5 {
            assert!(limiter.allow_at("10.0.0.1", start + Duration::from_millis(i)));
        }
        assert!(!limiter.allow_at("10.0.0.1", start + Duration::from_millis(10)));
    }

    #[test]
    fn denied_requests_are_not_recorded() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(30));
        let start = Instant::now();

        assert!(limiter.allow_at("10.0.0.1", start));
        assert!(limiter.allow_at("10.0.0.1", start + Duration::from_millis(1)));
        for i in 2..10 {
            assert!(!limiter.allow_at("10.0.0.1", start + Duration::from_millis(i)));
        }

        let store = limiter.store();
        let clients = store.lock();
        assert_eq!(clients["10.0.0.1"].tracked_requests(), 2);
    }

    #[test]
    fn old_timestamps_age_out() {
        let limiter = SlidingWindowLimiter::new(5, Duration::from_secs(30));
        let start = Instant::now();

        for i in 0..5 {
            assert!(limiter.allow_at("10.0.0.1", start + Duration::from_millis(i)));
        }
        assert!(!limiter.allow_at("10.0.0.1", start + Duration::from_millis(10)));

        // Once all five originals fall out of the window, the next request
        // is admitted and only its own timestamp remains.
        let later = start + Duration::from_secs(31);
        assert!(limiter.allow_at("10.0.0.1", later));

        let store = limiter.store();
        let clients = store.lock();
        assert_eq!(clients["10.0.0.1"].tracked_requests(), 1);
    }

    #[test]
    fn window_slides_rather_than_resetting() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_millis(100));
        let start = Instant::now();

        assert!(limiter.allow_at("10.0.0.1", start));
        assert!(limiter.allow_at("10.0.0.1", start + Duration::from_millis(60)));
        assert!(!limiter.allow_at("10.0.0.1", start + Duration::from_millis(70)));

        // The first timestamp has aged out but the second is still inside
        // the trailing window, so exactly one slot is free.
        assert!(limiter.allow_at("10.0.0.1", start + Duration::from_millis(110)));
        assert!(!limiter.allow_at("10.0.0.1", start + Duration::from_millis(120)));
    }

    #[test]
    fn keys_keep_separate_logs() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(30));
        let start = Instant::now();

        assert!(limiter.allow_at("10.0.0.1", start));
        assert!(!limiter.allow_at("10.0.0.1", start + Duration::from_millis(1)));
        assert!(limiter.allow_at("10.0.0.2", start + Duration::from_millis(2)));
    }

    #[test]
    fn concurrent_checks_allow_exactly_the_limit() {
        const THREADS: usize = 8;
        const CALLS_PER_THREAD: usize = 25;
        const LIMIT: u32 = 50;

        let limiter = Arc::new(SlidingWindowLimiter::new(LIMIT, Duration::from_secs(60)));
        let barrier = Arc::new(Barrier::new(THREADS));
        let allowed = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let barrier = Arc::clone(&barrier);
                let allowed = Arc::clone(&allowed);
                std::thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..CALLS_PER_THREAD {
                        if limiter.allow("10.0.0.1") {
                            allowed.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(allowed.load(Ordering::SeqCst), LIMIT as usize);
    }
}
