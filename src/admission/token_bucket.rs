//! Token bucket admission.
//!
//! Each client owns a capacity-bounded pool of tokens that refills
//! continuously at a fixed rate; a check consumes one token or is denied.
//! A live record keeps the refill rate and capacity it was created with.
//! Unlike the window algorithms, nothing resets those parameters while the
//! record exists; only eviction by the sweeper and subsequent re-creation
//! picks up new ones.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::trace;

use super::policy::AdmissionPolicy;
use super::store::{ClientStore, LastSeen};

/// Continuous-refill token bucket for a single client.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a bucket that starts full.
    fn new(refill_per_sec: f64, burst: u32, now: Instant) -> Self {
        let capacity = f64::from(burst);
        Self {
            capacity,
            tokens: capacity,
            refill_per_sec,
            last_refill: now,
        }
    }

    /// Apply lazy refill for the elapsed time, then try to take one token.
    fn try_consume(&mut self, now: Instant) -> bool {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    fn available(&self) -> f64 {
        self.tokens
    }
}

/// Per-client bucket plus activity tracking for the sweeper.
#[derive(Debug)]
pub struct TokenBucketState {
    bucket: TokenBucket,
    last_seen: Instant,
}

impl LastSeen for TokenBucketState {
    fn last_seen(&self) -> Instant {
        self.last_seen
    }
}

/// Token bucket rate limiter over a shared client store.
pub struct TokenBucketLimiter {
    store: Arc<ClientStore<TokenBucketState>>,
    refill_per_sec: f64,
    burst: u32,
}

impl TokenBucketLimiter {
    pub fn new(refill_per_sec: f64, burst: u32) -> Self {
        Self {
            store: Arc::new(ClientStore::new()),
            refill_per_sec,
            burst,
        }
    }

    /// Handle to the backing store, used to wire up the expiry sweeper.
    pub fn store(&self) -> Arc<ClientStore<TokenBucketState>> {
        Arc::clone(&self.store)
    }

    /// Check whether `key` may proceed, consuming one token if so.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut clients = self.store.lock();
        if let Some(state) = clients.get_mut(key) {
            state.last_seen = now;
            let allowed = state.bucket.try_consume(now);
            if !allowed {
                trace!(client = %key, "token bucket empty");
            }
            return allowed;
        }

        // First sighting: the bucket starts full and this request drains
        // its first token.
        let mut bucket = TokenBucket::new(self.refill_per_sec, self.burst, now);
        let allowed = bucket.try_consume(now);
        clients.insert(
            key.to_string(),
            TokenBucketState {
                bucket,
                last_seen: now,
            },
        );
        allowed
    }
}

impl AdmissionPolicy for TokenBucketLimiter {
    fn allow(&self, client_key: &str) -> bool {
        self.allow_at(client_key, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_then_drain() {
        let limiter = TokenBucketLimiter::new(1.0, 3);
        let start = Instant::now();

        assert!(limiter.allow_at("10.0.0.1", start));
        assert!(limiter.allow_at("10.0.0.1", start + Duration::from_millis(1)));
        assert!(limiter.allow_at("10.0.0.1", start + Duration::from_millis(2)));
        assert!(!limiter.allow_at("10.0.0.1", start + Duration::from_millis(3)));

        // One second of refill buys exactly one more token.
        let later = start + Duration::from_secs(1);
        assert!(limiter.allow_at("10.0.0.1", later));
        assert!(!limiter.allow_at("10.0.0.1", later + Duration::from_millis(1)));
    }

    #[test]
    fn partial_refill_is_not_enough() {
        let limiter = TokenBucketLimiter::new(1.0, 1);
        let start = Instant::now();

        assert!(limiter.allow_at("10.0.0.1", start));
        assert!(!limiter.allow_at("10.0.0.1", start + Duration::from_millis(500)));
        assert!(limiter.allow_at("10.0.0.1", start + Duration::from_millis(1600)));
    }

    #[test]
    fn refill_is_capped_at_capacity() {
        let limiter = TokenBucketLimiter::new(10.0, 3);
        let start = Instant::now();

        assert!(limiter.allow_at("10.0.0.1", start));

        // A long idle stretch refills to capacity, not beyond it.
        let later = start + Duration::from_secs(60);
        assert!(limiter.allow_at("10.0.0.1", later));
        assert!(limiter.allow_at("10.0.0.1", later + Duration::from_millis(1)));
        assert!(limiter.allow_at("10.0.0.1", later + Duration::from_millis(2)));
        assert!(!limiter.allow_at("10.0.0.1", later + Duration::from_millis(3)));
    }

    #[test]
    fn bucket_keeps_its_creation_parameters() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(2.0, 5, start);

        for i in 0..5 {
            assert!(bucket.try_consume(start + Duration::from_millis(i)));
        }
        assert!(!bucket.try_consume(start + Duration::from_millis(10)));

        // Refill continues at the rate fixed at creation: 2 tokens/s over
        // the 510ms since the last refill tops the 0.02 remainder past 1.0.
        assert!(bucket.try_consume(start + Duration::from_millis(520)));
        assert!((bucket.available() - 0.04).abs() < 1e-6);
    }

    #[test]
    fn keys_keep_separate_buckets() {
        let limiter = TokenBucketLimiter::new(1.0, 1);
        let start = Instant::now();

        assert!(limiter.allow_at("10.0.0.1", start));
        assert!(!limiter.allow_at("10.0.0.1", start + Duration::from_millis(1)));
        assert!(limiter.allow_at("10.0.0.2", start + Duration::from_millis(2)));
    }

    #[test]
    fn eviction_recreates_a_full_bucket() {
        let limiter = TokenBucketLimiter::new(0.001, 1);
        assert!(limiter.allow("10.0.0.1"));
        assert!(!limiter.allow("10.0.0.1"));

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(limiter.store().evict_idle(Duration::from_millis(10)), 1);

        // Fresh record, fresh burst.
        assert!(limiter.allow("10.0.0.1"));
    }
}
