//! Fixed window admission.
//!
//! Requests are counted in discrete, non-overlapping windows and the counter
//! resets fully at the window boundary. A burst straddling the boundary can
//! briefly see up to twice the limit; that is inherent to the scheme.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::trace;

use super::policy::AdmissionPolicy;
use super::store::{ClientStore, LastSeen};

/// Per-client fixed window counter.
#[derive(Debug)]
pub struct FixedWindowState {
    count: u32,
    window_end: Instant,
    last_seen: Instant,
}

impl LastSeen for FixedWindowState {
    fn last_seen(&self) -> Instant {
        self.last_seen
    }
}

/// Fixed window rate limiter over a shared client store.
pub struct FixedWindowLimiter {
    store: Arc<ClientStore<FixedWindowState>>,
    limit: u32,
    window: Duration,
}

impl FixedWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            store: Arc::new(ClientStore::new()),
            limit,
            window,
        }
    }

    /// Handle to the backing store, used to wire up the expiry sweeper.
    pub fn store(&self) -> Arc<ClientStore<FixedWindowState>> {
        Arc::clone(&self.store)
    }

    /// Check whether `key` may proceed, counting this request if so.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut clients = self.store.lock();
        match clients.get_mut(key) {
            Some(state) if now < state.window_end => {
                state.last_seen = now;
                if state.count >= self.limit {
                    trace!(client = %key, count = state.count, "fixed window limit reached");
                    false
                } else {
                    state.count += 1;
                    true
                }
            }
            _ => {
                // Missing record or expired window: open a fresh window with
                // this request counted as its first.
                clients.insert(
                    key.to_string(),
                    FixedWindowState {
                        count: 1,
                        window_end: now + self.window,
                        last_seen: now,
                    },
                );
                true
            }
        }
    }
}

impl AdmissionPolicy for FixedWindowLimiter {
    fn allow(&self, client_key: &str) -> bool {
        self.allow_at(client_key, Instant::now())
    }
}
