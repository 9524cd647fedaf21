//! Admission engine: one limiter per algorithm over independent stores.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::AdmissionConfig;
use crate::error::Result;

use super::fixed_window::FixedWindowLimiter;
use super::policy::AdmissionPolicy;
use super::sliding_window::SlidingWindowLimiter;
use super::sweeper::{spawn_sweeper, SweepSchedule};
use super::token_bucket::TokenBucketLimiter;

/// Selects which algorithm evaluates an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    FixedWindow,
    SlidingWindow,
    TokenBucket,
}

/// The three limiters plus the sweep schedule for their stores.
///
/// The engine owns all per-client state; construct one per process and
/// share it behind an `Arc`. There is no cross-algorithm state: the same
/// client key maps to an independent record in each store.
pub struct AdmissionEngine {
    fixed_window: FixedWindowLimiter,
    sliding_window: SlidingWindowLimiter,
    token_bucket: TokenBucketLimiter,
    sweep: SweepSchedule,
}

impl AdmissionEngine {
    /// Build an engine from configuration, rejecting invalid parameters
    /// before any limiter exists.
    pub fn new(config: &AdmissionConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            fixed_window: FixedWindowLimiter::new(
                config.fixed_window.limit,
                config.fixed_window.window(),
            ),
            sliding_window: SlidingWindowLimiter::new(
                config.sliding_window.limit,
                config.sliding_window.window(),
            ),
            token_bucket: TokenBucketLimiter::new(
                config.token_bucket.refill_per_sec,
                config.token_bucket.burst,
            ),
            sweep: SweepSchedule {
                interval: config.sweep.interval(),
                idle_after: config.sweep.idle_after(),
            },
        })
    }

    /// Run one admission check under the selected algorithm.
    pub fn check(&self, algorithm: Algorithm, client_key: &str) -> bool {
        let policy: &dyn AdmissionPolicy = match algorithm {
            Algorithm::FixedWindow => &self.fixed_window,
            Algorithm::SlidingWindow => &self.sliding_window,
            Algorithm::TokenBucket => &self.token_bucket,
        };

        let allowed = policy.allow(client_key);
        debug!(algorithm = ?algorithm, client = %client_key, allowed, "Admission decision");
        allowed
    }

    /// Spawn one expiry sweeper per algorithm store.
    ///
    /// Each task stops after a value is sent on `shutdown`; join the
    /// returned handles during graceful shutdown.
    pub fn spawn_sweepers(&self, shutdown: &broadcast::Sender<()>) -> Vec<JoinHandle<()>> {
        vec![
            spawn_sweeper(
                "fixed_window",
                self.fixed_window.store(),
                self.sweep,
                shutdown.subscribe(),
            ),
            spawn_sweeper(
                "sliding_window",
                self.sliding_window.store(),
                self.sweep,
                shutdown.subscribe(),
            ),
            spawn_sweeper(
                "token_bucket",
                self.token_bucket.store(),
                self.sweep,
                shutdown.subscribe(),
            ),
        ]
    }

    pub fn fixed_window(&self) -> &FixedWindowLimiter {
        &self.fixed_window
    }

    pub fn sliding_window(&self) -> &SlidingWindowLimiter {
        &self.sliding_window
    }

    pub fn token_bucket(&self) -> &TokenBucketLimiter {
        &self.token_bucket
    }
}
