//! Background eviction of idle client records.
//!
//! One sweeper task runs per algorithm store. Between ticks it holds no
//! lock at all; on a tick it takes the store lock once, prunes idle
//! records, and releases it, so request-serving checks are never starved.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info};

use super::store::{ClientStore, LastSeen};

/// Timing for a sweep task.
#[derive(Debug, Clone, Copy)]
pub struct SweepSchedule {
    /// How often the sweeper wakes up.
    pub interval: Duration,
    /// How long a client may stay idle before its record is evicted.
    pub idle_after: Duration,
}

/// Spawn a sweeper for one store.
///
/// The task runs until a value arrives on the shutdown channel; the signal
/// is observed between ticks and the task exits without rearming its timer.
/// Await the returned handle to join it during shutdown.
pub fn spawn_sweeper<S>(
    store_name: &'static str,
    store: Arc<ClientStore<S>>,
    schedule: SweepSchedule,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()>
where
    S: LastSeen + Send + 'static,
{
    tokio::spawn(async move {
        info!(
            store = store_name,
            interval = ?schedule.interval,
            idle_after = ?schedule.idle_after,
            "Starting expiry sweeper"
        );

        let mut ticker = time::interval(schedule.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = store.evict_idle(schedule.idle_after);
                    if evicted > 0 {
                        debug!(
                            store = store_name,
                            evicted,
                            remaining = store.len(),
                            "Evicted idle client records"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    info!(store = store_name, "Expiry sweeper shutting down");
                    break;
                }
            }
        }
    })
}
