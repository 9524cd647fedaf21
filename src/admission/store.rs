//! Shared per-client state store.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};

/// Records stored in a [`ClientStore`] expose when their client was last
/// seen so idle eviction can be generic over the state type.
pub trait LastSeen {
    fn last_seen(&self) -> Instant;
}

/// Concurrency-safe map from client key to per-client limiter state.
///
/// A single coarse mutex guards the whole map. Every admission check holds
/// the lock for its full lookup-mutate-store sequence, which totally orders
/// checks for the same key. The expiry sweeper competes for the same lock,
/// so its critical section stays O(number of tracked clients).
pub struct ClientStore<S> {
    clients: Mutex<HashMap<String, S>>,
}

impl<S> ClientStore<S> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Lock the map for a lookup-mutate-store sequence.
    pub(crate) fn lock(&self) -> MutexGuard<'_, HashMap<String, S>> {
        self.clients.lock()
    }

    /// Remove a single client record.
    pub fn remove(&self, key: &str) -> Option<S> {
        self.clients.lock().remove(key)
    }

    /// Whether a record exists for the key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.clients.lock().contains_key(key)
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }
}

impl<S: LastSeen> ClientStore<S> {
    /// Evict every record idle for longer than `idle_after`.
    ///
    /// Returns the number of evicted records. This is the only path that
    /// deletes records; admission checks only create and mutate them.
    pub fn evict_idle(&self, idle_after: Duration) -> usize {
        let now = Instant::now();
        let mut clients = self.clients.lock();
        let before = clients.len();
        clients.retain(|_, state| now.duration_since(state.last_seen()) <= idle_after);
        before - clients.len()
    }
}

impl<S> Default for ClientStore<S> {
    fn default() -> Self {
        Self::new()
    }
}
