//! Per-event mutual exclusion for joins.
//!
//! A naive join reads the attendee count, compares it with capacity and then
//! inserts. Two joins racing on the last spot can both pass the check. The
//! [`EventLocks`] registry hands out one async mutex per event id, so the
//! check and the insert for a given event run as a single serialized unit
//! while joins on different events proceed independently.
//!
//! Entries are created lazily and pruned once nobody holds or waits on them.

use rsvp_core::EventId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry size above which idle entries are swept on acquisition.
const PRUNE_THRESHOLD: usize = 1024;

/// Registry of per-event async mutexes.
#[derive(Debug, Default, Clone)]
pub struct EventLocks {
    inner: Arc<Mutex<HashMap<EventId, Arc<AsyncMutex<()>>>>>,
}

/// Held for as long as the caller needs exclusive access to one event.
#[derive(Debug)]
pub struct EventLockGuard {
    event_id: EventId,
    _guard: OwnedMutexGuard<()>,
}

impl EventLockGuard {
    /// The event this guard serializes.
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        self.event_id
    }
}

impl EventLocks {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `event_id`.
    pub async fn acquire(&self, event_id: EventId) -> EventLockGuard {
        let mutex = {
            // Poisoning only means another thread panicked while holding the
            // map; the map itself is still consistent.
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            if map.len() > PRUNE_THRESHOLD {
                map.retain(|_, m| Arc::strong_count(m) > 1);
            }
            Arc::clone(map.entry(event_id).or_default())
        };

        EventLockGuard {
            event_id,
            _guard: mutex.lock_owned().await,
        }
    }

    /// Number of events currently tracked.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
