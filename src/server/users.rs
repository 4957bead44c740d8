//! One serialized slot per user.

use std::{
    num::NonZeroUsize,
    sync::{Arc, Weak},
    time::{Duration, Instant},
};

use hashbrown::HashMap;
use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use crate::core::waypoints::WaypointStore;

/// Per-user state guarded by the user's lock.
#[derive(Debug, Default)]
pub struct UserSlot {
    waypoints: Option<WaypointStore>,
    loaded_at: Option<Instant>,
}

impl UserSlot {
    /// True when the cached store is missing, or clean and older than `ttl`.
    pub fn needs_reload(&self, ttl: Duration) -> bool {
        match (&self.waypoints, self.loaded_at) {
            (Some(store), Some(at)) => !store.is_dirty() && at.elapsed() >= ttl,
            _ => true,
        }
    }

    pub fn install(&mut self, store: WaypointStore) {
        self.waypoints = Some(store);
        self.loaded_at = Some(Instant::now());
    }

    pub fn waypoints(&self) -> Option<&WaypointStore> {
        self.waypoints.as_ref()
    }

    pub fn waypoints_mut(&mut self) -> Option<&mut WaypointStore> {
        self.waypoints.as_mut()
    }
}

pub type SharedSlot = Arc<tokio::sync::Mutex<UserSlot>>;

struct Slots {
    /// Every slot somebody still holds, so a user never has two live locks.
    live: HashMap<String, Weak<tokio::sync::Mutex<UserSlot>>>,
    /// Recently used slots kept alive between requests.
    recent: LruCache<String, SharedSlot>,
}

pub struct UserRegistry {
    slots: Mutex<Slots>,
    ttl: Duration,
}

impl UserRegistry {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            slots: Mutex::new(Slots {
                live: HashMap::new(),
                recent: LruCache::new(capacity),
            }),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The user's slot; the same allocation for as long as anyone holds it.
    pub fn slot(&self, user: &str) -> SharedSlot {
        let mut guard = self.slots.lock();
        let slots = &mut *guard;

        let slot = match slots.live.get(user).and_then(Weak::upgrade) {
            Some(slot) => slot,
            None => {
                let slot = SharedSlot::default();
                if slots.live.len() >= 2 * slots.recent.cap().get() {
                    slots.live.retain(|_, weak| weak.strong_count() > 0);
                }
                slots.live.insert(user.to_string(), Arc::downgrade(&slot));
                debug!(user, "created user slot");
                slot
            }
        };
        slots.recent.put(user.to_string(), slot.clone());
        slot
    }

    /// Users with a cached slot.
    pub fn cached(&self) -> usize {
        self.slots.lock().recent.len()
    }
}
