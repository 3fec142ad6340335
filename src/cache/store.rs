//! Cache storage implementations.
//!
//! `SnapshotStore`: bounded LRU with per-entry TTL and invalidation tombstones.
//! `DisabledCache`: always misses, used when caching is switched off.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use tokio::time::Instant;

use crate::application::cache::{CacheError, CacheLookup, Epoch, SnapshotCache};

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

#[derive(Debug, Clone)]
enum Slot {
    Value {
        payload: String,
        expires_at: Instant,
        epoch: u64,
    },
    Tombstone {
        epoch: u64,
    },
}

impl Slot {
    fn epoch(&self) -> u64 {
        match self {
            Slot::Value { epoch, .. } | Slot::Tombstone { epoch } => *epoch,
        }
    }
}

struct Inner {
    slots: LruCache<String, Slot>,
    /// Bumped by every delete; misses report its current reading.
    clock: u64,
    /// Highest epoch of any slot dropped by eviction or expiry.
    floor: u64,
}

impl Inner {
    fn forget(&mut self, slot: &Slot) {
        self.floor = self.floor.max(slot.epoch());
    }

    fn put(&mut self, key: String, slot: Slot) {
        if let Some((evicted_key, evicted)) = self.slots.push(key.clone(), slot)
            && evicted_key != key
        {
            self.forget(&evicted);
        }
    }

    /// A fill is accepted only if nothing touched the key after `observed` was read.
    fn accepts(&self, key: &str, observed: u64) -> bool {
        let current = self.slots.peek(key).map(Slot::epoch).unwrap_or(self.floor);
        observed >= current.max(self.floor)
    }
}

/// In-memory snapshot cache.
pub struct SnapshotStore {
    inner: RwLock<Inner>,
}

impl SnapshotStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: RwLock::new(Inner {
                slots: LruCache::new(config.capacity_non_zero()),
                clock: 0,
                floor: 0,
            }),
        }
    }

    /// Live slots, tombstones included.
    pub fn len(&self) -> usize {
        rw_read(&self.inner, SOURCE, "len").slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &str) -> CacheLookup {
        let mut inner = rw_write(&self.inner, SOURCE, "get");
        let now = Instant::now();

        let expired = match inner.slots.get(key) {
            Some(Slot::Value {
                payload,
                expires_at,
                ..
            }) if *expires_at > now => return CacheLookup::Hit(payload.clone()),
            Some(Slot::Value { .. }) => true,
            Some(Slot::Tombstone { .. }) | None => false,
        };
        if expired && let Some(slot) = inner.slots.pop(key) {
            inner.forget(&slot);
        }
        CacheLookup::Miss(Epoch(inner.clock))
    }

    fn store(&self, key: &str, payload: String, ttl: Duration, observed: Epoch) -> bool {
        let mut inner = rw_write(&self.inner, SOURCE, "set");
        if !inner.accepts(key, observed.0) {
            return false;
        }
        let slot = Slot::Value {
            payload,
            expires_at: Instant::now() + ttl,
            epoch: observed.0,
        };
        inner.put(key.to_string(), slot);
        true
    }

    fn invalidate(&self, key: &str) {
        let mut inner = rw_write(&self.inner, SOURCE, "delete");
        inner.clock += 1;
        let epoch = inner.clock;
        inner.put(key.to_string(), Slot::Tombstone { epoch });
    }
}

#[async_trait]
impl SnapshotCache for SnapshotStore {
    async fn get(&self, key: &str) -> Result<CacheLookup, CacheError> {
        Ok(self.lookup(key))
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
        observed: Epoch,
    ) -> Result<bool, CacheError> {
        Ok(self.store(key, value, ttl, observed))
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.invalidate(key);
        Ok(())
    }
}

/// Cache that never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCache;

#[async_trait]
impl SnapshotCache for DisabledCache {
    async fn get(&self, _key: &str) -> Result<CacheLookup, CacheError> {
        Ok(CacheLookup::Miss(Epoch::default()))
    }

    async fn set(
        &self,
        _key: &str,
        _value: String,
        _ttl: Duration,
        _observed: Epoch,
    ) -> Result<bool, CacheError> {
        Ok(false)
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }
}
