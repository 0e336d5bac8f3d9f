//! Bounded in-memory cache with TTL and LRU eviction policies
//!
//! Short links and overlay blobs are ephemeral, shareable-for-a-while
//! artifacts: content is intentionally lost on restart, so the cache keeps
//! everything in memory behind a single mutex and only ever bounds growth
//! by evicting.
//!
//! Two policies are supported:
//! - **TTL**: entries expire a fixed duration after insertion; reads of an
//!   expired entry behave as a miss and purge it. A hard capacity is still
//!   enforced by evicting the oldest-inserted entry when full.
//! - **LRU**: fixed capacity; inserting beyond it evicts the
//!   least-recently-accessed entry, and reads refresh recency.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    // Front is next to evict: insertion order under TTL, access order under LRU.
    order: VecDeque<K>,
}

pub struct BoundedCache<K, V> {
    capacity: usize,
    ttl: Option<Duration>,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Cache with LRU-by-capacity eviction.
    pub fn new_lru(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl: None,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Cache with per-entry TTL expiry and a hard capacity bound.
    pub fn new_ttl(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl: Some(ttl),
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        let (value, expired) = match inner.entries.get(key) {
            Some(entry) => (
                entry.value.clone(),
                entry.expires_at.is_some_and(|at| Instant::now() >= at),
            ),
            None => return None,
        };
        if expired {
            inner.entries.remove(key);
            inner.order.retain(|k| k != key);
            return None;
        }
        // Reads only count as accesses under LRU.
        if self.ttl.is_none() {
            inner.order.retain(|k| k != key);
            inner.order.push_back(key.clone());
        }
        Some(value)
    }

    pub fn put(&self, key: K, value: V) {
        let expires_at = self.ttl.map(|ttl| Instant::now() + ttl);
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        if inner.entries.contains_key(&key) {
            inner.order.retain(|k| k != &key);
        } else {
            while inner.entries.len() >= self.capacity {
                match inner.order.pop_front() {
                    Some(old) => {
                        inner.entries.remove(&old);
                    }
                    None => break,
                }
            }
        }
        inner.order.push_back(key.clone());
        inner.entries.insert(key, Entry { value, expires_at });
    }

    /// Presence check. Does not refresh recency and does not purge, so it is
    /// safe to use as a cheap dedup probe.
    pub fn contains(&self, key: &K) -> bool {
        let inner = self.inner.lock().expect("cache mutex poisoned");
        match inner.entries.get(key) {
            Some(entry) => !entry.expires_at.is_some_and(|at| Instant::now() >= at),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
