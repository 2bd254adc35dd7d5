//! Response cache for the Fetch Coordinator (spec §4.2): successful adapter
//! responses are memoized by `(source, call, arguments)` with a per-kind TTL
//! and an LRU bound on entry count. A cache hit bypasses fallback-chain
//! traversal entirely.
//!
//! Hand-rolled rather than pulling in an LRU crate, following the corpus's
//! "hand-roll over off-the-shelf crate" pattern for small, well-understood
//! data structures (see `graph::union_find`, `simulator::rng`).

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;
use types::SourceId;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: SourceId,
    pub call: String,
    pub args_fingerprint: String,
}

impl CacheKey {
    pub fn new(source: SourceId, call: impl Into<String>, args_fingerprint: impl Into<String>) -> Self {
        Self {
            source,
            call: call.into(),
            args_fingerprint: args_fingerprint.into(),
        }
    }
}

struct Entry {
    value: Value,
    inserted_at: Instant,
    ttl: Duration,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() >= self.ttl
    }
}

/// A bounded, TTL-expiring cache of adapter responses.
pub struct ResponseCache {
    inner: Mutex<Inner>,
    max_entries: usize,
}

struct Inner {
    entries: HashMap<CacheKey, Entry>,
    recency: VecDeque<CacheKey>,
}

impl ResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                recency: VecDeque::new(),
            }),
            max_entries,
        }
    }

    /// Returns the cached value if present and not yet expired. A hit moves
    /// the key to the back of the recency queue.
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        let mut inner = self.inner.lock();
        let expired = match inner.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => return None,
        };
        if expired {
            inner.entries.remove(key);
            inner.recency.retain(|k| k != key);
            return None;
        }
        inner.recency.retain(|k| k != key);
        inner.recency.push_back(key.clone());
        inner.entries.get(key).map(|e| e.value.clone())
    }

    pub fn put(&self, key: CacheKey, value: Value, ttl: Duration) {
        let mut inner = self.inner.lock();
        inner.recency.retain(|k| k != &key);
        inner.recency.push_back(key.clone());
        inner.entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
                ttl,
            },
        );
        while inner.entries.len() > self.max_entries {
            if let Some(oldest) = inner.recency.pop_front() {
                inner.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
