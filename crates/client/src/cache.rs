//! Request-signature keyed TTL cache with collection-scoped invalidation
//!
//! Entries expire lazily: the store checks the clock on every read and
//! deletes what it finds stale, so no background sweeper exists. A stale
//! entry can therefore linger and consume memory, but it is never returned.
//!
//! Each entry remembers the collection type it was derived from, which makes
//! invalidating everything about one collection an exact operation instead
//! of a guess against the key string.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use docbridge_common::time::Clock;
use docbridge_domain::CacheStats;
use serde_json::Value;
use tracing::debug;

/// Canonical identity of one read request.
///
/// Built from the collection type, the operation kind and the full parameter
/// set, serialized with sorted keys: two logically identical requests yield
/// the same signature regardless of how the caller ordered its maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestSignature {
    key: String,
    collection: String,
}

impl RequestSignature {
    pub fn new(collection: &str, kind: &str, params: &Value) -> Self {
        // serde_json's default map is BTree-backed, so object keys always
        // serialize sorted; nested objects included.
        Self {
            key: format!("{collection}:{kind}:{params}"),
            collection: collection.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

struct StoredEntry {
    value: Value,
    collection: String,
    expires_at: Instant,
}

/// In-memory TTL cache shared by every read path of one client instance.
///
/// Reads and writes go through an `RwLock`, so a single client can serve
/// concurrent callers. The clock is injected for deterministic expiry tests.
pub struct CacheStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { entries: RwLock::new(HashMap::new()), clock }
    }

    /// Look up a signature. Misses and expired entries both return `None`;
    /// an expired entry is deleted on the spot.
    pub fn get(&self, signature: &RequestSignature) -> Option<Value> {
        let now = self.clock.now();

        {
            let entries = self.entries.read().unwrap();
            match entries.get(signature.as_str()) {
                Some(entry) if now < entry.expires_at => {
                    debug!(signature = signature.as_str(), "cache hit");
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Entry exists but is stale; re-check under the write lock since a
        // concurrent set() may have refreshed it meanwhile.
        let mut entries = self.entries.write().unwrap();
        if let Some(entry) = entries.get(signature.as_str()) {
            if now < entry.expires_at {
                return Some(entry.value.clone());
            }
            entries.remove(signature.as_str());
            debug!(signature = signature.as_str(), "expired cache entry dropped");
        }
        None
    }

    /// Store a value with absolute expiry `now + ttl`, overwriting any
    /// previous entry for the signature.
    pub fn set(&self, signature: &RequestSignature, value: Value, ttl: Duration) {
        let expires_at = self.clock.now() + ttl;
        let mut entries = self.entries.write().unwrap();
        entries.insert(
            signature.as_str().to_string(),
            StoredEntry {
                value,
                collection: signature.collection().to_string(),
                expires_at,
            },
        );
    }

    /// Remove every entry derived from `collection`; entries for other
    /// collections are untouched. Returns the number of entries removed.
    pub fn invalidate_collection(&self, collection: &str) -> usize {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| entry.collection != collection);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(collection, removed, "cache invalidated for collection");
        }
        removed
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }

    /// Diagnostic counts against the clock at call time. Not used
    /// internally.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap();
        let total = entries.len();
        let active = entries.values().filter(|e| now < e.expires_at).count();
        CacheStats { total, active, expired: total - active }
    }
}
