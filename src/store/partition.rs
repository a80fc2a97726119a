// A named, quota-bound key/response store. All structural mutation
// (insert, evict, clear) happens under one write lock so readers never
// observe a partially-evicted state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;

use crate::config::{FORCED_EVICTION_CAP_PCT, OPTIMIZE_WATERMARK_PCT, ROUTINE_EVICTION_CAP_PCT};
use crate::error::EngineError;
use crate::store::eviction;

/// A stored response: status, headers, and body bytes, preserved
/// byte-identical between admission and read-back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl StoredResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// One cached response plus its bookkeeping metadata.
#[derive(Debug)]
pub struct CacheEntry {
    pub response: StoredResponse,
    pub inserted_at: Instant,
    /// Recency tick from the owning partition's access clock, stamped on
    /// insert and on every read. Atomic so reads stay on the shared lock.
    pub last_access: AtomicU64,
    /// Declared expiry captured from Cache-Control max-age at insertion.
    pub expires_at: Option<Instant>,
    /// Body size in bytes; headers are not counted.
    pub size: u64,
}

impl CacheEntry {
    pub fn new(response: StoredResponse) -> Self {
        let now = Instant::now();
        let expires_at = max_age(&response).map(|secs| now + Duration::from_secs(secs));
        let size = response.body.len() as u64;
        Self {
            response,
            inserted_at: now,
            last_access: AtomicU64::new(0),
            expires_at,
            size,
        }
    }
}

impl Clone for CacheEntry {
    fn clone(&self) -> Self {
        Self {
            response: self.response.clone(),
            inserted_at: self.inserted_at,
            last_access: AtomicU64::new(self.last_access.load(Ordering::Relaxed)),
            expires_at: self.expires_at,
            size: self.size,
        }
    }
}

/// Parse `max-age` out of a Cache-Control header, if present.
fn max_age(response: &StoredResponse) -> Option<u64> {
    let cache_control = response.header("cache-control")?;
    for directive in cache_control.split(',') {
        if let Some(value) = directive.trim().strip_prefix("max-age=") {
            return value.trim().parse().ok();
        }
    }
    None
}

pub(crate) struct Inner {
    pub entries: HashMap<String, CacheEntry>,
    pub total_size: u64,
}

pub struct CachePartition {
    name: String,
    quota: u64,
    inner: RwLock<Inner>,
    /// Monotonic access clock backing LRU ordering.
    clock: AtomicU64,
}

impl CachePartition {
    pub fn new(name: impl Into<String>, quota: u64) -> Self {
        Self {
            name: name.into(),
            quota,
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                total_size: 0,
            }),
            clock: AtomicU64::new(1),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quota(&self) -> u64 {
        self.quota
    }

    pub fn entry_count(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn total_size(&self) -> u64 {
        self.inner.read().total_size
    }

    /// Read an entry, bumping its recency. Takes the shared lock, so
    /// concurrent hits never serialize behind each other.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let inner = self.inner.read();
        let entry = inner.entries.get(key)?;
        entry.last_access.store(self.tick(), Ordering::Relaxed);
        Some(entry.clone())
    }

    /// Read an entry without touching access metadata.
    pub fn peek(&self, key: &str) -> Option<CacheEntry> {
        self.inner.read().entries.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().entries.contains_key(key)
    }

    /// Admit an entry. Runs routine-capped LRU eviction first if the
    /// partition would exceed its quota; refuses the write (QuotaError)
    /// if eviction could not reclaim enough space. Replacing an existing
    /// entry releases its bytes before the quota check.
    pub fn insert(&self, key: String, entry: CacheEntry) -> Result<(), EngineError> {
        let required = entry.size;
        if required > self.quota {
            return Err(EngineError::Quota {
                partition: self.name.clone(),
                required,
                freed: 0,
            });
        }

        entry.last_access.store(self.tick(), Ordering::Relaxed);
        let mut inner = self.inner.write();

        // A refused write must leave the partition untouched, so the old
        // entry is only removed once admission is certain.
        let existing = inner.entries.get(&key).map(|e| e.size).unwrap_or(0);
        if inner.total_size - existing + required > self.quota {
            let needed = inner.total_size - existing + required - self.quota;
            let freed = eviction::make_room(&mut inner, needed, ROUTINE_EVICTION_CAP_PCT);
            // Eviction may have removed the entry being replaced.
            let existing = inner.entries.get(&key).map(|e| e.size).unwrap_or(0);
            if inner.total_size - existing + required > self.quota {
                return Err(EngineError::Quota {
                    partition: self.name.clone(),
                    required,
                    freed,
                });
            }
            debug!(
                partition = %self.name,
                needed,
                freed,
                "eviction made room for write"
            );
        }

        if let Some(old) = inner.entries.remove(&key) {
            inner.total_size -= old.size;
        }
        inner.total_size += required;
        inner.entries.insert(key, entry);
        Ok(())
    }

    pub fn delete(&self, key: &str) -> bool {
        let mut inner = self.inner.write();
        match inner.entries.remove(key) {
            Some(entry) => {
                inner.total_size -= entry.size;
                true
            }
            None => false,
        }
    }

    /// Remove every entry. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.write();
        let count = inner.entries.len();
        inner.entries.clear();
        inner.total_size = 0;
        count
    }

    /// LRU eviction until `required` bytes are free or the cap is hit.
    /// Returns the bytes actually freed; callers must re-check quota.
    pub fn make_room(&self, required: u64, cap_pct: u32) -> u64 {
        let mut inner = self.inner.write();
        eviction::make_room(&mut inner, required, cap_pct)
    }

    /// Forced optimization pass: bring usage under the watermark with the
    /// forced (30%) removal cap. Returns bytes freed.
    pub fn optimize(&self) -> u64 {
        let watermark = self.quota * OPTIMIZE_WATERMARK_PCT / 100;
        let mut inner = self.inner.write();
        if inner.total_size <= watermark {
            return 0;
        }
        let needed = inner.total_size - watermark;
        let freed = eviction::make_room(&mut inner, needed, FORCED_EVICTION_CAP_PCT);
        debug!(partition = %self.name, needed, freed, "forced optimization pass");
        freed
    }
}
