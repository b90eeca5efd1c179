//! TTL memoization cache for idempotent pipeline computations.
//!
//! Entries are keyed by a content hash of (operation id, serialized argument
//! tuple) and expire after a fixed time-to-live; they are never invalidated by
//! external signals. The cache is injected as a dependency — nothing in the
//! pipeline reaches for ambient process-wide state — so tests can substitute a
//! manual clock and observe hit/miss behavior deterministically.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

/// Default entry lifetime: six hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Time source, swappable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Mapping from (operation id, argument tuple) to (value, expiry timestamp).
pub struct MemoCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, (serde_json::Value, SystemTime)>>,
}

impl MemoCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Wall-clock cache with the default TTL.
    pub fn with_default_ttl() -> Self {
        Self::new(DEFAULT_TTL, Arc::new(SystemClock))
    }

    /// Content-hash key for an operation and its serializable arguments.
    pub fn key(op: &str, args: &impl Serialize) -> String {
        let json = serde_json::to_vec(args).unwrap_or_default();
        let mut hasher = blake3::Hasher::new();
        hasher.update(op.as_bytes());
        hasher.update(&json);
        hasher.finalize().to_hex().to_string()
    }

    /// Look up a live entry, or compute, store, and return it.
    ///
    /// The computation runs outside the map lock; a concurrent miss on the
    /// same key may compute twice, but entries are idempotent so the second
    /// write is identical.
    pub fn get_or_compute<T, F>(&self, op: &str, args: &impl Serialize, compute: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        let key = Self::key(op, args);
        let now = self.clock.now();
        if let Some(value) = self.lookup(&key, now) {
            if let Ok(hit) = serde_json::from_value::<T>(value) {
                return hit;
            }
        }
        let fresh = compute();
        if let Ok(json) = serde_json::to_value(&fresh) {
            let mut entries = self.entries.lock().unwrap();
            entries.insert(key, (json, now + self.ttl));
        }
        fresh
    }

    /// Number of live (unexpired) entries.
    pub fn live_len(&self) -> usize {
        let now = self.clock.now();
        let entries = self.entries.lock().unwrap();
        entries.values().filter(|(_, expiry)| *expiry > now).count()
    }

    /// Drop expired entries.
    pub fn purge_expired(&self) {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, (_, expiry)| *expiry > now);
    }

    fn lookup(&self, key: &str, now: SystemTime) -> Option<serde_json::Value> {
        let entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some((value, expiry)) if *expiry > now => Some(value.clone()),
            _ => None,
        }
    }
}
