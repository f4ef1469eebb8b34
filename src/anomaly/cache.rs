//! TTL-bounded cache of per-sensor history windows
//!
//! Keyed by (sensor_name, window_size). Entries expire after a fixed
//! interval measured against an injected clock, so tests control expiry
//! deterministically. Two readings for the same sensor may race to
//! repopulate an entry; the outcome is redundant recomputation, never a
//! partially written window — each entry is an atomically swapped
//! `Arc<Vec<_>>` snapshot.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::trace;

use crate::storage::StorageError;
use crate::types::SensorReading;

/// Time source for cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct CachedWindow {
    fetched_at: DateTime<Utc>,
    readings: Arc<Vec<SensorReading>>,
}

/// Cache of recently fetched history windows.
pub struct WindowCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<(String, usize), CachedWindow>>,
}

impl WindowCache {
    pub fn new(ttl_secs: i64) -> Self {
        Self::with_clock(ttl_secs, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl_secs: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs),
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached window for (sensor, window_size) if fresh,
    /// otherwise run `fetch` and cache its result.
    ///
    /// `fetch` runs outside the lock; a concurrent caller may fetch the same
    /// window redundantly and the later insert simply wins.
    pub fn get_or_fetch<F>(
        &self,
        sensor_name: &str,
        window_size: usize,
        fetch: F,
    ) -> Result<Arc<Vec<SensorReading>>, StorageError>
    where
        F: FnOnce() -> Result<Vec<SensorReading>, StorageError>,
    {
        let now = self.clock.now();
        let key = (sensor_name.to_string(), window_size);

        if let Ok(entries) = self.entries.read() {
            if let Some(entry) = entries.get(&key) {
                if now - entry.fetched_at < self.ttl {
                    trace!(sensor = sensor_name, window = window_size, "Window cache hit");
                    return Ok(Arc::clone(&entry.readings));
                }
            }
        }

        let readings = Arc::new(fetch()?);
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                key,
                CachedWindow {
                    fetched_at: now,
                    readings: Arc::clone(&readings),
                },
            );
        }
        Ok(readings)
    }

    /// Drop all cached windows for one sensor (all window sizes).
    pub fn invalidate(&self, sensor_name: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|(sensor, _), _| sensor != sensor_name);
        }
    }

    /// Number of cached windows, expired or not.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
