use chrono::{DateTime, Duration, Utc};
use std::{collections::HashMap, sync::Mutex};
use tracing::debug;

use crate::model::ForecastResult;

pub const DEFAULT_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone)]
struct CacheEntry {
    data: ForecastResult,
    timestamp: DateTime<Utc>,
}

/// Per-location forecast cache with lazy expiry.
///
/// Keys are normalized (trimmed, lower-cased) locations. An entry whose age
/// reaches the TTL is treated as absent and replaced on the next insert.
#[derive(Debug)]
pub struct WeatherCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl Default for WeatherCache {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_TTL_MINUTES))
    }
}

impl WeatherCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Mutex::new(HashMap::new()) }
    }

    pub fn normalize_key(location: &str) -> String {
        location.trim().to_lowercase()
    }

    /// Returns a copy marked `from_cache` if a fresh entry exists at `now`.
    pub fn get(&self, location: &str, now: DateTime<Utc>) -> Option<ForecastResult> {
        let key = Self::normalize_key(location);
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(&key)?;

        if now - entry.timestamp >= self.ttl {
            debug!(%key, "cache entry expired");
            return None;
        }

        let mut copy = entry.data.clone();
        copy.from_cache = true;
        Some(copy)
    }

    pub fn insert(&self, location: &str, data: ForecastResult, now: DateTime<Utc>) {
        let key = Self::normalize_key(location);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, CacheEntry { data, timestamp: now });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
