//! TTL response cache for cacheable tools

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::time::Instant;
use tracing::debug;

/// Default time an entry stays servable
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default entry count above which a stale-entry sweep runs
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

#[derive(Debug, Clone)]
struct CacheEntry {
    data: String,
    timestamp: Instant,
}

/// Process-wide cache of successful tool results
///
/// Entries are never expired proactively. A stale entry stays in the map until
/// it is overwritten or until a store pushes the map past `max_entries`, at
/// which point every entry older than the TTL is dropped.
#[derive(Debug)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        debug!(?ttl, max_entries, "ResponseCache::new: called");
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return cached data if present and younger than the TTL
    pub fn lookup(&self, key: &str) -> Option<String> {
        let entries = self.lock();
        let entry = entries.get(key)?;
        if entry.timestamp.elapsed() < self.ttl {
            debug!(%key, "ResponseCache::lookup: hit");
            Some(entry.data.clone())
        } else {
            debug!(%key, "ResponseCache::lookup: stale");
            None
        }
    }

    /// Insert or overwrite an entry, sweeping stale entries past the high-water mark
    pub fn store(&self, key: impl Into<String>, data: impl Into<String>) {
        let key = key.into();
        let mut entries = self.lock();
        let now = Instant::now();
        entries.insert(
            key,
            CacheEntry {
                data: data.into(),
                timestamp: now,
            },
        );

        if entries.len() > self.max_entries {
            let before = entries.len();
            let ttl = self.ttl;
            entries.retain(|_, e| now.duration_since(e.timestamp) < ttl);
            debug!(before, after = entries.len(), "ResponseCache::store: swept stale entries");
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        debug!("ResponseCache::clear: called");
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}

/// Build the cache key for a call: `tool:` followed by canonical JSON arguments
pub fn cache_key(tool: &str, arguments: &Map<String, Value>) -> String {
    let mut key = String::with_capacity(tool.len() + 32);
    key.push_str(tool);
    key.push(':');
    write_canonical(&mut key, &Value::Object(arguments.clone()));
    key
}

/// Serialize with object keys sorted at every level
fn write_canonical(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, k) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*k).clone()).to_string());
                out.push(':');
                write_canonical(out, &map[k.as_str()]);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, item);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
