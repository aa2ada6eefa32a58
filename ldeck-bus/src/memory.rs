/// In-memory `KvStore` with TTL eviction.
///
/// Expired entries are dropped lazily on access and swept opportunistically
/// on writes: publish markers are write-only keys that no consumer reads
/// back, so access-driven eviction alone would leave them resident past
/// their TTL. Used in tests and single-process deployments; a networked
/// store slots behind the same trait.

use crate::kv::KvStore;
use ldeck_core::Result;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Writes between opportunistic sweeps of expired entries.
const PURGE_EVERY: usize = 128;

#[derive(Debug, Clone)]
enum Data {
    Value(String),
    List(VecDeque<String>),
}

#[derive(Debug, Clone)]
struct Stored {
    data: Data,
    expires_at: Option<Instant>,
}

impl Stored {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// Thread-safe in-memory key-value store.
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, Stored>>,
    writes: AtomicUsize,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Drop every expired entry now.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.lock().retain(|_, s| !s.is_expired(now));
    }

    /// Count one write; every `PURGE_EVERY` writes, sweep expired entries so
    /// write-only keys cannot accumulate.
    fn count_write(&self, entries: &mut HashMap<String, Stored>) {
        if self.writes.fetch_add(1, Ordering::Relaxed) % PURGE_EVERY == PURGE_EVERY - 1 {
            let now = Instant::now();
            entries.retain(|_, s| !s.is_expired(now));
        }
    }

    /// Number of live (unexpired) keys. Test helper.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.lock().values().filter(|s| !s.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop a key if its TTL has lapsed, then run `f` on the live entry map.
    fn with_live<T>(&self, key: &str, f: impl FnOnce(&mut HashMap<String, Stored>) -> T) -> T {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        if entries.get(key).map(|s| s.is_expired(now)).unwrap_or(false) {
            entries.remove(key);
        }
        f(&mut entries)
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a possibly-negative inclusive range against a list length.
/// Returns None when the range selects nothing.
fn normalize_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let mut start = if start < 0 { len + start } else { start };
    let mut stop = if stop < 0 { len + stop } else { stop };
    start = start.max(0);
    stop = stop.min(len - 1);
    if len == 0 || start > stop {
        return None;
    }
    Some((start as usize, stop as usize))
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.with_live(key, |entries| {
            entries.get(key).and_then(|s| match &s.data {
                Data::Value(v) => Some(v.clone()),
                Data::List(_) => None,
            })
        }))
    }

    fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let stored = Stored {
            data: Data::Value(value.to_string()),
            expires_at: Some(Instant::now() + ttl),
        };
        let mut entries = self.entries.lock();
        self.count_write(&mut entries);
        entries.insert(key.to_string(), stored);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn list_push(&self, key: &str, value: &str) -> Result<usize> {
        Ok(self.with_live(key, |entries| {
            self.count_write(entries);
            let stored = entries.entry(key.to_string()).or_insert_with(|| Stored {
                data: Data::List(VecDeque::new()),
                expires_at: None,
            });
            match &mut stored.data {
                Data::List(list) => {
                    list.push_front(value.to_string());
                    list.len()
                }
                data @ Data::Value(_) => {
                    // A plain value under this key is replaced by a fresh list
                    *data = Data::List(VecDeque::from([value.to_string()]));
                    stored.expires_at = None;
                    1
                }
            }
        }))
    }

    fn list_trim(&self, key: &str, start: i64, stop: i64) -> Result<()> {
        self.with_live(key, |entries| {
            if let Some(Stored { data: Data::List(list), .. }) = entries.get_mut(key) {
                match normalize_range(list.len(), start, stop) {
                    Some((start, stop)) => {
                        list.truncate(stop + 1);
                        for _ in 0..start {
                            list.pop_front();
                        }
                    }
                    None => {
                        list.clear();
                    }
                }
            }
        });
        Ok(())
    }

    fn list_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        Ok(self.with_live(key, |entries| {
            match entries.get(key) {
                Some(Stored { data: Data::List(list), .. }) => {
                    match normalize_range(list.len(), start, stop) {
                        Some((start, stop)) => list.range(start..=stop).cloned().collect(),
                        None => Vec::new(),
                    }
                }
                _ => Vec::new(),
            }
        }))
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        self.with_live(key, |entries| {
            if let Some(stored) = entries.get_mut(key) {
                stored.expires_at = Some(Instant::now() + ttl);
            }
        });
        Ok(())
    }
}
