//! In-memory TTL cache in front of a data provider.
//!
//! Keyed by `(symbol, period, interval)` for bars and by symbol for metadata.
//! Only successful fetches are stored; errors always reach the caller and the
//! next call goes upstream again. Nothing is persisted.

use super::provider::{DataError, DataProvider, RawBar, SeriesRequest};
use crate::domain::StockInfo;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug)]
struct Entry<T> {
    value: T,
    stored_at: Instant,
}

#[derive(Debug)]
struct Store<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K: std::hash::Hash + Eq, V: Clone> Store<K, V> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    // A panic while holding the lock leaves a map that is still valid.
    fn lock(&self) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn get(&self, key: &K, ttl: Duration) -> Option<V> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store `value`, sweeping every entry older than `ttl` first.
    fn put(&self, key: K, value: V, ttl: Duration) {
        let mut entries = self.lock();
        entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn clear(&self) {
        self.lock().clear();
    }
}

/// Wraps any provider with a time-bounded memo of its answers.
pub struct CachedProvider<P> {
    inner: P,
    ttl: Duration,
    bars: Store<SeriesRequest, Vec<RawBar>>,
    info: Store<String, StockInfo>,
}

impl<P: DataProvider> CachedProvider<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            bars: Store::new(),
            info: Store::new(),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Number of cached bar responses, including expired ones not yet evicted.
    pub fn cached_series(&self) -> usize {
        self.bars.len()
    }

    pub fn clear(&self) {
        self.bars.clear();
        self.info.clear();
    }
}

impl<P: DataProvider> DataProvider for CachedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch_bars(&self, request: &SeriesRequest) -> Result<Vec<RawBar>, DataError> {
        if let Some(hit) = self.bars.get(request, self.ttl) {
            debug!(symbol = %request.symbol, period = %request.period, interval = %request.interval, "bar cache hit");
            return Ok(hit);
        }
        let bars = self.inner.fetch_bars(request)?;
        self.bars.put(request.clone(), bars.clone(), self.ttl);
        Ok(bars)
    }

    fn fetch_info(&self, symbol: &str) -> Result<StockInfo, DataError> {
        let key = symbol.to_string();
        if let Some(hit) = self.info.get(&key, self.ttl) {
            debug!(symbol, "info cache hit");
            return Ok(hit);
        }
        let info = self.inner.fetch_info(symbol)?;
        self.info.put(key, info.clone(), self.ttl);
        Ok(info)
    }
}
