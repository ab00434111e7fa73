//! Per-dataset "last file loaded" scratch cache.
//!
//! The reference implementations (`prism.py`, `nass_cdl.py`, ...) reopen a
//! dataset's backing file on every `getData` call; here the file-read
//! collaborator is out of scope (§1), but the caching discipline around it
//! is still part of the ambient pipeline. Grounded directly in
//! `grid-processor::cache::chunk_cache::ChunkCache`'s LRU + atomic
//! hit/miss/eviction-counter pattern.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// A cached, already-decoded layer keyed by (file path, variable).
#[derive(Clone)]
pub struct CachedLayer {
    pub path: PathBuf,
    pub variable: String,
    pub bytes_len: usize,
}

pub struct DatasetCache {
    cache: Mutex<LruCache<(PathBuf, String), CachedLayer>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl DatasetCache {
    pub fn new(capacity: usize) -> Self {
        DatasetCache {
            cache: Mutex::new(LruCache::new(NonZeroUsize::new(capacity.max(1)).unwrap())),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &(PathBuf, String)) -> Option<CachedLayer> {
        let mut guard = self.cache.lock().expect("dataset cache mutex poisoned");
        if let Some(entry) = guard.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            Some(entry.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    pub fn insert(&self, key: (PathBuf, String), value: CachedLayer) {
        let mut guard = self.cache.lock().expect("dataset cache mutex poisoned");
        if guard.len() == guard.cap().get() && !guard.contains(&key) {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        guard.put(key, value);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_hit_and_miss() {
        let cache = DatasetCache::new(2);
        let key = (PathBuf::from("a.tif"), "ppt".to_string());
        assert!(cache.get(&key).is_none());
        cache.insert(key.clone(), CachedLayer { path: key.0.clone(), variable: key.1.clone(), bytes_len: 10 });
        assert!(cache.get(&key).is_some());
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn evicts_lru_entry_over_capacity() {
        let cache = DatasetCache::new(1);
        let a = (PathBuf::from("a.tif"), "v".to_string());
        let b = (PathBuf::from("b.tif"), "v".to_string());
        cache.insert(a.clone(), CachedLayer { path: a.0.clone(), variable: "v".into(), bytes_len: 1 });
        cache.insert(b.clone(), CachedLayer { path: b.0.clone(), variable: "v".into(), bytes_len: 1 });
        assert!(cache.get(&a).is_none());
        assert_eq!(cache.evictions(), 1);
    }
}
