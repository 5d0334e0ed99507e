//! Bounded cache of lexical indexes keyed by a content hash of the chunk
//! collection.
//!
//! Indexes are shared as `Arc` and never mutated, so a lookup only holds the
//! lock long enough to clone the handle. Builds happen outside the lock.
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;

pub const DEFAULT_CAPACITY: usize = 8;

/// Content hash of an ordered chunk collection.
pub fn collection_key<T: AsRef<str>>(texts: &[T]) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(texts.len() as u64).to_le_bytes());
    for text in texts {
        let bytes = text.as_ref().as_bytes();
        hasher.update(&(bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
    hasher.finalize()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

struct Inner<V> {
    entries: LruCache<blake3::Hash, Arc<V>>,
    hits: u64,
    misses: u64,
}

pub struct IndexCache<V> {
    inner: Mutex<Inner<V>>,
}

impl<V> IndexCache<V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { inner: Mutex::new(Inner { entries: LruCache::new(capacity), hits: 0, misses: 0 }) }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached value for `key`, building and inserting it on a miss.
    pub fn get_or_build<E>(
        &self,
        key: blake3::Hash,
        build: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        {
            let mut inner = self.lock();
            if let Some(found) = inner.entries.get(&key).cloned() {
                inner.hits += 1;
                return Ok(found);
            }
            inner.misses += 1;
        }
        let built = Arc::new(build()?);
        self.lock().entries.put(key, Arc::clone(&built));
        Ok(built)
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats { hits: inner.hits, misses: inner.misses, entries: inner.entries.len() }
    }
}

impl<V> Default for IndexCache<V> {
    fn default() -> Self { Self::new(DEFAULT_CAPACITY) }
}
