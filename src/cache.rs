//! Run-scoped memoization caches.
//!
//! ## Cache Key Design
//!
//! Keys are xxh64 digests of every input that affects the cached value, so a
//! change in any input is a miss. Entries never expire on their own: inputs
//! are assumed static for the duration of a run, and the owning run context
//! calls [`MemoCache::clear`] between runs (project or language switch).
//!
//! File modification times are deliberately not part of any key.

use std::hash::Hasher;
use std::sync::Arc;
use lru::LruCache;
use parking_lot::RwLock;
use xxhash_rust::xxh64::Xxh64;

/// Cache key: digest of all inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(u64);

impl CacheKey {
    /// Start building a key.
    pub fn builder() -> CacheKeyBuilder {
        CacheKeyBuilder {
            hasher: Xxh64::new(0),
        }
    }

    /// Raw digest.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Incremental key builder.
///
/// Every part is length-prefixed so `("ab", "c")` and `("a", "bc")` differ.
pub struct CacheKeyBuilder {
    hasher: Xxh64,
}

impl CacheKeyBuilder {
    /// Mix in a string part.
    pub fn part(mut self, value: &str) -> Self {
        self.hasher.write_u64(value.len() as u64);
        self.hasher.write(value.as_bytes());
        self
    }

    /// Mix in an integer part.
    pub fn int(mut self, value: u64) -> Self {
        self.hasher.write_u64(value);
        self
    }

    /// Mix in a flag.
    pub fn flag(mut self, value: bool) -> Self {
        self.hasher.write_u8(value as u8);
        self
    }

    /// Finish the key.
    pub fn finish(self) -> CacheKey {
        CacheKey(self.hasher.finish())
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of entries in the cache.
    pub len: usize,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to compute the value.
    pub misses: u64,
}

#[derive(Debug)]
struct Inner<V> {
    entries: LruCache<CacheKey, Arc<V>>,
    hits: u64,
    misses: u64,
}

/// Keyed memoization cache with explicit invalidation only.
///
/// Values are shared as `Arc<V>` so cached results are never cloned deeply.
#[derive(Debug)]
pub struct MemoCache<V> {
    inner: RwLock<Inner<V>>,
}

impl<V> MemoCache<V> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: LruCache::unbounded(),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Get the cached value for `key`, computing and storing it on a miss.
    ///
    /// Errors from `compute` are returned and nothing is cached.
    pub fn get_or_try_insert<E>(
        &self,
        key: CacheKey,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        {
            let mut inner = self.inner.write();
            if let Some(value) = inner.entries.get(&key).cloned() {
                inner.hits += 1;
                return Ok(value);
            }
            inner.misses += 1;
        }

        let value = Arc::new(compute()?);
        self.inner.write().entries.put(key, Arc::clone(&value));
        Ok(value)
    }

    /// Peek without touching statistics.
    pub fn peek(&self, key: &CacheKey) -> Option<Arc<V>> {
        self.inner.read().entries.peek(key).cloned()
    }

    /// Drop every entry and reset statistics.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.read();
        CacheStats {
            len: inner.entries.len(),
            hits: inner.hits,
            misses: inner.misses,
        }
    }
}

impl<V> Default for MemoCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(parts: &[&str]) -> CacheKey {
        parts.iter().fold(CacheKey::builder(), |b, p| b.part(p)).finish()
    }

    #[test]
    fn test_miss_then_hit() {
        let cache: MemoCache<String> = MemoCache::new();
        let k = key(&["loc/en.tsv"]);

        let v1 = cache.get_or_try_insert(k, || Ok::<_, ()>("first".to_string())).unwrap();
        let v2 = cache.get_or_try_insert(k, || Ok::<_, ()>("second".to_string())).unwrap();

        assert_eq!(*v1, "first");
        assert_eq!(*v2, "first");
        let stats = cache.stats();
        assert_eq!((stats.len, stats.hits, stats.misses), (1, 1, 1));
    }

    #[test]
    fn test_error_not_cached() {
        let cache: MemoCache<u32> = MemoCache::new();
        let k = key(&["x"]);

        assert!(cache.get_or_try_insert(k, || Err("boom")).is_err());
        assert!(cache.peek(&k).is_none());
        assert_eq!(*cache.get_or_try_insert(k, || Ok::<_, &str>(7)).unwrap(), 7);
    }

    #[test]
    fn test_clear() {
        let cache: MemoCache<u32> = MemoCache::new();
        let k = key(&["x"]);
        cache.get_or_try_insert(k, || Ok::<_, ()>(1)).unwrap();

        cache.clear();
        assert_eq!(cache.stats(), CacheStats::default());
        assert!(cache.peek(&k).is_none());
    }

    #[test]
    fn test_key_parts_are_length_prefixed() {
        assert_ne!(key(&["ab", "c"]), key(&["a", "bc"]));
        assert_eq!(key(&["a", "b"]), key(&["a", "b"]));
    }

    #[test]
    fn test_flag_changes_key() {
        let a = CacheKey::builder().part("p").flag(true).finish();
        let b = CacheKey::builder().part("p").flag(false).finish();
        assert_ne!(a, b);
    }
}
