//! Symbol generation: deterministic key → vector mapping.
//!
//! This module provides the core guarantee of glyphic:
//! the same `(seed, key)` pair ALWAYS produces the SAME vector, independent
//! of call order, process, or prior cache state. The cache is a memoization
//! layer only, never a source of nondeterminism.

use crate::vector::Vector;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Shared memoization cache for generated symbols, keyed by `(seed, key)`.
///
/// Injectable: several generators (for example an [`Encoder`](crate::Encoder)
/// and an [`IntentEncoder`](crate::IntentEncoder) on the same seed) may share
/// one cache. Concurrent readers are fine; writes go through the lock. A
/// cache hit must be bit-identical to an uncached computation; that is a
/// correctness invariant, not a performance one.
#[derive(Clone, Default)]
pub struct SymbolCache {
    entries: Arc<RwLock<HashMap<(u64, String), Vector>>>,
}

impl SymbolCache {
    /// Create a new, empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, seed: u64, key: &str) -> Option<Vector> {
        let entries = self.entries.read().unwrap();
        entries.get(&(seed, key.to_string())).cloned()
    }

    fn insert(&self, seed: u64, key: &str, vector: Vector) {
        let mut entries = self.entries.write().unwrap();
        entries.insert((seed, key.to_string()), vector);
    }

    /// Discard all memoized symbols. Future lookups recompute identically.
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap();
        entries.clear();
    }

    /// Number of cached symbols. Diagnostic only.
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap();
        entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Deterministic pseudo-random symbol generator.
///
/// Uses SHA-256 of `(seed || key)` to seed a ChaCha8 stream, so unrelated
/// keys are statistically independent (near-orthogonal in expectation) and
/// the same key under a different seed yields an unrelated vector.
#[derive(Clone)]
pub struct SymbolGenerator {
    dimension: usize,
    seed: u64,
    cache: SymbolCache,
}

impl SymbolGenerator {
    /// Create a generator with its own private cache.
    pub fn new(dimension: usize, seed: u64) -> Self {
        Self::with_cache(dimension, seed, SymbolCache::new())
    }

    /// Create a generator backed by an existing (possibly shared) cache.
    pub fn with_cache(dimension: usize, seed: u64, cache: SymbolCache) -> Self {
        Self {
            dimension,
            seed,
            cache,
        }
    }

    /// Get the dimensionality.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Get the seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Get the symbol vector for a key.
    ///
    /// Pure function of `(seed, key, dimension)`; the cache only memoizes.
    pub fn symbol(&self, key: &str) -> Vector {
        if let Some(vec) = self.cache.get(self.seed, key) {
            return vec;
        }

        let vec = self.compute_symbol(key);
        self.cache.insert(self.seed, key, vec.clone());
        vec
    }

    /// Compute a deterministic dense bipolar vector for a key.
    fn compute_symbol(&self, key: &str) -> Vector {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(key.as_bytes());
        let hash = hasher.finalize();

        let stream_seed = u64::from_le_bytes(hash[0..8].try_into().unwrap());
        let mut rng = ChaCha8Rng::seed_from_u64(stream_seed);

        let mut data = vec![0i8; self.dimension];
        for slot in data.iter_mut() {
            let r = rng.next_u32();
            *slot = if r & 1 == 0 { 1 } else { -1 };
        }

        Vector::from_data(data)
    }

    /// Discard all memoized symbols without affecting future determinism.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Number of cached symbols. Diagnostic only, never load-bearing.
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let g1 = SymbolGenerator::new(1000, 42);
        let g2 = SymbolGenerator::new(1000, 42);

        assert_eq!(g1.symbol("hello"), g2.symbol("hello"));
    }

    #[test]
    fn test_different_seeds() {
        let g1 = SymbolGenerator::new(1000, 42);
        let g2 = SymbolGenerator::new(1000, 43);

        assert_ne!(g1.symbol("hello"), g2.symbol("hello"));
    }

    #[test]
    fn test_different_keys() {
        let g = SymbolGenerator::new(1000, 42);

        assert_ne!(g.symbol("hello"), g.symbol("world"));
    }

    #[test]
    fn test_dense_bipolar() {
        let g = SymbolGenerator::new(1000, 42);
        let v = g.symbol("hello");
        assert_eq!(v.nnz(), 1000);
        assert!(v.data().iter().all(|&x| x == 1 || x == -1));
    }

    #[test]
    fn test_cache_purity() {
        let g = SymbolGenerator::new(1000, 42);

        let before = g.symbol("hello");
        assert_eq!(g.cache_size(), 1);

        g.clear_cache();
        assert_eq!(g.cache_size(), 0);

        let after = g.symbol("hello");
        assert_eq!(before, after);
    }

    #[test]
    fn test_shared_cache_keyed_by_seed() {
        let cache = SymbolCache::new();
        let g1 = SymbolGenerator::with_cache(1000, 1, cache.clone());
        let g2 = SymbolGenerator::with_cache(1000, 2, cache.clone());

        let v1 = g1.symbol("hello");
        let v2 = g2.symbol("hello");

        // Same key under different seeds must not collide in the cache.
        assert_ne!(v1, v2);
        assert_eq!(cache.len(), 2);
    }
}
