//! Cache of compiled arithmetic stubs.
//!
//! Stubs are monomorphic in `(operator, double-result policy)`, so one
//! compiled stub serves every call site that observed the same shape. The
//! cache provides:
//! - O(1) lookup of a compiled stub by key
//! - Compile-once publication behind `Arc`
//! - Statistics and debugging support
//!
//! The normalized key space holds at most twelve entries (eleven operators,
//! with the policy flag meaningful only for `Ursh`), so there is no eviction
//! policy.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use rustc_hash::FxHashMap;

use crate::ic::{BinaryArithCompiler, BinaryArithOp};
use crate::masm::CodegenError;
use crate::stub::GeneratedStub;

// =============================================================================
// Stub Key
// =============================================================================

/// Cache key identifying one stub shape.
///
/// Construction normalizes the policy flag the same way
/// [`BinaryArithCompiler::new`] does: it is stored as `false` for every
/// operator except `Ursh`, so `(Add, true)` and `(Add, false)` name the same
/// stub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StubKey {
    op: BinaryArithOp,
    allow_double: bool,
}

impl StubKey {
    /// Create a normalized key.
    #[must_use]
    pub const fn new(op: BinaryArithOp, allow_double: bool) -> Self {
        StubKey {
            op,
            allow_double: allow_double && matches!(op, BinaryArithOp::Ursh),
        }
    }

    /// The operator.
    #[inline]
    #[must_use]
    pub const fn op(&self) -> BinaryArithOp {
        self.op
    }

    /// The effective double-result policy.
    #[inline]
    #[must_use]
    pub const fn allow_double(&self) -> bool {
        self.allow_double
    }
}

// =============================================================================
// Stub Cache
// =============================================================================

/// A cache for storing compiled arithmetic stubs.
///
/// Thread-safe via internal locking.
#[derive(Debug)]
pub struct StubCache {
    /// Map from stub key to compiled stub.
    stubs: RwLock<FxHashMap<StubKey, Arc<GeneratedStub>>>,
    /// Lookup hit counter.
    hits: AtomicU64,
    /// Lookup miss counter.
    misses: AtomicU64,
    /// Insert counter.
    insertions: AtomicU64,
}

impl StubCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stubs: RwLock::new(FxHashMap::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            insertions: AtomicU64::new(0),
        }
    }

    /// Look up a compiled stub by key.
    #[inline]
    pub fn lookup(&self, key: StubKey) -> Option<Arc<GeneratedStub>> {
        let stubs = self.stubs.read().unwrap();
        let result = stubs.get(&key).cloned();
        drop(stubs);

        // Update stats
        if result.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }

        result
    }

    /// Get the stub for `key`, compiling and publishing it on first use.
    ///
    /// Compilation runs outside the lock, so two threads racing on the same
    /// key may both compile; the first insert wins and the loser's stub is
    /// dropped. Both are byte-identical, so callers never observe the race.
    pub fn get_or_compile(&self, key: StubKey) -> Result<Arc<GeneratedStub>, CodegenError> {
        if let Some(stub) = self.lookup(key) {
            return Ok(stub);
        }

        let compiled = Arc::new(BinaryArithCompiler::new(key.op(), key.allow_double()).compile()?);

        let mut stubs = self.stubs.write().unwrap();
        let entry = stubs.entry(key).or_insert_with(|| {
            self.insertions.fetch_add(1, Ordering::Relaxed);
            Arc::clone(&compiled)
        });
        Ok(Arc::clone(entry))
    }

    /// Get the number of stubs in the cache.
    #[inline]
    pub fn len(&self) -> usize {
        self.stubs.read().unwrap().len()
    }

    /// Check if the cache is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics.
    #[inline]
    pub fn stats(&self) -> StubCacheStats {
        StubCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
        }
    }

    /// Clear the entire cache.
    pub fn clear(&self) {
        self.stubs.write().unwrap().clear();
    }
}

impl Default for StubCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Statistics for the stub cache.
#[derive(Debug, Default, Clone)]
pub struct StubCacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of insertions.
    pub insertions: u64,
}

impl StubCacheStats {
    /// Calculate hit rate.
    #[inline]
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
