//! Run-scoped mapping from original to anonymized values.
//!
//! Two-tier storage: a bounded in-memory LRU in front of a SQLite spill
//! database in a run-owned temp directory. Every insert writes through to
//! disk, so an LRU eviction never loses a mapping. A reverse index of taken
//! anonymized values backs the uniqueness guarantee for unique-constrained
//! columns.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::RwLock;

use lru::LruCache;
use rusqlite::{Connection, OptionalExtension};
use tempfile::TempDir;

use pganon_core::{Error, Result};

/// Default Tier-1 capacity.
pub const DEFAULT_CACHE_SIZE: usize = 1_000_000;

struct Inner {
    cache: LruCache<String, String>,
    reverse: HashSet<String>,
    disk: Connection,
}

/// The shared original→anonymized dictionary.
///
/// All access goes through the write half of the lock: even lookups update
/// LRU recency. The spill directory is removed when the dictionary is
/// dropped, on any exit path.
pub struct Dictionary {
    inner: RwLock<Inner>,
    // Held for its Drop: deletes the spill database with the run.
    _spill_dir: TempDir,
}

impl Dictionary {
    /// Create a dictionary with the given Tier-1 capacity (0 means default).
    pub fn new(cache_size: usize) -> Result<Self> {
        let capacity = if cache_size == 0 {
            DEFAULT_CACHE_SIZE
        } else {
            cache_size
        };
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);

        let spill_dir = TempDir::with_prefix("pganon-dict-")
            .map_err(|err| Error::database_msg("dictionary", format!("spill dir: {err}")))?;
        let disk = Connection::open(spill_dir.path().join("mappings.sqlite"))
            .map_err(|err| Error::database_msg("dictionary", format!("spill open: {err}")))?;

        disk.execute_batch(
            "CREATE TABLE IF NOT EXISTS mappings (
                 original TEXT PRIMARY KEY,
                 anonymized TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_anonymized ON mappings(anonymized);",
        )
        .map_err(|err| Error::database_msg("dictionary", format!("spill schema: {err}")))?;

        Ok(Self {
            inner: RwLock::new(Inner {
                cache: LruCache::new(capacity),
                reverse: HashSet::new(),
                disk,
            }),
            _spill_dir: spill_dir,
        })
    }

    /// Look up the anonymized value for an original. A disk hit is promoted
    /// back into the LRU.
    pub fn get(&self, original: &str) -> Option<String> {
        let mut inner = self.write();
        if let Some(value) = inner.cache.get(original) {
            return Some(value.clone());
        }

        let found: Option<String> = inner
            .disk
            .query_row(
                "SELECT anonymized FROM mappings WHERE original = ?1",
                [original],
                |row| row.get(0),
            )
            .optional()
            .ok()
            .flatten();

        if let Some(value) = &found {
            inner.cache.put(original.to_string(), value.clone());
        }
        found
    }

    /// Store a mapping unconditionally. Used for columns without uniqueness
    /// requirements, where two originals may share an output.
    pub fn put(&self, original: &str, anonymized: &str) {
        let mut inner = self.write();
        inner.put_locked(original, anonymized);
    }

    /// Store a mapping only if `anonymized` is not already taken by a
    /// different original. Returns whether the mapping is now in place.
    pub fn put_unique(&self, original: &str, anonymized: &str) -> bool {
        let mut inner = self.write();

        if inner.reverse.contains(anonymized) {
            // Taken. Fine only if it is this original's own mapping.
            return inner.cache.get(original).map(String::as_str) == Some(anonymized);
        }

        // Reverse-index misses can still be on disk after eviction.
        let existing: Option<String> = inner
            .disk
            .query_row(
                "SELECT original FROM mappings WHERE anonymized = ?1",
                [anonymized],
                |row| row.get(0),
            )
            .optional()
            .ok()
            .flatten();

        if let Some(owner) = existing {
            inner.reverse.insert(anonymized.to_string());
            return owner == original;
        }

        inner.put_locked(original, anonymized);
        true
    }

    /// Mark values as taken so freshly generated values can never collide
    /// with data already in the database.
    pub fn preload_used(&self, values: &[String]) {
        let mut inner = self.write();
        for value in values {
            inner.reverse.insert(value.clone());
        }
    }

    /// True when an anonymized value is known to be in use.
    pub fn is_used(&self, anonymized: &str) -> bool {
        self.write().reverse.contains(anonymized)
    }

    /// Entries currently resident in the LRU tier.
    pub fn cached_len(&self) -> usize {
        self.write().cache.len()
    }

    /// Entries in the on-disk tier.
    pub fn disk_len(&self) -> usize {
        let inner = self.write();
        inner
            .disk
            .query_row("SELECT COUNT(*) FROM mappings", [], |row| row.get::<_, i64>(0))
            .unwrap_or(0) as usize
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Inner {
    fn put_locked(&mut self, original: &str, anonymized: &str) {
        self.cache.put(original.to_string(), anonymized.to_string());
        self.reverse.insert(anonymized.to_string());
        let _ = self.disk.execute(
            "INSERT OR REPLACE INTO mappings (original, anonymized) VALUES (?1, ?2)",
            [original, anonymized],
        );
    }
}
