//! The cache handle: load, lookup policy, put, flush.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

use crate::atomic::write_atomic;
use crate::entry::{CacheEntry, CacheKey, LookupOutcome};
use crate::{CacheError, Result};

/// Which cached entries still count as hits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachePolicy {
    /// Entries older than this are misses.
    pub max_age: Option<Duration>,
    /// Treat `Error` outcomes fetched before this handle was opened as misses.
    /// `NotFound` outcomes always stay hits.
    pub retry_errors: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    Absent,
    Stale,
    PriorError,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CacheLookup<'a> {
    Hit(&'a CacheEntry),
    Miss(MissReason),
}

/// Counts for `cache stats`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub entries: usize,
    pub found: usize,
    pub not_found: usize,
    pub errors: usize,
    pub candidates: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

/// An open cache file.
///
/// The handle owns the file for its lifetime; concurrent handles on the same
/// path are not coordinated. Pending entries are written on [`flush`], after
/// every `flush_every` puts, and when the handle is dropped.
///
/// [`flush`]: LookupCache::flush
#[derive(Debug)]
pub struct LookupCache {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
    policy: CachePolicy,
    opened_at: DateTime<Utc>,
    pending: usize,
    flush_every: usize,
}

impl LookupCache {
    /// Load the cache at `path`. A missing or blank file is an empty cache; a
    /// file that does not parse is an error, never silently replaced.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| CacheError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(CacheError::Io { path, source }),
        };
        tracing::debug!(path = %path.display(), entries = entries.len(), "cache loaded");
        Ok(Self {
            path,
            entries,
            policy: CachePolicy::default(),
            opened_at: Utc::now(),
            pending: 0,
            flush_every: 1,
        })
    }

    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Flush after this many puts (minimum 1).
    pub fn with_flush_every(mut self, puts: usize) -> Self {
        self.flush_every = puts.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Puts not yet written to disk.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Exact lookup, no policy applied.
    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key.as_str())
    }

    /// Lookup with staleness and error-retry policy applied.
    pub fn lookup(&self, key: &CacheKey, now: DateTime<Utc>) -> CacheLookup<'_> {
        let Some(entry) = self.get(key) else {
            return CacheLookup::Miss(MissReason::Absent);
        };
        if let Some(max_age) = self.policy.max_age {
            if now.signed_duration_since(entry.fetched_at) > max_age {
                return CacheLookup::Miss(MissReason::Stale);
            }
        }
        if self.policy.retry_errors
            && entry.outcome == LookupOutcome::Error
            && entry.fetched_at < self.opened_at
        {
            return CacheLookup::Miss(MissReason::PriorError);
        }
        CacheLookup::Hit(entry)
    }

    /// Store `entry` under `key`, replacing any previous payload while
    /// keeping its unknown fields.
    pub fn put(&mut self, key: &CacheKey, entry: CacheEntry) -> Result<()> {
        match self.entries.get_mut(key.as_str()) {
            Some(existing) => existing.replace_with(entry),
            None => {
                self.entries.insert(key.as_str().to_string(), entry);
            }
        }
        self.pending += 1;
        if self.pending >= self.flush_every {
            self.flush()?;
        }
        Ok(())
    }

    /// Write all entries to disk atomically.
    pub fn flush(&mut self) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.entries)?;
        write_atomic(&self.path, &bytes).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(path = %self.path.display(), entries = self.entries.len(), "cache flushed");
        self.pending = 0;
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            entries: self.entries.len(),
            ..Default::default()
        };
        for entry in self.entries.values() {
            match entry.outcome {
                LookupOutcome::Found => stats.found += 1,
                LookupOutcome::NotFound => stats.not_found += 1,
                LookupOutcome::Error => stats.errors += 1,
            }
            stats.candidates += entry.candidates.len();
            stats.oldest = Some(stats.oldest.map_or(entry.fetched_at, |t| t.min(entry.fetched_at)));
            stats.newest = Some(stats.newest.map_or(entry.fetched_at, |t| t.max(entry.fetched_at)));
        }
        stats
    }
}

impl Drop for LookupCache {
    fn drop(&mut self) {
        if self.pending == 0 {
            return;
        }
        if let Err(err) = self.flush() {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to flush cache on drop");
        }
    }
}
