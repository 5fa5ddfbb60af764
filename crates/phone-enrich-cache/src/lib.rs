//! Lookup cache for phone enrichment
//!
//! A persistent key → result store addressed by the normalized identity of a
//! row (name, city, state). The on-disk form is a single JSON document:
//!
//! ```json
//! {
//!   "john smith|miami|fl": {
//!     "candidates": [ ... ],
//!     "fetched_at": "2026-03-01T12:00:00Z",
//!     "outcome": "found"
//!   }
//! }
//! ```
//!
//! - Lookups are exact on the key; fuzziness belongs to the scorer.
//! - Not-found and error outcomes are cached too, as separate outcomes.
//! - Every write replaces the file atomically (temp file + rename).
//! - The handle flushes pending entries when dropped.

use std::path::PathBuf;

pub mod atomic;
pub mod entry;
pub mod store;

pub use atomic::write_atomic;
pub use entry::{CacheEntry, CacheKey, LookupOutcome};
pub use store::{CacheLookup, CachePolicy, CacheStats, LookupCache, MissReason};

/// Errors from loading or persisting the cache file.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cache serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;
