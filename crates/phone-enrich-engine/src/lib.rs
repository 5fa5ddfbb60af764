//! Enrichment driver
//!
//! Walks a window of input rows, resolves each row's identity through the
//! lookup cache (fetching on a miss), scores the candidates against the row
//! and writes up to four phone numbers into the output table.
//!
//! ```text
//! PENDING → CACHE_LOOKUP → CACHE_HIT ─────────────────────┐
//!                        → CACHE_MISS → FETCH → FETCHED ──┤
//!                                             → FETCH_FAILED
//!                                                         ↓
//!                                      SCORE → WRITE → DONE
//! ```
//!
//! Progress is durable per row: the output file and a checkpoint are written
//! after every row, so an interrupted run resumes where it stopped.

use std::path::PathBuf;

use phone_enrich_cache::CacheError;

pub mod checkpoint;
pub mod config;
pub mod digest;
pub mod driver;
pub mod report;
pub mod table;
pub mod window;

pub use checkpoint::{checkpoint_path, Checkpoint};
pub use config::{ColumnMap, EnrichConfig, WindowConfig};
pub use driver::{run, EnrichJob, RowStage};
pub use report::{RowOutcome, RowSource, RunReport};
pub use table::{InputTable, OutputTable, PHONE_COLUMNS};
pub use window::Window;

/// Errors that abort a run. Per-row lookup failures are not errors: they are
/// recorded in the cache and the report.
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid row window: {0}")]
    Range(String),

    #[error("input error in {path}: {message}")]
    Input { path: PathBuf, message: String },

    #[error("cache failure{}: {source}", row_context(.row, .key))]
    Cache {
        row: Option<usize>,
        key: Option<String>,
        #[source]
        source: CacheError,
    },

    #[error("failed to write output {path} at row {row}: {source}")]
    Output {
        row: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checkpoint error in {path}: {message}")]
    Checkpoint { path: PathBuf, message: String },
}

fn row_context(row: &Option<usize>, key: &Option<String>) -> String {
    match (row, key) {
        (Some(row), Some(key)) => format!(" at row {row} (key {key})"),
        (Some(row), None) => format!(" at row {row}"),
        (None, Some(key)) => format!(" (key {key})"),
        (None, None) => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, EnrichError>;
