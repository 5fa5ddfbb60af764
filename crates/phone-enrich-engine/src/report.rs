//! Per-row outcomes and the run summary.

use serde::Serialize;

use crate::window::Window;

/// Where a row's candidates came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowSource {
    Cache,
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RowOutcome {
    /// At least one candidate survived scoring.
    Matched { phones: usize },
    /// The service had nobody under this identity.
    NoCandidates,
    /// Candidates came back but every one was excluded.
    AllFiltered,
    /// The lookup (now or in an earlier run) ended in an error.
    LookupFailed,
    SkippedBlankName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub window: Window,
    /// First row of this run when it continued an interrupted one.
    pub resumed_from: Option<usize>,
    pub rows_processed: usize,
    pub cache_hits: usize,
    /// Rows that sent at least one request.
    pub live_fetches: usize,
    pub fetch_failures: usize,
    pub matched: usize,
    pub no_candidates: usize,
    pub all_filtered: usize,
    pub lookup_failed: usize,
    pub skipped: usize,
    /// Filled Phone1..Phone4 cells within the window.
    pub session_fills: [usize; 4],
    /// Filled Phone1..Phone4 cells over the whole output.
    pub output_fills: [usize; 4],
    pub output_rows: usize,
    /// The stop signal ended the run before the window was done.
    pub interrupted: bool,
}

impl RunReport {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            resumed_from: None,
            rows_processed: 0,
            cache_hits: 0,
            live_fetches: 0,
            fetch_failures: 0,
            matched: 0,
            no_candidates: 0,
            all_filtered: 0,
            lookup_failed: 0,
            skipped: 0,
            session_fills: [0; 4],
            output_fills: [0; 4],
            output_rows: 0,
            interrupted: false,
        }
    }

    pub fn record(&mut self, source: Option<RowSource>, outcome: RowOutcome) {
        self.rows_processed += 1;
        if source == Some(RowSource::Cache) {
            self.cache_hits += 1;
        }
        match outcome {
            RowOutcome::Matched { .. } => self.matched += 1,
            RowOutcome::NoCandidates => self.no_candidates += 1,
            RowOutcome::AllFiltered => self.all_filtered += 1,
            RowOutcome::LookupFailed => self.lookup_failed += 1,
            RowOutcome::SkippedBlankName => self.skipped += 1,
        }
    }
}
