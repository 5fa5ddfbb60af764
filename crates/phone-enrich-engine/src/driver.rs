//! The run loop.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use phone_enrich_cache::{CacheEntry, CacheKey, CacheLookup, LookupCache, LookupOutcome};
use phone_enrich_lookup::{FetchOutcome, Fetcher, PeopleSearch, Sleeper};
use phone_enrich_match::{score, MatchStatus, PhoneSlots};

use crate::checkpoint::{checkpoint_path, Checkpoint};
use crate::config::EnrichConfig;
use crate::report::{RowOutcome, RowSource, RunReport};
use crate::table::{ColumnIndex, InputTable, OutputTable};
use crate::window::Window;
use crate::{EnrichError, Result};

/// One enrichment run: input, output and the settings it runs with.
#[derive(Debug, Clone)]
pub struct EnrichJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub config: EnrichConfig,
    /// Ignore any checkpoint and process the whole window.
    pub restart: bool,
}

/// States a row moves through; logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStage {
    Pending,
    CacheLookup,
    CacheHit,
    CacheMiss,
    Fetch,
    Fetched,
    FetchFailed,
    Score,
    Write,
    Done,
}

/// Run `job` to the end of its window or until `stop` is set.
///
/// Validation, input and window errors are returned before any row is
/// touched. After each row the output file and the checkpoint are rewritten,
/// so the files on disk are consistent whenever the loop stops. Lookup
/// failures never abort the run; they are cached as error outcomes.
pub fn run<S: PeopleSearch, Z: Sleeper>(
    job: &EnrichJob,
    cache: &mut LookupCache,
    fetcher: &mut Fetcher<S, Z>,
    stop: &AtomicBool,
) -> Result<RunReport> {
    let config = &job.config;
    config.validate()?;

    let input = InputTable::read(&job.input)?;
    let columns = input.columns(&config.columns)?;
    let window = Window::resolve(&config.window, input.len())?;

    let mut output = OutputTable::from_input(&input);
    let merged = output.merge_previous(&job.output);

    let cp_path = checkpoint_path(&job.output);
    let resume_row = if job.restart {
        None
    } else {
        Checkpoint::load(&cp_path)
            .and_then(|cp| cp.resume_row(window, &input.digest, cache.path(), config.refresh))
            .filter(|_| {
                if !merged {
                    tracing::warn!(
                        path = %job.output.display(),
                        "checkpoint found but the previous output is unusable, restarting window"
                    );
                }
                merged
            })
    };

    let mut report = RunReport::new(window);
    report.resumed_from = resume_row;
    let mut checkpoint = Checkpoint::start(window, &input.digest, cache.path(), config.refresh);
    let first_row = match resume_row {
        Some(row) => {
            checkpoint.record_row(row - 1);
            row
        }
        None => window.start,
    };

    tracing::info!(
        input = %job.input.display(),
        output = %job.output.display(),
        rows = input.len(),
        start = window.start,
        end = window.end,
        first_row,
        refresh = config.refresh,
        "enrichment started"
    );

    let mut ctx = RowContext {
        config,
        input: &input,
        columns,
        cache,
        fetched_this_run: HashSet::new(),
    };
    if config.refresh {
        // rows before the resume point already refreshed their keys
        ctx.mark_fetched(window.start..first_row);
    }

    for row in first_row..=window.end {
        if stop.load(Ordering::SeqCst) {
            tracing::info!(row, "stop requested, ending run at row boundary");
            report.interrupted = true;
            break;
        }

        let (source, outcome, slots) = ctx.process(row, fetcher, &mut report)?;
        transition(row, None, RowStage::Write);
        output.set_phones(row, &slots);
        output
            .write(&job.output)
            .map_err(|source| EnrichError::Output {
                row,
                path: job.output.clone(),
                source,
            })?;
        checkpoint.record_row(row);
        checkpoint.save(&cp_path)?;
        report.record(source, outcome);
        transition(row, None, RowStage::Done);
    }

    ctx.cache.flush().map_err(|source| EnrichError::Cache {
        row: None,
        key: None,
        source,
    })?;

    if !report.interrupted {
        // also covers a resumed run that had nothing left to do
        output
            .write(&job.output)
            .map_err(|source| EnrichError::Output {
                row: window.end,
                path: job.output.clone(),
                source,
            })?;
        checkpoint.mark_completed();
        checkpoint.save(&cp_path)?;
    }

    report.session_fills = output.fill_counts_in(window);
    report.output_fills = output.fill_counts();
    report.output_rows = output.len();

    tracing::info!(
        rows_processed = report.rows_processed,
        cache_hits = report.cache_hits,
        live_fetches = report.live_fetches,
        fetch_failures = report.fetch_failures,
        interrupted = report.interrupted,
        "enrichment finished"
    );
    Ok(report)
}

fn transition(row: usize, key: Option<&CacheKey>, stage: RowStage) {
    match key {
        Some(key) => tracing::debug!(row, key = %key, ?stage, "row stage"),
        None => tracing::debug!(row, ?stage, "row stage"),
    }
}

struct RowContext<'a> {
    config: &'a EnrichConfig,
    input: &'a InputTable,
    columns: ColumnIndex,
    cache: &'a mut LookupCache,
    /// Keys fetched during this run; refresh bypasses the cache only once
    /// per key.
    fetched_this_run: HashSet<CacheKey>,
}

impl RowContext<'_> {
    fn mark_fetched(&mut self, rows: std::ops::Range<usize>) {
        for row in rows {
            let identity = self.input.identity(
                row,
                &self.columns,
                &self.config.columns,
                self.config.scoring.name_order,
            );
            if !identity.name.is_empty() {
                self.fetched_this_run.insert(identity.key);
            }
        }
    }

    fn process<S: PeopleSearch, Z: Sleeper>(
        &mut self,
        row: usize,
        fetcher: &mut Fetcher<S, Z>,
        report: &mut RunReport,
    ) -> Result<(Option<RowSource>, RowOutcome, PhoneSlots)> {
        transition(row, None, RowStage::Pending);
        let identity = self.input.identity(
            row,
            &self.columns,
            &self.config.columns,
            self.config.scoring.name_order,
        );
        if identity.name.is_empty() {
            tracing::warn!(row, "blank name, row skipped");
            return Ok((None, RowOutcome::SkippedBlankName, PhoneSlots::default()));
        }
        let key = identity.key;

        transition(row, Some(&key), RowStage::CacheLookup);
        let bypass = self.config.refresh && !self.fetched_this_run.contains(&key);
        let cached = if bypass {
            None
        } else {
            match self.cache.lookup(&key, Utc::now()) {
                CacheLookup::Hit(entry) => Some(entry.clone()),
                CacheLookup::Miss(reason) => {
                    tracing::debug!(row, key = %key, ?reason, "cache miss");
                    None
                }
            }
        };

        let (source, entry) = match cached {
            Some(entry) => {
                transition(row, Some(&key), RowStage::CacheHit);
                (RowSource::Cache, entry)
            }
            None => {
                transition(row, Some(&key), RowStage::CacheMiss);
                transition(row, Some(&key), RowStage::Fetch);
                let fetch = fetcher.fetch(&identity.query);
                if fetch.attempts > 0 {
                    report.live_fetches += 1;
                }
                let entry = match fetch.outcome {
                    FetchOutcome::Success(candidates) => {
                        transition(row, Some(&key), RowStage::Fetched);
                        CacheEntry::from_candidates(candidates, Utc::now())
                    }
                    FetchOutcome::TransientFailure(err) | FetchOutcome::PermanentFailure(err) => {
                        transition(row, Some(&key), RowStage::FetchFailed);
                        report.fetch_failures += 1;
                        tracing::warn!(
                            row,
                            key = %key,
                            attempts = fetch.attempts,
                            error = %err,
                            "lookup failed, caching error outcome"
                        );
                        CacheEntry::failed(err.to_string(), Utc::now())
                    }
                };
                self.fetched_this_run.insert(key.clone());
                self.cache
                    .put(&key, entry.clone())
                    .map_err(|source| EnrichError::Cache {
                        row: Some(row),
                        key: Some(key.to_string()),
                        source,
                    })?;
                (RowSource::Live, entry)
            }
        };

        transition(row, Some(&key), RowStage::Score);
        let (outcome, slots) = if entry.outcome == LookupOutcome::Error {
            (RowOutcome::LookupFailed, PhoneSlots::default())
        } else {
            let ranking = score(&identity.target, &entry.candidates, &self.config.scoring);
            let slots = ranking.phones(&self.config.scoring);
            let outcome = match ranking.status() {
                MatchStatus::Matched => RowOutcome::Matched {
                    phones: slots.len(),
                },
                MatchStatus::NoCandidates => RowOutcome::NoCandidates,
                MatchStatus::AllFiltered => RowOutcome::AllFiltered,
            };
            tracing::debug!(
                row,
                accepted = ranking.accepted.len(),
                rejected = ranking.rejected.len(),
                "scored candidates"
            );
            (outcome, slots)
        };

        tracing::info!(
            row,
            key = %key,
            source = ?source,
            outcome = ?outcome,
            phones = slots.len(),
            "row enriched"
        );
        Ok((Some(source), outcome, slots))
    }
}
