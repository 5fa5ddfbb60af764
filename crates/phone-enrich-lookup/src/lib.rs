//! People-search lookup client
//!
//! One live query per uncached identity:
//!
//! ```text
//! LookupQuery ──► Fetcher ──► pacing sleep ──► PeopleSearch::search ──► parse_result_page
//!                    ▲                               │
//!                    └──── BackoffPolicy ◄── Transient error (timeout, 5xx, 403/429)
//! ```
//!
//! - [`PeopleSearch`] is the seam: [`HttpPeopleSearch`] talks to the live
//!   site, tests plug in fakes.
//! - [`Fetcher`] owns pacing and retries and never fails: it reports a
//!   [`FetchOutcome`] that the caller records in the cache.
//! - The parser is tolerant: markup it does not recognize yields no candidates.

use std::time::Duration;

use phone_enrich_match::Candidate;

pub mod backoff;
pub mod client;
pub mod fetcher;
pub mod pacer;
pub mod parser;
pub mod query;

pub use backoff::{BackoffPolicy, RecordingSleeper, Sleeper, ThreadSleeper};
pub use client::{HttpPeopleSearch, LookupSettings};
pub use fetcher::{FetchOutcome, FetchReport, Fetcher};
pub use pacer::Pacer;
pub use parser::parse_result_page;
pub use query::LookupQuery;

/// A failed lookup, classified by whether retrying can help.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LookupError {
    /// Network failure, timeout, server error or a blocking response.
    #[error("transient lookup failure: {message}")]
    Transient {
        message: String,
        /// Server-requested wait before the next attempt.
        retry_after: Option<Duration>,
    },

    /// Malformed query or a request the service will never answer.
    #[error("permanent lookup failure: {message}")]
    Permanent { message: String },
}

impl LookupError {
    pub fn transient(message: impl Into<String>) -> Self {
        LookupError::Transient {
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        LookupError::Permanent {
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, LookupError::Transient { .. })
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LookupError::Transient { retry_after, .. } => *retry_after,
            LookupError::Permanent { .. } => None,
        }
    }
}

/// A people-search backend: one query in, raw candidates out.
///
/// An empty result is a valid answer (the service knows nobody by that name);
/// errors are reserved for failures to get an answer at all.
pub trait PeopleSearch {
    fn search(&mut self, query: &LookupQuery) -> Result<Vec<Candidate>, LookupError>;
}

impl<T: PeopleSearch + ?Sized> PeopleSearch for Box<T> {
    fn search(&mut self, query: &LookupQuery) -> Result<Vec<Candidate>, LookupError> {
        (**self).search(query)
    }
}
