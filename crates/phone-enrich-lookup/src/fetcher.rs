//! Paced, retried lookups.

use std::time::Duration;

use phone_enrich_match::normalize::normalize_text;
use phone_enrich_match::phone::phone_key;
use phone_enrich_match::Candidate;

use crate::backoff::{BackoffPolicy, Sleeper, ThreadSleeper};
use crate::pacer::Pacer;
use crate::query::LookupQuery;
use crate::{LookupError, PeopleSearch};

/// Final result of one fetch after retries.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(Vec<Candidate>),
    /// Retries exhausted on a retryable error.
    TransientFailure(LookupError),
    PermanentFailure(LookupError),
}

impl FetchOutcome {
    pub fn error(&self) -> Option<&LookupError> {
        match self {
            FetchOutcome::Success(_) => None,
            FetchOutcome::TransientFailure(err) | FetchOutcome::PermanentFailure(err) => Some(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchReport {
    pub outcome: FetchOutcome,
    /// Requests sent over all search variants; 0 when the query was rejected
    /// up front.
    pub attempts: u32,
    /// Pacing plus backoff time slept.
    pub waited: Duration,
}

/// Wraps a [`PeopleSearch`] with pacing and the retry policy.
pub struct Fetcher<S, Z = ThreadSleeper> {
    search: S,
    pacer: Pacer,
    backoff: BackoffPolicy,
    sleeper: Z,
    requests: u64,
}

impl<S: PeopleSearch> Fetcher<S, ThreadSleeper> {
    pub fn with_thread_sleeper(search: S, pacer: Pacer, backoff: BackoffPolicy) -> Self {
        Self::new(search, pacer, backoff, ThreadSleeper)
    }
}

impl<S: PeopleSearch, Z: Sleeper> Fetcher<S, Z> {
    pub fn new(search: S, pacer: Pacer, backoff: BackoffPolicy, sleeper: Z) -> Self {
        Self {
            search,
            pacer,
            backoff,
            sleeper,
            requests: 0,
        }
    }

    pub fn search(&self) -> &S {
        &self.search
    }

    /// Requests sent over the fetcher's lifetime, retries included.
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Run every search variant of `query` (see [`LookupQuery::variants`]),
    /// each paced and retried, and merge their candidates in order.
    ///
    /// The merge succeeds when any variant succeeds; a failed variant next to
    /// a successful one is logged and skipped. When all fail, the first
    /// failure is the outcome. Never fails.
    pub fn fetch(&mut self, query: &LookupQuery) -> FetchReport {
        if let Err(err) = query.validate() {
            return FetchReport {
                outcome: FetchOutcome::PermanentFailure(err),
                attempts: 0,
                waited: Duration::ZERO,
            };
        }

        let mut merged: Option<Vec<Candidate>> = None;
        let mut first_failure = None;
        let mut attempts = 0;
        let mut waited = Duration::ZERO;
        for variant in query.variants() {
            let report = self.fetch_variant(&variant);
            attempts += report.attempts;
            waited += report.waited;
            match report.outcome {
                FetchOutcome::Success(candidates) => {
                    let found = merged.get_or_insert_with(Vec::new);
                    for candidate in candidates {
                        if !found.iter().any(|seen| same_listing(seen, &candidate)) {
                            found.push(candidate);
                        }
                    }
                }
                failure => {
                    tracing::warn!(
                        middle_initial = ?variant.middle_initial,
                        error = ?failure.error(),
                        "search variant failed"
                    );
                    first_failure.get_or_insert(failure);
                }
            }
        }

        let outcome = match (merged, first_failure) {
            (Some(candidates), _) => FetchOutcome::Success(candidates),
            (None, Some(failure)) => failure,
            (None, None) => FetchOutcome::Success(Vec::new()),
        };
        FetchReport {
            outcome,
            attempts,
            waited,
        }
    }

    /// Pace, query and retry one variant until the outcome is final.
    fn fetch_variant(&mut self, query: &LookupQuery) -> FetchReport {
        let mut waited = self.pacer.pause(&mut self.sleeper);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.requests += 1;
            let err = match self.search.search(query) {
                Ok(candidates) => {
                    return FetchReport {
                        outcome: FetchOutcome::Success(candidates),
                        attempts: attempt,
                        waited,
                    }
                }
                Err(err) => err,
            };

            match self.backoff.next_delay(attempt, &err) {
                Some(delay) => {
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "lookup failed, retrying"
                    );
                    self.sleeper.sleep(delay);
                    waited += delay;
                }
                None => {
                    let outcome = if err.is_retryable() {
                        tracing::warn!(attempts = attempt, error = %err, "lookup retries exhausted");
                        FetchOutcome::TransientFailure(err)
                    } else {
                        tracing::warn!(attempts = attempt, error = %err, "lookup rejected");
                        FetchOutcome::PermanentFailure(err)
                    };
                    return FetchReport {
                        outcome,
                        attempts: attempt,
                        waited,
                    };
                }
            }
        }
    }
}

/// The same card returned by two variants: equal name and phone numbers.
fn same_listing(a: &Candidate, b: &Candidate) -> bool {
    let phones = |c: &Candidate| -> Vec<String> {
        c.phones.iter().filter_map(|p| phone_key(p)).collect()
    };
    normalize_text(&a.name) == normalize_text(&b.name) && phones(a) == phones(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::RecordingSleeper;
    use phone_enrich_match::NameOrder;
    use std::collections::VecDeque;

    struct Scripted {
        replies: VecDeque<Result<Vec<Candidate>, LookupError>>,
    }

    impl PeopleSearch for Scripted {
        fn search(&mut self, _query: &LookupQuery) -> Result<Vec<Candidate>, LookupError> {
            self.replies
                .pop_front()
                .unwrap_or_else(|| Err(LookupError::permanent("script exhausted")))
        }
    }

    fn fetcher(
        replies: Vec<Result<Vec<Candidate>, LookupError>>,
        recorder: &RecordingSleeper,
    ) -> Fetcher<Scripted, RecordingSleeper> {
        Fetcher::new(
            Scripted {
                replies: replies.into(),
            },
            Pacer::from_secs_f64(1.0, 0.0),
            BackoffPolicy::default(),
            recorder.clone(),
        )
    }

    fn query() -> LookupQuery {
        LookupQuery::from_record("SMITH JOHN", "Miami", "FL", NameOrder::Auto)
    }

    #[test]
    fn transient_errors_retry_then_succeed() {
        let recorder = RecordingSleeper::new();
        let mut f = fetcher(
            vec![
                Err(LookupError::transient("timeout")),
                Ok(vec![Candidate::new("John Smith", "", "Miami", "FL", &["3055550100"])]),
            ],
            &recorder,
        );
        let report = f.fetch(&query());
        assert!(matches!(report.outcome, FetchOutcome::Success(ref c) if c.len() == 1));
        assert_eq!(report.attempts, 2);
        // pacing, then one backoff
        assert_eq!(
            recorder.sleeps(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[test]
    fn exhausted_retries_become_transient_failure() {
        let recorder = RecordingSleeper::new();
        let mut f = fetcher(
            (0..5).map(|_| Err(LookupError::transient("HTTP 503"))).collect(),
            &recorder,
        );
        let report = f.fetch(&query());
        assert!(matches!(report.outcome, FetchOutcome::TransientFailure(_)));
        assert_eq!(report.attempts, 3);
        assert_eq!(f.requests(), 3);
        assert_eq!(report.waited, Duration::from_secs(1 + 2 + 4));
    }

    #[test]
    fn permanent_errors_do_not_retry() {
        let recorder = RecordingSleeper::new();
        let mut f = fetcher(vec![Err(LookupError::permanent("HTTP 400"))], &recorder);
        let report = f.fetch(&query());
        assert!(matches!(report.outcome, FetchOutcome::PermanentFailure(_)));
        assert_eq!(report.attempts, 1);
    }

    #[test]
    fn middle_initial_runs_both_variants_and_merges() {
        let recorder = RecordingSleeper::new();
        let mut f = fetcher(
            vec![
                Ok(vec![
                    Candidate::new("John Smith", "", "Miami", "FL", &["(305) 555-0100"]),
                    Candidate::new("Johnny Smith", "", "Miami", "FL", &["(305) 555-0300"]),
                ]),
                Ok(vec![
                    Candidate::new("John A Smith", "", "Miami", "FL", &["(786) 555-0101"]),
                    Candidate::new("JOHN SMITH", "", "Miami", "FL", &["305-555-0100"]),
                ]),
            ],
            &recorder,
        );
        let query = LookupQuery::from_record("SMITH JOHN A", "Miami", "FL", NameOrder::Auto);
        let report = f.fetch(&query);

        let candidates = match report.outcome {
            FetchOutcome::Success(candidates) => candidates,
            other => panic!("expected success, got {other:?}"),
        };
        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["John Smith", "Johnny Smith", "John A Smith"]);
        assert_eq!(report.attempts, 2);
        // each variant is paced
        assert_eq!(
            recorder.sleeps(),
            vec![Duration::from_secs(1), Duration::from_secs(1)]
        );
    }

    #[test]
    fn one_failed_variant_keeps_the_other_results() {
        let recorder = RecordingSleeper::new();
        let mut f = fetcher(
            vec![
                Err(LookupError::permanent("HTTP 400")),
                Ok(vec![Candidate::new("John A Smith", "", "Miami", "FL", &["(786) 555-0101"])]),
            ],
            &recorder,
        );
        let query = LookupQuery::from_record("SMITH JOHN A", "Miami", "FL", NameOrder::Auto);
        let report = f.fetch(&query);
        assert!(matches!(report.outcome, FetchOutcome::Success(ref c) if c.len() == 1));

        let mut all_fail = fetcher(
            vec![
                Err(LookupError::permanent("HTTP 400")),
                Err(LookupError::permanent("HTTP 410")),
            ],
            &recorder,
        );
        let report = all_fail.fetch(&query);
        match report.outcome {
            FetchOutcome::PermanentFailure(err) => assert!(err.to_string().contains("400")),
            other => panic!("expected permanent failure, got {other:?}"),
        }
    }

    #[test]
    fn malformed_query_is_rejected_without_pacing() {
        let recorder = RecordingSleeper::new();
        let mut f = fetcher(vec![], &recorder);
        let bad = LookupQuery::from_record("MADONNA", "Miami", "FL", NameOrder::Auto);
        let report = f.fetch(&bad);
        assert!(matches!(report.outcome, FetchOutcome::PermanentFailure(_)));
        assert_eq!(report.attempts, 0);
        assert!(recorder.sleeps().is_empty());
    }
}
