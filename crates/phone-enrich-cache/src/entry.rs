//! Cache keys and entries.

use std::fmt;

use chrono::{DateTime, Utc};
use phone_enrich_match::normalize::collapse_whitespace;
use phone_enrich_match::Candidate;
use serde::{Deserialize, Serialize};

/// Normalized identity `name|city|state`.
///
/// Each part is lowercased with whitespace collapsed, so two rows that differ
/// only in case or spacing address the same entry. House numbers are not part
/// of the identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(name: &str, city: &str, state: &str) -> Self {
        let part = |s: &str| collapse_whitespace(&s.to_lowercase().replace('|', " "));
        Self(format!("{}|{}|{}", part(name), part(city), part(state)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result class of one live lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupOutcome {
    /// At least one candidate was returned.
    Found,
    /// The service answered, with no candidates.
    NotFound,
    /// Retries were exhausted or the query was rejected.
    Error,
}

/// One cached lookup result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub fetched_at: DateTime<Utc>,
    pub outcome: LookupOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Fields written by other tools or later versions; kept on rewrite.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CacheEntry {
    /// `Found` or `NotFound` depending on whether any candidate came back.
    pub fn from_candidates(candidates: Vec<Candidate>, fetched_at: DateTime<Utc>) -> Self {
        let outcome = if candidates.is_empty() {
            LookupOutcome::NotFound
        } else {
            LookupOutcome::Found
        };
        Self {
            candidates,
            fetched_at,
            outcome,
            error: None,
            extra: Default::default(),
        }
    }

    pub fn failed(message: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            candidates: Vec::new(),
            fetched_at,
            outcome: LookupOutcome::Error,
            error: Some(message.into()),
            extra: Default::default(),
        }
    }

    /// Replace the lookup payload, keeping unknown fields of the old entry.
    pub fn replace_with(&mut self, fresh: CacheEntry) {
        let CacheEntry {
            candidates,
            fetched_at,
            outcome,
            error,
            extra,
        } = fresh;
        self.candidates = candidates;
        self.fetched_at = fetched_at;
        self.outcome = outcome;
        self.error = error;
        self.extra.extend(extra);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_ignore_case_and_spacing() {
        let a = CacheKey::new("John  A Smith", "Miami", "FL");
        let b = CacheKey::new(" john a smith ", "MIAMI", "fl");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "john a smith|miami|fl");
    }

    #[test]
    fn outcome_follows_candidates() {
        let now = Utc::now();
        assert_eq!(
            CacheEntry::from_candidates(vec![], now).outcome,
            LookupOutcome::NotFound
        );
        let cand = Candidate::new("Ann Lee", "", "Miami", "FL", &["3055550100"]);
        assert_eq!(
            CacheEntry::from_candidates(vec![cand], now).outcome,
            LookupOutcome::Found
        );
        let failed = CacheEntry::failed("timed out", now);
        assert_eq!(failed.outcome, LookupOutcome::Error);
        assert_eq!(failed.error.as_deref(), Some("timed out"));
    }

    #[test]
    fn replace_keeps_unknown_fields() {
        let now = Utc::now();
        let mut old = CacheEntry::failed("boom", now);
        old.extra
            .insert("note".to_string(), serde_json::json!("manual"));
        old.replace_with(CacheEntry::from_candidates(vec![], now));
        assert_eq!(old.outcome, LookupOutcome::NotFound);
        assert_eq!(old.error, None);
        assert_eq!(old.extra["note"], serde_json::json!("manual"));
    }
}
