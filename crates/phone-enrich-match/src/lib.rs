//! Candidate matching for phone enrichment
//!
//! This crate holds the pure half of the enrichment engine:
//! - the [`Candidate`] record returned by the people-lookup service (and stored
//!   verbatim in the lookup cache),
//! - deterministic text, name, address and phone normalization,
//! - the candidate scorer, which ranks candidates against one target row and
//!   selects up to four phone numbers.
//!
//! Nothing here performs IO. Scores are row-relative and are never cached.

use serde::{Deserialize, Serialize};

pub mod address;
pub mod name;
pub mod normalize;
pub mod phone;
pub mod score;

pub use address::{LocationLine, StreetAddress};
pub use name::{is_business_name, NameOrder, PersonName};
pub use phone::{extract_phones, normalize_phone, phone_key};
pub use score::{
    score, score_candidate, CandidateScore, MatchStatus, PhoneSlots, Ranking, Rejected, Rejection,
    ScoredCandidate, ScoringConfig, Target,
};

// ============================================================================
// Candidate record
// ============================================================================

/// One person record returned by the lookup service.
///
/// Unknown fields found in a cached record are kept in `extra` so that a
/// rewrite of the cache file does not drop them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    /// Current street line ("LIVES IN"), without city/state.
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default)]
    pub phones: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    /// Raw "USED TO LIVE IN" lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previous_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aka: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relatives: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Candidate {
    /// Convenience constructor used by parsers and tests.
    pub fn new(name: &str, street: &str, city: &str, state: &str, phones: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            street: street.to_string(),
            city: city.to_string(),
            state: state.to_string(),
            phones: phones.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    /// True if at least one phone normalizes to a 10-digit number.
    pub fn has_phone(&self) -> bool {
        self.phones.iter().any(|p| phone_key(p).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_preserves_unknown_fields() {
        let json = r#"{"name":"Ann Lee","phones":["(305) 555-0100"],"source_rank":3}"#;
        let cand: Candidate = serde_json::from_str(json).expect("parse");
        assert_eq!(cand.extra.get("source_rank"), Some(&serde_json::json!(3)));

        let back = serde_json::to_value(&cand).expect("serialize");
        assert_eq!(back["source_rank"], serde_json::json!(3));
    }

    #[test]
    fn has_phone_requires_a_valid_number() {
        let mut cand = Candidate::new("Ann Lee", "", "Miami", "FL", &["555-0100"]);
        assert!(!cand.has_phone());
        cand.phones.push("305.555.0100".to_string());
        assert!(cand.has_phone());
    }
}
