//! Candidate scoring and phone selection.
//!
//! ```text
//! candidates ──► hard filters ──► name/address similarity ──► threshold ──► ranking ──► phone slots
//!                (business name,   (token sets, street #     (min_score)    (stable)    (dedup by
//!                 city/state,       + street name)                                      10-digit key)
//!                 no phone)
//! ```
//!
//! Hard filters reject a candidate outright (score 0); they are never soft
//! penalties. A ranking that ends up empty records why, so callers can tell
//! "service returned nothing" apart from "everything was filtered".

use serde::{Deserialize, Serialize};

use crate::address::{LocationLine, StreetAddress};
use crate::name::{is_business_name, NameOrder, PersonName};
use crate::normalize::{normalize_city, normalize_state};
use crate::phone::phone_key;
use crate::Candidate;

// ============================================================================
// Configuration
// ============================================================================

/// Weights and limits of the scorer. Tunable without touching the algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub name_weight: f64,
    /// Weighted higher than the name: the address disambiguates common names.
    pub address_weight: f64,
    /// Candidates scoring below this are dropped rather than used to fill slots.
    pub min_score: f64,
    pub max_phones: usize,
    /// Phones taken from one candidate before moving to the next.
    pub phones_per_candidate: usize,
    pub name_order: NameOrder,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            name_weight: 0.4,
            address_weight: 0.6,
            min_score: 0.35,
            max_phones: 4,
            phones_per_candidate: 2,
            name_order: NameOrder::Auto,
        }
    }
}

// Token-match credits. Exact tokens always outrank fuzzy ones.
const EXACT_TOKEN: f64 = 1.0;
const INITIAL_TOKEN: f64 = 0.6;
const PREFIX_TOKEN: f64 = 0.7;
const FUZZY_FACTOR: f64 = 0.8;
const FUZZY_FLOOR: f64 = 0.88;
const INITIAL_WEIGHT: f64 = 0.25;

// ============================================================================
// Types
// ============================================================================

/// The row being enriched, reduced to what the scorer compares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    /// Street line only (number + street name, optional unit).
    pub street: String,
    pub city: String,
    pub state: String,
}

/// Why a candidate was excluded.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// Business entity, trust or estate on either side.
    BusinessName,
    /// Candidate's current city/state differs from the target's.
    LocationMismatch,
    NoPhones,
    BelowThreshold { score: f64 },
}

/// Per-component breakdown of one candidate's score.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub name: f64,
    pub address: f64,
    /// Combined score in [0, 1]; 0 when rejected.
    pub total: f64,
    pub rejection: Option<Rejection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
    pub name_score: f64,
    pub address_score: f64,
    /// Position in the service's result list; breaks score ties.
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub rank: usize,
    pub name: String,
    pub reason: Rejection,
}

/// Outcome class of a ranking, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// The service returned no candidates at all.
    NoCandidates,
    /// Candidates were returned but every one was excluded.
    AllFiltered,
    Matched,
}

/// Result of scoring all candidates for one row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    /// Sorted by descending score, ties by original order.
    pub accepted: Vec<ScoredCandidate>,
    pub rejected: Vec<Rejected>,
}

/// Up to `max_phones` phone numbers, in slot order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoneSlots {
    pub phones: Vec<String>,
}

impl PhoneSlots {
    /// Slot `index` (0-based), empty when unfilled.
    pub fn slot(&self, index: usize) -> &str {
        self.phones.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.phones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phones.is_empty()
    }
}

impl Ranking {
    pub fn status(&self) -> MatchStatus {
        if !self.accepted.is_empty() {
            MatchStatus::Matched
        } else if self.rejected.is_empty() {
            MatchStatus::NoCandidates
        } else {
            MatchStatus::AllFiltered
        }
    }

    /// Fill phone slots from the ranked candidates, skipping numbers already
    /// taken by a better candidate.
    pub fn phones(&self, config: &ScoringConfig) -> PhoneSlots {
        let mut slots = PhoneSlots::default();
        let mut seen: Vec<String> = Vec::new();
        for scored in &self.accepted {
            let mut taken = 0;
            for phone in &scored.candidate.phones {
                if slots.phones.len() >= config.max_phones {
                    return slots;
                }
                if taken >= config.phones_per_candidate {
                    break;
                }
                let Some(key) = phone_key(phone) else {
                    continue;
                };
                if seen.contains(&key) {
                    continue;
                }
                seen.push(key);
                slots.phones.push(phone.clone());
                taken += 1;
            }
        }
        slots
    }
}

// ============================================================================
// Scoring
// ============================================================================

/// Score every candidate against `target`.
pub fn score(target: &Target, candidates: &[Candidate], config: &ScoringConfig) -> Ranking {
    let profile = TargetProfile::new(target, config);
    let mut ranking = Ranking::default();

    for (rank, candidate) in candidates.iter().enumerate() {
        let scored = profile.score(candidate, config);
        match scored.rejection {
            Some(reason) => ranking.rejected.push(Rejected {
                rank,
                name: candidate.name.clone(),
                reason,
            }),
            None => ranking.accepted.push(ScoredCandidate {
                candidate: candidate.clone(),
                score: scored.total,
                name_score: scored.name,
                address_score: scored.address,
                rank,
            }),
        }
    }

    // sort_by is stable: equal scores keep service order
    ranking
        .accepted
        .sort_by(|a, b| b.score.total_cmp(&a.score));
    ranking
}

/// Score a single candidate; rejected candidates get a total of 0.
pub fn score_candidate(
    target: &Target,
    candidate: &Candidate,
    config: &ScoringConfig,
) -> CandidateScore {
    TargetProfile::new(target, config).score(candidate, config)
}

/// Target fields normalized once per row.
struct TargetProfile {
    name: PersonName,
    is_business: bool,
    street: StreetAddress,
    city: String,
    state: String,
}

impl TargetProfile {
    fn new(target: &Target, config: &ScoringConfig) -> Self {
        Self {
            name: PersonName::parse(&target.name, config.name_order),
            is_business: is_business_name(&target.name),
            street: StreetAddress::parse(&target.street),
            city: normalize_city(&target.city),
            state: normalize_state(&target.state),
        }
    }

    fn score(&self, candidate: &Candidate, config: &ScoringConfig) -> CandidateScore {
        let rejected = |reason| CandidateScore {
            name: 0.0,
            address: 0.0,
            total: 0.0,
            rejection: Some(reason),
        };

        if self.is_business || is_business_name(&candidate.name) {
            return rejected(Rejection::BusinessName);
        }
        if normalize_city(&candidate.city) != self.city
            || normalize_state(&candidate.state) != self.state
        {
            return rejected(Rejection::LocationMismatch);
        }
        if !candidate.has_phone() {
            return rejected(Rejection::NoPhones);
        }

        let cand_name = PersonName::parse(&candidate.name, config.name_order);
        let name = token_set_similarity(&self.name.tokens, &cand_name.tokens);
        let address = self.address_similarity(candidate);

        let total = if self.street.is_empty() {
            name
        } else {
            let weight_sum = config.name_weight + config.address_weight;
            if weight_sum <= 0.0 {
                0.0
            } else {
                (config.name_weight * name + config.address_weight * address) / weight_sum
            }
        };
        let total = total.clamp(0.0, 1.0);

        if total < config.min_score {
            return CandidateScore {
                name,
                address,
                total,
                rejection: Some(Rejection::BelowThreshold { score: total }),
            };
        }
        CandidateScore {
            name,
            address,
            total,
            rejection: None,
        }
    }

    /// Best street similarity over the candidate's current street and any
    /// previous address in the target's city/state.
    fn address_similarity(&self, candidate: &Candidate) -> f64 {
        if self.street.is_empty() {
            return 0.0;
        }
        let mut best = self
            .street
            .similarity(&StreetAddress::parse(&candidate.street));
        for previous in &candidate.previous_addresses {
            let line = LocationLine::parse(previous);
            let same_area = line.city.is_empty()
                || (normalize_city(&line.city) == self.city
                    && (line.state.is_empty() || normalize_state(&line.state) == self.state));
            if !same_area {
                continue;
            }
            best = best.max(self.street.similarity(&StreetAddress::parse(&line.street)));
        }
        best
    }
}

/// Symmetric token-set similarity in [0, 1].
///
/// Each token earns its best match on the other side: exact tokens earn full
/// credit, initials and prefixes partial credit, near-spellings (Jaro-Winkler)
/// less than an exact match. Single-letter initials carry a reduced weight so a
/// missing middle initial costs little.
fn token_set_similarity(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    (directional_similarity(a, b) + directional_similarity(b, a)) / 2.0
}

fn directional_similarity(from: &[String], to: &[String]) -> f64 {
    let mut earned = 0.0;
    let mut possible = 0.0;
    for token in from {
        let weight = if token.chars().count() == 1 {
            INITIAL_WEIGHT
        } else {
            1.0
        };
        let best = to
            .iter()
            .map(|other| token_match(token, other))
            .fold(0.0, f64::max);
        earned += weight * best;
        possible += weight;
    }
    if possible == 0.0 {
        0.0
    } else {
        earned / possible
    }
}

fn token_match(a: &str, b: &str) -> f64 {
    if a == b {
        return EXACT_TOKEN;
    }
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    if a_len == 1 || b_len == 1 {
        return if a.chars().next() == b.chars().next() {
            INITIAL_TOKEN
        } else {
            0.0
        };
    }
    if a_len.min(b_len) >= 3 && (a.starts_with(b) || b.starts_with(a)) {
        return PREFIX_TOKEN;
    }
    let jw = strsim::jaro_winkler(a, b);
    if jw >= FUZZY_FLOOR {
        jw * FUZZY_FACTOR
    } else {
        0.0
    }
}
