//! Street-address parsing and similarity.

use crate::normalize::{
    address_tokens, collapse_whitespace, expand_abbreviation, is_state_code, is_street_type, is_unit_marker,
    normalize_city, normalize_state,
};

/// The comparable part of a street line: house number plus street-name tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreetAddress {
    pub number: Option<String>,
    /// Expanded tokens of the street name, unit designators removed.
    pub tokens: Vec<String>,
}

impl StreetAddress {
    pub fn parse(street: &str) -> Self {
        let mut tokens = address_tokens(street);
        if let Some(pos) = tokens.iter().position(|t| is_unit_marker(t)) {
            tokens.truncate(pos);
        }
        let number = match tokens.first() {
            Some(t) if t.starts_with(|c: char| c.is_ascii_digit()) => Some(tokens.remove(0)),
            _ => None,
        };
        Self { number, tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.number.is_none() && self.tokens.is_empty()
    }

    fn core_tokens(&self) -> Vec<&str> {
        self.tokens
            .iter()
            .map(String::as_str)
            .filter(|t| !is_street_type(t))
            .collect()
    }

    /// Similarity in [0, 1] of `other` to this (target) street.
    ///
    /// House number counts for half when the target has one; the street name
    /// is compared on its core tokens (street-type words ignored, directionals
    /// kept since `NW 5th` and `SW 5th` are different streets).
    pub fn similarity(&self, other: &StreetAddress) -> f64 {
        if self.is_empty() || other.is_empty() {
            return 0.0;
        }
        let name = street_name_similarity(&self.core_tokens(), &other.core_tokens());
        match &self.number {
            Some(number) => {
                let number_score = if other.number.as_ref() == Some(number) {
                    1.0
                } else {
                    0.0
                };
                0.5 * number_score + 0.5 * name
            }
            None => name,
        }
    }
}

fn street_name_similarity(a: &[&str], b: &[&str]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let common = a.iter().filter(|t| b.contains(t)).count();
    if common == 0 {
        return 0.0;
    }
    let mut union: Vec<&str> = a.to_vec();
    for t in b {
        if !union.contains(t) {
            union.push(t);
        }
    }
    let jaccard = common as f64 / union.len() as f64;
    if common == a.len().min(b.len()) {
        // one side's core is contained in the other
        jaccard.max(0.8)
    } else {
        jaccard
    }
}

/// A free-form location line split into street / city / state / zip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationLine {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: Option<String>,
}

impl LocationLine {
    /// Parse `"123 Main St, Miami, FL 33101"`, `"Miami, FL"` or `"Miami FL 33101"`.
    ///
    /// Comma-separated lines are split from the right: the last part holds
    /// the state (and zip), the part before it the city, the rest the street.
    /// Without commas a state code is only taken when a zip follows it, so
    /// `12 Palm Ct` and `400 Main St NE` stay plain street lines.
    pub fn parse(raw: &str) -> Self {
        let raw = collapse_whitespace(raw);
        if raw.is_empty() {
            return Self::default();
        }
        let parts: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.len() >= 2 {
            let (state, zip) = split_state_zip(parts[parts.len() - 1]);
            if !state.is_empty() {
                return Self {
                    street: parts[..parts.len() - 2].join(", "),
                    city: parts[parts.len() - 2].to_string(),
                    state,
                    zip,
                };
            }
            // "123 Main St, Miami" style: no state part
            return Self {
                street: parts[..parts.len() - 1].join(", "),
                city: parts[parts.len() - 1].to_string(),
                ..Default::default()
            };
        }

        let mut words: Vec<&str> = raw.split(' ').collect();
        let Some(zip) = pop_zip(&mut words) else {
            return Self {
                street: raw,
                ..Default::default()
            };
        };
        let mut state = String::new();
        if words.len() > 1 && words.last().is_some_and(|w| is_state_code(w)) {
            state = words.pop().map(normalize_state).unwrap_or_default();
        }
        Self {
            street: words.join(" "),
            city: String::new(),
            state,
            zip: Some(zip),
        }
    }

    /// Split a joined address when the city is known: strips a trailing
    /// `<city> [ST] [zip]` from `raw`.
    ///
    /// A state code without a zip is only accepted right after the city and
    /// never when it doubles as a street-type or directional abbreviation.
    pub fn parse_with_city(raw: &str, known_city: &str) -> Self {
        let line = Self::parse(raw);
        if !line.city.is_empty() || known_city.trim().is_empty() {
            return line;
        }
        let city_norm = normalize_city(known_city);
        let raw = collapse_whitespace(raw);
        let mut words: Vec<&str> = raw.split(' ').collect();
        let zip = pop_zip(&mut words);
        let mut state = None;
        let last = words.last().copied();
        if let Some(last) = last {
            let lower = last.to_ascii_lowercase();
            let ambiguous = zip.is_none() && expand_abbreviation(&lower) != lower;
            if words.len() > 2 && is_state_code(last) && !ambiguous {
                state = words.pop();
            }
        }
        for split in (1..words.len()).rev() {
            if normalize_city(&words[split..].join(" ")) == city_norm {
                return Self {
                    street: words[..split].join(" "),
                    city: words[split..].join(" "),
                    state: state.map(normalize_state).unwrap_or_default(),
                    zip,
                };
            }
        }
        line
    }

    /// True if this line lies in the given city/state (compared normalized).
    pub fn is_in(&self, city: &str, state: &str) -> bool {
        normalize_city(&self.city) == normalize_city(city)
            && normalize_state(&self.state) == normalize_state(state)
    }
}

fn is_zip(word: &str) -> bool {
    let digits = word.split('-').next().unwrap_or_default();
    digits.len() == 5 && digits.chars().all(|c| c.is_ascii_digit())
}

fn pop_zip(words: &mut Vec<&str>) -> Option<String> {
    if words.last().is_some_and(|w| is_zip(w)) {
        words.pop().map(str::to_string)
    } else {
        None
    }
}

fn split_state_zip(part: &str) -> (String, Option<String>) {
    let mut words: Vec<&str> = part.split_whitespace().collect();
    let mut zip = None;
    if let Some(last) = words.last() {
        if is_zip(last) {
            zip = Some(last.to_string());
            words.pop();
        }
    }
    let state_text = words.join(" ");
    let state = normalize_state(&state_text);
    if state.len() == 2 && is_state_code(&state) {
        (state, zip)
    } else {
        (String::new(), zip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn street_parse_separates_number_and_unit() {
        let s = StreetAddress::parse("1200 NW 5th Ave Apt 4");
        assert_eq!(s.number.as_deref(), Some("1200"));
        assert_eq!(s.tokens, vec!["northwest", "5th", "avenue"]);
    }

    #[test]
    fn same_street_different_number_scores_half() {
        let target = StreetAddress::parse("100 Ocean Dr");
        assert!((target.similarity(&StreetAddress::parse("100 OCEAN DRIVE")) - 1.0).abs() < 1e-9);
        assert!((target.similarity(&StreetAddress::parse("200 Ocean Dr")) - 0.5).abs() < 1e-9);
        assert_eq!(target.similarity(&StreetAddress::parse("300 Bay Rd")), 0.0);
    }

    #[test]
    fn directionals_distinguish_streets() {
        let target = StreetAddress::parse("50 NW 5th St");
        let other = StreetAddress::parse("50 SW 5th St");
        let same = StreetAddress::parse("50 NW 5th St");
        assert!(target.similarity(&other) < target.similarity(&same));
    }

    #[test]
    fn location_line_with_commas() {
        let line = LocationLine::parse("123 Main St, Miami, FL 33101");
        assert_eq!(line.street, "123 Main St");
        assert_eq!(line.city, "Miami");
        assert_eq!(line.state, "FL");
        assert_eq!(line.zip.as_deref(), Some("33101"));

        let city_only = LocationLine::parse("Miami Beach, Florida");
        assert_eq!(city_only.street, "");
        assert_eq!(city_only.city, "Miami Beach");
        assert_eq!(city_only.state, "FL");
    }

    #[test]
    fn street_suffix_is_not_a_state() {
        let court = LocationLine::parse("12 Palm Ct");
        assert_eq!(court.street, "12 Palm Ct");
        assert_eq!(court.state, "");

        let directional = LocationLine::parse("400 Main St NE");
        assert_eq!(directional.street, "400 Main St NE");
        assert_eq!(directional.state, "");

        let with_city = LocationLine::parse_with_city("12 Palm Ct", "Miami");
        assert_eq!(with_city.street, "12 Palm Ct");
        assert_eq!(with_city.city, "");
        assert_eq!(with_city.state, "");
    }

    #[test]
    fn state_code_needs_zip_or_city() {
        let zipped = LocationLine::parse("Miami FL 33101");
        assert_eq!(zipped.street, "Miami");
        assert_eq!(zipped.state, "FL");

        let no_zip = LocationLine::parse_with_city("123 Main St Miami FL", "Miami");
        assert_eq!(no_zip.street, "123 Main St");
        assert_eq!(no_zip.city, "Miami");
        assert_eq!(no_zip.state, "FL");

        // "Ct" after the city is still a street suffix without a zip
        let street_named_after_city = LocationLine::parse_with_city("5 Miami Ct", "Miami");
        assert_eq!(street_named_after_city.street, "5 Miami Ct");
        assert_eq!(street_named_after_city.state, "");
    }

    #[test]
    fn joined_address_with_known_city() {
        let line = LocationLine::parse_with_city("123 MAIN ST MIAMI FL 33101", "Miami");
        assert_eq!(line.street, "123 MAIN ST");
        assert_eq!(line.city, "MIAMI");
        assert_eq!(line.state, "FL");
        assert!(line.is_in("miami", "Florida"));
    }
}
