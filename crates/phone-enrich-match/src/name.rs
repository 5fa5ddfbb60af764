//! Person-name parsing.
//!
//! County records are usually written `LAST FIRST [MIDDLE]`, while the lookup
//! service displays `First Middle Last`. [`PersonName::parse`] recovers the
//! first/last split used to build search queries; scoring itself compares
//! token sets and is order-insensitive.

use serde::{Deserialize, Serialize};

use crate::normalize::name_tokens;

/// How to read the token order of a raw name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameOrder {
    /// Guess per name (county `LAST FIRST` unless the name clearly reads first-name-first).
    #[default]
    Auto,
    LastFirst,
    FirstLast,
}

/// A parsed person name. All parts are normalized lowercase text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonName {
    pub first: String,
    pub middle: String,
    pub last: String,
    /// All normalized tokens with generational suffixes removed.
    pub tokens: Vec<String>,
}

const COMMON_FIRST_NAMES: &[&str] = &[
    "john", "james", "michael", "mary", "patricia", "linda", "barbara", "elizabeth", "jennifer",
    "maria", "susan", "margaret", "dorothy", "lisa", "nancy", "karen", "betty", "helen", "sandra",
    "donna", "robert", "william", "david", "richard", "charles", "joseph", "thomas",
    "christopher", "daniel", "matthew", "anthony", "mark", "donald", "steven", "paul", "andrew",
    "joshua", "kenneth", "kevin", "brian", "george", "timothy", "ronald", "jason", "edward",
    "jacob", "jose", "juan", "carlos", "luis", "jorge", "ana", "carmen", "rosa",
];

const SUFFIXES: &[&str] = &["jr", "sr", "ii", "iii", "iv", "2nd", "3rd"];

const CONNECTORS: &[&str] = &[
    "de", "del", "la", "las", "los", "da", "das", "do", "dos", "du", "di", "le", "van", "von", "y",
];

/// Entity suffixes and trust markers; a business wherever they appear.
const ENTITY_MARKERS: &[&str] = &[
    "llc",
    "inc",
    "incorporated",
    "corp",
    "corporation",
    "ltd",
    "lp",
    "llp",
    "lllp",
    "pllc",
    "trust",
    "trustee",
    "trustees",
    "revocable",
    "irrevocable",
];

/// Short suffixes that are also name tokens; only a marker as the last word.
const TRAILING_MARKERS: &[&str] = &["co", "pa"];

fn is_initial(token: &str) -> bool {
    token.chars().count() == 1
}

fn is_connector(token: &str) -> bool {
    CONNECTORS.contains(&token)
}

fn is_common_first_name(token: &str) -> bool {
    COMMON_FIRST_NAMES.contains(&token)
}

/// True if the name carries a business-entity or trust/estate marker.
///
/// This is a hard filter: such names never match an individual. Ordinary
/// surnames (Church, Banks, Group) are not markers; `estate` only counts in
/// the `ESTATE OF` form.
pub fn is_business_name(raw: &str) -> bool {
    let tokens = name_tokens(raw);
    let entity = tokens.iter().any(|t| ENTITY_MARKERS.contains(&t.as_str()));
    let trailing = tokens
        .last()
        .is_some_and(|t| tokens.len() > 1 && TRAILING_MARKERS.contains(&t.as_str()));
    let estate = tokens.windows(2).any(|w| w[0] == "estate" && w[1] == "of");
    entity || trailing || estate
}

impl PersonName {
    pub fn parse(raw: &str, order: NameOrder) -> Self {
        let tokens: Vec<String> = name_tokens(raw)
            .into_iter()
            .filter(|t| !SUFFIXES.contains(&t.as_str()))
            .collect();

        let mut name = PersonName {
            tokens: tokens.clone(),
            ..Default::default()
        };
        match tokens.len() {
            0 => return name,
            1 => {
                name.first = tokens[0].clone();
                return name;
            }
            _ => {}
        }

        let order = match order {
            NameOrder::Auto => guess_order(&tokens),
            explicit => explicit,
        };
        let (first, middle, last) = match order {
            NameOrder::FirstLast => split_first_last(&tokens),
            _ => split_last_first(&tokens),
        };
        name.first = first;
        name.middle = middle;
        name.last = last;
        name
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn middle_initial(&self) -> Option<char> {
        self.middle.chars().next()
    }

    /// `first last` as used in the lookup query.
    pub fn search_name(&self) -> String {
        [self.first.as_str(), self.last.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn guess_order(tokens: &[String]) -> NameOrder {
    let n = tokens.len();
    if is_initial(&tokens[n - 1]) {
        // "SPENCER WARREN J"
        return NameOrder::LastFirst;
    }
    if n == 3 && is_initial(&tokens[1]) {
        // "John A Smith"
        return NameOrder::FirstLast;
    }
    if is_common_first_name(&tokens[0]) && !is_common_first_name(&tokens[n - 1]) {
        return NameOrder::FirstLast;
    }
    NameOrder::LastFirst
}

fn split_last_first(tokens: &[String]) -> (String, String, String) {
    let mut rest: &[String] = tokens;
    let mut middle = String::new();
    if rest.len() > 2 && is_initial(&rest[rest.len() - 1]) {
        middle = rest[rest.len() - 1].clone();
        rest = &rest[..rest.len() - 1];
    }

    match rest.len() {
        1 => (rest[0].clone(), middle, String::new()),
        2 => (rest[1].clone(), middle, rest[0].clone()),
        3 if middle.is_empty() && !is_connector(&rest[0]) && !is_connector(&rest[1]) => {
            (rest[1].clone(), rest[2].clone(), rest[0].clone())
        }
        n => (rest[n - 1].clone(), middle, rest[..n - 1].join(" ")),
    }
}

fn split_first_last(tokens: &[String]) -> (String, String, String) {
    let n = tokens.len();
    let mut last_start = n - 1;
    while last_start > 1 && is_connector(&tokens[last_start - 1]) {
        last_start -= 1;
    }
    (
        tokens[0].clone(),
        tokens[1..last_start].join(" "),
        tokens[last_start..].join(" "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(raw: &str) -> (String, String, String) {
        let n = PersonName::parse(raw, NameOrder::Auto);
        (n.first, n.middle, n.last)
    }

    #[test]
    fn county_order_is_the_default() {
        assert_eq!(
            parts("GARCIA MARIA"),
            ("maria".into(), "".into(), "garcia".into())
        );
        assert_eq!(
            parts("SPENCER WARREN J"),
            ("warren".into(), "j".into(), "spencer".into())
        );
        assert_eq!(
            parts("PASCUAL MARIO IGNACIO"),
            ("mario".into(), "ignacio".into(), "pascual".into())
        );
    }

    #[test]
    fn first_name_first_is_detected() {
        assert_eq!(
            parts("John A Smith"),
            ("john".into(), "a".into(), "smith".into())
        );
        assert_eq!(
            parts("Robert Lee Johnson Jr."),
            ("robert".into(), "lee".into(), "johnson".into())
        );
    }

    #[test]
    fn compound_last_names_stay_together() {
        assert_eq!(
            parts("ESTRADA CASTRO MARTHA ELENA"),
            ("elena".into(), "".into(), "estrada castro martha".into())
        );
        assert_eq!(
            parts("DE LA CRUZ ANA"),
            ("ana".into(), "".into(), "de la cruz".into())
        );
        let n = PersonName::parse("Maria de la Cruz", NameOrder::FirstLast);
        assert_eq!(n.last, "de la cruz");
        assert_eq!(n.middle, "");
    }

    #[test]
    fn search_name_and_initial() {
        let n = PersonName::parse("SPENCER WARREN J", NameOrder::Auto);
        assert_eq!(n.search_name(), "warren spencer");
        assert_eq!(n.middle_initial(), Some('j'));
    }

    #[test]
    fn business_markers_are_detected() {
        assert!(is_business_name("Jon Smith LLC"));
        assert!(is_business_name("SMITH FAMILY TRUST"));
        assert!(is_business_name("Acme Holdings, L.L.C."));
        assert!(is_business_name("ESTATE OF JOHN DOE"));
        assert!(is_business_name("Smith & Sons Co"));
        assert!(is_business_name("PEREZ GARCIA PA"));
        assert!(!is_business_name("John A Smith"));
    }

    #[test]
    fn surnames_that_look_like_businesses_are_people() {
        for name in [
            "CHURCH MARY",
            "BANKS JOHN",
            "GROUP ANN",
            "ESTATE MARIA",
            "CO LINDA",
            "PA DAVID",
            "PARTNERS JAMES",
            "FOUNDATION LISA",
        ] {
            assert!(!is_business_name(name), "{name}");
        }
    }
}
