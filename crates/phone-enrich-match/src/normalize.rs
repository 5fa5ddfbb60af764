//! Deterministic text normalization.
//!
//! All functions here are pure: the same input always yields the same output.
//! Names use [`normalize_text`]; addresses and cities additionally expand
//! street-type and directional abbreviations via [`normalize_address_text`].

/// Lowercase, drop periods/apostrophes, turn other punctuation into spaces and
/// collapse whitespace.
///
/// Periods are deleted rather than spaced so that `L.L.C.` becomes `llc`.
pub fn normalize_text(input: &str) -> String {
    let mut cleaned = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch == '.' || ch == '\'' || ch == '’' {
            continue;
        }
        if ch.is_alphanumeric() {
            cleaned.extend(ch.to_lowercase());
        } else {
            cleaned.push(' ');
        }
    }
    collapse_whitespace(&cleaned)
}

/// Collapse runs of whitespace into single spaces and trim both ends.
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// [`normalize_text`] followed by token-wise abbreviation expansion.
pub fn normalize_address_text(input: &str) -> String {
    normalize_text(input)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(expand_abbreviation)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized, whitespace-split tokens of a name.
pub fn name_tokens(input: &str) -> Vec<String> {
    normalize_text(input)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalized, abbreviation-expanded tokens of an address fragment.
pub fn address_tokens(input: &str) -> Vec<String> {
    normalize_address_text(input)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Expand one normalized token; unknown tokens are returned unchanged.
pub fn expand_abbreviation(token: &str) -> &str {
    match token {
        "st" | "str" => "street",
        "ave" | "av" | "avn" => "avenue",
        "blvd" | "boul" => "boulevard",
        "dr" | "drv" => "drive",
        "rd" => "road",
        "ct" | "crt" => "court",
        "ln" => "lane",
        "pl" => "place",
        "ter" | "terr" => "terrace",
        "cir" => "circle",
        "hwy" => "highway",
        "pkwy" | "pky" => "parkway",
        "trl" => "trail",
        "sq" => "square",
        "cswy" => "causeway",
        "plz" => "plaza",
        "aly" => "alley",
        "n" => "north",
        "s" => "south",
        "e" => "east",
        "w" => "west",
        "ne" => "northeast",
        "nw" => "northwest",
        "se" => "southeast",
        "sw" => "southwest",
        "apt" => "apartment",
        "ste" => "suite",
        other => other,
    }
}

/// Expanded street-type words. Used to separate the "core" of a street name.
pub fn is_street_type(token: &str) -> bool {
    matches!(
        token,
        "street"
            | "avenue"
            | "boulevard"
            | "drive"
            | "road"
            | "court"
            | "lane"
            | "place"
            | "terrace"
            | "circle"
            | "highway"
            | "parkway"
            | "trail"
            | "square"
            | "causeway"
            | "plaza"
            | "alley"
            | "way"
    )
}

/// Tokens that introduce a unit designator; everything after them is not part
/// of the street name.
pub fn is_unit_marker(token: &str) -> bool {
    matches!(token, "apartment" | "suite" | "unit" | "lot" | "bldg")
}

// ============================================================================
// Cities and states
// ============================================================================

const STATES: &[(&str, &str)] = &[
    ("AL", "alabama"),
    ("AK", "alaska"),
    ("AZ", "arizona"),
    ("AR", "arkansas"),
    ("CA", "california"),
    ("CO", "colorado"),
    ("CT", "connecticut"),
    ("DE", "delaware"),
    ("DC", "district of columbia"),
    ("FL", "florida"),
    ("GA", "georgia"),
    ("HI", "hawaii"),
    ("ID", "idaho"),
    ("IL", "illinois"),
    ("IN", "indiana"),
    ("IA", "iowa"),
    ("KS", "kansas"),
    ("KY", "kentucky"),
    ("LA", "louisiana"),
    ("ME", "maine"),
    ("MD", "maryland"),
    ("MA", "massachusetts"),
    ("MI", "michigan"),
    ("MN", "minnesota"),
    ("MS", "mississippi"),
    ("MO", "missouri"),
    ("MT", "montana"),
    ("NE", "nebraska"),
    ("NV", "nevada"),
    ("NH", "new hampshire"),
    ("NJ", "new jersey"),
    ("NM", "new mexico"),
    ("NY", "new york"),
    ("NC", "north carolina"),
    ("ND", "north dakota"),
    ("OH", "ohio"),
    ("OK", "oklahoma"),
    ("OR", "oregon"),
    ("PA", "pennsylvania"),
    ("PR", "puerto rico"),
    ("RI", "rhode island"),
    ("SC", "south carolina"),
    ("SD", "south dakota"),
    ("TN", "tennessee"),
    ("TX", "texas"),
    ("UT", "utah"),
    ("VT", "vermont"),
    ("VA", "virginia"),
    ("WA", "washington"),
    ("WV", "west virginia"),
    ("WI", "wisconsin"),
    ("WY", "wyoming"),
];

/// Canonical uppercase state code for an abbreviation or full state name.
///
/// Unknown values are returned as normalized uppercase text so that equality
/// stays well defined.
pub fn normalize_state(input: &str) -> String {
    let text = normalize_text(input);
    if text.is_empty() {
        return String::new();
    }
    let upper = text.to_ascii_uppercase();
    if STATES.iter().any(|(code, _)| *code == upper) {
        return upper;
    }
    STATES
        .iter()
        .find(|(_, name)| *name == text)
        .map(|(code, _)| code.to_string())
        .unwrap_or(upper)
}

/// Lowercase full state name for a code (used in lookup URLs).
pub fn state_name(code: &str) -> Option<&'static str> {
    let code = normalize_state(code);
    STATES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// True if the token (any case) is a known state code.
pub fn is_state_code(token: &str) -> bool {
    let upper = token.to_ascii_uppercase();
    STATES.iter().any(|(code, _)| *code == upper)
}

/// City comparison form: address normalization so `N Miami Beach` equals
/// `North Miami Beach`.
pub fn normalize_city(input: &str) -> String {
    normalize_address_text(input)
}
