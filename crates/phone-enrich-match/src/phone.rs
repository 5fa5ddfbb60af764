//! US phone number normalization.

use regex::Regex;
use std::sync::OnceLock;

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:\+?1[-.\s]?)?\(?(\d{3})\)?[-.\s]*(\d{3})[-.\s]*(\d{4})")
            .expect("phone pattern is a valid regex")
    })
}

/// The 10-digit dedup key of a phone string, or `None` if it is not a US
/// number. A leading country code `1` is dropped.
pub fn phone_key(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        10 => Some(digits),
        11 if digits.starts_with('1') => Some(digits[1..].to_string()),
        _ => None,
    }
}

/// Format as `(XXX) XXX-XXXX`.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let key = phone_key(raw)?;
    Some(format!("({}) {}-{}", &key[..3], &key[3..6], &key[6..]))
}

/// All phone numbers in free text, normalized, in order of first appearance.
///
/// Digit runs longer than a phone number (account numbers, zip+4 chains) are
/// not split into phones.
pub fn extract_phones(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut out: Vec<String> = Vec::new();
    for m in phone_pattern().find_iter(text) {
        let before_is_digit = m.start() > 0 && bytes[m.start() - 1].is_ascii_digit();
        let after_is_digit = bytes.get(m.end()).is_some_and(|b| b.is_ascii_digit());
        if before_is_digit || after_is_digit {
            continue;
        }
        if let Some(phone) = normalize_phone(m.as_str()) {
            if !out.contains(&phone) {
                out.push(phone);
            }
        }
    }
    out
}
