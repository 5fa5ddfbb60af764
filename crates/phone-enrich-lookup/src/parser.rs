//! Result-page parsing.
//!
//! Profile cards are recognized by their labelled sections rather than by
//! CSS classes, which change often:
//!
//! ```text
//! John A Smith, Age 52            ← heading: name + age
//! PHONE NUMBER(S): (305) 555-0100 • (786) 555-0101
//! LIVES IN: 100 Ocean Dr, Miami, FL 33139
//! USED TO LIVE IN: 9 Bay Rd, Miami, FL • Tampa, FL
//! AKA: Johnny Smith
//! MAY BE RELATED TO: Mary Smith • Ann Smith
//! ```
//!
//! A card is the smallest element holding exactly one phone section, at least
//! one address section and a name heading. Pages without such elements parse
//! to an empty list.

use std::sync::OnceLock;

use phone_enrich_match::normalize::collapse_whitespace;
use phone_enrich_match::{extract_phones, Candidate, LocationLine};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Phones,
    LivesIn,
    UsedToLiveIn,
    Emails,
    RelatedTo,
    SocialProfiles,
    Aka,
}

fn label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)\b(PHONE\s+NUMBERS?(?:\(S\))?|LIVES\s+IN|USED\s+TO\s+LIVE\s+IN|EMAILS?|MAY\s+BE\s+RELATED\s+TO|SOCIAL\s+PROFILES|AKA)\s*:",
        )
        .expect("label pattern is a valid regex")
    })
}

fn age_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i),?\s*\bAge\s+(\d{1,3})\b").expect("age pattern is a valid regex")
    })
}

fn classify(label: &str) -> Label {
    let upper = label.to_ascii_uppercase();
    if upper.starts_with("PHONE") {
        Label::Phones
    } else if upper.starts_with("LIVES") {
        Label::LivesIn
    } else if upper.starts_with("USED") {
        Label::UsedToLiveIn
    } else if upper.starts_with("EMAIL") {
        Label::Emails
    } else if upper.starts_with("MAY") {
        Label::RelatedTo
    } else if upper.starts_with("SOCIAL") {
        Label::SocialProfiles
    } else {
        Label::Aka
    }
}

/// Split card text into `(label, body)` pairs; text before the first label
/// is dropped.
fn sections(text: &str) -> Vec<(Label, &str)> {
    let matches: Vec<_> = label_pattern().captures_iter(text).collect();
    let mut out = Vec::with_capacity(matches.len());
    for (i, caps) in matches.iter().enumerate() {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = matches
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(text.len(), |m| m.start());
        out.push((classify(name.as_str()), text[whole.end()..end].trim()));
    }
    out
}

/// Text nodes of an element, trimmed, one per line.
fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_label_text(text: &str) -> bool {
    label_pattern().is_match(text) || label_pattern().is_match(&format!("{text}:"))
}

/// The first heading-like text in the card that is not a section label.
fn name_line(card: &ElementRef<'_>) -> Option<String> {
    for css in ["h1, h2, h3, h4", "strong, b"] {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        for el in card.select(&selector) {
            let text = collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "));
            if !text.is_empty() && !is_label_text(&text) && text.chars().any(char::is_alphabetic) {
                return Some(text);
            }
        }
    }
    None
}

fn looks_like_card(el: &ElementRef<'_>) -> bool {
    let text = element_text(el);
    let labels: Vec<Label> = sections(&text).into_iter().map(|(l, _)| l).collect();
    let phone_sections = labels.iter().filter(|l| **l == Label::Phones).count();
    phone_sections == 1
        && labels
            .iter()
            .any(|l| matches!(l, Label::LivesIn | Label::UsedToLiveIn))
        && name_line(el).is_some()
}

fn find_cards<'a>(doc: &'a Html) -> Vec<ElementRef<'a>> {
    let candidates: Vec<ElementRef<'a>> = doc
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(looks_like_card)
        .collect();

    candidates
        .iter()
        .cloned()
        .filter(|el| {
            !el.descendants()
                .skip(1)
                .filter_map(ElementRef::wrap)
                .any(|inner| candidates.contains(&inner))
        })
        .collect()
}

fn split_list(block: &str) -> Vec<String> {
    block
        .split(['•', '\n', ','])
        .map(collapse_whitespace)
        .filter(|s| s.chars().count() >= 3)
        .collect()
}

fn split_addresses(block: &str) -> Vec<String> {
    block
        .split(['•', '\n'])
        .map(collapse_whitespace)
        .filter(|s| s.chars().count() > 5)
        .collect()
}

fn parse_card(card: &ElementRef<'_>) -> Option<Candidate> {
    let heading = name_line(card)?;
    let age = age_pattern()
        .captures(&heading)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok());
    let name = collapse_whitespace(&age_pattern().replace_all(&heading, ""));
    let lowered = name.to_lowercase();
    if name.is_empty()
        || name.chars().count() > 100
        || lowered.contains("function")
        || lowered.contains("react")
    {
        return None;
    }

    let text = element_text(card);
    let mut candidate = Candidate {
        name,
        age,
        ..Default::default()
    };

    for (label, body) in sections(&text) {
        match label {
            Label::Phones => candidate.phones = extract_phones(body),
            Label::LivesIn => {
                let lines: Vec<&str> = body.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
                let Some(first) = lines.first() else {
                    continue;
                };
                let mut line = LocationLine::parse(first);
                if line.state.is_empty() && lines.len() > 1 {
                    line = LocationLine::parse(&format!("{first}, {}", lines[1]));
                }
                candidate.street = line.street;
                candidate.city = line.city;
                candidate.state = line.state;
                candidate.zip = line.zip;
            }
            Label::UsedToLiveIn => candidate.previous_addresses.extend(split_addresses(body)),
            Label::Aka => candidate.aka.extend(split_list(body).into_iter().take(10)),
            Label::RelatedTo => candidate.relatives.extend(split_list(body)),
            Label::Emails | Label::SocialProfiles => {}
        }
    }

    if candidate.phones.is_empty() {
        return None;
    }
    Some(candidate)
}

/// Parse a result page into candidates, in page order.
pub fn parse_result_page(html: &str) -> Vec<Candidate> {
    if html.trim().is_empty() {
        return Vec::new();
    }
    let doc = Html::parse_document(html);
    let cards = find_cards(&doc);
    let candidates: Vec<Candidate> = cards.iter().filter_map(parse_card).collect();
    tracing::debug!(cards = cards.len(), candidates = candidates.len(), "parsed result page");
    candidates
}
