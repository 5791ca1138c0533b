//! Pattern-based metadata extraction from normalized document text.
//!
//! Pure and deterministic: the same input text always yields the same
//! output. Date extraction is best-effort, first-syntactic-match-wins
//! across an ordered pattern list; there is no calendar validation.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::DocumentMetadata;

/// Month-name alternation shared by the long-form date patterns.
const MONTHS: &str =
    "January|February|March|April|May|June|July|August|September|October|November|December";

/// Known location names, matched on word boundaries in this order.
pub const GAZETTEER: &[&str] = &[
    "Dallas",
    "Washington",
    "New Orleans",
    "Miami",
    "Chicago",
    "Los Angeles",
    "Texas",
    "Louisiana",
    "Florida",
    "Illinois",
    "California",
    "Cuba",
    "Mexico",
    "Havana",
    "Arlington",
    "Philadelphia",
    "New York",
    "New Hampshire",
    "Bruxelles",
    "Caracas",
    "Reno",
    "Nevada",
    "Scarsdale",
];

/// Keywords whose following token is captured as a mission name.
pub const MISSION_KEYWORDS: &[&str] = &[
    "Operation",
    "Mission",
    "Project",
    "Plan",
    "Enigma",
    "Mongoose",
    "ZRRIFLE",
    "AMWORLD",
    "Cryptonym",
    "Program",
    "Civic Resistance",
    "KUDESK",
    "KUDARK",
];

/// Date patterns in priority order; the first match wins.
static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Numeric slash form: 11/22/1963
        r"\b\d{1,2}/\d{1,2}/\d{2,4}\b".to_string(),
        // Long month-name form: November 22, 1963
        format!(r"(?i)\b(?:{MONTHS})\s+\d{{1,2}},\s+\d{{4}}\b"),
        // Day-month-year form: 9 November 1976
        format!(r"(?i)\b\d{{1,2}}\s+(?:{MONTHS})\s+\d{{4}}\b"),
        // Short-year month form: June 8, 64
        format!(r"(?i)\b(?:{MONTHS})\s+\d{{1,2}},\s*\d{{2}}\b"),
        // ISO form: 1964-10-23
        r"\b\d{4}-\d{2}-\d{2}\b".to_string(),
        // Dash-numeric form: 06-30-1997
        r"\b\d{2}-\d{2}-\d{4}\b".to_string(),
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Time of day: H:MM with optional AM/PM.
static TIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b\d{1,2}:\d{2}(?:\s*(?:AM|PM))?\b").unwrap());

/// Gazetteer entries as word-boundary patterns with an optional
/// `", <word>"` tail, so "Dallas, Texas" still matches "Dallas".
static LOCATION_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    GAZETTEER
        .iter()
        .map(|loc| {
            let pattern = format!(r"(?i)\b{}(?:,\s*[A-Za-z]+)?\b", regex::escape(loc));
            (*loc, Regex::new(&pattern).unwrap())
        })
        .collect()
});

/// Mission keyword followed by one token of letters, digits, or dashes.
static MISSION_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    MISSION_KEYWORDS
        .iter()
        .map(|keyword| {
            let pattern = format!(r"(?i)\b{}\s+([A-Za-z0-9-]+)\b", regex::escape(keyword));
            (*keyword, Regex::new(&pattern).unwrap())
        })
        .collect()
});

/// Extract structured metadata from normalized text.
///
/// All four fields are independently optional; absence is not an error.
pub fn extract(text: &str) -> DocumentMetadata {
    DocumentMetadata {
        date: extract_date(text),
        time: extract_time(text),
        location: extract_locations(text),
        mission_names: extract_mission_names(text),
    }
}

fn extract_date(text: &str) -> Option<String> {
    for pattern in DATE_PATTERNS.iter() {
        if let Some(m) = pattern.find(text) {
            return Some(m.as_str().to_string());
        }
    }
    None
}

fn extract_time(text: &str) -> Option<String> {
    TIME_PATTERN.find(text).map(|m| m.as_str().to_string())
}

/// Every gazetteer member found in the text, in gazetteer order.
fn extract_locations(text: &str) -> Option<String> {
    let found: Vec<&str> = LOCATION_PATTERNS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(text))
        .map(|(name, _)| *name)
        .collect();

    if found.is_empty() {
        None
    } else {
        Some(found.join(", "))
    }
}

/// Every `<keyword> <token>` occurrence, deduplicated by exact string,
/// first appearance preserved within each keyword.
fn extract_mission_names(text: &str) -> Option<String> {
    let mut names: Vec<String> = Vec::new();
    for (keyword, pattern) in MISSION_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            if let Some(token) = caps.get(1) {
                let name = format!("{} {}", keyword, token.as_str());
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
    }

    if names.is_empty() {
        None
    } else {
        Some(names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_all_fields_from_meeting_notice() {
        let meta = extract(
            "Meeting on November 22, 1963 at 2:30 PM in Dallas, Texas. \
             Operation Mongoose discussed.",
        );
        assert_eq!(meta.date.as_deref(), Some("November 22, 1963"));
        assert_eq!(meta.time.as_deref(), Some("2:30 PM"));
        let location = meta.location.unwrap();
        assert!(location.contains("Dallas"));
        assert!(location.contains("Texas"));
        assert!(meta
            .mission_names
            .unwrap()
            .contains("Operation Mongoose"));
    }

    #[test]
    fn date_priority_order_slash_first() {
        // Both forms present: the slash pattern is tried first.
        let meta = extract("Filed 11/22/1963 regarding November 22, 1963.");
        assert_eq!(meta.date.as_deref(), Some("11/22/1963"));
    }

    #[test]
    fn accepts_syntactic_dates_without_calendar_validation() {
        // First-match-wins is intentionally not calendar-aware.
        let meta = extract("Dated February 35, 1963 per the cover sheet.");
        assert_eq!(meta.date.as_deref(), Some("February 35, 1963"));
    }

    #[test]
    fn date_short_year_form() {
        let meta = extract("Memo of June 8, 64 follows.");
        assert_eq!(meta.date.as_deref(), Some("June 8, 64"));
    }

    #[test]
    fn date_iso_and_dash_forms() {
        assert_eq!(extract("ref 1964-10-23").date.as_deref(), Some("1964-10-23"));
        assert_eq!(extract("ref 06-30-1997").date.as_deref(), Some("06-30-1997"));
    }

    #[test]
    fn time_without_meridiem() {
        let meta = extract("Logged at 14:05 by the duty officer.");
        assert_eq!(meta.time.as_deref(), Some("14:05"));
    }

    #[test]
    fn locations_in_gazetteer_order() {
        let meta = extract("Flight from Havana to Dallas via Miami.");
        assert_eq!(meta.location.as_deref(), Some("Dallas, Miami, Havana"));
    }

    #[test]
    fn mission_names_deduplicated() {
        let meta = extract("Operation Overlord briefing. Operation Overlord and Project AMWORLD.");
        assert_eq!(
            meta.mission_names.as_deref(),
            Some("Operation Overlord, Project AMWORLD")
        );
    }

    #[test]
    fn absent_fields_are_none() {
        let meta = extract("Nothing of note here.");
        assert_eq!(meta, DocumentMetadata::default());
    }

    #[test]
    fn extraction_is_pure() {
        let text = "Meeting on November 22, 1963 at 2:30 PM in Dallas.";
        let first = extract(text);
        let _ = extract("Completely different text in Chicago, 09/01/1970");
        let second = extract(text);
        assert_eq!(first, second);
    }
}
