//! Text normalization applied before metadata extraction.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Month names the recognizer tends to split across line wraps.
static MONTH_SPLITS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"(?i)Novem\s*ber").unwrap(), "November"),
        (Regex::new(r"(?i)Septem\s*ber").unwrap(), "September"),
        (Regex::new(r"(?i)Febru\s*ary").unwrap(), "February"),
    ]
});

/// Collapse repeated whitespace and repair known broken month-name splits.
pub fn normalize(text: &str) -> String {
    let mut text = WHITESPACE.replace_all(text, " ").into_owned();
    for (pattern, replacement) in MONTH_SPLITS.iter() {
        text = pattern.replace_all(&text, *replacement).into_owned();
    }
    text.trim().to_string()
}
