//! Field extraction and normalization
//!
//! [`extract_field`] walks an ordered candidate list against a [`Surface`] and
//! returns the first non-empty text. [`parse_multiplier`] and [`parse_time`]
//! turn that text into canonical form; they are pure functions.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::Result;
use crate::observation::{Multiplier, ObservedTime};
use crate::traits::{SelectorExpr, Surface};

/// Marker appended to every canonical multiplier
pub const MULTIPLIER_MARKER: char = 'x';

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

// ASCII digits only: `\d` and `\b` are Unicode-aware in `regex`
static MULTIPLIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9]+(?:[.,][0-9]+)?\s*x?)").expect("valid multiplier pattern")
});

pub(crate) static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u:\b)([0-9]{1,2}:[0-9]{2}(?::[0-9]{2})?)(?-u:\b)").expect("valid time pattern")
});

/// Collapse runs of whitespace to one space and trim the ends
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Return the text of the first candidate that resolves to non-empty text
///
/// Candidates are tried in order. A candidate that matches nothing, or whose
/// element has only whitespace, is skipped.
///
/// # Returns
///
/// - `Ok(Some(text))`: Trimmed text of the first usable candidate
/// - `Ok(None)`: No candidate produced text
/// - `Err(Error)`: The surface failed
pub async fn extract_field(
    surface: &dyn Surface,
    candidates: &[SelectorExpr],
) -> Result<Option<String>> {
    for selector in candidates {
        let Some(element) = surface.lookup(selector).await? else {
            continue;
        };

        let text = surface.read_text(&element).await?;
        let text = text.trim();
        if !text.is_empty() {
            tracing::trace!("{} -> {:?}", selector, text);
            return Ok(Some(text.to_string()));
        }
    }

    Ok(None)
}

/// Normalize multiplier text
///
/// Takes the first decimal number (optionally followed by the `x` marker),
/// strips whitespace, turns a comma decimal separator into `.` and makes sure
/// the value ends in a lowercase `x`.
///
/// An uppercase marker is lowercased, so records written by older collectors
/// that kept `2.5X` as shown will not compare equal to `2.5x` read from the
/// store verbatim; [`Observation::from_payload`](crate::Observation::from_payload)
/// accepts either case.
///
/// `"1,5"` → `"1.5x"`, `"23.40x"` → `"23.40x"`, `"no number here"` → `None`.
pub fn parse_multiplier(text: &str) -> Option<Multiplier> {
    let cleaned = collapse_whitespace(text);
    let token = MULTIPLIER_RE.captures(&cleaned)?.get(1)?.as_str();

    let mut canonical: String = token
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if canonical.ends_with(['x', 'X']) {
        canonical.pop();
    }
    canonical.push(MULTIPLIER_MARKER);

    Some(Multiplier::from_canonical(canonical))
}

/// Normalize time text
///
/// Returns the first `H:MM[:SS]` match, or the whitespace-collapsed text
/// itself when there is none. Never fails.
///
/// `"Server time 14:05:09 UTC"` → `"14:05:09"`,
/// `"no time pattern"` → `"no time pattern"`.
pub fn parse_time(text: &str) -> ObservedTime {
    let cleaned = collapse_whitespace(text);
    match TIME_RE.captures(&cleaned).and_then(|c| c.get(1)) {
        Some(m) => ObservedTime::from_canonical(m.as_str().to_string()),
        None => ObservedTime::from_canonical(cleaned),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multiplier() {
        assert_eq!(parse_multiplier("1,5").unwrap().as_str(), "1.5x");
        assert_eq!(parse_multiplier("23.40x").unwrap().as_str(), "23.40x");
        assert_eq!(parse_multiplier("2.5X").unwrap().as_str(), "2.5x");
        assert!(parse_multiplier("no number here").is_none());
        assert!(parse_multiplier("").is_none());
    }

    #[test]
    fn test_parse_multiplier_noise() {
        assert_eq!(parse_multiplier("  2.5 X  ").unwrap().as_str(), "2.5x");
        assert_eq!(parse_multiplier("Round\n  12,07 x\tpaid").unwrap().as_str(), "12.07x");
        assert_eq!(parse_multiplier("7").unwrap().as_str(), "7x");
        // Only the first number is taken
        assert_eq!(parse_multiplier("1.20x 3.40x").unwrap().as_str(), "1.20x");
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("Server time 14:05:09 UTC").as_str(), "14:05:09");
        assert_eq!(parse_time("9:15").as_str(), "9:15");
        assert_eq!(parse_time("no time pattern").as_str(), "no time pattern");
        assert_eq!(parse_time("  round   closed \n").as_str(), "round closed");
    }

    #[test]
    fn test_non_ascii_digits_are_not_numbers() {
        // Arabic-Indic 2.5 and a fullwidth-only number
        assert!(parse_multiplier("\u{0662}\u{066B}\u{0665}x").is_none());
        assert!(parse_multiplier("\u{FF12}.\u{FF15}x").is_none());

        let time = parse_time("\u{0661}\u{0664}:\u{0660}\u{0665}");
        assert_eq!(time.as_str(), "\u{0661}\u{0664}:\u{0660}\u{0665}");
        assert!(!time.is_clock_time());

        // ASCII time next to non-ASCII letters still matches
        assert_eq!(parse_time("hora\u{00E1}09:15:00").as_str(), "09:15:00");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
        assert_eq!(collapse_whitespace(""), "");
    }
}
