//! Tag normalization and validation.
//!
//! One pure function: raw token in, accepted normalized tag (or rejection) out.
//! Rejection rules run in a fixed order and stop at the first match; normalization
//! is trim + lowercase and never touches slash-separated hierarchy.

use regex::Regex;
use std::sync::OnceLock;

const MIN_TAG_LEN: usize = 2;

fn uuid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
    })
}

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^v?\d+(\.\d+){1,3}$").unwrap())
}

fn hex_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-f]{8,}$").unwrap())
}

fn entity_remnant_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Leftovers of HTML entities after the `&`/`#` got stripped: `x2026`, `amp;`…
    RE.get_or_init(|| Regex::new(r"^(x[0-9a-f]{4,}|amp|lt|gt|quot|apos|nbsp|ndash|mdash);?$").unwrap())
}

/// Normalize `raw`, returning `None` when the token is not a legitimate tag.
///
/// Idempotent: feeding an accepted tag back in returns it unchanged.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.trim().to_lowercase();

    // 1. Entirely numeric (years, issue numbers).
    if !tag.is_empty() && tag.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    // 2. No letters at all (separator noise like `-_-` or `1-2-3`).
    if !tag.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    // 3. Too short to be vocabulary.
    if tag.chars().count() < MIN_TAG_LEN {
        return None;
    }
    // 4. Markup-entity remnants and zero-width characters.
    if tag
        .chars()
        .any(|c| matches!(c, '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{2060}' | '\u{feff}'))
        || entity_remnant_re().is_match(&tag)
    {
        return None;
    }
    // 5. Technical artifacts: long hex runs, UUIDs, version numbers.
    if hex_run_re().is_match(&tag) || uuid_re().is_match(&tag) || version_re().is_match(&tag) {
        return None;
    }
    // 6. Character set.
    if !tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/'))
    {
        return None;
    }
    // 7. Must start with a letter or digit.
    if !tag.chars().next().is_some_and(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    Some(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_and_lowercases() {
        assert_eq!(normalize_tag("  Deep-Focus "), Some("deep-focus".to_string()));
        assert_eq!(normalize_tag("area/Health/Sleep"), Some("area/health/sleep".to_string()));
        assert_eq!(normalize_tag("x86"), Some("x86".to_string()));
    }

    #[test]
    fn rejects_pure_numbers() {
        assert_eq!(normalize_tag("2024"), None);
        assert_eq!(normalize_tag("0"), None);
    }

    #[test]
    fn rejects_non_letter_noise() {
        assert_eq!(normalize_tag("-_-"), None);
        assert_eq!(normalize_tag("1-2-3"), None);
    }

    #[test]
    fn rejects_short_tokens() {
        assert_eq!(normalize_tag("a"), None);
        assert_eq!(normalize_tag("ok"), Some("ok".to_string()));
    }

    #[test]
    fn rejects_entity_remnants_and_zero_width() {
        assert_eq!(normalize_tag("x2026"), None);
        assert_eq!(normalize_tag("nbsp;"), None);
        assert_eq!(normalize_tag("work\u{200b}"), None);
    }

    #[test]
    fn rejects_technical_artifacts() {
        assert_eq!(normalize_tag("deadbeefcafe"), None);
        assert_eq!(normalize_tag("550e8400-e29b-41d4-a716-446655440000"), None);
        assert_eq!(normalize_tag("v1.2.3"), None);
        assert_eq!(normalize_tag("1.0"), None);
    }

    #[test]
    fn rejects_invalid_characters_and_leading_punctuation() {
        assert_eq!(normalize_tag("tag!"), None);
        assert_eq!(normalize_tag("café"), None);
        assert_eq!(normalize_tag("-leading"), None);
        assert_eq!(normalize_tag("_private"), None);
    }

    #[test]
    fn idempotent_on_accepted_tags() {
        for raw in ["Deep-Focus", "area/Health", "notes_2", "ML-ops"] {
            let once = normalize_tag(raw).unwrap();
            assert_eq!(normalize_tag(&once), Some(once.clone()));
        }
    }
}
