//! Candidate selection and text normalization

use once_cell::sync::Lazy;
use regex::Regex;

use super::{CandidateSet, ExtractionThresholds};
use crate::compose::Format;

static DISALLOWED_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[^\w\s.,!?;:\-()'"ğüşıöçĞÜŞİÖÇ]+"#).expect("static regex")
});

/// Collapse whitespace, drop symbols outside the allowed set, trim
pub fn clean_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    DISALLOWED_CHARS
        .replace_all(&collapsed, "")
        .trim()
        .to_string()
}

/// Choose the content for `format`
///
/// The readability candidate wins when present and longer than
/// `min_primary_length` characters after trimming. Text is normalized with
/// [`clean_text`]; markdown is returned as extracted. `Html` has no candidates
/// and selects to `""`.
pub fn select(
    format: Format,
    primary: Option<&CandidateSet>,
    fallback: &CandidateSet,
    thresholds: &ExtractionThresholds,
) -> String {
    let primary = primary
        .and_then(|set| set.get(format))
        .filter(|candidate| candidate.content.trim().chars().count() > thresholds.min_primary_length);

    let Some(candidate) = primary.or_else(|| fallback.get(format)) else {
        return String::new();
    };

    match format {
        Format::Text => clean_text(&candidate.content),
        _ => candidate.content.clone(),
    }
}
