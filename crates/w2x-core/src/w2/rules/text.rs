//! Free text and personal/business names.

use super::patterns::{TRAILING_AMOUNT, WHITESPACE_RUN};
use super::{ShapeMatch, ShapeRule};
use crate::models::result::FieldValue;

/// Plain text rule.
pub struct TextRule;

impl ShapeRule for TextRule {
    fn normalize(&self, raw: &str) -> Option<ShapeMatch> {
        let text = normalize_text(raw)?;
        let exact = text == raw;
        Some(ShapeMatch::new(FieldValue::Text(text), exact))
    }
}

/// Name rule: text without amounts from neighbouring boxes.
pub struct NameRule;

impl ShapeRule for NameRule {
    fn normalize(&self, raw: &str) -> Option<ShapeMatch> {
        let name = normalize_name(raw)?;
        let exact = name == raw;
        Some(ShapeMatch::new(FieldValue::Text(name), exact))
    }
}

/// Trim, collapse internal whitespace, reject empty strings.
pub fn normalize_text(s: &str) -> Option<String> {
    let collapsed = WHITESPACE_RUN.replace_all(s.trim(), " ");
    (!collapsed.is_empty()).then(|| collapsed.into_owned())
}

/// Normalize as text, drop a trailing monetary amount and require a letter.
pub fn normalize_name(s: &str) -> Option<String> {
    let text = normalize_text(s)?;
    let name = TRAILING_AMOUNT.replace(&text, "");
    let name = name.trim();
    if !name.chars().any(char::is_alphabetic) {
        return None;
    }
    Some(name.to_string())
}

/// Split a full name into first, middle and last parts.
///
/// One word is a first name, two are first and last, anything longer puts the
/// inner words into the middle name.
pub fn split_name(name: &str) -> (Option<String>, Option<String>, Option<String>) {
    let parts: Vec<&str> = name.split_whitespace().collect();
    match parts.as_slice() {
        [] => (None, None, None),
        [first] => (Some(first.to_string()), None, None),
        [first, last] => (Some(first.to_string()), None, Some(last.to_string())),
        [first, middle @ .., last] => (
            Some(first.to_string()),
            Some(middle.join(" ")),
            Some(last.to_string()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  ACME   CORP \t INC "), Some("ACME CORP INC".to_string()));
        assert_eq!(normalize_text(" \n "), None);
    }

    #[test]
    fn test_normalize_name_strips_amounts() {
        assert_eq!(normalize_name("ACME CORP 45,000.00 5000.00"), Some("ACME CORP".to_string()));
        assert_eq!(normalize_name("JANE A DOE"), Some("JANE A DOE".to_string()));
        assert_eq!(normalize_name("0.00"), None);
        assert_eq!(normalize_name("12345"), None);
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("JANE"), (Some("JANE".into()), None, None));
        assert_eq!(split_name("JANE DOE"), (Some("JANE".into()), None, Some("DOE".into())));
        assert_eq!(
            split_name("MARY JANE ANN DOE"),
            (Some("MARY".into()), Some("JANE ANN".into()), Some("DOE".into()))
        );
        assert_eq!(split_name(""), (None, None, None));
    }
}
