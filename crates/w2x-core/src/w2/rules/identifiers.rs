//! EIN and SSN style identifiers.

use super::patterns::IDENTIFIER_SEPARATORS;
use super::{ShapeMatch, ShapeRule};
use crate::models::result::FieldValue;

/// Identifier rule for a fixed number of digits.
pub struct IdentifierRule {
    digits: usize,
}

impl IdentifierRule {
    pub fn new(digits: usize) -> Self {
        Self { digits }
    }
}

impl ShapeRule for IdentifierRule {
    fn normalize(&self, raw: &str) -> Option<ShapeMatch> {
        let trimmed = raw.trim();
        let digits = normalize_identifier(trimmed, self.digits)?;
        let exact = digits == trimmed;
        Some(ShapeMatch::new(FieldValue::Identifier(digits), exact))
    }
}

/// Strip separators and check the digit count.
///
/// Returns `None` when anything other than digits and separators is present
/// (including masked digits like `XXX-XX-1234`) or the length is wrong.
pub fn normalize_identifier(s: &str, expected_digits: usize) -> Option<String> {
    let stripped = IDENTIFIER_SEPARATORS.replace_all(s.trim(), "");
    if stripped.is_empty() || !stripped.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    (stripped.len() == expected_digits).then(|| stripped.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("12-3456789", 9), Some("123456789".to_string()));
        assert_eq!(normalize_identifier("123-45-6789", 9), Some("123456789".to_string()));
        assert_eq!(normalize_identifier("123 45 6789", 9), Some("123456789".to_string()));
        assert_eq!(normalize_identifier("123456789", 9), Some("123456789".to_string()));
    }

    #[test]
    fn test_normalize_identifier_rejects() {
        assert_eq!(normalize_identifier("12-34X6789", 9), None);
        assert_eq!(normalize_identifier("XXX-XX-6789", 9), None);
        assert_eq!(normalize_identifier("12-345678", 9), None);
        assert_eq!(normalize_identifier("12-34567890", 9), None);
        assert_eq!(normalize_identifier("--", 9), None);
    }

    #[test]
    fn test_identifier_rule_scores_separators() {
        let rule = IdentifierRule::new(9);
        assert_eq!(rule.normalize("123456789").unwrap().score, 1.0);
        assert!(rule.normalize("12-3456789").unwrap().score < 1.0);
    }
}
