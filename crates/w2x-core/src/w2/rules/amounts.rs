//! Monetary and percentage values.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::{CURRENCY, PERCENTAGE, PLAIN_AMOUNT};
use super::{ShapeMatch, ShapeRule};
use crate::models::result::FieldValue;

/// Currency rule.
pub struct CurrencyRule;

impl ShapeRule for CurrencyRule {
    fn normalize(&self, raw: &str) -> Option<ShapeMatch> {
        let trimmed = raw.trim();
        let amount = parse_currency(trimmed)?;
        Some(ShapeMatch::new(
            FieldValue::Currency(amount),
            PLAIN_AMOUNT.is_match(trimmed),
        ))
    }
}

/// Percentage rule.
pub struct PercentageRule;

impl ShapeRule for PercentageRule {
    fn normalize(&self, raw: &str) -> Option<ShapeMatch> {
        let trimmed = raw.trim();
        let value = parse_percentage(trimmed)?;
        Some(ShapeMatch::new(
            FieldValue::Percentage(value),
            !trimmed.contains(char::is_whitespace),
        ))
    }
}

/// Parse a US-formatted non-negative amount (e.g., "$1,234.56" or "45000").
///
/// Thousands separators must be well formed; anything else is rejected.
pub fn parse_currency(s: &str) -> Option<Decimal> {
    let caps = CURRENCY.captures(s.trim())?;
    let integer_part = caps[1].replace(',', "");

    let normalized = match caps.get(2) {
        Some(decimals) => format!("{}.{}", integer_part, decimals.as_str()),
        None => integer_part,
    };

    Decimal::from_str(&normalized).ok()
}

/// Parse a percentage between 0 and 100 (e.g., "6.2%").
pub fn parse_percentage(s: &str) -> Option<Decimal> {
    let caps = PERCENTAGE.captures(s.trim())?;
    let value = Decimal::from_str(&caps[1]).ok()?;
    (value <= Decimal::ONE_HUNDRED).then_some(value)
}
