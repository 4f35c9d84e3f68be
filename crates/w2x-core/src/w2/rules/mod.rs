//! Shape rules that turn raw matched text into canonical values.
//!
//! A rule either produces a value of its shape or nothing; it never produces a
//! partially cleaned value.

pub mod amounts;
pub mod identifiers;
pub mod patterns;
pub mod text;

pub use amounts::{CurrencyRule, PercentageRule, parse_currency, parse_percentage};
pub use identifiers::{IdentifierRule, normalize_identifier};
pub use text::{NameRule, TextRule, normalize_name, normalize_text, split_name};

use crate::models::result::FieldValue;
use crate::w2::labels::ShapeHint;

/// Confidence factor for values that needed symbols or separators removed.
pub const CLEANED_SHAPE_SCORE: f32 = 0.9;

/// Trait for shape rules.
pub trait ShapeRule {
    /// Normalize `raw`, or reject it.
    fn normalize(&self, raw: &str) -> Option<ShapeMatch>;
}

/// A normalized value and how closely the raw text already matched its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeMatch {
    /// Normalized value.
    pub value: FieldValue,
    /// 1.0 when the raw text was already canonical, lower when it needed cleaning.
    pub score: f32,
}

impl ShapeMatch {
    pub fn new(value: FieldValue, exact: bool) -> Self {
        Self {
            value,
            score: if exact { 1.0 } else { CLEANED_SHAPE_SCORE },
        }
    }
}

/// Normalize `raw` according to a shape hint.
pub fn normalize(raw: &str, shape: ShapeHint) -> Option<ShapeMatch> {
    match shape {
        ShapeHint::Currency => CurrencyRule.normalize(raw),
        ShapeHint::Percentage => PercentageRule.normalize(raw),
        ShapeHint::Identifier { digits } => IdentifierRule::new(digits).normalize(raw),
        ShapeHint::Text => TextRule.normalize(raw),
        ShapeHint::Name => NameRule.normalize(raw),
    }
}
