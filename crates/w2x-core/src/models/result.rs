//! Extraction results and their JSON contract.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};

/// Which extraction pathway produced the fields of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Text taken from the PDF content stream.
    Text,
    /// Text recognized from page images.
    Ocr,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Ocr => "ocr",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized field value.
///
/// Monetary and percentage values serialize as JSON numbers, identifiers and
/// text as JSON strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Currency(Decimal),
    Percentage(Decimal),
    /// Digits only, separators removed.
    Identifier(String),
    Text(String),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Identifier(s) | Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Currency(d) => write!(f, "{:.2}", d),
            Self::Percentage(d) => write!(f, "{}%", d),
            Self::Identifier(s) | Self::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Currency(d) | Self::Percentage(d) => {
                rust_decimal::serde::arbitrary_precision::serialize(d, serializer)
            }
            Self::Identifier(s) | Self::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// Where a field value was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SourceRef {
    /// Page index (0-based).
    pub page_index: usize,
    /// Line index within the page (0-based, top to bottom).
    pub line_index: usize,
}

/// One extracted field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldResult {
    /// Field identifier, e.g. `box1_wages`.
    pub field: String,
    pub value: FieldValue,
    /// Text the value was normalized from.
    pub raw: String,
    /// Proximity and shape-match quality (0.0 - 1.0).
    pub confidence: f32,
    pub source: SourceRef,
}

/// The fields found in one document and how they were obtained.
///
/// Only fields that were actually found are present. Serializes to
/// `{"fields": {id: value, ...}, "method": "text" | "ocr"}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub fields: BTreeMap<String, FieldResult>,
    pub method: ExtractionMethod,
}

impl ExtractionResult {
    /// Create an empty result.
    pub fn empty(method: ExtractionMethod) -> Self {
        Self {
            fields: BTreeMap::new(),
            method,
        }
    }

    /// Add a field, keeping the existing entry when it is at least as confident.
    ///
    /// Ties keep the earlier source so the outcome does not depend on the order
    /// candidates were offered in.
    pub fn offer(&mut self, candidate: FieldResult) {
        match self.fields.get(&candidate.field) {
            Some(existing)
                if existing.confidence > candidate.confidence
                    || (existing.confidence == candidate.confidence
                        && existing.source <= candidate.source) => {}
            _ => {
                self.fields.insert(candidate.field.clone(), candidate);
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field).map(|f| &f.value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialize to the JSON response body.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

struct FieldValues<'a>(&'a BTreeMap<String, FieldResult>);

impl Serialize for FieldValues<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, field) in self.0 {
            map.serialize_entry(id, &field.value)?;
        }
        map.end()
    }
}

impl Serialize for ExtractionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ExtractionResult", 2)?;
        state.serialize_field("fields", &FieldValues(&self.fields))?;
        state.serialize_field("method", &self.method)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn field(id: &str, value: FieldValue, confidence: f32, page: usize, line: usize) -> FieldResult {
        FieldResult {
            field: id.to_string(),
            value,
            raw: String::new(),
            confidence,
            source: SourceRef {
                page_index: page,
                line_index: line,
            },
        }
    }

    #[test]
    fn test_serialize_contract() {
        let mut result = ExtractionResult::empty(ExtractionMethod::Text);
        result.offer(field(
            "box1_wages",
            FieldValue::Currency(Decimal::from_str("45000.00").unwrap()),
            0.95,
            0,
            1,
        ));
        result.offer(field(
            "employer_ein",
            FieldValue::Identifier("123456789".to_string()),
            0.9,
            0,
            0,
        ));

        let json = result.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"fields":{"box1_wages":45000.00,"employer_ein":"123456789"},"method":"text"}"#
        );
    }

    #[test]
    fn test_large_amounts_keep_every_digit() {
        let amount = FieldValue::Currency(Decimal::from_str("12345678901234567.89").unwrap());
        assert_eq!(serde_json::to_string(&amount).unwrap(), "12345678901234567.89");

        let rate = FieldValue::Percentage(Decimal::from_str("6.20").unwrap());
        assert_eq!(serde_json::to_string(&rate).unwrap(), "6.20");
    }

    #[test]
    fn test_empty_result_has_no_nulls() {
        let result = ExtractionResult::empty(ExtractionMethod::Ocr);
        assert_eq!(result.to_json().unwrap(), r#"{"fields":{},"method":"ocr"}"#);
    }

    #[test]
    fn test_offer_keeps_single_value_per_field() {
        let mut result = ExtractionResult::empty(ExtractionMethod::Text);
        result.offer(field("control_number", FieldValue::Text("A".into()), 0.8, 0, 3));
        result.offer(field("control_number", FieldValue::Text("B".into()), 0.9, 1, 0));
        result.offer(field("control_number", FieldValue::Text("C".into()), 0.9, 1, 2));

        assert_eq!(result.len(), 1);
        assert_eq!(result.get("control_number"), Some(&FieldValue::Text("B".into())));
    }
}
