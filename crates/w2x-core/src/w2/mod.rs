//! W-2 field extraction from assembled lines.

pub mod labels;
pub mod matcher;
pub mod rules;

pub use labels::{LabelPattern, LabelSet, ShapeHint, normalize_label};
pub use matcher::{Candidate, Direction, LabelMatcher, compare_candidates};

use tracing::debug;

use crate::models::config::MatchingConfig;
use crate::models::result::{ExtractionMethod, ExtractionResult, FieldResult, FieldValue};
use crate::models::token::Line;

const EMPLOYEE_NAME: &str = "employee_name";
const EMPLOYEE_FIRST_NAME: &str = "employee_first_name";
const EMPLOYEE_MIDDLE_NAME: &str = "employee_middle_name";
const EMPLOYEE_LAST_NAME: &str = "employee_last_name";

/// Turns assembled lines into an [`ExtractionResult`].
#[derive(Debug, Clone)]
pub struct W2FieldExtractor {
    matcher: LabelMatcher,
    page_filter: bool,
}

impl W2FieldExtractor {
    pub fn new(labels: LabelSet, config: &MatchingConfig) -> Self {
        Self {
            matcher: LabelMatcher::new(labels, config.clone()),
            page_filter: config.w2_page_filter,
        }
    }

    /// Match labels on `lines` and keep the best value per field.
    pub fn extract(&self, lines: &[Line], method: ExtractionMethod) -> ExtractionResult {
        let selected = if self.page_filter {
            select_w2_pages(lines)
        } else {
            lines.to_vec()
        };

        let mut result = ExtractionResult::empty(method);
        for field in self.matcher.match_lines(&selected) {
            result.offer(field);
        }

        add_name_parts(&mut result);
        result
    }
}

impl Default for W2FieldExtractor {
    fn default() -> Self {
        Self::new(LabelSet::w2(), &MatchingConfig::default())
    }
}

/// Lines of the pages that look like a W-2, or all lines when none does.
///
/// A page looks like a W-2 when its text mentions both "w-2" and "employee".
pub fn select_w2_pages(lines: &[Line]) -> Vec<Line> {
    let mut pages: Vec<usize> = lines.iter().map(|l| l.page_index).collect();
    pages.dedup();

    let w2_pages: Vec<usize> = pages
        .into_iter()
        .filter(|page| {
            let text = lines
                .iter()
                .filter(|l| l.page_index == *page)
                .map(|l| l.text().to_lowercase())
                .collect::<Vec<_>>()
                .join("\n");
            text.contains("w-2") && text.contains("employee")
        })
        .collect();

    if w2_pages.is_empty() {
        return lines.to_vec();
    }

    debug!(
        "W-2 pages: {:?}",
        w2_pages.iter().map(|p| p + 1).collect::<Vec<_>>()
    );
    lines
        .iter()
        .filter(|l| w2_pages.contains(&l.page_index))
        .cloned()
        .collect()
}

/// Derive first, middle and last name fields from `employee_name`.
fn add_name_parts(result: &mut ExtractionResult) {
    let Some(name) = result.fields.get(EMPLOYEE_NAME).cloned() else {
        return;
    };
    let Some(full) = name.value.as_str() else {
        return;
    };

    let (first, middle, last) = rules::split_name(full);
    let parts = [
        (EMPLOYEE_FIRST_NAME, first),
        (EMPLOYEE_MIDDLE_NAME, middle),
        (EMPLOYEE_LAST_NAME, last),
    ];

    for (field, part) in parts {
        if let Some(part) = part {
            result.offer(FieldResult {
                field: field.to_string(),
                value: FieldValue::Text(part),
                raw: name.raw.clone(),
                confidence: name.confidence,
                source: name.source,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::token::{BoundingBox, TextToken};
    use pretty_assertions::assert_eq;

    fn line(page_index: usize, line_index: usize, y: f32, texts: &[(&str, f32)]) -> Line {
        Line {
            page_index,
            line_index,
            tokens: texts
                .iter()
                .map(|(text, x)| {
                    TextToken::new(*text, BoundingBox::new(*x, y, text.len() as f32 * 5.0, 10.0), page_index)
                })
                .collect(),
        }
    }

    #[test]
    fn test_extract_keeps_best_hit() {
        let lines = vec![
            line(0, 0, 100.0, &[("1 Wages, tips, other comp.", 20.0)]),
            line(0, 1, 130.0, &[("52000.00", 20.0)]),
            line(0, 2, 300.0, &[("1 Wages, tips, other comp.", 20.0), ("51000.00", 200.0)]),
        ];

        let result = W2FieldExtractor::default().extract(&lines, ExtractionMethod::Text);
        assert_eq!(result.len(), 1);
        assert_eq!(result.get("box1_wages").unwrap().to_string(), "51000.00");
    }

    #[test]
    fn test_name_parts_are_derived() {
        let lines = vec![
            line(0, 0, 100.0, &[("e Employee's first name and initial", 20.0)]),
            line(0, 1, 114.0, &[("JANE Q PUBLIC", 20.0)]),
        ];

        let result = W2FieldExtractor::default().extract(&lines, ExtractionMethod::Ocr);
        assert_eq!(result.get("employee_name").and_then(FieldValue::as_str), Some("JANE Q PUBLIC"));
        assert_eq!(result.get("employee_first_name").and_then(FieldValue::as_str), Some("JANE"));
        assert_eq!(result.get("employee_middle_name").and_then(FieldValue::as_str), Some("Q"));
        assert_eq!(result.get("employee_last_name").and_then(FieldValue::as_str), Some("PUBLIC"));
    }

    #[test]
    fn test_select_w2_pages() {
        let lines = vec![
            line(0, 0, 100.0, &[("Cover letter", 20.0)]),
            line(1, 0, 100.0, &[("Form W-2 Wage and Tax Statement", 20.0)]),
            line(1, 1, 120.0, &[("a Employee's social security number", 20.0)]),
        ];

        let selected = select_w2_pages(&lines);
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|l| l.page_index == 1));

        let none = select_w2_pages(&lines[..1]);
        assert_eq!(none.len(), 1);
    }
}
