//! The W-2 label table: field identifier, printed labels and value shape.
//!
//! The built-in table is plain data; a JSON file with the same structure can
//! replace it, so new fields and aliases need no code changes.

use std::ops::Range;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::W2Error;

/// Expected value category of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ShapeHint {
    Currency,
    Percentage,
    Identifier { digits: usize },
    Text,
    /// Text naming a person or business.
    Name,
}

impl ShapeHint {
    /// Whether values of this shape usually sit on the line below their label.
    pub fn prefers_next_line(&self) -> bool {
        matches!(self, Self::Text | Self::Name)
    }
}

/// One W-2 field and the labels it is printed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelPattern {
    /// Field identifier, e.g. `box1_wages`.
    pub field: String,
    /// Box number or letter printed before the label, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_number: Option<String>,
    pub aliases: Vec<String>,
    pub shape: ShapeHint,
}

impl LabelPattern {
    /// All normalized spellings of the label, longest first.
    ///
    /// Each alias is also recognized with its box number ("1 wages ...") and as
    /// "box 1 wages ...".
    pub fn spellings(&self) -> Vec<String> {
        let mut spellings = Vec::new();
        for alias in &self.aliases {
            let alias = normalize_label(alias);
            if alias.is_empty() {
                continue;
            }
            if let Some(number) = &self.box_number {
                let number = normalize_label(number);
                spellings.push(format!("box {} {}", number, alias));
                spellings.push(format!("{} {}", number, alias));
            }
            spellings.push(alias);
        }
        spellings.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        spellings.dedup();
        spellings
    }
}

/// Normalize label text for comparison.
///
/// Lowercases, unifies apostrophes, drops `.`, `,`, `:` and `;`, and collapses
/// whitespace.
pub fn normalize_label(s: &str) -> String {
    normalize_mapped(s).0
}

/// [`normalize_label`] plus, for every byte of the output, the byte range of the
/// input character it came from.
pub(crate) fn normalize_mapped(s: &str) -> (String, Vec<Range<usize>>) {
    let mut out = String::with_capacity(s.len());
    let mut map = Vec::with_capacity(s.len());

    for (offset, c) in s.char_indices() {
        let source = offset..offset + c.len_utf8();
        let before = out.len();
        match c {
            '.' | ',' | ':' | ';' => {}
            '\u{2019}' | '\u{2018}' | '`' => out.push('\''),
            c if c.is_whitespace() => {
                if !out.is_empty() && !out.ends_with(' ') {
                    out.push(' ');
                }
            }
            c => out.extend(c.to_lowercase()),
        }
        map.extend(std::iter::repeat_n(source, out.len() - before));
    }

    if out.ends_with(' ') {
        out.pop();
        map.pop();
    }
    (out, map)
}

struct LabelSpec {
    field: &'static str,
    box_number: Option<&'static str>,
    aliases: &'static [&'static str],
    shape: ShapeHint,
}

const SSN_DIGITS: usize = 9;
const EIN_DIGITS: usize = 9;

const W2_LABELS: &[LabelSpec] = &[
    LabelSpec {
        field: "employee_ssn",
        box_number: Some("a"),
        aliases: &["Employee's social security number", "Employee's SSN", "Employee SSN"],
        shape: ShapeHint::Identifier { digits: SSN_DIGITS },
    },
    LabelSpec {
        field: "employer_ein",
        box_number: Some("b"),
        aliases: &[
            "Employer identification number (EIN)",
            "Employer identification number",
            "Employer ID number",
            "Employer's FED ID number",
        ],
        shape: ShapeHint::Identifier { digits: EIN_DIGITS },
    },
    LabelSpec {
        field: "employer_name",
        box_number: Some("c"),
        aliases: &[
            "Employer's name, address, and ZIP code",
            "Employer's name, address and ZIP code",
            "Employer's name",
        ],
        shape: ShapeHint::Name,
    },
    LabelSpec {
        field: "control_number",
        box_number: Some("d"),
        aliases: &["Control number"],
        shape: ShapeHint::Text,
    },
    LabelSpec {
        field: "employee_name",
        box_number: Some("e"),
        aliases: &[
            "Employee's first name and initial Last name Suff.",
            "Employee's first name and initial Last name",
            "Employee's first name and initial",
            "Employee's name",
        ],
        shape: ShapeHint::Name,
    },
    LabelSpec {
        field: "box1_wages",
        box_number: Some("1"),
        aliases: &[
            "Wages, tips, other compensation",
            "Wages, tips, other comp.",
            "Wages, tips and other compensation",
        ],
        shape: ShapeHint::Currency,
    },
    LabelSpec {
        field: "box2_federal_withholding",
        box_number: Some("2"),
        aliases: &["Federal income tax withheld"],
        shape: ShapeHint::Currency,
    },
    LabelSpec {
        field: "box3_ss_wages",
        box_number: Some("3"),
        aliases: &["Social security wages"],
        shape: ShapeHint::Currency,
    },
    LabelSpec {
        field: "box4_ss_withholding",
        box_number: Some("4"),
        aliases: &["Social security tax withheld"],
        shape: ShapeHint::Currency,
    },
    LabelSpec {
        field: "box5_medicare_wages",
        box_number: Some("5"),
        aliases: &["Medicare wages and tips"],
        shape: ShapeHint::Currency,
    },
    LabelSpec {
        field: "box6_medicare_withholding",
        box_number: Some("6"),
        aliases: &["Medicare tax withheld"],
        shape: ShapeHint::Currency,
    },
    LabelSpec {
        field: "box7_ss_tips",
        box_number: Some("7"),
        aliases: &["Social security tips"],
        shape: ShapeHint::Currency,
    },
    LabelSpec {
        field: "box8_allocated_tips",
        box_number: Some("8"),
        aliases: &["Allocated tips"],
        shape: ShapeHint::Currency,
    },
    LabelSpec {
        field: "box10_dependent_care",
        box_number: Some("10"),
        aliases: &["Dependent care benefits"],
        shape: ShapeHint::Currency,
    },
    LabelSpec {
        field: "box11_nonqualified_plans",
        box_number: Some("11"),
        aliases: &["Nonqualified plans"],
        shape: ShapeHint::Currency,
    },
    LabelSpec {
        field: "box14_mapfml",
        box_number: None,
        aliases: &["MAPFML", "MA PFML"],
        shape: ShapeHint::Currency,
    },
    LabelSpec {
        field: "box16_state_wages",
        box_number: Some("16"),
        aliases: &["State wages, tips, etc.", "State wages"],
        shape: ShapeHint::Currency,
    },
    LabelSpec {
        field: "box17_state_withholding",
        box_number: Some("17"),
        aliases: &["State income tax"],
        shape: ShapeHint::Currency,
    },
    LabelSpec {
        field: "box18_local_wages",
        box_number: Some("18"),
        aliases: &["Local wages, tips, etc.", "Local wages"],
        shape: ShapeHint::Currency,
    },
    LabelSpec {
        field: "box19_local_withholding",
        box_number: Some("19"),
        aliases: &["Local income tax"],
        shape: ShapeHint::Currency,
    },
];

/// An ordered set of label patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet {
    patterns: Vec<LabelPattern>,
}

impl LabelSet {
    /// The built-in W-2 label table.
    pub fn w2() -> Self {
        let patterns = W2_LABELS
            .iter()
            .map(|spec| LabelPattern {
                field: spec.field.to_string(),
                box_number: spec.box_number.map(str::to_string),
                aliases: spec.aliases.iter().map(|a| a.to_string()).collect(),
                shape: spec.shape,
            })
            .collect();
        Self { patterns }
    }

    pub fn new(patterns: Vec<LabelPattern>) -> Self {
        Self { patterns }
    }

    /// Load a label table from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, W2Error> {
        let content = std::fs::read_to_string(path)?;
        let set: LabelSet = serde_json::from_str(&content)
            .map_err(|e| W2Error::Config(format!("{}: {}", path.display(), e)))?;
        if set.patterns.is_empty() {
            return Err(W2Error::Config(format!("{}: no label patterns", path.display())));
        }
        Ok(set)
    }

    pub fn patterns(&self) -> &[LabelPattern] {
        &self.patterns
    }

    pub fn get(&self, field: &str) -> Option<&LabelPattern> {
        self.patterns.iter().find(|p| p.field == field)
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::w2()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("1  Wages, tips, other comp.:"), "1 wages tips other comp");
        assert_eq!(normalize_label("Employer\u{2019}s name"), "employer's name");
        assert_eq!(normalize_label("  "), "");
    }

    #[test]
    fn test_normalize_mapped_points_back_to_source() {
        let source = "Wages:  45.00";
        let (norm, map) = normalize_mapped(source);
        assert_eq!(norm, "wages 4500");
        assert_eq!(map.len(), norm.len());
        assert_eq!(&source[map[6].clone()], "4");
        assert_eq!(&source[map[9].clone()], "0");
    }

    #[test]
    fn test_spellings_include_box_numbers() {
        let set = LabelSet::w2();
        let wages = set.get("box1_wages").unwrap();
        let spellings = wages.spellings();

        assert!(spellings.contains(&"1 wages tips other comp".to_string()));
        assert!(spellings.contains(&"box 1 wages tips other compensation".to_string()));
        assert!(spellings.windows(2).all(|w| w[0].len() >= w[1].len()));
    }

    #[test]
    fn test_field_identifiers_are_unique() {
        let set = LabelSet::w2();
        let mut fields: Vec<&str> = set.patterns().iter().map(|p| p.field.as_str()).collect();
        let total = fields.len();
        fields.sort();
        fields.dedup();
        assert_eq!(fields.len(), total);
    }

    #[test]
    fn test_label_set_json_shape() {
        let json = r#"[{"field": "box12a", "box_number": "12a", "aliases": ["Code"], "shape": {"kind": "text"}}]"#;
        let set: LabelSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.patterns()[0].shape, ShapeHint::Text);
        assert_eq!(set.patterns()[0].spellings()[0], "box 12a code");
    }
}
