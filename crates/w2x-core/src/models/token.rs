//! Positioned text produced by the extractors and grouped by the layout assembler.
//!
//! All coordinates are PDF points (1/72 inch) in page space with the origin at the
//! top-left corner of the page and y growing downwards. Native and OCR extraction
//! both convert into this space before handing tokens on.

use serde::{Deserialize, Serialize};

/// Axis-aligned page-relative rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from two corners in any order.
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    /// Length of the shared vertical band of two boxes (0 when disjoint).
    pub fn vertical_overlap(&self, other: &BoundingBox) -> f32 {
        (self.bottom().min(other.bottom()) - self.top().max(other.top())).max(0.0)
    }

    /// Whether the horizontal extents intersect once `self` is widened by `tolerance`.
    pub fn overlaps_columns(&self, other: &BoundingBox, tolerance: f32) -> bool {
        other.left() <= self.right() + tolerance && other.right() >= self.left() - tolerance
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::from_corners(
            self.left().min(other.left()),
            self.top().min(other.top()),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Scale every coordinate by `factor`.
    pub fn scaled(&self, factor: f32) -> BoundingBox {
        BoundingBox::new(
            self.x * factor,
            self.y * factor,
            self.width * factor,
            self.height * factor,
        )
    }
}

/// A piece of text at a known position on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextToken {
    pub text: String,
    pub bbox: BoundingBox,
    /// Page index (0-based).
    pub page_index: usize,
}

impl TextToken {
    pub fn new(text: impl Into<String>, bbox: BoundingBox, page_index: usize) -> Self {
        Self {
            text: text.into(),
            bbox,
            page_index,
        }
    }

    /// Number of non-whitespace characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().filter(|c| !c.is_whitespace()).count()
    }
}

/// Tokens of one page, in content-stream (or recognition) order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageTokens {
    /// Page index (0-based).
    pub page_index: usize,
    pub tokens: Vec<TextToken>,
}

impl PageTokens {
    pub fn new(page_index: usize, tokens: Vec<TextToken>) -> Self {
        Self { page_index, tokens }
    }

    pub fn empty(page_index: usize) -> Self {
        Self::new(page_index, Vec::new())
    }

    pub fn char_count(&self) -> usize {
        self.tokens.iter().map(TextToken::char_count).sum()
    }

    pub fn is_blank(&self) -> bool {
        self.char_count() == 0
    }
}

/// Tokens sharing a vertical band on one page, ordered left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub page_index: usize,
    /// Position of the line on its page, top to bottom.
    pub line_index: usize,
    pub tokens: Vec<TextToken>,
}

impl Line {
    /// Box covering all tokens of the line.
    pub fn bbox(&self) -> BoundingBox {
        let mut iter = self.tokens.iter().map(|t| t.bbox);
        match iter.next() {
            Some(first) => iter.fold(first, |acc, b| acc.union(&b)),
            None => BoundingBox::default(),
        }
    }

    /// Token texts joined with single spaces.
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertical_overlap() {
        let a = BoundingBox::new(0.0, 10.0, 20.0, 10.0);
        let b = BoundingBox::new(30.0, 15.0, 20.0, 10.0);
        let c = BoundingBox::new(30.0, 40.0, 20.0, 10.0);

        assert_eq!(a.vertical_overlap(&b), 5.0);
        assert_eq!(a.vertical_overlap(&c), 0.0);
    }

    #[test]
    fn test_union_and_columns() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(20.0, 5.0, 10.0, 10.0);
        let u = a.union(&b);

        assert_eq!(u, BoundingBox::new(0.0, 0.0, 30.0, 15.0));
        assert!(!a.overlaps_columns(&b, 5.0));
        assert!(a.overlaps_columns(&b, 10.0));
    }

    #[test]
    fn test_line_text_skips_blank_tokens() {
        let line = Line {
            page_index: 0,
            line_index: 0,
            tokens: vec![
                TextToken::new("Wages", BoundingBox::new(0.0, 0.0, 30.0, 10.0), 0),
                TextToken::new("  ", BoundingBox::new(30.0, 0.0, 5.0, 10.0), 0),
                TextToken::new("100.00 ", BoundingBox::new(40.0, 0.0, 30.0, 10.0), 0),
            ],
        };

        assert_eq!(line.text(), "Wages 100.00");
        assert_eq!(line.bbox(), BoundingBox::new(0.0, 0.0, 70.0, 10.0));
    }
}
