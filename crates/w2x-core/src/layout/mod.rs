//! Line assembly from positioned tokens.
//!
//! Works on [`TextToken`]s only and never looks at where they came from, so native
//! and OCR pages are grouped by exactly the same rules.

use std::cmp::Ordering;

use tracing::trace;

use crate::models::config::LayoutConfig;
use crate::models::token::{BoundingBox, Line, PageTokens, TextToken};

/// Groups a page's tokens into lines.
#[derive(Debug, Clone)]
pub struct LayoutAssembler {
    overlap_ratio: f32,
}

impl LayoutAssembler {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            overlap_ratio: config.line_overlap_ratio.clamp(0.0, 1.0),
        }
    }

    /// Assemble every page, keeping page order.
    pub fn assemble_pages(&self, pages: &[PageTokens]) -> Vec<Line> {
        pages.iter().flat_map(|page| self.assemble(page)).collect()
    }

    /// Cluster one page's tokens into lines ordered top to bottom.
    ///
    /// Two tokens share a line when their vertical centers are closer than the
    /// tolerance, or their vertical bands overlap by at least the tolerance, where
    /// the tolerance is `line_overlap_ratio` times the smaller token height.
    /// Within a line tokens are ordered by left edge; equal left edges keep their
    /// extraction order.
    pub fn assemble(&self, page: &PageTokens) -> Vec<Line> {
        let mut tokens: Vec<&TextToken> = page
            .tokens
            .iter()
            .filter(|t| !t.text.trim().is_empty())
            .collect();
        tokens.sort_by(|a, b| by_center_then_left(&a.bbox, &b.bbox));

        let mut groups: Vec<(BoundingBox, Vec<TextToken>)> = Vec::new();
        for token in tokens {
            match groups.last_mut() {
                Some((band, members)) if self.same_line(band, &token.bbox) => {
                    *band = band.union(&token.bbox);
                    members.push(token.clone());
                }
                _ => groups.push((token.bbox, vec![token.clone()])),
            }
        }

        groups.sort_by(|a, b| a.0.top().total_cmp(&b.0.top()));

        let lines: Vec<Line> = groups
            .into_iter()
            .enumerate()
            .map(|(line_index, (_, mut members))| {
                members.sort_by(|a, b| a.bbox.left().total_cmp(&b.bbox.left()));
                Line {
                    page_index: page.page_index,
                    line_index,
                    tokens: members,
                }
            })
            .collect();

        trace!(
            "Page {}: {} tokens -> {} lines",
            page.page_index + 1,
            page.tokens.len(),
            lines.len()
        );
        lines
    }

    fn same_line(&self, band: &BoundingBox, token: &BoundingBox) -> bool {
        let tolerance = self.overlap_ratio * band.height.min(token.height);
        (band.center_y() - token.center_y()).abs() < tolerance
            || band.vertical_overlap(token) >= tolerance.max(f32::EPSILON)
    }
}

impl Default for LayoutAssembler {
    fn default() -> Self {
        Self::new(&LayoutConfig::default())
    }
}

fn by_center_then_left(a: &BoundingBox, b: &BoundingBox) -> Ordering {
    a.center_y()
        .total_cmp(&b.center_y())
        .then(a.left().total_cmp(&b.left()))
}
