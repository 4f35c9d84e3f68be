//! Label matching: find field labels on assembled lines and pick their values.

use std::cmp::Ordering;
use std::ops::Range;

use tracing::{debug, trace};

use super::labels::{LabelPattern, LabelSet, normalize_mapped};
use super::rules::normalize;
use crate::error::Omission;
use crate::models::config::MatchingConfig;
use crate::models::result::{FieldResult, SourceRef};
use crate::models::token::{BoundingBox, Line};

/// Placement score of a value found on the label's own line.
const SAME_LINE_SCORE: f32 = 0.95;
/// Placement score of a value on a neighbouring line at distance zero.
const NEARBY_LINE_SCORE: f32 = 0.9;
/// How much the neighbouring-line score drops at the edge of the distance bound.
const DISTANCE_PENALTY: f32 = 0.3;

/// Characters separating a label from its value on the same line.
const LABEL_VALUE_SEPARATORS: &[char] = &[' ', ':', '.', ',', ';'];

/// Where a candidate value sits relative to its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Direction {
    /// Further along the label's own line.
    SameLine,
    /// On a line below, in the label's column.
    Below,
    /// On a separate line starting to the right of the label.
    Right,
}

/// Outcome of looking below a label on one line.
enum ColumnScan {
    /// Nothing in the label's column, or the line is out of range.
    Empty,
    /// Another label sits in the column.
    Label,
    Value(Candidate),
}

/// A possible value for a label, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub raw: String,
    pub direction: Direction,
    /// Distance from the label's top-left corner to the value's top-left corner.
    pub distance: f32,
    pub source: SourceRef,
}

/// Total order over neighbouring-line candidates.
///
/// Nearest first; at equal distance a line below beats a line to the right;
/// remaining ties go to the earlier page and line.
pub fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then(a.direction.cmp(&b.direction))
        .then(a.source.cmp(&b.source))
}

/// A label occurrence on a line, in normalized-text byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Hit {
    pattern: usize,
    start: usize,
    end: usize,
}

/// A line prepared for matching: joined text, token spans and normalized text.
struct IndexedLine<'a> {
    line: &'a Line,
    text: String,
    /// Byte range of each token in `text`; `None` for blank tokens.
    spans: Vec<Option<Range<usize>>>,
    norm: String,
    norm_map: Vec<Range<usize>>,
    hits: Vec<Hit>,
}

impl<'a> IndexedLine<'a> {
    fn new(line: &'a Line, spellings: &[Vec<String>]) -> Self {
        let mut text = String::new();
        let mut spans = Vec::with_capacity(line.tokens.len());
        for token in &line.tokens {
            let piece = token.text.trim();
            if piece.is_empty() {
                spans.push(None);
                continue;
            }
            if !text.is_empty() {
                text.push(' ');
            }
            let start = text.len();
            text.push_str(piece);
            spans.push(Some(start..text.len()));
        }

        let (norm, norm_map) = normalize_mapped(&text);
        let hits = find_hits(&norm, spellings);

        Self {
            line,
            text,
            spans,
            norm,
            norm_map,
            hits,
        }
    }

    /// Byte range in `text` covered by a hit.
    fn source_range(&self, hit: &Hit) -> Range<usize> {
        self.norm_map[hit.start].start..self.norm_map[hit.end - 1].end
    }

    /// Box covering `range` of the joined text, interpolating inside tokens.
    fn span_box(&self, range: &Range<usize>) -> Option<BoundingBox> {
        let mut result: Option<BoundingBox> = None;

        for (token, span) in self.line.tokens.iter().zip(&self.spans) {
            let Some(span) = span else { continue };
            let start = range.start.max(span.start);
            let end = range.end.min(span.end);
            if start >= end {
                continue;
            }

            let piece = &self.text[span.clone()];
            let total = piece.chars().count().max(1) as f32;
            let before = self.text[span.start..start].chars().count() as f32;
            let inside = self.text[start..end].chars().count() as f32;

            let bbox = token.bbox;
            let part = BoundingBox::new(
                bbox.x + bbox.width * before / total,
                bbox.y,
                bbox.width * inside / total,
                bbox.height,
            );
            result = Some(match result {
                Some(acc) => acc.union(&part),
                None => part,
            });
        }

        result
    }

    /// Byte range in `text` from the first to the last of `tokens`.
    fn tokens_range(&self, tokens: &[usize]) -> Option<Range<usize>> {
        let first = self.spans[*tokens.first()?].as_ref()?;
        let last = self.spans[*tokens.last()?].as_ref()?;
        Some(first.start..last.end)
    }

    /// Whether any label occurrence touches `range` of the joined text.
    fn has_label_in(&self, range: &Range<usize>) -> bool {
        self.hits.iter().any(|hit| {
            let source = self.source_range(hit);
            source.start < range.end && range.start < source.end
        })
    }

    fn source(&self) -> SourceRef {
        SourceRef {
            page_index: self.line.page_index,
            line_index: self.line.line_index,
        }
    }
}

/// Find non-overlapping label occurrences, preferring earlier then longer ones.
fn find_hits(norm: &str, spellings: &[Vec<String>]) -> Vec<Hit> {
    let bytes = norm.as_bytes();
    let mut found = Vec::new();

    for (pattern, spellings) in spellings.iter().enumerate() {
        for spelling in spellings {
            for (start, matched) in norm.match_indices(spelling.as_str()) {
                let end = start + matched.len();
                let starts_word = start == 0 || bytes[start - 1] == b' ';
                let ends_word = end == bytes.len() || bytes[end] == b' ';
                if starts_word && ends_word {
                    found.push(Hit {
                        pattern,
                        start,
                        end,
                    });
                }
            }
        }
    }

    found.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut hits: Vec<Hit> = Vec::new();
    for hit in found {
        if hits.last().is_none_or(|last| hit.start >= last.end) {
            hits.push(hit);
        }
    }
    hits
}

/// Matches a [`LabelSet`] against assembled lines.
#[derive(Debug, Clone)]
pub struct LabelMatcher {
    labels: LabelSet,
    spellings: Vec<Vec<String>>,
    config: MatchingConfig,
}

impl LabelMatcher {
    pub fn new(labels: LabelSet, config: MatchingConfig) -> Self {
        let spellings = labels.patterns().iter().map(LabelPattern::spellings).collect();
        Self {
            labels,
            spellings,
            config,
        }
    }

    /// Find values for every label occurrence on `lines`.
    ///
    /// Lines must be ordered by page and line index, as the layout assembler
    /// produces them. A field may be returned more than once when its label
    /// occurs repeatedly (e.g. several copies of the form on one page); the
    /// caller keeps the best one.
    pub fn match_lines(&self, lines: &[Line]) -> Vec<FieldResult> {
        let indexed: Vec<IndexedLine<'_>> = lines
            .iter()
            .map(|line| IndexedLine::new(line, &self.spellings))
            .collect();

        let mut results = Vec::new();
        let mut seen = vec![false; self.labels.patterns().len()];

        for (position, line) in indexed.iter().enumerate() {
            for (order, hit) in line.hits.iter().enumerate() {
                let pattern = &self.labels.patterns()[hit.pattern];
                seen[hit.pattern] = true;

                let next = line.hits.get(order + 1);
                let same_line = same_line_candidate(line, hit, next);
                let nearby = self.nearby_candidates(&indexed, position, line, hit, next);
                let omission = omission_reason(same_line.as_ref(), &nearby);

                match self.resolve(pattern, same_line, nearby) {
                    Some(result) => {
                        trace!(
                            "{} = {} ({:?}, confidence {:.2})",
                            result.field, result.value, result.raw, result.confidence
                        );
                        results.push(result);
                    }
                    None => debug!(
                        "{}: label on page {} line {} has no usable value ({:?})",
                        pattern.field,
                        line.line.page_index + 1,
                        line.line.line_index,
                        omission
                    ),
                }
            }
        }

        for (pattern, seen) in self.labels.patterns().iter().zip(&seen) {
            if !seen {
                trace!("{}: {:?}", pattern.field, Omission::FieldNotFound);
            }
        }

        results
    }

    /// Try candidates in the order the shape prefers; the first value that
    /// normalizes wins.
    fn resolve(
        &self,
        pattern: &LabelPattern,
        same_line: Option<Candidate>,
        nearby: Vec<Candidate>,
    ) -> Option<FieldResult> {
        let ordered: Vec<Candidate> = if pattern.shape.prefers_next_line() {
            nearby.into_iter().chain(same_line).collect()
        } else {
            same_line.into_iter().chain(nearby).collect()
        };

        ordered.into_iter().find_map(|candidate| {
            let shape = normalize(&candidate.raw, pattern.shape)?;
            Some(FieldResult {
                field: pattern.field.clone(),
                value: shape.value,
                confidence: self.placement_score(&candidate) * shape.score,
                raw: candidate.raw,
                source: candidate.source,
            })
        })
    }

    fn placement_score(&self, candidate: &Candidate) -> f32 {
        match candidate.direction {
            Direction::SameLine => SAME_LINE_SCORE,
            Direction::Below | Direction::Right => {
                let bound = self
                    .config
                    .max_vertical_distance
                    .hypot(self.config.max_horizontal_distance)
                    .max(f32::EPSILON);
                NEARBY_LINE_SCORE - DISTANCE_PENALTY * (candidate.distance / bound).clamp(0.0, 1.0)
            }
        }
    }

    /// Candidate values on other lines of the same page, sorted by
    /// [`compare_candidates`].
    ///
    /// Below the label, lines are taken top to bottom until one puts another
    /// label in the label's column; nothing past that line belongs to this
    /// label. To the right, a value must start before the next label on the
    /// label's own line.
    fn nearby_candidates(
        &self,
        lines: &[IndexedLine<'_>],
        position: usize,
        label_line: &IndexedLine<'_>,
        hit: &Hit,
        next_hit: Option<&Hit>,
    ) -> Vec<Candidate> {
        let Some(label_box) = label_line.span_box(&label_line.source_range(hit)) else {
            return Vec::new();
        };
        let right_limit = next_hit
            .and_then(|next| label_line.span_box(&label_line.source_range(next)))
            .map(|next| next.left());
        let page = label_line.line.page_index;

        let mut others: Vec<&IndexedLine<'_>> = lines
            .iter()
            .enumerate()
            .filter(|(i, other)| *i != position && other.line.page_index == page)
            .map(|(_, other)| other)
            .collect();
        others.sort_by(|a, b| a.line.bbox().top().total_cmp(&b.line.bbox().top()));

        let mut candidates = Vec::new();
        let mut column_closed = false;
        for other in others {
            if !column_closed {
                match self.scan_column(&label_box, other) {
                    ColumnScan::Value(candidate) => {
                        candidates.push(candidate);
                        continue;
                    }
                    ColumnScan::Label => column_closed = true,
                    ColumnScan::Empty => {}
                }
            }
            if let Some(candidate) = self.right_candidate(&label_box, right_limit, other) {
                candidates.push(candidate);
            }
        }

        candidates.sort_by(compare_candidates);
        candidates
    }

    /// What `other` holds in the label's column, if it lies below the label
    /// within range.
    fn scan_column(&self, label: &BoundingBox, other: &IndexedLine<'_>) -> ColumnScan {
        let line_box = other.line.bbox();
        if line_box.top() <= label.center_y()
            || line_box.top() - label.bottom() > self.config.max_vertical_distance
        {
            return ColumnScan::Empty;
        }

        let column: Vec<usize> = other
            .line
            .tokens
            .iter()
            .enumerate()
            .filter(|(i, t)| {
                other.spans[*i].is_some() && label.overlaps_columns(&t.bbox, self.config.column_tolerance)
            })
            .map(|(i, _)| i)
            .collect();

        let Some(range) = other.tokens_range(&column) else {
            return ColumnScan::Empty;
        };
        if other.has_label_in(&range) {
            return ColumnScan::Label;
        }

        match self.candidate_from_tokens(label, other, &column, Direction::Below) {
            Some(candidate) => ColumnScan::Value(candidate),
            None => ColumnScan::Empty,
        }
    }

    /// Tokens of a line level with the label that start right of it, up to the
    /// next label on that line.
    fn right_candidate(
        &self,
        label: &BoundingBox,
        limit: Option<f32>,
        other: &IndexedLine<'_>,
    ) -> Option<Candidate> {
        let line_box = other.line.bbox();
        if line_box.center_y() < label.top()
            || line_box.center_y() - label.center_y() > self.config.max_vertical_distance / 2.0
        {
            return None;
        }

        let first = other.line.tokens.iter().enumerate().position(|(i, t)| {
            let gap = t.bbox.left() - label.right();
            other.spans[i].is_some()
                && gap >= -self.config.column_tolerance
                && gap <= self.config.max_horizontal_distance
        })?;
        if limit.is_some_and(|limit| other.line.tokens[first].bbox.left() >= limit) {
            return None;
        }

        let rest: Vec<usize> = (first..other.line.tokens.len())
            .filter(|i| other.spans[*i].is_some())
            .take_while(|i| {
                other.spans[*i]
                    .as_ref()
                    .is_some_and(|span| !other.has_label_in(span))
            })
            .collect();

        self.candidate_from_tokens(label, other, &rest, Direction::Right)
    }

    fn candidate_from_tokens(
        &self,
        label: &BoundingBox,
        line: &IndexedLine<'_>,
        tokens: &[usize],
        direction: Direction,
    ) -> Option<Candidate> {
        let first = *tokens.first()?;
        let range = line.tokens_range(tokens)?;

        if line.has_label_in(&range) {
            return None;
        }

        let raw = tokens
            .iter()
            .filter_map(|i| line.spans[*i].as_ref())
            .map(|span| &line.text[span.clone()])
            .collect::<Vec<_>>()
            .join(" ");

        let start = line.line.tokens[first].bbox;
        let distance = (start.left() - label.left()).hypot(start.top() - label.top());

        Some(Candidate {
            raw,
            direction,
            distance,
            source: line.source(),
        })
    }
}

/// Why a label ended up without a value: no candidate at all, or only
/// candidates that failed normalization.
fn omission_reason(same_line: Option<&Candidate>, nearby: &[Candidate]) -> Omission {
    if same_line.is_none() && nearby.is_empty() {
        Omission::FieldNotFound
    } else {
        Omission::NormalizationRejected
    }
}

/// Text after the label on its own line, up to the next label.
fn same_line_candidate(line: &IndexedLine<'_>, hit: &Hit, next: Option<&Hit>) -> Option<Candidate> {
    let start = line.source_range(hit).end;
    let end = next.map_or(line.text.len(), |n| line.source_range(n).start);
    if start >= end {
        return None;
    }

    let raw = line.text[start..end]
        .trim_start_matches(LABEL_VALUE_SEPARATORS)
        .trim_end();
    if raw.is_empty() {
        return None;
    }

    Some(Candidate {
        raw: raw.to_string(),
        direction: Direction::SameLine,
        distance: 0.0,
        source: line.source(),
    })
}
