//! Positioned text extraction from PDF content streams.

use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Encoding, Object};
use tracing::{debug, trace, warn};

use super::{PageInfo, PdfDocument, Result, number};
use crate::error::PdfError;
use crate::models::token::{BoundingBox, PageTokens, TextToken};

/// Average glyph advance in text space, as a fraction of the font size.
const AVERAGE_GLYPH_WIDTH: f32 = 0.5;

/// TJ adjustments (thousandths of an em) that read as a word gap.
const WORD_GAP: f32 = 200.0;

/// TJ adjustments that separate two columns rather than two words.
const COLUMN_GAP: f32 = 800.0;

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn translate(tx: f32, ty: f32, m: &Matrix) -> Matrix {
    multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], m)
}

/// Text-state parameters that survive across BT/ET blocks.
#[derive(Debug, Clone)]
struct TextState {
    font: Vec<u8>,
    font_size: f32,
    leading: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: Vec::new(),
            font_size: 12.0,
            leading: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
        }
    }
}

/// Walks one page's content stream and records a token per shown string.
struct PageInterpreter<'a> {
    doc: &'a Document,
    page: &'a PageInfo,
    encodings: BTreeMap<Vec<u8>, Encoding<'a>>,
    ctm: Matrix,
    ctm_stack: Vec<Matrix>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    state: TextState,
    tokens: Vec<TextToken>,
}

impl<'a> PageInterpreter<'a> {
    fn new(doc: &'a Document, page: &'a PageInfo) -> Self {
        let encodings = doc
            .get_page_fonts(page.id)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(name, font)| font.get_font_encoding(doc).ok().map(|enc| (name, enc)))
            .collect();

        Self {
            doc,
            page,
            encodings,
            ctm: IDENTITY,
            ctm_stack: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            state: TextState::default(),
            tokens: Vec::new(),
        }
    }

    fn run(mut self, operations: &[Operation]) -> Vec<TextToken> {
        for op in operations {
            self.apply(op);
        }
        self.tokens
    }

    fn apply(&mut self, op: &Operation) {
        let operands = &op.operands;
        let num = |i: usize| operands.get(i).and_then(number);

        match op.operator.as_str() {
            "q" => self.ctm_stack.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.ctm_stack.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operands(operands) {
                    self.ctm = multiply(&m, &self.ctm);
                }
            }
            "BT" => {
                self.text_matrix = IDENTITY;
                self.line_matrix = IDENTITY;
            }
            "Tf" => {
                if let Some(Ok(name)) = operands.first().map(Object::as_name) {
                    self.state.font = name.to_vec();
                }
                if let Some(size) = num(1) {
                    self.state.font_size = size;
                }
            }
            "TL" => self.state.leading = num(0).unwrap_or(0.0),
            "Tc" => self.state.char_spacing = num(0).unwrap_or(0.0),
            "Tw" => self.state.word_spacing = num(0).unwrap_or(0.0),
            "Tz" => self.state.horizontal_scale = num(0).unwrap_or(100.0) / 100.0,
            "Td" => self.move_line(num(0).unwrap_or(0.0), num(1).unwrap_or(0.0)),
            "TD" => {
                let ty = num(1).unwrap_or(0.0);
                self.state.leading = -ty;
                self.move_line(num(0).unwrap_or(0.0), ty);
            }
            "Tm" => {
                if let Some(m) = matrix_operands(operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(obj) = operands.first() {
                    self.show(&[obj]);
                }
            }
            "TJ" => {
                if let Some(Ok(array)) = operands.first().map(Object::as_array) {
                    self.show(&array.iter().collect::<Vec<_>>());
                }
            }
            "'" => {
                self.next_line();
                if let Some(obj) = operands.first() {
                    self.show(&[obj]);
                }
            }
            "\"" => {
                self.state.word_spacing = num(0).unwrap_or(self.state.word_spacing);
                self.state.char_spacing = num(1).unwrap_or(self.state.char_spacing);
                self.next_line();
                if let Some(obj) = operands.get(2) {
                    self.show(&[obj]);
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = translate(tx, ty, &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = if self.state.leading != 0.0 {
            self.state.leading
        } else {
            self.state.font_size * 1.2
        };
        self.move_line(0.0, -leading);
    }

    /// Show a TJ-style sequence of strings and kerning adjustments.
    fn show(&mut self, elements: &[&Object]) {
        let mut pending = String::new();
        let mut start = self.text_matrix;

        for element in elements {
            match element {
                Object::String(bytes, _) => {
                    let text = self.decode(bytes);
                    if pending.is_empty() {
                        start = self.text_matrix;
                    }
                    self.advance(&text);
                    pending.push_str(&text);
                }
                other => {
                    let Some(adjust) = number(other) else { continue };
                    let shift = -adjust / 1000.0
                        * self.state.font_size
                        * self.state.horizontal_scale;
                    if -adjust >= COLUMN_GAP {
                        self.emit(std::mem::take(&mut pending), &start);
                    } else if -adjust >= WORD_GAP && !pending.ends_with(' ') {
                        pending.push(' ');
                    }
                    self.text_matrix = translate(shift, 0.0, &self.text_matrix);
                }
            }
        }

        self.emit(pending, &start);
    }

    fn advance(&mut self, text: &str) {
        let glyphs = text.chars().count() as f32;
        let spaces = text.chars().filter(|c| *c == ' ').count() as f32;
        let tx = (glyphs * AVERAGE_GLYPH_WIDTH * self.state.font_size
            + glyphs * self.state.char_spacing
            + spaces * self.state.word_spacing)
            * self.state.horizontal_scale;
        self.text_matrix = translate(tx, 0.0, &self.text_matrix);
    }

    fn emit(&mut self, text: String, start: &Matrix) {
        if text.trim().is_empty() {
            return;
        }

        let begin = multiply(start, &self.ctm);
        let end = multiply(&self.text_matrix, &self.ctm);
        let size = self.state.font_size * (begin[2] * begin[2] + begin[3] * begin[3]).sqrt();

        let x = begin[4] - self.page.origin.0;
        let baseline = begin[5] - self.page.origin.1;
        let width = (end[4] - begin[4]).abs().max(size * AVERAGE_GLYPH_WIDTH);
        let top = self.page.height - baseline - size;

        trace!("token {:?} at ({:.1}, {:.1}) size {:.1}", text, x, top, size);

        self.tokens.push(TextToken::new(
            text,
            BoundingBox::new(x, top, width, size),
            self.page.index,
        ));
    }

    fn decode(&self, bytes: &[u8]) -> String {
        if let Some(encoding) = self.encodings.get(&self.state.font) {
            if let Ok(text) = Document::decode_text(encoding, bytes) {
                return text;
            }
        }

        if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
            let utf16: Vec<u16> = bytes[2..]
                .chunks_exact(2)
                .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
                .collect();
            return String::from_utf16_lossy(&utf16);
        }

        bytes.iter().map(|&b| b as char).collect()
    }
}

fn matrix_operands(operands: &[Object]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let mut m = IDENTITY;
    for (slot, operand) in m.iter_mut().zip(operands) {
        *slot = number(operand)?;
    }
    Some(m)
}

/// Native text extractor over a loaded [`PdfDocument`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TextExtractor;

impl TextExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract tokens for every selected page.
    ///
    /// A page whose content stream cannot be decoded contributes no tokens.
    pub fn extract_pages(&self, pdf: &PdfDocument) -> Vec<PageTokens> {
        pdf.pages()
            .iter()
            .map(|page| match self.extract_page(pdf, page) {
                Ok(tokens) => tokens,
                Err(e) => {
                    warn!("Skipping text of page {}: {}", page.number, e);
                    PageTokens::empty(page.index)
                }
            })
            .collect()
    }

    /// Extract tokens from one page in content-stream order.
    pub fn extract_page(&self, pdf: &PdfDocument, page: &PageInfo) -> Result<PageTokens> {
        let doc = pdf.document();
        let data = doc
            .get_page_content(page.id)
            .map_err(|e| PdfError::Content(e.to_string()))?;
        let content = Content::decode(&data).map_err(|e| PdfError::Content(e.to_string()))?;

        let tokens = PageInterpreter::new(doc, page).run(&content.operations);
        debug!("Page {}: {} native tokens", page.number, tokens.len());

        Ok(PageTokens::new(page.index, tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiply_translation() {
        let m = translate(10.0, 20.0, &IDENTITY);
        let scaled = multiply(&m, &[2.0, 0.0, 0.0, 2.0, 5.0, 5.0]);
        assert_eq!(scaled, [2.0, 0.0, 0.0, 2.0, 25.0, 45.0]);
    }

    #[test]
    fn test_matrix_operands_requires_six_numbers() {
        let ops: Vec<Object> = vec![1.into(), 0.into(), 0.into(), 1.into(), 72.into()];
        assert!(matrix_operands(&ops).is_none());

        let ops: Vec<Object> = vec![1.into(), 0.into(), 0.into(), 1.into(), 72.into(), 700.into()];
        assert_eq!(matrix_operands(&ops), Some([1.0, 0.0, 0.0, 1.0, 72.0, 700.0]));
    }
}
