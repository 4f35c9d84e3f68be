//! The extraction orchestrator.
//!
//! One call walks a fixed sequence of stages:
//!
//! ```text
//! LOAD -> NATIVE_EXTRACT -> QUALITY_CHECK -> (OCR_EXTRACT | skip)
//!      -> ASSEMBLE -> MATCH -> NORMALIZE -> DONE
//! ```
//!
//! Only a document that cannot be loaded fails the call. Every later problem
//! shrinks the result instead.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{Result, W2Error};
use crate::layout::LayoutAssembler;
use crate::models::config::{QualityConfig, W2Config};
use crate::models::result::{ExtractionMethod, ExtractionResult};
use crate::models::token::PageTokens;
use crate::ocr::{OcrBackend, OcrExtractor};
use crate::pdf::{PageRasterizer, PdfDocument, TextExtractor};
use crate::w2::{LabelSet, W2FieldExtractor};

/// Page tokens tagged with the stage that produced them.
///
/// Once OCR has been chosen, native tokens are gone; the two never mix.
#[derive(Debug, Clone, PartialEq)]
pub enum PageText {
    Native(Vec<PageTokens>),
    Ocr(Vec<PageTokens>),
}

impl PageText {
    pub fn method(&self) -> ExtractionMethod {
        match self {
            Self::Native(_) => ExtractionMethod::Text,
            Self::Ocr(_) => ExtractionMethod::Ocr,
        }
    }

    pub fn pages(&self) -> &[PageTokens] {
        match self {
            Self::Native(pages) | Self::Ocr(pages) => pages,
        }
    }
}

/// Whether native text is good enough to skip OCR.
///
/// Fails when the document carries fewer than `min_chars_per_page` non-whitespace
/// characters per page, or when more than `max_blank_page_ratio` of its pages
/// have no text at all.
pub fn native_text_sufficient(pages: &[PageTokens], config: &QualityConfig) -> bool {
    if pages.is_empty() {
        return false;
    }

    let chars: usize = pages.iter().map(PageTokens::char_count).sum();
    let blank = pages.iter().filter(|p| p.is_blank()).count();
    let blank_ratio = blank as f32 / pages.len() as f32;

    debug!(
        "Native text: {} chars over {} pages, {} blank",
        chars,
        pages.len(),
        blank
    );

    chars >= config.min_chars_per_page * pages.len() && blank_ratio <= config.max_blank_page_ratio
}

/// Extracts W-2 fields from PDF bytes.
///
/// Immutable after construction and safe to share between threads.
#[derive(Clone)]
pub struct W2Extractor {
    config: W2Config,
    text: TextExtractor,
    ocr: OcrExtractor,
    layout: LayoutAssembler,
    fields: W2FieldExtractor,
}

impl W2Extractor {
    /// Create an extractor without an OCR backend.
    ///
    /// Loads `matching.labels_file` when set.
    pub fn new(config: W2Config) -> Result<Self> {
        let labels = match &config.matching.labels_file {
            Some(path) => {
                let labels = LabelSet::from_file(path)?;
                info!("Loaded {} label patterns from {}", labels.patterns().len(), path.display());
                labels
            }
            None => LabelSet::w2(),
        };

        Ok(Self {
            text: TextExtractor::new(),
            ocr: OcrExtractor::new(None, rasterizer(&config)),
            layout: LayoutAssembler::new(&config.layout),
            fields: W2FieldExtractor::new(labels, &config.matching),
            config,
        })
    }

    /// Use `backend` for the OCR fallback.
    pub fn with_ocr_backend(mut self, backend: Arc<dyn OcrBackend>) -> Self {
        self.ocr = OcrExtractor::new(Some(backend), rasterizer(&self.config));
        self
    }

    /// Replace the label table.
    pub fn with_labels(mut self, labels: LabelSet) -> Self {
        self.fields = W2FieldExtractor::new(labels, &self.config.matching);
        self
    }

    /// Whether the OCR fallback can run at all.
    pub fn has_ocr(&self) -> bool {
        self.config.ocr.enabled && self.ocr.is_available()
    }

    /// Run the whole pipeline on one document.
    ///
    /// Fails only with [`W2Error::UnreadableDocument`].
    pub fn extract(&self, data: &[u8]) -> Result<ExtractionResult> {
        let start = Instant::now();

        debug!("LOAD: {} bytes", data.len());
        let pdf = PdfDocument::load(data, self.config.pdf.max_pages).map_err(W2Error::UnreadableDocument)?;

        debug!("NATIVE_EXTRACT: {} pages", pdf.page_count());
        let native = self.text.extract_pages(&pdf);

        debug!("QUALITY_CHECK");
        let text = if native_text_sufficient(&native, &self.config.quality) {
            PageText::Native(native)
        } else {
            debug!("OCR_EXTRACT");
            PageText::Ocr(self.run_ocr(&pdf))
        };

        debug!("ASSEMBLE: {:?}", text.method());
        let lines = self.layout.assemble_pages(text.pages());

        debug!("MATCH: {} lines", lines.len());
        let result = self.fields.extract(&lines, text.method());

        info!(
            "DONE: method={}, {} fields, {}ms",
            result.method,
            result.len(),
            start.elapsed().as_millis()
        );
        Ok(result)
    }

    /// OCR every page, degrading to no tokens when OCR cannot run.
    fn run_ocr(&self, pdf: &PdfDocument) -> Vec<PageTokens> {
        if !self.has_ocr() {
            let reason = if self.config.ocr.enabled {
                "no OCR backend configured"
            } else {
                "disabled by configuration"
            };
            warn!("OCR unavailable: {}", reason);
            return Vec::new();
        }

        match self.ocr.extract_pages(pdf) {
            Ok(pages) => pages,
            Err(e) => {
                warn!("{}", e);
                Vec::new()
            }
        }
    }
}

fn rasterizer(config: &W2Config) -> PageRasterizer {
    PageRasterizer::new(config.pdf.raster_dpi, config.pdf.max_raster_pixels)
}
