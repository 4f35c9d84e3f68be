//! OCR fallback: rasterize pages and recognize their text.

#[cfg(feature = "native")]
mod pure_engine;

#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::OcrError;
use crate::models::token::{BoundingBox, PageTokens, TextToken};
use crate::pdf::{PageRasterizer, PdfDocument, RasterPage};

/// A recognized text box in image pixel coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBox {
    /// Quadrilateral corners (x1, y1, x2, y2, x3, y3, x4, y4).
    pub bbox: [f32; 8],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence score (0.0 - 1.0).
    pub score: f32,
}

impl TextBox {
    /// Axis-aligned box from two corners.
    pub fn from_rect(text: impl Into<String>, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            bbox: [x1, y1, x2, y1, x2, y2, x1, y2],
            text: text.into(),
            score: 1.0,
        }
    }

    /// Get the axis-aligned bounding rectangle (min_x, min_y, max_x, max_y).
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }
}

/// Text recognition over a single page image.
///
/// Implementations are shared between concurrently processed pages and requests.
pub trait OcrBackend: Send + Sync {
    /// Recognize all text on the image.
    fn recognize(&self, image: &image::DynamicImage) -> Result<Vec<TextBox>, OcrError>;
}

/// Produces page tokens by rasterizing pages and running an [`OcrBackend`].
#[derive(Clone)]
pub struct OcrExtractor {
    backend: Option<Arc<dyn OcrBackend>>,
    rasterizer: PageRasterizer,
}

impl OcrExtractor {
    pub fn new(backend: Option<Arc<dyn OcrBackend>>, rasterizer: PageRasterizer) -> Self {
        Self {
            backend,
            rasterizer,
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// Recognize every selected page.
    ///
    /// Pages are rasterized and recognized in parallel; each page image is
    /// dropped as soon as its text has been read.
    ///
    /// Pages that cannot be rasterized or recognized contribute no tokens. The call
    /// fails with [`OcrError::Unavailable`] when there is no backend or no page
    /// could be processed at all.
    pub fn extract_pages(&self, pdf: &PdfDocument) -> Result<Vec<PageTokens>, OcrError> {
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| OcrError::Unavailable("no OCR backend configured".to_string()))?;
        let start = Instant::now();

        let results: Vec<Result<PageTokens, OcrError>> = pdf
            .pages()
            .par_iter()
            .map(|page| {
                let raster = self.rasterizer.rasterize(pdf, page)?;
                recognize_page(backend.as_ref(), raster)
            })
            .collect();

        let mut pages = Vec::with_capacity(results.len());
        let mut failures = 0;
        for (page, result) in pdf.pages().iter().zip(results) {
            match result {
                Ok(tokens) => pages.push(tokens),
                Err(e) => {
                    warn!("OCR failed for page {}: {}", page.number, e);
                    failures += 1;
                    pages.push(PageTokens::empty(page.index));
                }
            }
        }

        if failures == pages.len() {
            return Err(OcrError::Unavailable(format!(
                "no page of {} could be recognized",
                pages.len()
            )));
        }

        info!(
            "OCR complete: {} pages, {} failed, {}ms",
            pages.len(),
            failures,
            start.elapsed().as_millis()
        );

        Ok(pages)
    }
}

fn recognize_page(backend: &dyn OcrBackend, raster: RasterPage) -> Result<PageTokens, OcrError> {
    let boxes = backend.recognize(&raster.image)?;
    debug!("Page {}: {} OCR boxes", raster.page_index + 1, boxes.len());

    if boxes.iter().all(|b| b.text.trim().is_empty()) {
        return Err(OcrError::Recognition("no characters recognized".to_string()));
    }

    let tokens = boxes
        .into_iter()
        .filter(|b| !b.text.trim().is_empty())
        .map(|b| {
            let (x1, y1, x2, y2) = b.rect();
            let bbox = BoundingBox::from_corners(x1, y1, x2, y2).scaled(raster.points_per_pixel);
            TextToken::new(b.text.trim(), bbox, raster.page_index)
        })
        .collect();

    Ok(PageTokens::new(raster.page_index, tokens))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;

    struct FixedBackend(Vec<TextBox>);

    impl OcrBackend for FixedBackend {
        fn recognize(&self, _image: &DynamicImage) -> Result<Vec<TextBox>, OcrError> {
            Ok(self.0.clone())
        }
    }

    fn raster(points_per_pixel: f32) -> RasterPage {
        RasterPage {
            page_index: 0,
            image: DynamicImage::new_rgba8(4, 4),
            points_per_pixel,
        }
    }

    #[test]
    fn test_text_box_rect() {
        let b = TextBox::from_rect("x", 10.0, 20.0, 30.0, 25.0);
        assert_eq!(b.rect(), (10.0, 20.0, 30.0, 25.0));
    }

    #[test]
    fn test_recognize_page_scales_to_points() {
        let backend = FixedBackend(vec![TextBox::from_rect(" 45000.00 ", 300.0, 600.0, 600.0, 650.0)]);
        let page = recognize_page(&backend, raster(0.24)).unwrap();

        assert_eq!(page.tokens.len(), 1);
        assert_eq!(page.tokens[0].text, "45000.00");
        assert!((page.tokens[0].bbox.x - 72.0).abs() < 1e-3);
        assert!((page.tokens[0].bbox.y - 144.0).abs() < 1e-3);
    }

    #[test]
    fn test_recognize_page_without_characters_fails() {
        let backend = FixedBackend(vec![TextBox::from_rect("  ", 0.0, 0.0, 1.0, 1.0)]);
        assert!(matches!(
            recognize_page(&backend, raster(1.0)),
            Err(OcrError::Recognition(_))
        ));
    }
}
