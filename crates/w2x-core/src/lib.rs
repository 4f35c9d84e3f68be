//! Core library for W-2 wage statement extraction.
//!
//! This crate provides:
//! - PDF loading and native text extraction with positions
//! - An OCR fallback for scanned pages behind the [`OcrBackend`] trait
//! - Line assembly shared by both text sources
//! - W-2 label matching and value normalization
//!
//! [`W2Extractor`] ties the stages together:
//!
//! ```no_run
//! use w2x_core::{W2Config, W2Extractor};
//!
//! let extractor = W2Extractor::new(W2Config::default())?;
//! let result = extractor.extract(&std::fs::read("w2.pdf")?)?;
//! println!("{}", result.to_json().unwrap_or_default());
//! # Ok::<(), w2x_core::W2Error>(())
//! ```

pub mod error;
pub mod layout;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod w2;

pub use error::{OcrError, Omission, PdfError, Result, W2Error};
pub use layout::LayoutAssembler;
pub use models::config::W2Config;
pub use models::result::{ExtractionMethod, ExtractionResult, FieldResult, FieldValue, SourceRef};
pub use models::token::{BoundingBox, Line, PageTokens, TextToken};
pub use ocr::{OcrBackend, OcrExtractor, TextBox};
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use pdf::{PdfDocument, TextExtractor};
pub use pipeline::{PageText, W2Extractor, native_text_sufficient};
pub use w2::{LabelPattern, LabelSet, ShapeHint, W2FieldExtractor};
