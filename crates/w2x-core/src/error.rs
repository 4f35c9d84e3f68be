//! Error types for the w2x-core library.

use thiserror::Error;

/// Main error type for the w2x library.
///
/// Only [`W2Error::UnreadableDocument`] is ever returned by the extraction
/// pipeline itself; every other failure inside a request degrades to a smaller
/// result instead of aborting it.
#[derive(Error, Debug)]
pub enum W2Error {
    /// The byte stream is not a PDF we can parse at all.
    #[error("unreadable document: {0}")]
    UnreadableDocument(#[from] PdfError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted with a non-empty password.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// A page content stream could not be read or decoded.
    #[error("failed to decode content stream: {0}")]
    Content(String),

    /// The page carries no image that could be rasterized.
    #[error("no decodable image on page {0}")]
    NoImage(u32),

    /// Image decoding or resampling failed.
    #[error("image error: {0}")]
    Image(String),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// No OCR backend is available for this request.
    #[error("OCR unavailable: {0}")]
    Unavailable(String),

    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

impl From<PdfError> for OcrError {
    fn from(err: PdfError) -> Self {
        OcrError::Unavailable(err.to_string())
    }
}

/// Reason a field is missing from a result.
///
/// Neither case is an error; both are only reported through logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Omission {
    /// No label of the field was found with a value in range.
    FieldNotFound,
    /// A value was found but did not have the expected shape.
    NormalizationRejected,
}

/// Result type for the w2x library.
pub type Result<T> = std::result::Result<T, W2Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_error_becomes_unreadable_document() {
        let err: W2Error = PdfError::Encrypted.into();
        assert!(matches!(err, W2Error::UnreadableDocument(PdfError::Encrypted)));
        assert_eq!(err.to_string(), "unreadable document: PDF is encrypted");
    }

    #[test]
    fn test_pdf_error_downgrades_to_ocr_unavailable() {
        let err: OcrError = PdfError::NoImage(2).into();
        assert!(matches!(err, OcrError::Unavailable(_)));
    }
}
