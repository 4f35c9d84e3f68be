//! PDF loading, native text extraction and page rasterization.

mod extractor;
mod raster;

pub use extractor::TextExtractor;
pub use raster::{PageRasterizer, RasterPage};

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// US Letter, used when a page has no usable MediaBox.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Geometry and identity of one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageInfo {
    /// Page number (1-indexed, as in the page tree).
    pub number: u32,
    /// Page index (0-based).
    pub index: usize,
    pub id: ObjectId,
    /// MediaBox lower-left corner.
    pub origin: (f32, f32),
    pub width: f32,
    pub height: f32,
}

/// A parsed PDF ready for extraction.
pub struct PdfDocument {
    document: Document,
    pages: Vec<PageInfo>,
}

impl PdfDocument {
    /// Parse a PDF from memory.
    ///
    /// Documents encrypted with an empty user password are decrypted; any other
    /// encryption is rejected. `max_pages` of 0 keeps every page.
    pub fn load(data: &[u8], max_pages: usize) -> Result<Self> {
        let mut document =
            Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if document.is_encrypted() {
            if document.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        let page_ids = document.get_pages();
        if page_ids.is_empty() {
            return Err(PdfError::NoPages);
        }

        let limit = if max_pages == 0 { usize::MAX } else { max_pages };
        let pages: Vec<PageInfo> = page_ids
            .iter()
            .take(limit)
            .enumerate()
            .map(|(index, (&number, &id))| {
                let [llx, lly, urx, ury] = media_box(&document, id);
                PageInfo {
                    number,
                    index,
                    id,
                    origin: (llx.min(urx), lly.min(ury)),
                    width: (urx - llx).abs(),
                    height: (ury - lly).abs(),
                }
            })
            .collect();

        debug!(
            "Loaded PDF with {} pages ({} selected)",
            page_ids.len(),
            pages.len()
        );

        Ok(Self { document, pages })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn pages(&self) -> &[PageInfo] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Find `key` on a page or the nearest ancestor in the page tree.
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    node_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let dict = doc.get_object(node_id).ok()?.as_dict().ok()?;
    if let Ok(value) = dict.get(key) {
        return doc.dereference(value).ok().map(|(_, obj)| obj);
    }
    match dict.get(b"Parent") {
        Ok(Object::Reference(parent_id)) => inherited_attribute(doc, *parent_id, key),
        _ => None,
    }
}

/// Resources dictionary of a page, honouring inheritance.
pub(crate) fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    inherited_attribute(doc, page_id, b"Resources")?.as_dict().ok()
}

fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let values = inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|obj| obj.as_array().ok())
        .map(|arr| arr.iter().filter_map(number).collect::<Vec<f32>>());

    match values {
        Some(v) if v.len() == 4 && v[2] != v[0] && v[3] != v[1] => [v[0], v[1], v[2], v[3]],
        _ => DEFAULT_MEDIA_BOX,
    }
}

/// Numeric value of an operand.
pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_garbage_is_parse_error() {
        let err = PdfDocument::load(b"definitely not a pdf", 0).err().unwrap();
        assert!(matches!(err, PdfError::Parse(_)));
    }

    #[test]
    fn test_document_is_shared_across_ocr_workers() {
        fn assert_sync<T: Sync>() {}
        assert_sync::<PdfDocument>();
        assert_sync::<PageRasterizer>();
    }

    #[test]
    fn test_number_operands() {
        assert_eq!(number(&Object::Integer(12)), Some(12.0));
        assert_eq!(number(&Object::Real(1.5)), Some(1.5));
        assert_eq!(number(&Object::Null), None);
    }
}
