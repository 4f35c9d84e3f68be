//! Page rasterization for the OCR fallback.
//!
//! Scanned W-2s carry each page as one image XObject. Rasterizing a page takes the
//! largest decodable image on it and resamples it to the page size at the
//! configured DPI, so OCR boxes map back to page points with a single factor.

use image::imageops::FilterType;
use image::{DynamicImage, ImageBuffer, Rgba};
use lopdf::{Document, Object};
use tracing::{debug, trace};

use super::{PageInfo, PdfDocument, Result, page_resources};
use crate::error::PdfError;

/// A page image ready for recognition.
#[derive(Debug, Clone)]
pub struct RasterPage {
    /// Page index (0-based).
    pub page_index: usize,
    pub image: DynamicImage,
    /// Page points per image pixel.
    pub points_per_pixel: f32,
}

/// Turns pages into images at a fixed resolution.
#[derive(Debug, Clone, Copy)]
pub struct PageRasterizer {
    dpi: u32,
    max_pixels: u64,
}

impl PageRasterizer {
    /// `max_pixels` bounds the output image; 0 lifts the bound.
    pub fn new(dpi: u32, max_pixels: u64) -> Self {
        Self {
            dpi: dpi.max(1),
            max_pixels,
        }
    }

    /// Output size of a `width` x `height` point page.
    ///
    /// Page boxes come from the file, so an oversized one is an error rather
    /// than an allocation.
    pub fn target_size(&self, width: f32, height: f32) -> Result<(u32, u32)> {
        let scale = f64::from(self.dpi) / 72.0;
        let w = (f64::from(width) * scale).round().max(1.0);
        let h = (f64::from(height) * scale).round().max(1.0);

        if self.max_pixels > 0 && w * h > self.max_pixels as f64 {
            return Err(PdfError::Image(format!(
                "{}x{} pt page at {} DPI exceeds {} pixels",
                width, height, self.dpi, self.max_pixels
            )));
        }
        if w > f64::from(u32::MAX) || h > f64::from(u32::MAX) {
            return Err(PdfError::Image(format!("{}x{} pt page is too large", width, height)));
        }

        Ok((w as u32, h as u32))
    }

    /// Rasterize one page.
    pub fn rasterize(&self, pdf: &PdfDocument, page: &PageInfo) -> Result<RasterPage> {
        let (width, height) = self.target_size(page.width, page.height)?;
        let scan = largest_page_image(pdf.document(), page).ok_or(PdfError::NoImage(page.number))?;

        debug!(
            "Rasterizing page {}: {}x{} scan -> {}x{} at {} DPI",
            page.number,
            scan.width(),
            scan.height(),
            width,
            height,
            self.dpi
        );

        let image = if scan.width() == width && scan.height() == height {
            scan
        } else {
            scan.resize_exact(width, height, FilterType::Triangle)
        };

        Ok(RasterPage {
            page_index: page.index,
            image,
            points_per_pixel: 72.0 / self.dpi as f32,
        })
    }
}

impl Default for PageRasterizer {
    fn default() -> Self {
        Self::new(300, 50_000_000)
    }
}

fn largest_page_image(doc: &Document, page: &PageInfo) -> Option<DynamicImage> {
    let resources = page_resources(doc, page.id)?;
    let xobjects = resources.get(b"XObject").ok()?;
    let (_, xobjects) = doc.dereference(xobjects).ok()?;
    let xobjects = xobjects.as_dict().ok()?;

    xobjects
        .iter()
        .filter_map(|(_, obj_ref)| doc.dereference(obj_ref).ok())
        .filter_map(|(_, obj)| decode_image_object(doc, obj))
        .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()))
}

fn decode_image_object(doc: &Document, obj: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict = &stream.dict;

    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
    trace!("Found image object: {}x{}", width, height);

    if let Ok(filter) = dict.get(b"Filter") {
        let filter_name = match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.last().and_then(|o| o.as_name().ok()),
            _ => None,
        };

        match filter_name {
            Some(b"DCTDecode") => {
                return image::load_from_memory_with_format(
                    &stream.content,
                    image::ImageFormat::Jpeg,
                )
                .ok();
            }
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Unsupported image filter {:?}", filter_name.map(String::from_utf8_lossy));
                return None;
            }
            _ => {}
        }
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
            _ => None,
        })
        .unwrap_or(b"DeviceRGB");

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);

    if bits != 8 {
        trace!("Unsupported bits per component: {}", bits);
        return None;
    }

    image_from_raw(&data, width, height, color_space)
}

fn image_from_raw(data: &[u8], width: u32, height: u32, color_space: &[u8]) -> Option<DynamicImage> {
    let pixels = width as usize * height as usize;
    let channels = match color_space {
        b"DeviceRGB" | b"RGB" => 3,
        b"DeviceGray" | b"G" => 1,
        _ => return None,
    };

    if data.len() < pixels * channels {
        trace!(
            "Image data too short: {} bytes for {}x{}x{}",
            data.len(),
            width,
            height,
            channels
        );
        return None;
    }

    let mut rgba = Vec::with_capacity(pixels * 4);
    for chunk in data[..pixels * channels].chunks_exact(channels) {
        match chunk {
            [r, g, b] => rgba.extend_from_slice(&[*r, *g, *b, 255]),
            [gray] => rgba.extend_from_slice(&[*gray, *gray, *gray, 255]),
            _ => return None,
        }
    }

    ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba).map(DynamicImage::ImageRgba8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_from_raw_gray() {
        let data = vec![0u8, 128, 255, 64];
        let img = image_from_raw(&data, 2, 2, b"DeviceGray").unwrap();
        assert_eq!((img.width(), img.height()), (2, 2));
        assert_eq!(img.to_rgba8().get_pixel(1, 0).0, [128, 128, 128, 255]);
    }

    #[test]
    fn test_target_size_letter() {
        let rasterizer = PageRasterizer::default();
        assert_eq!(rasterizer.target_size(612.0, 792.0).unwrap(), (2550, 3300));
        assert_eq!(PageRasterizer::new(72, 0).target_size(0.0, 0.0).unwrap(), (1, 1));
    }

    #[test]
    fn test_target_size_rejects_huge_page() {
        let rasterizer = PageRasterizer::default();
        assert!(matches!(
            rasterizer.target_size(100_000.0, 100_000.0),
            Err(PdfError::Image(_))
        ));
        assert!(matches!(
            PageRasterizer::new(300, 0).target_size(f32::MAX, 10.0),
            Err(PdfError::Image(_))
        ));
    }

    #[test]
    fn test_image_from_raw_rejects_short_data() {
        assert!(image_from_raw(&[0u8; 5], 2, 2, b"DeviceRGB").is_none());
        assert!(image_from_raw(&[0u8; 16], 2, 2, b"DeviceCMYK").is_none());
    }
}
