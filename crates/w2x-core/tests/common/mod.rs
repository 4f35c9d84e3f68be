//! In-memory PDF fixtures.

#![allow(dead_code)]

use std::sync::Arc;

use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use w2x_core::{OcrBackend, OcrError, TextBox};

pub const PAGE_WIDTH: i64 = 612;
pub const PAGE_HEIGHT: i64 = 792;
pub const FONT_SIZE: i64 = 10;

/// One page of a fixture document.
pub enum PageSpec {
    /// Strings shown at (x, baseline y) in PDF user space.
    Text(Vec<(&'static str, i64, i64)>),
    /// A single 8-bit DeviceGray image covering the page.
    Scan { width: i64, height: i64 },
    /// A page image with a thin native text layer on top.
    ScanWithText {
        width: i64,
        height: i64,
        text: Vec<(&'static str, i64, i64)>,
    },
    Blank,
}

fn text_operations(items: &[(&str, i64, i64)]) -> Vec<Operation> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), Object::Integer(FONT_SIZE)]),
    ];
    for (text, x, y) in items {
        operations.push(Operation::new(
            "Tm",
            vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Integer(*x),
                Object::Integer(*y),
            ],
        ));
        operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
    }
    operations.push(Operation::new("ET", vec![]));
    operations
}

fn scan_operations() -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                Object::Integer(PAGE_WIDTH),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_HEIGHT),
                Object::Integer(0),
                Object::Integer(0),
            ],
        ),
        Operation::new("Do", vec!["Im1".into()]),
        Operation::new("Q", vec![]),
    ]
}

fn encode(operations: Vec<Operation>) -> Vec<u8> {
    Content { operations }.encode().unwrap()
}

/// A white DeviceGray image of `width` x `height` pixels.
fn add_scan_image(doc: &mut Document, width: i64, height: i64) -> ObjectId {
    let pixels = vec![255u8; (width * height) as usize];
    doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(width),
            "Height" => Object::Integer(height),
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => Object::Integer(8),
        },
        pixels,
    ))
}

/// Build a PDF with one page per entry and return its bytes.
pub fn build_pdf(pages: &[PageSpec]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids: Vec<Object> = Vec::new();
    for spec in pages {
        let (content, resources) = match spec {
            PageSpec::Text(items) => (
                encode(text_operations(items)),
                dictionary! { "Font" => dictionary! { "F1" => font_id } },
            ),
            PageSpec::Scan { width, height } => {
                let image_id = add_scan_image(&mut doc, *width, *height);
                (
                    encode(scan_operations()),
                    dictionary! { "XObject" => dictionary! { "Im1" => image_id } },
                )
            }
            PageSpec::ScanWithText {
                width,
                height,
                text,
            } => {
                let image_id = add_scan_image(&mut doc, *width, *height);
                let mut operations = scan_operations();
                operations.extend(text_operations(text));
                (
                    encode(operations),
                    dictionary! {
                        "Font" => dictionary! { "F1" => font_id },
                        "XObject" => dictionary! { "Im1" => image_id },
                    },
                )
            }
            PageSpec::Blank => (Vec::new(), dictionary! {}),
        };

        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// The text-based W-2 used by most tests.
pub fn text_w2() -> Vec<u8> {
    build_pdf(&[PageSpec::Text(vec![
        ("1 Wages, tips, other comp.", 50, 700),
        ("45000.00", 250, 700),
    ])])
}

/// OCR backend returning the same boxes for every page.
pub struct FixedOcr(pub Vec<TextBox>);

impl FixedOcr {
    pub fn shared(boxes: Vec<TextBox>) -> Arc<dyn OcrBackend> {
        Arc::new(Self(boxes))
    }
}

impl OcrBackend for FixedOcr {
    fn recognize(&self, _image: &DynamicImage) -> Result<Vec<TextBox>, OcrError> {
        Ok(self.0.clone())
    }
}
