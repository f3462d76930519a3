//! Fixture PDFs built with lopdf
//!
//! Text is placed by its top-left corner in page space so tests can reason in
//! the same coordinates the crate hands out. The fixture font is the standard
//! Helvetica without a FontDescriptor, so glyph boxes span 0.8 em above and
//! 0.2 em below the baseline.

#![allow(dead_code)]

use dvc_pdf::{OverlayItem, PdfDocument, Point, Rgb};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};

pub const PAGE_WIDTH: f64 = 612.0;
pub const PAGE_HEIGHT: f64 = 792.0;

/// Content of a single fixture page
#[derive(Debug, Default, Clone)]
pub struct PageSpec {
    content: String,
}

impl PageSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `text` in Helvetica so its box starts at (`x`, `top`)
    pub fn text(mut self, x: f64, top: f64, size: f64, text: &str) -> Self {
        let baseline = PAGE_HEIGHT - (top + 0.8 * size);
        self.content.push_str(&format!(
            "BT /F1 {size} Tf {x} {baseline} Td ({}) Tj ET\n",
            escape(text)
        ));
        self
    }

    /// Append raw content stream operators
    pub fn raw(mut self, ops: &str) -> Self {
        self.content.push_str(ops);
        self.content.push('\n');
        self
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// Serialize a document with one page per `PageSpec`
pub fn build_pdf(pages: Vec<PageSpec>) -> Vec<u8> {
    build_pdf_with_font(
        pages,
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        },
    )
}

/// Serialize a document whose `/F1` resource is `font`
pub fn build_pdf_with_font(pages: Vec<PageSpec>, font: Dictionary) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(font);

    let mut kids = Vec::new();
    for page in pages {
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            page.content.into_bytes(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("fixture PDF serializes");
    buffer
}

/// Text queued on a page: origin, text and font size
pub fn queued_text(doc: &PdfDocument, page: usize) -> Vec<(Point, String, f64)> {
    doc.overlay(page)
        .iter()
        .filter_map(|item| match item {
            OverlayItem::Text {
                origin,
                text,
                style,
            } => Some((*origin, text.clone(), style.font_size)),
            OverlayItem::Line { .. } => None,
        })
        .collect()
}

/// Line segments queued on a page
pub fn queued_lines(doc: &PdfDocument, page: usize) -> Vec<(Point, Point, Rgb)> {
    doc.overlay(page)
        .iter()
        .filter_map(|item| match item {
            OverlayItem::Line {
                from, to, color, ..
            } => Some((*from, *to, *color)),
            OverlayItem::Text { .. } => None,
        })
        .collect()
}

pub fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 0.01
}
