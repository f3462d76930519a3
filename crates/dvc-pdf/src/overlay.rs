//! Drawing overlay for a page
//!
//! Lines and text are queued per page in page space and encoded into a single
//! content stream when the document is saved.

use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};
use serde::{Deserialize, Serialize};

use crate::error::{PdfError, Result};
use crate::geometry::{MediaBox, Point, Rgb};

/// Resource name under which the overlay font is registered on a page
pub(crate) const OVERLAY_FONT: &str = "DvcHelv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_size: f64,
    pub color: Rgb,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 11.0,
            color: Rgb::BLACK,
        }
    }
}

impl TextStyle {
    pub fn new(font_size: f64, color: Rgb) -> Self {
        Self { font_size, color }
    }
}

/// One queued drawing operation
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayItem {
    Line {
        from: Point,
        to: Point,
        color: Rgb,
        width: f64,
    },
    /// `origin` is the left end of the text baseline
    Text {
        origin: Point,
        text: String,
        style: TextStyle,
    },
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

fn color_operands(color: Rgb) -> Vec<Object> {
    vec![real(color.0), real(color.1), real(color.2)]
}

/// Encode `text` for a Helvetica font with WinAnsiEncoding
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u8,
            _ => b'?',
        })
        .collect()
}

/// Build the content stream for a page's overlay
pub(crate) fn encode_overlay(items: &[OverlayItem], media_box: MediaBox) -> Result<Vec<u8>> {
    let mut ops = Vec::new();
    for item in items {
        ops.push(Operation::new("q", vec![]));
        match item {
            OverlayItem::Line {
                from,
                to,
                color,
                width,
            } => {
                let (x1, y1) = media_box.to_pdf(*from);
                let (x2, y2) = media_box.to_pdf(*to);
                ops.push(Operation::new("RG", color_operands(*color)));
                ops.push(Operation::new("w", vec![real(*width)]));
                ops.push(Operation::new("J", vec![Object::Integer(1)]));
                ops.push(Operation::new("m", vec![real(x1), real(y1)]));
                ops.push(Operation::new("l", vec![real(x2), real(y2)]));
                ops.push(Operation::new("S", vec![]));
            }
            OverlayItem::Text {
                origin,
                text,
                style,
            } => {
                let (x, y) = media_box.to_pdf(*origin);
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new(
                    "Tf",
                    vec![
                        Object::Name(OVERLAY_FONT.as_bytes().to_vec()),
                        real(style.font_size),
                    ],
                ));
                ops.push(Operation::new("rg", color_operands(style.color)));
                ops.push(Operation::new("Td", vec![real(x), real(y)]));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(
                        encode_win_ansi(text),
                        StringFormat::Hexadecimal,
                    )],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
        }
        ops.push(Operation::new("Q", vec![]));
    }

    Content { operations: ops }
        .encode()
        .map_err(|e| PdfError::Serialization(e.to_string()))
}
