//! dvc-pdf: PDF access for checklist annotation
//!
//! Loads a PDF, exposes the words of each page with their boxes, searches for
//! literal text, and queues red-pen style drawing (lines and Helvetica text)
//! that is written back into the page content on save.
//!
//! All coordinates use a top-left origin with y growing downward.

pub mod document;
mod encoding;
pub mod error;
mod fonts;
pub mod geometry;
pub mod metrics;
pub mod overlay;
pub mod text;

pub use document::PdfDocument;
pub use error::{PdfError, Result};
pub use geometry::{MediaBox, Point, Rect, Rgb};
pub use metrics::text_width;
pub use overlay::{OverlayItem, TextStyle};
pub use text::{TextPage, Word};
