//! Page geometry in top-left page space
//!
//! Every coordinate handed out by this crate uses a top-left origin with y
//! growing downward, measured in points. Conversion to and from native PDF
//! user space (bottom-left origin) happens only at the extraction and overlay
//! boundaries.

use serde::{Deserialize, Serialize};

/// A point in top-left page space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned box `(x0, y0)`-`(x1, y1)` with `y0` the top edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Vertical midpoint
    pub fn mid_y(&self) -> f64 {
        (self.y0 + self.y1) / 2.0
    }

    /// Smallest box covering both
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// RGB color with components in 0-1 range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb(pub f64, pub f64, pub f64);

impl Rgb {
    pub const RED: Rgb = Rgb(1.0, 0.0, 0.0);
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
}

/// A page's MediaBox in native PDF user space `[x0, y0, x1, y1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl MediaBox {
    pub const LETTER: MediaBox = MediaBox {
        x0: 0.0,
        y0: 0.0,
        x1: 612.0,
        y1: 792.0,
    };

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Convert a PDF user-space point (bottom-left origin) to page space
    pub fn to_page(&self, pdf_x: f64, pdf_y: f64) -> Point {
        Point {
            x: pdf_x - self.x0,
            y: self.y1 - pdf_y,
        }
    }

    /// Convert a page-space point back to PDF user space
    pub fn to_pdf(&self, point: Point) -> (f64, f64) {
        (point.x + self.x0, self.y1 - point.y)
    }
}
