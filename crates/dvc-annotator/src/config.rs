//! Tuning constants for the annotation heuristics
//!
//! Every offset, tolerance and jitter range used by the stages lives here. The
//! defaults reproduce the values tuned for the ENERGY STAR DVC template; a TOML
//! file can override any subset of them.
//!
//! ```toml
//! [checkbox]
//! x_offset = 8.0
//!
//! [signature]
//! pair_tolerance = 80.0
//! ```

use std::fs;
use std::path::Path;

use dvc_pdf::Rgb;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{AnnotateError, Result};

/// Complete annotator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    pub checkbox: CheckboxConfig,
    pub notes: NotesConfig,
    pub signature: SignatureConfig,
}

impl AnnotatorConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed, or
    /// a value fails [`AnnotatorConfig::validate`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AnnotateError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AnnotateError::Config(format!("failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that ranges and sizes are usable
    pub fn validate(&self) -> Result<()> {
        self.validate_finite()?;

        let cb = &self.checkbox;
        if cb.min_no_gap > cb.max_no_gap {
            return Err(AnnotateError::Config(format!(
                "checkbox.min_no_gap ({}) exceeds checkbox.max_no_gap ({})",
                cb.min_no_gap, cb.max_no_gap
            )));
        }
        if cb.line_granularity <= 0.0 {
            return Err(AnnotateError::Config(
                "checkbox.line_granularity must be positive".to_string(),
            ));
        }
        for (name, jitter) in [
            ("checkbox.x_jitter", cb.x_jitter),
            ("checkbox.y_jitter", cb.y_jitter),
            ("checkbox.size_jitter", cb.size_jitter),
            ("checkbox.width_jitter", cb.width_jitter),
        ] {
            if jitter.low > jitter.high {
                return Err(AnnotateError::Config(format!(
                    "{name}: low ({}) exceeds high ({})",
                    jitter.low, jitter.high
                )));
            }
        }

        let sig = &self.signature;
        for (name, size) in [
            ("notes.font_size", self.notes.font_size),
            ("signature.paragraph_font_size", sig.paragraph_font_size),
            ("signature.signature_font_size", sig.signature_font_size),
            ("signature.date_font_size", sig.date_font_size),
        ] {
            if size <= 0.0 {
                return Err(AnnotateError::Config(format!("{name} must be positive")));
            }
        }
        Ok(())
    }

    /// TOML accepts `nan` and `inf`, which no setting can use
    fn validate_finite(&self) -> Result<()> {
        let cb = &self.checkbox;
        let notes = &self.notes;
        let sig = &self.signature;
        let mut values = vec![
            ("checkbox.line_granularity", cb.line_granularity),
            ("checkbox.min_no_gap", cb.min_no_gap),
            ("checkbox.max_no_gap", cb.max_no_gap),
            ("checkbox.left_neighbor_gap", cb.left_neighbor_gap),
            ("checkbox.boundary_margin", cb.boundary_margin),
            ("checkbox.x_offset", cb.x_offset),
            ("checkbox.size", cb.size),
            ("checkbox.min_size", cb.min_size),
            ("checkbox.line_width", cb.line_width),
            ("checkbox.min_line_width", cb.min_line_width),
            ("notes.offset_x", notes.offset_x),
            ("notes.offset_y", notes.offset_y),
            ("notes.font_size", notes.font_size),
            ("signature.paragraph_font_size", sig.paragraph_font_size),
            ("signature.paragraph_gap", sig.paragraph_gap),
            ("signature.date_token_slack", sig.date_token_slack),
            ("signature.pair_tolerance", sig.pair_tolerance),
            ("signature.label_gap", sig.label_gap),
            ("signature.baseline_lift", sig.baseline_lift),
            ("signature.signature_font_size", sig.signature_font_size),
            ("signature.date_font_size", sig.date_font_size),
        ];
        for (name, jitter) in [
            ("checkbox.x_jitter", cb.x_jitter),
            ("checkbox.y_jitter", cb.y_jitter),
            ("checkbox.size_jitter", cb.size_jitter),
            ("checkbox.width_jitter", cb.width_jitter),
        ] {
            values.push((name, jitter.low));
            values.push((name, jitter.high));
        }
        for (name, color) in [
            ("checkbox.color", cb.color),
            ("notes.color", notes.color),
            ("signature.color", sig.color),
        ] {
            values.extend([(name, color.0), (name, color.1), (name, color.2)]);
        }

        match values.into_iter().find(|(_, value)| !value.is_finite()) {
            Some((name, value)) => Err(AnnotateError::Config(format!(
                "{name} must be a finite number, got {value}"
            ))),
            None => Ok(()),
        }
    }
}

/// A closed interval of uniform noise added to a base value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Jitter {
    pub low: f64,
    pub high: f64,
}

impl Jitter {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Draw one sample from `[low, high]`
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        // Also covers NaN bounds, which compare false
        if !(self.low.is_finite() && self.high.is_finite() && self.high > self.low) {
            return self.low;
        }
        rng.gen_range(self.low..=self.high)
    }
}

/// Checkbox Marker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckboxConfig {
    pub yes_label: String,
    pub no_label: String,
    /// Rounding step for grouping words into lines by vertical midpoint
    pub line_granularity: f64,
    /// Accepted gap between the Yes word and its paired No word
    pub min_no_gap: f64,
    pub max_no_gap: f64,
    /// Left neighbour closer than this is checked for numeric qualifiers
    pub left_neighbor_gap: f64,
    /// Yes words must start this far above the IEQ heading's top
    pub boundary_margin: f64,
    /// Distance from the Yes word's left edge to the mark centre
    pub x_offset: f64,
    pub x_jitter: Jitter,
    pub y_jitter: Jitter,
    pub size: f64,
    pub size_jitter: Jitter,
    pub min_size: f64,
    pub line_width: f64,
    pub width_jitter: Jitter,
    pub min_line_width: f64,
    pub color: Rgb,
}

impl Default for CheckboxConfig {
    fn default() -> Self {
        Self {
            yes_label: "Yes".to_string(),
            no_label: "No".to_string(),
            line_granularity: 0.5,
            min_no_gap: 30.0,
            max_no_gap: 250.0,
            left_neighbor_gap: 25.0,
            boundary_margin: 2.0,
            x_offset: 9.0,
            x_jitter: Jitter::new(-1.5, 1.5),
            y_jitter: Jitter::new(-1.2, 1.2),
            size: 10.0,
            size_jitter: Jitter::new(-1.0, 1.2),
            min_size: 7.5,
            line_width: 1.2,
            width_jitter: Jitter::new(-0.2, 0.25),
            min_line_width: 0.9,
            color: Rgb::RED,
        }
    }
}

/// Notes Filler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesConfig {
    pub label: String,
    pub text: String,
    /// Text origin relative to the label's bottom-right corner
    pub offset_x: f64,
    pub offset_y: f64,
    pub font_size: f64,
    pub color: Rgb,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            label: "Notes:".to_string(),
            text: "NA".to_string(),
            offset_x: 10.0,
            offset_y: 8.0,
            font_size: 11.0,
            color: Rgb::RED,
        }
    }
}

/// Signature Filler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    /// Phrase that identifies the signature page outright
    pub anchor_phrase: String,
    pub signature_label: String,
    pub date_label: String,
    pub name_token: String,
    pub date_token: String,
    /// Written into the paragraph "(Date)" blank
    pub paragraph_date_text: String,
    pub paragraph_font_size: f64,
    /// Space left between filled text and the blank it precedes
    pub paragraph_gap: f64,
    /// "(Date)" blanks starting more than this above "(Name)" are skipped
    pub date_token_slack: f64,
    /// Maximum vertical-centre distance for a Signature/Date label pair
    pub pair_tolerance: f64,
    /// Space between a label and the text written after it
    pub label_gap: f64,
    /// Filled text baselines sit this far above the anchor's bottom edge
    pub baseline_lift: f64,
    pub signature_font_size: f64,
    pub date_font_size: f64,
    pub color: Rgb,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            anchor_phrase: "Signature & Stamp of Verifying Licensed Professional".to_string(),
            signature_label: "Signature".to_string(),
            date_label: "Date".to_string(),
            name_token: "(Name)".to_string(),
            date_token: "(Date)".to_string(),
            paragraph_date_text: "NA".to_string(),
            paragraph_font_size: 11.0,
            paragraph_gap: 6.0,
            date_token_slack: 5.0,
            pair_tolerance: 60.0,
            label_gap: 12.0,
            baseline_lift: 2.0,
            signature_font_size: 16.0,
            date_font_size: 12.0,
            color: Rgb::RED,
        }
    }
}
