//! Signature Filler
//!
//! Finds the page carrying the verifier's attestation, fills the "(Name)" and
//! "(Date)" blanks of its paragraph, and writes the signer's name and the date
//! after the Signature/Date label pair.

use dvc_pdf::{text_width, PdfDocument, Point, Rect, TextStyle};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SignatureConfig;
use crate::error::Result;

/// Who signs and the date written next to the signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerInfo {
    pub name: String,
    pub date: String,
}

impl SignerInfo {
    pub fn new(name: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            date: date.into(),
        }
    }
}

/// What the Signature Filler wrote, for logging and tests
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureOutcome {
    pub page: usize,
    /// Blank the name was written before
    pub name_blank: Option<Rect>,
    /// Blank the paragraph date was written before
    pub date_blank: Option<Rect>,
    /// Signature and Date labels that received the name and date
    pub labels: Option<(Rect, Rect)>,
}

fn center_gap(a: &Rect, b: &Rect) -> f64 {
    (a.mid_y() - b.mid_y()).abs()
}

/// Rendered width of `text` in Helvetica, or an average-glyph estimate
pub fn estimate_width(text: &str, font_size: f64) -> f64 {
    text_width(text, font_size).unwrap_or(text.chars().count() as f64 * font_size * 0.5)
}

/// Pick the page to sign
///
/// In order of preference: the first page with the attestation phrase; the
/// page holding the closest Signature/Date label pair; the second-to-last page.
pub fn find_signature_page(doc: &PdfDocument, cfg: &SignatureConfig) -> Result<usize> {
    for page in 0..doc.page_count() {
        if !doc.search_for(page, &cfg.anchor_phrase)?.is_empty() {
            debug!(page, "signature page found by attestation phrase");
            return Ok(page);
        }
    }

    let mut best: Option<(usize, f64)> = None;
    for page in 0..doc.page_count() {
        let sigs = doc.search_for(page, &cfg.signature_label)?;
        let dates = doc.search_for(page, &cfg.date_label)?;
        for s in &sigs {
            for d in &dates {
                let gap = center_gap(s, d);
                if best.map_or(true, |(_, g)| gap < g) {
                    best = Some((page, gap));
                }
            }
        }
    }
    if let Some((page, gap)) = best {
        debug!(page, gap, "signature page found by label pair");
        return Ok(page);
    }

    let page = doc.page_count().saturating_sub(2);
    debug!(page, "signature page defaulted to second-to-last");
    Ok(page)
}

/// Pair a Signature label with a Date label by vertical proximity
///
/// The closest pair within `tolerance` wins. When none is that close but both
/// kinds exist, the topmost Signature is paired with its nearest Date anyway.
pub fn pair_labels(sigs: &[Rect], dates: &[Rect], tolerance: f64) -> Option<(Rect, Rect)> {
    let mut best: Option<(Rect, Rect, f64)> = None;
    for s in sigs {
        for d in dates {
            let gap = center_gap(s, d);
            if gap <= tolerance && best.map_or(true, |(_, _, g)| gap < g) {
                best = Some((*s, *d, gap));
            }
        }
    }
    if let Some((s, d, _)) = best {
        return Some((s, d));
    }

    let s = sigs.iter().min_by(|a, b| a.y0.total_cmp(&b.y0))?;
    let d = dates
        .iter()
        .min_by(|a, b| center_gap(a, s).total_cmp(&center_gap(b, s)))?;
    debug!(gap = center_gap(s, d), tolerance, "pairing signature labels beyond tolerance");
    Some((*s, *d))
}

/// Fill the paragraph blanks and the Signature/Date labels on the signing page
pub fn fill_signature_section(
    doc: &mut PdfDocument,
    signer: &SignerInfo,
    cfg: &SignatureConfig,
) -> Result<Option<SignatureOutcome>> {
    if doc.page_count() == 0 {
        return Ok(None);
    }
    let page = find_signature_page(doc, cfg)?;

    let name_blanks = doc.search_for(page, &cfg.name_token)?;
    let date_blanks = doc.search_for(page, &cfg.date_token)?;
    let sigs = doc.search_for(page, &cfg.signature_label)?;
    let dates = doc.search_for(page, &cfg.date_label)?;

    let paragraph_style = TextStyle::new(cfg.paragraph_font_size, cfg.color);
    let name_blank = name_blanks.first().copied();
    if let Some(blank) = name_blank {
        fill_blank(doc, page, &blank, &signer.name, &paragraph_style, cfg)?;
    }

    let date_blank = name_blank
        .and_then(|name| {
            date_blanks
                .iter()
                .find(|d| d.y0 >= name.y0 - cfg.date_token_slack)
        })
        .or_else(|| date_blanks.first())
        .copied();
    if let Some(blank) = date_blank {
        fill_blank(
            doc,
            page,
            &blank,
            &cfg.paragraph_date_text,
            &paragraph_style,
            cfg,
        )?;
    }

    let labels = pair_labels(&sigs, &dates, cfg.pair_tolerance);
    if let Some((sig, date)) = labels {
        doc.insert_text(
            page,
            Point::new(sig.x1 + cfg.label_gap, sig.y1 - cfg.baseline_lift),
            &signer.name,
            &TextStyle::new(cfg.signature_font_size, cfg.color),
        )?;
        doc.insert_text(
            page,
            Point::new(date.x1 + cfg.label_gap, date.y1 - cfg.baseline_lift),
            &signer.date,
            &TextStyle::new(cfg.date_font_size, cfg.color),
        )?;
    } else {
        debug!(page, "no Signature/Date labels to fill");
    }

    Ok(Some(SignatureOutcome {
        page,
        name_blank,
        date_blank,
        labels,
    }))
}

/// Write `text` so that it ends just before `blank`
fn fill_blank(
    doc: &mut PdfDocument,
    page: usize,
    blank: &Rect,
    text: &str,
    style: &TextStyle,
    cfg: &SignatureConfig,
) -> Result<()> {
    let width = estimate_width(text, style.font_size);
    let origin = Point::new(
        blank.x0 - cfg.paragraph_gap - width,
        blank.y1 - cfg.baseline_lift,
    );
    doc.insert_text(page, origin, text, style)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn label(x0: f64, y0: f64) -> Rect {
        Rect::new(x0, y0, x0 + 40.0, y0 + 12.0)
    }

    #[test]
    fn test_estimate_width_uses_metrics() {
        assert!((estimate_width("NA", 11.0) - 15.279).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_width_measures_latin1() {
        assert!((estimate_width("Jos\u{e9}", 10.0) - 21.12).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_width_falls_back_per_char() {
        // Three characters at half the font size each
        assert_eq!(estimate_width("\u{738B}\u{5C0F}\u{660E}", 10.0), 15.0);
    }

    #[test]
    fn test_pair_within_tolerance_prefers_closest() {
        let sigs = vec![label(72.0, 600.0), label(72.0, 700.0)];
        let dates = vec![label(400.0, 690.0), label(400.0, 640.0)];
        assert_eq!(
            pair_labels(&sigs, &dates, 60.0),
            Some((label(72.0, 700.0), label(400.0, 690.0)))
        );
    }

    #[test]
    fn test_pair_beyond_tolerance_falls_back() {
        let sigs = vec![label(72.0, 600.0)];
        let dates = vec![label(72.0, 680.0)];
        assert_eq!(
            pair_labels(&sigs, &dates, 60.0),
            Some((label(72.0, 600.0), label(72.0, 680.0)))
        );
    }

    #[test]
    fn test_fallback_uses_topmost_signature() {
        let sigs = vec![label(72.0, 700.0), label(72.0, 300.0)];
        let dates = vec![label(300.0, 100.0), label(300.0, 500.0)];
        assert_eq!(
            pair_labels(&sigs, &dates, 60.0),
            Some((label(72.0, 300.0), label(300.0, 100.0)))
        );
    }

    #[test]
    fn test_pair_needs_both_kinds() {
        assert_eq!(pair_labels(&[label(72.0, 600.0)], &[], 60.0), None);
        assert_eq!(pair_labels(&[], &[label(72.0, 600.0)], 60.0), None);
    }

    #[test]
    fn test_tolerance_is_inclusive() {
        let sigs = vec![label(72.0, 600.0), label(72.0, 100.0)];
        let dates = vec![label(300.0, 660.0)];
        // Exactly 60 apart: accepted, so the topmost-signature fallback is not used
        assert_eq!(
            pair_labels(&sigs, &dates, 60.0),
            Some((label(72.0, 600.0), label(300.0, 660.0)))
        );
    }
}
