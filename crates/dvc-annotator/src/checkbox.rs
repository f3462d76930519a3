//! Checkbox Marker
//!
//! A "Yes" label only counts as a checkbox answer when it forms a label pair
//! with a "No" further along the same visual line. Qualifying labels get a red
//! X drawn just to their left, with every mark slightly perturbed so a page of
//! them does not look stamped.

use std::collections::BTreeMap;

use dvc_pdf::{PdfDocument, Point, Rect, Word};
use rand::Rng;
use tracing::debug;

use crate::config::CheckboxConfig;
use crate::error::Result;
use crate::sections::SectionMap;

/// Geometry of one X mark
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XMark {
    pub center: Point,
    /// Side of the square the two strokes span
    pub size: f64,
    pub line_width: f64,
}

impl XMark {
    /// The two diagonal strokes, top-left to bottom-right first
    pub fn strokes(&self) -> [(Point, Point); 2] {
        let h = self.size / 2.0;
        let Point { x, y } = self.center;
        [
            (Point::new(x - h, y - h), Point::new(x + h, y + h)),
            (Point::new(x - h, y + h), Point::new(x + h, y - h)),
        ]
    }
}

/// Bucket key of a word's line: vertical midpoint rounded to the granularity
///
/// Ties round to even so that midpoints falling exactly between two buckets
/// always land in the same one.
fn line_key(rect: &Rect, granularity: f64) -> i64 {
    (rect.mid_y() / granularity).round_ties_even() as i64
}

/// Group words into approximate lines, each sorted left to right
fn group_lines<'a>(words: &'a [Word], granularity: f64) -> BTreeMap<i64, Vec<&'a Word>> {
    let mut lines: BTreeMap<i64, Vec<&Word>> = BTreeMap::new();
    for word in words {
        lines
            .entry(line_key(&word.rect, granularity))
            .or_default()
            .push(word);
    }
    for line in lines.values_mut() {
        line.sort_by(|a, b| a.rect.x0.total_cmp(&b.rect.x0));
    }
    lines
}

/// Nearest "No" to the right of `yes` whose gap lies in the accepted range
fn paired_no<'a>(yes: &Rect, line: &[&'a Word], cfg: &CheckboxConfig) -> Option<&'a Word> {
    let mut best: Option<(&'a Word, f64)> = None;
    for &word in line {
        if word.text != cfg.no_label || word.rect.x0 <= yes.x1 {
            continue;
        }
        let gap = word.rect.x0 - yes.x1;
        if (cfg.min_no_gap..=cfg.max_no_gap).contains(&gap)
            && best.map_or(true, |(_, g)| gap < g)
        {
            best = Some((word, gap));
        }
    }
    best.map(|(word, _)| word)
}

/// Closest word ending at or before `yes` starts, within the neighbour gap
fn left_neighbor<'a>(yes: &Rect, line: &[&'a Word], cfg: &CheckboxConfig) -> Option<&'a Word> {
    let mut best: Option<&'a Word> = None;
    for &word in line {
        if word.rect.x1 <= yes.x0
            && yes.x0 - word.rect.x1 < cfg.left_neighbor_gap
            && best.map_or(true, |b| word.rect.x1 > b.rect.x1)
        {
            best = Some(word);
        }
    }
    best
}

fn is_numeric_qualifier(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit() || c == '%')
}

/// Boxes of the "Yes" labels on one page that should be marked
///
/// `boundary` is the page's IEQ heading, if any; labels at or below its top
/// (less the configured margin) are left alone.
pub fn find_yes_targets(
    words: &[Word],
    boundary: Option<&Rect>,
    cfg: &CheckboxConfig,
) -> Vec<Rect> {
    let mut targets = Vec::new();
    for line in group_lines(words, cfg.line_granularity).values() {
        if !line.iter().any(|w| w.text == cfg.no_label) {
            continue;
        }
        for yes in line.iter().filter(|w| w.text == cfg.yes_label) {
            let rect = yes.rect;
            if boundary.is_some_and(|b| rect.y0 >= b.y0 - cfg.boundary_margin) {
                continue;
            }
            if paired_no(&rect, line, cfg).is_none() {
                // Inline "Yes" in prose
                continue;
            }
            if left_neighbor(&rect, line, cfg).is_some_and(|w| is_numeric_qualifier(&w.text)) {
                continue;
            }
            targets.push(rect);
        }
    }
    targets
}

/// Place a jittered X to the left of a "Yes" label
pub fn plan_x_mark<R: Rng + ?Sized>(target: &Rect, cfg: &CheckboxConfig, rng: &mut R) -> XMark {
    let cx = target.x0 - (cfg.x_offset + cfg.x_jitter.sample(rng));
    let cy = target.mid_y() + cfg.y_jitter.sample(rng);
    let size = (cfg.size + cfg.size_jitter.sample(rng)).max(cfg.min_size);
    let line_width = (cfg.line_width + cfg.width_jitter.sample(rng)).max(cfg.min_line_width);
    XMark {
        center: Point::new(cx, cy),
        size,
        line_width,
    }
}

/// Draw an X next to every qualifying "Yes" label in the document
///
/// Returns the number of marks drawn. Pages without words and lines without a
/// label pair are skipped silently.
pub fn mark_yes_boxes<R: Rng + ?Sized>(
    doc: &mut PdfDocument,
    sections: &SectionMap,
    cfg: &CheckboxConfig,
    rng: &mut R,
) -> Result<usize> {
    let mut marked = 0;
    for page in 0..doc.page_count() {
        let targets = {
            let words = doc.words(page)?;
            if words.is_empty() {
                continue;
            }
            find_yes_targets(words, sections.get(&page), cfg)
        };
        debug!(page, targets = targets.len(), "checkbox targets");

        for target in &targets {
            let mark = plan_x_mark(target, cfg, rng);
            for (from, to) in mark.strokes() {
                doc.draw_line(page, from, to, cfg.color, mark.line_width)?;
            }
            marked += 1;
        }
    }
    Ok(marked)
}
