//! Positioned text extraction
//!
//! Walks a page's content stream, tracking the text and graphics state needed
//! to place every glyph, then assembles glyphs into words (split on whitespace
//! and horizontal gaps) and words into reading-order lines for literal search.

use std::collections::HashMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object};
use tracing::warn;

use crate::error::{PdfError, Result};
use crate::fonts::{load_fonts, number, resolve, FontInfo};
use crate::geometry::{MediaBox, Rect};

/// Form XObjects nested deeper than this are ignored
const MAX_XOBJECT_DEPTH: usize = 8;

/// Horizontal gap (in em) that separates two words without a space glyph
const WORD_GAP_EM: f64 = 0.15;

/// Baseline drift (in em) tolerated within one line
const LINE_TOLERANCE_EM: f64 = 0.3;

/// A text token with its bounding box in page space
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub rect: Rect,
    pub text: String,
    /// Box of each character of `text`, in order
    char_rects: Vec<Rect>,
    baseline: f64,
    font_size: f64,
}

impl Word {
    /// Build a word with evenly spaced character boxes
    pub fn new(text: impl Into<String>, rect: Rect) -> Self {
        let text = text.into();
        let n = text.chars().count().max(1);
        let step = rect.width() / n as f64;
        let char_rects = (0..text.chars().count())
            .map(|i| {
                Rect::new(
                    rect.x0 + step * i as f64,
                    rect.y0,
                    rect.x0 + step * (i + 1) as f64,
                    rect.y1,
                )
            })
            .collect();
        Self {
            rect,
            text,
            char_rects,
            baseline: rect.y1,
            font_size: rect.height(),
        }
    }
}

/// A placed glyph in page space
#[derive(Debug, Clone)]
struct Glyph {
    text: String,
    rect: Rect,
    baseline: f64,
    font_size: f64,
}

/// A reading-order line of words, flattened for search
#[derive(Debug, Clone)]
struct SearchLine {
    chars: Vec<char>,
    rects: Vec<Option<Rect>>,
}

/// Extracted text of one page
#[derive(Debug, Clone, Default)]
pub struct TextPage {
    words: Vec<Word>,
    lines: Vec<SearchLine>,
}

impl TextPage {
    pub(crate) fn from_words(words: Vec<Word>) -> Self {
        let lines = build_search_lines(&words);
        Self { words, lines }
    }

    /// Words in content-stream order
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Find every occurrence of `needle`, returning one box per hit
    ///
    /// Matching is ASCII case-insensitive, treats runs of whitespace in the
    /// needle as a single word break, and never spans two lines. Hits come back
    /// in reading order (top to bottom, then left to right).
    pub fn search(&self, needle: &str) -> Vec<Rect> {
        let pattern: Vec<char> = needle
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if pattern.is_empty() {
            return Vec::new();
        }

        let mut hits = Vec::new();
        for line in &self.lines {
            let mut start = 0;
            while start + pattern.len() <= line.chars.len() {
                let matched = line.chars[start..start + pattern.len()]
                    .iter()
                    .zip(&pattern)
                    .all(|(a, b)| a.to_ascii_lowercase() == *b);
                if matched {
                    let rect = line.rects[start..start + pattern.len()]
                        .iter()
                        .flatten()
                        .copied()
                        .reduce(|a, b| a.union(&b));
                    if let Some(rect) = rect {
                        hits.push(rect);
                    }
                    start += pattern.len();
                } else {
                    start += 1;
                }
            }
        }
        hits
    }
}

/// Group words into lines by baseline and flatten each line into characters
fn build_search_lines(words: &[Word]) -> Vec<SearchLine> {
    let mut order: Vec<&Word> = words.iter().collect();
    order.sort_by(|a, b| a.baseline.total_cmp(&b.baseline));

    let mut groups: Vec<Vec<&Word>> = Vec::new();
    for word in order {
        let joins_last = groups.last().and_then(|g| g.first()).is_some_and(|first| {
            let tolerance = LINE_TOLERANCE_EM * first.font_size.min(word.font_size).max(1.0);
            (word.baseline - first.baseline).abs() <= tolerance
        });
        if joins_last {
            if let Some(group) = groups.last_mut() {
                group.push(word);
                continue;
            }
        }
        groups.push(vec![word]);
    }

    groups
        .into_iter()
        .map(|mut group| {
            group.sort_by(|a, b| a.rect.x0.total_cmp(&b.rect.x0));
            let mut chars = Vec::new();
            let mut rects = Vec::new();
            for (i, word) in group.iter().enumerate() {
                if i > 0 {
                    chars.push(' ');
                    rects.push(None);
                }
                for (c, r) in word.text.chars().zip(&word.char_rects) {
                    chars.push(c);
                    rects.push(Some(*r));
                }
            }
            SearchLine { chars, rects }
        })
        .collect()
}

/// Affine matrix `[a b c d e f]` in PDF row-vector convention
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f64; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translate(tx: f64, ty: f64) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self × other`
    fn then(&self, other: &Matrix) -> Matrix {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a1 * a2 + b1 * c2,
            a1 * b2 + b1 * d2,
            c1 * a2 + d1 * c2,
            c1 * b2 + d1 * d2,
            e1 * a2 + f1 * c2 + e2,
            e1 * b2 + f1 * d2 + f2,
        ])
    }

    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }

    /// Length of the transformed unit y vector
    fn vertical_scale(&self) -> f64 {
        let [_, _, c, d, _, _] = self.0;
        (c * c + d * d).sqrt()
    }

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        if operands.len() < 6 {
            return None;
        }
        let mut m = [0.0; 6];
        for (slot, obj) in m.iter_mut().zip(operands) {
            *slot = number(obj)?;
        }
        Some(Matrix(m))
    }
}

/// Graphics and text state saved by `q` and restored by `Q`
#[derive(Debug, Clone)]
struct State {
    ctm: Matrix,
    font: Option<Vec<u8>>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    horizontal_scale: f64,
    leading: f64,
    rise: f64,
}

impl Default for State {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            font: None,
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

struct Interpreter<'a> {
    doc: &'a Document,
    media_box: MediaBox,
    glyphs: Vec<Glyph>,
}

impl<'a> Interpreter<'a> {
    fn run(
        &mut self,
        content: &[u8],
        resources: &Dictionary,
        base: State,
        depth: usize,
    ) -> Result<()> {
        let content = Content::decode(content).map_err(|e| PdfError::Parse(e.to_string()))?;
        let fonts = load_fonts(self.doc, resources);
        let fallback_font = FontInfo::default();

        let mut state = base;
        let mut stack: Vec<State> = Vec::new();
        let mut tm = Matrix::IDENTITY;
        let mut tlm = Matrix::IDENTITY;

        for op in &content.operations {
            let operands = &op.operands;
            let num = |i: usize| operands.get(i).and_then(number);
            match op.operator.as_str() {
                "q" => stack.push(state.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        state = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        state.ctm = m.then(&state.ctm);
                    }
                }
                "BT" => {
                    tm = Matrix::IDENTITY;
                    tlm = Matrix::IDENTITY;
                }
                "Tf" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        state.font = Some(name.clone());
                    }
                    if let Some(size) = num(1) {
                        state.font_size = size;
                    }
                }
                "Tc" => state.char_spacing = num(0).unwrap_or(0.0),
                "Tw" => state.word_spacing = num(0).unwrap_or(0.0),
                "Tz" => state.horizontal_scale = num(0).unwrap_or(100.0) / 100.0,
                "TL" => state.leading = num(0).unwrap_or(0.0),
                "Ts" => state.rise = num(0).unwrap_or(0.0),
                "Td" | "TD" => {
                    let (tx, ty) = (num(0).unwrap_or(0.0), num(1).unwrap_or(0.0));
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    tlm = Matrix::translate(tx, ty).then(&tlm);
                    tm = tlm;
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        tlm = m;
                        tm = m;
                    }
                }
                "T*" => {
                    tlm = Matrix::translate(0.0, -state.leading).then(&tlm);
                    tm = tlm;
                }
                "Tj" | "'" | "\"" => {
                    if op.operator != "Tj" {
                        if op.operator == "\"" {
                            state.word_spacing = num(0).unwrap_or(state.word_spacing);
                            state.char_spacing = num(1).unwrap_or(state.char_spacing);
                        }
                        tlm = Matrix::translate(0.0, -state.leading).then(&tlm);
                        tm = tlm;
                    }
                    let idx = if op.operator == "\"" { 2 } else { 0 };
                    if let Some(Object::String(bytes, _)) = operands.get(idx) {
                        let font = lookup_font(&fonts, &state, &fallback_font);
                        self.show(bytes, font, &state, &mut tm);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        let font = lookup_font(&fonts, &state, &fallback_font);
                        for item in items {
                            match item {
                                Object::String(bytes, _) => self.show(bytes, font, &state, &mut tm),
                                other => {
                                    if let Some(adjust) = number(other) {
                                        let tx = -adjust / 1000.0
                                            * state.font_size
                                            * state.horizontal_scale;
                                        tm = Matrix::translate(tx, 0.0).then(&tm);
                                    }
                                }
                            }
                        }
                    }
                }
                "Do" => {
                    if depth >= MAX_XOBJECT_DEPTH {
                        continue;
                    }
                    if let Some(Object::Name(name)) = operands.first() {
                        self.run_form_xobject(name, resources, &state, depth)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn run_form_xobject(
        &mut self,
        name: &[u8],
        resources: &Dictionary,
        state: &State,
        depth: usize,
    ) -> Result<()> {
        let doc = self.doc;
        let Some(stream) = resources
            .get(b"XObject")
            .ok()
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok())
            .and_then(|xobjects| xobjects.get(name).ok())
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_stream().ok())
        else {
            return Ok(());
        };
        let is_form = matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Form");
        if !is_form {
            return Ok(());
        }

        let bytes = decode_stream(stream)?;
        let form_resources = stream
            .dict
            .get(b"Resources")
            .ok()
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok())
            .unwrap_or(resources);

        let mut inner = state.clone();
        if let Some(m) = stream
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|o| o.as_array().ok())
            .and_then(|arr| Matrix::from_operands(arr))
        {
            inner.ctm = m.then(&state.ctm);
        }
        self.run(&bytes, form_resources, inner, depth + 1)
    }

    /// Place the glyphs of one show-string and advance the text matrix
    fn show(&mut self, bytes: &[u8], font: &FontInfo, state: &State, tm: &mut Matrix) {
        let size = state.font_size;
        let hscale = state.horizontal_scale;
        for ch in font.decode(bytes) {
            let trm = tm.then(&state.ctm);
            let advance = ch.width / 1000.0 * size;

            let corners = [
                trm.apply(0.0, state.rise + font.descent * size),
                trm.apply(advance * hscale, state.rise + font.descent * size),
                trm.apply(0.0, state.rise + font.ascent * size),
                trm.apply(advance * hscale, state.rise + font.ascent * size),
            ];
            let points: Vec<_> = corners
                .iter()
                .map(|&(x, y)| self.media_box.to_page(x, y))
                .collect();
            let rect = points
                .iter()
                .skip(1)
                .fold(Rect::new(points[0].x, points[0].y, points[0].x, points[0].y), |r, p| {
                    r.union(&Rect::new(p.x, p.y, p.x, p.y))
                });
            let (_, base_y) = trm.apply(0.0, state.rise);
            let baseline = self.media_box.to_page(0.0, base_y).y;

            if !ch.text.is_empty() {
                self.glyphs.push(Glyph {
                    text: ch.text,
                    rect,
                    baseline,
                    font_size: size * trm.vertical_scale().max(f64::EPSILON),
                });
            }

            let mut tx = advance + state.char_spacing;
            if ch.is_space_code {
                tx += state.word_spacing;
            }
            *tm = Matrix::translate(tx * hscale, 0.0).then(tm);
        }
    }
}

fn lookup_font<'f>(
    fonts: &'f HashMap<Vec<u8>, FontInfo>,
    state: &State,
    fallback: &'f FontInfo,
) -> &'f FontInfo {
    state
        .font
        .as_ref()
        .and_then(|name| fonts.get(name))
        .unwrap_or(fallback)
}

pub(crate) fn decode_stream(stream: &lopdf::Stream) -> Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| PdfError::Parse(format!("failed to decompress content stream: {e}")))
    } else {
        Ok(stream.content.clone())
    }
}

/// Run the content stream and return the placed glyphs grouped into words
pub(crate) fn extract_words(
    doc: &Document,
    content: &[u8],
    resources: &Dictionary,
    media_box: MediaBox,
) -> Result<Vec<Word>> {
    let mut interpreter = Interpreter {
        doc,
        media_box,
        glyphs: Vec::new(),
    };
    if let Err(e) = interpreter.run(content, resources, State::default(), 0) {
        warn!(error = %e, "content stream could not be fully interpreted");
        if interpreter.glyphs.is_empty() {
            return Err(e);
        }
    }
    Ok(assemble_words(interpreter.glyphs))
}

/// Join glyphs into words, breaking on whitespace, gaps and line changes
fn assemble_words(glyphs: Vec<Glyph>) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current: Option<Word> = None;

    for glyph in glyphs {
        if glyph.text.chars().all(char::is_whitespace) {
            words.extend(current.take());
            continue;
        }

        if let Some(word) = current.as_ref() {
            let em = word.font_size.min(glyph.font_size).max(1.0);
            let last = word.char_rects.last().copied().unwrap_or(word.rect);
            let same_line = (glyph.baseline - word.baseline).abs() <= LINE_TOLERANCE_EM * em;
            let gap = glyph.rect.x0 - last.x1;
            if !same_line || gap > WORD_GAP_EM * em || gap < -0.5 * em {
                words.extend(current.take());
            }
        }

        match current.as_mut() {
            Some(word) => {
                word.rect = word.rect.union(&glyph.rect);
                for _ in glyph.text.chars() {
                    word.char_rects.push(glyph.rect);
                }
                word.text.push_str(&glyph.text);
            }
            None => {
                current = Some(Word {
                    rect: glyph.rect,
                    char_rects: glyph.text.chars().map(|_| glyph.rect).collect(),
                    text: glyph.text,
                    baseline: glyph.baseline,
                    font_size: glyph.font_size,
                });
            }
        }
    }
    words.extend(current);
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn helvetica_resources() -> Dictionary {
        dictionary! {
            "Font" => dictionary! {
                "F1" => dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => "Helvetica",
                },
            },
        }
    }

    fn words_of(content: &[u8]) -> Vec<Word> {
        let doc = Document::with_version("1.5");
        extract_words(&doc, content, &helvetica_resources(), MediaBox::LETTER).unwrap()
    }

    #[test]
    fn test_words_split_on_spaces() {
        let words = words_of(b"BT /F1 12 Tf 1 0 0 1 72 700 Tm (Yes  No) Tj ET");
        let texts: Vec<_> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["Yes", "No"]);
    }

    #[test]
    fn test_word_box_in_page_space() {
        let words = words_of(b"BT /F1 10 Tf 100 692 Td (Yes) Tj ET");
        let yes = &words[0];
        // Baseline at 792 - 692 = 100, ascent 0.8em, descent 0.2em
        assert!((yes.rect.y0 - 92.0).abs() < 1e-6);
        assert!((yes.rect.y1 - 102.0).abs() < 1e-6);
        assert!((yes.rect.x0 - 100.0).abs() < 1e-6);
        // Y 667 + e 556 + s 500 = 1723 units
        assert!((yes.rect.x1 - 117.23).abs() < 1e-6);
    }

    #[test]
    fn test_tj_gap_breaks_words() {
        let words = words_of(b"BT /F1 12 Tf 72 700 Td [(Yes) -3000 (No)] TJ ET");
        assert_eq!(words.len(), 2);
        assert_eq!(words[1].text, "No");
        assert!(words[1].rect.x0 - words[0].rect.x1 > 30.0);
    }

    #[test]
    fn test_kerning_does_not_break_words() {
        let words = words_of(b"BT /F1 12 Tf 72 700 Td [(Si) 20 (gnature)] TJ ET");
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].text, "Signature");
    }

    #[test]
    fn test_cm_scales_text() {
        let words = words_of(b"q 2 0 0 2 0 0 cm BT /F1 10 Tf 50 300 Td (No) Tj ET Q");
        let no = &words[0];
        assert!((no.rect.x0 - 100.0).abs() < 1e-6);
        assert!((no.rect.height() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_search_phrase_across_words() {
        let words = words_of(
            b"BT /F1 12 Tf 72 700 Td (Indoor Environmental Quality) Tj ET \
              BT /F1 12 Tf 72 650 Td (Notes:) Tj ET",
        );
        let page = TextPage::from_words(words);
        let hits = page.search("Indoor Environmental Quality");
        assert_eq!(hits.len(), 1);
        assert!((hits[0].x0 - 72.0).abs() < 1e-6);
        assert!(hits[0].width() > 100.0);
        assert_eq!(page.search("notes:").len(), 1);
        assert!(page.search("Indoor Quality").is_empty());
    }

    #[test]
    fn test_search_substring_inside_word() {
        let page = TextPage::from_words(words_of(
            b"BT /F1 12 Tf 72 700 Td (Signed \\(Date\\) today) Tj ET",
        ));
        let hits = page.search("Date");
        assert_eq!(hits.len(), 1);
        let paren = page.search("(Date)");
        assert_eq!(paren.len(), 1);
        assert!(paren[0].x0 < hits[0].x0);
    }

    #[test]
    fn test_search_reading_order() {
        // Drawn bottom line first
        let page = TextPage::from_words(words_of(
            b"BT /F1 12 Tf 72 100 Td (Date) Tj ET BT /F1 12 Tf 72 600 Td (Date) Tj ET",
        ));
        let hits = page.search("date");
        assert_eq!(hits.len(), 2);
        assert!(hits[0].y0 < hits[1].y0);
    }

    #[test]
    fn test_word_new_even_char_boxes() {
        let word = Word::new("Yes", Rect::new(100.0, 200.0, 130.0, 212.0));
        let page = TextPage::from_words(vec![word]);
        let hit = page.search("es");
        assert_eq!(hit, vec![Rect::new(110.0, 200.0, 130.0, 212.0)]);
    }
}
