//! Font resolution for positioned text extraction
//!
//! Only what layout needs: how a show-string splits into character codes, the
//! advance width of each code, the vertical extent of glyphs, and how codes map
//! to Unicode.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object};
use tracing::debug;

use crate::encoding::SimpleEncoding;
use crate::metrics::helvetica_char_width;

const DEFAULT_ASCENT: f64 = 0.8;
const DEFAULT_DESCENT: f64 = -0.2;
const DEFAULT_GLYPH_WIDTH: f64 = 500.0;

/// Layout-relevant facts about one font resource
#[derive(Debug, Clone)]
pub(crate) struct FontInfo {
    /// Type0 fonts use two-byte codes
    two_byte: bool,
    first_char: u32,
    widths: Vec<f64>,
    /// CID widths from /W, used by Type0 fonts
    cid_widths: HashMap<u32, f64>,
    default_width: f64,
    /// Ascent and descent in em units
    pub(crate) ascent: f64,
    pub(crate) descent: f64,
    to_unicode: Option<CMap>,
    /// Byte mapping of simple fonts, used when ToUnicode has no entry
    encoding: SimpleEncoding,
}

impl Default for FontInfo {
    fn default() -> Self {
        Self {
            two_byte: false,
            first_char: 0,
            widths: Vec::new(),
            cid_widths: HashMap::new(),
            default_width: 0.0,
            ascent: DEFAULT_ASCENT,
            descent: DEFAULT_DESCENT,
            to_unicode: None,
            encoding: SimpleEncoding::default(),
        }
    }
}

/// One character code of a show-string, decoded
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DecodedChar {
    pub(crate) text: String,
    /// Advance width in 1/1000 em
    pub(crate) width: f64,
    /// Single-byte code 32, which receives word spacing
    pub(crate) is_space_code: bool,
}

impl FontInfo {
    pub(crate) fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
        let mut info = FontInfo::default();

        let subtype = name_of(dict.get(b"Subtype").ok());
        info.two_byte = subtype.as_deref() == Some(b"Type0".as_slice());

        if let Some(stream_obj) = dict.get(b"ToUnicode").ok().map(|o| resolve(doc, o)) {
            if let Ok(stream) = stream_obj.as_stream() {
                let bytes = if stream.dict.get(b"Filter").is_ok() {
                    stream.decompressed_content().unwrap_or_default()
                } else {
                    stream.content.clone()
                };
                let cmap = CMap::parse(&bytes);
                if !cmap.is_empty() {
                    info.to_unicode = Some(cmap);
                }
            }
        }

        if info.two_byte {
            info.default_width = 1000.0;
            let descendant = dict
                .get(b"DescendantFonts")
                .ok()
                .map(|o| resolve(doc, o))
                .and_then(|o| o.as_array().ok())
                .and_then(|arr| arr.first())
                .map(|o| resolve(doc, o))
                .and_then(|o| o.as_dict().ok());
            if let Some(cid_font) = descendant {
                if let Some(dw) = dict_number(doc, cid_font, b"DW") {
                    info.default_width = dw;
                }
                if let Some(w) = cid_font
                    .get(b"W")
                    .ok()
                    .map(|o| resolve(doc, o))
                    .and_then(|o| o.as_array().ok())
                {
                    info.cid_widths = parse_cid_widths(doc, w);
                }
                info.apply_descriptor(doc, cid_font);
            }
        } else {
            info.encoding = SimpleEncoding::from_font(doc, dict.get(b"Encoding").ok());
            info.first_char = dict_number(doc, dict, b"FirstChar").unwrap_or(0.0) as u32;
            if let Some(widths) = dict
                .get(b"Widths")
                .ok()
                .map(|o| resolve(doc, o))
                .and_then(|o| o.as_array().ok())
            {
                info.widths = widths
                    .iter()
                    .map(|w| number(resolve(doc, w)).unwrap_or(0.0))
                    .collect();
            }
            info.apply_descriptor(doc, dict);
        }

        info
    }

    fn apply_descriptor(&mut self, doc: &Document, font: &Dictionary) {
        let Some(descriptor) = font
            .get(b"FontDescriptor")
            .ok()
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok())
        else {
            return;
        };
        if let Some(mw) = dict_number(doc, descriptor, b"MissingWidth") {
            if !self.two_byte {
                self.default_width = mw;
            }
        }
        let ascent = dict_number(doc, descriptor, b"Ascent");
        let descent = dict_number(doc, descriptor, b"Descent");
        // Some producers write zero or inverted values
        if let (Some(a), Some(d)) = (ascent, descent) {
            if a > 0.0 && d <= 0.0 && a - d > 0.0 {
                self.ascent = a / 1000.0;
                self.descent = d / 1000.0;
            }
        }
    }

    /// Split a show-string into codes with their text and advance widths
    pub(crate) fn decode(&self, bytes: &[u8]) -> Vec<DecodedChar> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|pair| {
                    let code = match pair {
                        [hi, lo] => ((*hi as u32) << 8) | *lo as u32,
                        [single] => *single as u32,
                        _ => 0,
                    };
                    let text = self
                        .to_unicode
                        .as_ref()
                        .and_then(|cmap| cmap.lookup(code))
                        .map(str::to_string)
                        .unwrap_or_default();
                    let width = self
                        .cid_widths
                        .get(&code)
                        .copied()
                        .unwrap_or(self.default_width);
                    DecodedChar {
                        text,
                        width,
                        is_space_code: false,
                    }
                })
                .collect()
        } else {
            bytes
                .iter()
                .map(|&b| {
                    let code = b as u32;
                    let text = self
                        .to_unicode
                        .as_ref()
                        .and_then(|cmap| cmap.lookup(code))
                        .unwrap_or_else(|| self.encoding.text(b))
                        .to_string();
                    let width = self.simple_width(code, &text);
                    DecodedChar {
                        text,
                        width,
                        is_space_code: b == b' ',
                    }
                })
                .collect()
        }
    }

    fn simple_width(&self, code: u32, text: &str) -> f64 {
        if let Some(idx) = code.checked_sub(self.first_char) {
            if let Some(w) = self.widths.get(idx as usize) {
                return *w;
            }
        }
        if self.default_width > 0.0 {
            return self.default_width;
        }
        // Standard 14 fonts ship without /Widths
        text.chars()
            .next()
            .and_then(helvetica_char_width)
            .map(f64::from)
            .unwrap_or(DEFAULT_GLYPH_WIDTH)
    }
}

/// Collect the fonts of a resource dictionary by resource name
pub(crate) fn load_fonts(doc: &Document, resources: &Dictionary) -> HashMap<Vec<u8>, FontInfo> {
    let mut fonts = HashMap::new();
    let Some(font_dict) = resources
        .get(b"Font")
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
    else {
        return fonts;
    };
    for (name, obj) in font_dict.iter() {
        match resolve(doc, obj).as_dict() {
            Ok(dict) => {
                fonts.insert(name.clone(), FontInfo::from_dict(doc, dict));
            }
            Err(_) => debug!(
                font = %String::from_utf8_lossy(name),
                "font resource is not a dictionary"
            ),
        }
    }
    fonts
}

/// A parsed /ToUnicode CMap (bfchar and bfrange sections)
#[derive(Debug, Clone, Default)]
pub(crate) struct CMap {
    map: HashMap<u32, String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    Keyword(String),
}

impl CMap {
    pub(crate) fn parse(data: &[u8]) -> Self {
        let tokens = tokenize(data);
        let mut map = HashMap::new();
        let mut i = 0;
        while i < tokens.len() {
            match &tokens[i] {
                Token::Keyword(k) if k == "beginbfchar" => {
                    i += 1;
                    while i + 1 < tokens.len() {
                        match (&tokens[i], &tokens[i + 1]) {
                            (Token::Hex(src), Token::Hex(dst)) => {
                                map.insert(be_code(src), utf16_be(dst));
                                i += 2;
                            }
                            _ => break,
                        }
                    }
                }
                Token::Keyword(k) if k == "beginbfrange" => {
                    i += 1;
                    while i + 2 < tokens.len() {
                        let (Token::Hex(lo), Token::Hex(hi)) = (&tokens[i], &tokens[i + 1]) else {
                            break;
                        };
                        let (lo, hi) = (be_code(lo), be_code(hi));
                        match &tokens[i + 2] {
                            Token::Hex(dst) => {
                                let base = utf16_units(dst);
                                for (offset, code) in (lo..=hi).enumerate() {
                                    let mut units = base.clone();
                                    if let Some(last) = units.last_mut() {
                                        *last = last.wrapping_add(offset as u16);
                                    }
                                    map.insert(code, String::from_utf16_lossy(&units));
                                }
                                i += 3;
                            }
                            Token::ArrayStart => {
                                let mut j = i + 3;
                                let mut code = lo;
                                while j < tokens.len() && tokens[j] != Token::ArrayEnd {
                                    if let Token::Hex(dst) = &tokens[j] {
                                        if code <= hi {
                                            map.insert(code, utf16_be(dst));
                                        }
                                        code += 1;
                                    }
                                    j += 1;
                                }
                                i = j + 1;
                            }
                            _ => break,
                        }
                    }
                }
                _ => i += 1,
            }
        }
        Self { map }
    }

    pub(crate) fn lookup(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn tokenize(data: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let b = data[i];
        match b {
            b'<' if data.get(i + 1) == Some(&b'<') => i += 2,
            b'>' if data.get(i + 1) == Some(&b'>') => i += 2,
            b'<' => {
                let end = data[i + 1..]
                    .iter()
                    .position(|&c| c == b'>')
                    .map(|p| i + 1 + p)
                    .unwrap_or(data.len());
                tokens.push(Token::Hex(decode_hex(&data[i + 1..end])));
                i = end + 1;
            }
            b'[' => {
                tokens.push(Token::ArrayStart);
                i += 1;
            }
            b']' => {
                tokens.push(Token::ArrayEnd);
                i += 1;
            }
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'(' => {
                // Literal strings only appear in the CMap header
                let mut depth = 0;
                while i < data.len() {
                    match data[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                i += 1;
            }
            c if c.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < data.len()
                    && !data[i].is_ascii_whitespace()
                    && !matches!(data[i], b'<' | b'>' | b'[' | b']' | b'(' | b'%')
                {
                    i += 1;
                }
                tokens.push(Token::Keyword(
                    String::from_utf8_lossy(&data[start..i]).into_owned(),
                ));
            }
        }
    }
    tokens
}

fn decode_hex(hex: &[u8]) -> Vec<u8> {
    let digits: Vec<u8> = hex
        .iter()
        .filter_map(|&c| (c as char).to_digit(16).map(|d| d as u8))
        .collect();
    digits
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => (hi << 4) | lo,
            [hi] => hi << 4,
            _ => 0,
        })
        .collect()
}

fn be_code(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => ((*hi as u16) << 8) | *lo as u16,
            [single] => *single as u16,
            _ => 0,
        })
        .collect()
}

fn utf16_be(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&utf16_units(bytes))
}

/// Parse a CIDFont /W array: `c [w1 w2 ...]` or `c_first c_last w`
fn parse_cid_widths(doc: &Document, w: &[Object]) -> HashMap<u32, f64> {
    let mut widths = HashMap::new();
    let mut i = 0;
    while i < w.len() {
        let Some(first) = number(resolve(doc, &w[i])) else {
            break;
        };
        match w.get(i + 1).map(|o| resolve(doc, o)) {
            Some(Object::Array(list)) => {
                for (offset, width) in list.iter().enumerate() {
                    if let Some(width) = number(resolve(doc, width)) {
                        widths.insert(first as u32 + offset as u32, width);
                    }
                }
                i += 2;
            }
            Some(last) => {
                let (Some(last), Some(width)) =
                    (number(last), w.get(i + 2).and_then(|o| number(resolve(doc, o))))
                else {
                    break;
                };
                for cid in first as u32..=last as u32 {
                    widths.insert(cid, width);
                }
                i += 3;
            }
            None => break,
        }
    }
    widths
}

/// Follow a single level of indirection
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

/// Integer or Real as f64
pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn dict_number(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<f64> {
    dict.get(key).ok().and_then(|o| number(resolve(doc, o)))
}

fn name_of(obj: Option<&Object>) -> Option<Vec<u8>> {
    match obj {
        Some(Object::Name(n)) => Some(n.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_cmap_bfchar_and_bfrange() {
        let cmap = CMap::parse(
            b"/CIDInit /ProcSet findresource begin\n\
              1 begincodespacerange <00> <FF> endcodespacerange\n\
              2 beginbfchar\n<01> <0059>\n<02> <0065>\nendbfchar\n\
              1 beginbfrange\n<10> <12> <0041>\nendbfrange\n\
              1 beginbfrange\n<20> <21> [<004E> <006F>]\nendbfrange\n",
        );
        assert_eq!(cmap.lookup(0x01), Some("Y"));
        assert_eq!(cmap.lookup(0x02), Some("e"));
        assert_eq!(cmap.lookup(0x10), Some("A"));
        assert_eq!(cmap.lookup(0x12), Some("C"));
        assert_eq!(cmap.lookup(0x20), Some("N"));
        assert_eq!(cmap.lookup(0x21), Some("o"));
        assert_eq!(cmap.lookup(0x13), None);
    }

    #[test]
    fn test_simple_font_uses_widths_array() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "FirstChar" => 65,
            "Widths" => vec![Object::Integer(600), Object::Integer(700)],
        };
        let info = FontInfo::from_dict(&doc, &font);
        let chars = info.decode(b"AB");
        assert_eq!(chars.len(), 2);
        assert_eq!(chars[0].text, "A");
        assert_eq!(chars[0].width, 600.0);
        assert_eq!(chars[1].width, 700.0);
    }

    #[test]
    fn test_standard_font_falls_back_to_helvetica_metrics() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        };
        let info = FontInfo::from_dict(&doc, &font);
        let chars = info.decode(b"No ");
        assert_eq!(chars[0].width, 722.0);
        assert_eq!(chars[1].width, 556.0);
        assert!(chars[2].is_space_code);
        assert_eq!(info.ascent, DEFAULT_ASCENT);
    }

    #[test]
    fn test_cid_widths_both_forms() {
        let doc = Document::with_version("1.5");
        let w = vec![
            Object::Integer(1),
            Object::Array(vec![Object::Integer(500), Object::Integer(600)]),
            Object::Integer(10),
            Object::Integer(12),
            Object::Integer(250),
        ];
        let widths = parse_cid_widths(&doc, &w);
        assert_eq!(widths.get(&1), Some(&500.0));
        assert_eq!(widths.get(&2), Some(&600.0));
        assert_eq!(widths.get(&11), Some(&250.0));
        assert_eq!(widths.get(&13), None);
    }

    #[test]
    fn test_simple_font_applies_differences() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "ABCDEF+Helvetica",
            "Encoding" => dictionary! {
                "Type" => "Encoding",
                "Differences" => vec![
                    Object::Integer(1),
                    Object::Name(b"Y".to_vec()),
                    Object::Name(b"e".to_vec()),
                    Object::Name(b"s".to_vec()),
                    Object::Name(b"N".to_vec()),
                    Object::Name(b"o".to_vec()),
                ],
            },
        };
        let info = FontInfo::from_dict(&doc, &font);
        let text: String = info.decode(&[1, 2, 3]).into_iter().map(|c| c.text).collect();
        assert_eq!(text, "Yes");
        let no = info.decode(&[4, 5]);
        assert_eq!(no[0].text, "N");
        assert_eq!(no[0].width, 722.0);
        assert_eq!(no[1].text, "o");
    }

    #[test]
    fn test_to_unicode_wins_over_encoding() {
        let mut doc = Document::with_version("1.5");
        let cmap_id = doc.add_object(lopdf::Stream::new(
            lopdf::Dictionary::new(),
            b"1 beginbfchar\n<41> <005A>\nendbfchar\n".to_vec(),
        ));
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "MacRomanEncoding",
            "ToUnicode" => cmap_id,
        };
        let info = FontInfo::from_dict(&doc, &font);
        let chars = info.decode(&[b'A', 0x8E]);
        assert_eq!(chars[0].text, "Z");
        assert_eq!(chars[1].text, "é");
    }
}
