//! Simple-font encodings
//!
//! A simple font maps each byte to a glyph through a base encoding, optionally
//! patched by a `/Differences` array of glyph names. The base tables come from
//! lopdf; glyph names are resolved here.

use std::sync::OnceLock;

use lopdf::{Document, Object};
use tracing::debug;

use crate::fonts::resolve;

/// Base encodings lopdf can decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BaseEncoding {
    Standard,
    WinAnsi,
    MacRoman,
    MacExpert,
}

static STANDARD: OnceLock<Vec<String>> = OnceLock::new();
static WIN_ANSI: OnceLock<Vec<String>> = OnceLock::new();
static MAC_ROMAN: OnceLock<Vec<String>> = OnceLock::new();
static MAC_EXPERT: OnceLock<Vec<String>> = OnceLock::new();

impl BaseEncoding {
    pub(crate) fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"StandardEncoding" => Some(Self::Standard),
            b"WinAnsiEncoding" => Some(Self::WinAnsi),
            b"MacRomanEncoding" => Some(Self::MacRoman),
            b"MacExpertEncoding" => Some(Self::MacExpert),
            _ => None,
        }
    }

    fn lopdf_name(self) -> &'static str {
        match self {
            Self::Standard => "StandardEncoding",
            Self::WinAnsi => "WinAnsiEncoding",
            Self::MacRoman => "MacRomanEncoding",
            Self::MacExpert => "MacExpertEncoding",
        }
    }

    /// Text of every byte, indexed by code; unmapped codes are empty
    fn table(self) -> &'static [String] {
        let cell = match self {
            Self::Standard => &STANDARD,
            Self::WinAnsi => &WIN_ANSI,
            Self::MacRoman => &MAC_ROMAN,
            Self::MacExpert => &MAC_EXPERT,
        };
        cell.get_or_init(|| {
            (0..=u8::MAX)
                .map(|b| Document::decode_text(Some(self.lopdf_name()), &[b]))
                .collect()
        })
    }
}

/// Byte to text mapping of one simple font
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SimpleEncoding {
    table: Vec<String>,
}

impl Default for SimpleEncoding {
    fn default() -> Self {
        Self::from_base(BaseEncoding::WinAnsi)
    }
}

impl SimpleEncoding {
    pub(crate) fn from_base(base: BaseEncoding) -> Self {
        Self {
            table: base.table().to_vec(),
        }
    }

    /// Build the encoding of a font from its `/Encoding` entry
    ///
    /// Fonts without one, or naming an encoding lopdf does not know, use
    /// WinAnsi.
    pub(crate) fn from_font(doc: &Document, encoding: Option<&Object>) -> Self {
        match encoding.map(|o| resolve(doc, o)) {
            Some(Object::Name(name)) => {
                Self::from_base(BaseEncoding::from_name(name).unwrap_or(BaseEncoding::WinAnsi))
            }
            Some(Object::Dictionary(dict)) => {
                let base = dict
                    .get(b"BaseEncoding")
                    .ok()
                    .map(|o| resolve(doc, o))
                    .and_then(|o| o.as_name().ok())
                    .and_then(BaseEncoding::from_name)
                    .unwrap_or(BaseEncoding::WinAnsi);
                let mut encoding = Self::from_base(base);
                if let Some(differences) = dict
                    .get(b"Differences")
                    .ok()
                    .map(|o| resolve(doc, o))
                    .and_then(|o| o.as_array().ok())
                {
                    encoding.apply_differences(doc, differences);
                }
                encoding
            }
            _ => Self::default(),
        }
    }

    /// Patch codes from a `/Differences` array: `code /name /name ... code ...`
    fn apply_differences(&mut self, doc: &Document, differences: &[Object]) {
        let mut next_code: Option<usize> = None;
        for entry in differences {
            match resolve(doc, entry) {
                Object::Integer(code) => {
                    next_code = usize::try_from(*code).ok().filter(|&c| c < self.table.len());
                }
                Object::Name(name) => {
                    let Some(code) = next_code else { continue };
                    let name = String::from_utf8_lossy(name);
                    match glyph_text(&name) {
                        Some(text) => self.table[code] = text,
                        None => debug!(glyph = %name, code, "unknown glyph name"),
                    }
                    next_code = Some(code + 1).filter(|&c| c < self.table.len());
                }
                _ => {}
            }
        }
    }

    pub(crate) fn text(&self, code: u8) -> &str {
        self.table
            .get(code as usize)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Unicode text of a glyph name
///
/// Handles single letters, `uniXXXX` and `uXXXX` forms, ligature names joined
/// with `_`, suffixed variants such as `a.sc`, and the common names below.
pub(crate) fn glyph_text(name: &str) -> Option<String> {
    let base = match name.split_once('.') {
        Some((base, _)) if !base.is_empty() => base,
        _ => name,
    };
    if base.contains('_') {
        return base.split('_').map(glyph_text).collect();
    }

    let mut chars = base.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphabetic() {
            return Some(c.to_string());
        }
    }
    if let Some(text) = LIGATURES
        .iter()
        .find(|(glyph, _)| *glyph == base)
        .map(|(_, text)| text.to_string())
    {
        return Some(text);
    }
    if let Some(c) = GLYPH_NAMES
        .iter()
        .find(|(glyph, _)| *glyph == base)
        .map(|(_, c)| *c)
    {
        return Some(c.to_string());
    }
    if let Some(hex) = base.strip_prefix("uni") {
        return uni_name(hex);
    }
    if let Some(hex) = base.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) {
            return u32::from_str_radix(hex, 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from);
        }
    }
    None
}

/// `uniXXXX` with one or more groups of four hex digits
fn uni_name(hex: &str) -> Option<String> {
    if hex.is_empty() || hex.len() % 4 != 0 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let units: Vec<u16> = hex
        .as_bytes()
        .chunks(4)
        .filter_map(|chunk| std::str::from_utf8(chunk).ok())
        .filter_map(|group| u16::from_str_radix(group, 16).ok())
        .collect();
    String::from_utf16(&units).ok()
}

const LIGATURES: &[(&str, &str)] = &[
    ("ff", "ff"),
    ("fi", "fi"),
    ("fl", "fl"),
    ("ffi", "ffi"),
    ("ffl", "ffl"),
];

#[rustfmt::skip]
const GLYPH_NAMES: &[(&str, char)] = &[
    ("space", ' '), ("exclam", '!'), ("quotedbl", '"'), ("numbersign", '#'),
    ("dollar", '$'), ("percent", '%'), ("ampersand", '&'), ("quotesingle", '\''),
    ("parenleft", '('), ("parenright", ')'), ("asterisk", '*'), ("plus", '+'),
    ("comma", ','), ("hyphen", '-'), ("period", '.'), ("slash", '/'),
    ("zero", '0'), ("one", '1'), ("two", '2'), ("three", '3'), ("four", '4'),
    ("five", '5'), ("six", '6'), ("seven", '7'), ("eight", '8'), ("nine", '9'),
    ("colon", ':'), ("semicolon", ';'), ("less", '<'), ("equal", '='),
    ("greater", '>'), ("question", '?'), ("at", '@'), ("bracketleft", '['),
    ("backslash", '\\'), ("bracketright", ']'), ("asciicircum", '^'),
    ("underscore", '_'), ("grave", '`'), ("braceleft", '{'), ("bar", '|'),
    ("braceright", '}'), ("asciitilde", '~'),
    ("nbspace", '\u{A0}'), ("nonbreakingspace", '\u{A0}'), ("minus", '\u{2212}'),
    ("quoteleft", '\u{2018}'), ("quoteright", '\u{2019}'),
    ("quotedblleft", '\u{201C}'), ("quotedblright", '\u{201D}'),
    ("quotesinglbase", '\u{201A}'), ("quotedblbase", '\u{201E}'),
    ("endash", '\u{2013}'), ("emdash", '\u{2014}'), ("bullet", '\u{2022}'),
    ("ellipsis", '\u{2026}'), ("dagger", '\u{2020}'), ("daggerdbl", '\u{2021}'),
    ("perthousand", '\u{2030}'), ("trademark", '\u{2122}'), ("Euro", '\u{20AC}'),
    ("florin", '\u{0192}'), ("guilsinglleft", '\u{2039}'), ("guilsinglright", '\u{203A}'),
    ("fraction", '\u{2044}'), ("circumflex", '\u{02C6}'), ("tilde", '\u{02DC}'),
    ("dotlessi", '\u{0131}'), ("OE", '\u{0152}'), ("oe", '\u{0153}'),
    ("Scaron", '\u{0160}'), ("scaron", '\u{0161}'), ("Zcaron", '\u{017D}'),
    ("zcaron", '\u{017E}'), ("Ydieresis", '\u{0178}'), ("Lslash", '\u{0141}'),
    ("lslash", '\u{0142}'), ("checkmark", '\u{2713}'), ("square", '\u{25A1}'),
    ("exclamdown", '¡'), ("cent", '¢'), ("sterling", '£'), ("currency", '¤'),
    ("yen", '¥'), ("brokenbar", '¦'), ("section", '§'), ("dieresis", '¨'),
    ("copyright", '©'), ("ordfeminine", 'ª'), ("guillemotleft", '«'),
    ("logicalnot", '¬'), ("registered", '®'), ("macron", '¯'), ("degree", '°'),
    ("plusminus", '±'), ("twosuperior", '²'), ("threesuperior", '³'),
    ("acute", '´'), ("mu", 'µ'), ("paragraph", '¶'), ("periodcentered", '·'),
    ("cedilla", '¸'), ("onesuperior", '¹'), ("ordmasculine", 'º'),
    ("guillemotright", '»'), ("onequarter", '¼'), ("onehalf", '½'),
    ("threequarters", '¾'), ("questiondown", '¿'),
    ("Agrave", 'À'), ("Aacute", 'Á'), ("Acircumflex", 'Â'), ("Atilde", 'Ã'),
    ("Adieresis", 'Ä'), ("Aring", 'Å'), ("AE", 'Æ'), ("Ccedilla", 'Ç'),
    ("Egrave", 'È'), ("Eacute", 'É'), ("Ecircumflex", 'Ê'), ("Edieresis", 'Ë'),
    ("Igrave", 'Ì'), ("Iacute", 'Í'), ("Icircumflex", 'Î'), ("Idieresis", 'Ï'),
    ("Eth", 'Ð'), ("Ntilde", 'Ñ'), ("Ograve", 'Ò'), ("Oacute", 'Ó'),
    ("Ocircumflex", 'Ô'), ("Otilde", 'Õ'), ("Odieresis", 'Ö'), ("multiply", '×'),
    ("Oslash", 'Ø'), ("Ugrave", 'Ù'), ("Uacute", 'Ú'), ("Ucircumflex", 'Û'),
    ("Udieresis", 'Ü'), ("Yacute", 'Ý'), ("Thorn", 'Þ'), ("germandbls", 'ß'),
    ("agrave", 'à'), ("aacute", 'á'), ("acircumflex", 'â'), ("atilde", 'ã'),
    ("adieresis", 'ä'), ("aring", 'å'), ("ae", 'æ'), ("ccedilla", 'ç'),
    ("egrave", 'è'), ("eacute", 'é'), ("ecircumflex", 'ê'), ("edieresis", 'ë'),
    ("igrave", 'ì'), ("iacute", 'í'), ("icircumflex", 'î'), ("idieresis", 'ï'),
    ("eth", 'ð'), ("ntilde", 'ñ'), ("ograve", 'ò'), ("oacute", 'ó'),
    ("ocircumflex", 'ô'), ("otilde", 'õ'), ("odieresis", 'ö'), ("divide", '÷'),
    ("oslash", 'ø'), ("ugrave", 'ù'), ("uacute", 'ú'), ("ucircumflex", 'û'),
    ("udieresis", 'ü'), ("yacute", 'ý'), ("thorn", 'þ'), ("ydieresis", 'ÿ'),
];
