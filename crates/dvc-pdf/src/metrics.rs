//! Helvetica glyph metrics
//!
//! Advance widths (1/1000 em) of the standard Helvetica font for every
//! character WinAnsiEncoding can show, as published in its AFM file. Used both
//! to measure inserted text and to lay out glyphs of fonts that ship without a
//! /Widths array.

const FIRST_CODE: u32 = 32;

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    // space ! " # $ % & ' ( ) * + , - . /
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0-9
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    // : ; < = > ? @
    278, 278, 584, 584, 584, 556, 1015,
    // A-Z
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    // [ \ ] ^ _ `
    278, 278, 278, 469, 556, 333,
    // a-z
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    // { | } ~
    334, 260, 334, 584,
];

const LATIN1_FIRST: u32 = 0xA0;

#[rustfmt::skip]
const HELVETICA_LATIN1_WIDTHS: [u16; 96] = [
    // nbsp ¡ ¢ £ ¤ ¥ ¦ § ¨ © ª « ¬ shy ® ¯
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    // ° ± ² ³ ´ µ ¶ · ¸ ¹ º » ¼ ½ ¾ ¿
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    // À-Å Æ Ç È-Ë Ì-Ï
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    // Ð Ñ Ò-Ö × Ø Ù-Ü Ý Þ ß
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    // à-å æ ç è-ë ì-ï
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    // ð ñ ò-ö ÷ ø ù-ü ý þ ÿ
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

/// WinAnsi characters outside ASCII and Latin-1
fn winansi_extra_width(c: char) -> Option<u16> {
    let width = match c {
        '\u{20AC}' => 556,  // Euro
        '\u{201A}' => 222,  // quotesinglbase
        '\u{0192}' => 556,  // florin
        '\u{201E}' => 333,  // quotedblbase
        '\u{2026}' => 1000, // ellipsis
        '\u{2020}' | '\u{2021}' => 556,
        '\u{02C6}' | '\u{02DC}' => 333,
        '\u{2030}' => 1000, // perthousand
        '\u{0160}' => 667,
        '\u{2039}' | '\u{203A}' => 333,
        '\u{0152}' => 1000, // OE
        '\u{017D}' => 611,
        '\u{2018}' | '\u{2019}' => 222,
        '\u{201C}' | '\u{201D}' => 333,
        '\u{2022}' => 350,  // bullet
        '\u{2013}' => 556,  // endash
        '\u{2014}' => 1000, // emdash
        '\u{2122}' => 1000, // trademark
        '\u{0161}' => 500,
        '\u{0153}' => 944,  // oe
        '\u{017E}' => 500,
        '\u{0178}' => 667,
        _ => return None,
    };
    Some(width)
}

/// Advance width of one character in 1/1000 em, if Helvetica defines it
pub fn helvetica_char_width(c: char) -> Option<u16> {
    let code = c as u32;
    if (FIRST_CODE..FIRST_CODE + HELVETICA_WIDTHS.len() as u32).contains(&code) {
        Some(HELVETICA_WIDTHS[(code - FIRST_CODE) as usize])
    } else if (LATIN1_FIRST..LATIN1_FIRST + HELVETICA_LATIN1_WIDTHS.len() as u32).contains(&code) {
        Some(HELVETICA_LATIN1_WIDTHS[(code - LATIN1_FIRST) as usize])
    } else {
        winansi_extra_width(c)
    }
}

/// Rendered width of `text` in Helvetica at `font_size`
///
/// Returns `None` when any character falls outside the metrics table, so the
/// caller can choose its own estimate.
pub fn text_width(text: &str, font_size: f64) -> Option<f64> {
    let mut units = 0u32;
    for c in text.chars() {
        units += helvetica_char_width(c)? as u32;
    }
    Some(units as f64 * font_size / 1000.0)
}
