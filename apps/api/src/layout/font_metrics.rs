//! Static bitmap glyph table and text measurement for the CV templates.
//!
//! Glyphs are 5×7 dot matrices stored column-major: one byte per column, bit 0
//! is the top row. Every glyph advances 6 dots (5 columns + 1 gap), so text
//! width is a pure function of the character count and the dot size.
//!
//! A "dot" is the edge length of one glyph cell in CSS pixels. Body text uses
//! 2px dots (10×14 px glyphs), headings 3px, the name line 4px.
//!
//! Non-ASCII input is folded to its base letter via NFD decomposition
//! ("é" → "e"); dashes and quotes map to their ASCII look-alikes. Anything
//! still outside 0x20..=0x7E renders as the hollow-box fallback glyph.

use unicode_normalization::UnicodeNormalization;

pub const GLYPH_COLUMNS: u32 = 5;
pub const GLYPH_ROWS: u32 = 7;
/// Horizontal advance per character, in dots.
pub const ADVANCE_DOTS: u32 = GLYPH_COLUMNS + 1;
/// Vertical advance per line, in dots (7 rows + 3 rows leading).
pub const LINE_DOTS: u32 = GLYPH_ROWS + 3;

// ────────────────────────────────────────────────────────────────────────────
// Glyph table
// ────────────────────────────────────────────────────────────────────────────

/// Column bitmaps for ASCII 0x20 (space) through 0x7E (~).
/// Index = (char as usize) - 32.
static ASCII_GLYPHS: [[u8; 5]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], // space
    [0x00, 0x00, 0x5F, 0x00, 0x00], // !
    [0x00, 0x07, 0x00, 0x07, 0x00], // "
    [0x14, 0x7F, 0x14, 0x7F, 0x14], // #
    [0x24, 0x2A, 0x7F, 0x2A, 0x12], // $
    [0x23, 0x13, 0x08, 0x64, 0x62], // %
    [0x36, 0x49, 0x55, 0x22, 0x50], // &
    [0x00, 0x05, 0x03, 0x00, 0x00], // '
    [0x00, 0x1C, 0x22, 0x41, 0x00], // (
    [0x00, 0x41, 0x22, 0x1C, 0x00], // )
    [0x08, 0x2A, 0x1C, 0x2A, 0x08], // *
    [0x08, 0x08, 0x3E, 0x08, 0x08], // +
    [0x00, 0x50, 0x30, 0x00, 0x00], // ,
    [0x08, 0x08, 0x08, 0x08, 0x08], // -
    [0x00, 0x60, 0x60, 0x00, 0x00], // .
    [0x20, 0x10, 0x08, 0x04, 0x02], // /
    [0x3E, 0x51, 0x49, 0x45, 0x3E], // 0
    [0x00, 0x42, 0x7F, 0x40, 0x00], // 1
    [0x42, 0x61, 0x51, 0x49, 0x46], // 2
    [0x21, 0x41, 0x45, 0x4B, 0x31], // 3
    [0x18, 0x14, 0x12, 0x7F, 0x10], // 4
    [0x27, 0x45, 0x45, 0x45, 0x39], // 5
    [0x3C, 0x4A, 0x49, 0x49, 0x30], // 6
    [0x01, 0x71, 0x09, 0x05, 0x03], // 7
    [0x36, 0x49, 0x49, 0x49, 0x36], // 8
    [0x06, 0x49, 0x49, 0x29, 0x1E], // 9
    [0x00, 0x36, 0x36, 0x00, 0x00], // :
    [0x00, 0x56, 0x36, 0x00, 0x00], // ;
    [0x08, 0x14, 0x22, 0x41, 0x00], // <
    [0x14, 0x14, 0x14, 0x14, 0x14], // =
    [0x00, 0x41, 0x22, 0x14, 0x08], // >
    [0x02, 0x01, 0x51, 0x09, 0x06], // ?
    [0x32, 0x49, 0x79, 0x41, 0x3E], // @
    [0x7E, 0x11, 0x11, 0x11, 0x7E], // A
    [0x7F, 0x49, 0x49, 0x49, 0x36], // B
    [0x3E, 0x41, 0x41, 0x41, 0x22], // C
    [0x7F, 0x41, 0x41, 0x22, 0x1C], // D
    [0x7F, 0x49, 0x49, 0x49, 0x41], // E
    [0x7F, 0x09, 0x09, 0x01, 0x01], // F
    [0x3E, 0x41, 0x41, 0x51, 0x32], // G
    [0x7F, 0x08, 0x08, 0x08, 0x7F], // H
    [0x00, 0x41, 0x7F, 0x41, 0x00], // I
    [0x20, 0x40, 0x41, 0x3F, 0x01], // J
    [0x7F, 0x08, 0x14, 0x22, 0x41], // K
    [0x7F, 0x40, 0x40, 0x40, 0x40], // L
    [0x7F, 0x02, 0x04, 0x02, 0x7F], // M
    [0x7F, 0x04, 0x08, 0x10, 0x7F], // N
    [0x3E, 0x41, 0x41, 0x41, 0x3E], // O
    [0x7F, 0x09, 0x09, 0x09, 0x06], // P
    [0x3E, 0x41, 0x51, 0x21, 0x5E], // Q
    [0x7F, 0x09, 0x19, 0x29, 0x46], // R
    [0x46, 0x49, 0x49, 0x49, 0x31], // S
    [0x01, 0x01, 0x7F, 0x01, 0x01], // T
    [0x3F, 0x40, 0x40, 0x40, 0x3F], // U
    [0x1F, 0x20, 0x40, 0x20, 0x1F], // V
    [0x7F, 0x20, 0x18, 0x20, 0x7F], // W
    [0x63, 0x14, 0x08, 0x14, 0x63], // X
    [0x03, 0x04, 0x78, 0x04, 0x03], // Y
    [0x61, 0x51, 0x49, 0x45, 0x43], // Z
    [0x00, 0x7F, 0x41, 0x41, 0x00], // [
    [0x02, 0x04, 0x08, 0x10, 0x20], // backslash
    [0x00, 0x41, 0x41, 0x7F, 0x00], // ]
    [0x04, 0x02, 0x01, 0x02, 0x04], // ^
    [0x40, 0x40, 0x40, 0x40, 0x40], // _
    [0x00, 0x01, 0x02, 0x04, 0x00], // `
    [0x20, 0x54, 0x54, 0x54, 0x78], // a
    [0x7F, 0x48, 0x44, 0x44, 0x38], // b
    [0x38, 0x44, 0x44, 0x44, 0x20], // c
    [0x38, 0x44, 0x44, 0x48, 0x7F], // d
    [0x38, 0x54, 0x54, 0x54, 0x18], // e
    [0x08, 0x7E, 0x09, 0x01, 0x02], // f
    [0x0C, 0x52, 0x52, 0x52, 0x3E], // g
    [0x7F, 0x08, 0x04, 0x04, 0x78], // h
    [0x00, 0x44, 0x7D, 0x40, 0x00], // i
    [0x20, 0x40, 0x44, 0x3D, 0x00], // j
    [0x7F, 0x10, 0x28, 0x44, 0x00], // k
    [0x00, 0x41, 0x7F, 0x40, 0x00], // l
    [0x7C, 0x04, 0x18, 0x04, 0x78], // m
    [0x7C, 0x08, 0x04, 0x04, 0x78], // n
    [0x38, 0x44, 0x44, 0x44, 0x38], // o
    [0x7C, 0x14, 0x14, 0x14, 0x08], // p
    [0x08, 0x14, 0x14, 0x18, 0x7C], // q
    [0x7C, 0x08, 0x04, 0x04, 0x08], // r
    [0x48, 0x54, 0x54, 0x54, 0x20], // s
    [0x04, 0x3F, 0x44, 0x40, 0x20], // t
    [0x3C, 0x40, 0x40, 0x20, 0x7C], // u
    [0x1C, 0x20, 0x40, 0x20, 0x1C], // v
    [0x3C, 0x40, 0x30, 0x40, 0x3C], // w
    [0x44, 0x28, 0x10, 0x28, 0x44], // x
    [0x0C, 0x50, 0x50, 0x50, 0x3C], // y
    [0x44, 0x64, 0x54, 0x4C, 0x44], // z
    [0x00, 0x08, 0x36, 0x41, 0x00], // {
    [0x00, 0x00, 0x7F, 0x00, 0x00], // |
    [0x00, 0x41, 0x36, 0x08, 0x00], // }
    [0x08, 0x04, 0x08, 0x10, 0x08], // ~
];

/// Centered dot, used for "·" and "•" list separators.
static MIDDLE_DOT: [u8; 5] = [0x00, 0x1C, 0x1C, 0x1C, 0x00];

/// Hollow box drawn for characters with no glyph.
static MISSING_GLYPH: [u8; 5] = [0x7F, 0x41, 0x41, 0x41, 0x7F];

/// Returns the column bitmap for a character after folding.
pub fn glyph_columns(c: char) -> &'static [u8; 5] {
    let code = c as usize;
    if (32..=126).contains(&code) {
        &ASCII_GLYPHS[code - 32]
    } else if c == '·' || c == '•' {
        &MIDDLE_DOT
    } else {
        &MISSING_GLYPH
    }
}

/// Maps a character onto the glyph repertoire.
///
/// Whitespace collapses to a space; typographic punctuation maps to ASCII;
/// accented letters lose their combining marks.
pub fn fold_char(c: char) -> char {
    match c {
        c if c.is_ascii() && !c.is_ascii_control() => c,
        '\t' | '\u{a0}' | '\u{2009}' | '\u{202f}' => ' ',
        '\u{2010}'..='\u{2015}' | '\u{2212}' => '-',
        '\u{2018}' | '\u{2019}' | '\u{201a}' | '\u{2032}' => '\'',
        '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{2033}' => '"',
        '\u{2026}' => '.',
        '·' | '•' => c,
        _ => c
            .to_string()
            .nfd()
            .next()
            .filter(|base| base.is_ascii() && !base.is_ascii_control())
            .unwrap_or(c),
    }
}

/// Folds a whole string, one output char per input char.
pub fn fold_str(s: &str) -> String {
    s.chars().map(fold_char).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Measurement
// ────────────────────────────────────────────────────────────────────────────

/// Width in CSS px of `s` rendered with the given dot size.
///
/// Counts the trailing inter-glyph gap, so consecutive runs can be placed
/// end-to-end without overlap.
pub fn measure_str(s: &str, dot: u32) -> u32 {
    s.chars().count() as u32 * ADVANCE_DOTS * dot
}

/// Line pitch in CSS px for the given dot size.
pub fn line_height(dot: u32) -> u32 {
    LINE_DOTS * dot
}

/// Maximum number of characters that fit in `max_width_px`.
pub fn chars_per_line(dot: u32, max_width_px: u32) -> usize {
    let advance = ADVANCE_DOTS * dot.max(1);
    ((max_width_px / advance) as usize).max(1)
}

/// Greedy word wrap of a single paragraph.
///
/// Words longer than a whole line are hard-broken. Whitespace runs collapse.
/// Empty input yields no lines.
pub fn wrap_text(text: &str, dot: u32, max_width_px: u32) -> Vec<String> {
    let limit = chars_per_line(dot, max_width_px);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let folded = fold_str(word);
        let mut chars: Vec<char> = folded.chars().collect();

        // Hard-break words that cannot fit on any line.
        while chars.len() > limit {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = chars.split_off(limit);
            lines.push(chars.into_iter().collect());
            chars = rest;
        }

        let word_len = chars.len();
        if word_len == 0 {
            continue;
        }

        let needed = if current_len == 0 { word_len } else { current_len + 1 + word_len };
        if needed > limit {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(chars);
        current_len += word_len;
    }

    if current_len > 0 {
        lines.push(current);
    }
    lines
}

/// Wraps multi-paragraph text, keeping explicit line breaks.
///
/// Blank source lines are dropped rather than rendered as empty rows.
pub fn wrap_paragraphs(text: &str, dot: u32, max_width_px: u32) -> Vec<String> {
    text.lines()
        .flat_map(|paragraph| wrap_text(paragraph, dot, max_width_px))
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_str_empty_returns_zero() {
        assert_eq!(measure_str("", 2), 0);
    }

    #[test]
    fn test_measure_str_scales_with_dot() {
        assert_eq!(measure_str("Rust", 1), 24);
        assert_eq!(measure_str("Rust", 2), 48);
    }

    #[test]
    fn test_space_glyph_is_blank() {
        assert!(glyph_columns(' ').iter().all(|&col| col == 0));
    }

    #[test]
    fn test_unknown_char_uses_box_glyph() {
        assert_eq!(glyph_columns('漢'), &MISSING_GLYPH);
    }

    #[test]
    fn test_fold_accented_letters() {
        assert_eq!(fold_str("José Müller"), "Jose Muller");
    }

    #[test]
    fn test_fold_typographic_punctuation() {
        assert_eq!(fold_str("2019–2021 “quoted”"), "2019-2021 \"quoted\"");
    }

    #[test]
    fn test_wrap_empty_yields_no_lines() {
        assert!(wrap_text("   ", 2, 600).is_empty());
    }

    #[test]
    fn test_wrap_respects_line_limit() {
        // 2px dots → 12px per char → 10 chars in 120px.
        let lines = wrap_text("alpha beta gamma delta", 2, 120);
        assert_eq!(lines, vec!["alpha beta", "gamma", "delta"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
    }

    #[test]
    fn test_wrap_hard_breaks_long_words() {
        let lines = wrap_text("abcdefghijklmnop xy", 2, 60);
        assert_eq!(lines, vec!["abcde", "fghij", "klmno", "p xy"]);
    }

    #[test]
    fn test_wrap_paragraphs_keeps_breaks() {
        let lines = wrap_paragraphs("first line\n\nsecond", 2, 600);
        assert_eq!(lines, vec!["first line", "second"]);
    }
}
