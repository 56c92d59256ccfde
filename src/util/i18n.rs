//! Script classification for shaping decisions.
//!
//! Everything operates on UTF-16 code units; the glyph pipeline only
//! handles the Basic Multilingual Plane, so surrogates simply fall
//! through every predicate.

use widestring::U16String;

use crate::bidi::Char16;

pub const BACKSLASH_V: Char16 = 0x000B;
pub const BACKSLASH_F: Char16 = 0x000C;

pub fn is_whitespace(chr: Char16) -> bool {
    chr == b' ' as Char16
        || chr == b'\t' as Char16
        || chr == b'\n' as Char16
        || chr == BACKSLASH_V
        || chr == BACKSLASH_F
        || chr == b'\r' as Char16
}

/// Characters that commonly appear between words and allow a break
/// without surrounding spaces.
pub fn allows_word_breaking(chr: Char16) -> bool {
    chr == 0x0a      /* newline */
        || chr == 0x20   /* space */
        || chr == 0x26   /* ampersand */
        || chr == 0x28   /* open parenthesis */
        || chr == 0x29   /* close parenthesis */
        || chr == 0x2b   /* plus sign */
        || chr == 0x2d   /* hyphen-minus */
        || chr == 0x2f   /* solidus */
        || chr == 0xad   /* soft hyphen */
        || chr == 0xb7   /* middle dot */
        || chr == 0x200b /* zero-width space */
        || chr == 0x2010 /* hyphen */
        || chr == 0x2013 /* en dash */
}

/// Ideographic scripts allow breaking between any two characters.
pub fn allows_ideographic_breaking(chr: Char16) -> bool {
    matches!(chr,
        0x2e80..=0x2eff   // CJK radicals supplement
        | 0x2f00..=0x2fdf // Kangxi radicals
        | 0x3000..=0x303f // CJK symbols and punctuation
        | 0x3040..=0x309f // Hiragana
        | 0x30a0..=0x30ff // Katakana
        | 0x3100..=0x312f // Bopomofo
        | 0x31a0..=0x31bf // Bopomofo extended
        | 0x31c0..=0x31ef // CJK strokes
        | 0x31f0..=0x31ff // Katakana phonetic extensions
        | 0x3200..=0x32ff // enclosed CJK letters and months
        | 0x3300..=0x33ff // CJK compatibility
        | 0x3400..=0x4dbf // CJK unified ideographs extension A
        | 0x4e00..=0x9fff // CJK unified ideographs
        | 0xa000..=0xa48f // Yi syllables
        | 0xa490..=0xa4cf // Yi radicals
        | 0xac00..=0xd7a3 // Hangul syllables
        | 0xf900..=0xfaff // CJK compatibility ideographs
        | 0xfe30..=0xfe4f // CJK compatibility forms
        | 0xff00..=0xffef // halfwidth and fullwidth forms
    )
}

pub fn allows_ideographic_breaking_str(string: &U16String) -> bool {
    string
        .as_slice()
        .iter()
        .all(|chr| allows_ideographic_breaking(*chr))
}

/// Cursive scripts cannot be letter-spaced without breaking joining.
pub fn char_allows_letter_spacing(chr: Char16) -> bool {
    !matches!(chr,
        0x0600..=0x06ff   // Arabic
        | 0x0700..=0x074f // Syriac
        | 0x0750..=0x077f // Arabic supplement
        | 0x08a0..=0x08ff // Arabic extended A
        | 0xfb50..=0xfdff // Arabic presentation forms A
        | 0xfe70..=0xfeff // Arabic presentation forms B
    )
}

pub fn allows_letter_spacing(string: &U16String) -> bool {
    string
        .as_slice()
        .iter()
        .all(|chr| char_allows_letter_spacing(*chr))
}

/// Scripts whose glyphs stay upright when laid out vertically.
pub fn has_upright_vertical_orientation(chr: Char16) -> bool {
    if chr == 0x02ea || chr == 0x02eb {
        // Bopomofo tone marks
        return true;
    }
    matches!(chr,
        0x1100..=0x11ff   // Hangul jamo
        | 0x2460..=0x24ff // enclosed alphanumerics
        | 0x25a0..=0x25ff // geometric shapes
        | 0x2e80..=0x2eff
        | 0x2f00..=0x2fdf
        | 0x3000..=0x303f
        | 0x3041..=0x309f
        | 0x30a1..=0x30ff
        | 0x3100..=0x312f
        | 0x3130..=0x318f // Hangul compatibility jamo
        | 0x31a0..=0x31bf
        | 0x31c0..=0x31ef
        | 0x31f0..=0x31ff
        | 0x3200..=0x32ff
        | 0x3300..=0x33ff
        | 0x3400..=0x4dbf
        | 0x4e00..=0x9fff
        | 0xa000..=0xa48f
        | 0xa490..=0xa4cf
        | 0xa960..=0xa97f // Hangul jamo extended A
        | 0xac00..=0xd7a3
        | 0xd7b0..=0xd7ff // Hangul jamo extended B
        | 0xf900..=0xfaff
        | 0xfe10..=0xfe1f // vertical forms
        | 0xfe30..=0xfe4f
        | 0xff01..=0xff5e // fullwidth forms, excluding halfwidth tail
        | 0xffe0..=0xffe6
    )
}

/// Punctuation that keeps its orientation in vertical text instead of
/// being drawn upright or substituted.
pub fn has_neutral_vertical_orientation(chr: Char16) -> bool {
    matches!(chr,
        0x00a7 | 0x00a9 | 0x00ae | 0x00b1 | 0x00d7 | 0x00f7
        | 0x2016..=0x2017
        | 0x2020..=0x2021
        | 0x2030..=0x2031
        | 0x203b..=0x203c
        | 0x2042 | 0x2047..=0x2049 | 0x2051 | 0x2065
        | 0x2100..=0x2109
        | 0x2110..=0x2113
        | 0x2116..=0x2117
        | 0x2120..=0x2122
        | 0x2139 | 0x2600..=0x2603 | 0x2610..=0x2613 | 0x261c..=0x261f
        | 0x2672..=0x267d
        | 0x26a0 | 0x26bd..=0x26be | 0x2702 | 0x271a | 0x2756 | 0x2776..=0x277f
    )
}

pub fn has_rotated_vertical_orientation(chr: Char16) -> bool {
    !(has_upright_vertical_orientation(chr) || has_neutral_vertical_orientation(chr))
}

/// A string qualifies for a vertical writing mode when it contains at
/// least one upright-capable character.
pub fn allows_vertical_writing_mode(string: &U16String) -> bool {
    string
        .as_slice()
        .iter()
        .any(|chr| has_upright_vertical_orientation(*chr))
}

/// Scripts that need a full shaping engine. Glyphs from these never
/// verticalize because the per-codepoint pipeline cannot reshape them.
pub fn is_char_in_complex_shaping_script(chr: Char16) -> bool {
    matches!(chr,
        0x0600..=0x06ff
        | 0x0750..=0x077f
        | 0x08a0..=0x08ff
        | 0x0900..=0x0dff // Indic scripts
        | 0x0e80..=0x0eff // Lao
        | 0x0f00..=0x0fff // Tibetan
        | 0x1000..=0x109f // Myanmar
        | 0x1780..=0x17ff // Khmer
        | 0xfb50..=0xfdff
        | 0xfe70..=0xfeff
    )
}

/// Vertical presentation form for a horizontal punctuation character,
/// or 0 when none exists.
pub fn verticalize_punctuation(chr: Char16) -> Char16 {
    match chr {
        0x0021 | 0xff01 => 0xfe15, // !
        0x0028 | 0xff08 => 0xfe35, // (
        0x0029 | 0xff09 => 0xfe36, // )
        0x002c | 0xff0c => 0xfe10, // ,
        0x002d | 0xff0d | 0x2013 => 0xfe32, // hyphen, en dash
        0x002e | 0xff0e | 0x3002 => 0xfe12, // full stop
        0x003a | 0xff1a => 0xfe13, // :
        0x003b | 0xff1b => 0xfe14, // ;
        0x003c | 0xff1c | 0x3008 => 0xfe3f, // <
        0x003e | 0xff1e | 0x3009 => 0xfe40, // >
        0x003f | 0xff1f => 0xfe16, // ?
        0x005b | 0xff3b => 0xfe47, // [
        0x005d | 0xff3d => 0xfe48, // ]
        0x005f | 0xff3f => 0xfe33, // _
        0x007b | 0xff5b => 0xfe37, // {
        0x007c | 0xff5c => 0x2015, // |
        0x007d | 0xff5d => 0xfe38, // }
        0x2014 => 0xfe31,          // em dash
        0x2018 => 0xfe43,
        0x2019 => 0xfe44,
        0x201c => 0xfe41,
        0x201d => 0xfe42,
        0x2026 => 0xfe19,
        0x3001 => 0xfe11,
        0x300a => 0xfe3d,
        0x300b => 0xfe3e,
        0x300c => 0xfe41,
        0x300d => 0xfe42,
        0x300e => 0xfe43,
        0x300f => 0xfe44,
        0x3010 => 0xfe3b,
        0x3011 => 0xfe3c,
        0x3014 => 0xfe39,
        0x3015 => 0xfe3a,
        0x3016 => 0xfe17,
        0x3017 => 0xfe18,
        _ => 0,
    }
}

/// In-place vertical punctuation substitution. Character count never
/// changes, so section indices stay valid.
pub fn verticalize_punctuation_str(input: &U16String) -> U16String {
    let slice = input.as_slice();
    let mut output = Vec::with_capacity(slice.len());
    for (i, chr) in slice.iter().enumerate() {
        let prev_rotated = i
            .checked_sub(1)
            .map(|p| has_rotated_vertical_orientation(slice[p]) && verticalize_punctuation(slice[p]) == 0)
            .unwrap_or(false);
        let next_rotated = slice
            .get(i + 1)
            .map(|n| has_rotated_vertical_orientation(*n) && verticalize_punctuation(*n) == 0)
            .unwrap_or(false);

        let replacement = if prev_rotated || next_rotated {
            0
        } else {
            verticalize_punctuation(*chr)
        };
        output.push(if replacement != 0 { replacement } else { *chr });
    }
    U16String::from_vec(output)
}
