//! Per-character styled text, the shaping-side view of formatted label
//! input.
//!
//! A `TaggedString` stores the text as UTF-16 code units, a matching
//! array of section indices, and the section table itself. Keeping
//! style per character means reordering (bidi) can rearrange the code
//! units without losing formatting. Inline images occupy Private Use
//! Area code points so they flow through line breaking like characters.

use csscolorparser::Color;
use widestring::{U16Str, U16String};

use crate::{
    bidi::{Char16, StyledText},
    font_stack::{FontStack, FontStackHash, FontStackHasher},
    util::{self, i18n},
};

#[derive(Clone, Default)]
pub struct SectionOptions {
    pub scale: f64,
    pub font_stack_hash: FontStackHash,
    pub font_stack: FontStack,
    pub text_color: Option<Color>,
    pub image_id: Option<String>,
}

impl SectionOptions {
    pub fn new(scale: f64, font_stack: FontStack, text_color: Option<Color>) -> Self {
        Self {
            scale,
            font_stack_hash: FontStackHasher::new(&font_stack),
            font_stack,
            text_color,
            image_id: None,
        }
    }

    pub fn from_image_id(image_id: String) -> Self {
        Self {
            scale: 1.0,
            image_id: Some(image_id),
            ..SectionOptions::default()
        }
    }
}

const PUA_BEGIN: Char16 = 0xE000;
const PUA_END: Char16 = 0xF8FF;

#[derive(Clone)]
pub struct TaggedString {
    styled_text: StyledText,
    sections: Vec<SectionOptions>,
    supports_vertical_writing_mode: Option<bool>,
    image_section_id: Char16,
}

impl Default for TaggedString {
    fn default() -> Self {
        Self {
            styled_text: (U16String::new(), Vec::new()),
            sections: Vec::new(),
            supports_vertical_writing_mode: None,
            image_section_id: 0,
        }
    }
}

impl TaggedString {
    pub fn new_from_raw(text: U16String, options: SectionOptions) -> Self {
        let text_len = text.len();
        Self {
            styled_text: (text, vec![0; text_len]),
            sections: vec![options],
            supports_vertical_writing_mode: None,
            image_section_id: 0,
        }
    }

    pub fn new(styled_text: StyledText, sections: Vec<SectionOptions>) -> Self {
        Self {
            styled_text,
            sections,
            supports_vertical_writing_mode: None,
            image_section_id: 0,
        }
    }

    pub fn length(&self) -> usize {
        self.styled_text.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styled_text.0.is_empty()
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn raw_text(&self) -> &U16String {
        &self.styled_text.0
    }

    pub fn styled_text(&self) -> &StyledText {
        &self.styled_text
    }

    pub fn sections(&self) -> &[SectionOptions] {
        &self.sections
    }

    pub fn char_code_at(&self, index: usize) -> Char16 {
        self.styled_text.0.as_slice()[index]
    }

    pub fn section_index(&self, character_index: usize) -> u8 {
        self.styled_text.1[character_index]
    }

    /// The section styling the character at `index`.
    pub fn section(&self, index: usize) -> &SectionOptions {
        &self.sections[self.styled_text.1[index] as usize]
    }

    pub fn section_at(&self, section_index: usize) -> &SectionOptions {
        &self.sections[section_index]
    }

    /// Stable key for cross-tile matching and line merging.
    pub fn text_hash(&self) -> u64 {
        util::hash(self.styled_text.0.as_slice())
    }

    pub fn add_text_section(
        &mut self,
        section_text: &U16String,
        scale: f64,
        font_stack: FontStack,
        text_color: Option<Color>,
    ) {
        self.styled_text.0.push(section_text);
        self.sections
            .push(SectionOptions::new(scale, font_stack, text_color));
        self.styled_text
            .1
            .resize(self.styled_text.0.len(), (self.sections.len() - 1) as u8);
        self.supports_vertical_writing_mode = None;
    }

    pub fn add_image_section(&mut self, image_id: String) {
        let Some(section_char) = self.next_image_section_char_code() else {
            util::warn_once("Exceeded maximum number of images in a label.");
            return;
        };
        self.styled_text.0.push(U16Str::from_slice(&[section_char]));
        self.sections.push(SectionOptions::from_image_id(image_id));
        self.styled_text
            .1
            .resize(self.styled_text.0.len(), (self.sections.len() - 1) as u8);
    }

    pub fn max_scale(&self) -> f64 {
        let mut max_scale: f64 = 0.0;
        for i in 0..self.styled_text.0.len() {
            max_scale = max_scale.max(self.section(i).scale);
        }
        max_scale
    }

    const WHITESPACE_CHARS: &'static [Char16] = &[
        ' ' as Char16,
        '\t' as Char16,
        '\n' as Char16,
        i18n::BACKSLASH_V,
        i18n::BACKSLASH_F,
        '\r' as Char16,
    ];

    pub fn trim(&mut self) {
        let first_non_whitespace = self
            .styled_text
            .0
            .as_slice()
            .iter()
            .position(|c| !Self::WHITESPACE_CHARS.contains(c));

        if let Some(begin) = first_non_whitespace {
            let end = self
                .styled_text
                .0
                .as_slice()
                .iter()
                .rposition(|c| !Self::WHITESPACE_CHARS.contains(c))
                .expect("a non-whitespace char exists")
                + 1;
            self.styled_text.0 = U16String::from(&self.styled_text.0[begin..end]);
            self.styled_text.1 = Vec::from(&self.styled_text.1[begin..end]);
        } else {
            // Entirely whitespace
            self.styled_text.0.clear();
            self.styled_text.1.clear();
        }
    }

    /// Substitution happens in place, so section indices stay valid.
    pub fn verticalize_punctuation(&mut self) {
        self.styled_text.0 = i18n::verticalize_punctuation_str(&self.styled_text.0);
    }

    pub fn allows_vertical_writing_mode(&mut self) -> bool {
        if self.supports_vertical_writing_mode.is_none() {
            self.supports_vertical_writing_mode =
                Some(i18n::allows_vertical_writing_mode(self.raw_text()));
        }
        self.supports_vertical_writing_mode
            .expect("cached above")
    }

    fn next_image_section_char_code(&mut self) -> Option<Char16> {
        if self.image_section_id == 0 {
            self.image_section_id = PUA_BEGIN;
            return Some(self.image_section_id);
        }
        self.image_section_id += 1;
        if self.image_section_id > PUA_END {
            return None;
        }
        Some(self.image_section_id)
    }
}

#[cfg(test)]
mod tests {
    use widestring::U16String;

    use super::*;

    #[test]
    fn trim_whitespace() {
        let mut basic = TaggedString::new_from_raw(
            " \t\ntrim that and not this  \n\t".into(),
            SectionOptions::new(1.0, vec![], None),
        );
        basic.trim();
        assert_eq!(basic.raw_text(), &U16String::from("trim that and not this"));

        let mut two_sections = TaggedString::default();
        two_sections.add_text_section(&" \t\ntrim that".into(), 1.5, vec![], None);
        two_sections.add_text_section(&" and not this  \n\t".into(), 0.5, vec![], None);
        two_sections.trim();
        assert_eq!(
            two_sections.raw_text(),
            &U16String::from("trim that and not this")
        );

        let mut all_whitespace = TaggedString::new_from_raw(
            "\n\t \r  \t\n".into(),
            SectionOptions::new(1.0, vec![], None),
        );
        all_whitespace.trim();
        assert_eq!(all_whitespace.raw_text(), &U16String::from(""));

        let mut no_trim =
            TaggedString::new_from_raw("no trim!".into(), SectionOptions::new(1.0, vec![], None));
        no_trim.trim();
        assert_eq!(no_trim.raw_text(), &U16String::from("no trim!"));
    }

    #[test]
    fn image_sections_use_pua() {
        let mut string = TaggedString::new_from_raw(U16String::new(), SectionOptions::default());
        string.add_image_section("image_name".to_string());
        assert_eq!(string.raw_text(), &U16String::from("\u{E000}"));
        assert_eq!(
            string.section(0).image_id.as_deref(),
            Some("image_name")
        );

        let mut max_sections = TaggedString::default();
        for i in 0..6401 {
            max_sections.add_image_section(i.to_string());
        }
        assert_eq!(max_sections.sections().len(), 6400);
        assert_eq!(max_sections.char_code_at(0), 0xE000);
        assert_eq!(max_sections.char_code_at(6399), 0xF8FF);
    }

    #[test]
    fn max_scale_spans_sections() {
        let mut string = TaggedString::default();
        string.add_text_section(&"small".into(), 0.5, vec![], None);
        string.add_text_section(&"big".into(), 2.0, vec![], None);
        assert_eq!(string.max_scale(), 2.0);
    }
}
