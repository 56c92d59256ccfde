//! Glyph metrics and shaping output types.

use std::collections::{BTreeMap, BTreeSet};

use bitflags::bitflags;
use euclid::Rect;

use crate::{
    bidi::Char16,
    font_stack::{FontStack, FontStackHash},
    TileSpace,
};

pub type GlyphID = Char16;
pub type GlyphIDs = BTreeSet<GlyphID>;

#[derive(PartialEq, Default, Copy, Clone, Debug)]
pub struct GlyphMetrics {
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
    pub advance: u32,
}

/// A glyph as supplied by the host: metrics only, the SDF bitmap stays
/// on the atlas side.
#[derive(Default, Clone)]
pub struct Glyph {
    pub id: GlyphID,
    pub metrics: GlyphMetrics,
}

impl Glyph {
    /// SDF border baked around every glyph bitmap.
    pub const BORDER_SIZE: u16 = 3;
}

/// `None` marks a glyph that was requested but missing from the font;
/// shaping skips it rather than failing the feature.
pub type Glyphs = BTreeMap<GlyphID, Option<Glyph>>;
pub type GlyphMap = BTreeMap<FontStackHash, Glyphs>;

/// Code points needed per font stack, collected during feature intake
/// so the host can fetch glyph ranges before shaping runs.
pub type GlyphDependencies = BTreeMap<FontStack, GlyphIDs>;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct WritingModes: u8 {
        const HORIZONTAL = 1 << 0;
        const VERTICAL = 1 << 1;
    }
}

impl Default for WritingModes {
    fn default() -> Self {
        WritingModes::empty()
    }
}

#[derive(Clone)]
pub struct PositionedGlyph {
    pub glyph: GlyphID,
    pub x: f64,
    pub y: f64,
    pub vertical: bool,
    pub font: FontStackHash,
    pub scale: f64,
    pub rect: Rect<u16, TileSpace>,
    pub metrics: GlyphMetrics,
    pub image_id: Option<String>,
    /// Which formatting section this glyph came from.
    pub section_index: usize,
}

#[derive(Default, Clone)]
pub struct PositionedLine {
    pub positioned_glyphs: Vec<PositionedGlyph>,
    pub line_offset: f64,
}

/// Shaped text: positioned glyph runs plus the block bounding box. An
/// empty shaping (no positioned glyphs) is the "skip this feature"
/// sentinel, not an error.
#[derive(Clone, Default)]
pub struct Shaping {
    pub positioned_lines: Vec<PositionedLine>,
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
    pub writing_mode: WritingModes,
    pub verticalizable: bool,
    pub icons_in_text: bool,
}

impl Shaping {
    /// Glyphs are laid out in a 24pt em box whose baseline sits below
    /// the box center; this pulls them back to the midline.
    pub const Y_OFFSET: i32 = -17;

    pub fn new(x: f64, y: f64, writing_mode: WritingModes) -> Self {
        Self {
            positioned_lines: Vec::new(),
            top: y,
            bottom: y,
            left: x,
            right: x,
            writing_mode,
            verticalizable: false,
            icons_in_text: false,
        }
    }

    pub fn has_positioned_glyphs(&self) -> bool {
        self.positioned_lines
            .iter()
            .any(|line| !line.positioned_glyphs.is_empty())
    }

    pub fn glyph_count(&self) -> usize {
        self.positioned_lines
            .iter()
            .map(|line| line.positioned_glyphs.len())
            .sum()
    }
}
