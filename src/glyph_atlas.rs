//! Atlas positions for glyphs, supplied by the host before layout runs.

use std::collections::BTreeMap;

use euclid::Rect;

use crate::{
    font_stack::FontStackHash,
    glyph::{GlyphID, GlyphMetrics},
    TileSpace,
};

#[derive(Clone, Copy, Default)]
pub struct GlyphPosition {
    pub rect: Rect<u16, TileSpace>,
    pub metrics: GlyphMetrics,
}

pub type GlyphPositionMap = BTreeMap<GlyphID, GlyphPosition>;
pub type GlyphPositions = BTreeMap<FontStackHash, GlyphPositionMap>;
