//! Per-tile symbol layout: feature intake, shaping, anchor selection
//! and buffer population, plus the per-frame line label projector.

use crate::{
    coords::{MapMode, OverscaledTileID},
    glyph::GlyphDependencies,
    image::ImageDependencies,
};

pub mod projection;
pub mod symbol_feature;
pub mod symbol_instance;
pub mod symbol_layout;

/// Tile-level parameters shared by every bucket laid out in one parse.
#[derive(Clone, Copy, Debug)]
pub struct BucketParameters {
    pub tile_id: OverscaledTileID,
    pub mode: MapMode,
    pub pixel_ratio: f64,
}

/// Dependency sinks filled during feature intake, so the host can fetch
/// glyph ranges and images before `prepare_symbols` runs.
pub struct LayoutDependencies<'a> {
    pub glyph_dependencies: &'a mut GlyphDependencies,
    pub image_dependencies: &'a mut ImageDependencies,
}
