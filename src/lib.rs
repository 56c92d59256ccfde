//! # tile-symbols
//!
//! The symbol placement and collision subsystem of a vector tile map
//! renderer: per-feature text/icon shaping, collision geometry, binary
//! vertex buffers, line-following label projection and cross-tile label
//! identity.
//!
//! The crate is deliberately narrow. It consumes decoded tile geometry,
//! pre-evaluated layout values, glyph metrics and atlas positions, and
//! produces per-bucket buffers plus collision metadata. Tile decoding,
//! expression evaluation, GPU upload and the placement pass itself live
//! in the host renderer.

pub mod bidi;
pub mod bucket;
pub mod buffer;
pub mod collision_feature;
pub mod coords;
pub mod cross_tile_index;
pub mod error;
pub mod font_stack;
pub mod geometry;
pub mod glyph;
pub mod glyph_atlas;
pub mod grid_index;
pub mod image;
pub mod image_atlas;
pub mod layout;
pub mod quads;
pub mod shaping;
pub mod style_types;
pub mod tagged_string;
pub mod util;

/// Unit of geometry local to one tile, in the range `0..EXTENT`.
pub struct TileSpace;

/// Unit of projected label-plane/viewport pixels.
pub struct ScreenSpace;
