//! The symbol bucket: binary vertex buffers, placed symbols and the
//! collision metadata for one symbol layer in one tile.
//!
//! All record layouts are declared as field tables so the backing
//! [`StructArray`](crate::buffer::StructArray) bytes can be handed to
//! the upload path unchanged. Cross-references between placed symbols
//! and the shared line-vertex/glyph-offset arrays are `(start, count)`
//! ranges, never pointers, so the arrays stay contiguous.

use std::ops::Range;

use euclid::Point2D;

use crate::{
    buffer::{Field, FieldKind, RecordReader, RecordWriter, StructArray, StructRecord},
    collision_feature::CollisionBoxArray,
    glyph::WritingModes,
    layout::{
        projection::{self, FrameState},
        symbol_instance::SymbolInstance,
        symbol_layout::SortKeyRange,
    },
    style_types::TextWritingModeType,
    TileSpace,
};

/// One static vertex of a symbol quad corner.
#[derive(Clone, Copy, Debug)]
pub struct SymbolVertex {
    pub anchor: Point2D<f64, TileSpace>,
    pub offset: Point2D<f64, TileSpace>,
    pub glyph_offset_y: f64,
    pub tex_x: u16,
    pub tex_y: u16,
    pub size_lower: f64,
    pub size_upper: f64,
    pub is_sdf: bool,
    pub pixel_offset: Point2D<f64, TileSpace>,
    pub min_font_scale: Point2D<f64, TileSpace>,
}

impl SymbolVertex {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        anchor: Point2D<f64, TileSpace>,
        offset: Point2D<f64, TileSpace>,
        glyph_offset_y: f64,
        tex_x: u16,
        tex_y: u16,
        size_data: Range<f64>,
        is_sdf: bool,
        pixel_offset: Point2D<f64, TileSpace>,
        min_font_scale: Point2D<f64, TileSpace>,
    ) -> Self {
        Self {
            anchor,
            offset,
            glyph_offset_y,
            tex_x,
            tex_y,
            size_lower: size_data.start,
            size_upper: size_data.end,
            is_sdf,
            pixel_offset,
            min_font_scale,
        }
    }
}

impl StructRecord for SymbolVertex {
    const FIELDS: &'static [Field] = &[
        Field { name: "anchor_x", kind: FieldKind::F32 },
        Field { name: "anchor_y", kind: FieldKind::F32 },
        Field { name: "offset_x", kind: FieldKind::F32 },
        Field { name: "offset_y", kind: FieldKind::F32 },
        Field { name: "glyph_offset_y", kind: FieldKind::F32 },
        Field { name: "tex_x", kind: FieldKind::U16 },
        Field { name: "tex_y", kind: FieldKind::U16 },
        Field { name: "size_lower", kind: FieldKind::F32 },
        Field { name: "size_upper", kind: FieldKind::F32 },
        Field { name: "pixel_offset_x", kind: FieldKind::F32 },
        Field { name: "pixel_offset_y", kind: FieldKind::F32 },
        Field { name: "min_font_scale_x", kind: FieldKind::F32 },
        Field { name: "min_font_scale_y", kind: FieldKind::F32 },
        Field { name: "is_sdf", kind: FieldKind::U8 },
    ];

    fn pack(&self, w: &mut RecordWriter<'_>) {
        w.f32(self.anchor.x as f32);
        w.f32(self.anchor.y as f32);
        w.f32(self.offset.x as f32);
        w.f32(self.offset.y as f32);
        w.f32(self.glyph_offset_y as f32);
        w.u16(self.tex_x);
        w.u16(self.tex_y);
        w.f32(self.size_lower as f32);
        w.f32(self.size_upper as f32);
        w.f32(self.pixel_offset.x as f32);
        w.f32(self.pixel_offset.y as f32);
        w.f32(self.min_font_scale.x as f32);
        w.f32(self.min_font_scale.y as f32);
        w.u8(self.is_sdf as u8);
    }

    fn unpack(r: &mut RecordReader<'_>) -> Self {
        Self {
            anchor: Point2D::new(r.f32() as f64, r.f32() as f64),
            offset: Point2D::new(r.f32() as f64, r.f32() as f64),
            glyph_offset_y: r.f32() as f64,
            tex_x: r.u16(),
            tex_y: r.u16(),
            size_lower: r.f32() as f64,
            size_upper: r.f32() as f64,
            pixel_offset: Point2D::new(r.f32() as f64, r.f32() as f64),
            min_font_scale: Point2D::new(r.f32() as f64, r.f32() as f64),
            is_sdf: r.u8() != 0,
        }
    }
}

/// Per-frame position of a quad corner, rewritten every frame for
/// line-following labels by the projector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DynamicVertex {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
}

impl DynamicVertex {
    pub fn new(x: f64, y: f64, angle: f64) -> Self {
        Self { x, y, angle }
    }
}

impl StructRecord for DynamicVertex {
    const FIELDS: &'static [Field] = &[
        Field { name: "x", kind: FieldKind::F32 },
        Field { name: "y", kind: FieldKind::F32 },
        Field { name: "angle", kind: FieldKind::F32 },
    ];

    fn pack(&self, w: &mut RecordWriter<'_>) {
        w.f32(self.x as f32);
        w.f32(self.y as f32);
        w.f32(self.angle as f32);
    }

    fn unpack(r: &mut RecordReader<'_>) -> Self {
        Self {
            x: r.f32() as f64,
            y: r.f32() as f64,
            angle: r.f32() as f64,
        }
    }
}

/// Fade state of a quad corner, written by external Placement.
#[derive(Clone, Copy, Debug)]
pub struct OpacityVertex {
    pub placed: bool,
    pub opacity: f64,
}

impl OpacityVertex {
    pub fn new(placed: bool, opacity: f64) -> Self {
        Self { placed, opacity }
    }
}

impl StructRecord for OpacityVertex {
    const FIELDS: &'static [Field] = &[
        Field { name: "placed", kind: FieldKind::U8 },
        Field { name: "opacity", kind: FieldKind::F32 },
    ];

    fn pack(&self, w: &mut RecordWriter<'_>) {
        w.u8(self.placed as u8);
        w.f32(self.opacity as f32);
    }

    fn unpack(r: &mut RecordReader<'_>) -> Self {
        Self {
            placed: r.u8() != 0,
            opacity: r.f32() as f64,
        }
    }
}

/// A point of a label's line with its cumulative distance from the
/// label anchor, walked by the projector in both directions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineVertex {
    pub x: i16,
    pub y: i16,
    pub tile_unit_distance_from_anchor: f64,
}

impl StructRecord for LineVertex {
    const FIELDS: &'static [Field] = &[
        Field { name: "x", kind: FieldKind::I16 },
        Field { name: "y", kind: FieldKind::I16 },
        Field { name: "distance", kind: FieldKind::F32 },
    ];

    fn pack(&self, w: &mut RecordWriter<'_>) {
        w.i16(self.x);
        w.i16(self.y);
        w.f32(self.tile_unit_distance_from_anchor as f32);
    }

    fn unpack(r: &mut RecordReader<'_>) -> Self {
        Self {
            x: r.i16(),
            y: r.i16(),
            tile_unit_distance_from_anchor: r.f32() as f64,
        }
    }
}

/// Along-line x displacement of one glyph, in ems from the anchor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphOffset {
    pub offset_x: f64,
}

impl StructRecord for GlyphOffset {
    const FIELDS: &'static [Field] = &[Field { name: "offset_x", kind: FieldKind::F32 }];

    fn pack(&self, w: &mut RecordWriter<'_>) {
        w.f32(self.offset_x as f32);
    }

    fn unpack(r: &mut RecordReader<'_>) -> Self {
        Self { offset_x: r.f32() as f64 }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TriangleIndex {
    pub a: u16,
    pub b: u16,
    pub c: u16,
}

impl StructRecord for TriangleIndex {
    const FIELDS: &'static [Field] = &[
        Field { name: "a", kind: FieldKind::U16 },
        Field { name: "b", kind: FieldKind::U16 },
        Field { name: "c", kind: FieldKind::U16 },
    ];

    fn pack(&self, w: &mut RecordWriter<'_>) {
        w.u16(self.a);
        w.u16(self.b);
        w.u16(self.c);
    }

    fn unpack(r: &mut RecordReader<'_>) -> Self {
        Self { a: r.u16(), b: r.u16(), c: r.u16() }
    }
}

pub type SymbolVertexArray = StructArray<SymbolVertex>;
pub type DynamicVertexArray = StructArray<DynamicVertex>;
pub type OpacityVertexArray = StructArray<OpacityVertex>;
pub type LineVertexArray = StructArray<LineVertex>;
pub type GlyphOffsetArray = StructArray<GlyphOffset>;
pub type TriangleIndexArray = StructArray<TriangleIndex>;

/// One draw range of a buffer. A new segment starts when the vertex
/// index would overflow `u16` or the sort key changes.
#[derive(Clone, Copy, Debug)]
pub struct Segment {
    pub vertex_offset: usize,
    pub index_offset: usize,
    pub vertex_length: usize,
    pub index_length: usize,
    pub sort_key: f64,
}

/// One rendered occurrence of a symbol: a run of quad vertices plus the
/// ranges into the shared line-vertex and glyph-offset arrays needed to
/// re-project it each frame.
#[derive(Clone, Debug)]
pub struct PlacedSymbol {
    pub anchor_point: Point2D<f64, TileSpace>,
    /// Anchor segment, relative to the symbol's line-vertex range.
    pub segment: usize,
    pub lower_size: f64,
    pub upper_size: f64,
    pub line_offset: [f64; 2],
    pub writing_modes: WritingModes,
    pub line_start_index: usize,
    pub line_length: usize,
    pub glyph_start_index: usize,
    pub glyph_count: usize,
    pub vertex_start_index: usize,
    /// Toggled by external Placement; hidden symbols keep their buffer
    /// slots so layouts stay stable.
    pub hidden: bool,
    pub angle: f64,
    /// Which orientation variant Placement chose, when the layer
    /// supports both.
    pub placed_orientation: Option<TextWritingModeType>,
    /// Filled on the foreground for variable text anchors only.
    pub cross_tile_id: u32,
    /// Reference to the placed icon, for text symbols whose icon moves
    /// with icon-text-fit.
    pub placed_icon_index: Option<usize>,
}

impl PlacedSymbol {
    pub fn line_range(&self) -> Range<usize> {
        self.line_start_index..self.line_start_index + self.line_length
    }

    pub fn glyph_range(&self) -> Range<usize> {
        self.glyph_start_index..self.glyph_start_index + self.glyph_count
    }
}

/// The vertex buffers for one kind of symbol content (text, icon or SDF
/// icon) plus the placed symbols rendered from them.
#[derive(Default)]
pub struct SymbolBucketBuffer {
    pub vertices: SymbolVertexArray,
    pub dynamic_vertices: DynamicVertexArray,
    pub opacity_vertices: OpacityVertexArray,
    pub triangles: TriangleIndexArray,
    pub segments: Vec<Segment>,
    pub placed_symbols: Vec<PlacedSymbol>,
}

impl SymbolBucketBuffer {
    pub fn has_data(&self) -> bool {
        !self.vertices.is_empty()
    }

    /// Freeze everything except the per-frame dynamic vertices and the
    /// opacity buffer Placement keeps writing.
    pub fn mark_transferred(&mut self) {
        self.vertices.mark_transferred();
        self.triangles.mark_transferred();
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.dynamic_vertices.clear();
        self.opacity_vertices.clear();
        self.triangles.clear();
        self.segments.clear();
        self.placed_symbols.clear();
    }
}

/// Per-tile, per-symbol-layer container of everything layout produced.
#[derive(Default)]
pub struct SymbolBucket {
    pub bucket_leader_id: String,
    /// Assigned by the cross-tile index; 0 means "not yet registered".
    pub bucket_instance_id: u32,
    pub zoom: f64,
    pub tile_pixel_ratio: f64,

    pub icons_need_linear: bool,
    pub sort_features_by_y: bool,
    pub allow_vertical_placement: bool,
    pub placement_modes: Vec<TextWritingModeType>,
    pub icons_in_text: bool,
    /// Set when a tile reload replaced this bucket, so Placement knows
    /// to transfer fade state instead of starting fresh.
    pub just_reloaded: bool,

    pub symbol_instances: Vec<SymbolInstance>,
    pub sort_key_ranges: Vec<SortKeyRange>,

    pub text: SymbolBucketBuffer,
    pub icon: SymbolBucketBuffer,
    pub sdf_icon: SymbolBucketBuffer,

    /// Line-vertex trails shared by all placed symbols of the bucket.
    pub line_vertices: LineVertexArray,
    /// Along-line glyph offsets shared by all placed symbols.
    pub glyph_offsets: GlyphOffsetArray,

    pub collision_boxes: CollisionBoxArray,
}

impl SymbolBucket {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bucket_leader_id: String,
        zoom: f64,
        tile_pixel_ratio: f64,
        icons_need_linear: bool,
        sort_features_by_y: bool,
        allow_vertical_placement: bool,
        placement_modes: Vec<TextWritingModeType>,
        icons_in_text: bool,
    ) -> Self {
        Self {
            bucket_leader_id,
            bucket_instance_id: 0,
            zoom,
            tile_pixel_ratio,
            icons_need_linear,
            sort_features_by_y,
            allow_vertical_placement,
            placement_modes,
            icons_in_text,
            ..Self::default()
        }
    }

    pub fn has_data(&self) -> bool {
        self.has_text_data() || self.has_icon_data() || self.has_sdf_icon_data()
    }

    pub fn has_text_data(&self) -> bool {
        self.text.has_data()
    }

    pub fn has_icon_data(&self) -> bool {
        self.icon.has_data()
    }

    pub fn has_sdf_icon_data(&self) -> bool {
        self.sdf_icon.has_data()
    }

    /// Hand the static buffers to the upload path. Dynamic vertices and
    /// opacity vertices stay mutable for the projector and Placement.
    pub fn mark_transferred(&mut self) {
        self.text.mark_transferred();
        self.icon.mark_transferred();
        self.sdf_icon.mark_transferred();
        self.line_vertices.mark_transferred();
        self.glyph_offsets.mark_transferred();
        self.collision_boxes.mark_transferred();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.icon.clear();
        self.sdf_icon.clear();
        self.line_vertices.clear();
        self.glyph_offsets.clear();
        self.symbol_instances.clear();
        self.sort_key_ranges.clear();
    }

    /// Re-project the text buffer's line-following labels for this
    /// frame.
    pub fn update_text_line_labels(&mut self, frame: &FrameState) {
        projection::update_line_labels(
            &mut self.text,
            &self.line_vertices,
            &self.glyph_offsets,
            frame,
        );
    }

    /// Re-project the icon buffers' line-following icons for this
    /// frame.
    pub fn update_icon_line_labels(&mut self, frame: &FrameState) {
        projection::update_line_labels(
            &mut self.icon,
            &self.line_vertices,
            &self.glyph_offsets,
            frame,
        );
        projection::update_line_labels(
            &mut self.sdf_icon,
            &self.line_vertices,
            &self.glyph_offsets,
            frame,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_layouts_are_stable() {
        // 11 f32 fields, 2 u16, 1 u8 padded to 4-byte alignment.
        assert_eq!(SymbolVertexArray::record_size(), 52);
        assert_eq!(DynamicVertexArray::record_size(), 12);
        assert_eq!(OpacityVertexArray::record_size(), 8);
        assert_eq!(LineVertexArray::record_size(), 8);
        assert_eq!(GlyphOffsetArray::record_size(), 4);
        assert_eq!(TriangleIndexArray::record_size(), 6);
    }

    #[test]
    fn line_vertex_roundtrip() {
        let mut array = LineVertexArray::new();
        array.emplace_back(&LineVertex {
            x: -120,
            y: 4000,
            tile_unit_distance_from_anchor: 312.5,
        });
        assert_eq!(
            array.get(0),
            LineVertex {
                x: -120,
                y: 4000,
                tile_unit_distance_from_anchor: 312.5
            }
        );
    }

    #[test]
    fn transfer_keeps_dynamic_vertices_writable() {
        let mut bucket = SymbolBucket::new(
            "layer".to_string(),
            5.0,
            8.0,
            false,
            false,
            false,
            vec![],
            false,
        );
        bucket.text.dynamic_vertices.emplace_back(&DynamicVertex::new(1.0, 2.0, 0.0));
        bucket.mark_transferred();

        assert!(bucket.text.vertices.is_transferred());
        assert!(!bucket.text.dynamic_vertices.is_transferred());
        // The projector keeps rewriting positions after transfer.
        bucket
            .text
            .dynamic_vertices
            .emplace(0, &DynamicVertex::new(9.0, 9.0, 0.5));
        assert_eq!(bucket.text.dynamic_vertices.get(0).x, 9.0);
    }
}
