//! Per-frame projection of line-following labels.
//!
//! Once per animation frame, every non-hidden line-following placed
//! symbol is projected into label space: the anchor is culled against a
//! padded viewport, then the line-vertex trail is walked outward from
//! the anchor in both directions until each glyph's along-line offset
//! is reached. Culled or failed labels write an off-screen sentinel for
//! every glyph so the buffer layout never changes. The projector is the
//! sole writer of the dynamic vertex arrays.

use std::collections::HashMap;
use std::f64::consts::PI;

use cgmath::Matrix4;
use cgmath::Vector4;
use euclid::Point2D;

use crate::{
    bucket::symbol_bucket::{
        DynamicVertex, DynamicVertexArray, GlyphOffsetArray, LineVertexArray, PlacedSymbol,
        SymbolBucketBuffer,
    },
    glyph::WritingModes,
    util::{math::perp, ONE_EM},
    ScreenSpace, TileSpace,
};

/// A projected point with its signed distance from the camera plane.
pub type PointAndCameraDistance = (Point2D<f64, ScreenSpace>, f64);

/// Label-plane projections already computed this frame, keyed by line
/// vertex index. Valid for one placed symbol within one frame.
pub type ProjectionCache = HashMap<usize, Point2D<f64, ScreenSpace>>;

/// The matrices and viewport state for one frame.
pub struct FrameState {
    /// Tile to clip coordinates, for visibility culling.
    pub pos_matrix: Matrix4<f64>,
    /// Tile to label-plane coordinates.
    pub label_plane_matrix: Matrix4<f64>,
    /// Label-plane to clip coordinates, for orientation decisions.
    pub gl_coord_matrix: Matrix4<f64>,
    pub width: f64,
    pub height: f64,
    pub camera_to_center_distance: f64,
    pub pitch_with_map: bool,
    pub keep_upright: bool,
}

pub fn project<U>(point: Point2D<f64, U>, matrix: &Matrix4<f64>) -> PointAndCameraDistance {
    let pos = matrix * Vector4::new(point.x, point.y, 0.0, 1.0);
    (Point2D::new(pos.x / pos.w, pos.y / pos.w), pos.w)
}

pub struct TileDistance {
    pub prev_tile_distance: f64,
    pub last_segment_viewport_distance: f64,
}

pub struct PlacedGlyph {
    pub point: Point2D<f64, ScreenSpace>,
    pub angle: f64,
    pub tile_distance: Option<TileDistance>,
}

#[derive(PartialEq, Eq, Debug)]
enum PlacementStatus {
    Placed,
    NotEnoughRoom,
    NeedsFlipping,
    UseVertical,
}

/// Update the dynamic vertices of every placed symbol in `buffer` for
/// this frame. Symbols are visited in buffer order, so the rebuilt
/// dynamic array always matches the static vertex layout.
pub fn update_line_labels(
    buffer: &mut SymbolBucketBuffer,
    line_vertices: &LineVertexArray,
    glyph_offsets: &GlyphOffsetArray,
    frame: &FrameState,
) {
    let SymbolBucketBuffer {
        placed_symbols,
        dynamic_vertices,
        ..
    } = buffer;
    dynamic_vertices.clear();

    // The viewport padded by half a tile, in clip units.
    let clipping_buffer = [
        256.0 / frame.width * 2.0 + 1.0,
        256.0 / frame.height * 2.0 + 1.0,
    ];
    let aspect_ratio = frame.width / frame.height;

    let mut use_vertical = false;

    for symbol in placed_symbols.iter() {
        // A vertical variant immediately follows its horizontal
        // sibling and renders only when that sibling asked for it.
        if symbol.hidden
            || (symbol.writing_modes == WritingModes::VERTICAL && !use_vertical)
            || symbol.glyph_count == 0
        {
            hide_glyphs(symbol.glyph_count, dynamic_vertices);
            continue;
        }
        use_vertical = false;

        let anchor_pos = frame.pos_matrix
            * Vector4::new(symbol.anchor_point.x, symbol.anchor_point.y, 0.0, 1.0);

        // Don't bother calculating positions for invisible labels.
        if !is_visible(&anchor_pos, &clipping_buffer) {
            hide_glyphs(symbol.glyph_count, dynamic_vertices);
            continue;
        }

        let camera_to_anchor_distance = anchor_pos.w;
        let perspective_ratio =
            0.5 + 0.5 * (camera_to_anchor_distance / frame.camera_to_center_distance);
        let font_size = symbol.lower_size;
        let pitch_scaled_font_size = if frame.pitch_with_map {
            font_size * perspective_ratio
        } else {
            font_size / perspective_ratio
        };

        let tile_anchor_point = symbol.anchor_point;
        let anchor_point = project(tile_anchor_point, &frame.label_plane_matrix).0;
        let mut cache = ProjectionCache::new();

        let unflipped = place_glyphs_along_line(
            symbol,
            pitch_scaled_font_size,
            false,
            frame,
            glyph_offsets,
            line_vertices,
            dynamic_vertices,
            anchor_point,
            tile_anchor_point,
            &mut cache,
            aspect_ratio,
        );

        use_vertical = unflipped == PlacementStatus::UseVertical;
        let hidden = match unflipped {
            PlacementStatus::Placed => false,
            PlacementStatus::NotEnoughRoom | PlacementStatus::UseVertical => true,
            PlacementStatus::NeedsFlipping => {
                place_glyphs_along_line(
                    symbol,
                    pitch_scaled_font_size,
                    true,
                    frame,
                    glyph_offsets,
                    line_vertices,
                    dynamic_vertices,
                    anchor_point,
                    tile_anchor_point,
                    &mut cache,
                    aspect_ratio,
                ) != PlacementStatus::Placed
            }
        };
        if hidden {
            hide_glyphs(symbol.glyph_count, dynamic_vertices);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn place_glyphs_along_line(
    symbol: &PlacedSymbol,
    font_size: f64,
    flip: bool,
    frame: &FrameState,
    glyph_offsets: &GlyphOffsetArray,
    line_vertices: &LineVertexArray,
    dynamic_vertices: &mut DynamicVertexArray,
    anchor_point: Point2D<f64, ScreenSpace>,
    tile_anchor_point: Point2D<f64, TileSpace>,
    cache: &mut ProjectionCache,
    aspect_ratio: f64,
) -> PlacementStatus {
    let font_scale = font_size / ONE_EM;
    let line_offset_x = symbol.line_offset[0] * font_scale;
    let line_offset_y = symbol.line_offset[1] * font_scale;

    let mut placed_glyphs: Vec<PlacedGlyph> = Vec::with_capacity(symbol.glyph_count);
    if symbol.glyph_count > 1 {
        // The first and the last glyph decide the label's overall
        // orientation; once both fit, everything between fits too.
        let Some((first, last)) = place_first_and_last_glyph(
            font_scale,
            glyph_offsets,
            line_offset_x,
            line_offset_y,
            flip,
            anchor_point,
            tile_anchor_point,
            symbol,
            line_vertices,
            &frame.label_plane_matrix,
            cache,
            false,
        ) else {
            return PlacementStatus::NotEnoughRoom;
        };

        if frame.keep_upright && !flip {
            let first_point = project(first.point, &frame.gl_coord_matrix).0;
            let last_point = project(last.point, &frame.gl_coord_matrix).0;
            if let Some(status) = requires_orientation_change(
                symbol.writing_modes,
                &first_point,
                &last_point,
                aspect_ratio,
            ) {
                return status;
            }
        }

        placed_glyphs.push(first);
        let glyph_end_index = symbol.glyph_start_index + symbol.glyph_count;
        for glyph_index in symbol.glyph_start_index + 1..glyph_end_index - 1 {
            let offset_x = glyph_offsets.get(glyph_index).offset_x;
            let glyph = place_glyph_along_line(
                font_scale * offset_x,
                line_offset_x,
                line_offset_y,
                flip,
                &anchor_point,
                &tile_anchor_point,
                symbol,
                line_vertices,
                &frame.label_plane_matrix,
                cache,
                false,
            )
            .expect("glyphs between the first and last fit");
            placed_glyphs.push(glyph);
        }
        placed_glyphs.push(last);
    } else {
        // A single glyph flips based on the projected angle of the
        // segment it sits on.
        if frame.keep_upright && !flip {
            let a = project(tile_anchor_point, &frame.pos_matrix).0;
            let tile_vertex_index = symbol.line_start_index + symbol.segment + 1;
            let vertex = line_vertices.get(tile_vertex_index);
            let tile_segment_end =
                Point2D::<f64, TileSpace>::new(vertex.x as f64, vertex.y as f64);
            let projected_vertex = project(tile_segment_end, &frame.pos_matrix);
            // The anchor is visible, but the segment end may sit behind
            // the camera plane; any closer point along the segment
            // gives the same angle.
            let b = if projected_vertex.1 > 0.0 {
                projected_vertex.0
            } else {
                project_truncated_line_segment(
                    &tile_anchor_point,
                    &tile_segment_end,
                    &a,
                    1.0,
                    &frame.pos_matrix,
                )
            };
            if let Some(status) =
                requires_orientation_change(symbol.writing_modes, &a, &b, aspect_ratio)
            {
                return status;
            }
        }

        let offset_x = glyph_offsets.get(symbol.glyph_start_index).offset_x;
        let Some(glyph) = place_glyph_along_line(
            font_scale * offset_x,
            line_offset_x,
            line_offset_y,
            flip,
            &anchor_point,
            &tile_anchor_point,
            symbol,
            line_vertices,
            &frame.label_plane_matrix,
            cache,
            false,
        ) else {
            return PlacementStatus::NotEnoughRoom;
        };
        placed_glyphs.push(glyph);
    }

    for glyph in &placed_glyphs {
        add_dynamic_attributes(dynamic_vertices, glyph.point, glyph.angle);
    }
    PlacementStatus::Placed
}

/// Place the first and last glyph of a label. Also used by external
/// Placement to bound the collision circles a line label covers.
#[allow(clippy::too_many_arguments)]
pub fn place_first_and_last_glyph(
    font_scale: f64,
    glyph_offsets: &GlyphOffsetArray,
    line_offset_x: f64,
    line_offset_y: f64,
    flip: bool,
    anchor_point: Point2D<f64, ScreenSpace>,
    tile_anchor_point: Point2D<f64, TileSpace>,
    symbol: &PlacedSymbol,
    line_vertices: &LineVertexArray,
    label_plane_matrix: &Matrix4<f64>,
    cache: &mut ProjectionCache,
    return_tile_distance: bool,
) -> Option<(PlacedGlyph, PlacedGlyph)> {
    if symbol.glyph_count == 0 {
        return None;
    }
    let first_offset = glyph_offsets.get(symbol.glyph_start_index).offset_x;
    let last_offset = glyph_offsets
        .get(symbol.glyph_start_index + symbol.glyph_count - 1)
        .offset_x;

    let first = place_glyph_along_line(
        font_scale * first_offset,
        line_offset_x,
        line_offset_y,
        flip,
        &anchor_point,
        &tile_anchor_point,
        symbol,
        line_vertices,
        label_plane_matrix,
        cache,
        return_tile_distance,
    )?;
    let last = place_glyph_along_line(
        font_scale * last_offset,
        line_offset_x,
        line_offset_y,
        flip,
        &anchor_point,
        &tile_anchor_point,
        symbol,
        line_vertices,
        label_plane_matrix,
        cache,
        return_tile_distance,
    )?;
    Some((first, last))
}

#[allow(clippy::too_many_arguments)]
fn place_glyph_along_line(
    offset_x: f64,
    line_offset_x: f64,
    line_offset_y: f64,
    flip: bool,
    anchor_point: &Point2D<f64, ScreenSpace>,
    tile_anchor_point: &Point2D<f64, TileSpace>,
    symbol: &PlacedSymbol,
    line_vertices: &LineVertexArray,
    label_plane_matrix: &Matrix4<f64>,
    cache: &mut ProjectionCache,
    return_tile_distance: bool,
) -> Option<PlacedGlyph> {
    let combined_offset_x = if flip {
        offset_x - line_offset_x
    } else {
        offset_x + line_offset_x
    };

    let mut dir: i64 = if combined_offset_x > 0.0 { 1 } else { -1 };

    let mut angle = 0.0;
    if flip {
        // The label is flipped to keep the text upright; iterate the
        // line in the reverse direction.
        dir *= -1;
        angle = PI;
    }
    if dir < 0 {
        angle += PI;
    }

    let line_start_index = symbol.line_start_index as i64;
    let line_end_index = (symbol.line_start_index + symbol.line_length) as i64;
    let mut current_index = if dir > 0 {
        line_start_index + symbol.segment as i64
    } else {
        line_start_index + symbol.segment as i64 + 1
    };
    let initial_index = current_index;

    let mut current = *anchor_point;
    let mut prev = *anchor_point;
    let mut distance_to_prev = 0.0;
    let mut current_segment_distance = 0.0;
    let abs_offset_x = combined_offset_x.abs();

    while distance_to_prev + current_segment_distance <= abs_offset_x {
        current_index += dir;

        // The offset does not fit on the projected line.
        if current_index < line_start_index || current_index >= line_end_index {
            return None;
        }

        prev = current;
        current = match cache.get(&(current_index as usize)) {
            Some(point) => *point,
            None => {
                let vertex = line_vertices.get(current_index as usize);
                let vertex_point =
                    Point2D::<f64, TileSpace>::new(vertex.x as f64, vertex.y as f64);
                let projection = project(vertex_point, label_plane_matrix);
                if projection.1 > 0.0 {
                    cache.insert(current_index as usize, projection.0);
                    projection.0
                } else {
                    // The vertex is behind the camera plane, so it
                    // cannot be projected; substitute a synthetic point
                    // along the segment tangent far enough to cover the
                    // glyph. Not cached, because a later glyph on the
                    // same segment may need a farther point.
                    let previous_tile_point = if distance_to_prev == 0.0 {
                        *tile_anchor_point
                    } else {
                        let prev_vertex = line_vertices.get((current_index - dir) as usize);
                        Point2D::new(prev_vertex.x as f64, prev_vertex.y as f64)
                    };
                    project_truncated_line_segment(
                        &previous_tile_point,
                        &vertex_point,
                        &prev,
                        abs_offset_x - distance_to_prev + 1.0,
                        label_plane_matrix,
                    )
                }
            }
        };

        distance_to_prev += current_segment_distance;
        current_segment_distance = prev.distance_to(current);
    }

    // The target point lies on the current segment; interpolate.
    let segment_t = (abs_offset_x - distance_to_prev) / current_segment_distance;
    let prev_to_current = current - prev;
    let mut point = prev + prev_to_current * segment_t;

    // Shift off the line by the perpendicular text/icon offset.
    point += perp(&prev_to_current) * (line_offset_y * dir as f64 / prev_to_current.length());

    let segment_angle = angle + (current.y - prev.y).atan2(current.x - prev.x);

    Some(PlacedGlyph {
        point,
        angle: segment_angle,
        tile_distance: return_tile_distance.then(|| TileDistance {
            prev_tile_distance: if current_index - dir == initial_index {
                0.0
            } else {
                line_vertices
                    .get((current_index - dir) as usize)
                    .tile_unit_distance_from_anchor
            },
            last_segment_viewport_distance: abs_offset_x - distance_to_prev,
        }),
    })
}

fn project_truncated_line_segment(
    previous_tile_point: &Point2D<f64, TileSpace>,
    current_tile_point: &Point2D<f64, TileSpace>,
    previous_projected_point: &Point2D<f64, ScreenSpace>,
    minimum_length: f64,
    projection_matrix: &Matrix4<f64>,
) -> Point2D<f64, ScreenSpace> {
    // "previous_tile_point" is assumed to project farther than one unit
    // from the camera plane; a label stretching from the viewport to
    // the camera plane could not render anyway.
    let tangent = *previous_tile_point - *current_tile_point;
    let unit = tangent.try_normalize().unwrap_or(tangent);
    let projected_unit_vertex = project(*previous_tile_point + unit, projection_matrix).0;
    let projected_unit_segment = *previous_projected_point - projected_unit_vertex;
    *previous_projected_point
        + projected_unit_segment * (minimum_length / projected_unit_segment.length())
}

fn requires_orientation_change(
    writing_modes: WritingModes,
    first: &Point2D<f64, ScreenSpace>,
    last: &Point2D<f64, ScreenSpace>,
    aspect_ratio: f64,
) -> Option<PlacementStatus> {
    if writing_modes == WritingModes::HORIZONTAL | WritingModes::VERTICAL {
        // This symbol has a vertical alternative. Deciding between the
        // two from the projected first/last glyphs keeps the choice
        // consistent even when the projections differ slightly.
        let rise = (last.y - first.y).abs();
        let run = (last.x - first.x).abs() * aspect_ratio;
        if rise > run {
            return Some(PlacementStatus::UseVertical);
        }
    }
    let backwards = if writing_modes == WritingModes::VERTICAL {
        first.y < last.y
    } else {
        // Includes the horizontal-only case of labels with no vertical
        // glyphs.
        first.x > last.x
    };
    if backwards {
        return Some(PlacementStatus::NeedsFlipping);
    }
    None
}

fn is_visible(anchor_pos: &Vector4<f64>, clipping_buffer: &[f64; 2]) -> bool {
    let x = anchor_pos.x / anchor_pos.w;
    let y = anchor_pos.y / anchor_pos.w;
    let in_padded_viewport = x >= -clipping_buffer[0]
        && x <= clipping_buffer[0]
        && y >= -clipping_buffer[1]
        && y <= clipping_buffer[1];
    in_padded_viewport && anchor_pos.w > 0.0
}

fn add_dynamic_attributes(
    dynamic_vertices: &mut DynamicVertexArray,
    point: Point2D<f64, ScreenSpace>,
    angle: f64,
) {
    let vertex = DynamicVertex::new(point.x, point.y, angle);
    for _ in 0..4 {
        dynamic_vertices.emplace_back(&vertex);
    }
}

/// Hidden labels keep their slots so the buffer layout stays stable.
fn hide_glyphs(glyph_count: usize, dynamic_vertices: &mut DynamicVertexArray) {
    let offscreen = Point2D::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for _ in 0..glyph_count {
        add_dynamic_attributes(dynamic_vertices, offscreen, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use cgmath::SquareMatrix;

    use super::*;
    use crate::bucket::symbol_bucket::{GlyphOffset, LineVertex};

    fn frame(pos_scale: f64, keep_upright: bool) -> FrameState {
        FrameState {
            pos_matrix: Matrix4::from_scale(pos_scale),
            label_plane_matrix: Matrix4::identity(),
            gl_coord_matrix: Matrix4::identity(),
            width: 1000.0,
            height: 1000.0,
            camera_to_center_distance: 1.0,
            pitch_with_map: false,
            keep_upright,
        }
    }

    fn line_symbol(
        buffer: &mut SymbolBucketBuffer,
        line_vertices: &mut LineVertexArray,
        glyph_offsets: &mut GlyphOffsetArray,
        points: &[(i16, i16)],
        anchor: (f64, f64),
        segment: usize,
        offsets: &[f64],
        writing_modes: WritingModes,
    ) {
        let line_start_index = line_vertices.len();
        for (x, y) in points {
            line_vertices.emplace_back(&LineVertex {
                x: *x,
                y: *y,
                tile_unit_distance_from_anchor: 0.0,
            });
        }
        let glyph_start_index = glyph_offsets.len();
        for offset in offsets {
            glyph_offsets.emplace_back(&GlyphOffset { offset_x: *offset });
        }
        buffer.placed_symbols.push(PlacedSymbol {
            anchor_point: Point2D::new(anchor.0, anchor.1),
            segment,
            lower_size: ONE_EM,
            upper_size: ONE_EM,
            line_offset: [0.0, 0.0],
            writing_modes,
            line_start_index,
            line_length: points.len(),
            glyph_start_index,
            glyph_count: offsets.len(),
            vertex_start_index: 0,
            hidden: false,
            angle: 0.0,
            placed_orientation: None,
            cross_tile_id: 0,
            placed_icon_index: None,
        });
    }

    fn straight_line() -> Vec<(i16, i16)> {
        (0..10).map(|i| (i * 100, 0)).collect()
    }

    #[test]
    fn glyphs_land_at_their_along_line_offsets() {
        let mut buffer = SymbolBucketBuffer::default();
        let mut line_vertices = LineVertexArray::new();
        let mut glyph_offsets = GlyphOffsetArray::new();
        line_symbol(
            &mut buffer,
            &mut line_vertices,
            &mut glyph_offsets,
            &straight_line(),
            (450.0, 0.0),
            4,
            &[-30.0, 0.0, 30.0],
            WritingModes::HORIZONTAL,
        );

        update_line_labels(&mut buffer, &line_vertices, &glyph_offsets, &frame(0.001, false));

        // Three glyphs, four vertices each.
        assert_eq!(buffer.dynamic_vertices.len(), 12);
        assert_eq!(buffer.dynamic_vertices.get(0).x, 420.0);
        assert_eq!(buffer.dynamic_vertices.get(4).x, 450.0);
        assert_eq!(buffer.dynamic_vertices.get(8).x, 480.0);
        for i in 0..12 {
            assert_eq!(buffer.dynamic_vertices.get(i).y, 0.0);
        }
    }

    #[test]
    fn culled_symbol_goes_offscreen_but_keeps_its_slots() {
        let mut buffer = SymbolBucketBuffer::default();
        let mut line_vertices = LineVertexArray::new();
        let mut glyph_offsets = GlyphOffsetArray::new();
        line_symbol(
            &mut buffer,
            &mut line_vertices,
            &mut glyph_offsets,
            &straight_line(),
            (450.0, 0.0),
            4,
            &[-30.0, 30.0],
            WritingModes::HORIZONTAL,
        );

        // Identity pos matrix leaves the anchor far outside the padded
        // clip box.
        update_line_labels(&mut buffer, &line_vertices, &glyph_offsets, &frame(1.0, false));

        assert_eq!(buffer.dynamic_vertices.len(), 8);
        for i in 0..8 {
            assert_eq!(buffer.dynamic_vertices.get(i).x, f64::NEG_INFINITY);
        }
    }

    #[test]
    fn hidden_symbol_goes_offscreen() {
        let mut buffer = SymbolBucketBuffer::default();
        let mut line_vertices = LineVertexArray::new();
        let mut glyph_offsets = GlyphOffsetArray::new();
        line_symbol(
            &mut buffer,
            &mut line_vertices,
            &mut glyph_offsets,
            &straight_line(),
            (450.0, 0.0),
            4,
            &[-30.0, 30.0],
            WritingModes::HORIZONTAL,
        );
        buffer.placed_symbols[0].hidden = true;

        update_line_labels(&mut buffer, &line_vertices, &glyph_offsets, &frame(0.001, false));

        assert_eq!(buffer.dynamic_vertices.len(), 8);
        assert_eq!(buffer.dynamic_vertices.get(0).x, f64::NEG_INFINITY);
    }

    #[test]
    fn backwards_label_flips_to_stay_upright() {
        // The line runs right to left, so the unflipped label would
        // read backwards.
        let reversed: Vec<(i16, i16)> = (0..10).map(|i| (1000 - i * 100, 0)).collect();
        let mut buffer = SymbolBucketBuffer::default();
        let mut line_vertices = LineVertexArray::new();
        let mut glyph_offsets = GlyphOffsetArray::new();
        line_symbol(
            &mut buffer,
            &mut line_vertices,
            &mut glyph_offsets,
            &reversed,
            (550.0, 0.0),
            4,
            &[-30.0, 30.0],
            WritingModes::HORIZONTAL,
        );

        update_line_labels(&mut buffer, &line_vertices, &glyph_offsets, &frame(0.001, true));

        // The flipped pass walks the line in reverse: the first glyph
        // lands on the smaller-x side, at an upright angle.
        assert_eq!(buffer.dynamic_vertices.len(), 8);
        let first = buffer.dynamic_vertices.get(0);
        let last = buffer.dynamic_vertices.get(4);
        assert_eq!(first.x, 520.0);
        assert_eq!(last.x, 580.0);
        assert!(first.angle.cos() > 0.99, "angle {} is upright", first.angle);
    }

    #[test]
    fn steep_label_defers_to_its_vertical_variant() {
        // A vertical line: the horizontal variant's rise exceeds its
        // run, so the vertical sibling that follows it renders instead.
        let vertical_line: Vec<(i16, i16)> = (0..10).map(|i| (0, i * 100)).collect();
        let mut buffer = SymbolBucketBuffer::default();
        let mut line_vertices = LineVertexArray::new();
        let mut glyph_offsets = GlyphOffsetArray::new();
        let both = WritingModes::HORIZONTAL | WritingModes::VERTICAL;
        line_symbol(
            &mut buffer,
            &mut line_vertices,
            &mut glyph_offsets,
            &vertical_line,
            (0.0, 450.0),
            4,
            &[-30.0, 30.0],
            both,
        );
        line_symbol(
            &mut buffer,
            &mut line_vertices,
            &mut glyph_offsets,
            &vertical_line,
            (0.0, 450.0),
            4,
            &[-30.0, 30.0],
            WritingModes::VERTICAL,
        );

        update_line_labels(&mut buffer, &line_vertices, &glyph_offsets, &frame(0.001, true));

        assert_eq!(buffer.dynamic_vertices.len(), 16);
        // Horizontal variant hidden, vertical variant placed.
        assert_eq!(buffer.dynamic_vertices.get(0).x, f64::NEG_INFINITY);
        assert!(buffer.dynamic_vertices.get(8).y.is_finite());
    }

    #[test]
    fn label_overrunning_the_line_is_not_placed() {
        let short_line: Vec<(i16, i16)> = vec![(0, 0), (100, 0)];
        let mut buffer = SymbolBucketBuffer::default();
        let mut line_vertices = LineVertexArray::new();
        let mut glyph_offsets = GlyphOffsetArray::new();
        line_symbol(
            &mut buffer,
            &mut line_vertices,
            &mut glyph_offsets,
            &short_line,
            (50.0, 0.0),
            0,
            &[-300.0, 300.0],
            WritingModes::HORIZONTAL,
        );

        update_line_labels(&mut buffer, &line_vertices, &glyph_offsets, &frame(0.001, false));

        assert_eq!(buffer.dynamic_vertices.len(), 8);
        assert_eq!(buffer.dynamic_vertices.get(0).x, f64::NEG_INFINITY);
    }
}
