//! Collision geometry per placed label.
//!
//! Every symbol instance owns a run of boxes in the tile's shared
//! [`CollisionBoxArray`]; point labels contribute one rectangle, line
//! labels a chain of circles walked out along the line. The array is
//! append-only for the lifetime of the tile, and external Placement
//! reads it by `(start, end)` ranges kept on the instances.

use std::ops::Range;

use euclid::{Point2D, Vector2D};

use crate::{
    buffer::{Field, FieldKind, RecordReader, RecordWriter, StructArray, StructRecord},
    geometry::{anchor::Anchor, GeometryCoordinates},
    glyph::Shaping,
    shaping::{Padding, PositionedIcon},
    style_types::SymbolPlacementType,
    util::math::{convert_point_f64, convert_point_i16, deg2radf, rotate, MinMax},
    TileSpace,
};

/// Identifies the feature a collision box belongs to, so Placement can
/// map hits back to source data.
#[derive(Clone, Copy, Default, Debug)]
pub struct IndexedSubfeature {
    pub feature_index: u32,
    pub source_layer_index: u16,
    pub bucket_index: u16,
}

/// One collision shape: a rectangle, or a circle when `radius > 0`.
/// `x1..y2` are distances from the anchor to the edges.
#[derive(Clone, Copy, Default, Debug)]
pub struct CollisionBox {
    pub anchor: Point2D<f64, TileSpace>,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub radius: f64,
    /// For circle chains, how far along the line this circle sits; lets
    /// Placement drop circles past the rendered label length.
    pub signed_distance_from_anchor: f64,
    pub feature_index: u32,
    pub source_layer_index: u16,
    pub bucket_index: u16,
}

impl StructRecord for CollisionBox {
    const FIELDS: &'static [Field] = &[
        Field { name: "anchor_x", kind: FieldKind::F32 },
        Field { name: "anchor_y", kind: FieldKind::F32 },
        Field { name: "x1", kind: FieldKind::F32 },
        Field { name: "y1", kind: FieldKind::F32 },
        Field { name: "x2", kind: FieldKind::F32 },
        Field { name: "y2", kind: FieldKind::F32 },
        Field { name: "radius", kind: FieldKind::F32 },
        Field { name: "signed_distance", kind: FieldKind::F32 },
        Field { name: "feature_index", kind: FieldKind::U32 },
        Field { name: "source_layer_index", kind: FieldKind::U16 },
        Field { name: "bucket_index", kind: FieldKind::U16 },
    ];

    fn pack(&self, w: &mut RecordWriter<'_>) {
        w.f32(self.anchor.x as f32);
        w.f32(self.anchor.y as f32);
        w.f32(self.x1 as f32);
        w.f32(self.y1 as f32);
        w.f32(self.x2 as f32);
        w.f32(self.y2 as f32);
        w.f32(self.radius as f32);
        w.f32(self.signed_distance_from_anchor as f32);
        w.u32(self.feature_index);
        w.u16(self.source_layer_index);
        w.u16(self.bucket_index);
    }

    fn unpack(r: &mut RecordReader<'_>) -> Self {
        Self {
            anchor: Point2D::new(r.f32() as f64, r.f32() as f64),
            x1: r.f32() as f64,
            y1: r.f32() as f64,
            x2: r.f32() as f64,
            y2: r.f32() as f64,
            radius: r.f32() as f64,
            signed_distance_from_anchor: r.f32() as f64,
            feature_index: r.u32(),
            source_layer_index: r.u16(),
            bucket_index: r.u16(),
        }
    }
}

impl CollisionBox {
    pub fn is_circle(&self) -> bool {
        self.radius > 0.0
    }
}

pub type CollisionBoxArray = StructArray<CollisionBox>;

/// A symbol instance's share of the collision box array.
#[derive(Clone, Copy, Debug)]
pub struct CollisionFeature {
    pub box_start_index: usize,
    pub box_end_index: usize,
    pub along_line: bool,
}

impl CollisionFeature {
    #[allow(clippy::too_many_arguments)]
    pub fn new_from_text(
        boxes: &mut CollisionBoxArray,
        line: &GeometryCoordinates,
        anchor: &Anchor,
        shaped_text: &Shaping,
        box_scale: f64,
        padding: f64,
        placement: SymbolPlacementType,
        indexed_feature: IndexedSubfeature,
        overscaling: f64,
        rotate: f64,
    ) -> Self {
        Self::new(
            boxes,
            line,
            anchor,
            shaped_text.top,
            shaped_text.bottom,
            shaped_text.left,
            shaped_text.right,
            None,
            box_scale,
            padding,
            placement,
            indexed_feature,
            overscaling,
            rotate,
        )
    }

    // Icon collision features are always placed as points: the feature
    // stays viewport-rotation-aligned even for map-aligned icons, which
    // is close enough for roughly square icons.
    #[allow(clippy::too_many_arguments)]
    pub fn new_from_icon(
        boxes: &mut CollisionBoxArray,
        line: &GeometryCoordinates,
        anchor: &Anchor,
        shaped_icon: Option<&PositionedIcon>,
        box_scale: f64,
        padding: f64,
        indexed_feature: IndexedSubfeature,
        rotate: f64,
    ) -> Self {
        Self::new(
            boxes,
            line,
            anchor,
            shaped_icon.map_or(0.0, |icon| icon.top),
            shaped_icon.map_or(0.0, |icon| icon.bottom),
            shaped_icon.map_or(0.0, |icon| icon.left),
            shaped_icon.map_or(0.0, |icon| icon.right),
            shaped_icon.map(|icon| icon.collision_padding),
            box_scale,
            padding,
            SymbolPlacementType::Point,
            indexed_feature,
            1.0,
            rotate,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn new(
        boxes: &mut CollisionBoxArray,
        line: &GeometryCoordinates,
        anchor: &Anchor,
        top: f64,
        bottom: f64,
        left: f64,
        right: f64,
        collision_padding: Option<Padding>,
        box_scale: f64,
        padding: f64,
        placement: SymbolPlacementType,
        indexed_feature: IndexedSubfeature,
        overscaling: f64,
        rotate_degrees: f64,
    ) -> Self {
        let box_start_index = boxes.len();
        let mut feature = Self {
            box_start_index,
            box_end_index: box_start_index,
            along_line: placement != SymbolPlacementType::Point,
        };

        if top == 0.0 && bottom == 0.0 && left == 0.0 && right == 0.0 {
            return feature;
        }

        let mut y1 = top * box_scale - padding;
        let mut y2 = bottom * box_scale + padding;
        let mut x1 = left * box_scale - padding;
        let mut x2 = right * box_scale + padding;

        if let Some(collision_padding) = collision_padding {
            x1 -= collision_padding.left * box_scale;
            y1 -= collision_padding.top * box_scale;
            x2 += collision_padding.right * box_scale;
            y2 += collision_padding.bottom * box_scale;
        }

        if feature.along_line {
            let mut height = y2 - y1;
            let length = x2 - x1;

            if height > 0.0 {
                height = (10.0 * box_scale).max(height);
                feature.bboxify_label(
                    boxes,
                    line,
                    &convert_point_i16(&anchor.point),
                    anchor.segment.unwrap_or(0),
                    length,
                    height,
                    overscaling,
                    indexed_feature,
                );
            }
        } else if rotate_degrees != 0.0 {
            // Account for *-rotate in point collision boxes. The grid
            // needs an axis-aligned shape, so store the envelope of the
            // rotated box (large for wide labels rotated 45 degrees).
            let rotate_radians = deg2radf(rotate_degrees);

            let tl = rotate(&Vector2D::<_, TileSpace>::new(x1, y1), rotate_radians);
            let tr = rotate(&Vector2D::<_, TileSpace>::new(x2, y1), rotate_radians);
            let bl = rotate(&Vector2D::<_, TileSpace>::new(x1, y2), rotate_radians);
            let br = rotate(&Vector2D::<_, TileSpace>::new(x2, y2), rotate_radians);

            boxes.emplace_back(&CollisionBox {
                anchor: anchor.point,
                x1: [tl.x, tr.x, bl.x, br.x].min_value(),
                y1: [tl.y, tr.y, bl.y, br.y].min_value(),
                x2: [tl.x, tr.x, bl.x, br.x].max_value(),
                y2: [tl.y, tr.y, bl.y, br.y].max_value(),
                radius: 0.0,
                signed_distance_from_anchor: 0.0,
                feature_index: indexed_feature.feature_index,
                source_layer_index: indexed_feature.source_layer_index,
                bucket_index: indexed_feature.bucket_index,
            });
        } else {
            boxes.emplace_back(&CollisionBox {
                anchor: anchor.point,
                x1,
                y1,
                x2,
                y2,
                radius: 0.0,
                signed_distance_from_anchor: 0.0,
                feature_index: indexed_feature.feature_index,
                source_layer_index: indexed_feature.source_layer_index,
                bucket_index: indexed_feature.bucket_index,
            });
        }

        feature.box_end_index = boxes.len();
        feature
    }

    /// Cover a line label with a chain of circles stepped along the
    /// line, extended by pitch-padding circles beyond the label ends so
    /// labels that grow in the distance still collide. Overscaled tiles
    /// pack anchors closer together, so their padding grows slowly with
    /// the overscale factor.
    #[allow(clippy::too_many_arguments)]
    fn bboxify_label(
        &mut self,
        boxes: &mut CollisionBoxArray,
        line: &GeometryCoordinates,
        anchor_point: &Point2D<i16, TileSpace>,
        segment: usize,
        label_length: f64,
        box_size: f64,
        overscaling: f64,
        indexed_feature: IndexedSubfeature,
    ) {
        let step = box_size / 2.0;
        let n_boxes = ((label_length / step).floor() as i32).max(1);

        let overscaling_padding_factor = 1.0 + 0.4 * overscaling.log2();
        let n_pitch_padding_boxes = ((n_boxes as f64 * overscaling_padding_factor / 2.0).floor()) as i32;

        // Offset the first circle by half a box so its edge lines up
        // with the label edge.
        let first_box_offset = -box_size / 2.0;

        let mut p = *anchor_point;
        let mut index = segment + 1;
        let mut anchor_distance = first_box_offset;
        let label_start_distance = -label_length / 2.0;
        let padding_start_distance = label_start_distance - label_length / 8.0;

        // Walk backwards along the line to the first segment the label
        // appears on.
        loop {
            if index == 0 {
                if anchor_distance > label_start_distance {
                    // There isn't room for the label before the line
                    // start; the angle check should have caught this.
                    return;
                }
                break;
            }

            index -= 1;
            anchor_distance -= convert_point_f64(&line[index]).distance_to(convert_point_f64(&p));
            p = line[index];

            if anchor_distance <= padding_start_distance {
                break;
            }
        }

        let mut segment_length =
            convert_point_f64(&line[index]).distance_to(convert_point_f64(&line[index + 1]));

        for i in -n_pitch_padding_boxes..n_boxes + n_pitch_padding_boxes {
            let box_offset = i as f64 * step;
            let mut box_distance_to_anchor = label_start_distance + box_offset;

            // Space the pitch padding circles out wider than the label
            // circles.
            if box_offset < 0.0 {
                box_distance_to_anchor += box_offset;
            }
            if box_offset > label_length {
                box_distance_to_anchor += box_offset - label_length;
            }

            if box_distance_to_anchor < anchor_distance {
                // The line doesn't extend far enough back for this
                // circle.
                continue;
            }

            // Advance to the segment the circle falls on.
            while anchor_distance + segment_length < box_distance_to_anchor {
                anchor_distance += segment_length;
                index += 1;

                // Not enough room before the end of the line.
                if index + 1 >= line.len() {
                    return;
                }

                segment_length = convert_point_f64(&line[index])
                    .distance_to(convert_point_f64(&line[index + 1]));
            }

            let segment_box_distance = box_distance_to_anchor - anchor_distance;
            let p0 = line[index];
            let p1 = line[index + 1];
            let box_anchor = Point2D::new(
                p0.x as f64 + segment_box_distance / segment_length * (p1.x - p0.x) as f64,
                p0.y as f64 + segment_box_distance / segment_length * (p1.y - p0.y) as f64,
            );

            // Circles within one box size of the anchor are always kept
            // so even zero-width labels collide with something; beyond
            // that, record a slightly shrunk distance so Placement errs
            // toward keeping circles.
            let padded_anchor_distance = if (box_distance_to_anchor - first_box_offset).abs() < step {
                0.0
            } else {
                (box_distance_to_anchor - first_box_offset) * 0.8
            };

            boxes.emplace_back(&CollisionBox {
                anchor: box_anchor,
                x1: -box_size / 2.0,
                y1: -box_size / 2.0,
                x2: box_size / 2.0,
                y2: box_size / 2.0,
                radius: box_size / 2.0,
                signed_distance_from_anchor: padded_anchor_distance,
                feature_index: indexed_feature.feature_index,
                source_layer_index: indexed_feature.source_layer_index,
                bucket_index: indexed_feature.bucket_index,
            });
        }
    }

    pub fn box_range(&self) -> Range<usize> {
        self.box_start_index..self.box_end_index
    }

    pub fn box_count(&self) -> usize {
        self.box_end_index - self.box_start_index
    }
}

#[cfg(test)]
mod tests {
    use euclid::Point2D;

    use super::*;
    use crate::geometry::GeometryCoordinate;

    fn shaping(left: f64, right: f64, top: f64, bottom: f64) -> Shaping {
        Shaping {
            left,
            right,
            top,
            bottom,
            ..Default::default()
        }
    }

    fn anchor_at(x: f64, y: f64, segment: Option<usize>) -> Anchor {
        Anchor {
            point: Point2D::new(x, y),
            angle: 0.0,
            segment,
        }
    }

    #[test]
    fn point_label_yields_one_padded_box() {
        let mut boxes = CollisionBoxArray::new();
        let feature = CollisionFeature::new_from_text(
            &mut boxes,
            &GeometryCoordinates::default(),
            &anchor_at(100.0, 100.0, None),
            &shaping(-30.0, 30.0, -10.0, 10.0),
            1.0,
            2.0,
            SymbolPlacementType::Point,
            IndexedSubfeature { feature_index: 7, source_layer_index: 1, bucket_index: 0 },
            1.0,
            0.0,
        );

        assert_eq!(feature.box_count(), 1);
        assert!(!feature.along_line);
        let collision_box = boxes.get(feature.box_start_index);
        assert_eq!(collision_box.x1, -32.0);
        assert_eq!(collision_box.x2, 32.0);
        assert_eq!(collision_box.y1, -12.0);
        assert_eq!(collision_box.y2, 12.0);
        assert_eq!(collision_box.radius, 0.0);
        assert_eq!(collision_box.feature_index, 7);
    }

    #[test]
    fn rotation_stores_the_envelope() {
        let mut boxes = CollisionBoxArray::new();
        let feature = CollisionFeature::new_from_text(
            &mut boxes,
            &GeometryCoordinates::default(),
            &anchor_at(0.0, 0.0, None),
            &shaping(-30.0, 30.0, -10.0, 10.0),
            1.0,
            0.0,
            SymbolPlacementType::Point,
            IndexedSubfeature::default(),
            1.0,
            45.0,
        );

        let collision_box = boxes.get(feature.box_start_index);
        // The rotated 60x20 box needs a wider axis-aligned envelope.
        assert!(collision_box.x2 - collision_box.x1 > 38.0);
        assert!(collision_box.y2 - collision_box.y1 > 38.0);
        assert_eq!(collision_box.x1, -collision_box.x2);
    }

    #[test]
    fn line_label_yields_a_circle_chain() {
        let line = GeometryCoordinates(
            (0..20).map(|i| GeometryCoordinate::new(i * 50, 0)).collect(),
        );
        let mut boxes = CollisionBoxArray::new();
        let feature = CollisionFeature::new_from_text(
            &mut boxes,
            &line,
            &anchor_at(500.0, 0.0, Some(9)),
            &shaping(-100.0, 100.0, -10.0, 10.0),
            1.0,
            0.0,
            SymbolPlacementType::Line,
            IndexedSubfeature::default(),
            1.0,
            0.0,
        );

        assert!(feature.along_line);
        assert!(feature.box_count() > 1);
        for i in feature.box_range() {
            let circle = boxes.get(i);
            assert!(circle.is_circle());
            assert_eq!(circle.anchor.y, 0.0);
        }
    }

    #[test]
    fn empty_shaping_yields_no_boxes() {
        let mut boxes = CollisionBoxArray::new();
        let feature = CollisionFeature::new_from_icon(
            &mut boxes,
            &GeometryCoordinates::default(),
            &anchor_at(0.0, 0.0, None),
            None,
            1.0,
            2.0,
            IndexedSubfeature::default(),
            0.0,
        );
        assert_eq!(feature.box_count(), 0);
        assert!(boxes.is_empty());
    }
}
