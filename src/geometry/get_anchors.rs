//! Anchor candidates along line geometry.
//!
//! `get_anchors` resamples a line at the label spacing interval,
//! rejecting candidates whose surrounding geometry turns too sharply
//! for the label to follow. `get_center_anchor` places a single anchor
//! at the line midpoint for `line-center` placement.

use std::collections::VecDeque;
use std::f64::consts::PI;

use euclid::Point2D;

use crate::{
    coords::EXTENT,
    geometry::{
        anchor::{Anchor, Anchors},
        GeometryCoordinates,
    },
    util::math::convert_point_f64,
    TileSpace,
};

fn angle_to(from: Point2D<f64, TileSpace>, to: Point2D<f64, TileSpace>) -> f64 {
    (to.y - from.y).atan2(to.x - from.x)
}

fn angle_window_size(text_left: f64, text_right: f64, glyph_size: f64, box_scale: f64) -> f64 {
    if text_right - text_left != 0.0 {
        3.0 / 5.0 * glyph_size * box_scale
    } else {
        0.0
    }
}

struct Corner {
    distance: f64,
    angle_delta: f64,
}

/// Whether the turn angle accumulated over any `window_size` stretch of
/// line under the label stays below `max_angle`.
fn check_max_angle(
    line: &GeometryCoordinates,
    anchor: &Anchor,
    label_length: f64,
    window_size: f64,
    max_angle: f64,
) -> bool {
    // The anchor segment is always valid for anchors produced here.
    let Some(segment) = anchor.segment else {
        return true;
    };

    let mut index = segment + 1;
    let mut p = anchor.point;
    let mut anchor_distance = 0.0;

    // Walk backwards to the first segment the label covers.
    while anchor_distance > -label_length / 2.0 {
        if index == 0 {
            // The label runs off the start of the line.
            return false;
        }
        index -= 1;
        anchor_distance -= convert_point_f64(&line[index]).distance_to(p);
        p = convert_point_f64(&line[index]);
    }

    anchor_distance += convert_point_f64(&line[index]).distance_to(convert_point_f64(&line[index + 1]));
    index += 1;

    // Recent corners and their running angle total within the window.
    let mut recent_corners: VecDeque<Corner> = VecDeque::new();
    let mut recent_angle_delta = 0.0;

    // Walk forwards over the label length, accumulating turn angles.
    while anchor_distance < label_length / 2.0 {
        if index + 1 >= line.len() {
            // The label runs off the end of the line.
            return false;
        }
        let prev = convert_point_f64(&line[index - 1]);
        let current = convert_point_f64(&line[index]);
        let next = convert_point_f64(&line[index + 1]);

        let mut angle_delta = angle_to(prev, current) - angle_to(current, next);
        // Restrict the delta to -pi..pi, then take its magnitude.
        angle_delta = ((angle_delta + 3.0 * PI) % (2.0 * PI) - PI).abs();

        recent_corners.push_back(Corner {
            distance: anchor_distance,
            angle_delta,
        });
        recent_angle_delta += angle_delta;

        while let Some(oldest) = recent_corners.front() {
            if oldest.distance >= anchor_distance - window_size {
                break;
            }
            recent_angle_delta -= oldest.angle_delta;
            recent_corners.pop_front();
        }

        if recent_angle_delta > max_angle {
            return false;
        }

        index += 1;
        anchor_distance += current.distance_to(next);
    }

    true
}

fn line_length(line: &GeometryCoordinates) -> f64 {
    line.0
        .windows(2)
        .map(|pair| convert_point_f64(&pair[0]).distance_to(convert_point_f64(&pair[1])))
        .sum()
}

#[allow(clippy::too_many_arguments)]
fn resample(
    line: &GeometryCoordinates,
    offset: f64,
    spacing: f64,
    angle_window: f64,
    max_angle: f64,
    label_length: f64,
    continued_line: bool,
    place_at_middle: bool,
) -> Anchors {
    let half_label_length = label_length / 2.0;
    let total_length = line_length(line);

    let mut distance = 0.0;
    let mut marked_distance = offset - spacing;

    let mut anchors = Anchors::new();

    for (i, pair) in line.0.windows(2).enumerate() {
        let a = convert_point_f64(&pair[0]);
        let b = convert_point_f64(&pair[1]);

        let segment_distance = a.distance_to(b);
        let angle = angle_to(a, b);

        while marked_distance + spacing < distance + segment_distance {
            marked_distance += spacing;

            let t = (marked_distance - distance) / segment_distance;
            let x = a.x + (b.x - a.x) * t;
            let y = a.y + (b.y - a.y) * t;

            // Anchors outside the tile or whose label would overrun the
            // line ends are dropped; neighboring tiles own those labels.
            if x >= 0.0
                && x < EXTENT
                && y >= 0.0
                && y < EXTENT
                && marked_distance - half_label_length >= 0.0
                && marked_distance + half_label_length <= total_length
            {
                let anchor = Anchor {
                    point: Point2D::new(x, y),
                    angle,
                    segment: Some(i),
                };
                if angle_window == 0.0
                    || check_max_angle(line, &anchor, label_length, angle_window, max_angle)
                {
                    anchors.push(anchor);
                }
            }
        }

        distance += segment_distance;
    }

    if !place_at_middle && anchors.is_empty() && !continued_line {
        // No anchor fit at the requested spacing. Retry with a single
        // anchor at the middle of the line.
        return resample(
            line,
            distance / 2.0,
            spacing,
            angle_window,
            max_angle,
            label_length,
            continued_line,
            true,
        );
    }

    anchors
}

/// Evenly spaced anchors along a clipped line, respecting the minimum
/// spacing and the maximum cumulative turn angle.
#[allow(clippy::too_many_arguments)]
pub fn get_anchors(
    line: &GeometryCoordinates,
    mut spacing: f64,
    max_angle: f64,
    text_left: f64,
    text_right: f64,
    icon_left: f64,
    icon_right: f64,
    glyph_size: f64,
    box_scale: f64,
    overscaling: f64,
) -> Anchors {
    if line.len() < 2 {
        return Anchors::new();
    }

    let angle_window = angle_window_size(text_left, text_right, glyph_size, box_scale);
    let shape_size = (text_right - text_left).max(icon_right - icon_left);
    let label_length = shape_size * box_scale;

    // Is the line continued from outside the tile boundary?
    let first = line.first().expect("checked length above");
    let continued_line = first.x == 0
        || first.x as f64 == EXTENT
        || first.y == 0
        || first.y as f64 == EXTENT;

    // Labels long relative to the spacing still get a minimum gap of a
    // quarter spacing between label edges.
    if spacing - label_length < spacing / 4.0 {
        spacing = label_length + spacing / 4.0;
    }

    // Offset the first anchor by half the label length (plus a fixed
    // extra), so the label edge starts near the line start; continued
    // lines instead shift by half the spacing so anchors alternate
    // across the tile seam instead of clustering on it.
    let fixed_extra_offset = glyph_size * 2.0;
    let offset = if !continued_line {
        ((label_length / 2.0 + fixed_extra_offset) * box_scale * overscaling) % spacing
    } else {
        (spacing / 2.0 * overscaling) % spacing
    };

    resample(
        line,
        offset,
        spacing,
        angle_window,
        max_angle,
        label_length,
        continued_line,
        false,
    )
}

/// The single `line-center` anchor: the midpoint of the line, if the
/// geometry under the label passes the angle check there.
#[allow(clippy::too_many_arguments)]
pub fn get_center_anchor(
    line: &GeometryCoordinates,
    max_angle: f64,
    text_left: f64,
    text_right: f64,
    icon_left: f64,
    icon_right: f64,
    glyph_size: f64,
    box_scale: f64,
) -> Option<Anchor> {
    if line.len() < 2 {
        return None;
    }

    let angle_window = angle_window_size(text_left, text_right, glyph_size, box_scale);
    let shape_size = (text_right - text_left).max(icon_right - icon_left);
    let label_length = shape_size * box_scale;

    let center_distance = line_length(line) / 2.0;
    let mut prev_distance = 0.0;

    for (i, pair) in line.0.windows(2).enumerate() {
        let a = convert_point_f64(&pair[0]);
        let b = convert_point_f64(&pair[1]);

        let segment_distance = a.distance_to(b);
        if prev_distance + segment_distance > center_distance {
            let t = (center_distance - prev_distance) / segment_distance;
            let anchor = Anchor {
                point: Point2D::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t),
                angle: angle_to(a, b),
                segment: Some(i),
            };
            if angle_window == 0.0
                || check_max_angle(line, &anchor, label_length, angle_window, max_angle)
            {
                return Some(anchor);
            }
            return None;
        }
        prev_distance += segment_distance;
    }

    None
}
