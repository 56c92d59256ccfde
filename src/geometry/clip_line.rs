//! Rectangular clipping of multi-lines.
//!
//! Segments are clipped axis by axis against the four box edges, with
//! intersection points rounded back to the integer grid the decoded
//! tile geometry lives on. Consecutive duplicate endpoints collapse so
//! output sub-lines never stutter, and a segment leaving the box ends
//! its sub-line.

use crate::geometry::{GeometryCollection, GeometryCoordinate, GeometryCoordinates};

fn intersect_x(p0: GeometryCoordinate, p1: GeometryCoordinate, x: i16) -> GeometryCoordinate {
    let y = p0.y as f64 + (p1.y - p0.y) as f64 * ((x - p0.x) as f64 / (p1.x - p0.x) as f64);
    GeometryCoordinate::new(x, y.round() as i16)
}

fn intersect_y(p0: GeometryCoordinate, p1: GeometryCoordinate, y: i16) -> GeometryCoordinate {
    let x = p0.x as f64 + (p1.x - p0.x) as f64 * ((y - p0.y) as f64 / (p1.y - p0.y) as f64);
    GeometryCoordinate::new(x.round() as i16, y)
}

/// Clip every line of `lines` to the box `[x1,y1]..[x2,y2]` (minimum
/// edges inclusive, maximum edges exclusive). A line fully inside comes
/// back unchanged; a line weaving in and out produces one sub-line per
/// contiguous run inside the box.
pub fn clip_lines(
    lines: &GeometryCollection,
    x1: i16,
    y1: i16,
    x2: i16,
    y2: i16,
) -> GeometryCollection {
    let mut clipped_lines = GeometryCollection::new();

    for line in lines {
        if line.is_empty() {
            continue;
        }

        let mut current: Option<GeometryCoordinates> = None;
        for window in line.0.windows(2) {
            let mut p0 = window[0];
            let mut p1 = window[1];

            if p0.x < x1 && p1.x < x1 {
                continue;
            } else if p0.x < x1 {
                p0 = intersect_x(p0, p1, x1);
            } else if p1.x < x1 {
                p1 = intersect_x(p0, p1, x1);
            }

            if p0.y < y1 && p1.y < y1 {
                continue;
            } else if p0.y < y1 {
                p0 = intersect_y(p0, p1, y1);
            } else if p1.y < y1 {
                p1 = intersect_y(p0, p1, y1);
            }

            if p0.x >= x2 && p1.x >= x2 {
                continue;
            } else if p0.x >= x2 {
                p0 = intersect_x(p0, p1, x2);
            } else if p1.x >= x2 {
                p1 = intersect_x(p0, p1, x2);
            }

            if p0.y >= y2 && p1.y >= y2 {
                continue;
            } else if p0.y >= y2 {
                p0 = intersect_y(p0, p1, y2);
            } else if p1.y >= y2 {
                p1 = intersect_y(p0, p1, y2);
            }

            match current {
                Some(ref mut sub_line) if *sub_line.last().expect("sub-line is never empty") == p0 => {
                    sub_line.0.push(p1);
                }
                _ => {
                    if let Some(finished) = current.take() {
                        clipped_lines.push(finished);
                    }
                    current = Some(GeometryCoordinates(vec![p0, p1]));
                }
            }
        }
        if let Some(finished) = current.take() {
            clipped_lines.push(finished);
        }
    }

    clipped_lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(points: &[(i16, i16)]) -> GeometryCoordinates {
        GeometryCoordinates(points.iter().map(|(x, y)| GeometryCoordinate::new(*x, *y)).collect())
    }

    #[test]
    fn crossing_line_is_clipped_to_the_boundary() {
        let clipped = clip_lines(&vec![line(&[(-5, 5), (15, 5)])], 0, 0, 10, 10);
        assert_eq!(clipped, vec![line(&[(0, 5), (10, 5)])]);
    }

    #[test]
    fn inside_line_is_unchanged() {
        let input = vec![line(&[(1, 1), (5, 3), (9, 9)])];
        assert_eq!(clip_lines(&input, 0, 0, 10, 10), input);
    }

    #[test]
    fn outside_line_yields_nothing() {
        assert!(clip_lines(&vec![line(&[(20, 20), (30, 25)])], 0, 0, 10, 10).is_empty());
        assert!(clip_lines(&vec![line(&[(-5, -5), (-1, -2)])], 0, 0, 10, 10).is_empty());
    }

    #[test]
    fn reentrant_line_splits_into_sub_lines() {
        // Leaves through the right edge and comes back in lower down.
        let clipped = clip_lines(&vec![line(&[(5, 2), (15, 2), (15, 8), (5, 8)])], 0, 0, 10, 10);
        assert_eq!(
            clipped,
            vec![line(&[(5, 2), (10, 2)]), line(&[(10, 8), (5, 8)])]
        );
    }

    #[test]
    fn clipped_endpoints_lie_on_the_boundary() {
        let clipped = clip_lines(&vec![line(&[(-4, -4), (12, 12)])], 0, 0, 10, 10);
        assert_eq!(clipped.len(), 1);
        let sub_line = &clipped[0];
        assert_eq!(*sub_line.first().expect("has points"), GeometryCoordinate::new(0, 0));
        assert_eq!(*sub_line.last().expect("has points"), GeometryCoordinate::new(10, 10));
    }

    #[test]
    fn separate_input_lines_stay_separate() {
        let clipped = clip_lines(
            &vec![line(&[(1, 1), (4, 1)]), line(&[(4, 1), (8, 1)])],
            0,
            0,
            10,
            10,
        );
        assert_eq!(clipped.len(), 2);
    }
}
