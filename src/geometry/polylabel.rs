//! Pole of inaccessibility: the interior point of a polygon farthest
//! from its boundary, where a polygon label sits best.
//!
//! Quadtree refinement over the signed distance field: cells are split
//! while their upper distance bound can still beat the best point found,
//! so the search converges to the pole within the requested precision
//! without scanning the whole interior.

use std::{cmp::Ordering, collections::BinaryHeap};

use euclid::Point2D;

use crate::{
    geometry::{GeometryCollection, GeometryCoordinates},
    util::math::convert_point_f64,
    TileSpace,
};

fn signed_area(ring: &GeometryCoordinates) -> f64 {
    let mut sum = 0.0;
    for i in 0..ring.len() {
        let p1 = ring[i];
        let p2 = ring[(i + 1) % ring.len()];
        sum += (p2.x as f64 - p1.x as f64) * (p1.y as f64 + p2.y as f64);
    }
    sum
}

/// Group rings into polygons: a ring wound like an outer boundary opens
/// a new polygon, other rings become holes of the current one. Rings
/// before the first outer ring and degenerate rings are dropped.
pub fn classify_rings(rings: &GeometryCollection) -> Vec<GeometryCollection> {
    let mut polygons: Vec<GeometryCollection> = Vec::new();
    let mut current: Option<GeometryCollection> = None;

    for ring in rings {
        if ring.len() < 3 {
            continue;
        }
        if signed_area(ring) > 0.0 {
            if let Some(polygon) = current.take() {
                polygons.push(polygon);
            }
            current = Some(vec![ring.clone()]);
        } else if let Some(polygon) = &mut current {
            polygon.push(ring.clone());
        }
    }
    if let Some(polygon) = current.take() {
        polygons.push(polygon);
    }

    polygons
}

/// Signed distance from a point to the polygon outline: positive inside.
fn point_to_polygon_distance(x: f64, y: f64, polygon: &GeometryCollection) -> f64 {
    let mut inside = false;
    let mut min_dist_sq = f64::INFINITY;

    for ring in polygon {
        if ring.is_empty() {
            continue;
        }
        let count = ring.len();
        let mut j = count - 1;
        for i in 0..count {
            let a = convert_point_f64(&ring[i]);
            let b = convert_point_f64(&ring[j]);

            if (a.y > y) != (b.y > y) && (x < (b.x - a.x) * (y - a.y) / (b.y - a.y) + a.x) {
                inside = !inside;
            }

            min_dist_sq = min_dist_sq.min(segment_distance_squared(x, y, a, b));
            j = i;
        }
    }

    let distance = min_dist_sq.sqrt();
    if inside {
        distance
    } else {
        -distance
    }
}

fn segment_distance_squared(
    px: f64,
    py: f64,
    a: Point2D<f64, TileSpace>,
    b: Point2D<f64, TileSpace>,
) -> f64 {
    let mut x = a.x;
    let mut y = a.y;
    let dx = b.x - a.x;
    let dy = b.y - a.y;

    if dx != 0.0 || dy != 0.0 {
        let t = ((px - x) * dx + (py - y) * dy) / (dx * dx + dy * dy);
        if t > 1.0 {
            x = b.x;
            y = b.y;
        } else if t > 0.0 {
            x += dx * t;
            y += dy * t;
        }
    }

    let dx = px - x;
    let dy = py - y;
    dx * dx + dy * dy
}

struct Cell {
    x: f64,
    y: f64,
    half: f64,
    distance: f64,
    /// Upper bound of the distance any point inside the cell can reach.
    max: f64,
}

impl Cell {
    fn new(x: f64, y: f64, half: f64, polygon: &GeometryCollection) -> Self {
        let distance = point_to_polygon_distance(x, y, polygon);
        Self {
            x,
            y,
            half,
            distance,
            max: distance + half * std::f64::consts::SQRT_2,
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.max == other.max
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        self.max.total_cmp(&other.max)
    }
}

/// The pole of inaccessibility of `polygon` (outer ring plus holes),
/// found to within `precision` tile units.
pub fn pole_of_inaccessibility(
    polygon: &GeometryCollection,
    precision: f64,
) -> Point2D<f64, TileSpace> {
    let Some(outer) = polygon.first().filter(|ring| !ring.is_empty()) else {
        return Point2D::origin();
    };

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for point in &outer.0 {
        min_x = min_x.min(point.x as f64);
        min_y = min_y.min(point.y as f64);
        max_x = max_x.max(point.x as f64);
        max_y = max_y.max(point.y as f64);
    }

    let width = max_x - min_x;
    let height = max_y - min_y;
    let cell_size = width.min(height);
    if cell_size == 0.0 {
        return Point2D::new(min_x, min_y);
    }
    let mut half = cell_size / 2.0;

    let mut queue = BinaryHeap::new();

    // Cover the polygon with initial cells.
    let mut x = min_x;
    while x < max_x {
        let mut y = min_y;
        while y < max_y {
            queue.push(Cell::new(x + half, y + half, half, polygon));
            y += cell_size;
        }
        x += cell_size;
    }

    // Take the centroid as the first best guess.
    let mut best = centroid_cell(polygon);
    let bbox_center = Cell::new(min_x + width / 2.0, min_y + height / 2.0, 0.0, polygon);
    if bbox_center.distance > best.distance {
        best = bbox_center;
    }

    while let Some(cell) = queue.pop() {
        if cell.distance > best.distance {
            best = Cell {
                x: cell.x,
                y: cell.y,
                half: 0.0,
                distance: cell.distance,
                max: cell.distance,
            };
        }

        // The queue is ordered by upper bound, so once the top cell
        // cannot beat the best candidate by more than the precision,
        // nothing below it can either.
        if cell.max - best.distance <= precision {
            break;
        }

        half = cell.half / 2.0;
        queue.push(Cell::new(cell.x - half, cell.y - half, half, polygon));
        queue.push(Cell::new(cell.x + half, cell.y - half, half, polygon));
        queue.push(Cell::new(cell.x - half, cell.y + half, half, polygon));
        queue.push(Cell::new(cell.x + half, cell.y + half, half, polygon));
    }

    Point2D::new(best.x, best.y)
}

fn centroid_cell(polygon: &GeometryCollection) -> Cell {
    let ring = &polygon[0];
    let mut area = 0.0;
    let mut x = 0.0;
    let mut y = 0.0;

    let count = ring.len();
    let mut j = count - 1;
    for i in 0..count {
        let a = convert_point_f64(&ring[i]);
        let b = convert_point_f64(&ring[j]);
        let f = a.x * b.y - b.x * a.y;
        x += (a.x + b.x) * f;
        y += (a.y + b.y) * f;
        area += f * 3.0;
        j = i;
    }

    if area == 0.0 {
        let first = convert_point_f64(&ring[0]);
        Cell::new(first.x, first.y, 0.0, polygon)
    } else {
        Cell::new(x / area, y / area, 0.0, polygon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryCoordinate;

    fn ring(points: &[(i16, i16)]) -> GeometryCoordinates {
        GeometryCoordinates(points.iter().map(|(x, y)| GeometryCoordinate::new(*x, *y)).collect())
    }

    #[test]
    fn square_pole_is_the_center() {
        let polygon = vec![ring(&[(0, 0), (0, 100), (100, 100), (100, 0)])];
        let pole = pole_of_inaccessibility(&polygon, 0.5);
        assert!((pole.x - 50.0).abs() <= 1.0);
        assert!((pole.y - 50.0).abs() <= 1.0);
    }

    #[test]
    fn hole_pushes_the_pole_aside() {
        // A centered hole turns the center into the worst spot.
        let polygon = vec![
            ring(&[(0, 0), (0, 100), (100, 100), (100, 0)]),
            ring(&[(40, 40), (60, 40), (60, 60), (40, 60)]),
        ];
        let pole = pole_of_inaccessibility(&polygon, 0.5);
        let center_distance = point_to_polygon_distance(50.0, 50.0, &polygon);
        let pole_distance = point_to_polygon_distance(pole.x, pole.y, &polygon);
        assert!(pole_distance > center_distance);
        assert!(pole_distance > 0.0, "pole is inside the polygon");
    }

    #[test]
    fn l_shape_pole_sits_in_the_thick_limb() {
        let polygon = vec![ring(&[
            (0, 0),
            (0, 100),
            (40, 100),
            (40, 40),
            (100, 40),
            (100, 0),
        ])];
        let pole = pole_of_inaccessibility(&polygon, 0.5);
        let distance = point_to_polygon_distance(pole.x, pole.y, &polygon);
        // Best possible is the 40-wide limb's half width.
        assert!(distance > 15.0);
    }

    #[test]
    fn classify_rings_groups_holes_with_their_outer() {
        // y grows downward in tile space, so this winding is an outer
        // ring, and the reversed one inside it is a hole.
        let outer = ring(&[(0, 0), (0, 100), (100, 100), (100, 0)]);
        let hole = ring(&[(20, 20), (40, 20), (40, 40), (20, 40)]);
        let second = ring(&[(200, 0), (200, 50), (250, 50), (250, 0)]);

        let polygons = classify_rings(&vec![outer, hole, second]);
        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0].len(), 2);
        assert_eq!(polygons[1].len(), 1);
    }
}
