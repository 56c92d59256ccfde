//! Uniform spatial hash over boxes and circles.
//!
//! The plane is cut into `ceil(size / cell_size)` cells per axis. Every
//! shape lives in one flat list and is referenced from each cell it
//! overlaps; queries enumerate only the overlapping cells, deduplicate
//! through a per-query seen set and then verify exact overlap. A query
//! covering the whole plane skips the cells and walks the flat list.

use std::collections::HashSet;

use euclid::{Box2D, Point2D};

use crate::ScreenSpace;

#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub center: Point2D<f64, ScreenSpace>,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: Point2D<f64, ScreenSpace>, radius: f64) -> Self {
        Self { center, radius }
    }

    fn bounds(&self) -> Box2D<f64, ScreenSpace> {
        Box2D::new(
            Point2D::new(self.center.x - self.radius, self.center.y - self.radius),
            Point2D::new(self.center.x + self.radius, self.center.y + self.radius),
        )
    }
}

#[derive(Clone, Copy, Debug)]
enum Shape {
    Box(Box2D<f64, ScreenSpace>),
    Circle(Circle),
}

impl Shape {
    fn bounds(&self) -> Box2D<f64, ScreenSpace> {
        match self {
            Shape::Box(b) => *b,
            Shape::Circle(c) => c.bounds(),
        }
    }
}

pub struct GridIndex<K: Clone> {
    width: f64,
    height: f64,
    x_cell_count: usize,
    y_cell_count: usize,
    x_scale: f64,
    y_scale: f64,
    shapes: Vec<(K, Shape)>,
    cells: Vec<Vec<u32>>,
}

impl<K: Clone> GridIndex<K> {
    pub fn new(width: f64, height: f64, cell_size: u32) -> Self {
        assert!(width > 0.0);
        assert!(height > 0.0);
        let x_cell_count = (width / cell_size as f64).ceil() as usize;
        let y_cell_count = (height / cell_size as f64).ceil() as usize;
        Self {
            width,
            height,
            x_cell_count,
            y_cell_count,
            x_scale: x_cell_count as f64 / width,
            y_scale: y_cell_count as f64 / height,
            shapes: Vec::new(),
            cells: vec![Vec::new(); x_cell_count * y_cell_count],
        }
    }

    pub fn insert(&mut self, key: K, bbox: Box2D<f64, ScreenSpace>) {
        self.insert_shape(key, Shape::Box(bbox));
    }

    pub fn insert_circle(&mut self, key: K, circle: Circle) {
        self.insert_shape(key, Shape::Circle(circle));
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// All keys whose shape overlaps `query_box`, optionally filtered.
    pub fn query<F>(&self, query_box: &Box2D<f64, ScreenSpace>, predicate: Option<F>) -> Vec<K>
    where
        F: Fn(&K) -> bool,
    {
        let mut result = Vec::new();
        self.query_internal(query_box, |key, shape| {
            if Self::box_overlaps(query_box, shape)
                && predicate.as_ref().map_or(true, |accept| accept(key))
            {
                result.push(key.clone());
            }
            false
        });
        result
    }

    /// Whether anything overlaps `query_box`; stops at the first hit.
    pub fn hit_test<F>(&self, query_box: &Box2D<f64, ScreenSpace>, predicate: Option<F>) -> bool
    where
        F: Fn(&K) -> bool,
    {
        let mut hit = false;
        self.query_internal(query_box, |key, shape| {
            if Self::box_overlaps(query_box, shape)
                && predicate.as_ref().map_or(true, |accept| accept(key))
            {
                hit = true;
                return true;
            }
            false
        });
        hit
    }

    /// Whether anything overlaps `query_circle`; stops at the first hit.
    pub fn hit_test_circle<F>(&self, query_circle: &Circle, predicate: Option<F>) -> bool
    where
        F: Fn(&K) -> bool,
    {
        let mut hit = false;
        self.query_internal(&query_circle.bounds(), |key, shape| {
            if Self::circle_overlaps(query_circle, shape)
                && predicate.as_ref().map_or(true, |accept| accept(key))
            {
                hit = true;
                return true;
            }
            false
        });
        hit
    }

    fn insert_shape(&mut self, key: K, shape: Shape) {
        assert!(self.shapes.len() < u32::MAX as usize);
        let uid = self.shapes.len() as u32;
        let bounds = shape.bounds();

        let cx1 = self.x_cell(bounds.min.x);
        let cy1 = self.y_cell(bounds.min.y);
        let cx2 = self.x_cell(bounds.max.x);
        let cy2 = self.y_cell(bounds.max.y);
        for x in cx1..=cx2 {
            for y in cy1..=cy2 {
                self.cells[self.x_cell_count * y + x].push(uid);
            }
        }

        self.shapes.push((key, shape));
    }

    /// Visit candidate shapes whose cells overlap the query box; the
    /// visitor decides exact overlap and returns `true` to stop.
    fn query_internal<F>(&self, query_box: &Box2D<f64, ScreenSpace>, mut visit: F)
    where
        F: FnMut(&K, &Shape) -> bool,
    {
        if self.outside_plane(query_box) {
            return;
        }
        if self.covers_plane(query_box) {
            for (key, shape) in &self.shapes {
                if visit(key, shape) {
                    return;
                }
            }
            return;
        }

        let mut seen = HashSet::new();
        let cx1 = self.x_cell(query_box.min.x);
        let cy1 = self.y_cell(query_box.min.y);
        let cx2 = self.x_cell(query_box.max.x);
        let cy2 = self.y_cell(query_box.max.y);
        for x in cx1..=cx2 {
            for y in cy1..=cy2 {
                for uid in &self.cells[self.x_cell_count * y + x] {
                    if !seen.insert(*uid) {
                        continue;
                    }
                    let (key, shape) = &self.shapes[*uid as usize];
                    if visit(key, shape) {
                        return;
                    }
                }
            }
        }
    }

    fn outside_plane(&self, query_box: &Box2D<f64, ScreenSpace>) -> bool {
        query_box.max.x < 0.0
            || query_box.min.x >= self.width
            || query_box.max.y < 0.0
            || query_box.min.y >= self.height
    }

    fn covers_plane(&self, query_box: &Box2D<f64, ScreenSpace>) -> bool {
        query_box.min.x <= 0.0
            && query_box.min.y <= 0.0
            && self.width <= query_box.max.x
            && self.height <= query_box.max.y
    }

    fn x_cell(&self, x: f64) -> usize {
        f64::max(
            0.0,
            f64::min((self.x_cell_count - 1) as f64, (x * self.x_scale).floor()),
        ) as usize
    }

    fn y_cell(&self, y: f64) -> usize {
        f64::max(
            0.0,
            f64::min((self.y_cell_count - 1) as f64, (y * self.y_scale).floor()),
        ) as usize
    }

    fn box_overlaps(query: &Box2D<f64, ScreenSpace>, shape: &Shape) -> bool {
        match shape {
            Shape::Box(b) => boxes_collide(query, b),
            Shape::Circle(c) => circle_and_box_collide(c, query),
        }
    }

    fn circle_overlaps(query: &Circle, shape: &Shape) -> bool {
        match shape {
            Shape::Box(b) => circle_and_box_collide(query, b),
            Shape::Circle(c) => circles_collide(query, c),
        }
    }
}

fn boxes_collide(first: &Box2D<f64, ScreenSpace>, second: &Box2D<f64, ScreenSpace>) -> bool {
    first.min.x <= second.max.x
        && first.min.y <= second.max.y
        && first.max.x >= second.min.x
        && first.max.y >= second.min.y
}

fn circles_collide(first: &Circle, second: &Circle) -> bool {
    let dx = second.center.x - first.center.x;
    let dy = second.center.y - first.center.y;
    let both_radii = first.radius + second.radius;
    both_radii * both_radii > dx * dx + dy * dy
}

fn circle_and_box_collide(circle: &Circle, box_: &Box2D<f64, ScreenSpace>) -> bool {
    let half_width = (box_.max.x - box_.min.x) / 2.0;
    let dist_x = (circle.center.x - (box_.min.x + half_width)).abs();
    if dist_x > half_width + circle.radius {
        return false;
    }

    let half_height = (box_.max.y - box_.min.y) / 2.0;
    let dist_y = (circle.center.y - (box_.min.y + half_height)).abs();
    if dist_y > half_height + circle.radius {
        return false;
    }

    if dist_x <= half_width || dist_y <= half_height {
        return true;
    }

    // Closest-point distance to the nearest corner.
    let dx = dist_x - half_width;
    let dy = dist_y - half_height;
    dx * dx + dy * dy <= circle.radius * circle.radius
}
