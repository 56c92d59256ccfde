use euclid::Point2D;

use crate::TileSpace;

/// A point a label is positioned relative to, with the line segment it
/// sits on when the label follows a line.
#[derive(Clone, Copy, Debug)]
pub struct Anchor {
    pub point: Point2D<f64, TileSpace>,
    pub angle: f64,
    pub segment: Option<usize>,
}

pub type Anchors = Vec<Anchor>;
