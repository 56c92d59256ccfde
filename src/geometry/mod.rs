//! Tile-local feature geometry and the algorithms that walk it.

use std::ops::Index;

use euclid::Point2D;

use crate::TileSpace;

pub mod anchor;
pub mod clip_line;
pub mod get_anchors;
pub mod merge_lines;
pub mod polylabel;

/// Integer tile-unit coordinate as decoded from the vector tile.
pub type GeometryCoordinate = Point2D<i16, TileSpace>;

#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct GeometryCoordinates(pub Vec<GeometryCoordinate>);

impl GeometryCoordinates {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&GeometryCoordinate> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&GeometryCoordinate> {
        self.0.last()
    }
}

impl Index<usize> for GeometryCoordinates {
    type Output = GeometryCoordinate;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

pub type GeometryCollection = Vec<GeometryCoordinates>;

#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub enum FeatureType {
    #[default]
    Unknown,
    Point,
    LineString,
    Polygon,
}
