//! Style images (icons) as supplied by the host sprite.

use std::collections::HashMap;

/// One stretchable zone, in image pixels.
pub type ImageStretch = (f64, f64);
pub type ImageStretches = Vec<ImageStretch>;

/// The sub-rectangle of an icon that text may be fit into.
#[derive(Clone, Copy)]
pub struct ImageContent {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

pub struct Image {
    pub id: String,
    pub pixel_ratio: f64,
    /// Whether the image is a signed distance field icon.
    pub sdf: bool,
    pub stretch_x: ImageStretches,
    pub stretch_y: ImageStretches,
    pub content: Option<ImageContent>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ImageType {
    Icon,
    Pattern,
}

pub type ImageMap = HashMap<String, Image>;
/// Image ids needed by a tile, collected during feature intake.
pub type ImageDependencies = HashMap<String, ImageType>;
