//! Sprite atlas positions for icons.

use std::collections::HashMap;

use euclid::Rect;

use crate::{
    image::{ImageContent, ImageStretches},
    TileSpace,
};

#[derive(Clone)]
pub struct ImagePosition {
    pub pixel_ratio: f64,
    pub padded_rect: Rect<u16, TileSpace>,
    pub version: u32,
    pub stretch_x: ImageStretches,
    pub stretch_y: ImageStretches,
    pub content: Option<ImageContent>,
}

impl ImagePosition {
    pub const PADDING: u16 = 1;

    pub fn display_size(&self) -> [f64; 2] {
        [
            (self.padded_rect.width() - Self::PADDING * 2) as f64 / self.pixel_ratio,
            (self.padded_rect.height() - Self::PADDING * 2) as f64 / self.pixel_ratio,
        ]
    }
}

pub type ImagePositions = HashMap<String, ImagePosition>;
