//! Feature inputs to symbol layout.
//!
//! Features arrive decoded and evaluated: tile-local geometry from the
//! vector tile, formatted text and icon id already produced by the host
//! expression engine.

use std::cmp::Ordering;

use crate::{
    geometry::{FeatureType, GeometryCollection},
    tagged_string::TaggedString,
};

/// One source layer's worth of features for a tile parse.
pub struct SymbolGeometryTileLayer {
    pub name: String,
    pub features: Vec<SymbolGeometryTileFeature>,
}

#[derive(Clone, Default)]
pub struct SymbolGeometryTileFeature {
    pub geometry: GeometryCollection,
    pub feature_type: FeatureType,
    pub formatted_text: Option<TaggedString>,
    pub icon_image_id: Option<String>,
    /// Present only when the layer orders symbols by sort key.
    pub sort_key: Option<f64>,
    /// Index into the underlying tile data feature set.
    pub index: usize,
}

impl SymbolGeometryTileFeature {
    pub fn new(feature_type: FeatureType, geometry: GeometryCollection) -> Self {
        Self {
            geometry,
            feature_type,
            formatted_text: None,
            icon_image_id: None,
            sort_key: None,
            index: 0,
        }
    }

    pub fn sort_key_or_default(&self) -> f64 {
        self.sort_key.unwrap_or(0.0)
    }
}

impl PartialEq for SymbolGeometryTileFeature {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key_or_default() == other.sort_key_or_default()
    }
}

impl PartialOrd for SymbolGeometryTileFeature {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.sort_key_or_default()
            .partial_cmp(&other.sort_key_or_default())
    }
}
