//! Layout property enums and the evaluated value set handed to layout.
//!
//! Property expressions are evaluated by the host style engine; this
//! crate only ever sees concrete values. `SymbolLayoutValues` carries
//! the per-layer values, with the few size values that are sampled at
//! fixed zooms spelled out as separate fields.

use crate::font_stack::FontStack;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SymbolPlacementType {
    Point,
    Line,
    LineCenter,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SymbolAnchorType {
    Center,
    Left,
    Right,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TextJustifyType {
    Auto,
    Center,
    Left,
    Right,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum IconTextFitType {
    None,
    Width,
    Height,
    Both,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum TextWritingModeType {
    Horizontal,
    Vertical,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AlignmentType {
    Map,
    Viewport,
    Auto,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SymbolZOrderType {
    Auto,
    ViewportY,
    Source,
}

/// Evaluated layout values for one symbol layer at one tile's zoom.
///
/// Sizes that stabilize anchors across zoom are pre-sampled by the
/// host: `text_size`/`icon_size` one zoom above the tile's own (so
/// overscaled tiles agree with their children), `text_size_at_bucket_zoom`
/// at the tile's zoom, and `text_max_size` at the highest zoom so every
/// tile computes identical anchor positions.
#[derive(Clone, Debug)]
pub struct SymbolLayoutValues {
    pub symbol_placement: SymbolPlacementType,
    pub symbol_spacing: f64,
    pub symbol_z_order: SymbolZOrderType,

    pub text_font: FontStack,
    pub text_size: f64,
    pub text_size_at_bucket_zoom: f64,
    pub text_max_size: f64,
    pub text_max_width: f64,
    pub text_line_height: f64,
    pub text_letter_spacing: f64,
    pub text_justify: TextJustifyType,
    pub text_anchor: SymbolAnchorType,
    pub text_variable_anchor: Vec<SymbolAnchorType>,
    pub text_offset: [f64; 2],
    pub text_radial_offset: Option<f64>,
    pub text_rotate: f64,
    pub text_padding: f64,
    pub text_max_angle: f64,
    pub text_writing_modes: Vec<TextWritingModeType>,
    pub text_rotation_alignment: AlignmentType,
    pub text_keep_upright: bool,
    pub text_allow_overlap: bool,
    pub text_ignore_placement: bool,

    pub icon_size: f64,
    pub icon_offset: [f64; 2],
    pub icon_anchor: SymbolAnchorType,
    pub icon_rotate: f64,
    pub icon_padding: f64,
    pub icon_rotation_alignment: AlignmentType,
    pub icon_text_fit: IconTextFitType,
    pub icon_text_fit_padding: [f64; 4],
    pub icon_keep_upright: bool,
    pub icon_allow_overlap: bool,
    pub icon_ignore_placement: bool,
}

impl Default for SymbolLayoutValues {
    fn default() -> Self {
        Self {
            symbol_placement: SymbolPlacementType::Point,
            symbol_spacing: 250.0,
            symbol_z_order: SymbolZOrderType::Auto,

            text_font: vec![],
            text_size: 16.0,
            text_size_at_bucket_zoom: 16.0,
            text_max_size: 16.0,
            text_max_width: 10.0,
            text_line_height: 1.2,
            text_letter_spacing: 0.0,
            text_justify: TextJustifyType::Center,
            text_anchor: SymbolAnchorType::Center,
            text_variable_anchor: vec![],
            text_offset: [0.0, 0.0],
            text_radial_offset: None,
            text_rotate: 0.0,
            text_padding: 2.0,
            text_max_angle: 45.0,
            text_writing_modes: vec![],
            text_rotation_alignment: AlignmentType::Auto,
            text_keep_upright: true,
            text_allow_overlap: false,
            text_ignore_placement: false,

            icon_size: 1.0,
            icon_offset: [0.0, 0.0],
            icon_anchor: SymbolAnchorType::Center,
            icon_rotate: 0.0,
            icon_padding: 2.0,
            icon_rotation_alignment: AlignmentType::Auto,
            icon_text_fit: IconTextFitType::None,
            icon_text_fit_padding: [0.0; 4],
            icon_keep_upright: false,
            icon_allow_overlap: false,
            icon_ignore_placement: false,
        }
    }
}

impl SymbolLayoutValues {
    /// Resolve the `Auto` alignments the way the style spec prescribes:
    /// rotation alignment follows placement, pitch alignment follows
    /// rotation alignment.
    pub fn resolve_auto_alignments(&mut self) {
        if self.icon_rotation_alignment == AlignmentType::Auto {
            self.icon_rotation_alignment = if self.symbol_placement != SymbolPlacementType::Point {
                AlignmentType::Map
            } else {
                AlignmentType::Viewport
            };
        }
        if self.text_rotation_alignment == AlignmentType::Auto {
            self.text_rotation_alignment = if self.symbol_placement != SymbolPlacementType::Point {
                AlignmentType::Map
            } else {
                AlignmentType::Viewport
            };
        }
    }

    pub fn text_along_line(&self) -> bool {
        self.text_rotation_alignment == AlignmentType::Map
            && self.symbol_placement != SymbolPlacementType::Point
    }
}
