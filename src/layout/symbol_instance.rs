//! One placement candidate per anchor, with the quads and collision
//! features shared across its justification variants.

use std::rc::Rc;

use bitflags::bitflags;

use crate::{
    collision_feature::{CollisionBoxArray, CollisionFeature, IndexedSubfeature},
    geometry::{anchor::Anchor, GeometryCoordinates},
    glyph::{Shaping, WritingModes},
    image::ImageMap,
    quads::{glyph_quads, icon_quads, SymbolQuads},
    shaping::PositionedIcon,
    style_types::SymbolPlacementType,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct SymbolContent: u8 {
        const TEXT = 1 << 0;
        const ICON_RGBA = 1 << 1;
        const ICON_SDF = 1 << 2;
    }
}

/// The shapings produced for one feature's text. `right` doubles as the
/// only slot when the text is a single line, and as the horizontal
/// shaping when variable anchors are off.
#[derive(Default)]
pub struct ShapedTextOrientations {
    horizontal: Shaping,
    vertical: Shaping,
    // Used with variable text placement on, along with right().
    center: Shaping,
    left: Shaping,
    pub single_line: bool,
}

impl ShapedTextOrientations {
    pub fn horizontal(&self) -> &Shaping {
        &self.horizontal
    }

    pub fn vertical(&self) -> &Shaping {
        &self.vertical
    }

    pub fn right(&self) -> &Shaping {
        &self.horizontal
    }

    pub fn center(&self) -> &Shaping {
        &self.center
    }

    pub fn left(&self) -> &Shaping {
        &self.left
    }

    pub fn set_horizontal(&mut self, shaping: Shaping) {
        self.horizontal = shaping;
    }

    pub fn set_vertical(&mut self, shaping: Shaping) {
        self.vertical = shaping;
    }

    pub fn set_center(&mut self, shaping: Shaping) {
        self.center = shaping;
    }

    pub fn set_left(&mut self, shaping: Shaping) {
        self.left = shaping;
    }
}

/// Any shaping of the set; they all share one collision box.
pub fn get_any_shaping(shaped_text_orientations: &ShapedTextOrientations) -> &Shaping {
    if shaped_text_orientations.right().has_positioned_glyphs() {
        return shaped_text_orientations.right();
    }
    if shaped_text_orientations.center().has_positioned_glyphs() {
        return shaped_text_orientations.center();
    }
    if shaped_text_orientations.left().has_positioned_glyphs() {
        return shaped_text_orientations.left();
    }
    if shaped_text_orientations.vertical().has_positioned_glyphs() {
        return shaped_text_orientations.vertical();
    }
    shaped_text_orientations.horizontal()
}

/// Quads shared by every symbol instance generated along one line of a
/// feature. When `single_line` is set only the right-justified quads
/// are populated and stand in for all three horizontal slots.
#[derive(Default)]
pub struct SymbolInstanceSharedData {
    pub line: GeometryCoordinates,
    pub right_justified_glyph_quads: SymbolQuads,
    pub center_justified_glyph_quads: SymbolQuads,
    pub left_justified_glyph_quads: SymbolQuads,
    pub vertical_glyph_quads: SymbolQuads,
    pub icon_quads: Option<SymbolQuads>,
    pub vertical_icon_quads: Option<SymbolQuads>,
}

impl SymbolInstanceSharedData {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        line: GeometryCoordinates,
        shaped_text_orientations: &ShapedTextOrientations,
        shaped_icon: Option<&PositionedIcon>,
        vertically_shaped_icon: Option<&PositionedIcon>,
        text_offset: [f64; 2],
        text_rotate: f64,
        text_along_line: bool,
        image_map: &ImageMap,
        icon_rotation: f64,
        icon_type: SymbolContent,
        has_icon_text_fit: bool,
        allow_vertical_placement: bool,
    ) -> Self {
        let mut data = Self {
            line,
            ..Self::default()
        };

        if let Some(shaped_icon) = shaped_icon {
            data.icon_quads = Some(icon_quads(
                shaped_icon,
                icon_rotation,
                icon_type,
                has_icon_text_fit,
            ));
            if let Some(vertically_shaped_icon) = vertically_shaped_icon {
                data.vertical_icon_quads = Some(icon_quads(
                    vertically_shaped_icon,
                    icon_rotation,
                    icon_type,
                    has_icon_text_fit,
                ));
            }
        }

        let mut build = |shaping: &Shaping| {
            glyph_quads(
                shaping,
                text_offset,
                text_rotate,
                text_along_line,
                image_map,
                allow_vertical_placement,
            )
        };

        if !shaped_text_orientations.single_line {
            if shaped_text_orientations.right().has_positioned_glyphs() {
                data.right_justified_glyph_quads = build(shaped_text_orientations.right());
            }
            if shaped_text_orientations.center().has_positioned_glyphs() {
                data.center_justified_glyph_quads = build(shaped_text_orientations.center());
            }
            if shaped_text_orientations.left().has_positioned_glyphs() {
                data.left_justified_glyph_quads = build(shaped_text_orientations.left());
            }
        } else {
            let shaping = [
                shaped_text_orientations.right(),
                shaped_text_orientations.center(),
                shaped_text_orientations.left(),
            ]
            .into_iter()
            .find(|shaping| shaping.has_positioned_glyphs());
            if let Some(shaping) = shaping {
                data.right_justified_glyph_quads = build(shaping);
            }
        }

        if shaped_text_orientations.vertical().has_positioned_glyphs() {
            data.vertical_glyph_quads = build(shaped_text_orientations.vertical());
        }

        data
    }

    fn empty(&self) -> bool {
        self.right_justified_glyph_quads.is_empty()
            && self.center_justified_glyph_quads.is_empty()
            && self.left_justified_glyph_quads.is_empty()
            && self.vertical_glyph_quads.is_empty()
    }
}

/// One placement candidate. Quads live in the shared data until the
/// bucket is populated; collision boxes are ranges into the tile's
/// shared [`CollisionBoxArray`].
pub struct SymbolInstance {
    shared_data: Option<Rc<SymbolInstanceSharedData>>,

    pub anchor: Anchor,
    pub symbol_content: SymbolContent,

    pub right_justified_glyph_quads_size: usize,
    pub center_justified_glyph_quads_size: usize,
    pub left_justified_glyph_quads_size: usize,
    pub vertical_glyph_quads_size: usize,
    pub icon_quads_size: usize,

    pub text_collision_feature: CollisionFeature,
    pub icon_collision_feature: CollisionFeature,
    pub vertical_text_collision_feature: Option<CollisionFeature>,
    pub vertical_icon_collision_feature: Option<CollisionFeature>,
    pub writing_modes: WritingModes,
    /// Index into the set of features included at layout time.
    pub layout_feature_index: usize,
    /// Index into the underlying tile data feature set.
    pub data_feature_index: usize,
    pub text_offset: [f64; 2],
    pub icon_offset: [f64; 2],
    /// Hash of the label text, shared with the cross-tile index.
    pub key: u64,
    pub placed_right_text_index: Option<usize>,
    pub placed_center_text_index: Option<usize>,
    pub placed_left_text_index: Option<usize>,
    pub placed_vertical_text_index: Option<usize>,
    pub placed_icon_index: Option<usize>,
    pub placed_vertical_icon_index: Option<usize>,
    pub text_box_scale: f64,
    pub variable_text_offset: [f64; 2],
    pub single_line: bool,
    /// Stable id across tiles and zooms; 0 until the cross-tile index
    /// assigns one.
    pub cross_tile_id: u32,
}

impl SymbolInstance {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        anchor: Anchor,
        shared_data: Rc<SymbolInstanceSharedData>,
        shaped_text_orientations: &ShapedTextOrientations,
        shaped_icon: Option<&PositionedIcon>,
        vertically_shaped_icon: Option<&PositionedIcon>,
        text_box_scale: f64,
        text_padding: f64,
        text_placement: SymbolPlacementType,
        text_offset: [f64; 2],
        icon_box_scale: f64,
        icon_padding: f64,
        icon_offset: [f64; 2],
        collision_boxes: &mut CollisionBoxArray,
        indexed_feature: IndexedSubfeature,
        layout_feature_index: usize,
        data_feature_index: usize,
        key: u64,
        overscaling: f64,
        icon_rotation: f64,
        text_rotation: f64,
        variable_text_offset: [f64; 2],
        allow_vertical_placement: bool,
        icon_type: SymbolContent,
    ) -> Self {
        // As a collision approximation either the vertical or any of
        // the horizontal shapings works; they cover the same box.
        let text_collision_feature = CollisionFeature::new_from_text(
            collision_boxes,
            &shared_data.line,
            &anchor,
            get_any_shaping(shaped_text_orientations),
            text_box_scale,
            text_padding,
            text_placement,
            indexed_feature,
            overscaling,
            text_rotation,
        );
        let icon_collision_feature = CollisionFeature::new_from_icon(
            collision_boxes,
            &shared_data.line,
            &anchor,
            shaped_icon,
            icon_box_scale,
            icon_padding,
            indexed_feature,
            icon_rotation,
        );

        let mut instance = Self {
            symbol_content: icon_type,
            text_collision_feature,
            icon_collision_feature,
            anchor,
            writing_modes: WritingModes::empty(),
            layout_feature_index,
            data_feature_index,
            text_offset,
            icon_offset,
            key,
            text_box_scale,
            variable_text_offset,
            single_line: shaped_text_orientations.single_line,

            right_justified_glyph_quads_size: 0,
            center_justified_glyph_quads_size: 0,
            left_justified_glyph_quads_size: 0,
            vertical_glyph_quads_size: 0,
            icon_quads_size: 0,

            vertical_text_collision_feature: None,
            vertical_icon_collision_feature: None,
            placed_right_text_index: None,
            placed_center_text_index: None,
            placed_left_text_index: None,
            placed_vertical_text_index: None,
            placed_icon_index: None,
            placed_vertical_icon_index: None,
            cross_tile_id: 0,

            shared_data: Some(shared_data),
        };

        let shared = instance.shared_data.as_ref().expect("just set");
        if !shared.empty() {
            instance.symbol_content |= SymbolContent::TEXT;
        }

        if allow_vertical_placement
            && shaped_text_orientations.vertical().has_positioned_glyphs()
        {
            let vertical_point_label_angle = 90.0;
            instance.vertical_text_collision_feature = Some(CollisionFeature::new_from_text(
                collision_boxes,
                &shared.line,
                &instance.anchor,
                shaped_text_orientations.vertical(),
                text_box_scale,
                text_padding,
                text_placement,
                indexed_feature,
                overscaling,
                text_rotation + vertical_point_label_angle,
            ));
            if vertically_shaped_icon.is_some() {
                instance.vertical_icon_collision_feature = Some(CollisionFeature::new_from_icon(
                    collision_boxes,
                    &shared.line,
                    &instance.anchor,
                    vertically_shaped_icon,
                    icon_box_scale,
                    icon_padding,
                    indexed_feature,
                    icon_rotation + vertical_point_label_angle,
                ));
            }
        }

        let shared = instance.shared_data.as_ref().expect("set above");
        instance.right_justified_glyph_quads_size = shared.right_justified_glyph_quads.len();
        instance.center_justified_glyph_quads_size = shared.center_justified_glyph_quads.len();
        instance.left_justified_glyph_quads_size = shared.left_justified_glyph_quads.len();
        instance.vertical_glyph_quads_size = shared.vertical_glyph_quads.len();
        instance.icon_quads_size = shared.icon_quads.as_ref().map_or(0, Vec::len);

        if instance.right_justified_glyph_quads_size != 0
            || instance.center_justified_glyph_quads_size != 0
            || instance.left_justified_glyph_quads_size != 0
        {
            instance.writing_modes |= WritingModes::HORIZONTAL;
        }
        if instance.vertical_glyph_quads_size != 0 {
            instance.writing_modes |= WritingModes::VERTICAL;
        }

        instance
    }

    pub fn get_default_horizontal_placed_text_index(&self) -> Option<usize> {
        self.placed_right_text_index
            .or(self.placed_center_text_index)
            .or(self.placed_left_text_index)
    }

    fn shared(&self) -> &SymbolInstanceSharedData {
        self.shared_data
            .as_ref()
            .expect("shared data already released")
    }

    pub fn line(&self) -> &GeometryCoordinates {
        &self.shared().line
    }

    pub fn right_justified_glyph_quads(&self) -> &SymbolQuads {
        &self.shared().right_justified_glyph_quads
    }

    pub fn center_justified_glyph_quads(&self) -> &SymbolQuads {
        &self.shared().center_justified_glyph_quads
    }

    pub fn left_justified_glyph_quads(&self) -> &SymbolQuads {
        &self.shared().left_justified_glyph_quads
    }

    pub fn vertical_glyph_quads(&self) -> &SymbolQuads {
        &self.shared().vertical_glyph_quads
    }

    pub fn icon_quads(&self) -> Option<&SymbolQuads> {
        self.shared().icon_quads.as_ref()
    }

    pub fn vertical_icon_quads(&self) -> Option<&SymbolQuads> {
        self.shared().vertical_icon_quads.as_ref()
    }

    pub fn has_text(&self) -> bool {
        self.symbol_content.contains(SymbolContent::TEXT)
    }

    pub fn has_icon(&self) -> bool {
        self.symbol_content.contains(SymbolContent::ICON_RGBA) || self.has_sdf_icon()
    }

    pub fn has_sdf_icon(&self) -> bool {
        self.symbol_content.contains(SymbolContent::ICON_SDF)
    }

    /// Drop the quads once the bucket owns copies of everything.
    pub fn release_shared_data(&mut self) {
        self.shared_data = None;
    }

    /// A bare instance carrying only what the cross-tile index reads.
    #[cfg(test)]
    pub(crate) fn for_test(anchor: Anchor, key: u64) -> Self {
        let no_boxes = CollisionFeature {
            box_start_index: 0,
            box_end_index: 0,
            along_line: false,
        };
        Self {
            shared_data: None,
            anchor,
            symbol_content: SymbolContent::TEXT,
            right_justified_glyph_quads_size: 0,
            center_justified_glyph_quads_size: 0,
            left_justified_glyph_quads_size: 0,
            vertical_glyph_quads_size: 0,
            icon_quads_size: 0,
            text_collision_feature: no_boxes,
            icon_collision_feature: no_boxes,
            vertical_text_collision_feature: None,
            vertical_icon_collision_feature: None,
            writing_modes: WritingModes::HORIZONTAL,
            layout_feature_index: 0,
            data_feature_index: 0,
            text_offset: [0.0, 0.0],
            icon_offset: [0.0, 0.0],
            key,
            placed_right_text_index: None,
            placed_center_text_index: None,
            placed_left_text_index: None,
            placed_vertical_text_index: None,
            placed_icon_index: None,
            placed_vertical_icon_index: None,
            text_box_scale: 1.0,
            variable_text_offset: [0.0, 0.0],
            single_line: true,
            cross_tile_id: 0,
        }
    }
}
