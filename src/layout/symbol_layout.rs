//! Per-tile symbol layout.
//!
//! One `SymbolLayout` runs synchronously per tile parse: it collects
//! glyph and image dependencies from the features, shapes each feature
//! once those arrive, generates anchors per placement mode, builds
//! collision features, and finally populates the bucket's binary
//! buffers. Anchors outside `[0, EXTENT)` are dropped in continuous
//! mode so neighboring tiles never render the same label twice.

use std::{
    collections::{BTreeMap, BTreeSet},
    f64::consts::PI,
    ops::Range,
    rc::Rc,
};

use widestring::U16String;

use crate::{
    bidi::TextReorderer,
    bucket::symbol_bucket::{
        DynamicVertex, GlyphOffset, GlyphOffsetArray, LineVertex, LineVertexArray, OpacityVertex,
        PlacedSymbol, Segment, SymbolBucket, SymbolBucketBuffer, SymbolVertex, TriangleIndex,
    },
    collision_feature::{CollisionBoxArray, IndexedSubfeature},
    coords::{MapMode, EXTENT, EXTENT_UINT, TILE_SIZE},
    geometry::{
        anchor::{Anchor, Anchors},
        clip_line::clip_lines,
        get_anchors::{get_anchors, get_center_anchor},
        merge_lines::merge_lines,
        polylabel::{classify_rings, pole_of_inaccessibility},
        FeatureType, GeometryCoordinates,
    },
    glyph::{GlyphMap, Shaping, WritingModes},
    glyph_atlas::GlyphPositions,
    image::{ImageMap, ImageType},
    image_atlas::ImagePositions,
    layout::{
        symbol_feature::{SymbolGeometryTileFeature, SymbolGeometryTileLayer},
        symbol_instance::{
            ShapedTextOrientations, SymbolContent, SymbolInstance, SymbolInstanceSharedData,
        },
        BucketParameters, LayoutDependencies,
    },
    quads::{SymbolQuad, SymbolQuads},
    shaping::{anchor_justification, shape_text, PositionedIcon},
    style_types::{
        AlignmentType, IconTextFitType, SymbolAnchorType, SymbolLayoutValues, SymbolPlacementType,
        SymbolZOrderType, TextJustifyType, TextWritingModeType,
    },
    tagged_string::TaggedString,
    util::{i18n, lower_bound, math::convert_point_f64, math::deg2radf, warn_once, ONE_EM},
};

/// Hard cap on glyph quads per bucket; vertex indices are 16 bit on the
/// wire and anything past this is dropped with a deduplicated warning.
const MAX_GLYPHS: usize = u16::MAX as usize;

/// A run of symbol instances sharing one sort key.
#[derive(Clone, Copy, Debug)]
pub struct SortKeyRange {
    pub sort_key: f64,
    pub start: usize,
    pub end: usize,
}

impl SortKeyRange {
    pub fn is_first_range(&self) -> bool {
        self.start == 0
    }
}

// The radial offset is to the edge of the text box. Horizontally that
// is where glyphs start, but vertically glyphs visually start at the
// baseline, which sits ONE_EM + Y_OFFSET below the box top.
const BASELINE_OFFSET: f64 = 7.0;

/// All justifications share one collision box, so any horizontal
/// shaping works for collision purposes.
fn default_horizontal_shaping(shaped_text_orientations: &ShapedTextOrientations) -> &Shaping {
    if shaped_text_orientations.right().has_positioned_glyphs() {
        return shaped_text_orientations.right();
    }
    if shaped_text_orientations.center().has_positioned_glyphs() {
        return shaped_text_orientations.center();
    }
    if shaped_text_orientations.left().has_positioned_glyphs() {
        return shaped_text_orientations.left();
    }
    shaped_text_orientations.horizontal()
}

fn justification_slot_filled(
    shaped_text_orientations: &ShapedTextOrientations,
    justify: TextJustifyType,
) -> bool {
    match justify {
        TextJustifyType::Right => shaped_text_orientations.right().has_positioned_glyphs(),
        TextJustifyType::Left => shaped_text_orientations.left().has_positioned_glyphs(),
        TextJustifyType::Center => shaped_text_orientations.center().has_positioned_glyphs(),
        TextJustifyType::Auto => shaped_text_orientations.horizontal().has_positioned_glyphs(),
    }
}

fn set_justification_slot(
    shaped_text_orientations: &mut ShapedTextOrientations,
    justify: TextJustifyType,
    shaping: Shaping,
) {
    match justify {
        // `right` doubles as the horizontal slot.
        TextJustifyType::Right => shaped_text_orientations.set_horizontal(shaping),
        TextJustifyType::Left => shaped_text_orientations.set_left(shaping),
        TextJustifyType::Center => shaped_text_orientations.set_center(shaping),
        TextJustifyType::Auto => {}
    }
}

/// Convert a radial text offset to the x/y offset of a concrete anchor.
pub fn evaluate_radial_offset(anchor: SymbolAnchorType, mut radial_offset: f64) -> [f64; 2] {
    let mut result = [0.0, 0.0];
    if radial_offset < 0.0 {
        radial_offset = 0.0; // Ignore negative offsets.
    }
    // Solve for r where r^2 + r^2 = radial_offset^2.
    let sqrt2 = std::f64::consts::SQRT_2;
    let hypotenuse = radial_offset / sqrt2;

    match anchor {
        SymbolAnchorType::TopRight | SymbolAnchorType::TopLeft => {
            result[1] = hypotenuse - BASELINE_OFFSET;
        }
        SymbolAnchorType::BottomRight | SymbolAnchorType::BottomLeft => {
            result[1] = -hypotenuse + BASELINE_OFFSET;
        }
        SymbolAnchorType::Bottom => {
            result[1] = -radial_offset + BASELINE_OFFSET;
        }
        SymbolAnchorType::Top => {
            result[1] = radial_offset - BASELINE_OFFSET;
        }
        _ => {}
    }

    match anchor {
        SymbolAnchorType::TopRight | SymbolAnchorType::BottomRight => {
            result[0] = -hypotenuse;
        }
        SymbolAnchorType::TopLeft | SymbolAnchorType::BottomLeft => {
            result[0] = hypotenuse;
        }
        SymbolAnchorType::Left => {
            result[0] = radial_offset;
        }
        SymbolAnchorType::Right => {
            result[0] = -radial_offset;
        }
        _ => {}
    }

    result
}

/// Per-instance context carried from `add_feature` into every symbol
/// instance it creates.
struct InstanceParams<'a> {
    shaped_text_orientations: &'a ShapedTextOrientations,
    shaped_icon: Option<&'a PositionedIcon>,
    vertically_shaped_icon: Option<&'a PositionedIcon>,
    text_box_scale: f64,
    text_padding: f64,
    text_placement: SymbolPlacementType,
    text_offset: [f64; 2],
    icon_box_scale: f64,
    icon_padding: f64,
    icon_offset: [f64; 2],
    indexed_feature: IndexedSubfeature,
    layout_feature_index: usize,
    data_feature_index: usize,
    key: u64,
    icon_rotation: f64,
    text_rotation: f64,
    variable_text_offset: [f64; 2],
    icon_type: SymbolContent,
    sort_key: f64,
}

pub struct SymbolLayout {
    pub bucket_leader_id: String,
    pub symbol_instances: Vec<SymbolInstance>,
    pub sort_key_ranges: Vec<SortKeyRange>,

    source_layer_name: String,
    overscaling: f64,
    zoom: f64,
    mode: MapMode,
    pixel_ratio: f64,
    tile_pixel_ratio: f64,

    icons_need_linear: bool,
    sort_features_by_y: bool,
    sort_features_by_key: bool,
    allow_vertical_placement: bool,
    icons_in_text: bool,
    placement_modes: Vec<TextWritingModeType>,

    layout: SymbolLayoutValues,
    features: Vec<SymbolGeometryTileFeature>,

    compare_text: BTreeMap<U16String, Anchors>,
    collision_boxes: CollisionBoxArray,
}

impl SymbolLayout {
    pub const INVALID_OFFSET_VALUE: f64 = f64::MAX;

    /// Collect features and their glyph/image dependencies. Returns
    /// `None` when no feature carries text or an icon.
    pub fn new(
        parameters: &BucketParameters,
        bucket_leader_id: String,
        mut layout: SymbolLayoutValues,
        source_layer: SymbolGeometryTileLayer,
        dependencies: &mut LayoutDependencies,
    ) -> Option<Self> {
        let overscaling = parameters.tile_id.overscale_factor() as f64;
        let zoom = parameters.tile_id.overscaled_z as f64;
        let tile_size = TILE_SIZE * overscaling;

        layout.resolve_auto_alignments();

        let has_symbol_sort_key = source_layer
            .features
            .iter()
            .any(|feature| feature.sort_key.is_some());
        let symbol_z_order = layout.symbol_z_order;
        let sort_features_by_key =
            symbol_z_order != SymbolZOrderType::ViewportY && has_symbol_sort_key;
        let z_order_by_viewport_y = symbol_z_order == SymbolZOrderType::ViewportY
            || (symbol_z_order == SymbolZOrderType::Auto && !sort_features_by_key);
        let sort_features_by_y = z_order_by_viewport_y
            && (layout.text_allow_overlap
                || layout.icon_allow_overlap
                || layout.text_ignore_placement
                || layout.icon_ignore_placement);

        let mut allow_vertical_placement = false;
        let mut placement_modes = Vec::new();
        if layout.symbol_placement == SymbolPlacementType::Point {
            // Deduplicate the writing modes, preserving order.
            let mut seen: BTreeSet<TextWritingModeType> = BTreeSet::new();
            for mode in &layout.text_writing_modes {
                if *mode == TextWritingModeType::Vertical {
                    allow_vertical_placement = true;
                }
                if seen.insert(*mode) {
                    placement_modes.push(*mode);
                }
            }
        }

        let can_verticalize_text = layout.text_along_line();

        let mut layout_impl = Self {
            bucket_leader_id,
            symbol_instances: Vec::new(),
            sort_key_ranges: Vec::new(),
            source_layer_name: source_layer.name.clone(),
            overscaling,
            zoom,
            mode: parameters.mode,
            pixel_ratio: parameters.pixel_ratio,
            tile_pixel_ratio: EXTENT / tile_size,
            icons_need_linear: false,
            sort_features_by_y,
            sort_features_by_key,
            allow_vertical_placement,
            icons_in_text: false,
            placement_modes,
            layout,
            features: Vec::new(),
            compare_text: BTreeMap::new(),
            collision_boxes: CollisionBoxArray::new(),
        };

        for (index, mut feature) in source_layer.features.into_iter().enumerate() {
            feature.index = index;
            let has_text = feature.formatted_text.is_some();
            let has_icon = feature.icon_image_id.is_some();
            if !has_text && !has_icon {
                continue;
            }

            if let Some(text) = &mut feature.formatted_text {
                let allows_vertical = text.allows_vertical_writing_mode();
                let verticalizable = (can_verticalize_text
                    || layout_impl.allow_vertical_placement)
                    && allows_vertical;

                // Collect the code points each section's font stack
                // must supply, including vertical punctuation forms.
                for j in 0..text.length() {
                    let section = text.section(j);
                    if let Some(image_id) = &section.image_id {
                        dependencies
                            .image_dependencies
                            .insert(image_id.clone(), ImageType::Icon);
                        continue;
                    }
                    let glyphs = dependencies
                        .glyph_dependencies
                        .entry(section.font_stack.clone())
                        .or_default();
                    let code_point = text.char_code_at(j);
                    glyphs.insert(code_point);
                    if verticalizable {
                        let vertical = i18n::verticalize_punctuation(code_point);
                        if vertical != 0 {
                            glyphs.insert(vertical);
                        }
                    }
                }
            }

            if let Some(icon_id) = &feature.icon_image_id {
                dependencies
                    .image_dependencies
                    .insert(icon_id.clone(), ImageType::Icon);
            }

            if layout_impl.sort_features_by_key {
                let position = lower_bound(&layout_impl.features, &feature);
                layout_impl.features.insert(position, feature);
            } else {
                layout_impl.features.push(feature);
            }
        }

        if layout_impl.layout.symbol_placement == SymbolPlacementType::Line {
            merge_lines(&mut layout_impl.features);
        }

        if layout_impl.features.is_empty() {
            return None;
        }
        Some(layout_impl)
    }

    pub fn source_layer_name(&self) -> &str {
        &self.source_layer_name
    }

    pub fn has_symbol_instances(&self) -> bool {
        !self.symbol_instances.is_empty()
    }

    /// Shape every feature now that glyphs and images are available,
    /// then generate symbol instances per placement mode.
    pub fn prepare_symbols(
        &mut self,
        glyph_map: &GlyphMap,
        glyph_positions: &GlyphPositions,
        image_map: &ImageMap,
        image_positions: &ImagePositions,
        reorderer: &dyn TextReorderer,
    ) {
        let is_point_placement = self.layout.symbol_placement == SymbolPlacementType::Point;
        let text_along_line = self.layout.text_along_line();

        type PendingFeature = (
            usize,
            ShapedTextOrientations,
            Option<PositionedIcon>,
            [f64; 2],
            f64,
            f64,
            SymbolContent,
        );
        let mut to_process: Vec<PendingFeature> = Vec::new();

        for feature_index in 0..self.features.len() {
            if self.features[feature_index].geometry.is_empty() {
                continue;
            }

            let mut shaped_text_orientations = ShapedTextOrientations::default();
            let mut shaped_icon: Option<PositionedIcon> = None;
            let mut text_offset = [0.0, 0.0];
            let layout_text_size = self.layout.text_size;
            let layout_text_size_at_bucket_zoom = self.layout.text_size_at_bucket_zoom;
            let layout_icon_size = self.layout.icon_size;

            if let Some(text) = self.features[feature_index].formatted_text.clone() {
                let mut formatted_text = text;
                if layout_text_size > 0.0 {
                    let line_height = self.layout.text_line_height * ONE_EM;
                    let spacing = if i18n::allows_letter_spacing(formatted_text.raw_text()) {
                        self.layout.text_letter_spacing * ONE_EM
                    } else {
                        0.0
                    };

                    let apply_shaping = |formatted: &TaggedString,
                                         writing_mode: WritingModes,
                                         text_anchor: SymbolAnchorType,
                                         text_justify: TextJustifyType,
                                         text_offset: &[f64; 2]|
                     -> Shaping {
                        shape_text(
                            formatted,
                            if is_point_placement {
                                self.layout.text_max_width * ONE_EM
                            } else {
                                0.0
                            },
                            line_height,
                            text_anchor,
                            text_justify,
                            spacing,
                            text_offset,
                            writing_mode,
                            reorderer,
                            glyph_map,
                            glyph_positions,
                            image_positions,
                            layout_text_size,
                            layout_text_size_at_bucket_zoom,
                            self.allow_vertical_placement,
                        )
                    };

                    let variable_text_anchor = &self.layout.text_variable_anchor;
                    let text_anchor = self.layout.text_anchor;
                    if variable_text_anchor.is_empty() {
                        // Variable-anchor layers compute the offset at
                        // placement time from text-radial-offset
                        // instead; fixed layers bake it in here. When
                        // both offsets are set the radial one wins.
                        if let Some(radial) =
                            self.layout.text_radial_offset.filter(|radial| *radial > 0.0)
                        {
                            text_offset = evaluate_radial_offset(text_anchor, radial * ONE_EM);
                        } else {
                            text_offset = [
                                self.layout.text_offset[0] * ONE_EM,
                                self.layout.text_offset[1] * ONE_EM,
                            ];
                        }
                    }

                    let mut text_justify = if text_along_line {
                        TextJustifyType::Center
                    } else {
                        self.layout.text_justify
                    };

                    if !text_along_line && !variable_text_anchor.is_empty() {
                        // Shape once per justification the variable
                        // anchors can require.
                        let mut justifications: Vec<TextJustifyType> = Vec::new();
                        if text_justify != TextJustifyType::Auto {
                            justifications.push(text_justify);
                        } else {
                            for anchor in variable_text_anchor {
                                justifications.push(anchor_justification(anchor));
                            }
                        }
                        for justification in justifications {
                            if justification_slot_filled(&shaped_text_orientations, justification)
                            {
                                continue;
                            }
                            // Variable anchors share a center-anchored
                            // shaping; placement applies the per-anchor
                            // offset later.
                            let shaping = apply_shaping(
                                &formatted_text,
                                WritingModes::HORIZONTAL,
                                SymbolAnchorType::Center,
                                justification,
                                &text_offset,
                            );
                            if shaping.has_positioned_glyphs() {
                                let single_line = shaping.positioned_lines.len() == 1;
                                set_justification_slot(
                                    &mut shaped_text_orientations,
                                    justification,
                                    shaping,
                                );
                                if single_line {
                                    shaped_text_orientations.single_line = true;
                                    break;
                                }
                            }
                        }

                        if self.allow_vertical_placement
                            && formatted_text.allows_vertical_writing_mode()
                        {
                            formatted_text.verticalize_punctuation();
                            // Vertical POI labels target scripts with a
                            // vertical mode; left justification matches
                            // their layout.
                            shaped_text_orientations.set_vertical(apply_shaping(
                                &formatted_text,
                                WritingModes::VERTICAL,
                                text_anchor,
                                TextJustifyType::Left,
                                &text_offset,
                            ));
                        }
                    } else {
                        if text_justify == TextJustifyType::Auto {
                            text_justify = anchor_justification(&text_anchor);
                        }

                        // Horizontal point or line label.
                        let shaping = apply_shaping(
                            &formatted_text,
                            WritingModes::HORIZONTAL,
                            text_anchor,
                            text_justify,
                            &text_offset,
                        );
                        if shaping.has_positioned_glyphs() {
                            shaped_text_orientations.set_horizontal(shaping);
                        }

                        if self.allow_vertical_placement
                            && formatted_text.allows_vertical_writing_mode()
                        {
                            formatted_text.verticalize_punctuation();
                            shaped_text_orientations.set_vertical(apply_shaping(
                                &formatted_text,
                                WritingModes::VERTICAL,
                                text_anchor,
                                TextJustifyType::Left,
                                &text_offset,
                            ));
                        }

                        // Verticalized line label.
                        if text_along_line && formatted_text.allows_vertical_writing_mode() {
                            formatted_text.verticalize_punctuation();
                            shaped_text_orientations.set_vertical(apply_shaping(
                                &formatted_text,
                                WritingModes::VERTICAL,
                                text_anchor,
                                text_justify,
                                &text_offset,
                            ));
                        }
                    }
                }

                self.features[feature_index].formatted_text = Some(formatted_text);
            }

            let mut icon_type = SymbolContent::empty();
            if let Some(icon_id) = self.features[feature_index].icon_image_id.clone() {
                if let (Some(image), Some(position)) =
                    (image_map.get(&icon_id), image_positions.get(&icon_id))
                {
                    icon_type = if image.sdf {
                        SymbolContent::ICON_SDF
                    } else {
                        SymbolContent::ICON_RGBA
                    };
                    shaped_icon = Some(PositionedIcon::shape_icon(
                        position.clone(),
                        &self.layout.icon_offset,
                        self.layout.icon_anchor,
                    ));
                    if image.pixel_ratio != self.pixel_ratio
                        || self.layout.icon_rotate != 0.0
                    {
                        self.icons_need_linear = true;
                    }
                }
                // A missing image degrades to a text-only feature.
            }

            let default_shaping = default_horizontal_shaping(&shaped_text_orientations);
            self.icons_in_text |=
                default_shaping.has_positioned_glyphs() && default_shaping.icons_in_text;
            if default_shaping.has_positioned_glyphs()
                || shaped_text_orientations.vertical().has_positioned_glyphs()
                || shaped_icon.is_some()
            {
                to_process.push((
                    feature_index,
                    shaped_text_orientations,
                    shaped_icon,
                    text_offset,
                    layout_text_size,
                    layout_icon_size,
                    icon_type,
                ));
            }
        }

        for (
            feature_index,
            shaped_text_orientations,
            shaped_icon,
            text_offset,
            layout_text_size,
            layout_icon_size,
            icon_type,
        ) in to_process
        {
            let feature = self.features[feature_index].clone();
            self.add_feature(
                feature_index,
                &feature,
                &shaped_text_orientations,
                shaped_icon,
                image_map,
                text_offset,
                layout_text_size,
                layout_icon_size,
                icon_type,
            );
            self.features[feature_index].geometry.clear();
        }

        self.compare_text.clear();
    }

    #[allow(clippy::too_many_arguments)]
    fn add_feature(
        &mut self,
        layout_feature_index: usize,
        feature: &SymbolGeometryTileFeature,
        shaped_text_orientations: &ShapedTextOrientations,
        mut shaped_icon: Option<PositionedIcon>,
        image_map: &ImageMap,
        text_offset: [f64; 2],
        layout_text_size: f64,
        layout_icon_size: f64,
        icon_type: SymbolContent,
    ) {
        let glyph_size = ONE_EM;

        let icon_offset = self.layout.icon_offset;
        // Anchor positions are computed with a text size sampled at the
        // highest zoom so every tile of the line agrees on them.
        let text_max_size = self.layout.text_max_size;

        let font_scale = layout_text_size / glyph_size;
        let text_box_scale = self.tile_pixel_ratio * font_scale;
        let text_max_box_scale = self.tile_pixel_ratio * text_max_size / glyph_size;
        let icon_box_scale = self.tile_pixel_ratio * layout_icon_size;
        let symbol_spacing = self.tile_pixel_ratio * self.layout.symbol_spacing;
        let text_padding = self.layout.text_padding * self.tile_pixel_ratio;
        let icon_padding = self.layout.icon_padding * self.tile_pixel_ratio;
        let text_max_angle = deg2radf(self.layout.text_max_angle);
        let icon_rotation = self.layout.icon_rotate;
        let text_rotation = self.layout.text_rotate;
        let variable_text_offset = if let Some(radial) = self.layout.text_radial_offset {
            [radial * ONE_EM, Self::INVALID_OFFSET_VALUE]
        } else {
            [
                self.layout.text_offset[0] * ONE_EM,
                self.layout.text_offset[1] * ONE_EM,
            ]
        };

        let text_placement = if self.layout.text_rotation_alignment != AlignmentType::Map {
            SymbolPlacementType::Point
        } else {
            self.layout.symbol_placement
        };
        let text_repeat_distance = symbol_spacing / 2.0;

        let indexed_feature = IndexedSubfeature {
            feature_index: feature.index as u32,
            source_layer_index: 0,
            bucket_index: 0,
        };

        let icon_text_fit = self.layout.icon_text_fit;
        let has_icon_text_fit = icon_text_fit != IconTextFitType::None;
        let mut vertically_shaped_icon: Option<PositionedIcon> = None;
        if let Some(icon) = &mut shaped_icon {
            if has_icon_text_fit {
                // A vertically shaped icon tracks the vertical text
                // variant when one exists.
                if self.allow_vertical_placement
                    && shaped_text_orientations.vertical().has_positioned_glyphs()
                {
                    let mut vertical_icon = icon.clone();
                    vertical_icon.fit_icon_to_text(
                        shaped_text_orientations.vertical(),
                        icon_text_fit,
                        &self.layout.icon_text_fit_padding,
                        &icon_offset,
                        font_scale,
                    );
                    vertically_shaped_icon = Some(vertical_icon);
                }
                let shaped_text = default_horizontal_shaping(shaped_text_orientations);
                if shaped_text.has_positioned_glyphs() {
                    icon.fit_icon_to_text(
                        shaped_text,
                        icon_text_fit,
                        &self.layout.icon_text_fit_padding,
                        &icon_offset,
                        font_scale,
                    );
                }
            }
        }

        let shaping_for_anchors = if shaped_text_orientations.vertical().has_positioned_glyphs() {
            shaped_text_orientations.vertical()
        } else {
            default_horizontal_shaping(shaped_text_orientations)
        };
        let (text_left, text_right) = (shaping_for_anchors.left, shaping_for_anchors.right);
        let (icon_left, icon_right) = shaped_icon
            .as_ref()
            .map_or((0.0, 0.0), |icon| (icon.left, icon.right));

        let text_along_line = self.layout.text_along_line();
        let allow_vertical_placement = self.allow_vertical_placement;

        let params = InstanceParams {
            shaped_text_orientations,
            shaped_icon: shaped_icon.as_ref(),
            vertically_shaped_icon: vertically_shaped_icon.as_ref(),
            text_box_scale,
            text_padding,
            text_placement,
            text_offset,
            icon_box_scale,
            icon_padding,
            icon_offset,
            indexed_feature,
            layout_feature_index,
            data_feature_index: feature.index,
            key: feature
                .formatted_text
                .as_ref()
                .map_or(0, |text| text.text_hash()),
            icon_rotation,
            text_rotation,
            variable_text_offset,
            icon_type,
            sort_key: feature.sort_key_or_default(),
        };

        let make_shared_data = |line: GeometryCoordinates| {
            Rc::new(SymbolInstanceSharedData::new(
                line,
                shaped_text_orientations,
                shaped_icon.as_ref(),
                vertically_shaped_icon.as_ref(),
                text_offset,
                text_rotation,
                text_along_line,
                image_map,
                icon_rotation,
                icon_type,
                has_icon_text_fit,
                allow_vertical_placement,
            ))
        };

        match self.layout.symbol_placement {
            SymbolPlacementType::Line => {
                let clipped_lines = clip_lines(
                    &feature.geometry,
                    0,
                    0,
                    EXTENT_UINT as i16,
                    EXTENT_UINT as i16,
                );
                for line in &clipped_lines {
                    let anchors = get_anchors(
                        line,
                        symbol_spacing,
                        text_max_angle,
                        text_left,
                        text_right,
                        icon_left,
                        icon_right,
                        glyph_size,
                        text_max_box_scale,
                        self.overscaling,
                    );
                    let shared_data = make_shared_data(line.clone());
                    for anchor in anchors {
                        if let Some(text) = &feature.formatted_text {
                            if self.anchor_is_too_close(
                                text.raw_text(),
                                text_repeat_distance,
                                &anchor,
                            ) {
                                continue;
                            }
                        }
                        self.push_instance(&anchor, Rc::clone(&shared_data), &params);
                    }
                }
            }
            SymbolPlacementType::LineCenter => {
                // No clipping. Lines with only one point are ignored,
                // as in the clipped case.
                for line in &feature.geometry {
                    if line.len() > 1 {
                        if let Some(anchor) = get_center_anchor(
                            line,
                            text_max_angle,
                            text_left,
                            text_right,
                            icon_left,
                            icon_right,
                            glyph_size,
                            text_max_box_scale,
                        ) {
                            let shared_data = make_shared_data(line.clone());
                            self.push_instance(&anchor, shared_data, &params);
                        }
                    }
                }
            }
            SymbolPlacementType::Point => match feature.feature_type {
                FeatureType::Polygon => {
                    for polygon in classify_rings(&feature.geometry) {
                        // One pixel worth of precision in tile units.
                        let pole = pole_of_inaccessibility(&polygon, EXTENT / TILE_SIZE);
                        let anchor = Anchor {
                            point: pole,
                            angle: 0.0,
                            segment: None,
                        };
                        let shared_data = make_shared_data(polygon[0].clone());
                        self.push_instance(&anchor, shared_data, &params);
                    }
                }
                FeatureType::LineString => {
                    for line in &feature.geometry {
                        if line.is_empty() {
                            continue;
                        }
                        let anchor = Anchor {
                            point: convert_point_f64(&line[0]),
                            angle: 0.0,
                            segment: None,
                        };
                        self.push_instance(&anchor, make_shared_data(line.clone()), &params);
                    }
                }
                FeatureType::Point | FeatureType::Unknown => {
                    for points in &feature.geometry {
                        for point in &points.0 {
                            let anchor = Anchor {
                                point: convert_point_f64(point),
                                angle: 0.0,
                                segment: None,
                            };
                            self.push_instance(
                                &anchor,
                                make_shared_data(GeometryCoordinates(vec![*point])),
                                &params,
                            );
                        }
                    }
                }
            },
        }
    }

    fn push_instance(
        &mut self,
        anchor: &Anchor,
        shared_data: Rc<SymbolInstanceSharedData>,
        params: &InstanceParams,
    ) {
        let anchor_inside_tile = anchor.point.x >= 0.0
            && anchor.point.x < EXTENT
            && anchor.point.y >= 0.0
            && anchor.point.y < EXTENT;

        // Continuous rendering only keeps symbols anchored within this
        // tile; neighbors add the rest, and the seam stays duplicate
        // free. Single-tile stills keep everything so edge labels
        // render and collisions approximate the missing neighbors.
        if self.mode != MapMode::Tile && !anchor_inside_tile {
            return;
        }

        self.symbol_instances.push(SymbolInstance::new(
            *anchor,
            shared_data,
            params.shaped_text_orientations,
            params.shaped_icon,
            params.vertically_shaped_icon,
            params.text_box_scale,
            params.text_padding,
            params.text_placement,
            params.text_offset,
            params.icon_box_scale,
            params.icon_padding,
            params.icon_offset,
            &mut self.collision_boxes,
            params.indexed_feature,
            params.layout_feature_index,
            params.data_feature_index,
            params.key,
            self.overscaling,
            params.icon_rotation,
            params.text_rotation,
            params.variable_text_offset,
            self.allow_vertical_placement,
            params.icon_type,
        ));

        if self.sort_features_by_key {
            match self.sort_key_ranges.last_mut() {
                Some(range) if range.sort_key == params.sort_key => {
                    range.end = self.symbol_instances.len();
                }
                _ => self.sort_key_ranges.push(SortKeyRange {
                    sort_key: params.sort_key,
                    start: self.symbol_instances.len() - 1,
                    end: self.symbol_instances.len(),
                }),
            }
        }
    }

    /// A `line` anchor is rejected when another anchor with identical
    /// text sits within half the symbol spacing.
    fn anchor_is_too_close(
        &mut self,
        text: &U16String,
        repeat_distance: f64,
        anchor: &Anchor,
    ) -> bool {
        if let Some(other_anchors) = self.compare_text.get(text) {
            for other_anchor in other_anchors {
                if anchor.point.distance_to(other_anchor.point) < repeat_distance {
                    return true;
                }
            }
        }
        self.compare_text
            .entry(text.clone())
            .or_default()
            .push(*anchor);
        false
    }

    /// Populate and hand back the bucket: per instance, icons first so
    /// text can reference its icon, then one placed symbol per
    /// justification variant plus the vertical variant.
    pub fn create_bucket(mut self, first_load: bool) -> SymbolBucket {
        let mut bucket = SymbolBucket::new(
            self.bucket_leader_id.clone(),
            self.zoom,
            self.tile_pixel_ratio,
            self.icons_need_linear,
            self.sort_features_by_y,
            self.allow_vertical_placement,
            self.placement_modes.clone(),
            self.icons_in_text,
        );
        bucket.just_reloaded = !first_load;
        bucket.sort_key_ranges = std::mem::take(&mut self.sort_key_ranges);

        let text_size_data = self.layout.text_size_at_bucket_zoom..self.layout.text_size;
        let icon_size_data = self.layout.icon_size..self.layout.icon_size;

        let mut symbol_instances = std::mem::take(&mut self.symbol_instances);
        for symbol_instance in &mut symbol_instances {
            let has_text = symbol_instance.has_text();
            let has_icon = symbol_instance.has_icon();
            let single_line = symbol_instance.single_line;
            let sort_key = self.features[symbol_instance.layout_feature_index].sort_key_or_default();

            // The line-vertex trail is shared by every placed symbol of
            // this instance.
            let line_range = add_to_line_vertex_array(
                &symbol_instance.anchor,
                symbol_instance.line(),
                &mut bucket.line_vertices,
            );

            // Icons first, so text placed symbols can reference their
            // icon for icon-text-fit updates.
            if has_icon {
                if symbol_instance.icon_quads_size != 0 {
                    let index = {
                        let quads = symbol_instance.icon_quads().expect("icon quads exist");
                        let buffer = if symbol_instance.has_sdf_icon() {
                            &mut bucket.sdf_icon
                        } else {
                            &mut bucket.icon
                        };
                        add_placed_symbol(
                            buffer,
                            &mut bucket.glyph_offsets,
                            quads,
                            icon_size_data.clone(),
                            line_range.clone(),
                            &symbol_instance.anchor,
                            symbol_instance.icon_offset,
                            WritingModes::empty(),
                            0.0,
                            None,
                            sort_key,
                        )
                    };
                    symbol_instance.placed_icon_index = Some(index);
                }
                if symbol_instance.vertical_icon_quads().is_some() {
                    let index = {
                        let quads = symbol_instance
                            .vertical_icon_quads()
                            .expect("checked just above");
                        let buffer = if symbol_instance.has_sdf_icon() {
                            &mut bucket.sdf_icon
                        } else {
                            &mut bucket.icon
                        };
                        add_placed_symbol(
                            buffer,
                            &mut bucket.glyph_offsets,
                            quads,
                            icon_size_data.clone(),
                            line_range.clone(),
                            &symbol_instance.anchor,
                            symbol_instance.icon_offset,
                            WritingModes::VERTICAL,
                            if self.allow_vertical_placement {
                                PI / 2.0
                            } else {
                                0.0
                            },
                            None,
                            sort_key,
                        )
                    };
                    symbol_instance.placed_vertical_icon_index = Some(index);
                }
            }

            if has_text {
                if single_line {
                    let index = add_placed_symbol(
                        &mut bucket.text,
                        &mut bucket.glyph_offsets,
                        symbol_instance.right_justified_glyph_quads(),
                        text_size_data.clone(),
                        line_range.clone(),
                        &symbol_instance.anchor,
                        symbol_instance.text_offset,
                        symbol_instance.writing_modes,
                        0.0,
                        symbol_instance.placed_icon_index,
                        sort_key,
                    );
                    symbol_instance.placed_right_text_index = Some(index);
                    symbol_instance.placed_center_text_index = Some(index);
                    symbol_instance.placed_left_text_index = Some(index);
                } else {
                    if symbol_instance.right_justified_glyph_quads_size != 0 {
                        let index = add_placed_symbol(
                            &mut bucket.text,
                            &mut bucket.glyph_offsets,
                            symbol_instance.right_justified_glyph_quads(),
                            text_size_data.clone(),
                            line_range.clone(),
                            &symbol_instance.anchor,
                            symbol_instance.text_offset,
                            symbol_instance.writing_modes,
                            0.0,
                            symbol_instance.placed_icon_index,
                            sort_key,
                        );
                        symbol_instance.placed_right_text_index = Some(index);
                    }
                    if symbol_instance.center_justified_glyph_quads_size != 0 {
                        let index = add_placed_symbol(
                            &mut bucket.text,
                            &mut bucket.glyph_offsets,
                            symbol_instance.center_justified_glyph_quads(),
                            text_size_data.clone(),
                            line_range.clone(),
                            &symbol_instance.anchor,
                            symbol_instance.text_offset,
                            symbol_instance.writing_modes,
                            0.0,
                            symbol_instance.placed_icon_index,
                            sort_key,
                        );
                        symbol_instance.placed_center_text_index = Some(index);
                    }
                    if symbol_instance.left_justified_glyph_quads_size != 0 {
                        let index = add_placed_symbol(
                            &mut bucket.text,
                            &mut bucket.glyph_offsets,
                            symbol_instance.left_justified_glyph_quads(),
                            text_size_data.clone(),
                            line_range.clone(),
                            &symbol_instance.anchor,
                            symbol_instance.text_offset,
                            symbol_instance.writing_modes,
                            0.0,
                            symbol_instance.placed_icon_index,
                            sort_key,
                        );
                        symbol_instance.placed_left_text_index = Some(index);
                    }
                }
                if symbol_instance.writing_modes.contains(WritingModes::VERTICAL)
                    && symbol_instance.vertical_glyph_quads_size != 0
                {
                    let index = add_placed_symbol(
                        &mut bucket.text,
                        &mut bucket.glyph_offsets,
                        symbol_instance.vertical_glyph_quads(),
                        text_size_data.clone(),
                        line_range.clone(),
                        &symbol_instance.anchor,
                        symbol_instance.text_offset,
                        WritingModes::VERTICAL,
                        if self.allow_vertical_placement {
                            PI / 2.0
                        } else {
                            0.0
                        },
                        symbol_instance.placed_vertical_icon_index,
                        sort_key,
                    );
                    symbol_instance.placed_vertical_text_index = Some(index);
                }
            }

            symbol_instance.release_shared_data();
        }

        bucket.symbol_instances = symbol_instances;
        bucket.collision_boxes = std::mem::take(&mut self.collision_boxes);
        bucket
    }
}

/// Record the bidirectional walkable trail for a line anchor: each line
/// point with its cumulative distance from the anchor, growing outward
/// in both directions. Point anchors record nothing.
fn add_to_line_vertex_array(
    anchor: &Anchor,
    line: &GeometryCoordinates,
    line_vertices: &mut LineVertexArray,
) -> Range<usize> {
    let start = line_vertices.len();
    let Some(segment) = anchor.segment else {
        return start..start;
    };
    assert!(segment < line.len());

    let mut distances = vec![0.0; line.len()];
    let mut sum_forward = if segment + 1 < line.len() {
        anchor
            .point
            .distance_to(convert_point_f64(&line[segment + 1]))
    } else {
        0.0
    };
    let mut sum_backward = anchor.point.distance_to(convert_point_f64(&line[segment]));

    for i in segment + 1..line.len() {
        distances[i] = sum_forward;
        if i < line.len() - 1 {
            sum_forward +=
                convert_point_f64(&line[i + 1]).distance_to(convert_point_f64(&line[i]));
        }
    }
    let mut i = segment;
    loop {
        distances[i] = sum_backward;
        if i == 0 {
            break;
        }
        sum_backward += convert_point_f64(&line[i - 1]).distance_to(convert_point_f64(&line[i]));
        i -= 1;
    }

    for (i, point) in line.0.iter().enumerate() {
        line_vertices.emplace_back(&LineVertex {
            x: point.x,
            y: point.y,
            tile_unit_distance_from_anchor: distances[i],
        });
    }

    start..line_vertices.len()
}

/// Append one quad: four static vertices, their dynamic and opacity
/// slots, and two triangles. Returns the global index of the first
/// vertex.
fn add_symbol(
    buffer: &mut SymbolBucketBuffer,
    size_data: Range<f64>,
    quad: &SymbolQuad,
    label_anchor: &Anchor,
    sort_key: f64,
) -> usize {
    const VERTEX_LENGTH: usize = 4;

    let needs_new_segment = match buffer.segments.last() {
        Some(segment) => {
            segment.vertex_length + VERTEX_LENGTH > u16::MAX as usize
                || (segment.sort_key - sort_key).abs() > f64::EPSILON
        }
        None => true,
    };
    if needs_new_segment {
        buffer.segments.push(Segment {
            vertex_offset: buffer.vertices.len(),
            index_offset: buffer.triangles.len(),
            vertex_length: 0,
            index_length: 0,
            sort_key,
        });
    }

    let segment = buffer.segments.last_mut().expect("pushed above");
    let index = segment.vertex_length as u16;
    let global_index = buffer.vertices.len();

    let tex = quad.tex;
    buffer.vertices.emplace_back(&SymbolVertex::new(
        label_anchor.point,
        quad.tl,
        quad.glyph_offset.y,
        tex.origin.x,
        tex.origin.y,
        size_data.clone(),
        quad.is_sdf,
        quad.pixel_offset_tl,
        quad.min_font_scale,
    ));
    buffer.vertices.emplace_back(&SymbolVertex::new(
        label_anchor.point,
        quad.tr,
        quad.glyph_offset.y,
        tex.origin.x + tex.size.width,
        tex.origin.y,
        size_data.clone(),
        quad.is_sdf,
        euclid::Point2D::new(quad.pixel_offset_br.x, quad.pixel_offset_tl.y),
        quad.min_font_scale,
    ));
    buffer.vertices.emplace_back(&SymbolVertex::new(
        label_anchor.point,
        quad.bl,
        quad.glyph_offset.y,
        tex.origin.x,
        tex.origin.y + tex.size.height,
        size_data.clone(),
        quad.is_sdf,
        euclid::Point2D::new(quad.pixel_offset_tl.x, quad.pixel_offset_br.y),
        quad.min_font_scale,
    ));
    buffer.vertices.emplace_back(&SymbolVertex::new(
        label_anchor.point,
        quad.br,
        quad.glyph_offset.y,
        tex.origin.x + tex.size.width,
        tex.origin.y + tex.size.height,
        size_data,
        quad.is_sdf,
        quad.pixel_offset_br,
        quad.min_font_scale,
    ));

    // Dynamic and opacity slots always track the static vertex count;
    // both are rewritten before the first frame renders.
    let dynamic_vertex = DynamicVertex::new(label_anchor.point.x, label_anchor.point.y, 0.0);
    let opacity_vertex = OpacityVertex::new(true, 1.0);
    for _ in 0..VERTEX_LENGTH {
        buffer.dynamic_vertices.emplace_back(&dynamic_vertex);
        buffer.opacity_vertices.emplace_back(&opacity_vertex);
    }

    buffer.triangles.emplace_back(&TriangleIndex {
        a: index,
        b: index + 1,
        c: index + 2,
    });
    buffer.triangles.emplace_back(&TriangleIndex {
        a: index + 1,
        b: index + 2,
        c: index + 3,
    });

    let segment = buffer.segments.last_mut().expect("pushed above");
    segment.vertex_length += VERTEX_LENGTH;
    segment.index_length += 6;

    global_index
}

/// Append a run of quads as one placed symbol, recording its glyph
/// offset range. Quads past the per-bucket glyph budget are dropped
/// with a deduplicated warning.
#[allow(clippy::too_many_arguments)]
fn add_placed_symbol(
    buffer: &mut SymbolBucketBuffer,
    glyph_offsets: &mut GlyphOffsetArray,
    quads: &SymbolQuads,
    size_data: Range<f64>,
    line_range: Range<usize>,
    anchor: &Anchor,
    line_offset: [f64; 2],
    writing_modes: WritingModes,
    angle: f64,
    placed_icon_index: Option<usize>,
    sort_key: f64,
) -> usize {
    let glyph_start_index = glyph_offsets.len();
    let vertex_start_index = buffer.vertices.len();

    for quad in quads {
        if glyph_offsets.len() >= MAX_GLYPHS {
            warn_once("Too many glyphs being rendered in a tile.");
            break;
        }
        add_symbol(buffer, size_data.clone(), quad, anchor, sort_key);
        glyph_offsets.emplace_back(&GlyphOffset {
            offset_x: quad.glyph_offset.x,
        });
    }

    buffer.placed_symbols.push(PlacedSymbol {
        anchor_point: anchor.point,
        segment: anchor.segment.unwrap_or(0),
        lower_size: size_data.start,
        upper_size: size_data.end,
        line_offset,
        writing_modes,
        line_start_index: line_range.start,
        line_length: line_range.len(),
        glyph_start_index,
        glyph_count: glyph_offsets.len() - glyph_start_index,
        vertex_start_index,
        hidden: false,
        angle,
        placed_orientation: None,
        cross_tile_id: 0,
        placed_icon_index,
    });
    buffer.placed_symbols.len() - 1
}

#[cfg(test)]
mod tests {
    use euclid::{Point2D, Rect, Size2D};

    use super::*;
    use crate::{
        bidi::LogicalOrder,
        coords::{CanonicalTileID, OverscaledTileID},
        font_stack::FontStackHasher,
        geometry::GeometryCoordinate,
        glyph::{Glyph, GlyphDependencies, GlyphMetrics, Glyphs},
        glyph_atlas::{GlyphPosition, GlyphPositionMap},
        image::ImageDependencies,
        tagged_string::SectionOptions,
    };

    fn test_fonts() -> Vec<String> {
        vec!["Open Sans Regular".to_string()]
    }

    fn glyph_fixture(codes: &str) -> (GlyphMap, GlyphPositions) {
        let metrics = GlyphMetrics {
            width: 18,
            height: 18,
            left: 2,
            top: -8,
            advance: 21,
        };
        let mut glyphs = Glyphs::new();
        let mut positions = GlyphPositionMap::new();
        for code in codes.encode_utf16() {
            glyphs.insert(code, Some(Glyph { id: code, metrics }));
            positions.insert(
                code,
                GlyphPosition {
                    rect: Rect::new(Point2D::new(0, 0), Size2D::new(24, 24)),
                    metrics,
                },
            );
        }
        let hash = FontStackHasher::new(&test_fonts());
        (
            GlyphMap::from([(hash, glyphs)]),
            GlyphPositions::from([(hash, positions)]),
        )
    }

    fn text_feature(text: &str, geometry: Vec<GeometryCoordinates>, feature_type: FeatureType) -> SymbolGeometryTileFeature {
        let mut feature = SymbolGeometryTileFeature::new(feature_type, geometry);
        feature.formatted_text = Some(TaggedString::new_from_raw(
            text.into(),
            SectionOptions::new(1.0, test_fonts(), None),
        ));
        feature
    }

    fn parameters() -> BucketParameters {
        BucketParameters {
            tile_id: OverscaledTileID::new(10, 0, CanonicalTileID::new(10, 5, 5)),
            mode: MapMode::Continuous,
            pixel_ratio: 1.0,
        }
    }

    fn build_layout(
        features: Vec<SymbolGeometryTileFeature>,
        layout_values: SymbolLayoutValues,
    ) -> (Option<SymbolLayout>, GlyphDependencies) {
        let mut glyph_dependencies = GlyphDependencies::new();
        let mut image_dependencies = ImageDependencies::new();
        let layout = SymbolLayout::new(
            &parameters(),
            "layer".to_string(),
            layout_values,
            SymbolGeometryTileLayer {
                name: "source".to_string(),
                features,
            },
            &mut LayoutDependencies {
                glyph_dependencies: &mut glyph_dependencies,
                image_dependencies: &mut image_dependencies,
            },
        );
        (layout, glyph_dependencies)
    }

    #[test]
    fn point_feature_fills_text_buffers() {
        let mut layout_values = SymbolLayoutValues::default();
        layout_values.text_font = test_fonts();
        let (layout, glyph_dependencies) = build_layout(
            vec![text_feature(
                "ab",
                vec![GeometryCoordinates(vec![GeometryCoordinate::new(1024, 1024)])],
                FeatureType::Point,
            )],
            layout_values,
        );
        let mut layout = layout.expect("feature has text");
        assert_eq!(glyph_dependencies.len(), 1);
        assert!(glyph_dependencies.values().next().expect("one stack").len() >= 2);

        let (glyph_map, glyph_positions) = glyph_fixture("ab");
        layout.prepare_symbols(
            &glyph_map,
            &glyph_positions,
            &ImageMap::new(),
            &ImagePositions::new(),
            &LogicalOrder,
        );
        assert_eq!(layout.symbol_instances.len(), 1);
        assert!(layout.symbol_instances[0].has_text());

        let bucket = layout.create_bucket(true);
        assert!(bucket.has_text_data());
        assert!(!bucket.has_icon_data());
        // Two glyphs, four corners each.
        assert_eq!(bucket.text.vertices.len(), 8);
        assert_eq!(bucket.text.dynamic_vertices.len(), 8);
        assert_eq!(bucket.text.placed_symbols.len(), 1);
        assert_eq!(bucket.text.placed_symbols[0].glyph_count, 2);
        assert!(!bucket.collision_boxes.is_empty());
        // Point anchors record no line trail.
        assert_eq!(bucket.line_vertices.len(), 0);
    }

    #[test]
    fn out_of_tile_anchor_is_dropped_in_continuous_mode() {
        let mut layout_values = SymbolLayoutValues::default();
        layout_values.text_font = test_fonts();
        let feature = |x: i16| {
            text_feature(
                "ab",
                vec![GeometryCoordinates(vec![GeometryCoordinate::new(x, 100)])],
                FeatureType::Point,
            )
        };

        let (layout, _) = build_layout(vec![feature(-50)], layout_values.clone());
        let mut layout = layout.expect("has text");
        let (glyph_map, glyph_positions) = glyph_fixture("ab");
        layout.prepare_symbols(
            &glyph_map,
            &glyph_positions,
            &ImageMap::new(),
            &ImagePositions::new(),
            &LogicalOrder,
        );
        assert!(layout.symbol_instances.is_empty());

        // The same feature in single-tile mode keeps its instance.
        let mut glyph_dependencies = GlyphDependencies::new();
        let mut image_dependencies = ImageDependencies::new();
        let mut tile_parameters = parameters();
        tile_parameters.mode = MapMode::Tile;
        let mut layout = SymbolLayout::new(
            &tile_parameters,
            "layer".to_string(),
            layout_values,
            SymbolGeometryTileLayer {
                name: "source".to_string(),
                features: vec![feature(-50)],
            },
            &mut LayoutDependencies {
                glyph_dependencies: &mut glyph_dependencies,
                image_dependencies: &mut image_dependencies,
            },
        )
        .expect("has text");
        layout.prepare_symbols(
            &glyph_map,
            &glyph_positions,
            &ImageMap::new(),
            &ImagePositions::new(),
            &LogicalOrder,
        );
        assert_eq!(layout.symbol_instances.len(), 1);
    }

    #[test]
    fn line_placement_walks_anchors_and_records_trails() {
        let mut layout_values = SymbolLayoutValues::default();
        layout_values.text_font = test_fonts();
        layout_values.symbol_placement = SymbolPlacementType::Line;
        layout_values.text_rotation_alignment = AlignmentType::Map;
        layout_values.symbol_spacing = 150.0;

        let line: Vec<GeometryCoordinate> =
            (0..40).map(|i| GeometryCoordinate::new(i * 100, 2000)).collect();
        let (layout, _) = build_layout(
            vec![text_feature(
                "ab",
                vec![GeometryCoordinates(line)],
                FeatureType::LineString,
            )],
            layout_values,
        );
        let mut layout = layout.expect("has text");
        let (glyph_map, glyph_positions) = glyph_fixture("ab");
        layout.prepare_symbols(
            &glyph_map,
            &glyph_positions,
            &ImageMap::new(),
            &ImagePositions::new(),
            &LogicalOrder,
        );
        assert!(layout.symbol_instances.len() > 1);

        let bucket = layout.create_bucket(true);
        let placed = &bucket.text.placed_symbols[0];
        assert!(placed.line_length > 1);
        // Distances grow outward from the anchor in both directions.
        let anchor_index = placed.line_start_index + placed.segment;
        let at_anchor = bucket
            .line_vertices
            .get(anchor_index)
            .tile_unit_distance_from_anchor;
        let at_end = bucket
            .line_vertices
            .get(placed.line_start_index + placed.line_length - 1)
            .tile_unit_distance_from_anchor;
        assert!(at_end > at_anchor);
    }

    #[test]
    fn line_anchors_with_same_text_deduplicate() {
        let mut layout_values = SymbolLayoutValues::default();
        layout_values.text_font = test_fonts();
        layout_values.symbol_placement = SymbolPlacementType::Line;
        layout_values.text_rotation_alignment = AlignmentType::Map;
        layout_values.symbol_spacing = 150.0;

        let make_line = |y: i16| -> SymbolGeometryTileFeature {
            text_feature(
                "ab",
                vec![GeometryCoordinates(
                    (0..40).map(|i| GeometryCoordinate::new(i * 100, y)).collect(),
                )],
                FeatureType::LineString,
            )
        };

        // Two overlapping copies of the same line: the second line's
        // anchors all fall within half the spacing of the first's.
        let (layout, _) = build_layout(vec![make_line(2000), make_line(2000)], layout_values);
        let mut layout = layout.expect("has text");
        let (glyph_map, glyph_positions) = glyph_fixture("ab");
        layout.prepare_symbols(
            &glyph_map,
            &glyph_positions,
            &ImageMap::new(),
            &ImagePositions::new(),
            &LogicalOrder,
        );

        let unique_anchors: std::collections::BTreeSet<(i64, i64)> = layout
            .symbol_instances
            .iter()
            .map(|instance| {
                (
                    instance.anchor.point.x.round() as i64,
                    instance.anchor.point.y.round() as i64,
                )
            })
            .collect();
        assert_eq!(unique_anchors.len(), layout.symbol_instances.len());
    }

    #[test]
    fn sort_keys_order_features_and_record_ranges() {
        let mut layout_values = SymbolLayoutValues::default();
        layout_values.text_font = test_fonts();

        let keyed_feature = |x: i16, key: f64| {
            let mut feature = text_feature(
                "ab",
                vec![GeometryCoordinates(vec![GeometryCoordinate::new(x, 100)])],
                FeatureType::Point,
            );
            feature.sort_key = Some(key);
            feature
        };

        let (layout, _) = build_layout(
            vec![keyed_feature(100, 5.0), keyed_feature(200, 1.0), keyed_feature(300, 3.0)],
            layout_values,
        );
        let mut layout = layout.expect("has text");
        let (glyph_map, glyph_positions) = glyph_fixture("ab");
        layout.prepare_symbols(
            &glyph_map,
            &glyph_positions,
            &ImageMap::new(),
            &ImagePositions::new(),
            &LogicalOrder,
        );

        let bucket = layout.create_bucket(true);
        assert_eq!(bucket.sort_key_ranges.len(), 3);
        assert_eq!(bucket.sort_key_ranges[0].sort_key, 1.0);
        assert!(bucket.sort_key_ranges[0].is_first_range());
        assert_eq!(bucket.sort_key_ranges[2].sort_key, 5.0);
        // The instances' anchors come out in sort key order.
        assert_eq!(bucket.symbol_instances[0].anchor.point.x, 200.0);
        assert_eq!(bucket.symbol_instances[1].anchor.point.x, 300.0);
        assert_eq!(bucket.symbol_instances[2].anchor.point.x, 100.0);
    }

    #[test]
    fn empty_shaping_skips_the_feature() {
        let mut layout_values = SymbolLayoutValues::default();
        layout_values.text_font = test_fonts();
        let (layout, _) = build_layout(
            vec![text_feature(
                "zz",
                vec![GeometryCoordinates(vec![GeometryCoordinate::new(100, 100)])],
                FeatureType::Point,
            )],
            layout_values,
        );
        let mut layout = layout.expect("has text");
        // The glyph fixture has no "z" glyphs at all.
        let (glyph_map, glyph_positions) = glyph_fixture("ab");
        layout.prepare_symbols(
            &glyph_map,
            &glyph_positions,
            &ImageMap::new(),
            &ImagePositions::new(),
            &LogicalOrder,
        );
        assert!(layout.symbol_instances.is_empty());
    }

    #[test]
    fn tile_distances_grow_outward() {
        let line = GeometryCoordinates(vec![
            GeometryCoordinate::new(0, 0),
            GeometryCoordinate::new(100, 0),
            GeometryCoordinate::new(200, 0),
            GeometryCoordinate::new(300, 0),
        ]);
        let anchor = Anchor {
            point: Point2D::new(150.0, 0.0),
            angle: 0.0,
            segment: Some(1),
        };
        let mut line_vertices = LineVertexArray::new();
        let range = add_to_line_vertex_array(&anchor, &line, &mut line_vertices);
        assert_eq!(range, 0..4);

        let distances: Vec<f64> = (0..4)
            .map(|i| line_vertices.get(i).tile_unit_distance_from_anchor)
            .collect();
        assert_eq!(distances, vec![150.0, 50.0, 50.0, 150.0]);
    }

    #[test]
    fn radial_offsets_follow_the_anchor_direction() {
        let right = evaluate_radial_offset(SymbolAnchorType::Right, 24.0);
        assert!(right[0] < 0.0);
        assert_eq!(right[1], 0.0);

        let top_left = evaluate_radial_offset(SymbolAnchorType::TopLeft, 24.0);
        assert!(top_left[0] > 0.0);
        assert!(top_left[1] > 0.0);

        // Negative offsets are ignored.
        assert_eq!(evaluate_radial_offset(SymbolAnchorType::Left, -5.0), [0.0, 0.0]);
    }
}
