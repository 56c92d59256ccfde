//! Text shaping: rich text in, positioned glyph runs out.
//!
//! Line breaking picks from candidate break positions (whitespace,
//! breaking punctuation, ideographic characters, inline images) by
//! minimizing squared deviation from the target line width plus break
//! penalties, with the optimal sequence recovered through backward
//! pointers. Lines may exceed the maximum width when no candidate
//! exists.

use std::collections::BTreeSet;

use crate::{
    bidi::{Char16, TextReorderer},
    glyph::{Glyph, GlyphMap, PositionedGlyph, PositionedLine, Shaping, WritingModes},
    glyph_atlas::GlyphPositions,
    image_atlas::{ImagePosition, ImagePositions},
    style_types::{IconTextFitType, SymbolAnchorType, TextJustifyType},
    tagged_string::{SectionOptions, TaggedString},
    util::{i18n, ONE_EM},
};

/// Zero width space, used to suggest break points for CJK labels.
const ZWSP: Char16 = 0x200B;

#[derive(Clone, Copy, Default, PartialEq)]
pub struct Padding {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Padding {
    pub fn is_any(&self) -> bool {
        self.left != 0.0 || self.top != 0.0 || self.right != 0.0 || self.bottom != 0.0
    }
}

struct AnchorAlignment {
    horizontal: f64,
    vertical: f64,
}

impl AnchorAlignment {
    fn for_anchor(anchor: SymbolAnchorType) -> AnchorAlignment {
        let mut result = AnchorAlignment {
            horizontal: 0.5,
            vertical: 0.5,
        };
        match anchor {
            SymbolAnchorType::Right
            | SymbolAnchorType::TopRight
            | SymbolAnchorType::BottomRight => result.horizontal = 1.0,
            SymbolAnchorType::Left | SymbolAnchorType::TopLeft | SymbolAnchorType::BottomLeft => {
                result.horizontal = 0.0
            }
            _ => {}
        }
        match anchor {
            SymbolAnchorType::Bottom
            | SymbolAnchorType::BottomLeft
            | SymbolAnchorType::BottomRight => result.vertical = 1.0,
            SymbolAnchorType::Top | SymbolAnchorType::TopLeft | SymbolAnchorType::TopRight => {
                result.vertical = 0.0
            }
            _ => {}
        }
        result
    }
}

/// The justification matching the direction of a text anchor.
pub fn anchor_justification(anchor: &SymbolAnchorType) -> TextJustifyType {
    match anchor {
        SymbolAnchorType::Right | SymbolAnchorType::TopRight | SymbolAnchorType::BottomRight => {
            TextJustifyType::Right
        }
        SymbolAnchorType::Left | SymbolAnchorType::TopLeft | SymbolAnchorType::BottomLeft => {
            TextJustifyType::Left
        }
        _ => TextJustifyType::Center,
    }
}

/// An icon positioned relative to its anchor, before quad generation.
#[derive(Clone)]
pub struct PositionedIcon {
    pub image: ImagePosition,
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
    pub collision_padding: Padding,
}

impl PositionedIcon {
    pub fn shape_icon(
        image: ImagePosition,
        icon_offset: &[f64; 2],
        icon_anchor: SymbolAnchorType,
    ) -> PositionedIcon {
        let align = AnchorAlignment::for_anchor(icon_anchor);
        let [display_width, display_height] = image.display_size();
        let left = icon_offset[0] - display_width * align.horizontal;
        let right = left + display_width;
        let top = icon_offset[1] - display_height * align.vertical;
        let bottom = top + display_height;

        let mut collision_padding = Padding::default();
        if let Some(content) = &image.content {
            let pixel_ratio = image.pixel_ratio;
            collision_padding.left = content.left / pixel_ratio;
            collision_padding.top = content.top / pixel_ratio;
            collision_padding.right = display_width - content.right / pixel_ratio;
            collision_padding.bottom = display_height - content.bottom / pixel_ratio;
        }

        PositionedIcon {
            image,
            top,
            bottom,
            left,
            right,
            collision_padding,
        }
    }

    /// Resize and recenter the icon footprint to the companion text box.
    /// The icon anchor is ignored once a fit mode is active; stretched
    /// axes take per-side padding, centered axes keep the display size.
    pub fn fit_icon_to_text(
        &mut self,
        shaped_text: &Shaping,
        text_fit: IconTextFitType,
        padding: &[f64; 4],
        icon_offset: &[f64; 2],
        font_scale: f64,
    ) {
        assert!(text_fit != IconTextFitType::None);
        let [display_width, display_height] = self.image.display_size();

        let text_left = shaped_text.left * font_scale;
        let text_right = shaped_text.right * font_scale;
        if text_fit == IconTextFitType::Width || text_fit == IconTextFitType::Both {
            self.left = icon_offset[0] + text_left - padding[3];
            self.right = icon_offset[0] + text_right + padding[1];
        } else {
            self.left = icon_offset[0] + (text_left + text_right - display_width) / 2.0;
            self.right = self.left + display_width;
        }

        let text_top = shaped_text.top * font_scale;
        let text_bottom = shaped_text.bottom * font_scale;
        if text_fit == IconTextFitType::Height || text_fit == IconTextFitType::Both {
            self.top = icon_offset[1] + text_top - padding[0];
            self.bottom = icon_offset[1] + text_bottom + padding[2];
        } else {
            self.top = icon_offset[1] + (text_top + text_bottom - display_height) / 2.0;
            self.bottom = self.top + display_height;
        }
    }
}

/// Shape a tagged string into positioned glyph lines. The result may be
/// empty (no positioned glyphs); callers skip the feature in that case.
#[allow(clippy::too_many_arguments)]
pub fn shape_text(
    formatted: &TaggedString,
    max_width: f64,
    line_height: f64,
    text_anchor: SymbolAnchorType,
    text_justify: TextJustifyType,
    spacing: f64,
    translate: &[f64; 2],
    writing_mode: WritingModes,
    reorderer: &dyn TextReorderer,
    glyph_map: &GlyphMap,
    glyph_positions: &GlyphPositions,
    image_positions: &ImagePositions,
    layout_text_size: f64,
    layout_text_size_at_bucket_zoom: f64,
    allow_vertical_placement: bool,
) -> Shaping {
    assert!(layout_text_size != 0.0);

    let breaks = determine_line_breaks(formatted, spacing, max_width, glyph_map, image_positions, layout_text_size);

    let mut reordered_lines: Vec<TaggedString> = Vec::new();
    if formatted.section_count() == 1 {
        for line in reorderer.process_text(formatted.raw_text(), breaks) {
            reordered_lines.push(TaggedString::new_from_raw(
                line,
                formatted.section_at(0).clone(),
            ));
        }
    } else {
        for line in reorderer.process_styled_text(formatted.styled_text(), breaks) {
            reordered_lines.push(TaggedString::new(line, formatted.sections().to_vec()));
        }
    }

    let mut shaping = Shaping::new(translate[0], translate[1], writing_mode);
    shape_lines(
        &mut shaping,
        &mut reordered_lines,
        spacing,
        line_height,
        text_anchor,
        text_justify,
        writing_mode,
        glyph_map,
        glyph_positions,
        image_positions,
        layout_text_size_at_bucket_zoom,
        allow_vertical_placement,
    );
    shaping
}

fn glyph_advance(
    code_point: Char16,
    section: &SectionOptions,
    glyph_map: &GlyphMap,
    image_positions: &ImagePositions,
    layout_text_size: f64,
    spacing: f64,
) -> f64 {
    if let Some(image_id) = &section.image_id {
        let Some(image) = image_positions.get(image_id) else {
            return 0.0;
        };
        image.display_size()[0] * section.scale * ONE_EM / layout_text_size + spacing
    } else {
        let Some(glyph) = glyph_map
            .get(&section.font_stack_hash)
            .and_then(|glyphs| glyphs.get(&code_point))
            .and_then(|glyph| glyph.as_ref())
        else {
            return 0.0;
        };
        glyph.metrics.advance as f64 * section.scale + spacing
    }
}

fn determine_average_line_width(
    logical_input: &TaggedString,
    spacing: f64,
    max_width: f64,
    glyph_map: &GlyphMap,
    image_positions: &ImagePositions,
    layout_text_size: f64,
) -> f64 {
    let mut total_width: f64 = 0.0;
    for i in 0..logical_input.length() {
        total_width += glyph_advance(
            logical_input.char_code_at(i),
            logical_input.section(i),
            glyph_map,
            image_positions,
            layout_text_size,
            spacing,
        );
    }
    let target_line_count = (total_width / max_width).ceil().max(1.0);
    total_width / target_line_count
}

fn calculate_badness(line_width: f64, target_width: f64, penalty: f64, is_last_break: bool) -> f64 {
    let raggedness = (line_width - target_width).powi(2);
    if is_last_break {
        // Favor final lines shorter than average over longer than average
        if line_width < target_width {
            return raggedness / 2.0;
        }
        return raggedness * 2.0;
    }
    if penalty < 0.0 {
        return raggedness - penalty * penalty;
    }
    raggedness + penalty * penalty
}

fn calculate_penalty(
    code_point: Char16,
    next_code_point: Char16,
    penalizable_ideographic_break: bool,
) -> f64 {
    let mut penalty = 0.0;
    // Force break on newline
    if code_point == 0x0a {
        penalty -= 10000.0;
    }
    // Penalize open parenthesis at end of line
    if code_point == 0x28 || code_point == 0xff08 {
        penalty += 50.0;
    }
    // Penalize close parenthesis at beginning of line
    if next_code_point == 0x29 || next_code_point == 0xff09 {
        penalty += 50.0;
    }
    // Ideographic breaks are worse than breaks the text suggested itself
    if penalizable_ideographic_break {
        penalty += 150.0;
    }
    penalty
}

#[derive(Clone)]
struct PotentialBreak {
    index: usize,
    x: f64,
    prior_break: Option<Box<PotentialBreak>>,
    badness: f64,
}

fn evaluate_break(
    break_index: usize,
    break_x: f64,
    target_width: f64,
    potential_breaks: &[PotentialBreak],
    penalty: f64,
    is_last_break: bool,
) -> PotentialBreak {
    // Lines longer than maxWidth are allowed when no break exists, and
    // near-target widths beat strictly enforcing the maximum.
    let mut best_prior_break: Option<Box<PotentialBreak>> = None;
    let mut best_badness = calculate_badness(break_x, target_width, penalty, is_last_break);
    for potential in potential_breaks {
        let line_width = break_x - potential.x;
        let badness =
            calculate_badness(line_width, target_width, penalty, is_last_break) + potential.badness;
        if badness <= best_badness {
            best_prior_break = Some(Box::new(potential.clone()));
            best_badness = badness;
        }
    }
    PotentialBreak {
        index: break_index,
        x: break_x,
        prior_break: best_prior_break,
        badness: best_badness,
    }
}

fn least_bad_breaks(last_break: &PotentialBreak) -> BTreeSet<usize> {
    let mut breaks = BTreeSet::from([last_break.index]);
    let mut prior = &last_break.prior_break;
    while let Some(prior_break) = prior {
        breaks.insert(prior_break.index);
        prior = &prior_break.prior_break;
    }
    breaks
}

// Break candidates are found in logical order: visual order would be
// more intuitive, but the visual order is itself changed by the breaks.
fn determine_line_breaks(
    logical_input: &TaggedString,
    spacing: f64,
    max_width: f64,
    glyph_map: &GlyphMap,
    image_positions: &ImagePositions,
    layout_text_size: f64,
) -> BTreeSet<usize> {
    if max_width == 0.0 || logical_input.is_empty() {
        return BTreeSet::default();
    }

    let target_width = determine_average_line_width(
        logical_input,
        spacing,
        max_width,
        glyph_map,
        image_positions,
        layout_text_size,
    );

    let has_server_suggested_breaks = logical_input
        .raw_text()
        .as_slice()
        .iter()
        .any(|c| *c == ZWSP);

    let mut potential_breaks: Vec<PotentialBreak> = Vec::new();
    let mut current_x: f64 = 0.0;
    for i in 0..logical_input.length() {
        let section = logical_input.section(i);
        let code_point = logical_input.char_code_at(i);
        if !i18n::is_whitespace(code_point) {
            current_x += glyph_advance(
                code_point,
                section,
                glyph_map,
                image_positions,
                layout_text_size,
                spacing,
            );
        }

        if i < logical_input.length() - 1 {
            let ideographic = i18n::allows_ideographic_breaking(code_point);
            if section.image_id.is_some() || ideographic || i18n::allows_word_breaking(code_point) {
                let penalizable = ideographic && has_server_suggested_breaks;
                let next_index = i + 1;
                let potential_break = evaluate_break(
                    next_index,
                    current_x,
                    target_width,
                    &potential_breaks,
                    calculate_penalty(
                        code_point,
                        logical_input.char_code_at(next_index),
                        penalizable,
                    ),
                    false,
                );
                potential_breaks.push(potential_break);
            }
        }
    }

    least_bad_breaks(&evaluate_break(
        logical_input.length(),
        current_x,
        target_width,
        &potential_breaks,
        0.0,
        true,
    ))
}

// justify left = 0, right = 1, center = 0.5
fn justify_line(positioned_glyphs: &mut [PositionedGlyph], justify: f64, line_offset: f64) {
    if justify == 0.0 && line_offset == 0.0 {
        return;
    }
    let last_glyph = positioned_glyphs.last().expect("line has glyphs");
    let last_advance = last_glyph.metrics.advance as f64 * last_glyph.scale;
    let line_indent = last_glyph.x + last_advance * justify;
    for glyph in positioned_glyphs {
        glyph.x -= line_indent;
        glyph.y += line_offset;
    }
}

#[allow(clippy::too_many_arguments)]
fn align(
    shaping: &mut Shaping,
    justify: f64,
    horizontal_align: f64,
    vertical_align: f64,
    max_line_length: f64,
    max_line_height: f64,
    line_height: f64,
    block_height: f64,
    line_count: usize,
) {
    let shift_x = (justify - horizontal_align) * max_line_length;
    let shift_y = if max_line_height != line_height {
        -block_height * vertical_align - Shaping::Y_OFFSET as f64
    } else {
        (-vertical_align * line_count as f64 + 0.5) * line_height
    };
    for line in &mut shaping.positioned_lines {
        for glyph in &mut line.positioned_glyphs {
            glyph.x += shift_x;
            glyph.y += shift_y;
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn shape_lines(
    shaping: &mut Shaping,
    lines: &mut [TaggedString],
    spacing: f64,
    line_height: f64,
    text_anchor: SymbolAnchorType,
    text_justify: TextJustifyType,
    writing_mode: WritingModes,
    glyph_map: &GlyphMap,
    glyph_positions: &GlyphPositions,
    image_positions: &ImagePositions,
    layout_text_size: f64,
    allow_vertical_placement: bool,
) {
    let mut x = 0.0;
    let mut y = Shaping::Y_OFFSET as f64;
    let mut max_line_length: f64 = 0.0;
    let mut max_line_height: f64 = 0.0;

    let justify = match text_justify {
        TextJustifyType::Right => 1.0,
        TextJustifyType::Left => 0.0,
        _ => 0.5,
    };

    let line_count = lines.len();

    for line in lines.iter_mut() {
        // Collapse whitespace so it doesn't throw off justification
        line.trim();

        let line_max_scale = line.max_scale();
        let max_line_offset = (line_max_scale - 1.0) * ONE_EM;
        let mut line_offset = 0.0;
        shaping.positioned_lines.push(PositionedLine::default());
        let positioned_line = shaping
            .positioned_lines
            .last_mut()
            .expect("just pushed a line");

        if line.is_empty() {
            y += line_height; // Still need a line feed after an empty line
            continue;
        }

        for i in 0..line.length() {
            let section_index = line.section_index(i) as usize;
            let section = line.section_at(section_index);
            let code_point = line.char_code_at(i);
            let mut section_scale = section.scale;
            assert_ne!(section_scale, 0.0);

            let vertical = !(writing_mode == WritingModes::HORIZONTAL
                // Don't verticalize glyphs that have no upright orientation
                // unless vertical placement is enabled for the layer.
                || (!allow_vertical_placement
                    && !i18n::has_upright_vertical_orientation(code_point))
                // Even then, whitespace and complex-shaping scripts keep
                // their horizontal forms.
                || (allow_vertical_placement
                    && (i18n::is_whitespace(code_point)
                        || i18n::is_char_in_complex_shaping_script(code_point))));

            // (rect, metrics, advance, vertical advance, baseline offset)
            let glyph;
            if let Some(image_id) = &section.image_id {
                let Some(image) = image_positions.get(image_id) else {
                    continue;
                };
                shaping.icons_in_text = true;
                let display_size = image.display_size();
                let mut metrics = crate::glyph::GlyphMetrics {
                    width: display_size[0] as u32,
                    height: display_size[1] as u32,
                    left: ImagePosition::PADDING as i32,
                    top: -(Glyph::BORDER_SIZE as i32),
                    advance: 0,
                };
                metrics.advance = if vertical {
                    metrics.height
                } else {
                    metrics.width
                };

                // "image-scale" rides on the section font scale.
                section_scale = section_scale * ONE_EM / layout_text_size;

                // Aligns the bottom of the image to the baseline level.
                let image_offset = ONE_EM - display_size[1] * section_scale;
                let baseline_offset = max_line_offset + image_offset;

                let advance = metrics.advance as f64;

                // An image taller than one em at the line's max scale
                // pushes the whole line down.
                let offset = (if vertical {
                    display_size[0]
                } else {
                    display_size[1]
                }) * section_scale
                    - ONE_EM * line_max_scale;
                if offset > 0.0 && offset > line_offset {
                    line_offset = offset;
                }

                glyph = (image.padded_rect, metrics, advance, advance, baseline_offset);
            } else {
                let position = glyph_positions
                    .get(&section.font_stack_hash)
                    .and_then(|positions| positions.get(&code_point));
                let (rect, metrics) = if let Some(position) = position {
                    (position.rect, position.metrics)
                } else {
                    // Atlas position missing; fall back to bare metrics
                    // so advances still accumulate.
                    let Some(fallback) = glyph_map
                        .get(&section.font_stack_hash)
                        .and_then(|glyphs| glyphs.get(&code_point))
                        .and_then(|glyph| glyph.as_ref())
                    else {
                        continue;
                    };
                    (Default::default(), fallback.metrics)
                };
                let advance = metrics.advance as f64;
                // The baseline is unknown, but layout happens at 24pt so
                // the shift under scaling is predictable.
                let baseline_offset = (line_max_scale - section_scale) * ONE_EM;
                // Vertical glyphs occupy one square em regardless of
                // their horizontal advance.
                glyph = (rect, metrics, advance, ONE_EM, baseline_offset);
            }
            let (rect, metrics, advance, vertical_advance, baseline_offset) = glyph;

            positioned_line.positioned_glyphs.push(PositionedGlyph {
                glyph: code_point,
                x,
                y: y + baseline_offset,
                vertical,
                font: section.font_stack_hash,
                scale: section_scale,
                rect,
                metrics,
                image_id: section.image_id.clone(),
                section_index,
            });
            if !vertical {
                x += advance * section_scale + spacing;
            } else {
                x += vertical_advance * section_scale + spacing;
                shaping.verticalizable = true;
            }
        }

        // Only justify when at least one glyph was placed
        if !positioned_line.positioned_glyphs.is_empty() {
            let line_length = x - spacing; // Don't count trailing spacing
            max_line_length = line_length.max(max_line_length);
            justify_line(&mut positioned_line.positioned_glyphs, justify, line_offset);
        }

        let current_line_height = line_height * line_max_scale + line_offset;
        x = 0.0;
        y += current_line_height;
        positioned_line.line_offset = line_offset.max(max_line_offset);
        max_line_height = current_line_height.max(max_line_height);
    }

    let anchor_align = AnchorAlignment::for_anchor(text_anchor);
    let height = y - Shaping::Y_OFFSET as f64;
    align(
        shaping,
        justify,
        anchor_align.horizontal,
        anchor_align.vertical,
        max_line_length,
        max_line_height,
        line_height,
        height,
        line_count,
    );

    shaping.top += -anchor_align.vertical * height;
    shaping.bottom = shaping.top + height;
    shaping.left += -anchor_align.horizontal * max_line_length;
    shaping.right = shaping.left + max_line_length;
}

#[cfg(test)]
mod tests {
    use widestring::U16String;

    use super::*;
    use crate::{
        bidi::LogicalOrder,
        font_stack::FontStackHasher,
        glyph::{Glyph, GlyphMap, GlyphMetrics, Glyphs},
        glyph_atlas::{GlyphPosition, GlyphPositionMap, GlyphPositions},
    };

    fn fixture(
        codes: &[Char16],
        advance: u32,
    ) -> (GlyphMap, GlyphPositions, Vec<String>) {
        let font_stack = vec!["Test Font".to_string()];
        let metrics = GlyphMetrics {
            width: 18,
            height: 18,
            left: 2,
            top: -8,
            advance,
        };

        let mut glyphs = Glyphs::new();
        let mut positions = GlyphPositionMap::new();
        for code in codes {
            glyphs.insert(
                *code,
                Some(Glyph {
                    id: *code,
                    metrics,
                }),
            );
            positions.insert(
                *code,
                GlyphPosition {
                    rect: euclid::Rect::new(euclid::Point2D::new(0, 0), euclid::Size2D::new(20, 20)),
                    metrics,
                },
            );
        }

        let glyph_map = GlyphMap::from([(FontStackHasher::new(&font_stack), glyphs)]);
        let glyph_positions =
            GlyphPositions::from([(FontStackHasher::new(&font_stack), positions)]);
        (glyph_map, glyph_positions, font_stack)
    }

    fn shape(
        text: &str,
        max_width_in_chars: usize,
        glyph_map: &GlyphMap,
        glyph_positions: &GlyphPositions,
        font_stack: &[String],
    ) -> Shaping {
        let string = TaggedString::new_from_raw(
            text.into(),
            SectionOptions::new(1.0, font_stack.to_vec(), None),
        );
        shape_text(
            &string,
            max_width_in_chars as f64 * ONE_EM,
            ONE_EM,
            SymbolAnchorType::Center,
            TextJustifyType::Center,
            0.0,
            &[0.0, 0.0],
            WritingModes::HORIZONTAL,
            &LogicalOrder,
            glyph_map,
            glyph_positions,
            &ImagePositions::default(),
            16.0,
            16.0,
            false,
        )
    }

    #[test]
    fn empty_input_shapes_nothing() {
        let (glyph_map, glyph_positions, font_stack) = fixture(&[], 21);
        let shaping = shape("", 5, &glyph_map, &glyph_positions, &font_stack);
        assert!(!shaping.has_positioned_glyphs());
    }

    #[test]
    fn ascii_line_has_increasing_x() {
        let codes: Vec<Char16> = "abcde".encode_utf16().collect();
        let (glyph_map, glyph_positions, font_stack) = fixture(&codes, 24);
        let shaping = shape("abcde", 20, &glyph_map, &glyph_positions, &font_stack);

        assert_eq!(shaping.positioned_lines.len(), 1);
        let glyphs = &shaping.positioned_lines[0].positioned_glyphs;
        assert_eq!(glyphs.len(), 5);
        for pair in glyphs.windows(2) {
            assert!(pair[0].x < pair[1].x);
        }
    }

    #[test]
    fn shaping_is_deterministic() {
        let codes: Vec<Char16> = "determinism test".encode_utf16().collect();
        let (glyph_map, glyph_positions, font_stack) = fixture(&codes, 21);
        let first = shape("determinism test", 3, &glyph_map, &glyph_positions, &font_stack);
        let second = shape("determinism test", 3, &glyph_map, &glyph_positions, &font_stack);
        assert_eq!(first.positioned_lines.len(), second.positioned_lines.len());
        assert_eq!(first.left, second.left);
        assert_eq!(first.right, second.right);
        for (a, b) in first
            .positioned_lines
            .iter()
            .zip(second.positioned_lines.iter())
        {
            for (ga, gb) in a.positioned_glyphs.iter().zip(b.positioned_glyphs.iter()) {
                assert_eq!(ga.x, gb.x);
                assert_eq!(ga.y, gb.y);
            }
        }
    }

    #[test]
    fn multi_section_shaping_is_deterministic() {
        let codes: Vec<Char16> = "mixed scale".encode_utf16().collect();
        let (glyph_map, glyph_positions, font_stack) = fixture(&codes, 21);

        let build = || {
            let mut string = TaggedString::default();
            string.add_text_section(&"mixed ".into(), 1.5, font_stack.clone(), None);
            string.add_text_section(&"scale".into(), 0.75, font_stack.clone(), None);
            shape_text(
                &string,
                3.0 * ONE_EM,
                ONE_EM,
                SymbolAnchorType::Center,
                TextJustifyType::Center,
                0.0,
                &[0.0, 0.0],
                WritingModes::HORIZONTAL,
                &LogicalOrder,
                &glyph_map,
                &glyph_positions,
                &ImagePositions::default(),
                16.0,
                16.0,
                false,
            )
        };

        let first = build();
        let second = build();
        assert!(first.has_positioned_glyphs());
        assert_eq!(first.positioned_lines.len(), second.positioned_lines.len());
        for (a, b) in first
            .positioned_lines
            .iter()
            .zip(second.positioned_lines.iter())
        {
            assert_eq!(a.positioned_glyphs.len(), b.positioned_glyphs.len());
            for (ga, gb) in a.positioned_glyphs.iter().zip(b.positioned_glyphs.iter()) {
                assert_eq!((ga.x, ga.y, ga.scale), (gb.x, gb.y, gb.scale));
            }
        }
        // The larger section's glyphs really are scaled differently.
        let scales: std::collections::BTreeSet<u64> = first
            .positioned_lines
            .iter()
            .flat_map(|line| line.positioned_glyphs.iter())
            .map(|glyph| (glyph.scale * 100.0) as u64)
            .collect();
        assert!(scales.len() > 1);
    }

    #[test]
    fn zwsp_suggests_breaks() {
        // ZWSP itself has no glyph; it only marks break opportunities.
        let (glyph_map, glyph_positions, font_stack) = fixture(&['中' as Char16], 21);

        // 中中 中中 中中 / 中中中中中中 / 中中
        let shaping = shape(
            "中中\u{200b}中中\u{200b}中中\u{200b}中中中中中中\u{200b}中中",
            5,
            &glyph_map,
            &glyph_positions,
            &font_stack,
        );
        assert_eq!(shaping.positioned_lines.len(), 3);
        assert_eq!(shaping.top, -36.0);
        assert_eq!(shaping.bottom, 36.0);
        assert_eq!(shaping.left, -63.0);
        assert_eq!(shaping.right, 63.0);

        let shaping = shape("中中\u{200b}中", 1, &glyph_map, &glyph_positions, &font_stack);
        assert_eq!(shaping.positioned_lines.len(), 2);
        assert_eq!(shaping.top, -24.0);
        assert_eq!(shaping.bottom, 24.0);
        assert_eq!(shaping.left, -21.0);
        assert_eq!(shaping.right, 21.0);

        // Trailing ZWSP adds no line
        let shaping = shape("中中\u{200b}", 2, &glyph_map, &glyph_positions, &font_stack);
        assert_eq!(shaping.positioned_lines.len(), 1);
        assert_eq!(shaping.top, -12.0);
        assert_eq!(shaping.bottom, 12.0);

        // A run of ZWSPs alone produces empty lines
        let shaping = shape(
            "\u{200b}\u{200b}\u{200b}\u{200b}\u{200b}",
            1,
            &glyph_map,
            &glyph_positions,
            &font_stack,
        );
        assert_eq!(shaping.positioned_lines.len(), 5);
        assert!(!shaping.has_positioned_glyphs());
    }

    #[test]
    fn missing_glyphs_are_skipped() {
        let codes: Vec<Char16> = "ab".encode_utf16().collect();
        let (glyph_map, glyph_positions, font_stack) = fixture(&codes, 21);
        let shaping = shape("abX", 20, &glyph_map, &glyph_positions, &font_stack);
        assert_eq!(shaping.glyph_count(), 2);
    }
}
