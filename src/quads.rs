//! Anchor-relative textured quads for shaped text and icons.

use std::f64::consts::PI;

use euclid::{Point2D, Rect, Size2D, Vector2D};

use crate::{
    glyph::{Glyph, Shaping, WritingModes},
    image::{ImageMap, ImageStretches},
    image_atlas::ImagePosition,
    layout::symbol_instance::SymbolContent,
    shaping::PositionedIcon,
    util::{
        math::{deg2radf, rotate},
        ONE_EM,
    },
    TileSpace,
};

pub struct SymbolQuad {
    pub tl: Point2D<f64, TileSpace>,
    pub tr: Point2D<f64, TileSpace>,
    pub bl: Point2D<f64, TileSpace>,
    pub br: Point2D<f64, TileSpace>,
    pub tex: Rect<u16, TileSpace>,
    pub pixel_offset_tl: Point2D<f64, TileSpace>,
    pub pixel_offset_br: Point2D<f64, TileSpace>,
    /// Along-line displacement, x in ems relative to the anchor.
    pub glyph_offset: Point2D<f64, TileSpace>,
    pub writing_mode: WritingModes,
    pub is_sdf: bool,
    pub section_index: usize,
    pub min_font_scale: Point2D<f64, TileSpace>,
}

pub type SymbolQuads = Vec<SymbolQuad>;

const BORDER: u16 = ImagePosition::PADDING;

fn stretch_sum(stretches: &ImageStretches) -> f64 {
    stretches.iter().map(|zone| zone.1 - zone.0).sum()
}

fn sum_within_range(stretches: &ImageStretches, min: f64, max: f64) -> f64 {
    stretches
        .iter()
        .map(|zone| min.max(max.min(zone.1)) - min.max(max.min(zone.0)))
        .sum()
}

fn em_offset(stretch_offset: f64, stretch_size: f64, icon_size: f64, icon_offset: f64) -> f64 {
    icon_offset + icon_size * stretch_offset / stretch_size
}

fn px_offset(fixed_offset: f64, fixed_size: f64, stretch_offset: f64, stretch_size: f64) -> f64 {
    fixed_offset - fixed_size * stretch_offset / stretch_size
}

struct Cut {
    fixed: f64,
    stretch: f64,
}

fn stretch_zones_to_cuts(zones: &ImageStretches, fixed_size: f64, stretch_size: f64) -> Vec<Cut> {
    let mut cuts = vec![Cut {
        fixed: -(BORDER as f64),
        stretch: 0.0,
    }];
    for zone in zones {
        let last_stretch = cuts.last().expect("seeded above").stretch;
        cuts.push(Cut {
            fixed: zone.0 - last_stretch,
            stretch: last_stretch,
        });
        cuts.push(Cut {
            fixed: zone.0 - last_stretch,
            stretch: last_stretch + (zone.1 - zone.0),
        });
    }
    cuts.push(Cut {
        fixed: fixed_size + BORDER as f64,
        stretch: stretch_size,
    });
    cuts
}

fn matrix_multiply<U>(m: &[f64; 4], p: Point2D<f64, U>) -> Point2D<f64, U> {
    Point2D::new(m[0] * p.x + m[1] * p.y, m[2] * p.x + m[3] * p.y)
}

/// Build the quad grid for an icon. Without stretch metadata this is a
/// single quad; with icon-text-fit and stretch zones the image is cut
/// into a grid so fixed regions keep their pixel size.
pub fn icon_quads(
    shaped_icon: &PositionedIcon,
    icon_rotate: f64,
    icon_type: SymbolContent,
    has_icon_text_fit: bool,
) -> SymbolQuads {
    let mut quads = Vec::new();

    let image = &shaped_icon.image;
    let pixel_ratio = image.pixel_ratio;
    let image_width = image.padded_rect.width() - 2 * BORDER;
    let image_height = image.padded_rect.height() - 2 * BORDER;

    let icon_width = shaped_icon.right - shaped_icon.left;
    let icon_height = shaped_icon.bottom - shaped_icon.top;

    let stretch_x_full: ImageStretches = vec![(0.0, image_width as f64)];
    let stretch_y_full: ImageStretches = vec![(0.0, image_height as f64)];
    let stretch_x = if !image.stretch_x.is_empty() {
        &image.stretch_x
    } else {
        &stretch_x_full
    };
    let stretch_y = if !image.stretch_y.is_empty() {
        &image.stretch_y
    } else {
        &stretch_y_full
    };

    let stretch_width = stretch_sum(stretch_x);
    let stretch_height = stretch_sum(stretch_y);
    let fixed_width = image_width as f64 - stretch_width;
    let fixed_height = image_height as f64 - stretch_height;

    let mut stretch_offset_x = 0.0;
    let mut stretch_content_width = stretch_width;
    let mut stretch_offset_y = 0.0;
    let mut stretch_content_height = stretch_height;
    let mut fixed_offset_x = 0.0;
    let mut fixed_content_width = fixed_width;
    let mut fixed_offset_y = 0.0;
    let mut fixed_content_height = fixed_height;

    if has_icon_text_fit {
        if let Some(content) = &image.content {
            stretch_offset_x = sum_within_range(stretch_x, 0.0, content.left);
            stretch_offset_y = sum_within_range(stretch_y, 0.0, content.top);
            stretch_content_width = sum_within_range(stretch_x, content.left, content.right);
            stretch_content_height = sum_within_range(stretch_y, content.top, content.bottom);
            fixed_offset_x = content.left - stretch_offset_x;
            fixed_offset_y = content.top - stretch_offset_y;
            fixed_content_width = content.right - content.left - stretch_content_width;
            fixed_content_height = content.bottom - content.top - stretch_content_height;
        }
    }

    let matrix: Option<[f64; 4]> = if icon_rotate != 0.0 {
        let angle = deg2radf(icon_rotate);
        Some([angle.cos(), -angle.sin(), angle.sin(), angle.cos()])
    } else {
        None
    };

    let mut make_box = |left: &Cut, top: &Cut, right: &Cut, bottom: &Cut| {
        let left_em = em_offset(
            left.stretch - stretch_offset_x,
            stretch_content_width,
            icon_width,
            shaped_icon.left,
        );
        let left_px = px_offset(
            left.fixed - fixed_offset_x,
            fixed_content_width,
            left.stretch,
            stretch_width,
        );
        let top_em = em_offset(
            top.stretch - stretch_offset_y,
            stretch_content_height,
            icon_height,
            shaped_icon.top,
        );
        let top_px = px_offset(
            top.fixed - fixed_offset_y,
            fixed_content_height,
            top.stretch,
            stretch_height,
        );
        let right_em = em_offset(
            right.stretch - stretch_offset_x,
            stretch_content_width,
            icon_width,
            shaped_icon.left,
        );
        let right_px = px_offset(
            right.fixed - fixed_offset_x,
            fixed_content_width,
            right.stretch,
            stretch_width,
        );
        let bottom_em = em_offset(
            bottom.stretch - stretch_offset_y,
            stretch_content_height,
            icon_height,
            shaped_icon.top,
        );
        let bottom_px = px_offset(
            bottom.fixed - fixed_offset_y,
            fixed_content_height,
            bottom.stretch,
            stretch_height,
        );

        let mut tl = Point2D::<f64, TileSpace>::new(left_em, top_em);
        let mut tr = Point2D::<f64, TileSpace>::new(right_em, top_em);
        let mut br = Point2D::<f64, TileSpace>::new(right_em, bottom_em);
        let mut bl = Point2D::<f64, TileSpace>::new(left_em, bottom_em);
        let pixel_offset_tl =
            Point2D::<f64, TileSpace>::new(left_px / pixel_ratio, top_px / pixel_ratio);
        let pixel_offset_br =
            Point2D::<f64, TileSpace>::new(right_px / pixel_ratio, bottom_px / pixel_ratio);

        if let Some(matrix) = matrix {
            tl = matrix_multiply(&matrix, tl);
            tr = matrix_multiply(&matrix, tr);
            bl = matrix_multiply(&matrix, bl);
            br = matrix_multiply(&matrix, br);
        }

        let x1 = left.stretch + left.fixed;
        let x2 = right.stretch + right.fixed;
        let y1 = top.stretch + top.fixed;
        let y2 = bottom.stretch + bottom.fixed;

        let sub_rect: Rect<u16, TileSpace> = Rect::new(
            Point2D::new(
                (image.padded_rect.origin.x as f64 + BORDER as f64 + x1) as u16,
                (image.padded_rect.origin.y as f64 + BORDER as f64 + y1) as u16,
            ),
            Size2D::new((x2 - x1) as u16, (y2 - y1) as u16),
        );

        let min_font_scale_x = fixed_content_width / pixel_ratio / icon_width;
        let min_font_scale_y = fixed_content_height / pixel_ratio / icon_height;

        // The icon quad is padded, so texture coordinates are too.
        quads.push(SymbolQuad {
            tl,
            tr,
            bl,
            br,
            tex: sub_rect,
            pixel_offset_tl,
            pixel_offset_br,
            glyph_offset: Point2D::new(0.0, 0.0),
            writing_mode: WritingModes::empty(),
            is_sdf: icon_type == SymbolContent::ICON_SDF,
            section_index: 0,
            min_font_scale: Point2D::new(min_font_scale_x, min_font_scale_y),
        });
    };

    if !has_icon_text_fit || (image.stretch_x.is_empty() && image.stretch_y.is_empty()) {
        make_box(
            &Cut {
                fixed: 0.0,
                stretch: -1.0,
            },
            &Cut {
                fixed: 0.0,
                stretch: -1.0,
            },
            &Cut {
                fixed: 0.0,
                stretch: (image_width + 1) as f64,
            },
            &Cut {
                fixed: 0.0,
                stretch: (image_height + 1) as f64,
            },
        );
    } else {
        let x_cuts = stretch_zones_to_cuts(stretch_x, fixed_width, stretch_width);
        let y_cuts = stretch_zones_to_cuts(stretch_y, fixed_height, stretch_height);
        for xi in 0..x_cuts.len() - 1 {
            for yi in 0..y_cuts.len() - 1 {
                make_box(&x_cuts[xi], &y_cuts[yi], &x_cuts[xi + 1], &y_cuts[yi + 1]);
            }
        }
    }

    quads
}

/// Build one quad per positioned glyph. `text_rotate` is in degrees;
/// `along_line` switches glyph positions into per-glyph offsets resolved
/// at projection time.
pub fn glyph_quads(
    shaped_text: &Shaping,
    text_offset: [f64; 2],
    text_rotate: f64,
    along_line: bool,
    image_map: &ImageMap,
    allow_vertical_placement: bool,
) -> SymbolQuads {
    let text_rotate = deg2radf(text_rotate);
    let mut quads = Vec::new();

    for line in &shaped_text.positioned_lines {
        for positioned_glyph in &line.positioned_glyphs {
            if positioned_glyph.rect.is_empty() {
                continue;
            }

            // Glyph rects carry a buffer beyond their nominal size.
            let glyph_padding = 1.0;
            let mut rect_buffer = Glyph::BORDER_SIZE as f64 + glyph_padding;
            let mut pixel_ratio = 1.0;
            let mut line_offset = 0.0;
            let rotate_vertical_glyph =
                (along_line || allow_vertical_placement) && positioned_glyph.vertical;
            let half_advance =
                positioned_glyph.metrics.advance as f64 * positioned_glyph.scale / 2.0;
            let rect = positioned_glyph.rect;
            let mut is_sdf = true;

            // Center images and scaled glyphs within a vertical line.
            if allow_vertical_placement && shaped_text.verticalizable {
                let scaled_glyph_offset = (positioned_glyph.scale - 1.0) * ONE_EM;
                let image_offset =
                    (ONE_EM - positioned_glyph.metrics.width as f64 * positioned_glyph.scale) / 2.0;
                line_offset = line.line_offset / 2.0
                    - if positioned_glyph.image_id.is_some() {
                        -image_offset
                    } else {
                        scaled_glyph_offset
                    };
            }

            if let Some(image_id) = &positioned_glyph.image_id {
                if let Some(image) = image_map.get(image_id) {
                    pixel_ratio = image.pixel_ratio;
                    rect_buffer = ImagePosition::PADDING as f64 / pixel_ratio;
                    is_sdf = image.sdf;
                }
            }

            let glyph_offset = if along_line {
                Point2D::new(positioned_glyph.x + half_advance, positioned_glyph.y)
            } else {
                Point2D::new(0.0, 0.0)
            };

            let mut built_in_offset = if along_line {
                Vector2D::new(0.0, 0.0)
            } else {
                Vector2D::new(
                    positioned_glyph.x + half_advance + text_offset[0],
                    positioned_glyph.y + text_offset[1] - line_offset,
                )
            };

            let mut verticalized_label_offset = Vector2D::<f64, TileSpace>::new(0.0, 0.0);
            if rotate_vertical_glyph {
                // The quad gets rotated 90deg CCW to counter the label's
                // CW rotation, then translated back to the built-in
                // offset it would have had horizontally.
                verticalized_label_offset = built_in_offset;
                built_in_offset = Vector2D::new(0.0, 0.0);
            }

            let x1 = (positioned_glyph.metrics.left as f64 - rect_buffer) * positioned_glyph.scale
                - half_advance
                + built_in_offset.x;
            let y1 = (-positioned_glyph.metrics.top as f64 - rect_buffer) * positioned_glyph.scale
                + built_in_offset.y;
            let x2 = x1 + rect.width() as f64 * positioned_glyph.scale / pixel_ratio;
            let y2 = y1 + rect.height() as f64 * positioned_glyph.scale / pixel_ratio;

            let mut tl: Point2D<f64, TileSpace> = Point2D::new(x1, y1);
            let mut tr: Point2D<f64, TileSpace> = Point2D::new(x2, y1);
            let mut bl: Point2D<f64, TileSpace> = Point2D::new(x1, y2);
            let mut br: Point2D<f64, TileSpace> = Point2D::new(x2, y2);

            if rotate_vertical_glyph {
                // Rotate around the midpoint of the glyph's left edge,
                // which aligns glyph centers with the horizontal midline
                // and makes the baseline y offset obsolete. Half-width
                // glyphs additionally get pulled up to the full-width
                // advance.
                let center = Point2D::new(-half_advance, half_advance - Shaping::Y_OFFSET as f64);
                let vertical_rotation = -PI / 2.0;

                let x_half_width_correction = ONE_EM / 2.0 - half_advance;
                let y_image_offset_correction = if positioned_glyph.image_id.is_some() {
                    x_half_width_correction
                } else {
                    0.0
                };
                let offset_correction = Vector2D::<f64, TileSpace>::new(
                    5.0 - Shaping::Y_OFFSET as f64 - x_half_width_correction,
                    -y_image_offset_correction,
                );

                tl = center
                    + rotate(&(tl - center), vertical_rotation)
                    + offset_correction
                    + verticalized_label_offset;
                tr = center
                    + rotate(&(tr - center), vertical_rotation)
                    + offset_correction
                    + verticalized_label_offset;
                bl = center
                    + rotate(&(bl - center), vertical_rotation)
                    + offset_correction
                    + verticalized_label_offset;
                br = center
                    + rotate(&(br - center), vertical_rotation)
                    + offset_correction
                    + verticalized_label_offset;
            }

            if text_rotate != 0.0 {
                let matrix = [
                    text_rotate.cos(),
                    -text_rotate.sin(),
                    text_rotate.sin(),
                    text_rotate.cos(),
                ];
                tl = matrix_multiply(&matrix, tl);
                tr = matrix_multiply(&matrix, tr);
                bl = matrix_multiply(&matrix, bl);
                br = matrix_multiply(&matrix, br);
            }

            quads.push(SymbolQuad {
                tl,
                tr,
                bl,
                br,
                tex: rect,
                pixel_offset_tl: Point2D::default(),
                pixel_offset_br: Point2D::default(),
                glyph_offset,
                writing_mode: shaped_text.writing_mode,
                is_sdf,
                section_index: positioned_glyph.section_index,
                min_font_scale: Point2D::default(),
            });
        }
    }

    quads
}

#[cfg(test)]
mod tests {
    use cgmath::ulps_eq;
    use euclid::{Point2D, Rect, Size2D};

    use super::*;
    use crate::{
        glyph::{PositionedGlyph, PositionedLine},
        style_types::{IconTextFitType, SymbolAnchorType},
    };

    fn test_image() -> ImagePosition {
        ImagePosition {
            pixel_ratio: 1.0,
            padded_rect: Rect::new(Point2D::origin(), Size2D::new(15, 11)),
            version: 0,
            stretch_x: vec![],
            stretch_y: vec![],
            content: None,
        }
    }

    #[test]
    fn icon_quads_normal() {
        let shaped_icon =
            PositionedIcon::shape_icon(test_image(), &[-6.5, -4.5], SymbolAnchorType::Center);
        let quads = icon_quads(&shaped_icon, 0.0, SymbolContent::ICON_RGBA, false);

        assert_eq!(quads.len(), 1);
        let quad = &quads[0];
        ulps_eq!(quad.tl.x, -14.0);
        ulps_eq!(quad.tl.y, -10.0);
        ulps_eq!(quad.tr.x, 1.0);
        ulps_eq!(quad.tr.y, -10.0);
        ulps_eq!(quad.bl.x, -14.0);
        ulps_eq!(quad.bl.y, 1.0);
        ulps_eq!(quad.br.x, 1.0);
        ulps_eq!(quad.br.y, 1.0);
    }

    #[test]
    fn icon_quads_text_fit() {
        let image = ImagePosition {
            pixel_ratio: 1.0,
            padded_rect: Rect::new(Point2D::origin(), Size2D::new(20, 20)),
            version: 0,
            stretch_x: vec![],
            stretch_y: vec![],
            content: None,
        };

        let mut shaped_text = Shaping {
            top: -10.0,
            bottom: 30.0,
            left: -60.0,
            right: 20.0,
            ..Default::default()
        };
        shaped_text.positioned_lines.push(PositionedLine::default());
        shaped_text
            .positioned_lines
            .last_mut()
            .unwrap()
            .positioned_glyphs
            .push(PositionedGlyph {
                glyph: 32,
                x: 0.0,
                y: 0.0,
                vertical: false,
                font: 0,
                scale: 0.0,
                rect: Default::default(),
                metrics: Default::default(),
                image_id: None,
                section_index: 0,
            });

        // width
        {
            let mut shaped_icon =
                PositionedIcon::shape_icon(image.clone(), &[-9.5, -9.5], SymbolAnchorType::Center);
            shaped_icon.fit_icon_to_text(
                &shaped_text,
                IconTextFitType::Width,
                &[0.0; 4],
                &[0.0, 0.0],
                1.0,
            );
            let quads = icon_quads(&shaped_icon, 0.0, SymbolContent::ICON_RGBA, true);
            assert_eq!(quads.len(), 1);
            let quad = &quads[0];
            ulps_eq!(quad.tl.x, -64.4444427);
            ulps_eq!(quad.tl.y, 0.0);
            ulps_eq!(quad.br.x, 24.4444427);
            ulps_eq!(quad.br.y, 20.0);
        }

        // both + padding
        {
            let mut shaped_icon =
                PositionedIcon::shape_icon(image.clone(), &[-9.5, -9.5], SymbolAnchorType::Center);
            shaped_icon.fit_icon_to_text(
                &shaped_text,
                IconTextFitType::Both,
                &[5.0, 10.0, 5.0, 10.0],
                &[0.0, 0.0],
                12.0 / 24.0,
            );
            let quads = icon_quads(&shaped_icon, 0.0, SymbolContent::ICON_RGBA, true);
            assert_eq!(quads.len(), 1);
            let quad = &quads[0];
            ulps_eq!(quad.tl.x, -43.3333321);
            ulps_eq!(quad.tl.y, -11.666666);
            ulps_eq!(quad.br.x, 23.3333321);
            ulps_eq!(quad.br.y, 21.666666);
        }
    }

    #[test]
    fn stretched_icon_produces_grid() {
        let image = ImagePosition {
            pixel_ratio: 1.0,
            padded_rect: Rect::new(Point2D::origin(), Size2D::new(22, 22)),
            version: 0,
            stretch_x: vec![(4.0, 16.0)],
            stretch_y: vec![(4.0, 16.0)],
            content: None,
        };
        let mut shaped_icon =
            PositionedIcon::shape_icon(image, &[0.0, 0.0], SymbolAnchorType::Center);
        let shaped_text = Shaping {
            top: -10.0,
            bottom: 10.0,
            left: -10.0,
            right: 10.0,
            ..Default::default()
        };
        shaped_icon.fit_icon_to_text(
            &shaped_text,
            IconTextFitType::Both,
            &[0.0; 4],
            &[0.0, 0.0],
            1.0,
        );
        let quads = icon_quads(&shaped_icon, 0.0, SymbolContent::ICON_RGBA, true);
        // One stretch zone per axis cuts the image into a 3x3 grid.
        assert_eq!(quads.len(), 9);
    }
}
