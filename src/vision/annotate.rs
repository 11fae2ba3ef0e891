// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Draw kept detections onto a copy of the source image

use image::{DynamicImage, Rgba};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use super::geometry::BoundingBox;

/// Outline color for the highest-confidence box
const PRIMARY_COLOR: Rgba<u8> = Rgba([0, 200, 0, 255]);
/// Outline color for the remaining boxes
const SECONDARY_COLOR: Rgba<u8> = Rgba([255, 160, 0, 255]);

/// Return an RGBA copy of `source` with each box outlined
///
/// The first box (selection order) is drawn with a double outline.
pub fn annotate_detections(source: &DynamicImage, boxes: &[BoundingBox]) -> DynamicImage {
    let mut canvas = source.to_rgba8();

    for (i, bbox) in boxes.iter().enumerate() {
        let bbox = bbox.clamp_to(canvas.width(), canvas.height());
        if bbox.width() == 0 || bbox.height() == 0 {
            continue;
        }

        let color = if i == 0 { PRIMARY_COLOR } else { SECONDARY_COLOR };
        let rect = Rect::at(bbox.x1 as i32, bbox.y1 as i32).of_size(bbox.width(), bbox.height());
        draw_hollow_rect_mut(&mut canvas, rect, color);

        if i == 0 && bbox.width() > 2 && bbox.height() > 2 {
            let inner = Rect::at(bbox.x1 as i32 + 1, bbox.y1 as i32 + 1)
                .of_size(bbox.width() - 2, bbox.height() - 2);
            draw_hollow_rect_mut(&mut canvas, inner, color);
        }
    }

    DynamicImage::ImageRgba8(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outline_is_drawn() {
        let source = DynamicImage::new_rgba8(20, 20);
        let boxes = vec![BoundingBox::new(2, 2, 12, 12, 0.9)];
        let out = annotate_detections(&source, &boxes).to_rgba8();

        assert_eq!(*out.get_pixel(2, 2), PRIMARY_COLOR);
        assert_eq!(*out.get_pixel(3, 3), PRIMARY_COLOR);
        // Interior untouched
        assert_eq!(out.get_pixel(7, 7)[3], 0);
    }

    #[test]
    fn test_degenerate_boxes_are_skipped() {
        let source = DynamicImage::new_rgba8(5, 5);
        let boxes = vec![BoundingBox::new(1, 1, 1, 4, 0.9)];
        let out = annotate_detections(&source, &boxes).to_rgba8();
        assert!(out.pixels().all(|p| p[3] == 0));
    }
}
