//! Diagnostic renderings of detected lines and inferred table structure.
//!
//! Horizontals are drawn green and verticals red, either on a black canvas
//! or over the page itself. A structure rendering adds the table borders,
//! the header separators, every column rectangle and the calibrated ruler
//! ticks.

use crate::error::Result;
use crate::geometry::{Point, Rect, Segment};
use crate::lines::PageLines;
use crate::structure::{ColumnName, TableStructure};
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use std::path::Path;

/// Color of horizontal segments.
pub const HORIZONTAL_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Color of vertical segments.
pub const VERTICAL_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Color of the table top, header top and table bottom.
pub const BORDER_COLOR: Rgb<u8> = Rgb([255, 200, 0]);

/// Color of header column separators.
pub const SEPARATOR_COLOR: Rgb<u8> = Rgb([0, 120, 255]);

/// Color of column rectangles.
pub const COLUMN_COLOR: Rgb<u8> = Rgb([0, 200, 255]);

/// Color of ruler ticks.
pub const TICK_COLOR: Rgb<u8> = Rgb([255, 0, 255]);

/// Draw every segment onto `canvas` in `color`.
pub fn draw_segments(canvas: &mut RgbImage, segments: &[Segment], color: Rgb<u8>) {
    for segment in segments {
        draw_line_segment_mut(
            canvas,
            (segment.pt1.x as f32, segment.pt1.y as f32),
            (segment.pt2.x as f32, segment.pt2.y as f32),
            color,
        );
    }
}

/// Outline `rect` onto `canvas`. Degenerate rectangles are drawn one pixel wide.
pub fn draw_rect(canvas: &mut RgbImage, rect: &Rect, color: Rgb<u8>) {
    let outline = imageproc::rect::Rect::at(rect.left().round() as i32, rect.top().round() as i32)
        .of_size(rect.width.abs().max(1.0) as u32, rect.height.abs().max(1.0) as u32);
    draw_hollow_rect_mut(canvas, outline, color);
}

/// Horizontals and verticals on a black `width` x `height` canvas.
pub fn draw_lines(width: u32, height: u32, horizontals: &[Segment], verticals: &[Segment]) -> RgbImage {
    let mut canvas = RgbImage::new(width, height);
    draw_segments(&mut canvas, horizontals, HORIZONTAL_COLOR);
    draw_segments(&mut canvas, verticals, VERTICAL_COLOR);
    canvas
}

/// Horizontals and verticals over a color copy of `page`.
pub fn draw_on_page(page: &GrayImage, horizontals: &[Segment], verticals: &[Segment]) -> RgbImage {
    let mut canvas = page_canvas(page);
    draw_segments(&mut canvas, horizontals, HORIZONTAL_COLOR);
    draw_segments(&mut canvas, verticals, VERTICAL_COLOR);
    canvas
}

/// Raw or merged page lines on a black canvas the size of the analyzed region.
pub fn draw_page_lines(lines: &PageLines, merged: bool) -> RgbImage {
    let (horizontals, verticals) = if merged {
        (&lines.horizontal.merged, &lines.vertical.merged)
    } else {
        (&lines.horizontal.raw, &lines.vertical.raw)
    };
    draw_lines(lines.width, lines.height, horizontals, verticals)
}

/// The inferred structure over a color copy of `page`.
pub fn draw_structure(page: &GrayImage, structure: &TableStructure) -> RgbImage {
    let mut canvas = page_canvas(page);

    for half in structure.halves() {
        for bounds in half.columns().values() {
            draw_rect(&mut canvas, &bounds.rect(), COLUMN_COLOR);
        }

        // Ticks are stored relative to the top of the ruler's left boundary.
        if let (Some(ruler), Some(bounds)) = (half.ruler(), half.column(ColumnName::Ruler)) {
            let origin = bounds.left.highest_point();
            let ticks: Vec<Segment> = ruler
                .ticks()
                .iter()
                .map(|tick| tick.translate(Point::new(origin.x, origin.y)))
                .collect();
            draw_segments(&mut canvas, &ticks, TICK_COLOR);
        }
    }

    draw_segments(&mut canvas, &structure.header_separators, SEPARATOR_COLOR);
    draw_segments(
        &mut canvas,
        &[
            structure.header_top.clone(),
            structure.table_top.clone(),
            structure.table_bottom.clone(),
        ],
        BORDER_COLOR,
    );

    canvas
}

/// Write a rendering to `path`; the format follows the extension.
pub fn save(canvas: &RgbImage, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    log::debug!("Writing {}x{} rendering to {}", canvas.width(), canvas.height(), path.display());
    canvas.save(path)?;
    Ok(())
}

fn page_canvas(page: &GrayImage) -> RgbImage {
    DynamicImage::ImageLuma8(page.clone()).to_rgb8()
}
