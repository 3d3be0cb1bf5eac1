use image::{DynamicImage, Rgb, RgbImage};

use crate::common::Frame;
use crate::pipeline::types::BoundingBox;

// 3x5 glyphs, one row per byte, high bit on the left.
const GLYPH_WIDTH: i64 = 3;
const GLYPH_HEIGHT: i64 = 5;
const LABEL_SCALE: i64 = 2;

fn glyph(c: char) -> Option<[u8; 5]> {
    let rows = match c {
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b101, 0b111, 0b111, 0b111, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'Q' => [0b010, 0b101, 0b101, 0b110, 0b011],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b110, 0b001, 0b010, 0b100, 0b111],
        '3' => [0b110, 0b001, 0b010, 0b001, 0b110],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b110, 0b001, 0b110],
        '6' => [0b011, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b110],
        _ => return None,
    };
    Some(rows)
}

/// Draws detected code outlines and their symbology label onto a copy of the
/// frame. Presentation only.
#[derive(Debug, Clone)]
pub struct FrameAnnotator {
    color: Rgb<u8>,
    thickness: i32,
}

impl FrameAnnotator {
    pub fn new(color: Rgb<u8>, thickness: i32) -> Self {
        Self {
            color,
            thickness: thickness.clamp(1, 16),
        }
    }

    pub fn annotate(&self, frame: &Frame, bounding_box: &BoundingBox, label: &str) -> Frame {
        let points = bounding_box.points();
        if points.len() < 2 {
            return frame.clone();
        }
        let mut canvas = frame.image().to_rgb8();
        for (i, &start) in points.iter().enumerate() {
            let end = points[(i + 1) % points.len()];
            if let Some((start, end)) = self.clip(&canvas, start, end) {
                self.draw_line(&mut canvas, start, end);
            }
        }
        let (x, y) = points[0];
        let top = i64::from(y) - GLYPH_HEIGHT * LABEL_SCALE - 4;
        self.draw_label(&mut canvas, i64::from(x), top, label);
        frame.with_image(DynamicImage::ImageRgb8(canvas))
    }

    // Liang-Barsky against the canvas grown by the brush radius.
    fn clip(
        &self,
        canvas: &RgbImage,
        (x0, y0): (i32, i32),
        (x1, y1): (i32, i32),
    ) -> Option<((i64, i64), (i64, i64))> {
        let margin = f64::from(self.thickness / 2);
        let (min_x, min_y) = (-margin, -margin);
        let max_x = f64::from(canvas.width()) - 1.0 + margin;
        let max_y = f64::from(canvas.height()) - 1.0 + margin;
        let (x0, y0, x1, y1) = (f64::from(x0), f64::from(y0), f64::from(x1), f64::from(y1));
        let (dx, dy) = (x1 - x0, y1 - y0);

        let mut t0 = 0.0_f64;
        let mut t1 = 1.0_f64;
        for (p, q) in [
            (-dx, x0 - min_x),
            (dx, max_x - x0),
            (-dy, y0 - min_y),
            (dy, max_y - y0),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
            if t0 > t1 {
                return None;
            }
        }
        let at = |t: f64| ((x0 + t * dx).round() as i64, (y0 + t * dy).round() as i64);
        Some((at(t0), at(t1)))
    }

    // Bresenham, widened by stamping a square brush on every step.
    fn draw_line(&self, canvas: &mut RgbImage, (x0, y0): (i64, i64), (x1, y1): (i64, i64)) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);
        loop {
            self.stamp(canvas, x, y, i64::from(self.thickness / 2));
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn draw_label(&self, canvas: &mut RgbImage, left: i64, top: i64, label: &str) {
        let advance = (GLYPH_WIDTH + 1) * LABEL_SCALE;
        for (i, c) in label.chars().enumerate() {
            let Some(rows) = glyph(c.to_ascii_uppercase()) else {
                continue;
            };
            let origin_x = left + i as i64 * advance;
            if origin_x >= i64::from(canvas.width()) {
                break;
            }
            for (row, bits) in (0_i64..).zip(rows) {
                for col in 0..GLYPH_WIDTH {
                    if bits & (0b100 >> col) == 0 {
                        continue;
                    }
                    for sy in 0..LABEL_SCALE {
                        for sx in 0..LABEL_SCALE {
                            self.put(
                                canvas,
                                origin_x + col * LABEL_SCALE + sx,
                                top + row * LABEL_SCALE + sy,
                            );
                        }
                    }
                }
            }
        }
    }

    fn stamp(&self, canvas: &mut RgbImage, cx: i64, cy: i64, half: i64) {
        for y in (cy - half)..=(cy + half) {
            for x in (cx - half)..=(cx + half) {
                self.put(canvas, x, y);
            }
        }
    }

    fn put(&self, canvas: &mut RgbImage, x: i64, y: i64) {
        if let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) {
            if x < canvas.width() && y < canvas.height() {
                canvas.put_pixel(x, y, self.color);
            }
        }
    }
}

impl Default for FrameAnnotator {
    fn default() -> Self {
        Self::new(Rgb([0, 255, 0]), 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use image::ImageBuffer;
    use std::time::{Duration, Instant};
    use uuid::Uuid;

    const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn frame(size: u32) -> Frame {
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(size, size, BLACK));
        Frame::new(Uuid::new_v4(), image, Utc::now())
    }

    #[test]
    fn outline_is_drawn_on_a_copy() {
        let original = frame(32);
        let annotator = FrameAnnotator::new(GREEN, 1);
        let annotated = annotator.annotate(&original, &BoundingBox::from_rect(4, 14, 10, 10), "");

        let canvas = annotated.image().to_rgb8();
        assert_eq!(*canvas.get_pixel(4, 14), GREEN);
        assert_eq!(*canvas.get_pixel(14, 19), GREEN);
        assert_eq!(*canvas.get_pixel(9, 19), BLACK);

        let untouched = original.image().to_rgb8();
        assert_eq!(*untouched.get_pixel(4, 14), BLACK);
        assert_eq!(annotated.frame_id(), original.frame_id());
    }

    #[test]
    fn label_is_drawn_above_the_outline() {
        let annotator = FrameAnnotator::new(GREEN, 1);
        let annotated = annotator.annotate(&frame(64), &BoundingBox::from_rect(10, 30, 20, 20), "QRCODE");
        let canvas = annotated.image().to_rgb8();
        // Label rows span y = 16..26 above the top edge at y = 30.
        let lit = (10..58)
            .flat_map(|x| (16..26).map(move |y| (x, y)))
            .filter(|&(x, y)| *canvas.get_pixel(x, y) == GREEN)
            .count();
        assert!(lit > 20);
        assert_eq!(*canvas.get_pixel(20, 40), BLACK);
    }

    #[test]
    fn out_of_bounds_points_are_clipped() {
        let annotator = FrameAnnotator::default();
        let annotated = annotator.annotate(
            &frame(32),
            &BoundingBox::new(vec![(-10, -10), (100, 5), (20, 100)]),
            "EAN13",
        );
        let canvas = annotated.image().to_rgb8();
        assert_eq!(canvas.width(), 32);
        // Only the closing edge crosses the frame, near the bottom-left corner.
        assert!(canvas.pixels().any(|pixel| *pixel == GREEN));
        assert_eq!(*canvas.get_pixel(31, 0), BLACK);
    }

    #[test]
    fn extreme_coordinates_are_cheap_and_do_not_overflow() {
        let annotator = FrameAnnotator::default();
        let started = Instant::now();
        annotator.annotate(&frame(32), &BoundingBox::new(vec![(0, 0), (200_000_000, 0)]), "QRCODE");
        annotator.annotate(
            &frame(32),
            &BoundingBox::new(vec![(i32::MIN, 0), (i32::MAX, 0), (i32::MAX, i32::MIN)]),
            "QRCODE",
        );
        let annotated = annotator.annotate(
            &frame(32),
            &BoundingBox::new(vec![(i32::MIN, i32::MIN), (i32::MIN, i32::MAX)]),
            "QRCODE",
        );
        assert_eq!(*annotated.image().to_rgb8().get_pixel(16, 16), BLACK);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
