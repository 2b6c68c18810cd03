//! Renders translated text back onto a copy of the source image.
//!
//! Each input line (split on explicit `\n` only, no word wrap) is drawn
//! top-to-bottom as white text over a solid black box. Font size scales with
//! image width so the overlay stays legible across resolutions.

use std::io::Cursor;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::{info, warn};

use crate::config::OverlayConfig;
use crate::error::{LingoError, Result};

const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BOX_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

pub trait OverlayRender: Send + Sync {
    /// Re-encode `image_bytes` with `text` drawn onto it. Any failure here
    /// is a hard error: a half-rendered image must not silently continue.
    fn render(&self, image_bytes: &[u8], text: &str) -> Result<Vec<u8>>;
}

pub struct TextOverlayRenderer {
    font: Option<FontVec>,
    config: OverlayConfig,
}

impl TextOverlayRenderer {
    /// Probes the configured font paths in order. When none exist the
    /// renderer falls back to a built-in 8x8 bitmap font; that is a
    /// degraded-legibility condition, not an error.
    pub fn new(config: &OverlayConfig) -> Self {
        let mut font = None;

        for path in &config.font_paths {
            if let Ok(font_data) = std::fs::read(path) {
                match FontVec::try_from_vec(font_data) {
                    Ok(loaded) => {
                        info!(path = %path, "Loaded overlay font");
                        font = Some(loaded);
                        break;
                    }
                    Err(e) => {
                        warn!(path = %path, error = %e, "Failed to parse font file");
                    }
                }
            }
        }

        if font.is_none() {
            warn!(
                "No overlay font found; falling back to built-in bitmap font. \
                 Non-ASCII text may not render legibly."
            );
        }

        Self {
            font,
            config: config.clone(),
        }
    }

    pub fn has_scalable_font(&self) -> bool {
        self.font.is_some()
    }

    /// `max(min_font_size, width / divisor)`.
    fn derive_font_size(&self, image_width: u32) -> f32 {
        self.config
            .min_font_size
            .max(image_width as f32 / self.config.font_size_divisor)
    }

    fn measure_line(&self, line: &str, font_size: f32) -> (u32, u32) {
        match &self.font {
            Some(font) => {
                let scaled = font.as_scaled(PxScale::from(font_size));
                let mut width = 0.0;
                for ch in line.chars() {
                    let glyph = scaled.scaled_glyph(ch);
                    width += scaled.h_advance(glyph.id);
                }
                let height = scaled.ascent() - scaled.descent();
                (width.ceil() as u32, height.ceil() as u32)
            }
            None => {
                let scale = bitmap_scale(font_size);
                (line.chars().count() as u32 * 8 * scale, 8 * scale)
            }
        }
    }

    fn draw_line(&self, img: &mut RgbaImage, line: &str, x: u32, y: u32, font_size: f32) {
        match &self.font {
            Some(font) => {
                draw_text_mut(
                    img,
                    TEXT_COLOR,
                    x as i32,
                    y as i32,
                    PxScale::from(font_size),
                    font,
                    line,
                );
            }
            None => {
                draw_bitmap_line(img, line, x, y, bitmap_scale(font_size));
            }
        }
    }
}

impl OverlayRender for TextOverlayRenderer {
    fn render(&self, image_bytes: &[u8], text: &str) -> Result<Vec<u8>> {
        let mut img = image::load_from_memory(image_bytes)
            .map_err(|e| LingoError::Render(format!("Failed to decode image: {e}")))?
            .to_rgba8();

        let font_size = self.derive_font_size(img.width());
        let padding = self.config.padding;
        let mut cursor_y = self.config.top_margin;

        for line in text.split('\n') {
            let (text_w, text_h) = self.measure_line(line, font_size);
            let box_w = text_w + 2 * padding;
            let box_h = text_h + 2 * padding;

            draw_filled_rect_mut(
                &mut img,
                Rect::at(padding as i32, cursor_y as i32).of_size(box_w.max(1), box_h.max(1)),
                BOX_COLOR,
            );

            self.draw_line(&mut img, line, 2 * padding, cursor_y + padding, font_size);

            cursor_y += box_h + self.config.line_spacing;
        }

        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| LingoError::Render(format!("Failed to encode image: {e}")))?;

        Ok(buffer.into_inner())
    }
}

/// Integer upscale factor that brings the 8px bitmap glyphs near the
/// requested size.
fn bitmap_scale(font_size: f32) -> u32 {
    ((font_size / 8.0).round() as u32).max(1)
}

fn draw_bitmap_line(img: &mut RgbaImage, line: &str, x: u32, y: u32, scale: u32) {
    let mut pen_x = x;
    for ch in line.chars() {
        // Glyphs outside the basic set render as blanks; the background box
        // still marks where text would be.
        if let Some(glyph) = BASIC_FONTS.get(ch) {
            for (row_idx, row) in glyph.iter().enumerate() {
                for bit in 0..8u32 {
                    if row & (1 << bit) != 0 {
                        for dy in 0..scale {
                            for dx in 0..scale {
                                let px = pen_x + bit * scale + dx;
                                let py = y + row_idx as u32 * scale + dy;
                                if px < img.width() && py < img.height() {
                                    img.put_pixel(px, py, TEXT_COLOR);
                                }
                            }
                        }
                    }
                }
            }
        }
        pen_x += 8 * scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(font_paths: Vec<String>) -> OverlayConfig {
        OverlayConfig {
            font_paths,
            min_font_size: 15.0,
            font_size_divisor: 25.0,
            padding: 10,
            line_spacing: 5,
            top_margin: 10,
        }
    }

    fn bitmap_renderer() -> TextOverlayRenderer {
        // No probe paths: forces the built-in bitmap fallback.
        TextOverlayRenderer::new(&make_config(vec![]))
    }

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 200, 200, 255]));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_missing_fonts_fall_back_without_error() {
        let renderer = bitmap_renderer();
        assert!(!renderer.has_scalable_font());
    }

    #[test]
    fn test_font_size_scales_with_width_and_has_floor() {
        let renderer = bitmap_renderer();
        assert_eq!(renderer.derive_font_size(100), 15.0);
        assert_eq!(renderer.derive_font_size(1000), 40.0);
    }

    #[test]
    fn test_render_preserves_image_dimensions() {
        let renderer = bitmap_renderer();
        let rendered = renderer.render(&sample_png(400, 300), "HELLO").unwrap();
        let out = image::load_from_memory(&rendered).unwrap();
        assert_eq!(out.width(), 400);
        assert_eq!(out.height(), 300);
    }

    #[test]
    fn test_render_draws_background_box_and_text() {
        let renderer = bitmap_renderer();
        let rendered = renderer.render(&sample_png(400, 300), "HELLO").unwrap();
        let out = image::load_from_memory(&rendered).unwrap().to_rgba8();

        // Inside the first box: corner pixel is the box color.
        assert_eq!(*out.get_pixel(12, 12), Rgba([0, 0, 0, 255]));
        // Somewhere in the text area a glyph pixel is white.
        let has_white = out.pixels().any(|p| *p == Rgba([255, 255, 255, 255]));
        assert!(has_white);
    }

    #[test]
    fn test_multiline_boxes_stack_downward() {
        let renderer = bitmap_renderer();
        let rendered = renderer.render(&sample_png(400, 300), "AB\nCD").unwrap();
        let out = image::load_from_memory(&rendered).unwrap().to_rgba8();

        // Second line's box starts below the first box plus spacing.
        let font_size = renderer.derive_font_size(400);
        let box_h = 8 * bitmap_scale(font_size) + 2 * 10;
        let second_box_y = 10 + box_h + 5 + 2;
        assert_eq!(
            *out.get_pixel(12, second_box_y),
            Rgba([0, 0, 0, 255])
        );
    }

    #[test]
    fn test_undecodable_input_is_a_render_error() {
        let renderer = bitmap_renderer();
        let result = renderer.render(b"not an image", "HELLO");
        assert!(matches!(result, Err(LingoError::Render(_))));
    }
}
