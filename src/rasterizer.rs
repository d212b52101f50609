use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use fontdue::layout::{
    CoordinateSystem, GlyphRasterConfig, HorizontalAlign, Layout, LayoutSettings, TextStyle,
    VerticalAlign, WrapStyle,
};
use fontdue::Font;

use crate::chunker::Frame;
use crate::fonts::text_width;
use crate::settings::{RenderSettings, Rgb};

#[derive(Debug, Clone)]
struct GlyphBitmap {
    width: usize,
    height: usize,
    bitmap: Vec<u8>,
}

/// Renders frames to RGBA buffers: opaque background, each line centered
/// horizontally, the line block centered vertically.
pub struct FramePainter {
    font: Font,
    settings: RenderSettings,
    glyph_cache: HashMap<GlyphRasterConfig, GlyphBitmap>,
}

impl FramePainter {
    pub fn new(font: Font, settings: RenderSettings) -> Self {
        Self {
            font,
            settings,
            glyph_cache: HashMap::new(),
        }
    }

    pub fn render_frame_rgba(&mut self, frame: &Frame) -> Vec<u8> {
        let mut buffer = filled_background(
            self.settings.width,
            self.settings.height,
            self.settings.background,
        );
        if frame.lines.is_empty() {
            return buffer;
        }

        let px = self.settings.font_size as f32;
        let line_height = self.settings.line_height_px();
        let block_height = line_height * frame.lines.len() as f32;
        let mut y = centered_origin(self.settings.height as f32, block_height);

        for line in &frame.lines {
            let line_width = text_width(&self.font, line, px);
            let x = centered_origin(self.settings.width as f32, line_width);
            self.draw_line(&mut buffer, x, y, line);
            y += line_height;
        }

        buffer
    }

    fn draw_line(&mut self, buffer: &mut [u8], x: f32, y: f32, text: &str) {
        // Lines are pre-wrapped by the chunker, so the layout never wraps.
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x,
            y,
            max_width: None,
            max_height: None,
            horizontal_align: HorizontalAlign::Left,
            vertical_align: VerticalAlign::Top,
            line_height: 1.0,
            wrap_style: WrapStyle::Word,
            wrap_hard_breaks: false,
        });
        layout.append(
            &[&self.font],
            &TextStyle::new(text, self.settings.font_size as f32, 0),
        );

        let color = self.settings.foreground;
        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let glyph_bitmap = self.glyph_cache.entry(glyph.key).or_insert_with(|| {
                let (_, bitmap) = self.font.rasterize_config(glyph.key);
                GlyphBitmap {
                    width: glyph.width,
                    height: glyph.height,
                    bitmap,
                }
            });

            blend_glyph(
                buffer,
                self.settings.width,
                self.settings.height,
                glyph.x.round() as i32,
                glyph.y.round() as i32,
                glyph_bitmap,
                color,
            );
        }
    }
}

fn filled_background(width: u32, height: u32, color: Rgb) -> Vec<u8> {
    let mut buffer = vec![0_u8; width as usize * height as usize * 4];
    for pixel in buffer.chunks_exact_mut(4) {
        pixel[0] = color.r;
        pixel[1] = color.g;
        pixel[2] = color.b;
        pixel[3] = 255;
    }
    buffer
}

/// Top/left coordinate that centers `content` inside `total`, floored at
/// zero for the over-wide single-word case.
fn centered_origin(total: f32, content: f32) -> f32 {
    ((total - content) * 0.5).max(0.0)
}

fn blend_glyph(
    frame: &mut [u8],
    frame_width: u32,
    frame_height: u32,
    x: i32,
    y: i32,
    glyph: &GlyphBitmap,
    color: Rgb,
) {
    for row in 0..glyph.height {
        let py = y + row as i32;
        if py < 0 || py >= frame_height as i32 {
            continue;
        }

        for col in 0..glyph.width {
            let px = x + col as i32;
            if px < 0 || px >= frame_width as i32 {
                continue;
            }

            let coverage = glyph.bitmap[row * glyph.width + col];
            if coverage == 0 {
                continue;
            }

            let idx = ((py as u32 * frame_width + px as u32) * 4) as usize;
            blend_pixel(frame, idx, color, coverage);
        }
    }
}

fn blend_pixel(frame: &mut [u8], idx: usize, color: Rgb, coverage: u8) {
    let alpha = u16::from(coverage);
    let inv_alpha = 255 - alpha;
    let src = [color.r, color.g, color.b];

    for channel in 0..3 {
        let dst = u16::from(frame[idx + channel]);
        let mixed = (u16::from(src[channel]) * alpha + dst * inv_alpha + 127) / 255;
        frame[idx + channel] = mixed as u8;
    }
    frame[idx + 3] = 255;
}

/// Writes one rendered slide as a PNG, for `--dump-frames`.
pub fn save_frame_png(path: &Path, settings: &RenderSettings, rgba: &[u8]) -> Result<()> {
    let image = image::RgbaImage::from_raw(settings.width, settings.height, rgba.to_vec())
        .ok_or_else(|| {
            anyhow!(
                "frame buffer size does not match {}x{}",
                settings.width,
                settings.height
            )
        })?;
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::{blend_pixel, centered_origin, filled_background};
    use crate::settings::Rgb;

    #[test]
    fn background_is_opaque_and_uniform() {
        let color = Rgb { r: 10, g: 20, b: 30 };
        let buffer = filled_background(4, 2, color);
        assert_eq!(buffer.len(), 4 * 2 * 4);
        for pixel in buffer.chunks_exact(4) {
            assert_eq!(pixel, [10, 20, 30, 255]);
        }
    }

    #[test]
    fn centering_splits_slack_evenly() {
        assert_eq!(centered_origin(100.0, 60.0), 20.0);
    }

    #[test]
    fn centering_clamps_oversized_content() {
        assert_eq!(centered_origin(100.0, 140.0), 0.0);
    }

    #[test]
    fn full_coverage_paints_pure_foreground() {
        let mut frame = vec![0, 0, 0, 255];
        blend_pixel(&mut frame, 0, Rgb::WHITE, 255);
        assert_eq!(frame, vec![255, 255, 255, 255]);
    }

    #[test]
    fn half_coverage_mixes_with_background() {
        let mut frame = vec![0, 0, 0, 255];
        blend_pixel(&mut frame, 0, Rgb::WHITE, 128);
        assert_eq!(frame[0], 128);
        assert_eq!(frame[3], 255);
    }
}
