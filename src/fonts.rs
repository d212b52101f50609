use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use fontdue::Font;
use unicode_width::UnicodeWidthStr;

use crate::chunker::TextMeasure;

/// Well-known faces tried in order when no `--font` is given.
pub const FONT_SEARCH_PATHS: [&str; 8] = [
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/Library/Fonts/Arial Unicode.ttf",
];

pub fn discover_font() -> Option<PathBuf> {
    FONT_SEARCH_PATHS
        .iter()
        .map(Path::new)
        .find(|path| path.is_file())
        .map(Path::to_path_buf)
}

pub fn load_font(path: &Path) -> Result<Font> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read font file {}", path.display()))?;
    Font::from_bytes(bytes, fontdue::FontSettings::default())
        .map_err(|error| anyhow!("failed to parse font {}: {error}", path.display()))
}

/// Advance-width sum plus kerning. The rasterizer draws with the same
/// metrics, so wrap decisions and painted lines agree.
pub fn text_width(font: &Font, text: &str, px: f32) -> f32 {
    let mut width = 0.0;
    let mut previous = None;
    for ch in text.chars() {
        if let Some(prev) = previous {
            width += font.horizontal_kern(prev, ch, px).unwrap_or(0.0);
        }
        width += font.metrics(ch, px).advance_width;
        previous = Some(ch);
    }
    width
}

/// Pixel measurement backed by a parsed font.
pub struct FontMetrics<'f> {
    font: &'f Font,
    px: f32,
}

impl<'f> FontMetrics<'f> {
    pub fn new(font: &'f Font, px: f32) -> Self {
        Self { font, px }
    }
}

impl TextMeasure for FontMetrics<'_> {
    fn width_px(&self, text: &str) -> f32 {
        text_width(self.font, text, self.px)
    }
}

/// Font-free estimate for dry runs: two thirds of the font size per
/// terminal cell, with wide glyphs counted as two cells.
pub struct CellEstimate {
    cell_px: f32,
}

impl CellEstimate {
    pub fn new(font_size: u32) -> Self {
        Self {
            cell_px: font_size as f32 / 1.5,
        }
    }
}

impl TextMeasure for CellEstimate {
    fn width_px(&self, text: &str) -> f32 {
        text.width() as f32 * self.cell_px
    }
}

/// Distinct characters of `text` the font has no glyph for, in first-seen
/// order. Whitespace is exempt.
pub fn unsupported_codepoints(font: &Font, text: &str) -> Vec<char> {
    let mut missing = Vec::new();
    for ch in text.chars() {
        if ch.is_whitespace() {
            continue;
        }
        if font.lookup_glyph_index(ch) == 0 && !missing.contains(&ch) {
            missing.push(ch);
        }
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::{CellEstimate, TextMeasure};

    #[test]
    fn cell_estimate_scales_with_font_size() {
        let estimate = CellEstimate::new(30);
        assert_eq!(estimate.width_px("abcd"), 80.0);
    }

    #[test]
    fn cell_estimate_counts_wide_glyphs_double() {
        let estimate = CellEstimate::new(30);
        assert_eq!(estimate.width_px("世界"), estimate.width_px("abcd"));
    }
}
