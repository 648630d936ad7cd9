//! Text rasterization for channel labels.

use cosmic_text::{Attrs, Buffer, Color, Family, FontSystem, Metrics, Shaping, SwashCache};

/// 8-bit coverage of a line of rasterized text, row-major, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphMask {
    pub width: u32,
    pub height: u32,
    pub coverage: Vec<u8>,
}

impl GlyphMask {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            coverage: vec![0; (width * height) as usize],
        }
    }

    /// Coverage at `(x, y)`, zero outside the mask.
    pub fn get(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.coverage[(y * self.width + x) as usize]
    }

    /// Raise coverage at `(x, y)` to at least `value`. Out-of-bounds writes are
    /// dropped.
    pub fn accumulate(&mut self, x: i32, y: i32, value: u8) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return;
        }
        let i = (y as u32 * self.width + x as u32) as usize;
        self.coverage[i] = self.coverage[i].max(value);
    }
}

/// Turns a label string into a coverage mask.
pub trait TextRasterizer {
    /// Rasterize one line of `text` at `font_px` backing-store pixels.
    fn rasterize(&mut self, text: &str, font_px: f32) -> GlyphMask;
}

/// System-font rasterizer backed by cosmic-text.
pub struct CosmicRasterizer {
    font_system: FontSystem,
    swash_cache: SwashCache,
}

impl CosmicRasterizer {
    /// Loads the system font database, which can take a moment.
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            swash_cache: SwashCache::new(),
        }
    }
}

impl Default for CosmicRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRasterizer for CosmicRasterizer {
    fn rasterize(&mut self, text: &str, font_px: f32) -> GlyphMask {
        let line_height = (font_px * 1.25).ceil();
        let mut buffer = Buffer::new(&mut self.font_system, Metrics::new(font_px, line_height));
        buffer.set_size(&mut self.font_system, None, None);
        buffer.set_text(
            &mut self.font_system,
            text,
            Attrs::new().family(Family::SansSerif),
            Shaping::Advanced,
        );
        buffer.shape_until_scroll(&mut self.font_system, false);

        let width = buffer
            .layout_runs()
            .map(|run| run.line_w)
            .fold(0.0f32, f32::max)
            .ceil() as u32;
        let mut mask = GlyphMask::new(width.max(1), line_height as u32);

        buffer.draw(
            &mut self.font_system,
            &mut self.swash_cache,
            Color::rgb(0xFF, 0xFF, 0xFF),
            |x, y, w, h, color| {
                let alpha = color.a();
                if alpha == 0 {
                    return;
                }
                for dy in 0..h as i32 {
                    for dx in 0..w as i32 {
                        mask.accumulate(x + dx, y + dy, alpha);
                    }
                }
            },
        );
        mask
    }
}

/// Draws every visible character as a solid block.
///
/// Needs no fonts, so output is identical on every machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockRasterizer;

impl TextRasterizer for BlockRasterizer {
    fn rasterize(&mut self, text: &str, font_px: f32) -> GlyphMask {
        let advance = (font_px * 0.6).round().max(1.0) as u32;
        let height = (font_px * 1.25).ceil().max(1.0) as u32;
        let glyph_top = (height as f32 * 0.2).round() as u32;
        let glyph_bottom = height - glyph_top;

        let chars: Vec<char> = text.chars().collect();
        let mut mask = GlyphMask::new((advance * chars.len() as u32).max(1), height);
        for (i, c) in chars.iter().enumerate() {
            if c.is_whitespace() {
                continue;
            }
            let left = i as u32 * advance;
            // one column of spacing on the right of each glyph
            for y in glyph_top..glyph_bottom {
                for x in left..left + advance.saturating_sub(1).max(1) {
                    mask.accumulate(x as i32, y as i32, 255);
                }
            }
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_rasterizer_scales_with_font() {
        let mut r = BlockRasterizer;
        let small = r.rasterize("Fz", 10.0);
        let large = r.rasterize("Fz", 20.0);
        assert_eq!((small.width, small.height), (12, 13));
        assert_eq!((large.width, large.height), (24, 25));
        // glyph body is covered, the row above it is not
        assert_eq!(small.get(0, 6), 255);
        assert_eq!(small.get(0, 0), 0);
        // whitespace leaves a gap
        let spaced = r.rasterize("a b", 10.0);
        assert_eq!(spaced.get(7, 6), 0);
    }

    #[test]
    fn test_mask_bounds() {
        let mut mask = GlyphMask::new(2, 2);
        mask.accumulate(1, 1, 200);
        mask.accumulate(1, 1, 100);
        mask.accumulate(-1, 0, 255);
        mask.accumulate(2, 0, 255);
        assert_eq!(mask.get(1, 1), 200);
        assert_eq!(mask.get(5, 5), 0);
        assert_eq!(mask.coverage.iter().filter(|c| **c > 0).count(), 1);
    }
}
