use std::ops::RangeInclusive;

use crate::error::AtlasBuildError;

use super::atlas::{FontAtlas, GlyphKey, GlyphMetrics, GlyphRect, ShelfPacker};
use super::FontLibrary;

/// Produces a fresh atlas for a DPI scale.
///
/// Implementations must not return an atlas that is shared with anything
/// else; the controller takes ownership and publishes it.
pub trait AtlasBuilder {
    fn build(&mut self, scale: f32) -> Result<FontAtlas, AtlasBuildError>;
}

impl<F> AtlasBuilder for F
where
    F: FnMut(f32) -> Result<FontAtlas, AtlasBuildError>,
{
    fn build(&mut self, scale: f32) -> Result<FontAtlas, AtlasBuildError> {
        self(scale)
    }
}

/// Glyph set and size limits for [`GlyphAtlasBuilder`].
#[derive(Debug, Clone)]
pub struct FontAtlasConfig {
    /// Font size in logical pixels; rasterized at `base_font_size * scale`.
    pub base_font_size: f32,
    pub glyph_ranges: Vec<RangeInclusive<char>>,
    /// Atlas width. Height grows in powers of two up to `max_height`.
    pub max_width: u32,
    pub max_height: u32,
    /// Empty pixels kept between glyphs.
    pub padding: u32,
}

impl Default for FontAtlasConfig {
    fn default() -> Self {
        Self {
            base_font_size: 13.0,
            // Basic Latin + Latin-1 Supplement.
            glyph_ranges: vec!['\u{20}'..='\u{ff}'],
            max_width: 1024,
            max_height: 4096,
            padding: 1,
        }
    }
}

/// Rasterizes every configured glyph of every library font with fontdue.
pub struct GlyphAtlasBuilder {
    fonts: FontLibrary,
    config: FontAtlasConfig,
}

struct RasterizedGlyph {
    key: GlyphKey,
    rect: GlyphRect,
    bitmap: Vec<u8>,
    metrics: GlyphMetrics,
}

impl GlyphAtlasBuilder {
    pub fn new(fonts: FontLibrary, config: FontAtlasConfig) -> Self {
        Self { fonts, config }
    }

    pub fn fonts(&self) -> &FontLibrary {
        &self.fonts
    }

    /// Fonts added here show up in the next build.
    pub fn fonts_mut(&mut self) -> &mut FontLibrary {
        &mut self.fonts
    }

    pub fn config(&self) -> &FontAtlasConfig {
        &self.config
    }
}

impl AtlasBuilder for GlyphAtlasBuilder {
    fn build(&mut self, scale: f32) -> Result<FontAtlas, AtlasBuildError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(AtlasBuildError::InvalidScale(scale));
        }

        let cfg = &self.config;
        let px = cfg.base_font_size * scale;
        let full = AtlasBuildError::AtlasFull { width: cfg.max_width, height: cfg.max_height };
        let mut packer = ShelfPacker::new(cfg.max_width, cfg.max_height, cfg.padding);
        let mut glyphs = Vec::new();

        for (font_id, font) in self.fonts.iter() {
            for ch in cfg.glyph_ranges.iter().flat_map(|r| r.clone()) {
                // Index 0 is the font's "missing glyph" box.
                if font.lookup_glyph_index(ch) == 0 {
                    continue;
                }

                let (m, bitmap) = font.rasterize(ch, px);
                let (w, h) = (m.width as u32, m.height as u32);
                let rect = if w == 0 || h == 0 {
                    GlyphRect::default()
                } else {
                    let (x, y) = packer.place(w, h).ok_or_else(|| full.clone())?;
                    GlyphRect { x, y, width: w, height: h }
                };

                glyphs.push(RasterizedGlyph {
                    key: GlyphKey::new(font_id, ch),
                    rect,
                    bitmap: if rect.width == 0 { Vec::new() } else { bitmap },
                    metrics: GlyphMetrics {
                        advance: m.advance_width,
                        offset: [m.xmin as f32, m.ymin as f32],
                    },
                });
            }
        }

        let height = packer.used_height().next_power_of_two().min(cfg.max_height);
        let mut atlas = FontAtlas::new(cfg.max_width, height, scale);
        for g in glyphs {
            if !atlas.insert_glyph(g.key, g.rect, &g.bitmap, g.metrics) {
                return Err(AtlasBuildError::Builder(format!(
                    "glyph {:?} does not fit the packed {}x{height} atlas",
                    g.key.ch, cfg.max_width
                )));
            }
        }

        log::debug!(
            "built font atlas {:?}: {}x{} px, {} glyphs from {} fonts at {px:.1}px",
            atlas.id(),
            cfg.max_width,
            height,
            atlas.glyph_count(),
            self.fonts.len()
        );
        Ok(atlas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::FontId;

    const MONO: &[u8] = include_bytes!("../../tests/fonts/DejaVuSansMono.ttf");

    fn empty_builder() -> GlyphAtlasBuilder {
        GlyphAtlasBuilder::new(FontLibrary::new(), FontAtlasConfig::default())
    }

    fn mono_builder(config: FontAtlasConfig) -> (GlyphAtlasBuilder, FontId) {
        let mut fonts = FontLibrary::new();
        let id = fonts.load_font("DejaVu Sans Mono", MONO).unwrap();
        (GlyphAtlasBuilder::new(fonts, config), id)
    }

    #[test]
    fn rejects_non_positive_scale() {
        let mut b = empty_builder();
        assert_eq!(b.build(0.0).unwrap_err(), AtlasBuildError::InvalidScale(0.0));
        assert!(matches!(b.build(-1.0), Err(AtlasBuildError::InvalidScale(_))));
        assert!(matches!(b.build(f32::NAN), Err(AtlasBuildError::InvalidScale(_))));
    }

    #[test]
    fn empty_library_builds_empty_atlas() {
        let atlas = empty_builder().build(1.5).unwrap();
        assert_eq!(atlas.glyph_count(), 0);
        assert_eq!(atlas.scale(), 1.5);
        assert_eq!(atlas.size().0, 1024);
    }

    #[test]
    fn each_build_is_a_new_atlas() {
        let mut b = empty_builder();
        let a = b.build(1.0).unwrap();
        let c = b.build(1.0).unwrap();
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn closures_are_builders() {
        let mut calls = 0;
        let mut builder = |scale: f32| {
            calls += 1;
            Ok(FontAtlas::new(16, 16, scale))
        };
        let atlas = AtlasBuilder::build(&mut builder, 2.0).unwrap();
        assert_eq!(atlas.scale(), 2.0);
        assert_eq!(calls, 1);
    }

    // ── rasterization ─────────────────────────────────────────────────────

    #[test]
    fn packs_visible_glyphs_inside_the_atlas() {
        let (mut b, font) = mono_builder(FontAtlasConfig::default());
        let atlas = b.build(1.0).unwrap();
        let (w, h) = atlas.size();

        assert_eq!(w, 1024);
        assert!(h.is_power_of_two());
        assert!(h <= 4096);
        // Every printable ASCII character is in the face.
        assert!(atlas.glyph_count() >= 95);

        for ch in ['A', 'g', '~', '\u{e9}'] {
            let g = atlas.glyph(GlyphKey::new(font, ch)).unwrap();
            assert!(g.rect.width > 0 && g.rect.height > 0, "{ch:?} has no bitmap");
            assert!(g.rect.x + g.rect.width <= w);
            assert!(g.rect.y + g.rect.height <= h);
            assert!(g.uv_max[0] <= 1.0 && g.uv_max[1] <= 1.0);
            assert!(g.uv_min[0] < g.uv_max[0] && g.uv_min[1] < g.uv_max[1]);
            assert!(g.metrics.advance > 0.0);
        }

        let a = atlas.glyph(GlyphKey::new(font, 'A')).unwrap().rect;
        let inked = (a.y..a.y + a.height)
            .flat_map(|y| (a.x..a.x + a.width).map(move |x| (y * w + x) as usize))
            .any(|i| atlas.pixels()[i] > 0);
        assert!(inked);
    }

    #[test]
    fn whitespace_keeps_metrics_without_a_rect() {
        let (mut b, font) = mono_builder(FontAtlasConfig::default());
        let atlas = b.build(1.0).unwrap();

        let space = atlas.glyph(GlyphKey::new(font, ' ')).unwrap();
        assert_eq!(space.rect, GlyphRect::default());
        assert!(space.metrics.advance > 0.0);
        // Monospace: the space advances as far as a letter.
        let m = atlas.glyph(GlyphKey::new(font, 'm')).unwrap();
        assert_eq!(space.metrics.advance, m.metrics.advance);
    }

    #[test]
    fn higher_scale_rasterizes_larger_glyphs() {
        let (mut b, font) = mono_builder(FontAtlasConfig::default());
        let small = b.build(1.0).unwrap();
        let large = b.build(2.0).unwrap();

        let key = GlyphKey::new(font, 'A');
        let (s, l) = (small.glyph(key).unwrap(), large.glyph(key).unwrap());
        assert!(l.rect.height > s.rect.height);
        assert!(l.metrics.advance > s.metrics.advance);
        assert_eq!(large.scale(), 2.0);
    }

    #[test]
    fn tiny_atlas_reports_full() {
        let config = FontAtlasConfig { max_width: 4, max_height: 4, ..FontAtlasConfig::default() };
        let (mut b, _) = mono_builder(config);

        assert_eq!(b.build(1.0).unwrap_err(), AtlasBuildError::AtlasFull { width: 4, height: 4 });
    }
}
