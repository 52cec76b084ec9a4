use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::FontId;

static NEXT_ATLAS_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one atlas build.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct AtlasId(u64);

/// Glyph lookup key.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct GlyphKey {
    pub font: FontId,
    pub ch: char,
}

impl GlyphKey {
    #[inline]
    pub const fn new(font: FontId, ch: char) -> Self {
        Self { font, ch }
    }
}

/// Pixel rectangle inside the atlas.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct GlyphRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Layout metrics of a glyph at the atlas scale, in physical pixels.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct GlyphMetrics {
    pub advance: f32,
    /// Bitmap offset from the pen position (`xmin`, `ymin`).
    pub offset: [f32; 2],
}

/// A packed glyph.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AtlasGlyph {
    pub rect: GlyphRect,
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
    pub metrics: GlyphMetrics,
}

/// Rasterized glyph atlas shared by every UI context.
///
/// Single-channel coverage (R8), row-major. Once wrapped in an `Arc` and
/// published the atlas is never mutated; a DPI change produces a new one.
pub struct FontAtlas {
    id: AtlasId,
    scale: f32,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    glyphs: HashMap<GlyphKey, AtlasGlyph>,
}

impl FontAtlas {
    /// Blank atlas for `scale`. Zero dimensions are raised to 1.
    pub fn new(width: u32, height: u32, scale: f32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            id: AtlasId(NEXT_ATLAS_ID.fetch_add(1, Ordering::Relaxed)),
            scale,
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
            glyphs: HashMap::new(),
        }
    }

    /// Copies a glyph bitmap into `rect` and records it under `key`.
    ///
    /// Returns `false` (and changes nothing) if `rect` lies outside the atlas or
    /// `bitmap` is not `width * height` bytes. Zero-sized rects record metrics
    /// only, which is how whitespace is stored.
    #[must_use]
    pub fn insert_glyph(
        &mut self,
        key: GlyphKey,
        rect: GlyphRect,
        bitmap: &[u8],
        metrics: GlyphMetrics,
    ) -> bool {
        let fits = rect.x.checked_add(rect.width).is_some_and(|r| r <= self.width)
            && rect.y.checked_add(rect.height).is_some_and(|b| b <= self.height);
        if !fits || bitmap.len() != rect.width as usize * rect.height as usize {
            return false;
        }

        let stride = self.width as usize;
        let w = rect.width as usize;
        if w > 0 {
            for (row, src) in bitmap.chunks_exact(w).enumerate() {
                let start = (rect.y as usize + row) * stride + rect.x as usize;
                self.pixels[start..start + w].copy_from_slice(src);
            }
        }

        let (aw, ah) = (self.width as f32, self.height as f32);
        self.glyphs.insert(
            key,
            AtlasGlyph {
                rect,
                uv_min: [rect.x as f32 / aw, rect.y as f32 / ah],
                uv_max: [(rect.x + rect.width) as f32 / aw, (rect.y + rect.height) as f32 / ah],
                metrics,
            },
        );
        true
    }

    #[inline]
    pub fn id(&self) -> AtlasId {
        self.id
    }

    /// DPI scale the glyphs were rasterized for.
    #[inline]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Texture data for upload, `width * height` bytes.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn glyph(&self, key: GlyphKey) -> Option<&AtlasGlyph> {
        self.glyphs.get(&key)
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }
}

impl fmt::Debug for FontAtlas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontAtlas")
            .field("id", &self.id)
            .field("scale", &self.scale)
            .field("size", &(self.width, self.height))
            .field("glyphs", &self.glyphs.len())
            .finish()
    }
}

/// The current atlas together with the DPI scale it is bound at.
///
/// This is what proxies receive on creation and on rebind.
#[derive(Debug, Clone)]
pub struct FontBinding {
    pub atlas: Arc<FontAtlas>,
    pub dpi_scale: f32,
}

impl FontBinding {
    pub fn new(atlas: Arc<FontAtlas>, dpi_scale: f32) -> Self {
        Self { atlas, dpi_scale }
    }
}

// ── shelf packer ──────────────────────────────────────────────────────────

/// Row-based rectangle packer.
///
/// Rectangles go left to right on the current shelf; a new shelf starts below
/// the tallest rectangle of the previous one when the row is full.
#[derive(Debug, Clone)]
pub(crate) struct ShelfPacker {
    width: u32,
    height: u32,
    padding: u32,
    cursor_x: u32,
    cursor_y: u32,
    row_height: u32,
}

impl ShelfPacker {
    pub(crate) fn new(width: u32, height: u32, padding: u32) -> Self {
        Self { width, height, padding, cursor_x: padding, cursor_y: padding, row_height: 0 }
    }

    /// Reserves a `w x h` rectangle, or `None` when the packer is out of room.
    pub(crate) fn place(&mut self, w: u32, h: u32) -> Option<(u32, u32)> {
        if w + 2 * self.padding > self.width {
            return None;
        }

        if self.cursor_x + w + self.padding > self.width {
            self.cursor_y += self.row_height + self.padding;
            self.cursor_x = self.padding;
            self.row_height = 0;
        }

        if self.cursor_y + h + self.padding > self.height {
            return None;
        }

        let pos = (self.cursor_x, self.cursor_y);
        self.cursor_x += w + self.padding;
        self.row_height = self.row_height.max(h);
        Some(pos)
    }

    /// Height actually covered by placed rectangles, including padding.
    pub(crate) fn used_height(&self) -> u32 {
        if self.row_height == 0 && self.cursor_x == self.padding {
            self.cursor_y
        } else {
            self.cursor_y + self.row_height + self.padding
        }
    }
}
