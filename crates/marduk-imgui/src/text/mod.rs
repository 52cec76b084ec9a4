//! Shared font resource.
//!
//! [`FontLibrary`] holds the loaded fonts, [`GlyphAtlasBuilder`] rasterizes
//! them into an immutable [`FontAtlas`], and [`FontAtlasController`] decides
//! when to rebuild and when a superseded atlas may finally be dropped.

mod atlas;
mod builder;
mod controller;
mod font_library;

pub use atlas::{AtlasGlyph, AtlasId, FontAtlas, FontBinding, GlyphKey, GlyphMetrics, GlyphRect};
pub use builder::{AtlasBuilder, FontAtlasConfig, GlyphAtlasBuilder};
pub use controller::{AtlasStatus, FontAtlasController, UNSET_SCALE};
pub use font_library::{FontId, FontLibrary};
