use std::fmt;

use crate::surface::SurfaceId;

/// A font file could not be parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct FontLoadError {
    /// Name the font was registered under.
    pub name: String,
    pub message: String,
}

impl FontLoadError {
    pub(crate) fn new(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self { name: name.into(), message: msg.into() }
    }
}

impl fmt::Display for FontLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to load font '{}': {}", self.name, self.message)
    }
}

impl std::error::Error for FontLoadError {}

/// Why a font atlas could not be (re)built.
///
/// A failed build never replaces the current atlas.
#[derive(Debug, Clone, PartialEq)]
pub enum AtlasBuildError {
    /// The requested scale is not a finite, positive number.
    InvalidScale(f32),
    /// The configured glyphs do not fit into the maximum atlas size.
    AtlasFull { width: u32, height: u32 },
    Font(FontLoadError),
    /// Failure reported by a custom [`AtlasBuilder`](crate::text::AtlasBuilder).
    Builder(String),
}

impl fmt::Display for AtlasBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidScale(scale) => write!(f, "invalid font atlas scale {scale}"),
            Self::AtlasFull { width, height } => {
                write!(f, "glyphs do not fit into a {width}x{height} font atlas")
            }
            Self::Font(e) => write!(f, "{e}"),
            Self::Builder(msg) => write!(f, "font atlas builder failed: {msg}"),
        }
    }
}

impl std::error::Error for AtlasBuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Font(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FontLoadError> for AtlasBuildError {
    fn from(e: FontLoadError) -> Self {
        Self::Font(e)
    }
}

/// Errors surfaced by the context registry and manager.
#[derive(Debug)]
pub enum ContextError {
    /// The proxy factory refused to create a context. Nothing was inserted;
    /// the caller may retry on a later frame.
    ProxyCreation { surface: SurfaceId, source: anyhow::Error },
    /// No font atlas could be built, so no context can be created.
    FontAtlas(AtlasBuildError),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProxyCreation { surface, source } => {
                write!(f, "failed to create UI context for surface '{surface}': {source:#}")
            }
            Self::FontAtlas(e) => write!(f, "no font atlas available: {e}"),
        }
    }
}

impl std::error::Error for ContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ProxyCreation { source, .. } => Some(&**source),
            Self::FontAtlas(e) => Some(e),
        }
    }
}

impl From<AtlasBuildError> for ContextError {
    fn from(e: AtlasBuildError) -> Self {
        Self::FontAtlas(e)
    }
}
