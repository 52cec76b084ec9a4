use crate::error::FontLoadError;

/// Handle to a font loaded into a [`FontLibrary`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FontId(pub(crate) usize);

impl FontId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

struct LoadedFont {
    name: String,
    font: fontdue::Font,
}

/// Fonts that go into every atlas build.
///
/// Fonts are immutable after loading. Adding a font does not touch any atlas
/// already built; request a rebuild to pick it up.
#[derive(Default)]
pub struct FontLibrary {
    fonts: Vec<LoadedFont>,
}

impl FontLibrary {
    pub fn new() -> Self {
        Self { fonts: Vec::new() }
    }

    /// Parses a TrueType or OpenType font from raw bytes.
    ///
    /// Fonts are packed into the atlas in load order, so the first font loaded
    /// is the default one.
    pub fn load_font(&mut self, name: impl Into<String>, bytes: &[u8]) -> Result<FontId, FontLoadError> {
        let name = name.into();
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| FontLoadError::new(name.clone(), e))?;
        let id = FontId(self.fonts.len());
        log::debug!("loaded font '{name}' as {id:?}");
        self.fonts.push(LoadedFont { name, font });
        Ok(id)
    }

    pub fn get(&self, id: FontId) -> Option<&fontdue::Font> {
        self.fonts.get(id.0).map(|f| &f.font)
    }

    pub fn find(&self, name: &str) -> Option<FontId> {
        self.fonts.iter().position(|f| f.name == name).map(FontId)
    }

    pub fn name(&self, id: FontId) -> Option<&str> {
        self.fonts.get(id.0).map(|f| f.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (FontId, &fontdue::Font)> {
        self.fonts.iter().enumerate().map(|(i, f)| (FontId(i), &f.font))
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}
