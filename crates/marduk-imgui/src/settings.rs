//! Configuration and the settings collaborator.
//!
//! [`ManagerConfig`] is fixed at construction. [`Settings`] is queried every
//! frame, so a host can change the DPI scale at any time.

use crate::surface::SurfaceId;

/// Which reserved surface the host treats as its "special" one.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum HostFlavor {
    /// Editor build: the editor surface is always available.
    #[default]
    Editor,
    /// Shipping/standalone build: the game surface is always available.
    Standalone,
}

impl HostFlavor {
    pub fn special_surface(self) -> SurfaceId {
        match self {
            Self::Editor => SurfaceId::Editor,
            Self::Standalone => SurfaceId::Standalone,
        }
    }
}

/// Display names handed to new contexts.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextNaming {
    pub editor: String,
    pub standalone: String,
    /// Session contexts are named `{session_prefix}{instance}`.
    pub session_prefix: String,
    /// Named worlds are `{world_prefix}{name}`.
    pub world_prefix: String,
}

impl Default for ContextNaming {
    fn default() -> Self {
        Self {
            editor: "Editor".to_string(),
            standalone: "Game".to_string(),
            session_prefix: "PIEContext".to_string(),
            world_prefix: String::new(),
        }
    }
}

impl ContextNaming {
    pub fn display_name(&self, id: &SurfaceId) -> String {
        match id {
            SurfaceId::Editor => self.editor.clone(),
            SurfaceId::Standalone => self.standalone.clone(),
            SurfaceId::Session(instance) => format!("{}{instance}", self.session_prefix),
            SurfaceId::Named(name) => format!("{}{name}", self.world_prefix),
        }
    }
}

/// Who applies the DPI scale.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum DpiScaleMethod {
    /// The UI contexts scale themselves; the font atlas is rasterized at the scale.
    #[default]
    Ui,
    /// The host scales the composited UI; contexts and fonts stay at 1.0.
    Host,
}

/// Piecewise-linear curve mapping display height (px) to a scale multiplier.
///
/// Evaluation clamps to the first/last key outside the key range.
#[derive(Debug, Clone, PartialEq)]
pub struct DpiCurve {
    keys: Vec<(f32, f32)>,
}

impl DpiCurve {
    /// Keys are `(display_height, multiplier)`; order does not matter.
    /// Non-finite keys are dropped.
    pub fn new(keys: impl IntoIterator<Item = (f32, f32)>) -> Self {
        let mut keys: Vec<_> = keys
            .into_iter()
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .collect();
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { keys }
    }

    pub fn evaluate(&self, x: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 1.0;
        };
        if x <= first.0 {
            return first.1;
        }
        if x >= last.0 {
            return last.1;
        }
        for pair in self.keys.windows(2) {
            let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
            if x <= x1 {
                if x1 == x0 {
                    return y1;
                }
                let t = (x - x0) / (x1 - x0);
                return y0 + (y1 - y0) * t;
            }
        }
        last.1
    }
}

/// DPI scale as reported by the settings collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct DpiScaleInfo {
    pub method: DpiScaleMethod,
    pub scale: f32,
    /// Optional resolution-based multiplier, evaluated at `display_height`.
    pub curve: Option<DpiCurve>,
    pub display_height: f32,
}

impl Default for DpiScaleInfo {
    fn default() -> Self {
        Self { method: DpiScaleMethod::Ui, scale: 1.0, curve: None, display_height: 1080.0 }
    }
}

impl DpiScaleInfo {
    pub fn uniform(scale: f32) -> Self {
        Self { scale, ..Self::default() }
    }

    fn combined(&self) -> f32 {
        let curve = self.curve.as_ref().map_or(1.0, |c| c.evaluate(self.display_height));
        self.scale * curve
    }

    /// Scale the UI contexts and the font atlas use.
    pub fn ui_scale(&self) -> f32 {
        match self.method {
            DpiScaleMethod::Ui => self.combined(),
            DpiScaleMethod::Host => 1.0,
        }
    }

    /// Scale the host applies to the composited UI.
    pub fn host_scale(&self) -> f32 {
        match self.method {
            DpiScaleMethod::Ui => 1.0,
            DpiScaleMethod::Host => self.combined(),
        }
    }
}

/// External settings source, queried once per frame.
pub trait Settings {
    fn dpi_scale(&self) -> DpiScaleInfo;
}

/// In-memory [`Settings`].
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    pub dpi: DpiScaleInfo,
}

impl StaticSettings {
    pub fn with_scale(scale: f32) -> Self {
        Self { dpi: DpiScaleInfo::uniform(scale) }
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.dpi.scale = scale;
    }
}

impl Settings for StaticSettings {
    fn dpi_scale(&self) -> DpiScaleInfo {
        self.dpi.clone()
    }
}

/// Manager construction options.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub flavor: HostFlavor,
    /// Frames a superseded font atlas is kept alive. Must cover the deepest
    /// pipeline between the tick thread and the render thread; 0 acts as 1.
    pub atlas_release_delay: u32,
    /// Also drop contexts of ended sessions during [`tick`](crate::ContextManager::tick).
    /// Off by default: stale contexts are skipped but stay lookupable until
    /// the host removes them, so a restarted session keeps its UI state.
    pub prune_ended_sessions: bool,
    pub naming: ContextNaming,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            flavor: HostFlavor::Editor,
            atlas_release_delay: 3,
            prune_ended_sessions: false,
            naming: ContextNaming::default(),
        }
    }
}

impl ManagerConfig {
    pub fn with_flavor(mut self, flavor: HostFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn with_atlas_release_delay(mut self, frames: u32) -> Self {
        self.atlas_release_delay = frames;
        self
    }

    pub fn with_prune_ended_sessions(mut self, prune: bool) -> Self {
        self.prune_ended_sessions = prune;
        self
    }

    pub fn with_naming(mut self, naming: ContextNaming) -> Self {
        self.naming = naming;
        self
    }
}
