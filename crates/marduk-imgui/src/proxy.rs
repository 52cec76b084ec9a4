//! Contracts for the immediate-mode UI library.
//!
//! This crate never draws widgets. Each surface owns one [`ContextProxy`]
//! produced by a [`ProxyFactory`]; the proxy holds the UI library's state and
//! produces one frame of output per [`tick`](ContextProxy::tick).

use crate::surface::SurfaceId;
use crate::text::FontBinding;

/// Construction parameters for a new context.
#[derive(Debug, Clone, Copy)]
pub struct ProxyParams<'a> {
    /// Display name chosen by [`ContextNaming`](crate::settings::ContextNaming).
    pub name: &'a str,
    pub id: &'a SurfaceId,
    /// Current atlas and the DPI scale it was built for.
    pub font: &'a FontBinding,
}

/// One surface's UI context.
///
/// Dropping the proxy destroys the context.
pub trait ContextProxy {
    /// Advances the context by one frame.
    ///
    /// An error is reported and isolated to this surface; siblings still tick.
    fn tick(&mut self, delta_seconds: f32) -> anyhow::Result<()>;

    /// Switches the context to a rebuilt atlas.
    ///
    /// Widget state must survive; only glyph resources change. After this
    /// returns the proxy must not touch the previous atlas again.
    fn rebind_font_atlas(&mut self, font: &FontBinding);

    /// A world owned by this surface started ticking. The proxy becomes the
    /// current context so world code can issue UI calls.
    fn begin_world_tick(&mut self) {}

    /// Actors of the owning world finished ticking.
    fn draw_debug(&mut self) {}
}

/// Creates proxies for newly seen surfaces.
pub trait ProxyFactory {
    type Proxy: ContextProxy;

    fn create(&mut self, params: ProxyParams<'_>) -> anyhow::Result<Self::Proxy>;
}

impl<P, F> ProxyFactory for F
where
    P: ContextProxy,
    F: FnMut(ProxyParams<'_>) -> anyhow::Result<P>,
{
    type Proxy = P;

    fn create(&mut self, params: ProxyParams<'_>) -> anyhow::Result<P> {
        self(params)
    }
}
