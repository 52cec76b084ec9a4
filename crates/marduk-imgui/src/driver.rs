use crate::error::{AtlasBuildError, ContextError};
use crate::event::ListenerId;
use crate::proxy::{ContextProxy, ProxyFactory};
use crate::registry::ContextRegistry;
use crate::settings::{ManagerConfig, Settings};
use crate::surface::{resolve_surface, HostSurface, SessionInstance, SurfaceId};
use crate::text::{AtlasBuilder, FontAtlasController, FontBinding};

/// Host queries the manager needs while ticking.
pub trait Host {
    /// Whether play session `session` is still running.
    fn is_session_live(&self, session: SessionInstance) -> bool;
}

impl<F> Host for F
where
    F: Fn(SessionInstance) -> bool,
{
    fn is_session_live(&self, session: SessionInstance) -> bool {
        self(session)
    }
}

/// Classification of a world tick.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum TickKind {
    /// Full tick: time advances and actors update.
    #[default]
    All,
    /// Only viewports update (editor idle, paused game).
    ViewportsOnly,
    /// Only time advances, no actor updates. No UI frame is begun.
    TimeOnly,
}

/// A world tick notification from the host.
#[derive(Clone, Copy)]
pub struct WorldTick<'a> {
    /// World that is ticking, `None` for ticks not tied to a world.
    pub surface: Option<&'a dyn HostSurface>,
    pub kind: TickKind,
    pub delta_seconds: f32,
}

/// What happened during one [`ContextManager::tick`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Frame number this report belongs to, starting at 0.
    pub frame: u64,
    /// The font atlas was rebuilt this frame.
    pub rebuilt: bool,
    /// A rebuild was attempted and failed; the previous atlas stays in use.
    pub rebuild_failed: bool,
    pub released_atlases: usize,
    pub pruned: usize,
    pub ticked: usize,
    /// Contexts skipped because their session is no longer live.
    pub skipped: usize,
    /// Contexts whose tick returned an error.
    pub failed: Vec<SurfaceId>,
}

/// Owns the context registry and the shared font atlas, and drives both from
/// host frame events.
///
/// Construct one per host module; it is not a global. All methods must be
/// called from the thread delivering frame ticks.
pub struct ContextManager<F: ProxyFactory, B: AtlasBuilder> {
    config: ManagerConfig,
    registry: ContextRegistry<F>,
    atlas: FontAtlasController<B>,
    font: FontBinding,
}

impl<F: ProxyFactory, B: AtlasBuilder> ContextManager<F, B> {
    /// Builds the initial atlas at the scale `settings` reports.
    ///
    /// Fails only if that first atlas cannot be built.
    pub fn new(
        config: ManagerConfig,
        factory: F,
        builder: B,
        settings: &impl Settings,
    ) -> Result<Self, ContextError> {
        let mut atlas = FontAtlasController::new(builder, config.atlas_release_delay);
        let scale = settings.dpi_scale().ui_scale();

        let mut initial = None;
        atlas.set_dpi_scale(scale, |binding| initial = Some(binding.clone()))?;
        let font = initial.ok_or(ContextError::FontAtlas(AtlasBuildError::InvalidScale(scale)))?;

        let registry = ContextRegistry::new(factory, config.naming.clone());
        Ok(Self { config, registry, atlas, font })
    }

    // ── frame driving ─────────────────────────────────────────────────────

    /// Once-per-frame update.
    ///
    /// Applies the current DPI scale (rebuilding the atlas if it changed),
    /// advances the atlas release queue, then ticks every context whose
    /// session is still live. A failing context is logged and skipped; the
    /// rest of the frame proceeds.
    pub fn tick(&mut self, host: &impl Host, settings: &impl Settings, delta_seconds: f32) -> TickReport {
        let mut report = TickReport { frame: self.atlas.frame(), ..TickReport::default() };

        match self.set_dpi_scale(settings.dpi_scale().ui_scale()) {
            Ok(rebuilt) => report.rebuilt = rebuilt,
            Err(_) => report.rebuild_failed = true,
        }

        report.released_atlases = self.atlas.tick_release_queue();

        let is_live = |session: SessionInstance| host.is_session_live(session);
        if self.config.prune_ended_sessions {
            report.pruned = self.registry.prune(is_live);
        }

        for entry in self.registry.entries_mut() {
            if !entry.can_tick(is_live) {
                log::trace!("skipping UI context '{}': session ended", entry.name());
                report.skipped += 1;
                continue;
            }
            match entry.proxy_mut().tick(delta_seconds) {
                Ok(()) => report.ticked += 1,
                Err(e) => {
                    log::error!("UI context '{}' failed to tick: {e:#}", entry.name());
                    report.failed.push(entry.id().clone());
                }
            }
        }

        report
    }

    /// A world started ticking: its context becomes current.
    ///
    /// Returns the resolved surface, or `None` for ticks without a world, for
    /// preview worlds and for time-only ticks.
    pub fn on_world_tick_start(&mut self, tick: &WorldTick<'_>) -> Result<Option<SurfaceId>, ContextError> {
        if tick.kind == TickKind::TimeOnly {
            return Ok(None);
        }
        let Some((id, proxy)) = self.resolve_world(tick.surface)? else {
            return Ok(None);
        };
        proxy.begin_world_tick();
        Ok(Some(id))
    }

    /// Actors of a world finished ticking: its context draws debug output.
    pub fn on_world_post_actor_tick(
        &mut self,
        tick: &WorldTick<'_>,
    ) -> Result<Option<SurfaceId>, ContextError> {
        if tick.kind == TickKind::TimeOnly {
            return Ok(None);
        }
        let Some((id, proxy)) = self.resolve_world(tick.surface)? else {
            return Ok(None);
        };
        proxy.draw_debug();
        Ok(Some(id))
    }

    fn resolve_world(
        &mut self,
        surface: Option<&dyn HostSurface>,
    ) -> Result<Option<(SurfaceId, &mut F::Proxy)>, ContextError> {
        match surface {
            Some(surface) => self.world_context_proxy(surface),
            None => Ok(None),
        }
    }

    // ── DPI + font atlas ──────────────────────────────────────────────────

    /// Applies a new DPI scale. Returns `Ok(true)` if the atlas was rebuilt.
    ///
    /// On rebuild every existing context is rebound to the new atlas before
    /// the font-atlas-built listeners fire.
    pub fn set_dpi_scale(&mut self, scale: f32) -> Result<bool, AtlasBuildError> {
        let registry = &mut self.registry;
        let font = &mut self.font;
        self.atlas.set_dpi_scale(scale, |binding| {
            registry.rebind_all(binding);
            *font = binding.clone();
        })
    }

    /// Rebuilds the atlas at the current scale, e.g. after adding fonts
    /// through [`atlas_builder_mut`](Self::atlas_builder_mut).
    pub fn rebuild_font_atlas(&mut self) -> Result<bool, AtlasBuildError> {
        let registry = &mut self.registry;
        let font = &mut self.font;
        self.atlas.rebuild(|binding| {
            registry.rebind_all(binding);
            *font = binding.clone();
        })
    }

    /// The atlas new contexts are created with.
    #[inline]
    pub fn font_atlas(&self) -> &FontBinding {
        &self.font
    }

    pub fn atlas_controller(&self) -> &FontAtlasController<B> {
        &self.atlas
    }

    pub fn atlas_builder_mut(&mut self) -> &mut B {
        self.atlas.builder_mut()
    }

    pub fn on_font_atlas_built(&mut self, listener: impl FnMut(&FontBinding) + 'static) -> ListenerId {
        self.atlas.on_font_atlas_built(listener)
    }

    pub fn remove_font_atlas_listener(&mut self, id: ListenerId) -> bool {
        self.atlas.remove_listener(id)
    }

    // ── contexts ──────────────────────────────────────────────────────────

    /// Context for `id`, creating it if unseen.
    pub fn get_or_create_context_proxy(&mut self, id: &SurfaceId) -> Result<&mut F::Proxy, ContextError> {
        self.registry.get_or_create(id, &self.font)
    }

    /// Context for `id` without creating keyed contexts.
    ///
    /// The host's special surface (editor or standalone game, per
    /// [`HostFlavor`](crate::HostFlavor)) is always available and is created
    /// here on first use.
    pub fn context_proxy(&mut self, id: &SurfaceId) -> Option<&mut F::Proxy> {
        if *id == self.config.flavor.special_surface() {
            return match self.registry.get_or_create(id, &self.font) {
                Ok(proxy) => Some(proxy),
                Err(e) => {
                    log::error!("{e}");
                    None
                }
            };
        }
        self.registry.lookup(id)
    }

    /// The always-available special context (editor, or standalone game).
    pub fn special_context_proxy(&mut self) -> Result<&mut F::Proxy, ContextError> {
        let id = self.config.flavor.special_surface();
        self.registry.get_or_create(&id, &self.font)
    }

    /// Context for a host world plus the identifier it resolved to, so the
    /// caller can route later input to it. `None` for preview worlds.
    pub fn world_context_proxy(
        &mut self,
        surface: &dyn HostSurface,
    ) -> Result<Option<(SurfaceId, &mut F::Proxy)>, ContextError> {
        let Some(id) = resolve_surface(surface, self.config.flavor) else {
            return Ok(None);
        };
        let proxy = self.registry.get_or_create(&id, &self.font)?;
        Ok(Some((id, proxy)))
    }

    /// Host reports that a surface is gone for good. Destroys its context.
    pub fn on_surface_destroyed(&mut self, surface: &dyn HostSurface) -> bool {
        resolve_surface(surface, self.config.flavor).is_some_and(|id| self.registry.remove(&id))
    }

    /// Host reports that a play session ended. Destroys its context.
    pub fn on_session_ended(&mut self, session: SessionInstance) -> bool {
        self.registry.remove(&SurfaceId::Session(session))
    }

    pub fn remove_context(&mut self, id: &SurfaceId) -> bool {
        self.registry.remove(id)
    }

    pub fn on_proxy_created(
        &mut self,
        listener: impl FnMut(&SurfaceId, &mut F::Proxy) + 'static,
    ) -> ListenerId {
        self.registry.on_proxy_created(listener)
    }

    pub fn remove_proxy_created_listener(&mut self, id: ListenerId) -> bool {
        self.registry.remove_listener(id)
    }

    pub fn registry(&self) -> &ContextRegistry<F> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ContextRegistry<F> {
        &mut self.registry
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }
}

impl<F: ProxyFactory, B: AtlasBuilder> Drop for ContextManager<F, B> {
    fn drop(&mut self) {
        log::debug!(
            "shutting down UI context manager: {} contexts, {} retired atlases",
            self.registry.len(),
            self.atlas.pending_release()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashSet;
    use std::rc::Rc;
    use std::sync::Arc;

    use crate::proxy::ProxyParams;
    use crate::settings::{HostFlavor, StaticSettings};
    use crate::surface::SurfaceRole;
    use crate::text::FontAtlas;

    #[derive(Default)]
    struct Calls {
        ticks: usize,
        begins: usize,
        debug_draws: usize,
    }

    struct TestProxy {
        calls: Rc<RefCell<Calls>>,
        fail: bool,
    }

    impl ContextProxy for TestProxy {
        fn tick(&mut self, _delta_seconds: f32) -> anyhow::Result<()> {
            self.calls.borrow_mut().ticks += 1;
            if self.fail {
                anyhow::bail!("widget panic");
            }
            Ok(())
        }

        fn rebind_font_atlas(&mut self, _font: &FontBinding) {}

        fn begin_world_tick(&mut self) {
            self.calls.borrow_mut().begins += 1;
        }

        fn draw_debug(&mut self) {
            self.calls.borrow_mut().debug_draws += 1;
        }
    }

    type Builder = fn(f32) -> Result<FontAtlas, AtlasBuildError>;

    fn atlas(scale: f32) -> Result<FontAtlas, AtlasBuildError> {
        Ok(FontAtlas::new(4, 4, scale))
    }

    struct Fixture {
        calls: Rc<RefCell<Calls>>,
        failing: Rc<RefCell<HashSet<SurfaceId>>>,
    }

    fn manager(config: ManagerConfig) -> (ContextManager<impl ProxyFactory<Proxy = TestProxy>, Builder>, Fixture) {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let failing = Rc::new(RefCell::new(HashSet::new()));
        let (c, f) = (Rc::clone(&calls), Rc::clone(&failing));
        let factory = move |params: ProxyParams<'_>| -> anyhow::Result<TestProxy> {
            Ok(TestProxy { calls: Rc::clone(&c), fail: f.borrow().contains(params.id) })
        };
        let settings = StaticSettings::with_scale(1.0);
        let mgr = ContextManager::new(config, factory, atlas as Builder, &settings).unwrap();
        (mgr, Fixture { calls, failing })
    }

    fn all_live(_: SessionInstance) -> bool {
        true
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn new_builds_initial_atlas() {
        let (mgr, _) = manager(ManagerConfig::default());
        assert_eq!(mgr.font_atlas().dpi_scale, 1.0);
        assert_eq!(mgr.atlas_controller().pending_release(), 0);
        assert!(mgr.registry().is_empty());
    }

    #[test]
    fn new_fails_without_atlas() {
        let factory = |_: ProxyParams<'_>| -> anyhow::Result<TestProxy> { anyhow::bail!("unused") };
        let builder = |_: f32| Err::<FontAtlas, _>(AtlasBuildError::Builder("no memory".into()));
        let result = ContextManager::new(ManagerConfig::default(), factory, builder, &StaticSettings::default());
        assert!(matches!(result, Err(ContextError::FontAtlas(_))));
    }

    // ── tick ──────────────────────────────────────────────────────────────

    #[test]
    fn failing_context_does_not_stop_siblings() {
        let (mut mgr, fx) = manager(ManagerConfig::default());
        fx.failing.borrow_mut().insert(SurfaceId::named("bad"));
        for id in [SurfaceId::named("a"), SurfaceId::named("bad"), SurfaceId::named("c")] {
            mgr.get_or_create_context_proxy(&id).unwrap();
        }

        let report = mgr.tick(&all_live, &StaticSettings::with_scale(1.0), 0.016);

        assert_eq!(fx.calls.borrow().ticks, 3);
        assert_eq!(report.ticked, 2);
        assert_eq!(report.failed, vec![SurfaceId::named("bad")]);
    }

    #[test]
    fn ended_session_is_skipped_but_kept() {
        let (mut mgr, fx) = manager(ManagerConfig::default());
        mgr.get_or_create_context_proxy(&SurfaceId::session(3)).unwrap();
        let live: HashSet<SessionInstance> = HashSet::new();
        let host = |s: SessionInstance| live.contains(&s);

        let report = mgr.tick(&host, &StaticSettings::with_scale(1.0), 0.016);

        assert_eq!(report.skipped, 1);
        assert_eq!(fx.calls.borrow().ticks, 0);
        assert!(mgr.context_proxy(&SurfaceId::session(3)).is_some());
    }

    #[test]
    fn prune_option_removes_ended_sessions() {
        let (mut mgr, _) = manager(ManagerConfig::default().with_prune_ended_sessions(true));
        mgr.get_or_create_context_proxy(&SurfaceId::session(1)).unwrap();
        mgr.get_or_create_context_proxy(&SurfaceId::session(2)).unwrap();

        let report = mgr.tick(&|s: SessionInstance| s == SessionInstance(2), &StaticSettings::with_scale(1.0), 0.016);

        assert_eq!(report.pruned, 1);
        assert_eq!(report.ticked, 1);
        assert!(!mgr.registry().contains(&SurfaceId::session(1)));
    }

    #[test]
    fn tick_applies_settings_scale() {
        let (mut mgr, _) = manager(ManagerConfig::default());
        let mut settings = StaticSettings::with_scale(1.0);

        assert!(!mgr.tick(&all_live, &settings, 0.016).rebuilt);
        settings.set_scale(2.0);
        let report = mgr.tick(&all_live, &settings, 0.016);

        assert!(report.rebuilt);
        assert_eq!(report.frame, 1);
        assert_eq!(mgr.font_atlas().dpi_scale, 2.0);
    }

    #[test]
    fn failed_rebuild_is_retried_next_frame() {
        let fail = Rc::new(Cell::new(true));
        let f = Rc::clone(&fail);
        let builder = move |scale: f32| {
            if f.get() && scale > 1.0 {
                Err(AtlasBuildError::AtlasFull { width: 4, height: 4 })
            } else {
                Ok(FontAtlas::new(4, 4, scale))
            }
        };
        let factory = |_: ProxyParams<'_>| -> anyhow::Result<TestProxy> {
            Ok(TestProxy { calls: Rc::default(), fail: false })
        };
        let mut mgr =
            ContextManager::new(ManagerConfig::default(), factory, builder, &StaticSettings::with_scale(1.0))
                .unwrap();
        let first = mgr.font_atlas().atlas.id();
        let settings = StaticSettings::with_scale(2.0);

        let report = mgr.tick(&all_live, &settings, 0.016);
        assert!(report.rebuild_failed);
        assert_eq!(mgr.font_atlas().atlas.id(), first);

        fail.set(false);
        let report = mgr.tick(&all_live, &settings, 0.016);
        assert!(report.rebuilt);
        assert_eq!(mgr.font_atlas().dpi_scale, 2.0);
    }

    // ── world ticks ───────────────────────────────────────────────────────

    #[test]
    fn world_tick_start_creates_and_begins() {
        let (mut mgr, fx) = manager(ManagerConfig::default());
        let world = SurfaceRole::Session(SessionInstance(1));
        let tick = WorldTick { surface: Some(&world), kind: TickKind::All, delta_seconds: 0.016 };

        assert_eq!(mgr.on_world_tick_start(&tick).unwrap(), Some(SurfaceId::session(1)));
        assert_eq!(mgr.on_world_post_actor_tick(&tick).unwrap(), Some(SurfaceId::session(1)));

        assert_eq!(fx.calls.borrow().begins, 1);
        assert_eq!(fx.calls.borrow().debug_draws, 1);
        assert_eq!(mgr.registry().len(), 1);
    }

    #[test]
    fn world_tick_without_world_or_preview_is_ignored() {
        let (mut mgr, fx) = manager(ManagerConfig::default());
        let none = WorldTick { surface: None, kind: TickKind::All, delta_seconds: 0.016 };
        let preview = SurfaceRole::Preview;
        let preview_tick = WorldTick { surface: Some(&preview), ..none };

        assert_eq!(mgr.on_world_tick_start(&none).unwrap(), None);
        assert_eq!(mgr.on_world_tick_start(&preview_tick).unwrap(), None);
        assert_eq!(fx.calls.borrow().begins, 0);
        assert!(mgr.registry().is_empty());
    }

    #[test]
    fn time_only_tick_begins_nothing() {
        let (mut mgr, fx) = manager(ManagerConfig::default());
        let world = SurfaceRole::Editor;
        let tick = WorldTick { surface: Some(&world), kind: TickKind::TimeOnly, delta_seconds: 0.016 };

        assert_eq!(mgr.on_world_tick_start(&tick).unwrap(), None);
        assert_eq!(fx.calls.borrow().begins, 0);
    }

    // ── lookup ────────────────────────────────────────────────────────────

    #[test]
    fn special_surface_is_always_available() {
        let (mut mgr, _) = manager(ManagerConfig::default().with_flavor(HostFlavor::Editor));
        assert!(mgr.context_proxy(&SurfaceId::Editor).is_some());
        assert!(mgr.context_proxy(&SurfaceId::Standalone).is_none());
        assert!(mgr.context_proxy(&SurfaceId::named("unknown")).is_none());
        assert_eq!(mgr.registry().len(), 1);
    }

    #[test]
    fn standalone_flavor_routes_editor_role_to_game() {
        let (mut mgr, _) = manager(ManagerConfig::default().with_flavor(HostFlavor::Standalone));
        let (id, _) = mgr.world_context_proxy(&SurfaceRole::Editor).unwrap().unwrap();
        assert_eq!(id, SurfaceId::Standalone);
        assert!(mgr.special_context_proxy().is_ok());
        assert_eq!(mgr.registry().len(), 1);
    }

    #[test]
    fn session_end_destroys_context() {
        let (mut mgr, _) = manager(ManagerConfig::default());
        mgr.get_or_create_context_proxy(&SurfaceId::session(5)).unwrap();
        assert!(mgr.on_session_ended(SessionInstance(5)));
        assert!(!mgr.on_session_ended(SessionInstance(5)));
        assert!(mgr.registry().is_empty());
    }

    #[test]
    fn destroyed_world_surface_is_removed() {
        let (mut mgr, _) = manager(ManagerConfig::default());
        let world = SurfaceRole::World(Arc::from("minimap"));
        mgr.world_context_proxy(&world).unwrap();
        assert!(mgr.on_surface_destroyed(&world));
        assert!(!mgr.on_surface_destroyed(&SurfaceRole::Preview));
        assert!(mgr.registry().is_empty());
    }
}
