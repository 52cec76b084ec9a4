//! Scripted host session.
//!
//! Simulates an editor with two play sessions, a DPI change and a session
//! ending, and logs what the context manager does each frame. Pass a font
//! path as the first argument to rasterize a real atlas; otherwise a system
//! font is looked up.

use std::cell::RefCell;
use std::collections::HashSet;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use marduk_imgui::logging::{init_logging, LoggingConfig};
use marduk_imgui::text::{AtlasBuilder, FontAtlasConfig, FontLibrary, GlyphAtlasBuilder};
use marduk_imgui::time::FrameClock;
use marduk_imgui::{
    ContextManager, ContextProxy, FontBinding, HostFlavor, ManagerConfig, ProxyFactory, ProxyParams,
    SessionInstance, StaticSettings, SurfaceRole, TickKind, WorldTick,
};

const FRAMES: u64 = 14;
const DPI_CHANGE_FRAME: u64 = 6;
const SESSION_TWO_START: u64 = 3;
const SESSION_TWO_END: u64 = 9;
const FAULTY_FRAME: u64 = 7;

/// Stand-in for a real immediate-mode UI context.
struct ConsoleProxy {
    name: String,
    font: FontBinding,
    frames: u64,
    debug_draws: u64,
    fail_on_frame: Option<u64>,
}

impl ContextProxy for ConsoleProxy {
    fn tick(&mut self, delta_seconds: f32) -> anyhow::Result<()> {
        let frame = self.frames;
        self.frames += 1;
        if self.fail_on_frame == Some(frame) {
            anyhow::bail!("simulated widget failure on local frame {frame}");
        }
        log::debug!(
            "[{}] frame {frame}: dt={delta_seconds:.4}s atlas={:?} scale={}",
            self.name,
            self.font.atlas.id(),
            self.font.dpi_scale
        );
        Ok(())
    }

    fn rebind_font_atlas(&mut self, font: &FontBinding) {
        log::info!("[{}] rebound to atlas {:?} at scale {}", self.name, font.atlas.id(), font.dpi_scale);
        self.font = font.clone();
    }

    fn draw_debug(&mut self) {
        self.debug_draws += 1;
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let mut fonts = FontLibrary::new();
    match load_font()? {
        Some((name, bytes)) => {
            fonts.load_font(name.as_str(), &bytes).with_context(|| format!("loading {name}"))?;
        }
        None => log::warn!("no font found; atlases will be empty"),
    }
    let builder = GlyphAtlasBuilder::new(fonts, FontAtlasConfig::default());

    let factory = |params: ProxyParams<'_>| -> anyhow::Result<ConsoleProxy> {
        Ok(ConsoleProxy {
            name: params.name.to_string(),
            font: params.font.clone(),
            frames: 0,
            debug_draws: 0,
            fail_on_frame: (params.id.session_instance() == Some(SessionInstance(1)))
                .then_some(FAULTY_FRAME),
        })
    };

    let mut settings = StaticSettings::with_scale(1.0);
    let config = ManagerConfig::default().with_flavor(HostFlavor::Editor);
    let mut manager = ContextManager::new(config, factory, builder, &settings)
        .context("failed to start UI context manager")?;

    manager.on_proxy_created(|id, proxy| {
        log::info!("host: context '{}' ready for {id}", proxy.name);
    });
    manager.on_font_atlas_built(|font| {
        let (w, h) = font.atlas.size();
        log::info!("host: uploading {w}x{h} glyph texture for atlas {:?}", font.atlas.id());
    });

    let live = RefCell::new(HashSet::from([SessionInstance(1)]));
    let host = |s: SessionInstance| live.borrow().contains(&s);

    let editor = SurfaceRole::Editor;
    let session_one = SurfaceRole::Session(SessionInstance(1));
    let session_two = SurfaceRole::Session(SessionInstance(2));
    let preview = SurfaceRole::Preview;

    let start = Instant::now();
    let mut clock = FrameClock::starting_at(start);

    for frame in 0..FRAMES {
        let time = clock.tick_at(start + Duration::from_millis(16 * (frame + 1)));

        if frame == SESSION_TWO_START {
            live.borrow_mut().insert(SessionInstance(2));
        }
        if frame == SESSION_TWO_END {
            log::info!("host: session 2 ended");
            live.borrow_mut().remove(&SessionInstance(2));
        }
        if frame == SESSION_TWO_END + 1 {
            manager.on_session_ended(SessionInstance(2));
        }
        if frame == DPI_CHANGE_FRAME {
            log::info!("host: display moved to a 150% monitor");
            settings.set_scale(1.5);
        }

        let mut worlds: Vec<&SurfaceRole> = vec![&editor, &session_one];
        if live.borrow().contains(&SessionInstance(2)) {
            worlds.push(&session_two);
        }
        if frame % 4 == 0 {
            worlds.push(&preview);
        }

        tick_worlds(&mut manager, &worlds, time.dt);

        let report = manager.tick(&host, &settings, time.dt);
        log::info!(
            "frame {}: ticked={} skipped={} failed={:?} rebuilt={} released={}",
            report.frame,
            report.ticked,
            report.skipped,
            report.failed,
            report.rebuilt,
            report.released_atlases
        );
    }

    for entry in manager.registry().entries() {
        log::info!(
            "context '{}': {} frames, {} debug draws",
            entry.name(),
            entry.proxy().frames,
            entry.proxy().debug_draws
        );
    }
    Ok(())
}

/// Runs the per-world hooks for one frame. Returns how many worlds began a UI frame.
///
/// A surface whose context cannot be created is skipped and retried next frame.
fn tick_worlds<F: ProxyFactory, B: AtlasBuilder>(
    manager: &mut ContextManager<F, B>,
    worlds: &[&SurfaceRole],
    delta_seconds: f32,
) -> usize {
    let mut begun = 0;
    for &world in worlds {
        let tick = WorldTick { surface: Some(world), kind: TickKind::All, delta_seconds };
        match manager.on_world_tick_start(&tick) {
            Ok(Some(_)) => begun += 1,
            Ok(None) => continue,
            Err(e) => {
                log::error!("{e}");
                continue;
            }
        }
        if let Err(e) = manager.on_world_post_actor_tick(&tick) {
            log::error!("{e}");
        }
    }
    begun
}

/// Font from the command line, or the first common system font found.
fn load_font() -> Result<Option<(String, Vec<u8>)>> {
    if let Some(path) = std::env::args().nth(1) {
        let bytes = std::fs::read(&path).with_context(|| format!("failed to read font {path}"))?;
        return Ok(Some((path, bytes)));
    }

    Ok([
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/noto/NotoSans-Regular.ttf",
        "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    ]
    .iter()
    .find_map(|p| std::fs::read(p).ok().map(|bytes| (p.to_string(), bytes))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    use marduk_imgui::text::FontAtlas;
    use marduk_imgui::{AtlasBuildError, SurfaceId};

    fn proxy(params: &ProxyParams<'_>) -> ConsoleProxy {
        ConsoleProxy {
            name: params.name.to_string(),
            font: params.font.clone(),
            frames: 0,
            debug_draws: 0,
            fail_on_frame: None,
        }
    }

    #[test]
    fn failed_context_creation_skips_only_that_world() {
        let refuse = Rc::new(Cell::new(true));
        let r = Rc::clone(&refuse);
        let factory = move |params: ProxyParams<'_>| -> anyhow::Result<ConsoleProxy> {
            if r.get() && *params.id == SurfaceId::session(2) {
                anyhow::bail!("out of UI memory");
            }
            Ok(proxy(&params))
        };
        let builder = |scale: f32| Ok::<_, AtlasBuildError>(FontAtlas::new(4, 4, scale));
        let mut manager =
            ContextManager::new(ManagerConfig::default(), factory, builder, &StaticSettings::default()).unwrap();
        let editor = SurfaceRole::Editor;
        let one = SurfaceRole::Session(SessionInstance(1));
        let two = SurfaceRole::Session(SessionInstance(2));
        let worlds = [&editor, &two, &one];

        assert_eq!(tick_worlds(&mut manager, &worlds, 0.016), 2);
        assert!(manager.registry().contains(&SurfaceId::session(1)));
        assert!(!manager.registry().contains(&SurfaceId::session(2)));

        refuse.set(false);
        assert_eq!(tick_worlds(&mut manager, &worlds, 0.016), 3);
        let entry = manager.registry().entry(&SurfaceId::session(2)).unwrap();
        assert_eq!(entry.proxy().debug_draws, 1);
    }
}
