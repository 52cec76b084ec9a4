use std::sync::Arc;

use crate::error::AtlasBuildError;
use crate::event::{ListenerId, Multicast};
use crate::quarantine::Quarantine;

use super::{AtlasBuilder, FontAtlas, FontBinding};

/// Scale reported before any atlas has been built. Below every legal scale.
pub const UNSET_SCALE: f32 = -1.0;

/// Observable state of the shared atlas.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum AtlasStatus {
    /// No atlas has been built yet.
    Unbuilt,
    /// The current atlas matches the applied scale.
    Stable { scale: f32 },
    /// The last rebuild failed. The atlas for `applied` (if any) is still
    /// served and the rebuild is retried on the next scale check.
    RebuildPending { applied: Option<f32>, requested: f32 },
}

type AtlasBuiltListener = dyn FnMut(&FontBinding);

/// Owns the shared font atlas and its rebuild/release lifecycle.
///
/// A rebuild happens synchronously inside [`set_dpi_scale`](Self::set_dpi_scale).
/// The replaced atlas is retired into a quarantine and dropped by
/// [`tick_release_queue`](Self::tick_release_queue) once `release_delay`
/// frames have passed.
pub struct FontAtlasController<B> {
    builder: B,
    current: Option<FontBinding>,
    applied_scale: f32,
    failed_scale: Option<f32>,
    retired: Quarantine<Arc<FontAtlas>>,
    frame: u64,
    rebuilds: u64,
    on_built: Multicast<AtlasBuiltListener>,
}

impl<B: AtlasBuilder> FontAtlasController<B> {
    pub fn new(builder: B, release_delay: u32) -> Self {
        Self {
            builder,
            current: None,
            applied_scale: UNSET_SCALE,
            failed_scale: None,
            retired: Quarantine::new(release_delay),
            frame: 0,
            rebuilds: 0,
            on_built: Multicast::new(),
        }
    }

    /// Applies a DPI scale, rebuilding the atlas if it differs from the applied one.
    ///
    /// On rebuild: the new atlas is built first, the old one is retired, every
    /// context is rebound through `rebind`, listeners are notified, and only
    /// then is the scale recorded as applied. Returns `Ok(false)` when the
    /// scale is unchanged.
    ///
    /// On failure nothing changes: the previous atlas keeps being served and
    /// the same scale will be attempted again on the next call.
    pub fn set_dpi_scale(
        &mut self,
        scale: f32,
        rebind: impl FnOnce(&FontBinding),
    ) -> Result<bool, AtlasBuildError> {
        if scale == self.applied_scale {
            // Back on the served scale: any earlier failure is moot.
            self.failed_scale = None;
            return Ok(false);
        }
        self.rebuild_at(scale, rebind).map(|()| true)
    }

    /// Rebuilds at the applied scale, e.g. after fonts were added.
    ///
    /// Before the first build there is nothing to rebuild and this is a no-op.
    pub fn rebuild(&mut self, rebind: impl FnOnce(&FontBinding)) -> Result<bool, AtlasBuildError> {
        match self.applied_scale() {
            Some(scale) => self.rebuild_at(scale, rebind).map(|()| true),
            None => Ok(false),
        }
    }

    fn rebuild_at(
        &mut self,
        scale: f32,
        rebind: impl FnOnce(&FontBinding),
    ) -> Result<(), AtlasBuildError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(self.note_failure(scale, AtlasBuildError::InvalidScale(scale)));
        }

        let atlas = match self.builder.build(scale) {
            Ok(atlas) => Arc::new(atlas),
            Err(e) => return Err(self.note_failure(scale, e)),
        };

        let binding = FontBinding::new(atlas, scale);
        if let Some(old) = self.current.replace(binding.clone()) {
            log::debug!(
                "retiring font atlas {:?} on frame {} for {} frames",
                old.atlas.id(),
                self.frame,
                self.retired.delay()
            );
            self.retired.retire(old.atlas, self.frame);
        }

        rebind(&binding);
        self.on_built.broadcast(|listener| listener(&binding));

        log::info!(
            "font atlas {:?} built for scale {scale} (was {}), {} glyphs",
            binding.atlas.id(),
            self.applied_scale,
            binding.atlas.glyph_count()
        );
        self.applied_scale = scale;
        self.failed_scale = None;
        self.rebuilds += 1;
        Ok(())
    }

    fn note_failure(&mut self, scale: f32, e: AtlasBuildError) -> AtlasBuildError {
        // Retries happen every frame; only report a new failing scale.
        // Compared bitwise so a NaN scale counts as repeating itself.
        if self.failed_scale.map(f32::to_bits) != Some(scale.to_bits()) {
            log::warn!("font atlas rebuild for scale {scale} failed, keeping previous atlas: {e}");
        }
        self.failed_scale = Some(scale);
        e
    }

    /// Ends the current frame: releases retired atlases whose delay elapsed.
    ///
    /// Call exactly once per frame. Returns the number of atlases released.
    pub fn tick_release_queue(&mut self) -> usize {
        let released = self.retired.release_expired(self.frame);
        if released > 0 {
            log::debug!("released {released} retired font atlas(es) on frame {}", self.frame);
        }
        self.frame += 1;
        released
    }

    /// Current atlas binding, `None` until the first successful build.
    #[inline]
    pub fn current(&self) -> Option<&FontBinding> {
        self.current.as_ref()
    }

    /// Scale of the current atlas, `None` until the first successful build.
    pub fn applied_scale(&self) -> Option<f32> {
        (self.applied_scale != UNSET_SCALE).then_some(self.applied_scale)
    }

    pub fn status(&self) -> AtlasStatus {
        match (self.applied_scale(), self.failed_scale) {
            (applied, Some(requested)) => AtlasStatus::RebuildPending { applied, requested },
            (Some(scale), None) => AtlasStatus::Stable { scale },
            (None, None) => AtlasStatus::Unbuilt,
        }
    }

    /// Frames completed so far (number of `tick_release_queue` calls).
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Successful builds so far, including the first.
    #[inline]
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Retired atlases still waiting for release.
    pub fn pending_release(&self) -> usize {
        self.retired.len()
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut B {
        &mut self.builder
    }

    /// Registers a listener fired after each successful build, before the new
    /// atlas is used to render a frame (e.g. to re-upload the glyph texture).
    pub fn on_font_atlas_built(&mut self, listener: impl FnMut(&FontBinding) + 'static) -> ListenerId {
        self.on_built.add(Box::new(listener))
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.on_built.remove(id)
    }
}
