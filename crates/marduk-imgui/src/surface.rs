//! Surface identity.
//!
//! A surface is anything that needs its own UI state: the editor, the
//! standalone game world, one play session, or an arbitrary named world.
//! Hosts describe their surfaces through [`HostSurface`] and the registry keys
//! contexts by the resolved [`SurfaceId`].

use std::fmt;
use std::sync::Arc;

use crate::settings::HostFlavor;

/// Host-assigned play-session number.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SessionInstance(pub u32);

impl fmt::Display for SessionInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of one UI surface.
///
/// `Editor` and `Standalone` are reserved: they always resolve to the
/// registry's dedicated slots, never to the keyed map.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum SurfaceId {
    Editor,
    Standalone,
    Session(SessionInstance),
    Named(Arc<str>),
}

impl SurfaceId {
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Self::Named(name.into())
    }

    pub fn session(instance: u32) -> Self {
        Self::Session(SessionInstance(instance))
    }

    #[inline]
    pub fn is_reserved(&self) -> bool {
        matches!(self, Self::Editor | Self::Standalone)
    }

    /// The play session this surface belongs to, if any.
    #[inline]
    pub fn session_instance(&self) -> Option<SessionInstance> {
        match self {
            Self::Session(instance) => Some(*instance),
            _ => None,
        }
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Editor => f.write_str("editor"),
            Self::Standalone => f.write_str("game"),
            Self::Session(instance) => write!(f, "session-{instance}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// What kind of surface a host object is.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SurfaceRole {
    /// The editor's own world.
    Editor,
    /// The game world of a standalone (non-editor) run.
    Standalone,
    /// A world owned by a play session started from the editor.
    Session(SessionInstance),
    /// Any other world the host wants a context for, keyed by a stable name.
    World(Arc<str>),
    /// Preview or thumbnail worlds. These never receive a context.
    Preview,
}

/// Host-side handle that can be resolved to a [`SurfaceId`].
///
/// `role` must be deterministic: the same logical surface reports the same
/// role on every call.
pub trait HostSurface {
    fn role(&self) -> SurfaceRole;
}

impl HostSurface for SurfaceRole {
    fn role(&self) -> SurfaceRole {
        self.clone()
    }
}

/// Maps a host surface to its identifier.
///
/// Returns `None` for preview surfaces. In standalone builds there is no
/// editor, so an editor-role surface falls back to the standalone slot.
pub fn resolve_surface(surface: &dyn HostSurface, flavor: HostFlavor) -> Option<SurfaceId> {
    match surface.role() {
        SurfaceRole::Editor => Some(match flavor {
            HostFlavor::Editor => SurfaceId::Editor,
            HostFlavor::Standalone => SurfaceId::Standalone,
        }),
        SurfaceRole::Standalone => Some(SurfaceId::Standalone),
        SurfaceRole::Session(instance) => Some(SurfaceId::Session(instance)),
        SurfaceRole::World(name) => Some(SurfaceId::Named(name)),
        SurfaceRole::Preview => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_ids() {
        assert!(SurfaceId::Editor.is_reserved());
        assert!(SurfaceId::Standalone.is_reserved());
        assert!(!SurfaceId::session(1).is_reserved());
        assert!(!SurfaceId::named("viewport").is_reserved());
    }

    #[test]
    fn session_instance_only_for_sessions() {
        assert_eq!(SurfaceId::session(3).session_instance(), Some(SessionInstance(3)));
        assert_eq!(SurfaceId::Editor.session_instance(), None);
        assert_eq!(SurfaceId::named("a").session_instance(), None);
    }

    #[test]
    fn named_ids_compare_by_content() {
        assert_eq!(SurfaceId::named("world"), SurfaceId::named(String::from("world")));
        assert_ne!(SurfaceId::named("a"), SurfaceId::named("b"));
    }

    #[test]
    fn resolution_is_deterministic() {
        let role = SurfaceRole::Session(SessionInstance(2));
        let a = resolve_surface(&role, HostFlavor::Editor);
        let b = resolve_surface(&role, HostFlavor::Editor);
        assert_eq!(a, b);
        assert_eq!(a, Some(SurfaceId::session(2)));
    }

    #[test]
    fn editor_role_depends_on_flavor() {
        assert_eq!(resolve_surface(&SurfaceRole::Editor, HostFlavor::Editor), Some(SurfaceId::Editor));
        assert_eq!(
            resolve_surface(&SurfaceRole::Editor, HostFlavor::Standalone),
            Some(SurfaceId::Standalone)
        );
    }

    #[test]
    fn preview_has_no_surface() {
        assert_eq!(resolve_surface(&SurfaceRole::Preview, HostFlavor::Editor), None);
    }

    #[test]
    fn display_names() {
        assert_eq!(SurfaceId::session(4).to_string(), "session-4");
        assert_eq!(SurfaceId::named("ui").to_string(), "ui");
    }
}
