//! Marduk immediate-mode UI context crate.
//!
//! Keeps one isolated UI context per host surface (editor pane, game world,
//! play session) while every context shares a single font atlas. The atlas is
//! rebuilt when the DPI scale changes and superseded atlases are held in a
//! quarantine until no in-flight frame can still reference them.
//!
//! The UI library itself is a collaborator: see [`proxy::ContextProxy`].

pub mod error;
pub mod event;
pub mod logging;
pub mod proxy;
pub mod quarantine;
pub mod registry;
pub mod settings;
pub mod surface;
pub mod text;
pub mod time;

mod driver;

pub use driver::{ContextManager, Host, TickKind, TickReport, WorldTick};
pub use error::{AtlasBuildError, ContextError, FontLoadError};
pub use proxy::{ContextProxy, ProxyFactory, ProxyParams};
pub use registry::{ContextEntry, ContextRegistry};
pub use settings::{ContextNaming, DpiScaleInfo, HostFlavor, ManagerConfig, Settings, StaticSettings};
pub use surface::{HostSurface, SessionInstance, SurfaceId, SurfaceRole};
pub use text::{FontAtlas, FontAtlasController, FontBinding};
