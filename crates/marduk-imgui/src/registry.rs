//! Per-surface context registry.
//!
//! Contexts are created lazily on first lookup and owned by the registry until
//! removed. The two reserved surfaces (editor, standalone game) live in their
//! own slots; every other surface lives in a map keyed by [`SurfaceId`].

use std::collections::hash_map::{self, HashMap};

use crate::error::ContextError;
use crate::event::{ListenerId, Multicast};
use crate::proxy::{ContextProxy, ProxyFactory, ProxyParams};
use crate::settings::ContextNaming;
use crate::surface::{SessionInstance, SurfaceId};
use crate::text::FontBinding;

/// One registered surface.
pub struct ContextEntry<P> {
    id: SurfaceId,
    name: String,
    session: Option<SessionInstance>,
    proxy: P,
}

impl<P> ContextEntry<P> {
    #[inline]
    pub fn id(&self) -> &SurfaceId {
        &self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Play session this context is tied to; `None` means always tickable.
    #[inline]
    pub fn session(&self) -> Option<SessionInstance> {
        self.session
    }

    #[inline]
    pub fn proxy(&self) -> &P {
        &self.proxy
    }

    #[inline]
    pub fn proxy_mut(&mut self) -> &mut P {
        &mut self.proxy
    }

    /// Whether the context should tick, given which sessions are still live.
    pub fn can_tick(&self, is_session_live: impl Fn(SessionInstance) -> bool) -> bool {
        self.session.is_none_or(is_session_live)
    }
}

type ProxyCreatedListener<P> = dyn FnMut(&SurfaceId, &mut P);

/// Registry of UI contexts, one per surface.
///
/// Not thread-safe by design: all calls happen on the thread that delivers
/// frame ticks.
pub struct ContextRegistry<F: ProxyFactory> {
    factory: F,
    naming: ContextNaming,
    editor: Option<ContextEntry<F::Proxy>>,
    standalone: Option<ContextEntry<F::Proxy>>,
    contexts: HashMap<SurfaceId, ContextEntry<F::Proxy>>,
    on_created: Multicast<ProxyCreatedListener<F::Proxy>>,
}

impl<F: ProxyFactory> ContextRegistry<F> {
    pub fn new(factory: F, naming: ContextNaming) -> Self {
        Self {
            factory,
            naming,
            editor: None,
            standalone: None,
            contexts: HashMap::new(),
            on_created: Multicast::new(),
        }
    }

    // ── lookup ────────────────────────────────────────────────────────────

    /// Returns the context for `id`, creating it bound to `font` if unseen.
    ///
    /// If the factory fails nothing is inserted and the error is returned;
    /// calling again on a later frame retries.
    pub fn get_or_create(
        &mut self,
        id: &SurfaceId,
        font: &FontBinding,
    ) -> Result<&mut F::Proxy, ContextError> {
        self.entry_or_create(id, font).map(ContextEntry::proxy_mut)
    }

    /// Like [`get_or_create`](Self::get_or_create) but returns the whole entry.
    pub fn entry_or_create(
        &mut self,
        id: &SurfaceId,
        font: &FontBinding,
    ) -> Result<&mut ContextEntry<F::Proxy>, ContextError> {
        let slot = match id {
            SurfaceId::Editor => &mut self.editor,
            SurfaceId::Standalone => &mut self.standalone,
            _ => {
                return match self.contexts.entry(id.clone()) {
                    hash_map::Entry::Occupied(e) => Ok(e.into_mut()),
                    hash_map::Entry::Vacant(v) => {
                        let entry = create_entry(&mut self.factory, &self.naming, id, font)?;
                        let entry = v.insert(entry);
                        announce(&mut self.on_created, entry);
                        Ok(entry)
                    }
                };
            }
        };

        let (entry, created) = match slot.take() {
            Some(entry) => (entry, false),
            None => (create_entry(&mut self.factory, &self.naming, id, font)?, true),
        };
        let entry = slot.insert(entry);
        if created {
            announce(&mut self.on_created, entry);
        }
        Ok(entry)
    }

    /// Returns the context for `id` without creating it.
    ///
    /// Reserved ids always route to their slot, never to the keyed map.
    pub fn lookup(&mut self, id: &SurfaceId) -> Option<&mut F::Proxy> {
        self.entry_mut(id).map(ContextEntry::proxy_mut)
    }

    pub fn entry(&self, id: &SurfaceId) -> Option<&ContextEntry<F::Proxy>> {
        match id {
            SurfaceId::Editor => self.editor.as_ref(),
            SurfaceId::Standalone => self.standalone.as_ref(),
            _ => self.contexts.get(id),
        }
    }

    pub fn entry_mut(&mut self, id: &SurfaceId) -> Option<&mut ContextEntry<F::Proxy>> {
        match id {
            SurfaceId::Editor => self.editor.as_mut(),
            SurfaceId::Standalone => self.standalone.as_mut(),
            _ => self.contexts.get_mut(id),
        }
    }

    pub fn contains(&self, id: &SurfaceId) -> bool {
        self.entry(id).is_some()
    }

    /// Number of live contexts, reserved slots included.
    pub fn len(&self) -> usize {
        self.contexts.len() + usize::from(self.editor.is_some()) + usize::from(self.standalone.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries: reserved slots first, then keyed entries in map order.
    pub fn entries(&self) -> impl Iterator<Item = &ContextEntry<F::Proxy>> {
        self.editor.iter().chain(self.standalone.iter()).chain(self.contexts.values())
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut ContextEntry<F::Proxy>> {
        self.editor
            .iter_mut()
            .chain(self.standalone.iter_mut())
            .chain(self.contexts.values_mut())
    }

    // ── removal ───────────────────────────────────────────────────────────

    /// Destroys the context for `id`. Returns `false` if there was none.
    pub fn remove(&mut self, id: &SurfaceId) -> bool {
        let removed = match id {
            SurfaceId::Editor => self.editor.take(),
            SurfaceId::Standalone => self.standalone.take(),
            _ => self.contexts.remove(id),
        };
        match removed {
            Some(entry) => {
                log::info!("destroyed UI context '{}' ({})", entry.name, entry.id);
                true
            }
            None => false,
        }
    }

    /// Destroys every context tied to a session that is no longer live.
    /// Returns how many were removed.
    pub fn prune(&mut self, is_session_live: impl Fn(SessionInstance) -> bool) -> usize {
        let before = self.contexts.len();
        self.contexts.retain(|_, entry| {
            let keep = entry.can_tick(&is_session_live);
            if !keep {
                log::info!("pruned UI context '{}' of ended session", entry.name);
            }
            keep
        });
        before - self.contexts.len()
    }

    // ── font ──────────────────────────────────────────────────────────────

    /// Points every existing context at a rebuilt atlas.
    pub fn rebind_all(&mut self, font: &FontBinding) {
        for entry in self.entries_mut() {
            entry.proxy.rebind_font_atlas(font);
        }
    }

    // ── events ────────────────────────────────────────────────────────────

    /// Registers a listener fired once for every newly created context.
    ///
    /// Listeners run in registration order, after the entry is inserted.
    pub fn on_proxy_created(
        &mut self,
        listener: impl FnMut(&SurfaceId, &mut F::Proxy) + 'static,
    ) -> ListenerId {
        self.on_created.add(Box::new(listener))
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.on_created.remove(id)
    }

    pub fn naming(&self) -> &ContextNaming {
        &self.naming
    }

    pub fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }
}

fn create_entry<F: ProxyFactory>(
    factory: &mut F,
    naming: &ContextNaming,
    id: &SurfaceId,
    font: &FontBinding,
) -> Result<ContextEntry<F::Proxy>, ContextError> {
    let name = naming.display_name(id);
    let proxy = factory
        .create(ProxyParams { name: &name, id, font })
        .map_err(|source| ContextError::ProxyCreation { surface: id.clone(), source })?;

    log::info!("created UI context '{name}' for surface {id}");
    Ok(ContextEntry { id: id.clone(), name, session: id.session_instance(), proxy })
}

fn announce<P>(listeners: &mut Multicast<ProxyCreatedListener<P>>, entry: &mut ContextEntry<P>) {
    let ContextEntry { id, proxy, .. } = entry;
    listeners.broadcast(|listener| listener(id, proxy));
}
