//! Multicast notification lists.
//!
//! Listeners are boxed closures stored in registration order and fired in
//! that order. They are `'static` and only see the event payload, so a
//! listener cannot hold a borrow of the registry or controller that fires it.

/// Handle returned by [`Multicast::add`], used to unsubscribe.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ListenerId(u64);

/// Ordered list of listeners of type `F` (usually `dyn FnMut(..)`).
pub struct Multicast<F: ?Sized> {
    next_id: u64,
    listeners: Vec<(ListenerId, Box<F>)>,
}

impl<F: ?Sized> Multicast<F> {
    pub fn new() -> Self {
        Self { next_id: 0, listeners: Vec::new() }
    }

    /// Appends a listener. It fires after every listener added before it.
    pub fn add(&mut self, listener: Box<F>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Removes a listener. Returns `false` if `id` was not registered.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Invokes `call` once per listener, in registration order.
    pub fn broadcast(&mut self, mut call: impl FnMut(&mut F)) {
        for (_, listener) in &mut self.listeners {
            call(&mut **listener);
        }
    }
}

impl<F: ?Sized> Default for Multicast<F> {
    fn default() -> Self {
        Self::new()
    }
}
