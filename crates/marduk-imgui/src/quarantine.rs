//! Deferred release of superseded resources.
//!
//! A resource replaced on the tick thread may still be referenced by a render
//! stage running a few frames behind. Retired resources are parked here and
//! dropped only after a fixed number of frames have passed.

use std::collections::VecDeque;

struct Retired<T> {
    item: T,
    release_frame: u64,
}

/// FIFO of retired resources, each released `delay` frames after retirement.
///
/// Frames are supplied by the caller. An item retired on frame `F` is
/// released by the first [`release_expired`](Self::release_expired) call with
/// a frame `>= F + delay`; it is never released on frame `F` itself.
pub struct Quarantine<T> {
    delay: u32,
    entries: VecDeque<Retired<T>>,
}

impl<T> Quarantine<T> {
    /// `delay` is raised to 1 so retirement and release never share a frame.
    pub fn new(delay: u32) -> Self {
        Self { delay: delay.max(1), entries: VecDeque::new() }
    }

    #[inline]
    pub fn delay(&self) -> u32 {
        self.delay
    }

    /// Parks `item`, retired during `frame`.
    pub fn retire(&mut self, item: T, frame: u64) {
        let release_frame = frame.saturating_add(u64::from(self.delay));
        // Entries share one delay, so pushing keeps the queue sorted unless a
        // caller goes back in time.
        debug_assert!(self.entries.back().is_none_or(|e| e.release_frame <= release_frame));
        self.entries.push_back(Retired { item, release_frame });
    }

    /// Drops every item whose delay has elapsed at `frame`. Returns how many
    /// were released.
    pub fn release_expired(&mut self, frame: u64) -> usize {
        let mut released = 0;
        while self.entries.front().is_some_and(|e| e.release_frame <= frame) {
            self.entries.pop_front();
            released += 1;
        }
        released
    }

    /// Frames left before the oldest item is released, counted from `frame`.
    pub fn frames_until_next_release(&self, frame: u64) -> Option<u64> {
        self.entries.front().map(|e| e.release_frame.saturating_sub(frame))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.item)
    }

    /// Releases everything immediately. Only safe once no consumer can
    /// reference the items any more (e.g. at shutdown).
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
