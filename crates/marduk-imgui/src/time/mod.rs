//! Frame timing for hosts that drive [`ContextManager`](crate::ContextManager)
//! themselves rather than forwarding an engine's delta time.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
