//! Logger installation for hosts and tools.
//!
//! The library itself only emits through the `log` facade; installing a
//! backend is left to whoever owns `main`.

mod init;

pub use init::{init_logging, LoggingConfig};
