//! In-memory transports for testing
//!
//! Connections are routed between listeners and dialers within the same
//! process through a global table keyed by address. Two bindings are
//! provided:
//!
//! - `mem`: a stream transport over in-process byte pipes.
//! - `memmux`: an address solution producing in-process multiplexed sockets.
//!
//! Addresses are free-form strings. Only one listener may be bound to an
//! address at a time.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod muxed;
pub mod stream;
mod table;

use std::sync::Arc;

use muxsock_transport::Creators;

pub use muxed::{MemMuxImplementation, MemSession};
pub use stream::{MemImplementation, MemStream};

/// Default capacity in bytes of each direction of an in-memory pipe.
pub const DEFAULT_BUFFER: usize = 64 * 1024;

/// Pipe capacity key.
pub const PARAM_BUFFER: &str = "buffer";

/// Registers `mem` and `memmux` in `creators`.
pub fn install(creators: &Creators) {
    creators
        .stream_conns()
        .register(stream::NAME, Arc::new(MemImplementation));
    creators
        .addr_solutions()
        .register(muxed::NAME, Arc::new(MemMuxImplementation));
}

/// Unbinds every in-memory listener (useful for tests).
pub fn clear_listeners() {
    stream::LISTENERS.clear();
    muxed::LISTENERS.clear();
}
