//! One-stream-per-connection views over multiplexed producers.

mod client;
mod server;

pub use client::{ClientDemuxer, demux_dialer};
pub use server::{ListenerDemuxer, ServerDemuxer, demux_listener};

/// Streams opened on one physical connection before the client rotates.
pub const PARAM_STREAMS_PER_CONNECTION: &str = "streamsperconn";
/// Capacity of the server's accepted-stream queue.
pub const PARAM_BACKLOG: &str = "backlog";

/// Default for [`PARAM_STREAMS_PER_CONNECTION`].
pub const DEFAULT_STREAMS_PER_CONNECTION: usize = 1;
/// Default for [`PARAM_BACKLOG`].
pub const DEFAULT_BACKLOG: usize = 1000;
