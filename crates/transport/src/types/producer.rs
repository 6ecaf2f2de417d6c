//! Producer functions: lazily bound recipes that dial or listen when invoked.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use super::{
    BoxMuxedListener, BoxStreamConn, BoxStreamListener, SharedMuxedSocket, SharedPacketConn,
};
use crate::error::Result;

/// Produces a datagram socket, dialed or bound depending on the side.
pub type PacketConnFunc = Arc<dyn Fn() -> BoxFuture<'static, Result<SharedPacketConn>> + Send + Sync>;

/// Dials a stream connection.
pub type StreamDialFunc = Arc<dyn Fn() -> BoxFuture<'static, Result<BoxStreamConn>> + Send + Sync>;

/// Binds a stream listener.
pub type StreamListenFunc =
    Arc<dyn Fn() -> BoxFuture<'static, Result<BoxStreamListener>> + Send + Sync>;

/// Dials a multiplexed connection.
pub type MuxDialFunc = Arc<dyn Fn() -> BoxFuture<'static, Result<SharedMuxedSocket>> + Send + Sync>;

/// Binds a multiplexed listener.
pub type MuxListenFunc =
    Arc<dyn Fn() -> BoxFuture<'static, Result<BoxMuxedListener>> + Send + Sync>;

/// Builds a [`PacketConnFunc`] from an async closure.
pub fn packet_conn_fn<F, Fut>(f: F) -> PacketConnFunc
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<SharedPacketConn>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Builds a [`StreamDialFunc`] from an async closure.
pub fn stream_dial_fn<F, Fut>(f: F) -> StreamDialFunc
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<BoxStreamConn>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Builds a [`StreamListenFunc`] from an async closure.
pub fn stream_listen_fn<F, Fut>(f: F) -> StreamListenFunc
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<BoxStreamListener>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Builds a [`MuxDialFunc`] from an async closure.
pub fn mux_dial_fn<F, Fut>(f: F) -> MuxDialFunc
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<SharedMuxedSocket>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Builds a [`MuxListenFunc`] from an async closure.
pub fn mux_listen_fn<F, Fut>(f: F) -> MuxListenFunc
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<BoxMuxedListener>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}
