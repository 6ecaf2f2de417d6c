//! `nomux`: multiplexed-socket semantics over plain stream connections.
//!
//! The client side opens one underlying connection per logical stream. The
//! server side hands out each accepted connection as a multiplexed socket
//! carrying exactly one stream.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use muxsock_transport::types::{
    Address, BoxMuxedListener, BoxStreamConn, BoxStreamListener, GuardedIo, MuxDialFunc,
    MuxListenFunc, MuxedListener, MuxedSocket, SharedMuxedSocket, Socket, StreamConn,
    StreamDialFunc, StreamListenFunc, StreamSolutionImplementation, mux_dial_fn, mux_listen_fn,
};
use muxsock_transport::{Error, Parameters, Result};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

/// Registered name.
pub const NAME: &str = "nomux";

/// Stream solution without multiplexing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NomuxImplementation;

impl StreamSolutionImplementation for NomuxImplementation {
    fn client(&self, input: StreamDialFunc, _parameters: &Parameters) -> Result<MuxDialFunc> {
        Ok(mux_dial_fn(move || {
            let input = Arc::clone(&input);
            async move { Ok(Arc::new(DialedConn::new(input)) as SharedMuxedSocket) }
        }))
    }

    fn server(&self, input: StreamListenFunc, _parameters: &Parameters) -> Result<MuxListenFunc> {
        Ok(mux_listen_fn(move || {
            let input = Arc::clone(&input);
            async move {
                let listener = input().await?;
                Ok(Box::new(NomuxListener { listener }) as BoxMuxedListener)
            }
        }))
    }
}

struct DialedState {
    dialer: StreamDialFunc,
    closed: CancellationToken,
    remote: Mutex<Option<Address>>,
}

impl DialedState {
    async fn dial_stream(self: &Arc<Self>) -> Result<BoxStreamConn> {
        if self.closed.is_cancelled() {
            return Err(Error::Closed);
        }
        let conn = (self.dialer)().await?;
        *self.remote.lock() = Some(conn.remote_addr());
        debug!(remote = %conn.remote_addr(), "nomux stream dialed");
        Ok(Box::new(NomuxStream::wrap(
            conn,
            self.closed.child_token(),
            Some(Arc::clone(self)),
        )))
    }
}

/// Client socket dialing a fresh connection for every stream. Closing it
/// closes every stream it opened.
pub struct DialedConn {
    state: Arc<DialedState>,
}

impl DialedConn {
    /// Wraps `dialer`. Nothing is dialed until the first stream is opened.
    #[must_use]
    pub fn new(dialer: StreamDialFunc) -> Self {
        Self {
            state: Arc::new(DialedState {
                dialer,
                closed: CancellationToken::new(),
                remote: Mutex::new(None),
            }),
        }
    }
}

#[async_trait]
impl Socket for DialedConn {
    fn close_signal(&self) -> CancellationToken {
        self.state.closed.clone()
    }

    async fn close(&self) -> Result<()> {
        self.state.closed.cancel();
        Ok(())
    }

    fn local_addr(&self) -> Address {
        Address::empty(NAME)
    }

    /// Remote of the most recently dialed stream.
    fn remote_addr(&self) -> Address {
        self.state
            .remote
            .lock()
            .clone()
            .unwrap_or_else(|| Address::empty(NAME))
    }

    fn can_redial(&self) -> bool {
        true
    }
}

#[async_trait]
impl MuxedSocket for DialedConn {
    async fn open_stream(&self) -> Result<BoxStreamConn> {
        self.state.dial_stream().await
    }

    /// A client has no peer-initiated streams, so accepting dials one.
    async fn accept_stream(&self) -> Result<BoxStreamConn> {
        self.state.dial_stream().await
    }

    async fn redial(&self) -> Result<SharedMuxedSocket> {
        Ok(Arc::new(Self::new(Arc::clone(&self.state.dialer))))
    }
}

/// Server socket carrying the single stream of one accepted connection.
pub struct AcceptedConn {
    conn: Mutex<Option<BoxStreamConn>>,
    closed: CancellationToken,
    local: Address,
    remote: Address,
}

impl AcceptedConn {
    /// Wraps an accepted connection.
    #[must_use]
    pub fn new(conn: BoxStreamConn) -> Self {
        Self {
            closed: conn.close_signal().child_token(),
            local: conn.local_addr(),
            remote: conn.remote_addr(),
            conn: Mutex::new(Some(conn)),
        }
    }

    /// Hands out the connection once. Later calls wait for it to close.
    async fn use_stream(&self) -> Result<BoxStreamConn> {
        if self.closed.is_cancelled() {
            return Err(Error::Closed);
        }
        let conn = self.conn.lock().take();
        match conn {
            Some(conn) => Ok(Box::new(NomuxStream::wrap(conn, self.closed.clone(), None))),
            None => {
                self.closed.cancelled().await;
                Err(Error::Closed)
            }
        }
    }
}

#[async_trait]
impl Socket for AcceptedConn {
    fn close_signal(&self) -> CancellationToken {
        self.closed.clone()
    }

    async fn close(&self) -> Result<()> {
        self.closed.cancel();
        let conn = self.conn.lock().take();
        if let Some(conn) = conn {
            conn.close().await?;
        }
        Ok(())
    }

    fn local_addr(&self) -> Address {
        self.local.clone()
    }

    fn remote_addr(&self) -> Address {
        self.remote.clone()
    }
}

#[async_trait]
impl MuxedSocket for AcceptedConn {
    async fn open_stream(&self) -> Result<BoxStreamConn> {
        self.use_stream().await
    }

    async fn accept_stream(&self) -> Result<BoxStreamConn> {
        self.use_stream().await
    }
}

/// One logical stream of a nomux socket.
pub struct NomuxStream {
    io: GuardedIo<BoxStreamConn>,
    dialer: Option<Arc<DialedState>>,
    _release: DropGuard,
}

impl NomuxStream {
    fn wrap(
        inner: BoxStreamConn,
        closed: CancellationToken,
        dialer: Option<Arc<DialedState>>,
    ) -> Self {
        let inner_closed = inner.close_signal();
        let linked = closed.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = inner_closed.cancelled() => linked.cancel(),
                () = linked.cancelled() => {}
            }
        });
        Self {
            io: GuardedIo::new(inner, closed.clone()),
            dialer,
            _release: closed.drop_guard(),
        }
    }
}

impl AsyncRead for NomuxStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_read(cx, buf)
    }
}

impl AsyncWrite for NomuxStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.io).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_shutdown(cx)
    }
}

#[async_trait]
impl Socket for NomuxStream {
    fn close_signal(&self) -> CancellationToken {
        self.io.close_signal()
    }

    async fn close(&self) -> Result<()> {
        self.io.close();
        self.io.get_ref().close().await
    }

    fn local_addr(&self) -> Address {
        self.io.get_ref().local_addr()
    }

    fn remote_addr(&self) -> Address {
        self.io.get_ref().remote_addr()
    }

    fn can_redial(&self) -> bool {
        self.dialer.is_some()
    }
}

#[async_trait]
impl StreamConn for NomuxStream {
    async fn redial(&self) -> Result<BoxStreamConn> {
        self.dialer
            .as_ref()
            .ok_or(Error::RedialNotSupported)?
            .dial_stream()
            .await
    }
}

/// Listener presenting every accepted connection as a one-stream socket.
pub struct NomuxListener {
    listener: BoxStreamListener,
}

#[async_trait]
impl MuxedListener for NomuxListener {
    async fn accept_muxed(&self) -> Result<SharedMuxedSocket> {
        let conn = self.listener.accept_conn().await?;
        Ok(Arc::new(AcceptedConn::new(conn)))
    }

    fn addr(&self) -> Address {
        self.listener.addr()
    }

    fn close_signal(&self) -> CancellationToken {
        self.listener.close_signal()
    }

    async fn close(&self) -> Result<()> {
        self.listener.close().await
    }
}
