//! TCP stream transport.
//!
//! Dials honor the `timeout` parameter. After every dial and accept the
//! `keepalive` parameter is applied to the socket: a period enables TCP
//! keepalive with that idle time, a false boolean disables it. A socket that
//! refuses the setting is still handed out.

use std::io;
use std::net::Shutdown;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use muxsock_transport::params::{CommonParams, ParameterHint};
use muxsock_transport::types::{
    Address, BoxStreamConn, BoxStreamListener, GuardedIo, Socket, StreamConn,
    StreamConnImplementation, StreamDialFunc, StreamListenFunc, StreamListener, socket_address,
    stream_dial_fn, stream_listen_fn,
};
use muxsock_transport::{Error, Parameters, Result};
use parking_lot::Mutex;
use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Registered name.
pub const NAME: &str = "tcp";

/// Stream transport over TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpImplementation;

impl StreamConnImplementation for TcpImplementation {
    fn client(&self, addr: &str, parameters: &Parameters) -> Result<StreamDialFunc> {
        let dialer = Arc::new(TcpDialer {
            addr: addr.to_string(),
            options: CommonParams::from_parameters(parameters),
            keepalive_hook: apply_keepalive,
        });
        Ok(stream_dial_fn(move || {
            let dialer = Arc::clone(&dialer);
            async move {
                let conn = dialer.dial().await?;
                Ok(Box::new(conn) as BoxStreamConn)
            }
        }))
    }

    fn server(&self, addr: &str, parameters: &Parameters) -> Result<StreamListenFunc> {
        let addr = addr.to_string();
        let keepalive = CommonParams::from_parameters(parameters).keepalive;
        Ok(stream_listen_fn(move || {
            let addr = addr.clone();
            async move {
                let listener = TcpStreamListener::bind(&addr, keepalive).await?;
                Ok(Box::new(listener) as BoxStreamListener)
            }
        }))
    }

    fn parameter_hints(&self) -> Vec<ParameterHint> {
        CommonParams::hints()
            .into_iter()
            .filter(|hint| hint.key != muxsock_transport::params::PARAM_DPD)
            .collect()
    }
}

type KeepaliveHook = fn(&TcpStream, Option<Duration>) -> io::Result<()>;

/// Dial recipe kept by every dialed connection so it can redial.
#[derive(Debug)]
pub struct TcpDialer {
    addr: String,
    options: CommonParams,
    keepalive_hook: KeepaliveHook,
}

impl TcpDialer {
    /// Connects within the dial timeout and applies the keepalive setting.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] when the connect does not finish in time, or the
    /// underlying I/O error.
    pub async fn dial(self: Arc<Self>) -> Result<TcpConn> {
        let stream = timeout(self.options.dial_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| Error::Timeout(self.options.dial_timeout))??;
        configure_keepalive(&stream, self.options.keepalive, self.keepalive_hook);
        debug!(addr = %self.addr, "tcp connection established");
        Ok(TcpConn::new(stream, Some(self)))
    }
}

fn apply_keepalive(stream: &TcpStream, keepalive: Option<Duration>) -> io::Result<()> {
    let socket = SockRef::from(stream);
    match keepalive {
        Some(idle) => socket.set_tcp_keepalive(&TcpKeepalive::new().with_time(idle)),
        None => socket.set_keepalive(false),
    }
}

// A peer may reset between accept and setsockopt. The connection is still
// returned and fails on first use instead.
fn configure_keepalive(stream: &TcpStream, keepalive: Option<Duration>, hook: KeepaliveHook) {
    if let Err(e) = hook(stream, keepalive) {
        warn!(peer = ?stream.peer_addr().ok(), "tcp keepalive not applied: {e}");
    }
}

/// A TCP connection.
pub struct TcpConn {
    io: GuardedIo<TcpStream>,
    local: Address,
    remote: Address,
    dialer: Option<Arc<TcpDialer>>,
}

impl TcpConn {
    fn new(stream: TcpStream, dialer: Option<Arc<TcpDialer>>) -> Self {
        let local = socket_address(NAME, stream.local_addr());
        let remote = socket_address(NAME, stream.peer_addr());
        Self {
            io: GuardedIo::new(stream, CancellationToken::new()),
            local,
            remote,
            dialer,
        }
    }
}

impl AsyncRead for TcpConn {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_read(cx, buf)
    }
}

impl AsyncWrite for TcpConn {
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
impl Socket for TcpConn {
    fn close_signal(&self) -> CancellationToken {
        self.io.close_signal()
    }

    async fn close(&self) -> Result<()> {
        if self.io.close_signal().is_cancelled() {
            return Ok(());
        }
        self.io.close();
        if let Err(e) = SockRef::from(self.io.get_ref()).shutdown(Shutdown::Both) {
            debug!(remote = %self.remote, "tcp shutdown: {e}");
        }
        Ok(())
    }

    fn local_addr(&self) -> Address {
        self.local.clone()
    }

    fn remote_addr(&self) -> Address {
        self.remote.clone()
    }

    fn can_redial(&self) -> bool {
        self.dialer.is_some()
    }
}

#[async_trait]
impl StreamConn for TcpConn {
    async fn redial(&self) -> Result<BoxStreamConn> {
        let dialer = self.dialer.as_ref().ok_or(Error::RedialNotSupported)?;
        let conn = Arc::clone(dialer).dial().await?;
        Ok(Box::new(conn))
    }
}

/// A bound TCP listener. The socket is released on `close`.
pub struct TcpStreamListener {
    listener: Mutex<Option<Arc<TcpListener>>>,
    addr: Address,
    keepalive: Option<Duration>,
    keepalive_hook: KeepaliveHook,
    closed: CancellationToken,
}

impl TcpStreamListener {
    /// Binds `addr`.
    ///
    /// # Errors
    ///
    /// Propagates the bind failure.
    pub async fn bind(addr: &str, keepalive: Option<Duration>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = socket_address(NAME, listener.local_addr());
        info!(%addr, "tcp listener bound");
        Ok(Self {
            listener: Mutex::new(Some(Arc::new(listener))),
            addr,
            keepalive,
            keepalive_hook: apply_keepalive,
            closed: CancellationToken::new(),
        })
    }
}

#[async_trait]
impl StreamListener for TcpStreamListener {
    async fn accept_conn(&self) -> Result<BoxStreamConn> {
        let listener = self.listener.lock().clone().ok_or(Error::Closed)?;
        let (stream, remote) = tokio::select! {
            biased;
            () = self.closed.cancelled() => return Err(Error::Closed),
            accepted = listener.accept() => accepted?,
        };
        configure_keepalive(&stream, self.keepalive, self.keepalive_hook);
        debug!(%remote, "tcp connection accepted");
        Ok(Box::new(TcpConn::new(stream, None)))
    }

    fn addr(&self) -> Address {
        self.addr.clone()
    }

    fn close_signal(&self) -> CancellationToken {
        self.closed.clone()
    }

    async fn close(&self) -> Result<()> {
        self.closed.cancel();
        self.listener.lock().take();
        info!(addr = %self.addr, "tcp listener closed");
        Ok(())
    }
}
