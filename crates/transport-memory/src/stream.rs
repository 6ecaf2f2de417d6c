//! `mem`: stream connections over in-process pipes.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use muxsock_transport::params::{ParameterHint, ParameterType};
use muxsock_transport::types::{
    Address, BoxStreamConn, BoxStreamListener, GuardedIo, Socket, StreamConn,
    StreamConnImplementation, StreamDialFunc, StreamListenFunc, StreamListener, stream_dial_fn,
    stream_listen_fn,
};
use muxsock_transport::{Error, Parameters, Result};
use once_cell::sync::Lazy;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf, duplex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::table::{Binding, ListenerTable, named, refused};
use crate::{DEFAULT_BUFFER, PARAM_BUFFER};

/// Registered name.
pub const NAME: &str = "mem";

pub(crate) static LISTENERS: Lazy<ListenerTable<BoxStreamConn>> = Lazy::new(ListenerTable::new);

/// Stream transport connecting to listeners in the same process.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemImplementation;

impl StreamConnImplementation for MemImplementation {
    fn client(&self, addr: &str, parameters: &Parameters) -> Result<StreamDialFunc> {
        let dialer = Arc::new(MemDialer {
            addr: addr.to_string(),
            buffer: parameters.integer(PARAM_BUFFER, DEFAULT_BUFFER).max(1),
        });
        Ok(stream_dial_fn(move || {
            let dialer = Arc::clone(&dialer);
            async move { Ok(Box::new(dialer.dial().await?) as BoxStreamConn) }
        }))
    }

    fn server(&self, addr: &str, _parameters: &Parameters) -> Result<StreamListenFunc> {
        let addr = addr.to_string();
        Ok(stream_listen_fn(move || {
            let addr = addr.clone();
            async move {
                let binding = LISTENERS.bind(&addr)?;
                info!(%addr, "mem listener bound");
                Ok(Box::new(MemStreamListener { binding }) as BoxStreamListener)
            }
        }))
    }

    fn parameter_hints(&self) -> Vec<ParameterHint> {
        vec![ParameterHint {
            key: PARAM_BUFFER,
            description: "pipe capacity in bytes per direction",
            kind: ParameterType::Integer,
            default_value: "65536",
        }]
    }
}

/// Dial recipe kept by dialed streams.
#[derive(Debug)]
pub struct MemDialer {
    addr: String,
    buffer: usize,
}

impl MemDialer {
    /// Hands the server half of a fresh pipe to the listener at the address.
    ///
    /// # Errors
    ///
    /// `ConnectionRefused` when no listener is bound there.
    pub async fn dial(self: Arc<Self>) -> Result<MemStream> {
        let inbox = LISTENERS.connect(&self.addr)?;
        let client = named(NAME, format!("client-{}", Uuid::new_v4()));
        let server = named(NAME, self.addr.as_str());
        let (mut local, peer) =
            MemStream::pair(self.buffer, CancellationToken::new(), 0, client, server);
        inbox
            .send_async(Box::new(peer))
            .await
            .map_err(|_| refused(&self.addr))?;
        debug!(addr = %self.addr, "mem connection established");
        local.dialer = Some(self);
        Ok(local)
    }
}

/// One end of an in-process pipe. Closing either end closes both.
pub struct MemStream {
    io: GuardedIo<DuplexStream>,
    stream_id: u64,
    local: Address,
    remote: Address,
    dialer: Option<Arc<MemDialer>>,
}

impl MemStream {
    /// Creates both ends of a pipe guarded by `closed`.
    #[must_use]
    pub fn pair(
        buffer: usize,
        closed: CancellationToken,
        stream_id: u64,
        a: Address,
        b: Address,
    ) -> (Self, Self) {
        let (left, right) = duplex(buffer);
        (
            Self {
                io: GuardedIo::new(left, closed.clone()),
                stream_id,
                local: a.clone(),
                remote: b.clone(),
                dialer: None,
            },
            Self {
                io: GuardedIo::new(right, closed),
                stream_id,
                local: b,
                remote: a,
                dialer: None,
            },
        )
    }
}

impl AsyncRead for MemStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_read(cx, buf)
    }
}

impl AsyncWrite for MemStream {
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
impl Socket for MemStream {
    fn close_signal(&self) -> CancellationToken {
        self.io.close_signal()
    }

    async fn close(&self) -> Result<()> {
        self.io.close();
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
impl StreamConn for MemStream {
    fn stream_id(&self) -> u64 {
        self.stream_id
    }

    async fn redial(&self) -> Result<BoxStreamConn> {
        let dialer = self.dialer.as_ref().ok_or(Error::RedialNotSupported)?;
        Ok(Box::new(Arc::clone(dialer).dial().await?))
    }
}

/// Listener bound in the in-process table.
pub struct MemStreamListener {
    binding: Binding<BoxStreamConn>,
}

#[async_trait]
impl StreamListener for MemStreamListener {
    async fn accept_conn(&self) -> Result<BoxStreamConn> {
        self.binding.accept().await
    }

    fn addr(&self) -> Address {
        named(NAME, self.binding.addr.as_str())
    }

    fn close_signal(&self) -> CancellationToken {
        self.binding.closed.clone()
    }

    async fn close(&self) -> Result<()> {
        self.binding.closed.cancel();
        LISTENERS.unbind(&self.binding);
        info!(addr = %self.binding.addr, "mem listener closed");
        Ok(())
    }
}

impl Drop for MemStreamListener {
    fn drop(&mut self) {
        LISTENERS.unbind(&self.binding);
    }
}
