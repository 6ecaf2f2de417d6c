//! `memmux`: in-process multiplexed sockets.
//!
//! A dial creates a session pair and hands one end to the listener. Either
//! end opens streams that the other accepts. Every stream is an in-process
//! pipe closed with its session. Stream ids are odd for streams opened by
//! the dialing end and even for the accepting end.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use muxsock_transport::params::{ParameterHint, ParameterType};
use muxsock_transport::types::{
    Address, AddrSolutionImplementation, BoxMuxedListener, BoxStreamConn, MuxDialFunc,
    MuxListenFunc, MuxedListener, MuxedSocket, SharedMuxedSocket, Socket, mux_dial_fn,
    mux_listen_fn,
};
use muxsock_transport::{Error, Parameters, Result};
use once_cell::sync::Lazy;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::stream::MemStream;
use crate::table::{Binding, ListenerTable, named, refused};
use crate::{DEFAULT_BUFFER, PARAM_BUFFER};

/// Registered name.
pub const NAME: &str = "memmux";

pub(crate) static LISTENERS: Lazy<ListenerTable<SharedMuxedSocket>> =
    Lazy::new(ListenerTable::new);

/// Address solution producing in-process multiplexed sockets.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemMuxImplementation;

impl AddrSolutionImplementation for MemMuxImplementation {
    fn client(&self, addr: &str, parameters: &Parameters) -> Result<MuxDialFunc> {
        let dialer = Arc::new(MemMuxDialer {
            addr: addr.to_string(),
            buffer: parameters.integer(PARAM_BUFFER, DEFAULT_BUFFER).max(1),
        });
        Ok(mux_dial_fn(move || {
            let dialer = Arc::clone(&dialer);
            async move { Ok(dialer.dial().await? as SharedMuxedSocket) }
        }))
    }

    fn server(&self, addr: &str, _parameters: &Parameters) -> Result<MuxListenFunc> {
        let addr = addr.to_string();
        Ok(mux_listen_fn(move || {
            let addr = addr.clone();
            async move {
                let binding = LISTENERS.bind(&addr)?;
                info!(%addr, "memmux listener bound");
                Ok(Box::new(MemMuxListener { binding }) as BoxMuxedListener)
            }
        }))
    }

    fn parameter_hints(&self) -> Vec<ParameterHint> {
        vec![ParameterHint {
            key: PARAM_BUFFER,
            description: "per-stream pipe capacity in bytes per direction",
            kind: ParameterType::Integer,
            default_value: "65536",
        }]
    }
}

/// Dial recipe kept by dialing sessions.
#[derive(Debug)]
pub struct MemMuxDialer {
    addr: String,
    buffer: usize,
}

impl MemMuxDialer {
    /// Creates a session pair and hands the accepting end to the listener.
    ///
    /// # Errors
    ///
    /// `ConnectionRefused` when no listener is bound at the address.
    pub async fn dial(self: Arc<Self>) -> Result<Arc<MemSession>> {
        let inbox = LISTENERS.connect(&self.addr)?;
        let (client, server) = MemSession::pair(
            self.buffer,
            named(NAME, format!("client-{}", Uuid::new_v4())),
            named(NAME, self.addr.as_str()),
            Some(Arc::clone(&self)),
        );
        let client = Arc::new(client);
        inbox
            .send_async(Arc::new(server) as SharedMuxedSocket)
            .await
            .map_err(|_| refused(&self.addr))?;
        debug!(addr = %self.addr, session = %client.id, "memmux session established");
        Ok(client)
    }
}

struct Channels<T> {
    outgoing: flume::Sender<T>,
    incoming: flume::Receiver<T>,
}

fn crossed<T>() -> (Channels<T>, Channels<T>) {
    let (to_b, from_a) = flume::unbounded();
    let (to_a, from_b) = flume::unbounded();
    (
        Channels {
            outgoing: to_b,
            incoming: from_b,
        },
        Channels {
            outgoing: to_a,
            incoming: from_a,
        },
    )
}

/// One end of an in-process multiplexed connection. Closing either end
/// closes both ends and every stream of the session.
pub struct MemSession {
    id: Uuid,
    closed: CancellationToken,
    streams: Channels<BoxStreamConn>,
    datagrams: Channels<Vec<u8>>,
    next_stream_id: AtomicU64,
    buffer: usize,
    local: Address,
    remote: Address,
    dialer: Option<Arc<MemMuxDialer>>,
}

impl MemSession {
    /// Creates both ends of a session. The first end is the dialing one and
    /// keeps `dialer` for redials.
    #[must_use]
    pub fn pair(
        buffer: usize,
        dialing: Address,
        accepting: Address,
        dialer: Option<Arc<MemMuxDialer>>,
    ) -> (Self, Self) {
        let id = Uuid::new_v4();
        let closed = CancellationToken::new();
        let (client_streams, server_streams) = crossed();
        let (client_datagrams, server_datagrams) = crossed();
        (
            Self {
                id,
                closed: closed.clone(),
                streams: client_streams,
                datagrams: client_datagrams,
                next_stream_id: AtomicU64::new(1),
                buffer,
                local: dialing.clone(),
                remote: accepting.clone(),
                dialer,
            },
            Self {
                id,
                closed,
                streams: server_streams,
                datagrams: server_datagrams,
                next_stream_id: AtomicU64::new(2),
                buffer,
                local: accepting,
                remote: dialing,
                dialer: None,
            },
        )
    }

    /// Session identifier shared by both ends.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    async fn guarded<T>(&self, incoming: &flume::Receiver<T>) -> Result<T> {
        tokio::select! {
            biased;
            () = self.closed.cancelled() => Err(Error::Closed),
            item = incoming.recv_async() => item.map_err(|_| Error::Closed),
        }
    }
}

#[async_trait]
impl Socket for MemSession {
    fn close_signal(&self) -> CancellationToken {
        self.closed.clone()
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.is_cancelled() {
            self.closed.cancel();
            debug!(session = %self.id, "memmux session closed");
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
impl MuxedSocket for MemSession {
    async fn open_stream(&self) -> Result<BoxStreamConn> {
        if self.closed.is_cancelled() {
            return Err(Error::Closed);
        }
        let stream_id = self.next_stream_id.fetch_add(2, Ordering::Relaxed);
        let (local, peer) = MemStream::pair(
            self.buffer,
            self.closed.child_token(),
            stream_id,
            Address::muxed(self.local.clone(), stream_id),
            Address::muxed(self.remote.clone(), stream_id),
        );
        self.streams
            .outgoing
            .send(Box::new(peer))
            .map_err(|_| Error::Closed)?;
        Ok(Box::new(local))
    }

    async fn accept_stream(&self) -> Result<BoxStreamConn> {
        self.guarded(&self.streams.incoming).await
    }

    async fn redial(&self) -> Result<SharedMuxedSocket> {
        let dialer = self.dialer.as_ref().ok_or(Error::RedialNotSupported)?;
        Ok(Arc::clone(dialer).dial().await?)
    }

    async fn send_datagram(&self, payload: &[u8]) -> Result<()> {
        if self.closed.is_cancelled() {
            return Err(Error::Closed);
        }
        self.datagrams
            .outgoing
            .send(payload.to_vec())
            .map_err(|_| Error::Closed)
    }

    async fn recv_datagram(&self) -> Result<Vec<u8>> {
        self.guarded(&self.datagrams.incoming).await
    }
}

/// Listener bound in the in-process table.
pub struct MemMuxListener {
    binding: Binding<SharedMuxedSocket>,
}

#[async_trait]
impl MuxedListener for MemMuxListener {
    async fn accept_muxed(&self) -> Result<SharedMuxedSocket> {
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
        info!(addr = %self.binding.addr, "memmux listener closed");
        Ok(())
    }
}

impl Drop for MemMuxListener {
    fn drop(&mut self) {
        LISTENERS.unbind(&self.binding);
    }
}
