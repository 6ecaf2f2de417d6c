//! UDP datagram transport. Clients get a socket connected to the resolved
//! remote, servers a socket bound to the listen address.

use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use muxsock_transport::types::{
    Address, PacketConn, PacketConnFunc, PacketConnImplementation, SharedPacketConn, Socket,
    packet_conn_fn, socket_address,
};
use muxsock_transport::{Error, Parameters, Result};
use tokio::net::{UdpSocket, lookup_host};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Registered name.
pub const NAME: &str = "udp";

/// Datagram transport over UDP.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpImplementation;

impl PacketConnImplementation for UdpImplementation {
    fn client(&self, addr: &str, _parameters: &Parameters) -> Result<PacketConnFunc> {
        let dialer = Arc::new(UdpDialer {
            addr: addr.to_string(),
        });
        Ok(packet_conn_fn(move || {
            let dialer = Arc::clone(&dialer);
            async move { Ok(Arc::new(dialer.dial().await?) as SharedPacketConn) }
        }))
    }

    fn server(&self, addr: &str, _parameters: &Parameters) -> Result<PacketConnFunc> {
        let addr = addr.to_string();
        Ok(packet_conn_fn(move || {
            let addr = addr.clone();
            async move {
                let socket = UdpSocket::bind(&addr).await?;
                let conn = UdpConn::new(socket, None);
                info!(addr = %conn.local, "udp socket bound");
                Ok(Arc::new(conn) as SharedPacketConn)
            }
        }))
    }
}

/// Dial recipe kept by connected sockets.
#[derive(Debug)]
pub struct UdpDialer {
    addr: String,
}

impl UdpDialer {
    /// Resolves the remote, binds an ephemeral local port of the same
    /// family and connects to it.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAddress`] when nothing resolves, otherwise the
    /// underlying I/O error.
    pub async fn dial(self: Arc<Self>) -> Result<UdpConn> {
        let remote = resolve(&self.addr).await?;
        let local: SocketAddr = if remote.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(remote).await?;
        debug!(%remote, "udp socket connected");
        Ok(UdpConn::new(socket, Some(self)))
    }
}

async fn resolve(addr: &str) -> Result<SocketAddr> {
    lookup_host(addr)
        .await?
        .next()
        .ok_or_else(|| Error::InvalidAddress(addr.to_string()))
}

/// A UDP socket.
pub struct UdpConn {
    socket: UdpSocket,
    local: Address,
    remote: Address,
    closed: CancellationToken,
    dialer: Option<Arc<UdpDialer>>,
}

impl UdpConn {
    fn new(socket: UdpSocket, dialer: Option<Arc<UdpDialer>>) -> Self {
        let local = socket_address(NAME, socket.local_addr());
        let remote = socket_address(NAME, socket.peer_addr());
        Self {
            socket,
            local,
            remote,
            closed: CancellationToken::new(),
            dialer,
        }
    }

    async fn guarded<T>(&self, op: impl Future<Output = io::Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            () = self.closed.cancelled() => Err(Error::Closed),
            result = op => Ok(result?),
        }
    }
}

#[async_trait]
impl Socket for UdpConn {
    fn close_signal(&self) -> CancellationToken {
        self.closed.clone()
    }

    async fn close(&self) -> Result<()> {
        self.closed.cancel();
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
impl PacketConn for UdpConn {
    async fn send(&self, buf: &[u8]) -> Result<usize> {
        self.guarded(self.socket.send(buf)).await
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        self.guarded(self.socket.recv(buf)).await
    }

    async fn send_to(&self, buf: &[u8], target: &Address) -> Result<usize> {
        let target = match target.socket_addr() {
            Some(addr) => addr,
            None => resolve(&target.to_string()).await?,
        };
        self.guarded(self.socket.send_to(buf, target)).await
    }

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, Address)> {
        let (len, from) = self.guarded(self.socket.recv_from(buf)).await?;
        Ok((len, Address::socket(NAME, from)))
    }

    async fn redial(&self) -> Result<SharedPacketConn> {
        let dialer = self.dialer.as_ref().ok_or(Error::RedialNotSupported)?;
        Ok(Arc::new(Arc::clone(dialer).dial().await?))
    }
}
