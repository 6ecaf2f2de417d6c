//! Socket and listener contracts implemented by every transport binding.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use super::Address;
use crate::error::{Error, Result};

/// Lifecycle shared by every socket.
#[async_trait]
pub trait Socket: Send + Sync {
    /// Token cancelled once the socket is closed.
    fn close_signal(&self) -> CancellationToken;

    /// Closes the socket. Blocked operations are unblocked and fail.
    async fn close(&self) -> Result<()>;

    /// Local network address, if known.
    fn local_addr(&self) -> Address;

    /// Remote network address, if known.
    fn remote_addr(&self) -> Address;

    /// Whether [`redial`](StreamConn::redial) can succeed. False for sockets
    /// accepted by a listener.
    fn can_redial(&self) -> bool {
        false
    }

    /// Whether the close signal has fired.
    fn is_closed(&self) -> bool {
        self.close_signal().is_cancelled()
    }
}

/// A reliable byte stream.
#[async_trait]
pub trait StreamConn: Socket + AsyncRead + AsyncWrite + Unpin {
    /// Identifier within a multiplexed connection, 0 for plain connections.
    fn stream_id(&self) -> u64 {
        0
    }

    /// Dials the same remote again using the stored dial recipe.
    async fn redial(&self) -> Result<BoxStreamConn> {
        Err(Error::RedialNotSupported)
    }
}

/// A datagram socket.
#[async_trait]
pub trait PacketConn: Socket {
    /// Sends a datagram to the connected remote.
    async fn send(&self, buf: &[u8]) -> Result<usize>;

    /// Receives a datagram from the connected remote.
    async fn recv(&self, buf: &mut [u8]) -> Result<usize>;

    /// Sends a datagram to the given address.
    async fn send_to(&self, buf: &[u8], target: &Address) -> Result<usize>;

    /// Receives a datagram and reports its sender.
    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, Address)>;

    /// Receives a datagram together with its out-of-band metadata.
    async fn recv_with_oob(
        &self,
        _buf: &mut [u8],
        _oob: &mut [u8],
    ) -> Result<(usize, usize, Address)> {
        Err(Error::OpNotSupported("recv_with_oob"))
    }

    /// Dials the same remote again using the stored dial recipe.
    async fn redial(&self) -> Result<SharedPacketConn> {
        Err(Error::RedialNotSupported)
    }
}

/// A connection carrying many independent logical streams.
#[async_trait]
pub trait MuxedSocket: Socket {
    /// Opens a new logical stream.
    async fn open_stream(&self) -> Result<BoxStreamConn>;

    /// Waits for the peer to open a logical stream.
    async fn accept_stream(&self) -> Result<BoxStreamConn>;

    /// Dials the same remote again using the stored dial recipe.
    async fn redial(&self) -> Result<SharedMuxedSocket> {
        Err(Error::RedialNotSupported)
    }

    /// Sends an unreliable datagram alongside the streams.
    async fn send_datagram(&self, _payload: &[u8]) -> Result<()> {
        Err(Error::OpNotSupported("send_datagram"))
    }

    /// Receives an unreliable datagram sent alongside the streams.
    async fn recv_datagram(&self) -> Result<Vec<u8>> {
        Err(Error::OpNotSupported("recv_datagram"))
    }
}

/// Accepts plain stream connections.
#[async_trait]
pub trait StreamListener: Send + Sync {
    /// Waits for and returns the next connection.
    async fn accept_conn(&self) -> Result<BoxStreamConn>;

    /// Address the listener is bound to.
    fn addr(&self) -> Address;

    /// Token cancelled once the listener is closed.
    fn close_signal(&self) -> CancellationToken;

    /// Closes the listener. Blocked accepts are unblocked and fail.
    async fn close(&self) -> Result<()>;
}

/// Accepts multiplexed connections.
#[async_trait]
pub trait MuxedListener: Send + Sync {
    /// Waits for and returns the next multiplexed connection.
    async fn accept_muxed(&self) -> Result<SharedMuxedSocket>;

    /// Address the listener is bound to.
    fn addr(&self) -> Address;

    /// Token cancelled once the listener is closed.
    fn close_signal(&self) -> CancellationToken;

    /// Closes the listener. Blocked accepts are unblocked and fail.
    async fn close(&self) -> Result<()>;
}

/// Owned stream connection.
pub type BoxStreamConn = Box<dyn StreamConn>;
/// Shared datagram socket.
pub type SharedPacketConn = Arc<dyn PacketConn>;
/// Shared multiplexed connection.
pub type SharedMuxedSocket = Arc<dyn MuxedSocket>;
/// Owned stream listener.
pub type BoxStreamListener = Box<dyn StreamListener>;
/// Owned multiplexed listener.
pub type BoxMuxedListener = Box<dyn MuxedListener>;

/// Converts a resolved socket address into an [`Address`] on `network`.
pub fn socket_address(network: &str, addr: std::io::Result<SocketAddr>) -> Address {
    addr.map_or_else(|_| Address::empty(network), |addr| Address::socket(network, addr))
}
