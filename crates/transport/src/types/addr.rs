use std::fmt;
use std::net::SocketAddr;

/// Network address of a socket or listener.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    /// A resolved IP socket address on a named network (`tcp`, `udp`).
    Socket {
        /// Network name.
        network: String,
        /// The socket address.
        addr: SocketAddr,
    },
    /// An opaque `host[:port]` on a network that does not use IP socket addresses.
    Named {
        /// Network name.
        network: String,
        /// Host and optional port as given.
        host: String,
        /// Port, or 0 when none was given.
        port: u16,
    },
    /// Placeholder for sockets without a meaningful address.
    Empty(String),
    /// A logical stream inside a multiplexed connection.
    Muxed {
        /// Address of the physical connection.
        original: Box<Address>,
        /// Stream identifier within the connection.
        stream_id: u64,
    },
}

impl Address {
    /// IP socket address on the given network.
    pub fn socket(network: impl Into<String>, addr: SocketAddr) -> Self {
        Self::Socket {
            network: network.into(),
            addr,
        }
    }

    /// Placeholder address for the given network.
    pub fn empty(network: impl Into<String>) -> Self {
        Self::Empty(network.into())
    }

    /// Per-stream address rendered as `original#stream_id`.
    #[must_use]
    pub fn muxed(original: Self, stream_id: u64) -> Self {
        Self::Muxed {
            original: Box::new(original),
            stream_id,
        }
    }

    /// Network name, such as `tcp` or `udp`.
    #[must_use]
    pub fn network(&self) -> &str {
        match self {
            Self::Socket { network, .. } | Self::Named { network, .. } | Self::Empty(network) => {
                network
            }
            Self::Muxed { original, .. } => original.network(),
        }
    }

    /// The IP socket address, if this address has one.
    #[must_use]
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        match self {
            Self::Socket { addr, .. } => Some(*addr),
            Self::Muxed { original, .. } => original.socket_addr(),
            Self::Named { .. } | Self::Empty(_) => None,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Socket { addr, .. } => write!(f, "{addr}"),
            Self::Named { host, .. } => f.write_str(host),
            Self::Empty(network) => write!(f, "{network}:"),
            Self::Muxed {
                original,
                stream_id,
            } => write!(f, "{original}#{stream_id}"),
        }
    }
}
