use std::fmt;

use super::{MuxDialFunc, MuxListenFunc, PacketConnFunc, StreamDialFunc, StreamListenFunc};

/// The four shapes a chain can take between layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepresentationKind {
    /// An address string not yet bound to any transport.
    Addr,
    /// A datagram producer.
    Packet,
    /// A stream producer.
    Stream,
    /// A multiplexed producer.
    Muxed,
}

impl fmt::Display for RepresentationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Addr => "address",
            Self::Packet => "packet",
            Self::Stream => "stream",
            Self::Muxed => "multiplexed",
        })
    }
}

/// Intermediate value threaded through the chain, parameterized by side.
#[derive(Clone)]
pub enum Representation<P, S, M> {
    /// Address string.
    Addr(String),
    /// Datagram producer.
    Packet(P),
    /// Stream producer.
    Stream(S),
    /// Multiplexed producer.
    Muxed(M),
}

/// Representation on the dialing side.
pub type DialRepresentation = Representation<PacketConnFunc, StreamDialFunc, MuxDialFunc>;

/// Representation on the listening side.
pub type ListenRepresentation = Representation<PacketConnFunc, StreamListenFunc, MuxListenFunc>;

impl<P, S, M> Representation<P, S, M> {
    /// Which of the four shapes this is.
    pub const fn kind(&self) -> RepresentationKind {
        match self {
            Self::Addr(_) => RepresentationKind::Addr,
            Self::Packet(_) => RepresentationKind::Packet,
            Self::Stream(_) => RepresentationKind::Stream,
            Self::Muxed(_) => RepresentationKind::Muxed,
        }
    }
}

impl<P, S, M> fmt::Debug for Representation<P, S, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Addr(addr) => f.debug_tuple("Addr").field(addr).finish(),
            other => f.debug_tuple("Representation").field(&other.kind()).finish(),
        }
    }
}
