//! Sockets, addresses, producers and implementation contracts.

mod addr;
mod implementation;
mod io;
mod producer;
mod representation;
mod socket;

pub use addr::Address;
pub use implementation::{
    AddrSolutionImplementation, PacketAdapterImplementation, PacketConnImplementation,
    PacketObfuscatorImplementation, PacketSolutionImplementation, StreamAdapterImplementation,
    StreamConnImplementation, StreamObfuscatorImplementation, StreamSolutionImplementation,
};
pub use io::GuardedIo;
pub use producer::{
    MuxDialFunc, MuxListenFunc, PacketConnFunc, StreamDialFunc, StreamListenFunc, mux_dial_fn,
    mux_listen_fn, packet_conn_fn, stream_dial_fn, stream_listen_fn,
};
pub use representation::{
    DialRepresentation, ListenRepresentation, Representation, RepresentationKind,
};
pub use socket::{
    BoxMuxedListener, BoxStreamConn, BoxStreamListener, MuxedListener, MuxedSocket, PacketConn,
    SharedMuxedSocket, SharedPacketConn, Socket, StreamConn, StreamListener, socket_address,
};
