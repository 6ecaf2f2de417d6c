//! Capability contracts of layer implementations.
//!
//! Each category turns its input representation into a producer. Building a
//! producer performs no network I/O; that happens when the producer runs.

use super::{MuxDialFunc, MuxListenFunc, PacketConnFunc, StreamDialFunc, StreamListenFunc};
use crate::error::Result;
use crate::params::{ParameterHint, Parameters};

macro_rules! implementation_trait {
    (
        $(#[$doc:meta])*
        $name:ident, $client_in:ty => $client_out:ty, $server_in:ty => $server_out:ty
    ) => {
        $(#[$doc])*
        pub trait $name: Send + Sync {
            /// Builds the dialing side.
            ///
            /// # Errors
            ///
            /// Returns an error when the parameters are unusable.
            fn client(&self, input: $client_in, parameters: &Parameters) -> Result<$client_out>;

            /// Builds the listening side.
            ///
            /// # Errors
            ///
            /// Returns an error when the parameters are unusable.
            fn server(&self, input: $server_in, parameters: &Parameters) -> Result<$server_out>;

            /// Parameters this implementation reads from its section.
            fn parameter_hints(&self) -> Vec<ParameterHint> {
                Vec::new()
            }
        }
    };
}

implementation_trait!(
    /// Datagram transport bound directly to an address.
    PacketConnImplementation,
    &str => PacketConnFunc,
    &str => PacketConnFunc
);

implementation_trait!(
    /// Stream transport bound directly to an address.
    StreamConnImplementation,
    &str => StreamDialFunc,
    &str => StreamListenFunc
);

implementation_trait!(
    /// Self-contained multiplexed transport bound directly to an address.
    AddrSolutionImplementation,
    &str => MuxDialFunc,
    &str => MuxListenFunc
);

implementation_trait!(
    /// Reliable streams carried over datagrams.
    StreamAdapterImplementation,
    PacketConnFunc => StreamDialFunc,
    PacketConnFunc => StreamListenFunc
);

implementation_trait!(
    /// Datagrams carried over streams.
    PacketAdapterImplementation,
    StreamDialFunc => PacketConnFunc,
    StreamListenFunc => PacketConnFunc
);

implementation_trait!(
    /// Byte transformation over streams, such as TLS.
    StreamObfuscatorImplementation,
    StreamDialFunc => StreamDialFunc,
    StreamListenFunc => StreamListenFunc
);

implementation_trait!(
    /// Byte transformation over datagrams.
    PacketObfuscatorImplementation,
    PacketConnFunc => PacketConnFunc,
    PacketConnFunc => PacketConnFunc
);

implementation_trait!(
    /// Multiplexing over datagrams.
    PacketSolutionImplementation,
    PacketConnFunc => MuxDialFunc,
    PacketConnFunc => MuxListenFunc
);

implementation_trait!(
    /// Multiplexing over streams.
    StreamSolutionImplementation,
    StreamDialFunc => MuxDialFunc,
    StreamListenFunc => MuxListenFunc
);
