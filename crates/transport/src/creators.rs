//! The nine per-category registries consulted while resolving a scheme.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::registry::Registry;
use crate::types::{
    AddrSolutionImplementation, PacketAdapterImplementation, PacketConnImplementation,
    PacketObfuscatorImplementation, PacketSolutionImplementation, StreamAdapterImplementation,
    StreamConnImplementation, StreamObfuscatorImplementation, StreamSolutionImplementation,
};

static GLOBAL_CREATORS: Lazy<Arc<Creators>> = Lazy::new(|| Arc::new(Creators::new()));

/// One registry per capability category.
#[derive(Debug, Default)]
pub struct Creators {
    packet_conns: Registry<dyn PacketConnImplementation>,
    stream_conns: Registry<dyn StreamConnImplementation>,
    stream_adapters: Registry<dyn StreamAdapterImplementation>,
    packet_adapters: Registry<dyn PacketAdapterImplementation>,
    stream_obfuscators: Registry<dyn StreamObfuscatorImplementation>,
    packet_obfuscators: Registry<dyn PacketObfuscatorImplementation>,
    packet_solutions: Registry<dyn PacketSolutionImplementation>,
    stream_solutions: Registry<dyn StreamSolutionImplementation>,
    addr_solutions: Registry<dyn AddrSolutionImplementation>,
}

impl Creators {
    /// Creates an isolated, empty set of registries.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            packet_conns: Registry::new(),
            stream_conns: Registry::new(),
            stream_adapters: Registry::new(),
            packet_adapters: Registry::new(),
            stream_obfuscators: Registry::new(),
            packet_obfuscators: Registry::new(),
            packet_solutions: Registry::new(),
            stream_solutions: Registry::new(),
            addr_solutions: Registry::new(),
        }
    }

    /// The process-wide registries.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_CREATORS)
    }

    /// Datagram transports.
    #[must_use]
    pub const fn packet_conns(&self) -> &Registry<dyn PacketConnImplementation> {
        &self.packet_conns
    }

    /// Stream transports.
    #[must_use]
    pub const fn stream_conns(&self) -> &Registry<dyn StreamConnImplementation> {
        &self.stream_conns
    }

    /// Stream-over-datagram adapters.
    #[must_use]
    pub const fn stream_adapters(&self) -> &Registry<dyn StreamAdapterImplementation> {
        &self.stream_adapters
    }

    /// Datagram-over-stream adapters.
    #[must_use]
    pub const fn packet_adapters(&self) -> &Registry<dyn PacketAdapterImplementation> {
        &self.packet_adapters
    }

    /// Stream obfuscators.
    #[must_use]
    pub const fn stream_obfuscators(&self) -> &Registry<dyn StreamObfuscatorImplementation> {
        &self.stream_obfuscators
    }

    /// Datagram obfuscators.
    #[must_use]
    pub const fn packet_obfuscators(&self) -> &Registry<dyn PacketObfuscatorImplementation> {
        &self.packet_obfuscators
    }

    /// Multiplexers over datagrams.
    #[must_use]
    pub const fn packet_solutions(&self) -> &Registry<dyn PacketSolutionImplementation> {
        &self.packet_solutions
    }

    /// Multiplexers over streams.
    #[must_use]
    pub const fn stream_solutions(&self) -> &Registry<dyn StreamSolutionImplementation> {
        &self.stream_solutions
    }

    /// Multiplexed transports bound directly to an address.
    #[must_use]
    pub const fn addr_solutions(&self) -> &Registry<dyn AddrSolutionImplementation> {
        &self.addr_solutions
    }
}
