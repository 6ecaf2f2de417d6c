//! Implementations inserted implicitly when adjacent layers disagree on
//! representation.

use std::sync::Arc;

use crate::creators::Creators;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::types::{
    PacketAdapterImplementation, PacketConnImplementation, PacketSolutionImplementation,
    StreamAdapterImplementation, StreamConnImplementation, StreamSolutionImplementation,
};

/// Default datagram transport.
pub const DEFAULT_PACKET_CONN: &str = "udp";
/// Default stream transport.
pub const DEFAULT_STREAM_CONN: &str = "tcp";
/// Default multiplexer over streams.
pub const DEFAULT_STREAM_SOLUTION: &str = "nomux";
/// Default multiplexer over datagrams.
pub const DEFAULT_PACKET_SOLUTION: &str = "quic";
/// Default stream-over-datagram adapter.
pub const DEFAULT_STREAM_ADAPTER: &str = "kcp";
/// Default datagram-over-stream adapter (session-based packets over streams).
pub const DEFAULT_PACKET_ADAPTER: &str = "spos";

/// Names of the default implementation per adaptable category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultLayerNames {
    /// Used when a datagram producer is needed from an address.
    pub packet_conn: String,
    /// Used when a stream producer is needed from an address.
    pub stream_conn: String,
    /// Used when a multiplexed producer is needed from streams.
    pub stream_solution: String,
    /// Used when a multiplexed producer is needed from datagrams.
    pub packet_solution: String,
    /// Used when streams are needed from datagrams.
    pub stream_adapter: String,
    /// Used when datagrams are needed from streams.
    pub packet_adapter: String,
}

impl Default for DefaultLayerNames {
    fn default() -> Self {
        Self {
            packet_conn: DEFAULT_PACKET_CONN.to_string(),
            stream_conn: DEFAULT_STREAM_CONN.to_string(),
            stream_solution: DEFAULT_STREAM_SOLUTION.to_string(),
            packet_solution: DEFAULT_PACKET_SOLUTION.to_string(),
            stream_adapter: DEFAULT_STREAM_ADAPTER.to_string(),
            packet_adapter: DEFAULT_PACKET_ADAPTER.to_string(),
        }
    }
}

/// Default names bound to a set of registries.
///
/// Lookups happen only when a cast needs the default, so a chain that never
/// mismatches works even when no defaults are registered.
#[derive(Debug, Clone)]
pub struct DefaultLayers {
    creators: Arc<Creators>,
    names: DefaultLayerNames,
}

impl DefaultLayers {
    /// Binds `names` to `creators`.
    #[must_use]
    pub const fn new(creators: Arc<Creators>, names: DefaultLayerNames) -> Self {
        Self { creators, names }
    }

    /// The configured names.
    #[must_use]
    pub const fn names(&self) -> &DefaultLayerNames {
        &self.names
    }

    /// Default datagram transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemeNotSupported`] when the name is not registered.
    pub fn packet_conn(&self) -> Result<Arc<dyn PacketConnImplementation>> {
        lookup(self.creators.packet_conns(), &self.names.packet_conn)
    }

    /// Default stream transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemeNotSupported`] when the name is not registered.
    pub fn stream_conn(&self) -> Result<Arc<dyn StreamConnImplementation>> {
        lookup(self.creators.stream_conns(), &self.names.stream_conn)
    }

    /// Default multiplexer over streams.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemeNotSupported`] when the name is not registered.
    pub fn stream_solution(&self) -> Result<Arc<dyn StreamSolutionImplementation>> {
        lookup(self.creators.stream_solutions(), &self.names.stream_solution)
    }

    /// Default multiplexer over datagrams.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemeNotSupported`] when the name is not registered.
    pub fn packet_solution(&self) -> Result<Arc<dyn PacketSolutionImplementation>> {
        lookup(self.creators.packet_solutions(), &self.names.packet_solution)
    }

    /// Default stream-over-datagram adapter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemeNotSupported`] when the name is not registered.
    pub fn stream_adapter(&self) -> Result<Arc<dyn StreamAdapterImplementation>> {
        lookup(self.creators.stream_adapters(), &self.names.stream_adapter)
    }

    /// Default datagram-over-stream adapter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemeNotSupported`] when the name is not registered.
    pub fn packet_adapter(&self) -> Result<Arc<dyn PacketAdapterImplementation>> {
        lookup(self.creators.packet_adapters(), &self.names.packet_adapter)
    }
}

fn lookup<T: ?Sized>(registry: &Registry<T>, name: &str) -> Result<Arc<T>> {
    registry
        .get(name)
        .ok_or_else(|| Error::SchemeNotSupported(name.to_string()))
}
