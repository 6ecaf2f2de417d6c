//! Chainers producing one fixed representation.

use std::sync::Arc;

use super::ChainOptions;
use super::cast;
use super::generic::GenericChainer;
use super::resolver::split_scheme;
use crate::creators::Creators;
use crate::error::Result;
use crate::params::Parameters;
use crate::types::{MuxDialFunc, MuxListenFunc, PacketConnFunc, StreamDialFunc, StreamListenFunc};

/// Builds producers of one representation from a scheme.
pub trait LayersChainer: Sized {
    /// Dialing producer type.
    type DialFunc;
    /// Listening producer type.
    type ListenFunc;

    /// Wraps a generic chainer.
    fn from_generic(chainer: GenericChainer) -> Self;

    /// The underlying generic chainer.
    fn generic(&self) -> &GenericChainer;

    /// Resolves `scheme` (tokens joined by `+`) against `creators`.
    ///
    /// # Errors
    ///
    /// Propagates resolution failures.
    fn build(creators: Arc<Creators>, scheme: &str, options: &ChainOptions) -> Result<Self> {
        GenericChainer::new(creators, &split_scheme(scheme), options).map(Self::from_generic)
    }

    /// Builds the dialing producer bound to `addr`.
    ///
    /// # Errors
    ///
    /// Fails on the first cast mismatch or layer construction error.
    fn construct_dial_func(&self, addr: &str, parameters: &Parameters) -> Result<Self::DialFunc>;

    /// Builds the listening producer bound to `addr`.
    ///
    /// # Errors
    ///
    /// Fails on the first cast mismatch or layer construction error.
    fn construct_listen_func(
        &self,
        addr: &str,
        parameters: &Parameters,
    ) -> Result<Self::ListenFunc>;
}

macro_rules! typed_chainer {
    (
        $(#[$doc:meta])*
        $name:ident, $dial:ty, $listen:ty, $dial_cast:path, $listen_cast:path
    ) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            backend: GenericChainer,
        }

        impl LayersChainer for $name {
            type DialFunc = $dial;
            type ListenFunc = $listen;

            fn from_generic(chainer: GenericChainer) -> Self {
                Self { backend: chainer }
            }

            fn generic(&self) -> &GenericChainer {
                &self.backend
            }

            fn construct_dial_func(
                &self,
                addr: &str,
                parameters: &Parameters,
            ) -> Result<Self::DialFunc> {
                let (result, common) = self.backend.construct_dial_func(addr, parameters)?;
                $dial_cast(result, self.backend.defaults(), &common)
            }

            fn construct_listen_func(
                &self,
                addr: &str,
                parameters: &Parameters,
            ) -> Result<Self::ListenFunc> {
                let (result, common) = self.backend.construct_listen_func(addr, parameters)?;
                $listen_cast(result, self.backend.defaults(), &common)
            }
        }
    };
}

typed_chainer!(
    /// Produces multiplexed sockets and listeners.
    MuxChainer,
    MuxDialFunc,
    MuxListenFunc,
    cast::mux_dial_func,
    cast::mux_listen_func
);

typed_chainer!(
    /// Produces plain stream connections and listeners, demultiplexing when
    /// the chain ends in a multiplexer.
    StreamChainer,
    StreamDialFunc,
    StreamListenFunc,
    cast::stream_dial_func,
    cast::stream_listen_func
);

typed_chainer!(
    /// Produces datagram sockets on both sides.
    PacketChainer,
    PacketConnFunc,
    PacketConnFunc,
    cast::packet_dial_func,
    cast::packet_listen_func
);
