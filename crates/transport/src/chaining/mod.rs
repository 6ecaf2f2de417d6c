//! Scheme resolution and layer chaining.
//!
//! A scheme such as `tcp+tls+yamux` lists layers bottom first: TCP, wrapped
//! in TLS, wrapped in yamux. Every layer consumes the representation produced
//! by the one beneath it. Where the two disagree a default layer is inserted
//! (see [`cast`]), so `tls` alone runs over the default stream transport.

pub mod cast;
mod generic;
mod layer;
mod resolver;
mod typed;

pub use generic::GenericChainer;
pub use layer::{Layer, LayerImplementation, LayerType};
pub use resolver::{SCHEME_SEPARATOR, resolve_layer, resolve_layers, split_scheme};
pub use typed::{LayersChainer, MuxChainer, PacketChainer, StreamChainer};

use crate::defaults::DefaultLayerNames;

/// Options controlling how a chain is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainOptions {
    /// Try the all-in-one multiplexing categories first.
    pub enable_solutions: bool,
    /// Reject adjacent layers violating the compatibility matrix.
    pub enforce_compatibility: bool,
    /// Defaults inserted on representation mismatch.
    pub defaults: DefaultLayerNames,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            enable_solutions: true,
            enforce_compatibility: true,
            defaults: DefaultLayerNames::default(),
        }
    }
}

impl ChainOptions {
    /// Accept any adjacent pair and let the casts sort it out.
    #[must_use]
    pub fn permissive(mut self) -> Self {
        self.enforce_compatibility = false;
        self
    }

    /// Replaces the default layer names.
    #[must_use]
    pub fn with_defaults(mut self, defaults: DefaultLayerNames) -> Self {
        self.defaults = defaults;
        self
    }
}
