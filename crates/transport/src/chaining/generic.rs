//! Folds resolved layers into a single producer.

use std::sync::Arc;

use tracing::debug;

use super::ChainOptions;
use super::cast;
use super::layer::{Layer, LayerImplementation};
use super::resolver::resolve_layers;
use crate::creators::Creators;
use crate::defaults::DefaultLayers;
use crate::error::{Error, Result};
use crate::params::{ParameterHint, Parameters};
use crate::types::{DialRepresentation, ListenRepresentation, Representation, RepresentationKind};

/// Builds dial and listen producers from a resolved chain without fixing the
/// final representation.
#[derive(Debug, Clone)]
pub struct GenericChainer {
    layers: Vec<Layer>,
    defaults: DefaultLayers,
}

impl GenericChainer {
    /// Resolves `tokens` against `creators`.
    ///
    /// # Errors
    ///
    /// Propagates resolution failures.
    pub fn new(creators: Arc<Creators>, tokens: &[String], options: &ChainOptions) -> Result<Self> {
        let layers = resolve_layers(
            &creators,
            tokens,
            options.enable_solutions,
            options.enforce_compatibility,
        )?;
        Ok(Self::from_layers(
            layers,
            DefaultLayers::new(creators, options.defaults.clone()),
        ))
    }

    /// Chains already resolved layers, index 0 being the bottom.
    #[must_use]
    pub const fn from_layers(layers: Vec<Layer>, defaults: DefaultLayers) -> Self {
        Self { layers, defaults }
    }

    /// The resolved layers, bottom first.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Defaults consulted on representation mismatch.
    #[must_use]
    pub const fn defaults(&self) -> &DefaultLayers {
        &self.defaults
    }

    /// Parameter hints per layer section, bottom first.
    #[must_use]
    pub fn parameter_hints(&self) -> Vec<(String, Vec<ParameterHint>)> {
        self.layers
            .iter()
            .map(|layer| (layer.section(), layer.implementation.parameter_hints()))
            .collect()
    }

    /// Builds the dialing side bound to `addr`. Returns the producer together
    /// with the chain-wide common parameters.
    ///
    /// # Errors
    ///
    /// The first cast mismatch or layer construction failure aborts the build.
    pub fn construct_dial_func(
        &self,
        addr: &str,
        parameters: &Parameters,
    ) -> Result<(DialRepresentation, Parameters)> {
        let (sections, common) = self.split_parameters(parameters);
        let mut result = DialRepresentation::Addr(addr.to_string());
        for (layer, section) in self.layers.iter().zip(&sections) {
            debug!(layer = %layer, input = %result.kind(), "applying client layer");
            result = self.apply_client_layer(layer, result, section, &common)?;
        }
        Ok((result, common))
    }

    /// Builds the listening side bound to `addr`. Returns the producer
    /// together with the chain-wide common parameters.
    ///
    /// # Errors
    ///
    /// The first cast mismatch or layer construction failure aborts the build.
    pub fn construct_listen_func(
        &self,
        addr: &str,
        parameters: &Parameters,
    ) -> Result<(ListenRepresentation, Parameters)> {
        let (sections, common) = self.split_parameters(parameters);
        let mut result = ListenRepresentation::Addr(addr.to_string());
        for (layer, section) in self.layers.iter().zip(&sections) {
            debug!(layer = %layer, input = %result.kind(), "applying server layer");
            result = self.apply_server_layer(layer, result, section, &common)?;
        }
        Ok((result, common))
    }

    fn split_parameters(&self, parameters: &Parameters) -> (Vec<Parameters>, Parameters) {
        let sections = self
            .layers
            .iter()
            .map(|layer| parameters.section_with_common(&layer.section()))
            .collect();
        (sections, parameters.common())
    }

    fn apply_client_layer(
        &self,
        layer: &Layer,
        input: DialRepresentation,
        parameters: &Parameters,
        common: &Parameters,
    ) -> Result<DialRepresentation> {
        let defaults = &self.defaults;
        Ok(match &layer.implementation {
            LayerImplementation::PacketAdapter(imp) => Representation::Packet(
                imp.client(cast::stream_dial_func(input, defaults, common)?, parameters)?,
            ),
            LayerImplementation::StreamObfuscator(imp) => Representation::Stream(
                imp.client(cast::stream_dial_func(input, defaults, common)?, parameters)?,
            ),
            LayerImplementation::StreamSolution(imp) => Representation::Muxed(
                imp.client(cast::stream_dial_func(input, defaults, common)?, parameters)?,
            ),
            LayerImplementation::StreamAdapter(imp) => Representation::Stream(
                imp.client(cast::packet_dial_func(input, defaults, common)?, parameters)?,
            ),
            LayerImplementation::PacketObfuscator(imp) => Representation::Packet(
                imp.client(cast::packet_dial_func(input, defaults, common)?, parameters)?,
            ),
            LayerImplementation::PacketSolution(imp) => Representation::Muxed(
                imp.client(cast::packet_dial_func(input, defaults, common)?, parameters)?,
            ),
            LayerImplementation::StreamConn(imp) => {
                Representation::Stream(imp.client(&expect_addr(input)?, parameters)?)
            }
            LayerImplementation::PacketConn(imp) => {
                Representation::Packet(imp.client(&expect_addr(input)?, parameters)?)
            }
            LayerImplementation::AddrSolution(imp) => {
                Representation::Muxed(imp.client(&expect_addr(input)?, parameters)?)
            }
        })
    }

    fn apply_server_layer(
        &self,
        layer: &Layer,
        input: ListenRepresentation,
        parameters: &Parameters,
        common: &Parameters,
    ) -> Result<ListenRepresentation> {
        let defaults = &self.defaults;
        Ok(match &layer.implementation {
            LayerImplementation::PacketAdapter(imp) => Representation::Packet(
                imp.server(cast::stream_listen_func(input, defaults, common)?, parameters)?,
            ),
            LayerImplementation::StreamObfuscator(imp) => Representation::Stream(
                imp.server(cast::stream_listen_func(input, defaults, common)?, parameters)?,
            ),
            LayerImplementation::StreamSolution(imp) => Representation::Muxed(
                imp.server(cast::stream_listen_func(input, defaults, common)?, parameters)?,
            ),
            LayerImplementation::StreamAdapter(imp) => Representation::Stream(
                imp.server(cast::packet_listen_func(input, defaults, common)?, parameters)?,
            ),
            LayerImplementation::PacketObfuscator(imp) => Representation::Packet(
                imp.server(cast::packet_listen_func(input, defaults, common)?, parameters)?,
            ),
            LayerImplementation::PacketSolution(imp) => Representation::Muxed(
                imp.server(cast::packet_listen_func(input, defaults, common)?, parameters)?,
            ),
            LayerImplementation::StreamConn(imp) => {
                Representation::Stream(imp.server(&expect_addr(input)?, parameters)?)
            }
            LayerImplementation::PacketConn(imp) => {
                Representation::Packet(imp.server(&expect_addr(input)?, parameters)?)
            }
            LayerImplementation::AddrSolution(imp) => {
                Representation::Muxed(imp.server(&expect_addr(input)?, parameters)?)
            }
        })
    }
}

/// Terminal transports only accept the bare address.
fn expect_addr<P, S, M>(input: Representation<P, S, M>) -> Result<String> {
    match input {
        Representation::Addr(addr) => Ok(addr),
        other => Err(Error::InvalidChainingResult {
            need: RepresentationKind::Addr,
            have: other.kind(),
        }),
    }
}
