//! Layer categories, their compatibility matrix and resolved layer descriptors.

use std::fmt;
use std::ops::{BitAnd, BitOr};
use std::sync::Arc;

use crate::params::ParameterHint;
use crate::types::{
    AddrSolutionImplementation, PacketAdapterImplementation, PacketConnImplementation,
    PacketObfuscatorImplementation, PacketSolutionImplementation, StreamAdapterImplementation,
    StreamConnImplementation, StreamObfuscatorImplementation, StreamSolutionImplementation,
};

/// Bitmask over the nine layer categories.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LayerType(u16);

impl LayerType {
    /// No category.
    pub const NONE: Self = Self(0);
    /// Datagram transport.
    pub const PACKET_CONN: Self = Self(0x01);
    /// Stream transport.
    pub const STREAM_CONN: Self = Self(0x02);
    /// Streams over datagrams.
    pub const STREAM_ADAPTER: Self = Self(0x04);
    /// Datagrams over streams.
    pub const PACKET_ADAPTER: Self = Self(0x08);
    /// Stream byte transformation.
    pub const STREAM_OBFUSCATOR: Self = Self(0x10);
    /// Datagram byte transformation.
    pub const PACKET_OBFUSCATOR: Self = Self(0x20);
    /// Multiplexing over datagrams.
    pub const PACKET_SOLUTION: Self = Self(0x40);
    /// Multiplexing over streams.
    pub const STREAM_SOLUTION: Self = Self(0x80);
    /// Multiplexed transport bound to an address.
    pub const ADDR_SOLUTION: Self = Self(0x100);

    /// Categories consuming a stream producer.
    pub const TAKING_STREAM: Self =
        Self(Self::PACKET_ADAPTER.0 | Self::STREAM_OBFUSCATOR.0 | Self::STREAM_SOLUTION.0);
    /// Categories consuming a datagram producer.
    pub const TAKING_PACKET: Self =
        Self(Self::STREAM_ADAPTER.0 | Self::PACKET_OBFUSCATOR.0 | Self::PACKET_SOLUTION.0);
    /// Categories consuming an address string.
    pub const TAKING_ADDR: Self =
        Self(Self::STREAM_CONN.0 | Self::PACKET_CONN.0 | Self::ADDR_SOLUTION.0);
    /// Categories producing a multiplexed socket.
    pub const MUXERS: Self =
        Self(Self::STREAM_SOLUTION.0 | Self::PACKET_SOLUTION.0 | Self::ADDR_SOLUTION.0);
    /// Categories that must sit at the bottom of a chain.
    pub const TRANSPORTS: Self =
        Self(Self::PACKET_CONN.0 | Self::STREAM_CONN.0 | Self::ADDR_SOLUTION.0);

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Whether every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// Whether `self` and `other` share any bit.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Whether this category produces a multiplexed socket.
    #[must_use]
    pub const fn is_muxer(self) -> bool {
        Self::MUXERS.contains(self)
    }

    /// Whether this category must sit at the bottom of a chain.
    #[must_use]
    pub const fn is_transport(self) -> bool {
        Self::TRANSPORTS.contains(self)
    }

    /// Categories allowed directly beneath `self`. [`LayerType::NONE`] for
    /// terminal categories.
    #[must_use]
    pub const fn compatible_below(self) -> Self {
        let stream_inputs = Self::STREAM_OBFUSCATOR.0
            | Self::STREAM_ADAPTER.0
            | Self::STREAM_CONN.0;
        let packet_inputs =
            Self::PACKET_OBFUSCATOR.0 | Self::PACKET_ADAPTER.0 | Self::PACKET_CONN.0;
        let muxers = Self::ADDR_SOLUTION.0 | Self::PACKET_SOLUTION.0 | Self::STREAM_SOLUTION.0;
        match self {
            Self::PACKET_ADAPTER | Self::STREAM_OBFUSCATOR => Self(stream_inputs | muxers),
            Self::PACKET_OBFUSCATOR | Self::STREAM_ADAPTER | Self::PACKET_SOLUTION => {
                Self(packet_inputs)
            }
            Self::STREAM_SOLUTION => Self(stream_inputs),
            _ => Self::NONE,
        }
    }

    /// Whether `below` may sit directly beneath `self`. A terminal category
    /// accepts only [`LayerType::NONE`] beneath it.
    #[must_use]
    pub const fn accepts_below(self, below: Self) -> bool {
        let allowed = self.compatible_below();
        if allowed.0 == 0 {
            below.0 == 0
        } else {
            allowed.intersects(below)
        }
    }

    /// Name of a single category.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NONE => "None",
            Self::PACKET_CONN => "PacketConn",
            Self::STREAM_CONN => "StreamConn",
            Self::STREAM_ADAPTER => "StreamAdapter",
            Self::PACKET_ADAPTER => "PacketAdapter",
            Self::STREAM_OBFUSCATOR => "StreamObfuscator",
            Self::PACKET_OBFUSCATOR => "PacketObfuscator",
            Self::PACKET_SOLUTION => "PacketSolution",
            Self::STREAM_SOLUTION => "StreamSolution",
            Self::ADDR_SOLUTION => "AddrSolution",
            _ => "Mixed",
        }
    }
}

impl BitOr for LayerType {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for LayerType {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerType({}, {:#x})", self.name(), self.0)
    }
}

/// Implementation handle, selected once by category.
#[derive(Clone)]
pub enum LayerImplementation {
    /// Datagram transport.
    PacketConn(Arc<dyn PacketConnImplementation>),
    /// Stream transport.
    StreamConn(Arc<dyn StreamConnImplementation>),
    /// Streams over datagrams.
    StreamAdapter(Arc<dyn StreamAdapterImplementation>),
    /// Datagrams over streams.
    PacketAdapter(Arc<dyn PacketAdapterImplementation>),
    /// Stream byte transformation.
    StreamObfuscator(Arc<dyn StreamObfuscatorImplementation>),
    /// Datagram byte transformation.
    PacketObfuscator(Arc<dyn PacketObfuscatorImplementation>),
    /// Multiplexing over datagrams.
    PacketSolution(Arc<dyn PacketSolutionImplementation>),
    /// Multiplexing over streams.
    StreamSolution(Arc<dyn StreamSolutionImplementation>),
    /// Multiplexed transport bound to an address.
    AddrSolution(Arc<dyn AddrSolutionImplementation>),
}

impl LayerImplementation {
    /// Category of the wrapped implementation.
    #[must_use]
    pub const fn layer_type(&self) -> LayerType {
        match self {
            Self::PacketConn(_) => LayerType::PACKET_CONN,
            Self::StreamConn(_) => LayerType::STREAM_CONN,
            Self::StreamAdapter(_) => LayerType::STREAM_ADAPTER,
            Self::PacketAdapter(_) => LayerType::PACKET_ADAPTER,
            Self::StreamObfuscator(_) => LayerType::STREAM_OBFUSCATOR,
            Self::PacketObfuscator(_) => LayerType::PACKET_OBFUSCATOR,
            Self::PacketSolution(_) => LayerType::PACKET_SOLUTION,
            Self::StreamSolution(_) => LayerType::STREAM_SOLUTION,
            Self::AddrSolution(_) => LayerType::ADDR_SOLUTION,
        }
    }

    /// Parameter hints of the wrapped implementation.
    #[must_use]
    pub fn parameter_hints(&self) -> Vec<ParameterHint> {
        match self {
            Self::PacketConn(imp) => imp.parameter_hints(),
            Self::StreamConn(imp) => imp.parameter_hints(),
            Self::StreamAdapter(imp) => imp.parameter_hints(),
            Self::PacketAdapter(imp) => imp.parameter_hints(),
            Self::StreamObfuscator(imp) => imp.parameter_hints(),
            Self::PacketObfuscator(imp) => imp.parameter_hints(),
            Self::PacketSolution(imp) => imp.parameter_hints(),
            Self::StreamSolution(imp) => imp.parameter_hints(),
            Self::AddrSolution(imp) => imp.parameter_hints(),
        }
    }
}

impl fmt::Debug for LayerImplementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LayerImplementation")
            .field(&self.layer_type())
            .finish()
    }
}

/// One resolved scheme token.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Token the layer was resolved from.
    pub implementation_name: String,
    /// The implementation, tagged by category.
    pub implementation: LayerImplementation,
    /// Occurrence index of this name within the chain.
    pub parameters_index: usize,
}

impl Layer {
    /// Category of the layer.
    #[must_use]
    pub const fn layer_type(&self) -> LayerType {
        self.implementation.layer_type()
    }

    /// Parameter section owned by this occurrence, `name[index]`.
    #[must_use]
    pub fn section(&self) -> String {
        format!("{}[{}]", self.implementation_name, self.parameters_index)
    }

    /// Whether `below` may sit directly beneath this layer. `None` stands for
    /// the bottom of the chain.
    #[must_use]
    pub fn is_compatible_with(&self, below: Option<&Self>) -> bool {
        self.layer_type()
            .accepts_below(below.map_or(LayerType::NONE, Self::layer_type))
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.section(), self.layer_type())
    }
}
