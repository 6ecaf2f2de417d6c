//! Coercions between representations, inserting default layers on mismatch.
//!
//! | need    | have    | action                                   |
//! |---------|---------|------------------------------------------|
//! | stream  | muxed   | demultiplex                              |
//! | stream  | packet  | default stream adapter                   |
//! | stream  | address | default stream transport                 |
//! | packet  | stream  | default packet adapter                   |
//! | packet  | muxed   | demultiplex, then default packet adapter |
//! | packet  | address | default packet transport                 |
//! | muxed   | stream  | default stream solution                  |
//! | muxed   | packet  | default packet solution                  |
//!
//! Matching representations pass through and every other pair fails with
//! [`Error::InvalidChainingResult`]. The listening side mirrors the dialing
//! side.

use crate::defaults::DefaultLayers;
use crate::demuxer::{demux_dialer, demux_listener};
use crate::error::{Error, Result};
use crate::params::Parameters;
use crate::types::{
    DialRepresentation, ListenRepresentation, MuxDialFunc, MuxListenFunc, PacketConnFunc,
    Representation, RepresentationKind, StreamDialFunc, StreamListenFunc,
};

const fn mismatch(need: RepresentationKind, have: RepresentationKind) -> Error {
    Error::InvalidChainingResult { need, have }
}

/// Coerces a dialing representation into a datagram producer.
///
/// # Errors
///
/// Fails when a needed default is not registered or its construction fails.
pub fn packet_dial_func(
    input: DialRepresentation,
    defaults: &DefaultLayers,
    common: &Parameters,
) -> Result<PacketConnFunc> {
    match input {
        Representation::Packet(packet) => Ok(packet),
        Representation::Stream(stream) => defaults.packet_adapter()?.client(stream, common),
        Representation::Muxed(muxed) => defaults
            .packet_adapter()?
            .client(demux_dialer(muxed, common), common),
        Representation::Addr(addr) => defaults.packet_conn()?.client(&addr, common),
    }
}

/// Coerces a dialing representation into a stream producer.
///
/// # Errors
///
/// Fails when a needed default is not registered or its construction fails.
pub fn stream_dial_func(
    input: DialRepresentation,
    defaults: &DefaultLayers,
    common: &Parameters,
) -> Result<StreamDialFunc> {
    match input {
        Representation::Stream(stream) => Ok(stream),
        Representation::Muxed(muxed) => Ok(demux_dialer(muxed, common)),
        Representation::Packet(packet) => defaults.stream_adapter()?.client(packet, common),
        Representation::Addr(addr) => defaults.stream_conn()?.client(&addr, common),
    }
}

/// Coerces a dialing representation into a multiplexed producer.
///
/// # Errors
///
/// [`Error::InvalidChainingResult`] for a bare address, otherwise fails when
/// a needed default is not registered or its construction fails.
pub fn mux_dial_func(
    input: DialRepresentation,
    defaults: &DefaultLayers,
    common: &Parameters,
) -> Result<MuxDialFunc> {
    match input {
        Representation::Muxed(muxed) => Ok(muxed),
        Representation::Stream(stream) => defaults.stream_solution()?.client(stream, common),
        Representation::Packet(packet) => defaults.packet_solution()?.client(packet, common),
        Representation::Addr(_) => Err(mismatch(RepresentationKind::Muxed, input.kind())),
    }
}

/// Coerces a listening representation into a datagram producer.
///
/// # Errors
///
/// Fails when a needed default is not registered or its construction fails.
pub fn packet_listen_func(
    input: ListenRepresentation,
    defaults: &DefaultLayers,
    common: &Parameters,
) -> Result<PacketConnFunc> {
    match input {
        Representation::Packet(packet) => Ok(packet),
        Representation::Stream(stream) => defaults.packet_adapter()?.server(stream, common),
        Representation::Muxed(muxed) => defaults
            .packet_adapter()?
            .server(demux_listener(muxed, common), common),
        Representation::Addr(addr) => defaults.packet_conn()?.server(&addr, common),
    }
}

/// Coerces a listening representation into a stream producer.
///
/// # Errors
///
/// Fails when a needed default is not registered or its construction fails.
pub fn stream_listen_func(
    input: ListenRepresentation,
    defaults: &DefaultLayers,
    common: &Parameters,
) -> Result<StreamListenFunc> {
    match input {
        Representation::Stream(stream) => Ok(stream),
        Representation::Muxed(muxed) => Ok(demux_listener(muxed, common)),
        Representation::Packet(packet) => defaults.stream_adapter()?.server(packet, common),
        Representation::Addr(addr) => defaults.stream_conn()?.server(&addr, common),
    }
}

/// Coerces a listening representation into a multiplexed producer.
///
/// # Errors
///
/// [`Error::InvalidChainingResult`] for a bare address, otherwise fails when
/// a needed default is not registered or its construction fails.
pub fn mux_listen_func(
    input: ListenRepresentation,
    defaults: &DefaultLayers,
    common: &Parameters,
) -> Result<MuxListenFunc> {
    match input {
        Representation::Muxed(muxed) => Ok(muxed),
        Representation::Stream(stream) => defaults.stream_solution()?.server(stream, common),
        Representation::Packet(packet) => defaults.packet_solution()?.server(packet, common),
        Representation::Addr(_) => Err(mismatch(RepresentationKind::Muxed, input.kind())),
    }
}
