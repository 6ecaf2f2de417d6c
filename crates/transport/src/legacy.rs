//! Helpers for the older address-resolution path, where `secure` or `tls`
//! is a flag asking for TLS around the transport rather than a named layer.

use std::net::{IpAddr, SocketAddr};

use crate::error::{Error, Result};
use crate::types::Address;

/// Tokens read as the TLS flag.
pub const SECURE_TOKENS: [&str; 2] = ["secure", "tls"];

/// Removes the first `secure`/`tls` token, preserving the order of the rest,
/// and reports whether one was present.
#[must_use]
pub fn split_secure_flag(mut tokens: Vec<String>) -> (Vec<String>, bool) {
    match tokens
        .iter()
        .position(|token| SECURE_TOKENS.contains(&token.as_str()))
    {
        Some(position) => {
            tokens.remove(position);
            (tokens, true)
        }
        None => (tokens, false),
    }
}

/// Parses `ip[:port]` for `transport`. The port defaults to 0. `tcp` and
/// `udp` yield socket addresses, other transports an opaque named address.
///
/// # Errors
///
/// [`Error::InvalidAddress`] when the host is not an IP literal or the port
/// is not a number.
pub fn transport_addr(transport: &str, host_port: &str) -> Result<Address> {
    let (host, port) = match host_port.rsplit_once(':') {
        Some((host, port)) if !host.ends_with(':') => (host, port),
        _ => (host_port, "0"),
    };
    let ip: IpAddr = host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .map_err(|_| Error::InvalidAddress(format!("invalid ip address: {host_port}")))?;
    let port: u16 = port
        .parse()
        .map_err(|_| Error::InvalidAddress(format!("invalid port: {host_port}")))?;

    Ok(match transport {
        "tcp" | "udp" => Address::socket(transport, SocketAddr::new(ip, port)),
        _ => Address::Named {
            network: transport.to_string(),
            host: host_port.to_string(),
            port,
        },
    })
}
