//! Dialing and listening from `scheme://host:port?params` URIs.

use std::sync::Arc;

use tracing::{debug, instrument};
use url::Url;

use crate::chaining::{ChainOptions, LayersChainer, MuxChainer};
use crate::creators::Creators;
use crate::error::{Error, Result};
use crate::params::Parameters;
use crate::types::{BoxMuxedListener, MuxDialFunc, MuxListenFunc, SharedMuxedSocket};

/// A parsed dial or listen URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Scheme, tokens joined by `+`.
    pub scheme: String,
    /// `host[:port]`, IPv6 hosts bracketed.
    pub address: String,
    /// Query parameters.
    pub parameters: Parameters,
}

impl Endpoint {
    /// Parses `uri`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidUri`] when the URI is malformed and
    /// [`Error::MissingPart`] when it has no host.
    pub fn parse(uri: &str) -> Result<Self> {
        let url = Url::parse(uri)?;
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| Error::MissingPart("host".to_string()))?;
        let address = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Ok(Self {
            scheme: url.scheme().to_string(),
            address,
            parameters: Parameters::from_url_query(&url),
        })
    }
}

/// Builds a reusable multiplexed dialer for `scheme` bound to `addr`.
///
/// Nothing is cached here. Callers that dial the same scheme often should
/// keep the returned producer, which resolves the chain only once.
///
/// # Errors
///
/// Propagates resolution and chaining failures.
pub fn create_dialer(
    creators: Arc<Creators>,
    scheme: &str,
    addr: &str,
    parameters: &Parameters,
) -> Result<MuxDialFunc> {
    MuxChainer::build(creators, scheme, &ChainOptions::default())?
        .construct_dial_func(addr, parameters)
}

/// Builds a reusable multiplexed listener producer for `scheme` bound to
/// `addr`. Like [`create_dialer`], the caller keeps the producer.
///
/// # Errors
///
/// Propagates resolution and chaining failures.
pub fn create_listener(
    creators: Arc<Creators>,
    scheme: &str,
    addr: &str,
    parameters: &Parameters,
) -> Result<MuxListenFunc> {
    MuxChainer::build(creators, scheme, &ChainOptions::default())?
        .construct_listen_func(addr, parameters)
}

/// Dials `uri` once.
///
/// # Errors
///
/// Configuration failures surface before any I/O, then dial failures.
#[instrument(skip(creators))]
pub async fn dial_uri(creators: Arc<Creators>, uri: &str) -> Result<SharedMuxedSocket> {
    let endpoint = Endpoint::parse(uri)?;
    let dialer = create_dialer(
        creators,
        &endpoint.scheme,
        &endpoint.address,
        &endpoint.parameters,
    )?;
    debug!(scheme = %endpoint.scheme, address = %endpoint.address, "dialing");
    dialer().await
}

/// Listens on `uri`.
///
/// # Errors
///
/// Configuration failures surface before any I/O, then bind failures.
#[instrument(skip(creators))]
pub async fn listen_uri(creators: Arc<Creators>, uri: &str) -> Result<BoxMuxedListener> {
    let endpoint = Endpoint::parse(uri)?;
    let listener = create_listener(
        creators,
        &endpoint.scheme,
        &endpoint.address,
        &endpoint.parameters,
    )?;
    debug!(scheme = %endpoint.scheme, address = %endpoint.address, "listening");
    listener().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scheme_address_and_query() {
        let endpoint = Endpoint::parse("tcp+tls+yamux://127.0.0.1:9000?timeout=2s").unwrap();
        assert_eq!(endpoint.scheme, "tcp+tls+yamux");
        assert_eq!(endpoint.address, "127.0.0.1:9000");
        assert_eq!(endpoint.parameters.get("timeout"), Some("2s"));
    }

    #[test]
    fn keeps_ipv6_brackets() {
        let endpoint = Endpoint::parse("tcp://[::1]:443").unwrap();
        assert_eq!(endpoint.address, "[::1]:443");
    }

    #[test]
    fn rejects_missing_host() {
        let err = Endpoint::parse("tcp:relative").unwrap_err();
        assert!(matches!(err, Error::MissingPart(_)));
        assert!(err.is_configuration());

        let err = Endpoint::parse("not a uri").unwrap_err();
        assert!(matches!(err, Error::InvalidUri(_)));
    }

    #[tokio::test]
    async fn unknown_scheme_fails_before_io() {
        let err = dial_uri(Arc::new(Creators::new()), "nosuch+tcp://127.0.0.1:1")
            .await
            .err().expect("expected an error");
        assert!(matches!(err, Error::SchemeNotSupported(name) if name == "tcp"));
    }
}
