//! Error types for layer resolution, chaining and socket operations.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::types::RepresentationKind;

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for transport operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A scheme token matches no eligible registered implementation.
    #[error("scheme not supported: {0}")]
    SchemeNotSupported(String),

    /// No cast rule bridges the available representation to the needed one.
    #[error("invalid chaining result: need {need}, have {have}")]
    InvalidChainingResult {
        /// Representation the next step requires.
        need: RepresentationKind,
        /// Representation the chain produced so far.
        have: RepresentationKind,
    },

    /// Two adjacent layers violate the compatibility matrix.
    #[error("incompatible chain of layers: {above} cannot sit on top of {below}")]
    IncompatibleLayers {
        /// The upper layer, rendered as `name[index] (category)`.
        above: String,
        /// The layer directly beneath it.
        below: String,
    },

    /// Redial requested on a socket that stores no dial recipe.
    #[error("redial not supported")]
    RedialNotSupported,

    /// Optional capability requested on an implementation lacking it.
    #[error("operation not supported: {0}")]
    OpNotSupported(&'static str),

    /// A required companion configuration value is absent.
    #[error("missing part: {0}")]
    MissingPart(String),

    /// The socket, listener or demuxer has been closed.
    #[error("use of closed network connection")]
    Closed,

    /// Operation timed out.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// An address could not be parsed or does not fit the transport.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A dial/listen URI could not be parsed.
    #[error("invalid uri: {0}")]
    InvalidUri(#[from] url::ParseError),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether the error was raised while building a chain, before any network I/O.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::SchemeNotSupported(_)
                | Self::InvalidChainingResult { .. }
                | Self::IncompatibleLayers { .. }
                | Self::MissingPart(_)
                | Self::InvalidUri(_)
        )
    }

    /// Whether the error reports a closed socket or listener.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::Closed => Self::new(io::ErrorKind::NotConnected, err),
            Error::Timeout(_) => Self::new(io::ErrorKind::TimedOut, err),
            Error::OpNotSupported(_) | Error::RedialNotSupported => {
                Self::new(io::ErrorKind::Unsupported, err)
            }
            other => Self::other(other),
        }
    }
}
