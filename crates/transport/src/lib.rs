//! Composable transport chains.
//!
//! A short scheme such as `tcp+tls+yamux` names a stack of layers, bottom
//! first. This crate resolves the names against pluggable registries, folds
//! the layers into a single dial or listen producer, inserts default layers
//! where adjacent layers disagree on representation, and demultiplexes
//! multiplexed sockets back into one-stream-per-connection semantics.
//!
//! Concrete transports live in separate crates and register themselves in a
//! [`Creators`] instance.
//!
//! # Example
//!
//! ```no_run
//! use muxsock_transport::{Creators, Parameters, chaining::{ChainOptions, LayersChainer, MuxChainer}};
//!
//! async fn example() -> muxsock_transport::Result<()> {
//!     let chainer = MuxChainer::build(Creators::global(), "tcp+yamux", &ChainOptions::default())?;
//!     let dial = chainer.construct_dial_func("127.0.0.1:9000", &Parameters::new())?;
//!     let socket = dial().await?;
//!     let _stream = socket.open_stream().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod chaining;
pub mod creators;
pub mod defaults;
pub mod demuxer;
pub mod error;
pub mod legacy;
pub mod params;
pub mod registry;
pub mod types;
pub mod uri;

pub use creators::Creators;
pub use defaults::{DefaultLayerNames, DefaultLayers};
pub use error::{Error, Result};
pub use params::{CommonParams, ParameterHint, ParameterType, Parameters};
pub use registry::Registry;
pub use uri::{Endpoint, create_dialer, create_listener, dial_uri, listen_uri};
