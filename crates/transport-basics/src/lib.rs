//! Basic transport bindings: `tcp` streams, `udp` datagrams and the `nomux`
//! stream solution that presents one stream per connection as a
//! multiplexed socket.
//!
//! ```no_run
//! use muxsock_transport::{Creators, dial_uri};
//!
//! async fn example() -> muxsock_transport::Result<()> {
//!     let creators = Creators::global();
//!     muxsock_transport_basics::install(&creators);
//!     let socket = dial_uri(creators, "tcp+nomux://127.0.0.1:9000").await?;
//!     let _stream = socket.open_stream().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod nomux;
pub mod tcp;
pub mod udp;

use std::sync::Arc;

use muxsock_transport::Creators;
use once_cell::sync::Lazy;

pub use nomux::NomuxImplementation;
pub use tcp::TcpImplementation;
pub use udp::UdpImplementation;

static INSTALLED: Lazy<Arc<Creators>> = Lazy::new(|| {
    let creators = Creators::global();
    install(&creators);
    creators
});

/// Registers `tcp`, `udp` and `nomux` in `creators`, replacing any previous
/// registrations under those names.
pub fn install(creators: &Creators) {
    creators
        .stream_conns()
        .register(tcp::NAME, Arc::new(TcpImplementation));
    creators
        .packet_conns()
        .register(udp::NAME, Arc::new(UdpImplementation));
    creators
        .stream_solutions()
        .register(nomux::NAME, Arc::new(NomuxImplementation));
}

/// The global registries with the basic bindings installed once.
#[must_use]
pub fn global() -> Arc<Creators> {
    Arc::clone(&INSTALLED)
}
