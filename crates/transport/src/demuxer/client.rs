use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use super::{DEFAULT_STREAMS_PER_CONNECTION, PARAM_STREAMS_PER_CONNECTION};
use crate::error::Result;
use crate::params::Parameters;
use crate::types::{BoxStreamConn, MuxDialFunc, SharedMuxedSocket, StreamDialFunc, stream_dial_fn};

/// Wraps a multiplexed dialer into a plain stream dialer.
#[must_use]
pub fn demux_dialer(dial_func: MuxDialFunc, parameters: &Parameters) -> StreamDialFunc {
    let demuxer = Arc::new(ClientDemuxer::new(dial_func, parameters));
    stream_dial_fn(move || {
        let demuxer = Arc::clone(&demuxer);
        async move { demuxer.dial().await }
    })
}

#[derive(Default)]
struct ClientState {
    connection: Option<SharedMuxedSocket>,
    current_iteration: usize,
}

/// Opens logical streams over a rotating multiplexed connection.
///
/// A new physical connection is dialed on every `streams_per_connection`-th
/// call, when none exists yet, or when the live one has closed. All other
/// calls open one more stream on the live connection. Calls are serialized.
pub struct ClientDemuxer {
    streams_per_connection: usize,
    dial_func: MuxDialFunc,
    state: Mutex<ClientState>,
}

impl ClientDemuxer {
    /// Reads `streamsperconn` from `parameters`. Zero is treated as one.
    #[must_use]
    pub fn new(dial_func: MuxDialFunc, parameters: &Parameters) -> Self {
        let streams_per_connection = parameters
            .integer(PARAM_STREAMS_PER_CONNECTION, DEFAULT_STREAMS_PER_CONNECTION)
            .max(1);
        Self {
            streams_per_connection,
            dial_func,
            state: Mutex::new(ClientState::default()),
        }
    }

    /// Streams opened per physical connection before rotating.
    #[must_use]
    pub const fn streams_per_connection(&self) -> usize {
        self.streams_per_connection
    }

    /// Opens one logical stream. The rotation counter advances even when the
    /// call fails.
    ///
    /// # Errors
    ///
    /// Propagates dial and open-stream failures.
    pub async fn dial(&self) -> Result<BoxStreamConn> {
        let mut state = self.state.lock().await;
        state.current_iteration %= self.streams_per_connection;
        let result = self.dial_locked(&mut state).await;
        state.current_iteration += 1;
        result
    }

    async fn dial_locked(&self, state: &mut ClientState) -> Result<BoxStreamConn> {
        let connection = self.reconnect_if_needed(state).await?;
        connection.open_stream().await
    }

    async fn reconnect_if_needed(&self, state: &mut ClientState) -> Result<SharedMuxedSocket> {
        let reconnect = state.current_iteration == 0
            || state
                .connection
                .as_ref()
                .is_none_or(|connection| connection.is_closed());
        if let (false, Some(connection)) = (reconnect, &state.connection) {
            return Ok(Arc::clone(connection));
        }

        debug!(
            iteration = state.current_iteration,
            "dialing new multiplexed connection"
        );
        let connection = (self.dial_func)().await?;
        state.connection = Some(Arc::clone(&connection));
        Ok(connection)
    }
}
