use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, warn};

use super::{DEFAULT_BACKLOG, PARAM_BACKLOG};
use crate::error::{Error, Result};
use crate::params::Parameters;
use crate::types::{
    Address, BoxStreamConn, BoxStreamListener, MuxListenFunc, MuxedListener, SharedMuxedSocket,
    StreamListenFunc, StreamListener, stream_listen_fn,
};

/// Wraps a multiplexed listener producer into a plain stream listener
/// producer.
#[must_use]
pub fn demux_listener(listen_func: MuxListenFunc, parameters: &Parameters) -> StreamListenFunc {
    let demuxer = Arc::new(ServerDemuxer::new(listen_func, parameters));
    stream_listen_fn(move || {
        let demuxer = Arc::clone(&demuxer);
        async move { demuxer.listen().await }
    })
}

/// Binds multiplexed listeners and starts a [`ListenerDemuxer`] on each.
pub struct ServerDemuxer {
    listen_func: MuxListenFunc,
    stream_accept_backlog: usize,
}

impl ServerDemuxer {
    /// Reads `backlog` from `parameters`. Zero is treated as one.
    #[must_use]
    pub fn new(listen_func: MuxListenFunc, parameters: &Parameters) -> Self {
        Self {
            listen_func,
            stream_accept_backlog: parameters.integer(PARAM_BACKLOG, DEFAULT_BACKLOG).max(1),
        }
    }

    /// Capacity of the accepted-stream queue.
    #[must_use]
    pub const fn backlog(&self) -> usize {
        self.stream_accept_backlog
    }

    /// Binds the multiplexed listener and starts demultiplexing it.
    ///
    /// # Errors
    ///
    /// Propagates the listener's bind failure.
    pub async fn listen(&self) -> Result<BoxStreamListener> {
        let listener = (self.listen_func)().await?;
        Ok(Box::new(ListenerDemuxer::start(
            Arc::from(listener),
            self.stream_accept_backlog,
        )))
    }
}

/// Plain stream listener fed by every logical stream of every accepted
/// multiplexed connection.
///
/// One worker accepts multiplexed connections, and one worker per connection
/// accepts its streams into a shared bounded backlog. Streams of one
/// connection keep their acceptance order. Across connections there is no
/// total order: a full backlog parks every worker and parked workers are
/// admitted first come, first served as slots free up.
pub struct ListenerDemuxer {
    listener: Arc<dyn MuxedListener>,
    backlog: flume::Receiver<BoxStreamConn>,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl ListenerDemuxer {
    /// Starts accepting from `listener` into a queue of `backlog` streams.
    #[must_use]
    pub fn start(listener: Arc<dyn MuxedListener>, backlog: usize) -> Self {
        let shutdown = listener.close_signal().child_token();
        let (sender, receiver) = flume::bounded(backlog.max(1));
        let tasks = TaskTracker::new();

        info!(addr = %listener.addr(), backlog, "demultiplexing listener");
        tasks.spawn(accept_muxed_worker(
            Arc::clone(&listener),
            sender,
            shutdown.clone(),
            tasks.clone(),
        ));

        Self {
            listener,
            backlog: receiver,
            shutdown,
            tasks,
        }
    }

    /// Number of workers still running.
    #[must_use]
    pub fn active_workers(&self) -> usize {
        self.tasks.len()
    }

    /// Number of accepted streams waiting in the backlog.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.backlog.len()
    }
}

#[async_trait]
impl StreamListener for ListenerDemuxer {
    async fn accept_conn(&self) -> Result<BoxStreamConn> {
        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => Err(Error::Closed),
            stream = self.backlog.recv_async() => stream.map_err(|_| Error::Closed),
        }
    }

    fn addr(&self) -> Address {
        self.listener.addr()
    }

    fn close_signal(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    #[instrument(skip(self))]
    async fn close(&self) -> Result<()> {
        self.shutdown.cancel();
        let result = self.listener.close().await;
        self.tasks.close();
        self.tasks.wait().await;
        info!("demultiplexing listener closed");
        result
    }
}

impl Drop for ListenerDemuxer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn accept_muxed_worker(
    listener: Arc<dyn MuxedListener>,
    backlog: flume::Sender<BoxStreamConn>,
    shutdown: CancellationToken,
    tasks: TaskTracker,
) {
    loop {
        let accepted = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            accepted = listener.accept_muxed() => accepted,
        };
        match accepted {
            Ok(socket) => {
                debug!(remote = %socket.remote_addr(), "accepted multiplexed connection");
                tasks.spawn(accept_streams_worker(
                    socket,
                    backlog.clone(),
                    shutdown.clone(),
                ));
            }
            Err(e) => {
                debug!("multiplexed accept failed, shutting down: {e}");
                shutdown.cancel();
                break;
            }
        }
    }
}

async fn accept_streams_worker(
    socket: SharedMuxedSocket,
    backlog: flume::Sender<BoxStreamConn>,
    shutdown: CancellationToken,
) {
    let remote = socket.remote_addr();
    loop {
        let accepted = tokio::select! {
            biased;
            () = shutdown.cancelled() => return,
            accepted = socket.accept_stream() => accepted,
        };
        let stream = match accepted {
            Ok(stream) => stream,
            Err(e) => {
                if socket.is_closed() {
                    debug!(%remote, "multiplexed connection closed: {e}");
                } else {
                    warn!(%remote, "stream accept failed, closing connection: {e}");
                    if let Err(e) = socket.close().await {
                        debug!(%remote, "close after failed accept: {e}");
                    }
                }
                return;
            }
        };
        debug!(%remote, stream_id = stream.stream_id(), "queueing accepted stream");
        tokio::select! {
            biased;
            () = shutdown.cancelled() => return,
            sent = backlog.send_async(stream) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}
