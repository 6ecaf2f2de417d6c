//! Recording mock implementations shared by the integration tests.

#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use muxsock_transport::types::{
    Address, AddrSolutionImplementation, BoxMuxedListener, BoxStreamConn, BoxStreamListener,
    GuardedIo, MuxDialFunc, MuxListenFunc, MuxedListener, MuxedSocket, PacketAdapterImplementation,
    PacketConn, PacketConnFunc, PacketConnImplementation, PacketObfuscatorImplementation,
    PacketSolutionImplementation, SharedMuxedSocket, SharedPacketConn, Socket,
    StreamAdapterImplementation, StreamConn, StreamConnImplementation, StreamDialFunc,
    StreamListenFunc, StreamListener, StreamObfuscatorImplementation,
    StreamSolutionImplementation, mux_dial_fn, mux_listen_fn, packet_conn_fn, stream_dial_fn,
    stream_listen_fn,
};
use muxsock_transport::{Creators, Error, ParameterHint, ParameterType, Parameters, Result};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf, duplex};
use tokio_util::sync::CancellationToken;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Ordered record of layer constructions.
#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: String) {
        self.0.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

fn label(parameters: &Parameters) -> String {
    parameters
        .get("label")
        .map(|label| format!("[{label}]"))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Sockets
// ---------------------------------------------------------------------------

/// One half of an in-memory byte pipe.
pub struct MockStream {
    io: GuardedIo<DuplexStream>,
    stream_id: u64,
}

impl MockStream {
    pub fn pair(stream_id: u64) -> (Self, Self) {
        let (a, b) = duplex(4096);
        let closed = CancellationToken::new();
        (
            Self {
                io: GuardedIo::new(a, closed.clone()),
                stream_id,
            },
            Self {
                io: GuardedIo::new(b, closed),
                stream_id,
            },
        )
    }

    pub fn boxed(stream_id: u64) -> BoxStreamConn {
        Box::new(Self::pair(stream_id).0)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_read(cx, buf)
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.io).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_shutdown(cx)
    }
}

#[async_trait]
impl Socket for MockStream {
    fn close_signal(&self) -> CancellationToken {
        self.io.close_signal()
    }

    async fn close(&self) -> Result<()> {
        self.io.close();
        Ok(())
    }

    fn local_addr(&self) -> Address {
        Address::empty("mock")
    }

    fn remote_addr(&self) -> Address {
        Address::muxed(Address::empty("mock"), self.stream_id)
    }
}

#[async_trait]
impl StreamConn for MockStream {
    fn stream_id(&self) -> u64 {
        self.stream_id
    }
}

/// Multiplexed socket whose incoming streams are fed by the test.
pub struct MockMuxedSocket {
    closed: CancellationToken,
    incoming: flume::Receiver<BoxStreamConn>,
    next_stream_id: AtomicU64,
    opened: AtomicUsize,
    fail_accept: AtomicBool,
    peers: Mutex<Vec<MockStream>>,
}

impl MockMuxedSocket {
    pub fn new() -> (Arc<Self>, flume::Sender<BoxStreamConn>) {
        let (sender, incoming) = flume::unbounded();
        let socket = Arc::new(Self {
            closed: CancellationToken::new(),
            incoming,
            next_stream_id: AtomicU64::new(1),
            opened: AtomicUsize::new(0),
            fail_accept: AtomicBool::new(false),
            peers: Mutex::new(Vec::new()),
        });
        (socket, sender)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Makes the next accept fail while the socket stays open.
    pub fn fail_next_accept(&self) {
        self.fail_accept.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Socket for MockMuxedSocket {
    fn close_signal(&self) -> CancellationToken {
        self.closed.clone()
    }

    async fn close(&self) -> Result<()> {
        self.closed.cancel();
        Ok(())
    }

    fn local_addr(&self) -> Address {
        Address::empty("mock")
    }

    fn remote_addr(&self) -> Address {
        Address::empty("mock")
    }
}

#[async_trait]
impl MuxedSocket for MockMuxedSocket {
    async fn open_stream(&self) -> Result<BoxStreamConn> {
        if self.closed.is_cancelled() {
            return Err(Error::Closed);
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        let id = self.next_stream_id.fetch_add(1, Ordering::SeqCst);
        let (local, peer) = MockStream::pair(id);
        self.peers.lock().push(peer);
        Ok(Box::new(local))
    }

    async fn accept_stream(&self) -> Result<BoxStreamConn> {
        if self.fail_accept.swap(false, Ordering::SeqCst) {
            return Err(Error::Io(io::ErrorKind::ConnectionReset.into()));
        }
        tokio::select! {
            biased;
            () = self.closed.cancelled() => Err(Error::Closed),
            stream = self.incoming.recv_async() => stream.map_err(|_| Error::Closed),
        }
    }
}

/// Multiplexed listener whose incoming connections are fed by the test.
pub struct MockMuxedListener {
    closed: CancellationToken,
    incoming: flume::Receiver<SharedMuxedSocket>,
}

impl MockMuxedListener {
    pub fn new() -> (Arc<Self>, flume::Sender<SharedMuxedSocket>) {
        let (sender, incoming) = flume::unbounded();
        let listener = Arc::new(Self {
            closed: CancellationToken::new(),
            incoming,
        });
        (listener, sender)
    }
}

#[async_trait]
impl MuxedListener for MockMuxedListener {
    async fn accept_muxed(&self) -> Result<SharedMuxedSocket> {
        tokio::select! {
            biased;
            () = self.closed.cancelled() => Err(Error::Closed),
            socket = self.incoming.recv_async() => socket.map_err(|_| Error::Closed),
        }
    }

    fn addr(&self) -> Address {
        Address::empty("mock")
    }

    fn close_signal(&self) -> CancellationToken {
        self.closed.clone()
    }

    async fn close(&self) -> Result<()> {
        self.closed.cancel();
        Ok(())
    }
}

/// Stream listener that never accepts anything.
pub struct IdleStreamListener {
    closed: CancellationToken,
}

#[async_trait]
impl StreamListener for IdleStreamListener {
    async fn accept_conn(&self) -> Result<BoxStreamConn> {
        self.closed.cancelled().await;
        Err(Error::Closed)
    }

    fn addr(&self) -> Address {
        Address::empty("mock")
    }

    fn close_signal(&self) -> CancellationToken {
        self.closed.clone()
    }

    async fn close(&self) -> Result<()> {
        self.closed.cancel();
        Ok(())
    }
}

/// Datagram socket looping back to itself.
pub struct LoopbackPacketConn {
    closed: CancellationToken,
    queue: (flume::Sender<Vec<u8>>, flume::Receiver<Vec<u8>>),
}

impl LoopbackPacketConn {
    pub fn shared() -> SharedPacketConn {
        Arc::new(Self {
            closed: CancellationToken::new(),
            queue: flume::unbounded(),
        })
    }
}

#[async_trait]
impl Socket for LoopbackPacketConn {
    fn close_signal(&self) -> CancellationToken {
        self.closed.clone()
    }

    async fn close(&self) -> Result<()> {
        self.closed.cancel();
        Ok(())
    }

    fn local_addr(&self) -> Address {
        Address::empty("loop")
    }

    fn remote_addr(&self) -> Address {
        Address::empty("loop")
    }
}

#[async_trait]
impl PacketConn for LoopbackPacketConn {
    async fn send(&self, buf: &[u8]) -> Result<usize> {
        self.queue.0.send(buf.to_vec()).map_err(|_| Error::Closed)?;
        Ok(buf.len())
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        let packet = self.queue.1.recv_async().await.map_err(|_| Error::Closed)?;
        let len = packet.len().min(buf.len());
        buf[..len].copy_from_slice(&packet[..len]);
        Ok(len)
    }

    async fn send_to(&self, buf: &[u8], _target: &Address) -> Result<usize> {
        self.send(buf).await
    }

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, Address)> {
        Ok((self.recv(buf).await?, self.remote_addr()))
    }
}

// ---------------------------------------------------------------------------
// Producers
// ---------------------------------------------------------------------------

pub fn mock_stream_dialer() -> StreamDialFunc {
    stream_dial_fn(|| async { Ok(MockStream::boxed(0)) })
}

pub fn idle_stream_listener() -> StreamListenFunc {
    stream_listen_fn(|| async {
        Ok(Box::new(IdleStreamListener {
            closed: CancellationToken::new(),
        }) as BoxStreamListener)
    })
}

pub fn loopback_packets() -> PacketConnFunc {
    packet_conn_fn(|| async { Ok(LoopbackPacketConn::shared()) })
}

/// Multiplexed dialer counting physical connections.
pub fn counting_mux_dialer(dials: Arc<AtomicUsize>) -> MuxDialFunc {
    mux_dial_fn(move || {
        let dials = Arc::clone(&dials);
        async move {
            dials.fetch_add(1, Ordering::SeqCst);
            let (socket, _incoming) = MockMuxedSocket::new();
            Ok(socket as SharedMuxedSocket)
        }
    })
}

pub fn idle_mux_listener() -> MuxListenFunc {
    mux_listen_fn(|| async {
        let (listener, _incoming) = MockMuxedListener::new();
        Ok(Box::new(ArcMuxedListener(listener)) as BoxMuxedListener)
    })
}

/// Adapts a shared mock listener to the owned listener type.
pub struct ArcMuxedListener(pub Arc<MockMuxedListener>);

#[async_trait]
impl MuxedListener for ArcMuxedListener {
    async fn accept_muxed(&self) -> Result<SharedMuxedSocket> {
        self.0.accept_muxed().await
    }

    fn addr(&self) -> Address {
        self.0.addr()
    }

    fn close_signal(&self) -> CancellationToken {
        self.0.close_signal()
    }

    async fn close(&self) -> Result<()> {
        self.0.close().await
    }
}

// ---------------------------------------------------------------------------
// Implementations
// ---------------------------------------------------------------------------

pub struct MockStreamConn {
    pub name: &'static str,
    pub log: Log,
}

impl StreamConnImplementation for MockStreamConn {
    fn client(&self, addr: &str, parameters: &Parameters) -> Result<StreamDialFunc> {
        self.log
            .push(format!("{}.client({addr}){}", self.name, label(parameters)));
        Ok(mock_stream_dialer())
    }

    fn server(&self, addr: &str, parameters: &Parameters) -> Result<StreamListenFunc> {
        self.log
            .push(format!("{}.server({addr}){}", self.name, label(parameters)));
        Ok(idle_stream_listener())
    }

    fn parameter_hints(&self) -> Vec<ParameterHint> {
        vec![ParameterHint {
            key: "label",
            description: "recorded label",
            kind: ParameterType::String,
            default_value: "",
        }]
    }
}

pub struct MockPacketConn {
    pub name: &'static str,
    pub log: Log,
}

impl PacketConnImplementation for MockPacketConn {
    fn client(&self, addr: &str, parameters: &Parameters) -> Result<PacketConnFunc> {
        self.log
            .push(format!("{}.client({addr}){}", self.name, label(parameters)));
        Ok(loopback_packets())
    }

    fn server(&self, addr: &str, parameters: &Parameters) -> Result<PacketConnFunc> {
        self.log
            .push(format!("{}.server({addr}){}", self.name, label(parameters)));
        Ok(loopback_packets())
    }
}

pub struct MockAddrSolution {
    pub name: &'static str,
    pub log: Log,
    pub dials: Arc<AtomicUsize>,
}

impl AddrSolutionImplementation for MockAddrSolution {
    fn client(&self, addr: &str, parameters: &Parameters) -> Result<MuxDialFunc> {
        self.log
            .push(format!("{}.client({addr}){}", self.name, label(parameters)));
        Ok(counting_mux_dialer(Arc::clone(&self.dials)))
    }

    fn server(&self, addr: &str, parameters: &Parameters) -> Result<MuxListenFunc> {
        self.log
            .push(format!("{}.server({addr}){}", self.name, label(parameters)));
        Ok(idle_mux_listener())
    }
}

pub struct MockStreamObfuscator {
    pub name: &'static str,
    pub log: Log,
}

impl StreamObfuscatorImplementation for MockStreamObfuscator {
    fn client(&self, input: StreamDialFunc, parameters: &Parameters) -> Result<StreamDialFunc> {
        self.log
            .push(format!("{}.client{}", self.name, label(parameters)));
        Ok(input)
    }

    fn server(
        &self,
        input: StreamListenFunc,
        parameters: &Parameters,
    ) -> Result<StreamListenFunc> {
        self.log
            .push(format!("{}.server{}", self.name, label(parameters)));
        Ok(input)
    }
}

pub struct MockPacketObfuscator {
    pub name: &'static str,
    pub log: Log,
}

impl PacketObfuscatorImplementation for MockPacketObfuscator {
    fn client(&self, input: PacketConnFunc, parameters: &Parameters) -> Result<PacketConnFunc> {
        self.log
            .push(format!("{}.client{}", self.name, label(parameters)));
        Ok(input)
    }

    fn server(&self, input: PacketConnFunc, parameters: &Parameters) -> Result<PacketConnFunc> {
        self.log
            .push(format!("{}.server{}", self.name, label(parameters)));
        Ok(input)
    }
}

pub struct MockStreamAdapter {
    pub name: &'static str,
    pub log: Log,
}

impl StreamAdapterImplementation for MockStreamAdapter {
    fn client(&self, _input: PacketConnFunc, parameters: &Parameters) -> Result<StreamDialFunc> {
        self.log
            .push(format!("{}.client{}", self.name, label(parameters)));
        Ok(mock_stream_dialer())
    }

    fn server(
        &self,
        _input: PacketConnFunc,
        parameters: &Parameters,
    ) -> Result<StreamListenFunc> {
        self.log
            .push(format!("{}.server{}", self.name, label(parameters)));
        Ok(idle_stream_listener())
    }
}

pub struct MockPacketAdapter {
    pub name: &'static str,
    pub log: Log,
}

impl PacketAdapterImplementation for MockPacketAdapter {
    fn client(&self, _input: StreamDialFunc, parameters: &Parameters) -> Result<PacketConnFunc> {
        self.log
            .push(format!("{}.client{}", self.name, label(parameters)));
        Ok(loopback_packets())
    }

    fn server(
        &self,
        _input: StreamListenFunc,
        parameters: &Parameters,
    ) -> Result<PacketConnFunc> {
        self.log
            .push(format!("{}.server{}", self.name, label(parameters)));
        Ok(loopback_packets())
    }
}

pub struct MockStreamSolution {
    pub name: &'static str,
    pub log: Log,
    pub dials: Arc<AtomicUsize>,
}

impl StreamSolutionImplementation for MockStreamSolution {
    fn client(&self, _input: StreamDialFunc, parameters: &Parameters) -> Result<MuxDialFunc> {
        self.log
            .push(format!("{}.client{}", self.name, label(parameters)));
        Ok(counting_mux_dialer(Arc::clone(&self.dials)))
    }

    fn server(&self, _input: StreamListenFunc, parameters: &Parameters) -> Result<MuxListenFunc> {
        self.log
            .push(format!("{}.server{}", self.name, label(parameters)));
        Ok(idle_mux_listener())
    }
}

pub struct MockPacketSolution {
    pub name: &'static str,
    pub log: Log,
    pub dials: Arc<AtomicUsize>,
}

impl PacketSolutionImplementation for MockPacketSolution {
    fn client(&self, _input: PacketConnFunc, parameters: &Parameters) -> Result<MuxDialFunc> {
        self.log
            .push(format!("{}.client{}", self.name, label(parameters)));
        Ok(counting_mux_dialer(Arc::clone(&self.dials)))
    }

    fn server(&self, _input: PacketConnFunc, parameters: &Parameters) -> Result<MuxListenFunc> {
        self.log
            .push(format!("{}.server{}", self.name, label(parameters)));
        Ok(idle_mux_listener())
    }
}

/// Names registered by [`mock_creators`].
pub const REGISTERED: &[&str] = &[
    "tcp", "mem", "udp", "tls", "xor", "kcp", "spos", "nomux", "yamux", "quic", "wsmux",
];

/// Registries populated with recording mocks under the default names plus
/// `tls`, `xor`, `yamux`, `mem` and `wsmux`.
pub fn mock_creators(log: &Log, dials: &Arc<AtomicUsize>) -> Arc<Creators> {
    let creators = Creators::new();
    for name in ["tcp", "mem"] {
        creators.stream_conns().register(
            name,
            Arc::new(MockStreamConn {
                name,
                log: log.clone(),
            }),
        );
    }
    creators.packet_conns().register(
        "udp",
        Arc::new(MockPacketConn {
            name: "udp",
            log: log.clone(),
        }),
    );
    creators.stream_obfuscators().register(
        "tls",
        Arc::new(MockStreamObfuscator {
            name: "tls",
            log: log.clone(),
        }),
    );
    creators.packet_obfuscators().register(
        "xor",
        Arc::new(MockPacketObfuscator {
            name: "xor",
            log: log.clone(),
        }),
    );
    creators.stream_adapters().register(
        "kcp",
        Arc::new(MockStreamAdapter {
            name: "kcp",
            log: log.clone(),
        }),
    );
    creators.packet_adapters().register(
        "spos",
        Arc::new(MockPacketAdapter {
            name: "spos",
            log: log.clone(),
        }),
    );
    for name in ["nomux", "yamux"] {
        creators.stream_solutions().register(
            name,
            Arc::new(MockStreamSolution {
                name,
                log: log.clone(),
                dials: Arc::clone(dials),
            }),
        );
    }
    creators.packet_solutions().register(
        "quic",
        Arc::new(MockPacketSolution {
            name: "quic",
            log: log.clone(),
            dials: Arc::clone(dials),
        }),
    );
    creators.addr_solutions().register(
        "wsmux",
        Arc::new(MockAddrSolution {
            name: "wsmux",
            log: log.clone(),
            dials: Arc::clone(dials),
        }),
    );
    Arc::new(creators)
}
