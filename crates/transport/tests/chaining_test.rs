mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{Log, init_tracing, mock_creators};
use muxsock_transport::chaining::{
    ChainOptions, GenericChainer, LayerType, LayersChainer, MuxChainer, PacketChainer,
    StreamChainer, cast,
};
use muxsock_transport::types::{Representation, RepresentationKind};
use muxsock_transport::{
    Creators, DefaultLayerNames, DefaultLayers, Error, Parameters, create_dialer,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const ADDR: &str = "127.0.0.1:9000";

fn setup() -> (Log, Arc<AtomicUsize>, Arc<Creators>) {
    init_tracing();
    let log = Log::default();
    let dials = Arc::new(AtomicUsize::new(0));
    let creators = mock_creators(&log, &dials);
    (log, dials, creators)
}

#[test]
fn tcp_alone_inserts_nothing() {
    let (log, _, creators) = setup();
    let chainer = StreamChainer::build(creators, "tcp", &ChainOptions::default()).unwrap();
    chainer.construct_dial_func(ADDR, &Parameters::new()).unwrap();

    assert_eq!(log.entries(), vec![format!("tcp.client({ADDR})")]);
    assert_eq!(chainer.generic().layers().len(), 1);
    assert_eq!(
        chainer.generic().layers()[0].layer_type(),
        LayerType::STREAM_CONN
    );
}

#[test]
fn tls_alone_runs_over_default_tcp() {
    let (log, _, creators) = setup();
    let chainer = StreamChainer::build(creators, "tls", &ChainOptions::default()).unwrap();
    chainer
        .construct_dial_func("example.com:443", &Parameters::new())
        .unwrap();

    assert_eq!(
        log.entries(),
        vec!["tcp.client(example.com:443)".to_string(), "tls.client".to_string()]
    );
}

#[test]
fn listen_side_mirrors_dial_side() {
    let (log, _, creators) = setup();
    let chainer = StreamChainer::build(creators, "tls", &ChainOptions::default()).unwrap();
    chainer
        .construct_listen_func("0.0.0.0:443", &Parameters::new())
        .unwrap();

    assert_eq!(
        log.entries(),
        vec!["tcp.server(0.0.0.0:443)".to_string(), "tls.server".to_string()]
    );
}

#[test]
fn layers_fold_bottom_up() {
    let (log, _, creators) = setup();
    let chainer =
        MuxChainer::build(creators, "tcp+tls+yamux", &ChainOptions::default()).unwrap();
    chainer.construct_dial_func(ADDR, &Parameters::new()).unwrap();

    assert_eq!(
        log.entries(),
        vec![
            format!("tcp.client({ADDR})"),
            "tls.client".to_string(),
            "yamux.client".to_string(),
        ]
    );
}

#[test]
fn muxer_alone_runs_over_default_tcp() {
    let (log, _, creators) = setup();
    let chainer = MuxChainer::build(creators, "yamux", &ChainOptions::default()).unwrap();
    chainer.construct_dial_func(ADDR, &Parameters::new()).unwrap();

    assert_eq!(
        log.entries(),
        vec![format!("tcp.client({ADDR})"), "yamux.client".to_string()]
    );
}

#[test]
fn mux_chainer_adds_default_stream_solution() {
    let (log, _, creators) = setup();
    let chainer = MuxChainer::build(creators, "tcp+tls", &ChainOptions::default()).unwrap();
    chainer.construct_listen_func(ADDR, &Parameters::new()).unwrap();

    assert_eq!(
        log.entries(),
        vec![
            format!("tcp.server({ADDR})"),
            "tls.server".to_string(),
            "nomux.server".to_string(),
        ]
    );
}

#[test]
fn packet_representations_are_bridged() {
    let (log, _, creators) = setup();

    StreamChainer::build(Arc::clone(&creators), "kcp", &ChainOptions::default())
        .unwrap()
        .construct_dial_func(ADDR, &Parameters::new())
        .unwrap();
    assert_eq!(
        log.entries(),
        vec![format!("udp.client({ADDR})"), "kcp.client".to_string()]
    );

    let log_len = log.entries().len();
    PacketChainer::build(Arc::clone(&creators), "tcp", &ChainOptions::default())
        .unwrap()
        .construct_dial_func(ADDR, &Parameters::new())
        .unwrap();
    assert_eq!(
        log.entries()[log_len..],
        [format!("tcp.client({ADDR})"), "spos.client".to_string()]
    );

    let log_len = log.entries().len();
    MuxChainer::build(creators, "udp+xor", &ChainOptions::default())
        .unwrap()
        .construct_dial_func(ADDR, &Parameters::new())
        .unwrap();
    assert_eq!(
        log.entries()[log_len..],
        [
            format!("udp.client({ADDR})"),
            "xor.client".to_string(),
            "quic.client".to_string(),
        ]
    );
}

#[test]
fn addr_solution_is_demultiplexed_for_stream_layers() {
    let (log, _, creators) = setup();
    let chainer =
        StreamChainer::build(creators, "wsmux+tls", &ChainOptions::default()).unwrap();
    chainer.construct_dial_func(ADDR, &Parameters::new()).unwrap();

    assert_eq!(chainer.generic().layers()[0].layer_type(), LayerType::ADDR_SOLUTION);
    assert_eq!(
        log.entries(),
        vec![format!("wsmux.client({ADDR})"), "tls.client".to_string()]
    );
}

#[test]
fn unknown_token_fails_without_building() {
    let (log, _, creators) = setup();
    let err = MuxChainer::build(creators, "nosuch+tcp", &ChainOptions::default()).unwrap_err();

    assert!(matches!(err, Error::SchemeNotSupported(ref name) if name == "nosuch"));
    assert!(err.is_configuration());
    assert!(log.entries().is_empty());
}

#[test]
fn terminal_above_bottom_is_rejected() {
    let (_, _, creators) = setup();
    let err = StreamChainer::build(Arc::clone(&creators), "tls+tcp", &ChainOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::IncompatibleLayers { .. }));

    let err = MuxChainer::build(creators, "udp+yamux", &ChainOptions::default()).unwrap_err();
    match err {
        Error::IncompatibleLayers { above, below } => {
            assert_eq!(above, "yamux[0] (StreamSolution)");
            assert_eq!(below, "udp[0] (PacketConn)");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn permissive_chain_fails_at_construction() {
    let (_, _, creators) = setup();
    let options = ChainOptions::default().permissive();
    let chainer = StreamChainer::build(creators, "tls+tcp", &options).unwrap();

    let err = chainer
        .construct_dial_func(ADDR, &Parameters::new())
        .err().expect("expected an error");
    assert!(matches!(
        err,
        Error::InvalidChainingResult {
            need: RepresentationKind::Addr,
            have: RepresentationKind::Stream,
        }
    ));
}

#[test]
fn repeated_names_get_their_own_sections() {
    let (log, _, creators) = setup();
    let chainer =
        StreamChainer::build(creators, "tcp+tls+tls", &ChainOptions::default()).unwrap();
    let layers = chainer.generic().layers();
    assert_eq!(layers[1].section(), "tls[1]");
    assert_eq!(layers[2].section(), "tls[0]");

    let parameters = Parameters::new()
        .with("label", "shared")
        .with("tls[0].label", "top")
        .with("tls[1].label", "middle");
    chainer.construct_dial_func(ADDR, &parameters).unwrap();

    assert_eq!(
        log.entries(),
        vec![
            format!("tcp.client({ADDR})[shared]"),
            "tls.client[middle]".to_string(),
            "tls.client[top]".to_string(),
        ]
    );
}

#[test]
fn missing_default_is_reported_by_name() {
    init_tracing();
    let log = Log::default();
    let dials = Arc::new(AtomicUsize::new(0));
    let creators = mock_creators(&log, &dials);
    creators.stream_conns().unregister("tcp");

    let chainer = StreamChainer::build(creators, "tls", &ChainOptions::default()).unwrap();
    let err = chainer
        .construct_dial_func(ADDR, &Parameters::new())
        .err().expect("expected an error");
    assert!(matches!(err, Error::SchemeNotSupported(ref name) if name == "tcp"));
}

#[test]
fn custom_defaults_are_consulted() {
    let (log, _, creators) = setup();
    let defaults = DefaultLayerNames {
        stream_conn: "mem".to_string(),
        ..DefaultLayerNames::default()
    };
    let options = ChainOptions::default().with_defaults(defaults);
    StreamChainer::build(creators, "tls", &options)
        .unwrap()
        .construct_dial_func(ADDR, &Parameters::new())
        .unwrap();

    assert_eq!(log.entries()[0], format!("mem.client({ADDR})"));
}

#[test]
fn muxed_from_bare_address_is_invalid() {
    let (_, _, creators) = setup();
    let defaults = DefaultLayers::new(creators, DefaultLayerNames::default());
    let result = cast::mux_dial_func(
        Representation::Addr(ADDR.to_string()),
        &defaults,
        &Parameters::new(),
    );
    assert!(matches!(
        result,
        Err(Error::InvalidChainingResult {
            need: RepresentationKind::Muxed,
            have: RepresentationKind::Addr,
        })
    ));
}

#[test]
fn parameter_hints_follow_sections() {
    let (_, _, creators) = setup();
    let chainer = GenericChainer::new(
        creators,
        &["tcp".to_string(), "tls".to_string()],
        &ChainOptions::default(),
    )
    .unwrap();
    let hints = chainer.parameter_hints();

    assert_eq!(hints.len(), 2);
    assert_eq!(hints[0].0, "tcp[0]");
    assert_eq!(hints[0].1[0].key, "label");
    assert!(hints[1].1.is_empty());
}

#[tokio::test]
async fn stream_chain_over_muxer_demultiplexes() {
    let (_, dials, creators) = setup();
    let chainer = StreamChainer::build(creators, "tcp+yamux", &ChainOptions::default()).unwrap();
    let dial = chainer
        .construct_dial_func(ADDR, &Parameters::new().with("streamsperconn", "2"))
        .unwrap();

    for _ in 0..4 {
        dial().await.unwrap();
    }
    assert_eq!(dials.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn muxed_streams_are_independent() {
    let (_, _, creators) = setup();
    let dial = MuxChainer::build(creators, "tcp+yamux", &ChainOptions::default())
        .unwrap()
        .construct_dial_func(ADDR, &Parameters::new())
        .unwrap();
    let socket = dial().await.unwrap();

    let first = socket.open_stream().await.unwrap();
    let mut second = socket.open_stream().await.unwrap();
    assert_ne!(first.stream_id(), second.stream_id());

    first.close().await.unwrap();
    assert!(first.is_closed());
    assert!(!second.is_closed());
    second.write_all(b"still open").await.unwrap();
    second.flush().await.unwrap();

    let mut buf = [0u8; 4];
    let mut first = first;
    assert_eq!(first.read(&mut buf).await.unwrap(), 0);
}

#[tokio::test]
async fn created_dialer_resolves_once_and_dials_every_call() {
    let (log, dials, creators) = setup();
    let dial = create_dialer(creators, "tcp+yamux", ADDR, &Parameters::new()).unwrap();
    let built = log.entries();
    assert_eq!(built, vec![format!("tcp.client({ADDR})"), "yamux.client".to_string()]);

    for _ in 0..3 {
        dial().await.unwrap();
    }
    assert_eq!(dials.load(Ordering::SeqCst), 3);
    assert_eq!(log.entries(), built);
}
