//! Drives a real server instance with the real client driver over TCP,
//! end to end: session lifecycle, a plain command round trip, a small-file
//! pull, and a chunked large-file pull.
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tgbot_client::config::{ClientConfig, Transport};
use tgbot_client::session::ClientSession;
use tgbot_client::transfer;
use tgbot_client::Channel;
use tgbot_server::collaborators::testing::{NullTransferFs, NullTelegramApi, NullChatObserver, NullSpamBlock};
use tgbot_server::collaborators::Collaborators;
use tgbot_server::{listener, ServerConfig, ServerState};
use tgbot_wire::payload::{FileTransferMeta, HASH_LEN};
use tgbot_wire::{Command, PayloadType};

/// Binds a server on an ephemeral TCP port with one pre-populated source
/// file in its in-memory filesystem double, and returns a [`ClientConfig`]
/// already pointed at it.
async fn spawn_server_with_file(name: &str, contents: Vec<u8>) -> ClientConfig {
    let fs = NullTransferFs::default();
    fs.files.lock().unwrap().insert(name.to_string(), contents);

    let collaborators = Collaborators {
        telegram: Box::new(NullTelegramApi::default()),
        observer: Box::new(NullChatObserver::default()),
        spam: Box::new(NullSpamBlock::default()),
        fs: Box::new(fs),
    };

    // port 0 would need an accept-then-discover dance the listener doesn't
    // expose, so tests pick a high, unlikely-to-collide fixed port instead.
    let port = free_port();
    let config = ServerConfig {
        command_port: port,
        enable_tcp4: true,
        enable_unix: false,
        ..ServerConfig::default()
    };

    let state = Arc::new(ServerState::new(&config, collaborators));
    let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    listener::spawn_all(&config, state, shutdown_rx);

    // give the listener task a moment to bind before the client dials it.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    ClientConfig {
        transport: Transport::Tcp(SocketAddr::new(Ipv4Addr::LOCALHOST.into(), port)),
        max_data_size: tgbot_wire::DEFAULT_MAX_DATA_SIZE,
    }
}

/// A quick-and-dirty free port finder: bind to port 0, read back the
/// assigned port, then drop the listener immediately. Good enough for
/// single-threaded test startup; a real race would need a retry loop.
fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn session_opens_and_closes_cleanly() {
    let config = spawn_server_with_file("unused.txt", b"x".to_vec()).await;
    let mut channel = Channel::connect(&config).await.unwrap();
    let mut session = ClientSession::open(&mut channel, config.max_data_size).await.unwrap();
    assert!(!session.expiration_time.is_empty());
    session.close(&mut channel, config.max_data_size).await.unwrap();
}

#[tokio::test]
async fn uptime_round_trip_returns_the_null_telegram_strings() {
    let config = spawn_server_with_file("unused.txt", b"x".to_vec()).await;
    let mut channel = Channel::connect(&config).await.unwrap();
    let mut session = ClientSession::open(&mut channel, config.max_data_size).await.unwrap();

    let request = session.packet(Command::GetUptime, PayloadType::Binary, vec![]);
    let reply = channel.roundtrip(&request, config.max_data_size).await.unwrap();
    assert_eq!(reply.command, Command::GetUptimeCallback);
    let uptime = tgbot_wire::payload::GetUptimeCallback::decode_binary(&reply.payload).unwrap();
    assert!(uptime.uptime.starts_with("Uptime: "));

    session.close(&mut channel, config.max_data_size).await.unwrap();
}

#[tokio::test]
async fn small_file_pull_delivers_the_body_in_one_packet() {
    let body = b"hello from the other side of the wire".to_vec();
    let config = spawn_server_with_file("greeting.txt", body.clone()).await;

    let mut channel = Channel::connect(&config).await.unwrap();
    let mut session = ClientSession::open(&mut channel, config.max_data_size).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let dst = dir.path().join("greeting-copy.txt");

    let meta = FileTransferMeta {
        src: "greeting.txt".into(),
        dst: dst.to_string_lossy().into_owned(),
        overwrite: true,
        hash_ignore: false,
        dry_run: false,
        hash: [0u8; HASH_LEN],
    };
    transfer::request(&mut channel, &mut session, config.max_data_size, PayloadType::Binary, meta)
        .await
        .unwrap();

    let written = tokio::fs::read(&dst).await.unwrap();
    assert_eq!(written, body);

    session.close(&mut channel, config.max_data_size).await.unwrap();
}

#[tokio::test]
async fn large_file_pull_crosses_the_chunked_threshold() {
    // One byte over the chunked-transfer threshold, so the server answers
    // with TRANSFER_FILE_BEGIN instead of a single TRANSFER_FILE packet.
    let total_size = (tgbot_transfer::CHUNKED_TRANSFER_THRESHOLD + 1) as usize;
    let body: Vec<u8> = (0..total_size).map(|i| (i % 251) as u8).collect();
    let config = spawn_server_with_file("bigfile.bin", body.clone()).await;

    let mut channel = Channel::connect(&config).await.unwrap();
    let mut session = ClientSession::open(&mut channel, config.max_data_size).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let dst = dir.path().join("bigfile-copy.bin");

    let meta = FileTransferMeta {
        src: "bigfile.bin".into(),
        dst: dst.to_string_lossy().into_owned(),
        overwrite: true,
        hash_ignore: false,
        dry_run: false,
        hash: [0u8; HASH_LEN],
    };
    transfer::request(&mut channel, &mut session, config.max_data_size, PayloadType::Binary, meta)
        .await
        .unwrap();

    let written = tokio::fs::read(&dst).await.unwrap();
    assert_eq!(written.len(), body.len());
    assert_eq!(written, body);

    session.close(&mut channel, config.max_data_size).await.unwrap();
}

#[tokio::test]
async fn dry_run_request_acks_without_transferring_anything() {
    let config = spawn_server_with_file("greeting.txt", b"hello".to_vec()).await;
    let mut channel = Channel::connect(&config).await.unwrap();
    let mut session = ClientSession::open(&mut channel, config.max_data_size).await.unwrap();

    let meta = FileTransferMeta {
        src: "greeting.txt".into(),
        dst: "wherever.txt".into(),
        overwrite: false,
        hash_ignore: false,
        dry_run: true,
        hash: [0u8; HASH_LEN],
    };
    let request = session.packet(
        Command::TransferFileRequest,
        PayloadType::Binary,
        meta.encode_binary(),
    );
    let reply = channel.roundtrip(&request, config.max_data_size).await.unwrap();
    assert_eq!(reply.command, Command::GenericAck);
    let ack = tgbot_wire::payload::GenericAck::decode_binary(&reply.payload).unwrap();
    assert_eq!(ack.result, tgbot_wire::payload::AckType::Success);

    session.close(&mut channel, config.max_data_size).await.unwrap();
}
