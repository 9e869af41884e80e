//! Transport listeners: bind every transport enabled in [`ServerConfig`],
//! accept connections, and spawn one task per connection (`connection::run`),
//! or handle one packet per datagram for UDP. Grounded on
//! `grammers-mtsender`'s per-transport connect helpers, here generalized to
//! the accept side and to five transports (TCP/IPv4, TCP/IPv6, UDP/IPv4,
//! UDP/IPv6, and a Unix-domain socket).
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use log::{error, info, warn};
use tgbot_wire::payload::{AckType, GenericAck};
use tgbot_wire::{codec, Command, Packet};
use tokio::net::{TcpListener, UdpSocket, UnixListener};
use tokio::sync::watch;

use crate::config::ServerConfig;
use crate::connection;
use crate::dispatch::{dispatch, DispatchOutcome};
use crate::net::NetStream;
use crate::state::ServerState;

/// Spawn every listener `config` enables, each watching `shutdown` for its
/// stop signal. Returns immediately; listeners run as background tasks.
pub fn spawn_all(config: &ServerConfig, state: Arc<ServerState>, shutdown: watch::Receiver<bool>) {
    if config.enable_tcp4 {
        spawn_tcp(
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.command_port)),
            state.clone(),
            shutdown.clone(),
        );
    }
    if config.enable_tcp6 {
        spawn_tcp(
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, config.command_port)),
            state.clone(),
            shutdown.clone(),
        );
    }
    if config.enable_udp4 {
        spawn_udp(
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.command_port)),
            state.clone(),
            shutdown.clone(),
        );
    }
    if config.enable_udp6 {
        spawn_udp(
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, config.command_port)),
            state.clone(),
            shutdown.clone(),
        );
    }
    if config.enable_unix {
        spawn_unix(config.unix_socket_path.clone(), state, shutdown);
    }
}

fn spawn_tcp(addr: SocketAddr, state: Arc<ServerState>, mut shutdown: watch::Receiver<bool>) {
    tokio::spawn(async move {
        let listener = match TcpListener::bind(addr).await {
            Ok(l) => l,
            Err(err) => {
                error!("failed to bind TCP listener on {addr}: {err}");
                return;
            }
        };
        info!("listening on tcp {addr}");
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("tcp listener {addr} shutting down");
                    return;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let state = state.clone();
                            tokio::spawn(connection::run(NetStream::Tcp(stream), state, peer.to_string()));
                        }
                        Err(err) => warn!("accept failed on tcp {addr}: {err}"),
                    }
                }
            }
        }
    });
}

fn spawn_unix(path: PathBuf, state: Arc<ServerState>, mut shutdown: watch::Receiver<bool>) {
    tokio::spawn(async move {
        if path.exists() {
            // A stale socket file left behind by a previous, now-dead
            // process; nothing currently answers on it, so it is safe to
            // remove and rebind. A live socket fails the connect attempt
            // differently and is left alone (the bind below will then fail
            // loudly, which is the right outcome).
            if std::os::unix::net::UnixStream::connect(&path).is_err() {
                let _ = std::fs::remove_file(&path);
            }
        }
        let listener = match UnixListener::bind(&path) {
            Ok(l) => l,
            Err(err) => {
                error!("failed to bind unix listener at {}: {err}", path.display());
                return;
            }
        };
        info!("listening on unix {}", path.display());
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("unix listener at {} shutting down", path.display());
                    return;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let state = state.clone();
                            tokio::spawn(connection::run(NetStream::Unix(stream), state, path.display().to_string()));
                        }
                        Err(err) => warn!("accept failed on unix {}: {err}", path.display()),
                    }
                }
            }
        }
    });
}

fn spawn_udp(addr: SocketAddr, state: Arc<ServerState>, mut shutdown: watch::Receiver<bool>) {
    tokio::spawn(async move {
        let socket = match UdpSocket::bind(addr).await {
            Ok(s) => s,
            Err(err) => {
                error!("failed to bind UDP socket on {addr}: {err}");
                return;
            }
        };
        info!("listening on udp {addr}");
        let mut buf = vec![0u8; state.max_data_size as usize + tgbot_wire::HEADER_SIZE];
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("udp listener {addr} shutting down");
                    return;
                }
                received = socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, peer)) => {
                            if let Err(err) = handle_datagram(&socket, &buf[..len], peer, &state).await {
                                warn!("udp {addr}: failed to reply to {peer}: {err}");
                            }
                        }
                        Err(err) => warn!("recv failed on udp {addr}: {err}"),
                    }
                }
            }
        }
    });
}

async fn handle_datagram(
    socket: &UdpSocket,
    bytes: &[u8],
    peer: SocketAddr,
    state: &ServerState,
) -> std::io::Result<()> {
    let packet = match codec::decode(bytes, state.max_data_size) {
        Ok(packet) => packet,
        Err(err) => {
            warn!("dropping malformed UDP datagram from {peer}: {err}");
            return Ok(());
        }
    };

    match dispatch(state, &packet).await {
        DispatchOutcome::Reply(reply) => {
            socket.send_to(&codec::encode(&reply), peer).await?;
        }
        DispatchOutcome::Drop => {}
        DispatchOutcome::BeginServerPush { .. } => {
            // UDP is one-datagram-per-packet; a chunked push needs the
            // stateful back-and-forth only a stream transport can give, so
            // large-file pushes only ever happen over TCP/Unix. Answer
            // with the same error shape a refused request gets elsewhere.
            let ack = GenericAck::error(AckType::RuntimeError, "large file transfer is not supported over UDP");
            let reply = Packet::new(
                Command::GenericAck,
                packet.payload_type,
                state.next_reply_nonce(),
                packet.session_token,
                ack.encode_binary(),
            );
            socket.send_to(&codec::encode(&reply), peer).await?;
        }
    }
    Ok(())
}
