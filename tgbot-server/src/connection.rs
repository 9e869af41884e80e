//! Per-connection task loop: read one packet, dispatch it, write the
//! reply, repeat until the peer disconnects or a framing error leaves the
//! stream unrecoverable. One task per stream connection; replies are
//! written back on the same connection.
use std::sync::Arc;

use log::{debug, warn};
use tgbot_wire::payload::{AckType, GenericAck};
use tgbot_wire::{codec, Command, Packet, PayloadType, ProtocolError, ReadError};
use tokio::io::split;

use crate::dispatch::{dispatch, DispatchOutcome};
use crate::net::NetStream;
use crate::state::ServerState;
use crate::transfer_push;

pub async fn run(stream: NetStream, state: Arc<ServerState>, peer: String) {
    let (mut reader, mut writer) = split(stream);
    let mut last_session_token = [0u8; tgbot_wire::header::SESSION_TOKEN_LEN];

    loop {
        let packet = match codec::read(&mut reader, state.max_data_size).await {
            Ok(packet) => packet,
            Err(ReadError::Io(err)) => {
                debug!("connection {peer} closed: {err}");
                reap_on_disconnect(&state, &last_session_token).await;
                return;
            }
            Err(ReadError::TooLarge { data_size, max }) => {
                warn!("connection {peer} sent an oversize packet ({data_size} > {max} bytes), closing");
                reap_on_disconnect(&state, &last_session_token).await;
                return;
            }
            Err(ReadError::Protocol(ProtocolError::BadChecksum { expected, got })) => {
                // The frame itself was fully read (data_size bytes were
                // consumed), so the stream is still in a known state: reply
                // with an error ack and keep the connection open.
                warn!("connection {peer}: checksum mismatch (expected {expected:#x}, got {got:#x})");
                let ack = GenericAck::error(AckType::RuntimeError, "checksum mismatch");
                let reply = Packet::without_session(
                    Command::GenericAck,
                    PayloadType::Binary,
                    state.next_reply_nonce(),
                    ack.encode_binary(),
                );
                if codec::write(&mut writer, &reply).await.is_err() {
                    reap_on_disconnect(&state, &last_session_token).await;
                    return;
                }
                continue;
            }
            Err(ReadError::Protocol(err)) => {
                // Bad magic, an unknown command/payload_type, or a missing
                // JSON body sentinel all mean the framing itself cannot be
                // trusted past this point; there is no safe way to resync
                // with the next header, so the connection is closed.
                warn!("connection {peer}: unrecoverable protocol error: {err}");
                reap_on_disconnect(&state, &last_session_token).await;
                return;
            }
        };

        let session_token = packet.session_token;
        last_session_token = session_token;
        match dispatch(&state, &packet).await {
            DispatchOutcome::Reply(reply) => {
                if codec::write(&mut writer, &reply).await.is_err() {
                    debug!("connection {peer} closed while writing reply");
                    reap_on_disconnect(&state, &last_session_token).await;
                    return;
                }
            }
            DispatchOutcome::Drop => {
                // Stale-nonce replay; already logged inside the session table.
            }
            DispatchOutcome::BeginServerPush { begin, data } => {
                if let Err(err) =
                    transfer_push::drive_push(&mut reader, &mut writer, &state, session_token, begin, data).await
                {
                    warn!("connection {peer}: server-push transfer failed: {err}");
                    reap_on_disconnect(&state, &last_session_token).await;
                    return;
                }
            }
        }
    }
}

/// Discard any transfer session left behind by this connection. The
/// session-token default (all-zero) never matches a real entry, so this is
/// a no-op for connections that never completed `OPEN_SESSION`.
async fn reap_on_disconnect(state: &ServerState, session_token: &[u8; tgbot_wire::header::SESSION_TOKEN_LEN]) {
    if state.transfers.reap(session_token).await {
        debug!("reaped an in-progress transfer for a disconnected connection");
    }
}
