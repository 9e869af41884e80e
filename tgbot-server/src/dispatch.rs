//! Command dispatch: decode the incoming packet, verify its session, invoke
//! a handler, and build the reply. Implemented as an `async match` over
//! [`Command`] rather than a literal `HashMap<Command, fn>` table — boxing
//! every handler's future to store it as a function pointer would obscure
//! more than a match arm does, but this single function is still the
//! dispatcher's one call-in/call-out boundary.
use log::{error, warn};
use tgbot_session::VerifyOutcome;
use tgbot_transfer::{BeginError, ChunkError, EndError};
use tgbot_wire::payload::{
    AckType, CtrlSpamblock, FileTransferBegin, FileTransferChunkHeader, FileTransferChunkJson,
    FileTransferChunkResponse, FileTransferEnd, FileTransferMeta, GenericAck, ObserveAllChats,
    ObserveChatId, OpenSessionAck, SendFileToChatId, WriteMsgToChatId, HASH_LEN,
};
use tgbot_wire::{json_body, Command, Packet, PayloadType};

use crate::handlers;
use crate::state::ServerState;

const MAX_PATH: usize = tgbot_wire::payload::MAX_PATH;
/// `FileTransferMeta`'s fixed binary length, recomputed from the public wire
/// constants since the struct's own `BINARY_LEN` is crate-private to
/// `tgbot-wire`.
const META_BINARY_LEN: usize = MAX_PATH * 2 + 3 + HASH_LEN;

/// What the connection task should do once [`dispatch`] returns.
pub enum DispatchOutcome {
    /// Write this packet back to the peer, then keep reading.
    Reply(Packet),
    /// The nonce was stale; `SessionTable::verify` already logged it. The
    /// packet is dropped with no reply at all.
    Drop,
    /// `TRANSFER_FILE_REQUEST` named a file at or above the chunked
    /// threshold. `connection.rs` must hand its reader/writer over to
    /// `transfer_push::drive_push` to run the multi-packet BEGIN/CHUNK*/END
    /// exchange — this breaks the one-request-one-reply shape the rest of
    /// the dispatcher keeps.
    BeginServerPush {
        begin: FileTransferBegin,
        data: Vec<u8>,
    },
}

pub async fn dispatch(state: &ServerState, incoming: &Packet) -> DispatchOutcome {
    let command = incoming.command;

    if command.is_internal() {
        warn!("rejecting internal-only command {} off the wire", command.name());
        return DispatchOutcome::Reply(reply_ack(
            state,
            incoming,
            AckType::InvalidArgument,
            format!("{} is a reply-only command", command.name()),
        ));
    }

    if command != Command::OpenSession {
        match state.sessions.verify(&incoming.session_token, incoming.nonce).await {
            VerifyOutcome::Ok => {}
            VerifyOutcome::StaleNonce => return DispatchOutcome::Drop,
            VerifyOutcome::Unknown => {
                return DispatchOutcome::Reply(reply_ack(
                    state,
                    incoming,
                    AckType::RuntimeError,
                    "unknown session",
                ));
            }
            VerifyOutcome::Expired => {
                return DispatchOutcome::Reply(reply_ack(
                    state,
                    incoming,
                    AckType::RuntimeError,
                    "session expired",
                ));
            }
        }
    }

    match command {
        Command::OpenSession => open_session(state, incoming).await,
        Command::CloseSession => close_session(state, incoming).await,
        Command::WriteMsgToChatId => {
            with_decoded(state, incoming, WriteMsgToChatId::decode_binary, |s| {
                json_decode::<WriteMsgToChatId>(s)
            }, handlers::write_msg_to_chat_id)
            .await
        }
        Command::CtrlSpamblock => {
            with_decoded(state, incoming, CtrlSpamblock::decode_binary, |s| {
                json_decode::<CtrlSpamblock>(s)
            }, handlers::ctrl_spamblock)
            .await
        }
        Command::ObserveChatId => {
            with_decoded(state, incoming, ObserveChatId::decode_binary, |s| {
                json_decode::<ObserveChatId>(s)
            }, handlers::observe_chat_id)
            .await
        }
        Command::ObserveAllChats => {
            with_decoded(state, incoming, ObserveAllChats::decode_binary, |s| {
                json_decode::<ObserveAllChats>(s)
            }, handlers::observe_all_chats)
            .await
        }
        Command::SendFileToChatId => {
            with_decoded(state, incoming, SendFileToChatId::decode_binary, |s| {
                json_decode::<SendFileToChatId>(s)
            }, handlers::send_file_to_chat_id)
            .await
        }
        Command::GetUptime => {
            let ack = handlers::get_uptime(state).await;
            DispatchOutcome::Reply(reply(
                state,
                incoming,
                Command::GetUptimeCallback,
                incoming.payload_type,
                encode(incoming.payload_type, &ack, |a| a.encode_binary()),
            ))
        }
        Command::TransferFile => transfer_file_upload(state, incoming).await,
        Command::TransferFileRequest => transfer_file_request(state, incoming).await,
        Command::TransferFileBegin => transfer_file_begin(state, incoming).await,
        Command::TransferFileChunk => transfer_file_chunk(state, incoming).await,
        Command::TransferFileEnd => transfer_file_end(state, incoming).await,
        Command::OpenSessionAck
        | Command::GenericAck
        | Command::GetUptimeCallback
        | Command::TransferFileChunkResponse
        | Command::LogEntry => unreachable!("rejected as internal above"),
    }
}

/// Decode `incoming`'s payload with the binary or JSON decoder matching its
/// `payload_type`, invoke `handler`, and wrap its `GenericAck` into a reply.
/// Generic over the request type `T` so every simple GENERIC_ACK-returning
/// command (everything except the uptime query and the transfer family)
/// shares one decode-dispatch-encode path.
async fn with_decoded<T, DecB, DecJ, Fut>(
    state: &ServerState,
    incoming: &Packet,
    decode_binary: DecB,
    decode_json: DecJ,
    handler: impl FnOnce(&ServerState, T) -> Fut,
) -> DispatchOutcome
where
    DecB: FnOnce(&[u8]) -> Result<T, tgbot_wire::DecodeError>,
    DecJ: FnOnce(&[u8]) -> Result<T, String>,
    Fut: std::future::Future<Output = GenericAck>,
{
    let decoded = match incoming.payload_type {
        PayloadType::Binary => decode_binary(&incoming.payload).map_err(|e| e.to_string()),
        PayloadType::Json => decode_json(&incoming.payload),
    };
    match decoded {
        Ok(req) => {
            let ack = handler(state, req).await;
            DispatchOutcome::Reply(reply(
                state,
                incoming,
                Command::GenericAck,
                incoming.payload_type,
                encode(incoming.payload_type, &ack, |a| a.encode_binary()),
            ))
        }
        Err(msg) => DispatchOutcome::Reply(reply_ack(state, incoming, AckType::InvalidArgument, msg)),
    }
}

fn json_decode<'a, T: serde::Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, String> {
    serde_json::from_slice(bytes).map_err(|e| e.to_string())
}

fn encode<T: serde::Serialize>(payload_type: PayloadType, value: &T, to_binary: impl FnOnce(&T) -> Vec<u8>) -> Vec<u8> {
    match payload_type {
        PayloadType::Binary => to_binary(value),
        PayloadType::Json => serde_json::to_vec(value).expect("wire payloads always serialize"),
    }
}

async fn open_session(state: &ServerState, _incoming: &Packet) -> DispatchOutcome {
    let session = match state.sessions.open().await {
        Ok(session) => session,
        Err(err) => {
            error!("failed to open a new session: {err}");
            return DispatchOutcome::Reply(Packet::without_session(
                Command::GenericAck,
                PayloadType::Json,
                state.next_reply_nonce(),
                GenericAck::error(AckType::RuntimeError, err.to_string()).encode_binary(),
            ));
        }
    };

    let expires_at = chrono::Local::now()
        + chrono::Duration::from_std(tgbot_session::SESSION_TTL).expect("TTL fits in a chrono::Duration");
    let ack = OpenSessionAck {
        session_token: hex::encode(session.token),
        expiration_time: expires_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    };
    DispatchOutcome::Reply(Packet::without_session(
        Command::OpenSessionAck,
        PayloadType::Json,
        state.next_reply_nonce(),
        serde_json::to_vec(&ack).expect("OpenSessionAck always serializes"),
    ))
}

async fn close_session(state: &ServerState, incoming: &Packet) -> DispatchOutcome {
    state.sessions.close(&incoming.session_token).await;
    state.transfers.reap(&incoming.session_token).await;
    DispatchOutcome::Reply(reply_ack(state, incoming, AckType::Success, String::new()))
}

fn decode_meta_only(payload_type: PayloadType, payload: &[u8]) -> Result<FileTransferMeta, String> {
    match payload_type {
        PayloadType::Binary => FileTransferMeta::decode_binary(payload).map_err(|e| e.to_string()),
        PayloadType::Json => {
            let (json, _) = json_body::split(payload);
            json_decode(json)
        }
    }
}

fn decode_meta_and_body(payload_type: PayloadType, payload: &[u8]) -> Result<(FileTransferMeta, Vec<u8>), String> {
    match payload_type {
        PayloadType::Binary => {
            if payload.len() < META_BINARY_LEN {
                return Err("FileTransferMeta: buffer too short".to_string());
            }
            let meta = FileTransferMeta::decode_binary(payload).map_err(|e| e.to_string())?;
            Ok((meta, payload[META_BINARY_LEN..].to_vec()))
        }
        PayloadType::Json => {
            let (json, body) = json_body::split_expecting_body(payload).map_err(|e| e.to_string())?;
            Ok((json_decode(json)?, body.to_vec()))
        }
    }
}

fn encode_meta_and_body(payload_type: PayloadType, meta: &FileTransferMeta, body: &[u8]) -> Vec<u8> {
    match payload_type {
        PayloadType::Binary => {
            let mut buf = meta.encode_binary();
            buf.extend_from_slice(body);
            buf
        }
        PayloadType::Json => {
            let json = serde_json::to_vec(meta).expect("FileTransferMeta always serializes");
            json_body::join(&json, body)
        }
    }
}

/// Client-driven single-packet upload (`TRANSFER_FILE` as a request, the
/// legacy small-file push path).
async fn transfer_file_upload(state: &ServerState, incoming: &Packet) -> DispatchOutcome {
    let (meta, body) = match decode_meta_and_body(incoming.payload_type, &incoming.payload) {
        Ok(v) => v,
        Err(msg) => return DispatchOutcome::Reply(reply_ack(state, incoming, AckType::InvalidArgument, msg)),
    };

    if meta.dst.is_empty() {
        return DispatchOutcome::Reply(reply_ack(
            state,
            incoming,
            AckType::InvalidArgument,
            "empty destination path",
        ));
    }

    if !meta.overwrite && state.collaborators.fs.exists(&meta.dst).await {
        return DispatchOutcome::Reply(reply_ack(
            state,
            incoming,
            AckType::CommandIgnored,
            "destination exists and overwrite is false",
        ));
    }

    if !meta.hash_ignore {
        let digest = state.collaborators.fs.sha256(&body);
        if digest != meta.hash {
            return DispatchOutcome::Reply(reply_ack(
                state,
                incoming,
                AckType::RuntimeError,
                "sha256 of received bytes does not match expected hash",
            ));
        }
    }

    if meta.dry_run {
        return DispatchOutcome::Reply(reply_ack(state, incoming, AckType::Success, String::new()));
    }

    match state.collaborators.fs.write_file(&meta.dst, &body).await {
        Ok(()) => DispatchOutcome::Reply(reply_ack(state, incoming, AckType::Success, String::new())),
        Err(err) => DispatchOutcome::Reply(reply_ack(state, incoming, AckType::RuntimeError, err.to_string())),
    }
}

/// Dry-run query: server decides, by source file size, whether to answer
/// with a single `TRANSFER_FILE` packet or to start a chunked push.
async fn transfer_file_request(state: &ServerState, incoming: &Packet) -> DispatchOutcome {
    let meta = match decode_meta_only(incoming.payload_type, &incoming.payload) {
        Ok(m) => m,
        Err(msg) => return DispatchOutcome::Reply(reply_ack(state, incoming, AckType::InvalidArgument, msg)),
    };

    let data = match state.collaborators.fs.read_file(&meta.src).await {
        Ok(bytes) => bytes,
        Err(err) => return DispatchOutcome::Reply(reply_ack(state, incoming, AckType::RuntimeError, err.to_string())),
    };

    if meta.dry_run {
        return DispatchOutcome::Reply(reply_ack(state, incoming, AckType::Success, String::new()));
    }

    let hash = state.collaborators.fs.sha256(&data);

    if (data.len() as u64) < tgbot_transfer::CHUNKED_TRANSFER_THRESHOLD {
        let out_meta = FileTransferMeta {
            src: meta.src,
            dst: meta.dst,
            overwrite: meta.overwrite,
            hash_ignore: meta.hash_ignore,
            dry_run: false,
            hash,
        };
        let payload = encode_meta_and_body(incoming.payload_type, &out_meta, &data);
        DispatchOutcome::Reply(reply(state, incoming, Command::TransferFile, incoming.payload_type, payload))
    } else {
        DispatchOutcome::BeginServerPush {
            begin: FileTransferBegin {
                dest_path: meta.dst,
                total_size: data.len() as u64,
                chunk_size: tgbot_transfer::DEFAULT_CHUNK_SIZE,
                sha256_hash: hash,
            },
            data,
        }
    }
}

fn decode_begin(payload_type: PayloadType, payload: &[u8]) -> Result<FileTransferBegin, String> {
    match payload_type {
        PayloadType::Binary => FileTransferBegin::decode_binary(payload).map_err(|e| e.to_string()),
        PayloadType::Json => json_decode(payload),
    }
}

async fn transfer_file_begin(state: &ServerState, incoming: &Packet) -> DispatchOutcome {
    let begin = match decode_begin(incoming.payload_type, &incoming.payload) {
        Ok(b) => b,
        Err(msg) => return DispatchOutcome::Reply(reply_ack(state, incoming, AckType::InvalidArgument, msg)),
    };

    let outcome = state
        .transfers
        .begin(
            incoming.session_token,
            begin.dest_path,
            begin.total_size,
            begin.chunk_size,
            begin.sha256_hash,
        )
        .await;

    match outcome {
        Ok(()) => DispatchOutcome::Reply(reply_ack(state, incoming, AckType::Success, String::new())),
        Err(err @ BeginError::AlreadyActive) => {
            DispatchOutcome::Reply(reply_ack(state, incoming, AckType::CommandIgnored, err.to_string()))
        }
        Err(err) => DispatchOutcome::Reply(reply_ack(state, incoming, AckType::InvalidArgument, err.to_string())),
    }
}

fn decode_chunk(payload_type: PayloadType, payload: &[u8]) -> Result<(u32, Vec<u8>), String> {
    match payload_type {
        PayloadType::Binary => {
            let header = FileTransferChunkHeader::decode_binary(payload).map_err(|e| e.to_string())?;
            let start = FileTransferChunkHeader::BINARY_LEN;
            let end = start + header.chunk_data_size as usize;
            if payload.len() < end {
                return Err("TRANSFER_FILE_CHUNK: buffer shorter than declared chunk_data_size".to_string());
            }
            Ok((header.chunk_index, payload[start..end].to_vec()))
        }
        PayloadType::Json => {
            let decoded: FileTransferChunkJson = json_decode(payload)?;
            Ok((decoded.chunk_index, decoded.chunk_data))
        }
    }
}

fn encode_chunk_response(payload_type: PayloadType, response: &FileTransferChunkResponse) -> Vec<u8> {
    encode(payload_type, response, |r| r.encode_binary())
}

async fn transfer_file_chunk(state: &ServerState, incoming: &Packet) -> DispatchOutcome {
    let (index, data) = match decode_chunk(incoming.payload_type, &incoming.payload) {
        Ok(v) => v,
        Err(msg) => {
            return DispatchOutcome::Reply(reply(
                state,
                incoming,
                Command::TransferFileChunkResponse,
                incoming.payload_type,
                encode_chunk_response(incoming.payload_type, &FileTransferChunkResponse::err(0, msg)),
            ));
        }
    };

    let response = match state.transfers.chunk(incoming.session_token, index, &data).await {
        Ok(accepted) => FileTransferChunkResponse::ok(accepted),
        Err(ChunkError::IndexMismatch { expected, got }) => {
            FileTransferChunkResponse::err(got, format!("Expected chunk {expected}, got {got}"))
        }
        Err(err) => FileTransferChunkResponse::err(index, err.to_string()),
    };

    DispatchOutcome::Reply(reply(
        state,
        incoming,
        Command::TransferFileChunkResponse,
        incoming.payload_type,
        encode_chunk_response(incoming.payload_type, &response),
    ))
}

fn decode_end(payload_type: PayloadType, payload: &[u8]) -> Result<FileTransferEnd, String> {
    match payload_type {
        PayloadType::Binary => FileTransferEnd::decode_binary(payload).map_err(|e| e.to_string()),
        PayloadType::Json => json_decode(payload),
    }
}

async fn transfer_file_end(state: &ServerState, incoming: &Packet) -> DispatchOutcome {
    let end = match decode_end(incoming.payload_type, &incoming.payload) {
        Ok(e) => e,
        Err(msg) => return DispatchOutcome::Reply(reply_ack(state, incoming, AckType::InvalidArgument, msg)),
    };

    match state.transfers.end(incoming.session_token, end.verify_hash).await {
        Ok((dest_path, buffer)) => match state.collaborators.fs.write_file(&dest_path, &buffer).await {
            Ok(()) => DispatchOutcome::Reply(reply_ack(state, incoming, AckType::Success, String::new())),
            Err(err) => DispatchOutcome::Reply(reply_ack(state, incoming, AckType::RuntimeError, err.to_string())),
        },
        Err(err @ EndError::NoActiveTransfer) => {
            DispatchOutcome::Reply(reply_ack(state, incoming, AckType::CommandIgnored, err.to_string()))
        }
        Err(err) => DispatchOutcome::Reply(reply_ack(state, incoming, AckType::RuntimeError, err.to_string())),
    }
}

fn reply(state: &ServerState, incoming: &Packet, command: Command, payload_type: PayloadType, payload: Vec<u8>) -> Packet {
    Packet::new(
        command,
        payload_type,
        state.next_reply_nonce(),
        incoming.session_token,
        payload,
    )
}

fn reply_ack(state: &ServerState, incoming: &Packet, result: AckType, msg: impl Into<String>) -> Packet {
    let ack = if result == AckType::Success {
        GenericAck::ok()
    } else {
        GenericAck::error(result, msg)
    };
    reply(
        state,
        incoming,
        Command::GenericAck,
        incoming.payload_type,
        encode(incoming.payload_type, &ack, |a| a.encode_binary()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::testing::null_collaborators;
    use crate::config::ServerConfig;
    use tgbot_wire::header::SESSION_TOKEN_LEN;

    fn state() -> ServerState {
        ServerState::new(&ServerConfig::default(), null_collaborators())
    }

    #[tokio::test]
    async fn open_session_then_get_uptime_round_trips() {
        let state = state();
        let open = Packet::without_session(Command::OpenSession, PayloadType::Json, 0, vec![]);
        let DispatchOutcome::Reply(ack_packet) = dispatch(&state, &open).await else {
            panic!("expected a reply");
        };
        assert_eq!(ack_packet.command, Command::OpenSessionAck);
        let ack: OpenSessionAck = serde_json::from_slice(&ack_packet.payload).unwrap();
        let token_bytes = hex::decode(&ack.session_token).unwrap();
        let mut token = [0u8; SESSION_TOKEN_LEN];
        token.copy_from_slice(&token_bytes);

        let uptime_req = Packet::new(Command::GetUptime, PayloadType::Json, 1, token, vec![]);
        let DispatchOutcome::Reply(reply_packet) = dispatch(&state, &uptime_req).await else {
            panic!("expected a reply");
        };
        assert_eq!(reply_packet.command, Command::GetUptimeCallback);
    }

    #[tokio::test]
    async fn replayed_nonce_is_dropped_silently() {
        let state = state();
        let open = Packet::without_session(Command::OpenSession, PayloadType::Json, 0, vec![]);
        let DispatchOutcome::Reply(ack_packet) = dispatch(&state, &open).await else {
            panic!("expected a reply");
        };
        let ack: OpenSessionAck = serde_json::from_slice(&ack_packet.payload).unwrap();
        let token_bytes = hex::decode(&ack.session_token).unwrap();
        let mut token = [0u8; SESSION_TOKEN_LEN];
        token.copy_from_slice(&token_bytes);

        let first = Packet::new(Command::GetUptime, PayloadType::Json, 7, token, vec![]);
        assert!(matches!(dispatch(&state, &first).await, DispatchOutcome::Reply(_)));

        let replay = Packet::new(Command::GetUptime, PayloadType::Json, 5, token, vec![]);
        assert!(matches!(dispatch(&state, &replay).await, DispatchOutcome::Drop));
    }

    #[tokio::test]
    async fn internal_only_command_is_rejected() {
        let state = state();
        let bogus = Packet::without_session(Command::GenericAck, PayloadType::Binary, 0, vec![]);
        let DispatchOutcome::Reply(reply_packet) = dispatch(&state, &bogus).await else {
            panic!("expected a reply");
        };
        let ack = GenericAck::decode_binary(&reply_packet.payload).unwrap();
        assert_eq!(ack.result, AckType::InvalidArgument);
    }
}
