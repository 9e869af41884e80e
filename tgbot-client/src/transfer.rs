//! Client-side counterpart of the chunked transfer engine: the legacy
//! single-packet push, the dry-run request that may turn into a chunked
//! download, and the receive-chunked state machine driven by a
//! server-initiated BEGIN/CHUNK*/END exchange.
//!
//! The receive side reuses `tgbot_transfer::TransferTable` rather than
//! re-implementing its bookkeeping: a client only ever has one transfer in
//! flight per session, so a table with a single entry is exactly the right
//! shape, and it gets the same overflow/index/hash checks the server itself
//! relies on for free.
use log::info;
use sha2::{Digest, Sha256};
use tgbot_transfer::TransferTable;
use tgbot_wire::payload::{
    AckType, FileTransferBegin, FileTransferChunkHeader, FileTransferChunkJson,
    FileTransferChunkResponse, FileTransferEnd, FileTransferMeta, GenericAck, HASH_LEN, MAX_PATH,
};
use tgbot_wire::{json_body, Command, Packet, PayloadType};

use crate::net::{Channel, ClientError};
use crate::session::ClientSession;

const META_BINARY_LEN: usize = MAX_PATH * 2 + 3 + HASH_LEN;

#[derive(Debug)]
pub enum TransferError {
    Channel(ClientError),
    Rejected { result: AckType, error_msg: String },
    Protocol(String),
    Io(std::io::Error),
}

impl std::fmt::Display for TransferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel(err) => write!(f, "{err}"),
            Self::Rejected { result, error_msg } => write!(f, "server rejected transfer ({result:?}): {error_msg}"),
            Self::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Self::Io(err) => write!(f, "local i/o error: {err}"),
        }
    }
}

impl std::error::Error for TransferError {}

impl From<ClientError> for TransferError {
    fn from(err: ClientError) -> Self {
        Self::Channel(err)
    }
}

impl From<std::io::Error> for TransferError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
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
            let meta = serde_json::from_slice(json).map_err(|e: serde_json::Error| e.to_string())?;
            Ok((meta, body.to_vec()))
        }
    }
}

fn expect_ack(reply: &Packet) -> Result<(), TransferError> {
    if reply.command != Command::GenericAck {
        return Err(TransferError::Protocol(format!(
            "expected GENERIC_ACK, got {}",
            reply.command.name()
        )));
    }
    let ack = match reply.payload_type {
        PayloadType::Binary => GenericAck::decode_binary(&reply.payload).map_err(|e| e.to_string()),
        PayloadType::Json => serde_json::from_slice(&reply.payload).map_err(|e: serde_json::Error| e.to_string()),
    }
    .map_err(TransferError::Protocol)?;
    if ack.result != AckType::Success {
        return Err(TransferError::Rejected {
            result: ack.result,
            error_msg: ack.error_msg,
        });
    }
    Ok(())
}

fn ack_packet(session: &mut ClientSession, payload_type: PayloadType, ack: GenericAck) -> Packet {
    let payload = match payload_type {
        PayloadType::Binary => ack.encode_binary(),
        PayloadType::Json => serde_json::to_vec(&ack).expect("GenericAck always serializes"),
    };
    session.packet(Command::GenericAck, payload_type, payload)
}

/// `TRANSFER_FILE` as a direct client-driven push: the whole file body
/// travels in one packet (the legacy small-file push path).
pub async fn push_small(
    channel: &mut Channel,
    session: &mut ClientSession,
    max_data_size: u64,
    payload_type: PayloadType,
    meta: FileTransferMeta,
    body: Vec<u8>,
) -> Result<(), TransferError> {
    let payload = encode_meta_and_body(payload_type, &meta, &body);
    let request = session.packet(Command::TransferFile, payload_type, payload);
    let reply = channel.roundtrip(&request, max_data_size).await?;
    expect_ack(&reply)
}

/// `TRANSFER_FILE_REQUEST`: ask the server for a file; it answers either
/// with the whole body in one `TRANSFER_FILE` packet, or by starting a
/// chunked download.
pub async fn request(
    channel: &mut Channel,
    session: &mut ClientSession,
    max_data_size: u64,
    payload_type: PayloadType,
    meta: FileTransferMeta,
) -> Result<(), TransferError> {
    let payload = match payload_type {
        PayloadType::Binary => meta.encode_binary(),
        PayloadType::Json => serde_json::to_vec(&meta).expect("FileTransferMeta always serializes"),
    };
    let request = session.packet(Command::TransferFileRequest, payload_type, payload);
    let reply = channel.roundtrip(&request, max_data_size).await?;

    match reply.command {
        Command::TransferFile => {
            let (out_meta, body) =
                decode_meta_and_body(reply.payload_type, &reply.payload).map_err(TransferError::Protocol)?;
            if !out_meta.hash_ignore {
                let digest: [u8; HASH_LEN] = Sha256::digest(&body).into();
                if digest != out_meta.hash {
                    return Err(TransferError::Protocol("sha256 mismatch on single-packet transfer".into()));
                }
            }
            tokio::fs::write(&out_meta.dst, &body).await?;
            info!("wrote {} bytes to {}", body.len(), out_meta.dst);
            Ok(())
        }
        Command::TransferFileBegin => {
            let begin = match reply.payload_type {
                PayloadType::Binary => FileTransferBegin::decode_binary(&reply.payload).map_err(|e| e.to_string()),
                PayloadType::Json => serde_json::from_slice(&reply.payload).map_err(|e: serde_json::Error| e.to_string()),
            }
            .map_err(TransferError::Protocol)?;
            receive_chunked(channel, session, max_data_size, reply.payload_type, begin).await
        }
        Command::GenericAck => {
            expect_ack(&reply)?;
            Ok(())
        }
        other => Err(TransferError::Protocol(format!(
            "unexpected reply to TRANSFER_FILE_REQUEST: {}",
            other.name()
        ))),
    }
}

/// Receive-chunked mode: answer a server-initiated `BEGIN` with a success
/// ack, accept sequential `CHUNK` packets, and close out on `END`.
async fn receive_chunked(
    channel: &mut Channel,
    session: &mut ClientSession,
    max_data_size: u64,
    payload_type: PayloadType,
    begin: FileTransferBegin,
) -> Result<(), TransferError> {
    let table = TransferTable::new();
    let outcome = table
        .begin(
            session.token,
            begin.dest_path.clone(),
            begin.total_size,
            begin.chunk_size,
            begin.sha256_hash,
        )
        .await;

    let begin_ack = match outcome {
        Ok(()) => GenericAck::ok(),
        Err(err) => {
            let ack = GenericAck::error(AckType::InvalidArgument, err.to_string());
            let packet = ack_packet(session, payload_type, ack.clone());
            channel.write(&packet).await?;
            return Err(TransferError::Rejected {
                result: AckType::InvalidArgument,
                error_msg: err.to_string(),
            });
        }
    };
    channel.write(&ack_packet(session, payload_type, begin_ack)).await?;

    loop {
        let packet = channel.read(max_data_size).await?;
        match packet.command {
            Command::TransferFileChunk => {
                let (index, data) = decode_chunk(packet.payload_type, &packet.payload).map_err(TransferError::Protocol)?;
                let response = match table.chunk(session.token, index, &data).await {
                    Ok(accepted) => FileTransferChunkResponse::ok(accepted),
                    Err(tgbot_transfer::ChunkError::IndexMismatch { expected, got }) => {
                        FileTransferChunkResponse::err(got, format!("Expected chunk {expected}, got {got}"))
                    }
                    Err(err) => FileTransferChunkResponse::err(index, err.to_string()),
                };
                let payload = match packet.payload_type {
                    PayloadType::Binary => response.encode_binary(),
                    PayloadType::Json => serde_json::to_vec(&response).expect("response always serializes"),
                };
                let reply = session.packet(Command::TransferFileChunkResponse, packet.payload_type, payload);
                channel.write(&reply).await?;
            }
            Command::TransferFileEnd => {
                let end = match packet.payload_type {
                    PayloadType::Binary => FileTransferEnd::decode_binary(&packet.payload).map_err(|e| e.to_string()),
                    PayloadType::Json => {
                        serde_json::from_slice(&packet.payload).map_err(|e: serde_json::Error| e.to_string())
                    }
                }
                .map_err(TransferError::Protocol)?;

                return match table.end(session.token, end.verify_hash).await {
                    Ok((dest_path, buffer)) => {
                        tokio::fs::write(&dest_path, &buffer).await?;
                        info!("transfer complete: wrote {} bytes to {dest_path}", buffer.len());
                        channel.write(&ack_packet(session, packet.payload_type, GenericAck::ok())).await?;
                        Ok(())
                    }
                    Err(err) => {
                        let ack = GenericAck::error(AckType::RuntimeError, err.to_string());
                        channel.write(&ack_packet(session, packet.payload_type, ack)).await?;
                        Err(TransferError::Rejected {
                            result: AckType::RuntimeError,
                            error_msg: err.to_string(),
                        })
                    }
                };
            }
            other => {
                return Err(TransferError::Protocol(format!(
                    "unexpected packet during chunked transfer: {}",
                    other.name()
                )))
            }
        }
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
            let decoded: FileTransferChunkJson = serde_json::from_slice(payload).map_err(|e| e.to_string())?;
            Ok((decoded.chunk_index, decoded.chunk_data))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_meta() -> FileTransferMeta {
        FileTransferMeta {
            src: "a.bin".into(),
            dst: "b.bin".into(),
            overwrite: true,
            hash_ignore: false,
            dry_run: false,
            hash: [0x11; HASH_LEN],
        }
    }

    #[test]
    fn binary_meta_and_body_round_trip() {
        let meta = sample_meta();
        let body = b"payload bytes".to_vec();
        let encoded = encode_meta_and_body(PayloadType::Binary, &meta, &body);
        let (decoded_meta, decoded_body) = decode_meta_and_body(PayloadType::Binary, &encoded).unwrap();
        assert_eq!(decoded_meta, meta);
        assert_eq!(decoded_body, body);
    }

    #[test]
    fn json_meta_and_body_round_trip() {
        let meta = sample_meta();
        let body = b"payload bytes".to_vec();
        let encoded = encode_meta_and_body(PayloadType::Json, &meta, &body);
        let (decoded_meta, decoded_body) = decode_meta_and_body(PayloadType::Json, &encoded).unwrap();
        assert_eq!(decoded_meta, meta);
        assert_eq!(decoded_body, body);
    }

    #[test]
    fn decode_chunk_binary_extracts_index_and_data() {
        let header = FileTransferChunkHeader {
            chunk_index: 7,
            chunk_data_size: 3,
        };
        let mut payload = header.encode_binary().to_vec();
        payload.extend_from_slice(b"xyz");

        let (index, data) = decode_chunk(PayloadType::Binary, &payload).unwrap();
        assert_eq!(index, 7);
        assert_eq!(data, b"xyz");
    }

    #[test]
    fn decode_chunk_binary_rejects_truncated_body() {
        let header = FileTransferChunkHeader {
            chunk_index: 0,
            chunk_data_size: 10,
        };
        let payload = header.encode_binary().to_vec();
        assert!(decode_chunk(PayloadType::Binary, &payload).is_err());
    }

    #[test]
    fn decode_chunk_json_extracts_index_and_data() {
        let chunk = FileTransferChunkJson {
            chunk_index: 2,
            chunk_data: b"hi".to_vec(),
        };
        let payload = serde_json::to_vec(&chunk).unwrap();
        let (index, data) = decode_chunk(PayloadType::Json, &payload).unwrap();
        assert_eq!(index, 2);
        assert_eq!(data, b"hi");
    }

    #[test]
    fn expect_ack_rejects_a_non_generic_ack_reply() {
        let reply = Packet::without_session(Command::OpenSessionAck, PayloadType::Binary, 0, vec![]);
        assert!(matches!(expect_ack(&reply), Err(TransferError::Protocol(_))));
    }

    #[test]
    fn expect_ack_surfaces_a_rejected_generic_ack() {
        let ack = GenericAck::error(AckType::InvalidArgument, "bad path");
        let reply = Packet::without_session(Command::GenericAck, PayloadType::Binary, 0, ack.encode_binary());
        match expect_ack(&reply) {
            Err(TransferError::Rejected { result, error_msg }) => {
                assert_eq!(result, AckType::InvalidArgument);
                assert_eq!(error_msg, "bad path");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }
}
