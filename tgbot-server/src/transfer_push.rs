//! Server-initiated large-file push: once `TRANSFER_FILE_REQUEST` names a
//! source file at or above the chunked threshold, the server itself drives
//! a full BEGIN/CHUNK*/END exchange over the same connection instead of
//! answering with a single reply. This is the one place the dispatcher's
//! one-request-one-reply shape is broken, so it gets its own function with
//! direct access to the connection's reader and writer halves.
use log::info;
use tgbot_wire::payload::{
    AckType, FileTransferBegin, FileTransferChunkHeader, FileTransferChunkResponse,
    FileTransferEnd, GenericAck,
};
use tgbot_wire::{codec, Command, Packet, PayloadType, ReadError};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::state::ServerState;

#[derive(Debug)]
pub enum PushError {
    Io(ReadError),
    ChunkRejected { index: u32, error_msg: String },
    FinalAckFailed { result: AckType, error_msg: String },
}

impl std::fmt::Display for PushError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "transport error during server push: {err}"),
            Self::ChunkRejected { index, error_msg } => {
                write!(f, "client rejected chunk {index}: {error_msg}")
            }
            Self::FinalAckFailed { result, error_msg } => {
                write!(f, "client rejected END ({result:?}): {error_msg}")
            }
        }
    }
}

impl std::error::Error for PushError {}

impl From<ReadError> for PushError {
    fn from(err: ReadError) -> Self {
        Self::Io(err)
    }
}

/// Run the whole BEGIN/CHUNK*/END exchange for one push, in memory: `data`
/// is the already-read source file content (read by the dispatcher via
/// `TransferFs::read_file` before the size decision was made).
pub async fn drive_push<R, W>(
    reader: &mut R,
    writer: &mut W,
    state: &ServerState,
    session_token: [u8; 32],
    begin: FileTransferBegin,
    data: Vec<u8>,
) -> Result<(), PushError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let chunk_size = begin.chunk_size.max(1) as usize;
    let total_chunks = (data.len() as u64).div_ceil(begin.chunk_size.max(1) as u64).max(1);

    let begin_packet = Packet::new(
        Command::TransferFileBegin,
        PayloadType::Binary,
        state.next_reply_nonce(),
        session_token,
        begin.encode_binary(),
    );
    codec::write(writer, &begin_packet).await?;
    expect_success_ack(reader, state.max_data_size).await?;

    for (index, chunk) in data.chunks(chunk_size).enumerate() {
        let index = index as u32;
        let mut payload = FileTransferChunkHeader {
            chunk_index: index,
            chunk_data_size: chunk.len() as u32,
        }
        .encode_binary()
        .to_vec();
        payload.extend_from_slice(chunk);

        let packet = Packet::new(
            Command::TransferFileChunk,
            PayloadType::Binary,
            state.next_reply_nonce(),
            session_token,
            payload,
        );
        codec::write(writer, &packet).await?;

        let reply = codec::read(reader, state.max_data_size).await?;
        let response = FileTransferChunkResponse::decode_binary(&reply.payload).map_err(|err| PushError::ChunkRejected {
            index,
            error_msg: err.to_string(),
        })?;
        if !response.ok {
            return Err(PushError::ChunkRejected {
                index,
                error_msg: response.error_msg,
            });
        }

        let is_last = u64::from(index) + 1 == total_chunks;
        if is_last || index % 10 == 9 {
            info!("push progress: chunk {}/{total_chunks}", index + 1);
        }
    }

    let end_packet = Packet::new(
        Command::TransferFileEnd,
        PayloadType::Binary,
        state.next_reply_nonce(),
        session_token,
        FileTransferEnd { verify_hash: true }.encode_binary(),
    );
    codec::write(writer, &end_packet).await?;
    expect_success_ack(reader, state.max_data_size).await?;

    Ok(())
}

async fn expect_success_ack<R: AsyncRead + Unpin>(reader: &mut R, max_data_size: u64) -> Result<(), PushError> {
    let packet = codec::read(reader, max_data_size).await?;
    let ack = GenericAck::decode_binary(&packet.payload).map_err(|err| PushError::FinalAckFailed {
        result: AckType::RuntimeError,
        error_msg: err.to_string(),
    })?;
    if ack.result != AckType::Success {
        return Err(PushError::FinalAckFailed {
            result: ack.result,
            error_msg: ack.error_msg,
        });
    }
    Ok(())
}
