//! Command-specific payload shapes, both the packed binary layout and the
//! JSON shape (same fields, hashes as lowercase hex, enums as their
//! lowercased binary-equivalent name).
use serde::{Deserialize, Serialize};

use crate::binary::{read_fixed_str, write_fixed_str};
use crate::error::DecodeError;

/// `MAX_PATH = 260` is a Windows-era carry-over kept as the wire constant
/// for compatibility even though the in-process path representation is
/// unbounded UTF-8.
pub const MAX_PATH: usize = 260;
pub const MESSAGE_LEN: usize = 256;
pub const ERROR_MSG_LEN: usize = 256;
pub const UPTIME_LEN: usize = 64;
pub const HASH_LEN: usize = 32;
pub const LOG_MESSAGE_LEN: usize = 1024;

pub type ChatId = i64;

mod hex32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(de)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("hash must be exactly 32 bytes"))
    }
}

fn bool_to_u8(b: bool) -> u8 {
    u8::from(b)
}

fn u8_to_bool(b: u8) -> bool {
    b != 0
}

/// `{chat_id, message[256]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteMsgToChatId {
    pub chat: ChatId,
    pub message: String,
}

impl WriteMsgToChatId {
    pub fn encode_binary(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 8 + MESSAGE_LEN];
        buf[0..8].copy_from_slice(&self.chat.to_le_bytes());
        write_fixed_str(&mut buf, 8, &self.message, MESSAGE_LEN);
        buf
    }

    pub fn decode_binary(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < 8 + MESSAGE_LEN {
            return Err(DecodeError("WriteMsgToChatId: buffer too short".into()));
        }
        let chat = i64::from_le_bytes(buf[0..8].try_into().unwrap());
        let message = read_fixed_str(buf, 8, MESSAGE_LEN)?;
        Ok(Self { chat, message })
    }
}

/// `{chat_id, observe: bool}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserveChatId {
    pub chat: ChatId,
    pub observe: bool,
}

impl ObserveChatId {
    pub fn encode_binary(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 9];
        buf[0..8].copy_from_slice(&self.chat.to_le_bytes());
        buf[8] = bool_to_u8(self.observe);
        buf
    }

    pub fn decode_binary(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < 9 {
            return Err(DecodeError("ObserveChatId: buffer too short".into()));
        }
        Ok(Self {
            chat: i64::from_le_bytes(buf[0..8].try_into().unwrap()),
            observe: u8_to_bool(buf[8]),
        })
    }
}

/// `{observe: bool}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserveAllChats {
    pub observe: bool,
}

impl ObserveAllChats {
    pub fn encode_binary(&self) -> Vec<u8> {
        vec![bool_to_u8(self.observe)]
    }

    pub fn decode_binary(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.is_empty() {
            return Err(DecodeError("ObserveAllChats: buffer too short".into()));
        }
        Ok(Self {
            observe: u8_to_bool(buf[0]),
        })
    }
}

/// File kind for `SEND_FILE_TO_CHAT_ID`, matching the Telegram API façade's
/// `sendPhoto`/`sendVideo`/`sendSticker`/`sendAnimation`/`sendDocument`/`sendDice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum FileType {
    Photo = 0,
    Video = 1,
    Sticker = 2,
    Animation = 3,
    Document = 4,
    Dice = 5,
}

impl TryFrom<u8> for FileType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Photo,
            1 => Self::Video,
            2 => Self::Sticker,
            3 => Self::Animation,
            4 => Self::Document,
            5 => Self::Dice,
            other => return Err(DecodeError(format!("unknown FileType byte {other}"))),
        })
    }
}

/// `{chat_id, file_type, path[MAX_PATH]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendFileToChatId {
    pub chat: ChatId,
    pub file_type: FileType,
    pub path: String,
}

impl SendFileToChatId {
    pub fn encode_binary(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 8 + 1 + MAX_PATH];
        buf[0..8].copy_from_slice(&self.chat.to_le_bytes());
        buf[8] = self.file_type as u8;
        write_fixed_str(&mut buf, 9, &self.path, MAX_PATH);
        buf
    }

    pub fn decode_binary(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < 9 + MAX_PATH {
            return Err(DecodeError("SendFileToChatId: buffer too short".into()));
        }
        Ok(Self {
            chat: i64::from_le_bytes(buf[0..8].try_into().unwrap()),
            file_type: FileType::try_from(buf[8])?,
            path: read_fixed_str(buf, 9, MAX_PATH)?,
        })
    }
}

/// Spam-block aggressiveness, set by `CTRL_SPAMBLOCK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum SpamblockMode {
    Off = 0,
    Moderate = 1,
    Strict = 2,
}

impl TryFrom<u32> for SpamblockMode {
    type Error = DecodeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Off,
            1 => Self::Moderate,
            2 => Self::Strict,
            other => return Err(DecodeError(format!("unknown SpamblockMode {other}"))),
        })
    }
}

/// `{mode}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtrlSpamblock {
    pub mode: SpamblockMode,
}

impl CtrlSpamblock {
    pub fn encode_binary(&self) -> Vec<u8> {
        (self.mode as u32).to_le_bytes().to_vec()
    }

    pub fn decode_binary(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < 4 {
            return Err(DecodeError("CtrlSpamblock: buffer too short".into()));
        }
        let mode = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        Ok(Self {
            mode: SpamblockMode::try_from(mode)?,
        })
    }
}

/// `TRANSFER_FILE_REQUEST`'s dry-run shape: `MAX_PATH src + MAX_PATH dst +
/// 3x u8 options (overwrite, hash_ignore, dry_run) + 32-byte hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTransferMeta {
    pub src: String,
    pub dst: String,
    pub overwrite: bool,
    pub hash_ignore: bool,
    pub dry_run: bool,
    #[serde(with = "hex32")]
    pub hash: [u8; HASH_LEN],
}

impl FileTransferMeta {
    const BINARY_LEN: usize = MAX_PATH + MAX_PATH + 3 + HASH_LEN;

    pub fn encode_binary(&self) -> Vec<u8> {
        let mut buf = vec![0u8; Self::BINARY_LEN];
        write_fixed_str(&mut buf, 0, &self.src, MAX_PATH);
        write_fixed_str(&mut buf, MAX_PATH, &self.dst, MAX_PATH);
        let opts_off = MAX_PATH * 2;
        buf[opts_off] = bool_to_u8(self.overwrite);
        buf[opts_off + 1] = bool_to_u8(self.hash_ignore);
        buf[opts_off + 2] = bool_to_u8(self.dry_run);
        buf[opts_off + 3..opts_off + 3 + HASH_LEN].copy_from_slice(&self.hash);
        buf
    }

    pub fn decode_binary(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < Self::BINARY_LEN {
            return Err(DecodeError("FileTransferMeta: buffer too short".into()));
        }
        let src = read_fixed_str(buf, 0, MAX_PATH)?;
        let dst = read_fixed_str(buf, MAX_PATH, MAX_PATH)?;
        let opts_off = MAX_PATH * 2;
        let mut hash = [0u8; HASH_LEN];
        hash.copy_from_slice(&buf[opts_off + 3..opts_off + 3 + HASH_LEN]);
        Ok(Self {
            src,
            dst,
            overwrite: u8_to_bool(buf[opts_off]),
            hash_ignore: u8_to_bool(buf[opts_off + 1]),
            dry_run: u8_to_bool(buf[opts_off + 2]),
            hash,
        })
    }
}

/// `MAX_PATH dst + u64 total + u32 chunk + 32-byte hash`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTransferBegin {
    pub dest_path: String,
    pub total_size: u64,
    pub chunk_size: u32,
    #[serde(with = "hex32")]
    pub sha256_hash: [u8; HASH_LEN],
}

impl FileTransferBegin {
    const BINARY_LEN: usize = MAX_PATH + 8 + 4 + HASH_LEN;

    pub fn encode_binary(&self) -> Vec<u8> {
        let mut buf = vec![0u8; Self::BINARY_LEN];
        write_fixed_str(&mut buf, 0, &self.dest_path, MAX_PATH);
        buf[MAX_PATH..MAX_PATH + 8].copy_from_slice(&self.total_size.to_le_bytes());
        buf[MAX_PATH + 8..MAX_PATH + 12].copy_from_slice(&self.chunk_size.to_le_bytes());
        buf[MAX_PATH + 12..MAX_PATH + 12 + HASH_LEN].copy_from_slice(&self.sha256_hash);
        buf
    }

    pub fn decode_binary(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < Self::BINARY_LEN {
            return Err(DecodeError("FileTransferBegin: buffer too short".into()));
        }
        let dest_path = read_fixed_str(buf, 0, MAX_PATH)?;
        let total_size = u64::from_le_bytes(buf[MAX_PATH..MAX_PATH + 8].try_into().unwrap());
        let chunk_size =
            u32::from_le_bytes(buf[MAX_PATH + 8..MAX_PATH + 12].try_into().unwrap());
        let mut sha256_hash = [0u8; HASH_LEN];
        sha256_hash.copy_from_slice(&buf[MAX_PATH + 12..MAX_PATH + 12 + HASH_LEN]);
        Ok(Self {
            dest_path,
            total_size,
            chunk_size,
            sha256_hash,
        })
    }
}

/// `u32 index + u32 size + size bytes`. The chunk bytes are kept out of the
/// struct's binary encoding helpers (the dispatcher streams them directly
/// instead of copying through an owned `Vec`); only the header portion is
/// encoded/decoded here, matching `FileTransferChunk::chunk_data` being a
/// raw pointer into the original packet's buffer rather than an owned
/// allocation in the source implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTransferChunkHeader {
    pub chunk_index: u32,
    pub chunk_data_size: u32,
}

impl FileTransferChunkHeader {
    pub const BINARY_LEN: usize = 8;

    pub fn encode_binary(&self) -> [u8; Self::BINARY_LEN] {
        let mut buf = [0u8; Self::BINARY_LEN];
        buf[0..4].copy_from_slice(&self.chunk_index.to_le_bytes());
        buf[4..8].copy_from_slice(&self.chunk_data_size.to_le_bytes());
        buf
    }

    pub fn decode_binary(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < Self::BINARY_LEN {
            return Err(DecodeError("FileTransferChunk: buffer too short".into()));
        }
        Ok(Self {
            chunk_index: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            chunk_data_size: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
        })
    }
}

/// JSON variant of `TRANSFER_FILE_CHUNK`; carries the chunk bytes inline
/// since there is no separate sentinel-delimited body for this command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileTransferChunkJson {
    pub chunk_index: u32,
    #[serde(with = "serde_bytes_vec")]
    pub chunk_data: Vec<u8>,
}

mod serde_bytes_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

/// `u32 index + u8 ok + 256-byte error`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTransferChunkResponse {
    pub chunk_index: u32,
    pub ok: bool,
    pub error_msg: String,
}

impl FileTransferChunkResponse {
    const BINARY_LEN: usize = 4 + 1 + ERROR_MSG_LEN;

    pub fn ok(chunk_index: u32) -> Self {
        Self {
            chunk_index,
            ok: true,
            error_msg: String::new(),
        }
    }

    pub fn err(chunk_index: u32, msg: impl Into<String>) -> Self {
        Self {
            chunk_index,
            ok: false,
            error_msg: msg.into(),
        }
    }

    pub fn encode_binary(&self) -> Vec<u8> {
        let mut buf = vec![0u8; Self::BINARY_LEN];
        buf[0..4].copy_from_slice(&self.chunk_index.to_le_bytes());
        buf[4] = bool_to_u8(self.ok);
        write_fixed_str(&mut buf, 5, &self.error_msg, ERROR_MSG_LEN);
        buf
    }

    pub fn decode_binary(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < Self::BINARY_LEN {
            return Err(DecodeError(
                "FileTransferChunkResponse: buffer too short".into(),
            ));
        }
        Ok(Self {
            chunk_index: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            ok: u8_to_bool(buf[4]),
            error_msg: read_fixed_str(buf, 5, ERROR_MSG_LEN)?,
        })
    }
}

/// `{verify_hash}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTransferEnd {
    pub verify_hash: bool,
}

impl FileTransferEnd {
    pub fn encode_binary(&self) -> Vec<u8> {
        vec![bool_to_u8(self.verify_hash)]
    }

    pub fn decode_binary(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.is_empty() {
            return Err(DecodeError("FileTransferEnd: buffer too short".into()));
        }
        Ok(Self {
            verify_hash: u8_to_bool(buf[0]),
        })
    }
}

/// `{uptime[64]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetUptimeCallback {
    pub uptime: String,
}

impl GetUptimeCallback {
    pub fn encode_binary(&self) -> Vec<u8> {
        let mut buf = vec![0u8; UPTIME_LEN];
        write_fixed_str(&mut buf, 0, &self.uptime, UPTIME_LEN);
        buf
    }

    pub fn decode_binary(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < UPTIME_LEN {
            return Err(DecodeError("GetUptimeCallback: buffer too short".into()));
        }
        Ok(Self {
            uptime: read_fixed_str(buf, 0, UPTIME_LEN)?,
        })
    }
}

/// The result code every [`GenericAck`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum AckType {
    Success = 0,
    TgApiException = 1,
    InvalidArgument = 2,
    CommandIgnored = 3,
    RuntimeError = 4,
    ClientError = 5,
}

impl TryFrom<u32> for AckType {
    type Error = DecodeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Success,
            1 => Self::TgApiException,
            2 => Self::InvalidArgument,
            3 => Self::CommandIgnored,
            4 => Self::RuntimeError,
            5 => Self::ClientError,
            other => return Err(DecodeError(format!("unknown AckType {other}"))),
        })
    }
}

/// `{result, error_msg[256]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericAck {
    pub result: AckType,
    pub error_msg: String,
}

impl GenericAck {
    pub fn ok() -> Self {
        Self {
            result: AckType::Success,
            error_msg: String::new(),
        }
    }

    pub fn error(result: AckType, msg: impl Into<String>) -> Self {
        debug_assert_ne!(result, AckType::Success);
        Self {
            result,
            error_msg: msg.into(),
        }
    }

    pub fn encode_binary(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 4 + ERROR_MSG_LEN];
        buf[0..4].copy_from_slice(&(self.result as u32).to_le_bytes());
        write_fixed_str(&mut buf, 4, &self.error_msg, ERROR_MSG_LEN);
        buf
    }

    pub fn decode_binary(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < 4 + ERROR_MSG_LEN {
            return Err(DecodeError("GenericAck: buffer too short".into()));
        }
        let result = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        Ok(Self {
            result: AckType::try_from(result)?,
            error_msg: read_fixed_str(buf, 4, ERROR_MSG_LEN)?,
        })
    }
}

/// `{session_token, expiration_time}` — the only payload ever sent with a
/// zero-filled session token in its header, since no session exists yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSessionAck {
    pub session_token: String,
    pub expiration_time: String,
}

/// `{magic, severity, message[1024]}` pushed by the log fan-out sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub severity: LogSeverity,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LogSeverity {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl TryFrom<u8> for LogSeverity {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Trace,
            1 => Self::Debug,
            2 => Self::Info,
            3 => Self::Warn,
            4 => Self::Error,
            other => return Err(DecodeError(format!("unknown LogSeverity {other}"))),
        })
    }
}

impl LogEntry {
    const BINARY_LEN: usize = 1 + LOG_MESSAGE_LEN;

    pub fn encode_binary(&self) -> Vec<u8> {
        let mut buf = vec![0u8; Self::BINARY_LEN];
        buf[0] = self.severity as u8;
        write_fixed_str(&mut buf, 1, &self.message, LOG_MESSAGE_LEN);
        buf
    }

    pub fn decode_binary(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < Self::BINARY_LEN {
            return Err(DecodeError("LogEntry: buffer too short".into()));
        }
        Ok(Self {
            severity: LogSeverity::try_from(buf[0])?,
            message: read_fixed_str(buf, 1, LOG_MESSAGE_LEN)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_msg_round_trips() {
        let msg = WriteMsgToChatId {
            chat: -1001234567890,
            message: "hello there".into(),
        };
        let encoded = msg.encode_binary();
        assert_eq!(encoded.len(), 8 + MESSAGE_LEN);
        assert_eq!(WriteMsgToChatId::decode_binary(&encoded).unwrap(), msg);
    }

    #[test]
    fn generic_ack_round_trips() {
        let ack = GenericAck::error(AckType::CommandIgnored, "CMD_OBSERVE_ALL_CHATS active");
        let encoded = ack.encode_binary();
        assert_eq!(GenericAck::decode_binary(&encoded).unwrap(), ack);
    }

    #[test]
    fn file_transfer_begin_round_trips() {
        let begin = FileTransferBegin {
            dest_path: "/tmp/out.bin".into(),
            total_size: 25 * 1024 * 1024,
            chunk_size: 1024 * 1024,
            sha256_hash: [0x42; HASH_LEN],
        };
        let encoded = begin.encode_binary();
        assert_eq!(FileTransferBegin::decode_binary(&encoded).unwrap(), begin);
    }

    #[test]
    fn open_session_ack_json_uses_given_field_names() {
        let ack = OpenSessionAck {
            session_token: hex::encode([0x11; HASH_LEN]),
            expiration_time: "2026-07-28 10:00:00".into(),
        };
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json["session_token"], hex::encode([0x11; HASH_LEN]));
        assert_eq!(json["expiration_time"], "2026-07-28 10:00:00");
    }

    #[test]
    fn hash_serializes_as_lowercase_hex() {
        let begin = FileTransferBegin {
            dest_path: "x".into(),
            total_size: 1,
            chunk_size: 1,
            sha256_hash: [0xAB; HASH_LEN],
        };
        let json = serde_json::to_string(&begin).unwrap();
        assert!(json.contains(&"ab".repeat(HASH_LEN)));
    }
}
