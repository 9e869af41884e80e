//! Errors produced while framing or decoding packets.
use std::{fmt, io};

/// Failure reading a [`crate::Packet`] off the wire.
#[derive(Debug)]
pub enum ReadError {
    /// The transport itself failed (peer closed, OS error, ...).
    Io(io::Error),
    /// The header or payload violated the wire contract.
    Protocol(ProtocolError),
    /// `data_size` exceeded the configured maximum.
    TooLarge { data_size: u64, max: u64 },
}

/// Malformed framing: bad magic, checksum mismatch, or a payload that
/// doesn't match its declared `payload_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    BadMagic { got: u64 },
    BadChecksum { expected: u32, got: u32 },
    UnknownPayloadType(u8),
    UnknownCommand(u32),
    /// A JSON payload that carries an attached body is missing the
    /// `JSON_BYTE_BORDER` sentinel.
    MissingBodySentinel,
    Decode(String),
}

impl std::error::Error for ReadError {}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "read error, IO failed: {err}"),
            Self::Protocol(err) => write!(f, "read error, protocol violation: {err}"),
            Self::TooLarge { data_size, max } => {
                write!(f, "read error, data_size {data_size} exceeds max {max}")
            }
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic { got } => write!(f, "bad magic: 0x{got:016x}"),
            Self::BadChecksum { expected, got } => {
                write!(f, "checksum mismatch: expected {expected:#x}, got {got:#x}")
            }
            Self::UnknownPayloadType(b) => write!(f, "unknown payload_type byte {b}"),
            Self::UnknownCommand(c) => write!(f, "unknown command code {c}"),
            Self::MissingBodySentinel => write!(f, "JSON payload has no JSON_BYTE_BORDER sentinel"),
            Self::Decode(msg) => write!(f, "payload decode failure: {msg}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<io::Error> for ReadError {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<ProtocolError> for ReadError {
    fn from(error: ProtocolError) -> Self {
        Self::Protocol(error)
    }
}

/// Failure decoding a command-specific payload from its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError(pub String);

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for DecodeError {}

impl From<DecodeError> for ProtocolError {
    fn from(error: DecodeError) -> Self {
        Self::Decode(error.0)
    }
}
