//! Hand-rolled error enums, in the style of `grammers-mtsender::errors`
//! (`impl Display` by hand, no `snafu`) rather than `tgbot-session`'s use
//! of `snafu` — the plain style fits when the set of variants is small and
//! none of them wrap a `source` chain worth deriving.
use std::fmt;

/// Rejections from [`crate::TransferTable::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginError {
    /// A transfer session already exists for this session token (at most
    /// one active transfer per session).
    AlreadyActive,
    TotalSizeIsZero,
    ChunkSizeIsZero,
    EmptyDestination,
}

impl fmt::Display for BeginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyActive => write!(f, "a transfer is already active for this session"),
            Self::TotalSizeIsZero => write!(f, "total_size must be nonzero"),
            Self::ChunkSizeIsZero => write!(f, "chunk_size must be nonzero"),
            Self::EmptyDestination => write!(f, "destination path must not be empty"),
        }
    }
}

impl std::error::Error for BeginError {}

/// Rejections from [`crate::TransferTable::chunk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkError {
    /// No `BEGIN` precedes this chunk for the given session token.
    NoActiveTransfer,
    /// `chunk_index` did not match the next expected index; the buffer is
    /// left untouched.
    IndexMismatch { expected: u32, got: u32 },
    /// Appending this chunk would overflow `total_size`; the transfer
    /// session is discarded as a side effect of this error.
    Overflow { current: u64, incoming: u32, total: u64 },
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoActiveTransfer => write!(f, "no active transfer for this session"),
            Self::IndexMismatch { expected, got } => {
                write!(f, "expected chunk {expected}, got {got}")
            }
            Self::Overflow {
                current,
                incoming,
                total,
            } => write!(
                f,
                "chunk would grow transfer to {} bytes, exceeding total_size {total}",
                current + u64::from(*incoming)
            ),
        }
    }
}

impl std::error::Error for ChunkError {}

/// Rejections from [`crate::TransferTable::end`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndError {
    NoActiveTransfer,
    SizeMismatch { expected: u64, got: u64 },
    HashMismatch,
}

impl fmt::Display for EndError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoActiveTransfer => write!(f, "no active transfer for this session"),
            Self::SizeMismatch { expected, got } => {
                write!(f, "received {got} bytes, expected {expected}")
            }
            Self::HashMismatch => write!(f, "sha256 of received bytes does not match expected hash"),
        }
    }
}

impl std::error::Error for EndError {}
