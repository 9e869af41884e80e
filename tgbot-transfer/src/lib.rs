//! The chunked file-transfer state machine: BEGIN/CHUNK/END bookkeeping and
//! SHA-256 verification, decoupled from both the wire codec and the
//! filesystem so it can be unit tested without either.

pub mod error;
pub mod session;
pub mod table;

pub use error::{BeginError, ChunkError, EndError};
pub use session::TransferSession;
pub use table::TransferTable;

/// Size threshold at which `TRANSFER_FILE_REQUEST` switches from a
/// single-packet `TRANSFER_FILE` reply to a chunked `TRANSFER_FILE_BEGIN`
/// exchange.
pub const CHUNKED_TRANSFER_THRESHOLD: u64 = 10 * 1024 * 1024;

/// Default chunk size used once a transfer switches into chunked mode.
pub const DEFAULT_CHUNK_SIZE: u32 = 1024 * 1024;
