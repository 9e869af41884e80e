//! Length-prefixed, session-authenticated wire framing for the tgbot
//! socket control-plane protocol.
//!
//! This crate owns the [`Packet`]/[`Header`] shapes, the binary and JSON
//! payload encodings for every command in the protocol, and the codec that
//! reads/writes a packet over any `tokio` async byte stream. It has no
//! notion of sessions, transfers, or dispatch — those live in
//! `tgbot-session`, `tgbot-transfer`, and `tgbot-server` respectively.

pub mod binary;
pub mod codec;
pub mod command;
pub mod error;
pub mod header;
pub mod json_body;
pub mod packet;
pub mod payload;

pub use command::Command;
pub use error::{DecodeError, ProtocolError, ReadError};
pub use header::{
    Header, PayloadType, DEFAULT_MAX_DATA_SIZE, HEADER_SIZE, MAGIC, SESSION_TOKEN_LEN,
};
pub use json_body::JSON_BYTE_BORDER;
pub use packet::Packet;
