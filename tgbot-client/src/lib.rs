//! Client driver for the tgbot socket control-plane protocol: transport
//! selection, session lifecycle, packet building from CLI arguments, and
//! the chunked-transfer receive side. Mirrors `tgbot_server`'s net/dispatch
//! shape from the opposite end of the wire.

pub mod cli;
pub mod config;
pub mod log_view;
pub mod net;
pub mod session;
pub mod transfer;

pub use config::{ClientConfig, Transport};
pub use net::{Channel, ClientError};
pub use session::ClientSession;
