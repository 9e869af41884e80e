//! The process-wide session table: issuing, verifying, and expiring bearer
//! session tokens with monotonic per-session nonces.

pub mod error;
pub mod table;
pub mod token;

pub use error::SessionError;
pub use table::{OpenedSession, SessionTable, VerifyOutcome, SESSION_TTL};
pub use token::SESSION_TOKEN_LEN;
