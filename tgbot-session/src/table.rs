//! The process-wide session table.
//!
//! Grounded on `lib/grammers-session`'s role as a small, focused crate
//! owning exactly one kind of state, and on
//! `lib/grammers-mtsender/src/sender_pool.rs`'s single-owner tracking of
//! live per-DC connections — here specialized to bearer tokens instead of
//! datacenter connections, and guarded by a mutex since this table is
//! shared across connection tasks rather than owned by one event loop.
use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::warn;
use tokio::sync::Mutex;

use crate::error::SessionError;
use crate::token::{self, SESSION_TOKEN_LEN};

/// Default session lifetime: one hour from issuance.
pub const SESSION_TTL: Duration = Duration::from_secs(3600);

struct Entry {
    last_nonce: u64,
    expires_at: Instant,
}

/// The outcome of [`SessionTable::verify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The token is known, unexpired, and the nonce advanced the session.
    Ok,
    /// The token existed but its TTL has passed; the entry was erased.
    Expired,
    /// No session exists for this token.
    Unknown,
    /// The token is valid but `nonce` did not strictly exceed the last one
    /// seen — a replayed or duplicated packet. The caller must drop the
    /// packet rather than merely reject it.
    StaleNonce,
}

/// A freshly issued session, as returned by [`SessionTable::open`].
#[derive(Debug, Clone, Copy)]
pub struct OpenedSession {
    pub token: [u8; SESSION_TOKEN_LEN],
    pub expires_at: Instant,
}

/// Process-wide table of live sessions, guarded by a single mutex.
///
/// All three operations (`open`, `verify`, `close`) take the same lock and
/// hold it only for the duration of a `HashMap` lookup/mutation — never
/// across an `.await` that waits on I/O.
pub struct SessionTable {
    ttl: Duration,
    sessions: Mutex<HashMap<[u8; SESSION_TOKEN_LEN], Entry>>,
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTable {
    pub fn new() -> Self {
        Self::with_ttl(SESSION_TTL)
    }

    /// Build a table with a non-default TTL; used by tests that need to
    /// observe expiry without waiting an hour.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Mint a new token and insert it with `last_nonce = 0`.
    pub async fn open(&self) -> Result<OpenedSession, SessionError> {
        let token = token::generate()?;
        let expires_at = Instant::now() + self.ttl;
        self.sessions.lock().await.insert(
            token,
            Entry {
                last_nonce: 0,
                expires_at,
            },
        );
        Ok(OpenedSession { token, expires_at })
    }

    /// Validate `token`/`nonce` and, on success, advance `last_nonce`.
    pub async fn verify(&self, token: &[u8; SESSION_TOKEN_LEN], nonce: u64) -> VerifyOutcome {
        let mut sessions = self.sessions.lock().await;
        let Some(entry) = sessions.get_mut(token) else {
            return VerifyOutcome::Unknown;
        };

        if Instant::now() > entry.expires_at {
            sessions.remove(token);
            return VerifyOutcome::Expired;
        }

        let entry = sessions.get_mut(token).expect("checked above");
        if nonce <= entry.last_nonce {
            warn!(
                "dropping packet with stale nonce {nonce} (last seen {})",
                entry.last_nonce
            );
            return VerifyOutcome::StaleNonce;
        }

        entry.last_nonce = nonce;
        VerifyOutcome::Ok
    }

    /// Erase the entry for `token`, if any. Idempotent.
    pub async fn close(&self, token: &[u8; SESSION_TOKEN_LEN]) {
        self.sessions.lock().await.remove(token);
    }

    /// Number of live (not-yet-lazily-expired) entries. Exposed for tests
    /// and for the server's own diagnostics logging.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_then_verify_with_increasing_nonce_succeeds() {
        let table = SessionTable::new();
        let session = table.open().await.unwrap();
        assert_eq!(table.verify(&session.token, 1).await, VerifyOutcome::Ok);
        assert_eq!(table.verify(&session.token, 2).await, VerifyOutcome::Ok);
    }

    #[tokio::test]
    async fn stale_or_equal_nonce_is_rejected() {
        let table = SessionTable::new();
        let session = table.open().await.unwrap();
        assert_eq!(table.verify(&session.token, 5).await, VerifyOutcome::Ok);
        assert_eq!(
            table.verify(&session.token, 5).await,
            VerifyOutcome::StaleNonce
        );
        assert_eq!(
            table.verify(&session.token, 3).await,
            VerifyOutcome::StaleNonce
        );
        // the rejected replay must not have mutated last_nonce
        assert_eq!(table.verify(&session.token, 6).await, VerifyOutcome::Ok);
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let table = SessionTable::new();
        assert_eq!(
            table.verify(&[0xAA; SESSION_TOKEN_LEN], 1).await,
            VerifyOutcome::Unknown
        );
    }

    #[tokio::test]
    async fn closed_session_becomes_unknown() {
        let table = SessionTable::new();
        let session = table.open().await.unwrap();
        table.close(&session.token).await;
        assert_eq!(
            table.verify(&session.token, 1).await,
            VerifyOutcome::Unknown
        );
    }

    #[tokio::test]
    async fn expired_session_is_reaped_lazily() {
        let table = SessionTable::with_ttl(Duration::from_millis(10));
        let session = table.open().await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(
            table.verify(&session.token, 1).await,
            VerifyOutcome::Expired
        );
        assert_eq!(table.len().await, 0);
        // the entry is gone, so a second attempt reports Unknown, not Expired again
        assert_eq!(
            table.verify(&session.token, 2).await,
            VerifyOutcome::Unknown
        );
    }

    #[tokio::test]
    async fn distinct_sessions_do_not_interfere() {
        let table = SessionTable::new();
        let a = table.open().await.unwrap();
        let b = table.open().await.unwrap();
        assert_ne!(a.token, b.token);
        assert_eq!(table.verify(&a.token, 1).await, VerifyOutcome::Ok);
        assert_eq!(table.verify(&b.token, 1).await, VerifyOutcome::Ok);
    }
}
