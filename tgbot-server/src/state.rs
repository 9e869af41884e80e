//! Process-wide state shared by every connection task.
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tgbot_session::SessionTable;
use tgbot_transfer::TransferTable;

use crate::collaborators::Collaborators;
use crate::config::ServerConfig;

/// Everything a connection task needs to dispatch a packet: the session
/// and transfer tables, the collaborator handles, and the process start
/// time for `GET_UPTIME`.
pub struct ServerState {
    pub sessions: SessionTable,
    pub transfers: TransferTable,
    pub collaborators: Collaborators,
    pub max_data_size: u64,
    started_at: Instant,
    reply_nonce: AtomicU64,
}

impl ServerState {
    pub fn new(config: &ServerConfig, collaborators: Collaborators) -> Self {
        Self {
            sessions: SessionTable::new(),
            transfers: TransferTable::new(),
            collaborators,
            max_data_size: config.max_data_size,
            started_at: Instant::now(),
            reply_nonce: AtomicU64::new(1),
        }
    }

    /// `Uptime: HH:MM:SS` string for `GET_UPTIME_CALLBACK`.
    pub fn uptime_string(&self) -> String {
        let secs = self.started_at.elapsed().as_secs();
        format!("Uptime: {:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    }

    /// Fresh nonce for a server-initiated packet (a reply, or a
    /// server-driven push packet like `TRANSFER_FILE_BEGIN`/`CHUNK`/`END`).
    /// Independent from the per-session nonce the client drives through
    /// [`SessionTable::verify`] — that one only ever tracks nonces the
    /// *client* chose.
    pub fn next_reply_nonce(&self) -> u64 {
        self.reply_nonce.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::testing::null_collaborators;

    #[test]
    fn uptime_string_matches_the_expected_shape() {
        let state = ServerState::new(&ServerConfig::default(), null_collaborators());
        let uptime = state.uptime_string();
        assert!(
            regex_like_match(&uptime),
            "uptime string {uptime:?} did not match Uptime: HH:MM:SS"
        );
    }

    /// A tiny hand-rolled check standing in for a regex crate, since the
    /// shape is fixed and trivial: `Uptime: ` + three 2-digit fields.
    fn regex_like_match(s: &str) -> bool {
        let Some(rest) = s.strip_prefix("Uptime: ") else {
            return false;
        };
        let parts: Vec<&str> = rest.split(':').collect();
        parts.len() == 3 && parts.iter().all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_digit()))
    }

    #[test]
    fn reply_nonces_strictly_increase() {
        let state = ServerState::new(&ServerConfig::default(), null_collaborators());
        let a = state.next_reply_nonce();
        let b = state.next_reply_nonce();
        assert!(b > a);
    }
}
