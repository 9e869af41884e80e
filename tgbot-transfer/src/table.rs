//! The chunked transfer engine: a mutex-guarded map from session token to
//! at most one [`TransferSession`], implementing the BEGIN -> CHUNK* -> END
//! state machine.
//!
//! Grounded on `lib/grammers-mtsender/src/sender_pool.rs`'s `connections:
//! Vec<ConnectionInfo>` bookkeeping (tracking in-flight work keyed by an
//! identifier, mutated between await points rather than held across one)
//! adapted to a single-slot-per-session shape since the protocol permits no
//! multiplexed transfers.
use std::collections::HashMap;

use log::{info, warn};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::error::{BeginError, ChunkError, EndError};
use crate::session::TransferSession;

/// Log a progress line after every 10th chunk and on the last one.
const PROGRESS_LOG_INTERVAL: u32 = 10;

pub struct TransferTable {
    sessions: Mutex<HashMap<[u8; 32], TransferSession>>,
}

impl Default for TransferTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferTable {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Open a new transfer session for `session_token`. Rejects if one is
    /// already active, or if the arguments are degenerate.
    pub async fn begin(
        &self,
        session_token: [u8; 32],
        dest_path: String,
        total_size: u64,
        chunk_size: u32,
        expected_hash: [u8; 32],
    ) -> Result<(), BeginError> {
        if total_size == 0 {
            return Err(BeginError::TotalSizeIsZero);
        }
        if chunk_size == 0 {
            return Err(BeginError::ChunkSizeIsZero);
        }
        if dest_path.is_empty() {
            return Err(BeginError::EmptyDestination);
        }

        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(&session_token) {
            return Err(BeginError::AlreadyActive);
        }
        sessions.insert(
            session_token,
            TransferSession::new(dest_path, total_size, chunk_size, expected_hash),
        );
        Ok(())
    }

    /// Append one chunk. On success, returns the index that was just
    /// accepted (echoed back in `TRANSFER_FILE_CHUNK_RESPONSE`).
    pub async fn chunk(
        &self,
        session_token: [u8; 32],
        chunk_index: u32,
        data: &[u8],
    ) -> Result<u32, ChunkError> {
        let mut sessions = self.sessions.lock().await;
        let transfer = sessions
            .get(&session_token)
            .ok_or(ChunkError::NoActiveTransfer)?;

        let expected = transfer.next_expected_chunk();
        if chunk_index != expected {
            return Err(ChunkError::IndexMismatch {
                expected,
                got: chunk_index,
            });
        }

        let current = transfer.accumulated_size();
        let incoming = data.len() as u64;
        if current + incoming > transfer.total_size {
            let total = transfer.total_size;
            sessions.remove(&session_token);
            return Err(ChunkError::Overflow {
                current,
                incoming: data.len() as u32,
                total,
            });
        }

        let transfer = sessions
            .get_mut(&session_token)
            .expect("checked present above");
        transfer.append(data);

        let accepted = chunk_index;
        let total_chunks = transfer.total_chunks();
        let is_last = u64::from(accepted) + 1 == total_chunks;
        if is_last || accepted % PROGRESS_LOG_INTERVAL == PROGRESS_LOG_INTERVAL - 1 {
            info!(
                "transfer progress: chunk {}/{} ({} bytes)",
                accepted + 1,
                total_chunks,
                transfer.accumulated_size()
            );
        }

        Ok(accepted)
    }

    /// Close the transfer session, verifying size (and optionally hash),
    /// and returning the accumulated bytes for the caller to write to
    /// disk. The transfer session is removed from the table regardless of
    /// whether this call succeeds or fails.
    pub async fn end(
        &self,
        session_token: [u8; 32],
        verify_hash: bool,
    ) -> Result<(String, Vec<u8>), EndError> {
        let mut sessions = self.sessions.lock().await;
        let transfer = sessions
            .remove(&session_token)
            .ok_or(EndError::NoActiveTransfer)?;

        let dest_path = transfer.dest_path.clone();
        let total_size = transfer.total_size;
        let expected_hash = transfer.expected_hash;
        let elapsed = transfer.elapsed();
        let buffer = transfer.into_buffer();

        if buffer.len() as u64 != total_size {
            return Err(EndError::SizeMismatch {
                expected: total_size,
                got: buffer.len() as u64,
            });
        }

        if verify_hash {
            let digest: [u8; 32] = Sha256::digest(&buffer).into();
            if digest != expected_hash {
                warn!("transfer to {dest_path} failed hash verification, discarding buffer");
                return Err(EndError::HashMismatch);
            }
        }

        info!(
            "transfer to {dest_path} complete: {total_size} bytes in {:.2}s",
            elapsed.as_secs_f64()
        );
        Ok((dest_path, buffer))
    }

    /// Discard the transfer session for `session_token` without writing
    /// anything, if one exists. Used when a connection drops mid-transfer
    /// or its protocol session expires — reaping on disconnect is a
    /// stricter alternative to waiting for session-table expiry.
    pub async fn reap(&self, session_token: &[u8; 32]) -> bool {
        let mut sessions = self.sessions.lock().await;
        if let Some(transfer) = sessions.remove(session_token) {
            warn!(
                "reaped abandoned transfer to {} after {} bytes of {}",
                transfer.dest_path,
                transfer.accumulated_size(),
                transfer.total_size
            );
            true
        } else {
            false
        }
    }

    pub async fn is_active(&self, session_token: &[u8; 32]) -> bool {
        self.sessions.lock().await.contains_key(session_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(byte: u8) -> [u8; 32] {
        [byte; 32]
    }

    #[tokio::test]
    async fn full_transfer_round_trip_is_byte_equal() {
        let table = TransferTable::new();
        let src = b"some file contents spread across a few chunks!!".to_vec();
        let chunk_size = 10usize;
        let hash: [u8; 32] = Sha256::digest(&src).into();

        table
            .begin(token(1), "/tmp/dest.bin".into(), src.len() as u64, chunk_size as u32, hash)
            .await
            .unwrap();

        for (i, chunk) in src.chunks(chunk_size).enumerate() {
            let accepted = table.chunk(token(1), i as u32, chunk).await.unwrap();
            assert_eq!(accepted, i as u32);
        }

        let (dest, buffer) = table.end(token(1), true).await.unwrap();
        assert_eq!(dest, "/tmp/dest.bin");
        assert_eq!(buffer, src);
    }

    #[tokio::test]
    async fn rejects_second_begin_while_active() {
        let table = TransferTable::new();
        table
            .begin(token(1), "/tmp/a".into(), 10, 5, [0u8; 32])
            .await
            .unwrap();
        let err = table
            .begin(token(1), "/tmp/b".into(), 10, 5, [0u8; 32])
            .await
            .unwrap_err();
        assert_eq!(err, BeginError::AlreadyActive);
    }

    #[tokio::test]
    async fn rejects_degenerate_begin_arguments() {
        let table = TransferTable::new();
        assert_eq!(
            table.begin(token(1), "/tmp/a".into(), 0, 5, [0u8; 32]).await,
            Err(BeginError::TotalSizeIsZero)
        );
        assert_eq!(
            table.begin(token(1), "/tmp/a".into(), 10, 0, [0u8; 32]).await,
            Err(BeginError::ChunkSizeIsZero)
        );
        assert_eq!(
            table.begin(token(1), String::new(), 10, 5, [0u8; 32]).await,
            Err(BeginError::EmptyDestination)
        );
    }

    #[tokio::test]
    async fn out_of_order_chunk_is_rejected_without_mutating_buffer() {
        let table = TransferTable::new();
        table
            .begin(token(1), "/tmp/a".into(), 20, 10, [0u8; 32])
            .await
            .unwrap();

        let err = table.chunk(token(1), 1, &[0u8; 10]).await.unwrap_err();
        assert_eq!(
            err,
            ChunkError::IndexMismatch {
                expected: 0,
                got: 1
            }
        );

        // the correct index still works afterwards
        let accepted = table.chunk(token(1), 0, &[0u8; 10]).await.unwrap();
        assert_eq!(accepted, 0);
        let accepted = table.chunk(token(1), 1, &[0u8; 10]).await.unwrap();
        assert_eq!(accepted, 1);
    }

    #[tokio::test]
    async fn chunk_overflowing_total_size_discards_the_transfer() {
        let table = TransferTable::new();
        table
            .begin(token(1), "/tmp/a".into(), 10, 10, [0u8; 32])
            .await
            .unwrap();

        let err = table.chunk(token(1), 0, &[0u8; 20]).await.unwrap_err();
        assert!(matches!(err, ChunkError::Overflow { .. }));

        // the transfer session was discarded as a side effect
        assert!(!table.is_active(&token(1)).await);
        assert_eq!(
            table.chunk(token(1), 0, &[0u8; 5]).await,
            Err(ChunkError::NoActiveTransfer)
        );
    }

    #[tokio::test]
    async fn end_with_mismatched_hash_leaves_no_result_and_discards_session() {
        let table = TransferTable::new();
        let data = vec![0xAB; 16];
        table
            .begin(token(1), "/tmp/a".into(), data.len() as u64, 16, [0u8; 32])
            .await
            .unwrap();
        table.chunk(token(1), 0, &data).await.unwrap();

        let err = table.end(token(1), true).await.unwrap_err();
        assert_eq!(err, EndError::HashMismatch);
        assert!(!table.is_active(&token(1)).await);
    }

    #[tokio::test]
    async fn end_without_prior_begin_is_rejected() {
        let table = TransferTable::new();
        assert_eq!(
            table.end(token(9), true).await.unwrap_err(),
            EndError::NoActiveTransfer
        );
    }

    #[tokio::test]
    async fn reap_removes_an_in_progress_transfer() {
        let table = TransferTable::new();
        table
            .begin(token(1), "/tmp/a".into(), 100, 10, [0u8; 32])
            .await
            .unwrap();
        table.chunk(token(1), 0, &[0u8; 10]).await.unwrap();

        assert!(table.reap(&token(1)).await);
        assert!(!table.is_active(&token(1)).await);
        assert!(!table.reap(&token(1)).await);
    }
}
