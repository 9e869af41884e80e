use std::time::Instant;

/// Ephemeral state for a single in-progress chunked transfer, keyed by
/// session token in [`crate::TransferTable`]. At most one of these exists
/// per protocol session.
pub struct TransferSession {
    pub dest_path: String,
    pub total_size: u64,
    pub chunk_size: u32,
    pub expected_hash: [u8; 32],
    buffer: Vec<u8>,
    next_expected: u32,
    start_time: Instant,
}

impl TransferSession {
    pub(crate) fn new(
        dest_path: String,
        total_size: u64,
        chunk_size: u32,
        expected_hash: [u8; 32],
    ) -> Self {
        Self {
            dest_path,
            total_size,
            chunk_size,
            expected_hash,
            buffer: Vec::with_capacity(total_size.min(64 * 1024 * 1024) as usize),
            next_expected: 0,
            start_time: Instant::now(),
        }
    }

    pub fn next_expected_chunk(&self) -> u32 {
        self.next_expected
    }

    pub fn accumulated_size(&self) -> u64 {
        self.buffer.len() as u64
    }

    /// Total number of chunks a well-behaved sender will transmit:
    /// `ceil(total_size / chunk_size)`.
    pub fn total_chunks(&self) -> u64 {
        let chunk_size = u64::from(self.chunk_size);
        self.total_size.div_ceil(chunk_size)
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    pub(crate) fn append(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
        self.next_expected += 1;
    }

    pub(crate) fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }
}
