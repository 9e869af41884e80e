use sha2::{Digest, Sha256};
use tgbot_transfer::TransferTable;

/// A multi-megabyte source split into fixed-size chunks, reassembled
/// byte-for-byte.
#[tokio::test]
async fn twenty_five_mib_transfer_reassembles_exactly() {
    let total_size = 25 * 1024 * 1024usize;
    let chunk_size = 1024 * 1024usize;

    // Deterministic "random" bytes so the test has no external entropy
    // dependency; the point is reassembly correctness, not randomness.
    let src: Vec<u8> = (0..total_size).map(|i| (i % 251) as u8).collect();
    let hash: [u8; 32] = Sha256::digest(&src).into();

    let table = TransferTable::new();
    let session_token = [0x42u8; 32];

    table
        .begin(
            session_token,
            "/tmp/big.bin".into(),
            total_size as u64,
            chunk_size as u32,
            hash,
        )
        .await
        .unwrap();

    let expected_chunks = total_size.div_ceil(chunk_size);
    for (index, chunk) in src.chunks(chunk_size).enumerate() {
        let accepted = table
            .chunk(session_token, index as u32, chunk)
            .await
            .unwrap();
        assert_eq!(accepted as usize, index);
    }
    assert_eq!(expected_chunks, 25);

    let (dest, buffer) = table.end(session_token, true).await.unwrap();
    assert_eq!(dest, "/tmp/big.bin");
    assert_eq!(buffer, src);
}
