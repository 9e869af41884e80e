use std::time::Duration;

use tgbot_session::{SessionTable, VerifyOutcome};

#[tokio::test]
async fn full_lifecycle_open_verify_replay_close() {
    let table = SessionTable::new();

    let session = table.open().await.unwrap();
    assert_eq!(table.verify(&session.token, 7).await, VerifyOutcome::Ok);

    // a captured packet with an already-consumed nonce is a replay
    assert_eq!(
        table.verify(&session.token, 5).await,
        VerifyOutcome::StaleNonce
    );

    table.close(&session.token).await;
    assert_eq!(
        table.verify(&session.token, 8).await,
        VerifyOutcome::Unknown
    );
}

#[tokio::test]
async fn expiry_is_observed_on_first_verify_after_ttl() {
    let table = SessionTable::with_ttl(Duration::from_millis(20));
    let session = table.open().await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        table.verify(&session.token, 1).await,
        VerifyOutcome::Expired
    );
}
