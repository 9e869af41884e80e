use snafu::Snafu;

/// Failures that can occur while issuing or operating the session table.
///
/// Everyday verification outcomes (`Expired`, `Unknown`, `StaleNonce`) are
/// *not* represented here — they are routine control flow the dispatcher
/// maps to a `GenericAck`, not an exceptional condition. This type is for
/// the handful of things that can go wrong around that: the OS entropy
/// source failing while minting a new token.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SessionError {
    #[snafu(display("failed to read {requested} bytes of secure randomness for a session token"))]
    TokenEntropy {
        requested: usize,
        source: getrandom::Error,
    },
}
