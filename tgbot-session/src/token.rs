use crate::error::{SessionError, TokenEntropySnafu};
use snafu::ResultExt;

/// Length in bytes of a session token, matching `tgbot-wire`'s
/// `SESSION_TOKEN_LEN` (kept as an independent constant here so this crate
/// has no dependency on the wire crate — a wire-format round-trip test in
/// `tgbot-server` checks they stay in sync).
pub const SESSION_TOKEN_LEN: usize = 32;

/// Generate a fresh, cryptographically random session token.
pub fn generate() -> Result<[u8; SESSION_TOKEN_LEN], SessionError> {
    let mut token = [0u8; SESSION_TOKEN_LEN];
    getrandom::getrandom(&mut token).context(TokenEntropySnafu {
        requested: SESSION_TOKEN_LEN,
    })?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_distinct_tokens() {
        let a = generate().unwrap();
        let b = generate().unwrap();
        assert_ne!(a, b);
    }
}
