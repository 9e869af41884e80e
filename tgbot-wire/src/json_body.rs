//! Splitting a JSON payload that carries an inline file body from the
//! sentinel byte onward.
use crate::error::ProtocolError;

/// The single `0x00` byte that separates a JSON payload object from an
/// attached raw body, when one is present.
pub const JSON_BYTE_BORDER: u8 = 0x00;

/// Scan `payload` for the sentinel and split it into `(json_bytes,
/// body_bytes)`. `body_bytes` is `None` if no sentinel was found, meaning
/// the whole payload is the JSON object with no attached body.
///
/// A literal `0x00` byte cannot occur inside a valid JSON text (control
/// characters inside JSON strings must be escaped as ` `), so the
/// first `0x00` byte in the payload unambiguously marks the border.
pub fn split(payload: &[u8]) -> (&[u8], Option<&[u8]>) {
    match payload.iter().position(|&b| b == JSON_BYTE_BORDER) {
        Some(idx) => (&payload[..idx], Some(&payload[idx + 1..])),
        None => (payload, None),
    }
}

/// Like [`split`], but requires a body to be present.
pub fn split_expecting_body(payload: &[u8]) -> Result<(&[u8], &[u8]), ProtocolError> {
    match split(payload) {
        (json, Some(body)) => Ok((json, body)),
        (_, None) => Err(ProtocolError::MissingBodySentinel),
    }
}

/// Build a payload from a JSON object and an attached body.
pub fn join(json: &[u8], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(json.len() + 1 + body.len());
    out.extend_from_slice(json);
    out.push(JSON_BYTE_BORDER);
    out.extend_from_slice(body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_at_first_nul_after_closing_brace() {
        let mut payload = br#"{"chat":1}"#.to_vec();
        payload.push(JSON_BYTE_BORDER);
        payload.extend_from_slice(b"raw file bytes here");

        let (json, body) = split(&payload);
        assert_eq!(json, br#"{"chat":1}"#);
        assert_eq!(body, Some(&b"raw file bytes here"[..]));
    }

    #[test]
    fn no_sentinel_means_no_body() {
        let payload = br#"{"chat":1}"#.to_vec();
        let (json, body) = split(&payload);
        assert_eq!(json, &payload[..]);
        assert_eq!(body, None);
    }

    #[test]
    fn join_then_split_round_trips() {
        let json = br#"{"a":1}"#;
        let body = b"\x01\x02\x03binary";
        let payload = join(json, body);
        let (got_json, got_body) = split(&payload);
        assert_eq!(got_json, json);
        assert_eq!(got_body, Some(&body[..]));
    }
}
