//! Helpers for the fixed-length, null-padded char arrays the binary payload
//! shapes carry (a straight port of C's `char buf[N]` with `strncpy`
//! semantics: overlong input is truncated, never rejected).
use crate::error::DecodeError;

/// Write `s` into `buf[offset..offset+len]`, null-padding the remainder.
///
/// True `strncpy` semantics: a string that does not fit (with room for a
/// terminating NUL) is truncated to the largest UTF-8 char boundary at or
/// below `len - 1` bytes rather than rejected, matching the C original's
/// `strncpy(dst, src, N); dst[N-1] = 0;` — valid user input that happens to
/// be long must never panic the caller.
pub fn write_fixed_str(buf: &mut [u8], offset: usize, s: &str, len: usize) {
    let bytes = s.as_bytes();
    let fit = if bytes.len() < len {
        bytes.len()
    } else {
        let mut boundary = len - 1;
        while boundary > 0 && !s.is_char_boundary(boundary) {
            boundary -= 1;
        }
        boundary
    };
    buf[offset..offset + fit].copy_from_slice(&bytes[..fit]);
    for b in &mut buf[offset + fit..offset + len] {
        *b = 0;
    }
}

/// Read a NUL-terminated (or NUL-padded) fixed string back out.
///
/// Validates that once a NUL byte is seen, every following byte in the
/// field is also NUL (rejecting garbage past the terminator instead of
/// silently ignoring it), and that the string portion is valid UTF-8.
pub fn read_fixed_str(buf: &[u8], offset: usize, len: usize) -> Result<String, DecodeError> {
    let field = &buf[offset..offset + len];
    let nul_pos = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    if field[nul_pos..].iter().any(|&b| b != 0) {
        return Err(DecodeError(format!(
            "fixed string field has non-NUL bytes after its terminator at offset {offset}"
        )));
    }
    std::str::from_utf8(&field[..nul_pos])
        .map(str::to_owned)
        .map_err(|e| DecodeError(format!("fixed string field is not valid utf-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_short_string() {
        let mut buf = [0xFFu8; 16];
        write_fixed_str(&mut buf, 0, "hi", 16);
        assert_eq!(read_fixed_str(&buf, 0, 16).unwrap(), "hi");
    }

    #[test]
    fn rejects_garbage_after_nul() {
        let mut buf = [0u8; 8];
        buf[0] = b'a';
        buf[1] = 0;
        buf[2] = b'z'; // garbage after the terminator
        assert!(read_fixed_str(&buf, 0, 8).is_err());
    }

    #[test]
    fn write_truncates_on_overflow_instead_of_panicking() {
        let mut buf = [0xFFu8; 4];
        write_fixed_str(&mut buf, 0, "toolong", 4);
        assert_eq!(read_fixed_str(&buf, 0, 4).unwrap(), "too");
    }

    #[test]
    fn write_truncates_on_a_utf8_char_boundary() {
        // "héllo": 'é' is 2 bytes, so a 3-byte field must drop it whole
        // rather than splitting it into an invalid trailing byte.
        let mut buf = [0xFFu8; 3];
        write_fixed_str(&mut buf, 0, "héllo", 3);
        assert_eq!(read_fixed_str(&buf, 0, 3).unwrap(), "h");
    }
}
