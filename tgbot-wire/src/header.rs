use crate::command::Command;
use crate::error::ProtocolError;

/// Every header begins with this constant; a mismatch is a protocol error
/// and the connection is dropped.
pub const MAGIC: u64 = 0xDEAD_FACE;

/// Size in bytes of the [`Header`] as it appears on the wire.
///
/// The literal field list sums to 65 bytes; the remaining 16 are alignment
/// padding a C struct with these field types and ordering would carry
/// (3 bytes so `data_size` starts on an 8-byte boundary, 13 bytes of
/// reserved tail). Reserved bytes are written as zero and ignored on read.
pub const HEADER_SIZE: usize = 81;

/// Default cap on `data_size`; packets declaring a larger payload are
/// rejected with [`crate::ReadError::TooLarge`] before any payload bytes
/// are read.
pub const DEFAULT_MAX_DATA_SIZE: u64 = 64 * 1024 * 1024;

/// Length in bytes of a [`crate::Session`] token.
pub const SESSION_TOKEN_LEN: usize = 32;

/// Selects how the payload bytes following a [`Header`] are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PayloadType {
    Binary = 0,
    Json = 1,
}

impl TryFrom<u8> for PayloadType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Binary),
            1 => Ok(Self::Json),
            other => Err(ProtocolError::UnknownPayloadType(other)),
        }
    }
}

/// The fixed-size preamble of every [`crate::Packet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub command: Command,
    pub payload_type: PayloadType,
    pub data_size: u64,
    pub nonce: u64,
    pub session_token: [u8; SESSION_TOKEN_LEN],
    pub checksum: u32,
}

impl Header {
    /// Build a header for a payload whose CRC32 has already been computed.
    pub fn new(
        command: Command,
        payload_type: PayloadType,
        data_size: u64,
        nonce: u64,
        session_token: [u8; SESSION_TOKEN_LEN],
        checksum: u32,
    ) -> Self {
        Self {
            command,
            payload_type,
            data_size,
            nonce,
            session_token,
            checksum,
        }
    }

    /// Serialize into the 81-byte little-endian wire layout.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        let mut off = 0;

        buf[off..off + 8].copy_from_slice(&MAGIC.to_le_bytes());
        off += 8;
        buf[off..off + 4].copy_from_slice(&u32::from(self.command).to_le_bytes());
        off += 4;
        buf[off] = self.payload_type as u8;
        off += 1;
        off += 3; // _reserved1
        buf[off..off + 8].copy_from_slice(&self.data_size.to_le_bytes());
        off += 8;
        buf[off..off + 8].copy_from_slice(&self.nonce.to_le_bytes());
        off += 8;
        buf[off..off + SESSION_TOKEN_LEN].copy_from_slice(&self.session_token);
        off += SESSION_TOKEN_LEN;
        buf[off..off + 4].copy_from_slice(&self.checksum.to_le_bytes());
        off += 4;
        // _reserved2: remaining 13 bytes stay zero.
        debug_assert_eq!(off + 13, HEADER_SIZE);

        buf
    }

    /// Parse a header from exactly [`HEADER_SIZE`] bytes.
    ///
    /// Validates `magic` and the `command`/`payload_type` enums; does not
    /// validate `data_size` against any maximum (the caller does that once
    /// it knows the configured limit).
    pub fn decode(buf: &[u8; HEADER_SIZE]) -> Result<Self, ProtocolError> {
        let mut off = 0;

        let magic = u64::from_le_bytes(buf[off..off + 8].try_into().unwrap());
        off += 8;
        if magic != MAGIC {
            return Err(ProtocolError::BadMagic { got: magic });
        }

        let command = u32::from_le_bytes(buf[off..off + 4].try_into().unwrap());
        off += 4;
        let command = Command::try_from(command)?;

        let payload_type = PayloadType::try_from(buf[off])?;
        off += 1;
        off += 3; // _reserved1

        let data_size = u64::from_le_bytes(buf[off..off + 8].try_into().unwrap());
        off += 8;
        let nonce = u64::from_le_bytes(buf[off..off + 8].try_into().unwrap());
        off += 8;

        let mut session_token = [0u8; SESSION_TOKEN_LEN];
        session_token.copy_from_slice(&buf[off..off + SESSION_TOKEN_LEN]);
        off += SESSION_TOKEN_LEN;

        let checksum = u32::from_le_bytes(buf[off..off + 4].try_into().unwrap());
        off += 4;
        debug_assert_eq!(off + 13, HEADER_SIZE);

        Ok(Self {
            command,
            payload_type,
            data_size,
            nonce,
            session_token,
            checksum,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let header = Header::new(
            Command::GetUptime,
            PayloadType::Binary,
            0,
            7,
            [0xAB; SESSION_TOKEN_LEN],
            0,
        );
        let encoded = header.encode();
        assert_eq!(encoded.len(), HEADER_SIZE);
        let decoded = Header::decode(&encoded).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = 0x01; // corrupt the magic
        assert_eq!(
            Header::decode(&buf),
            Err(ProtocolError::BadMagic { got: 1 })
        );
    }

    #[test]
    fn zero_filled_token_for_pre_session_commands() {
        let header = Header::new(
            Command::OpenSession,
            PayloadType::Json,
            0,
            0,
            [0u8; SESSION_TOKEN_LEN],
            0,
        );
        assert_eq!(header.session_token, [0u8; SESSION_TOKEN_LEN]);
    }
}
