use crate::command::Command;
use crate::header::{Header, PayloadType, SESSION_TOKEN_LEN};

/// A fully assembled packet: header plus the opaque payload bytes it
/// describes. `data_size` and `checksum` in the header are always derived
/// from `payload`, never set independently, so a [`Packet`] can never
/// represent an internally inconsistent header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub command: Command,
    pub payload_type: PayloadType,
    pub nonce: u64,
    pub session_token: [u8; SESSION_TOKEN_LEN],
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn new(
        command: Command,
        payload_type: PayloadType,
        nonce: u64,
        session_token: [u8; SESSION_TOKEN_LEN],
        payload: Vec<u8>,
    ) -> Self {
        Self {
            command,
            payload_type,
            nonce,
            session_token,
            payload,
        }
    }

    /// Build a packet with a zero-filled session token, for pre-session
    /// commands (`OPEN_SESSION`) and the replies to them.
    pub fn without_session(
        command: Command,
        payload_type: PayloadType,
        nonce: u64,
        payload: Vec<u8>,
    ) -> Self {
        Self::new(
            command,
            payload_type,
            nonce,
            [0u8; SESSION_TOKEN_LEN],
            payload,
        )
    }

    pub fn checksum(&self) -> u32 {
        crc32fast::hash(&self.payload)
    }

    pub fn header(&self) -> Header {
        Header::new(
            self.command,
            self.payload_type,
            self.payload.len() as u64,
            self.nonce,
            self.session_token,
            self.checksum(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_of_empty_payload_is_zero() {
        let packet = Packet::without_session(Command::GetUptime, PayloadType::Binary, 1, vec![]);
        assert_eq!(packet.checksum(), 0);
        assert_eq!(packet.header().checksum, 0);
    }
}
