//! Client-side counterpart of `tgbot_session::SessionTable`: owns the
//! session token this process was issued and the monotonic nonce it must
//! strictly increase on every packet it sends.
use tgbot_wire::header::SESSION_TOKEN_LEN;
use tgbot_wire::payload::OpenSessionAck;
use tgbot_wire::{Command, Packet, PayloadType};

use crate::net::{Channel, ClientError};

pub struct ClientSession {
    pub token: [u8; SESSION_TOKEN_LEN],
    pub expiration_time: String,
    next_nonce: u64,
}

#[derive(Debug)]
pub enum OpenError {
    Channel(ClientError),
    /// The server answered with something other than `OPEN_SESSION_ACK`, or
    /// a session-table failure surfaced as a `GENERIC_ACK`.
    Rejected(String),
}

impl std::fmt::Display for OpenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel(err) => write!(f, "{err}"),
            Self::Rejected(msg) => write!(f, "OPEN_SESSION rejected: {msg}"),
        }
    }
}

impl std::error::Error for OpenError {}

impl From<ClientError> for OpenError {
    fn from(err: ClientError) -> Self {
        Self::Channel(err)
    }
}

impl ClientSession {
    /// Send `OPEN_SESSION` (pre-session, zero-filled token, nonce 0) and
    /// record the token the server minted.
    pub async fn open(channel: &mut Channel, max_data_size: u64) -> Result<Self, OpenError> {
        let request = Packet::without_session(Command::OpenSession, PayloadType::Json, 0, vec![]);
        let reply = channel.roundtrip(&request, max_data_size).await?;

        if reply.command != Command::OpenSessionAck {
            return Err(OpenError::Rejected(
                String::from_utf8_lossy(&reply.payload).into_owned(),
            ));
        }

        let ack: OpenSessionAck =
            serde_json::from_slice(&reply.payload).map_err(|err| OpenError::Rejected(err.to_string()))?;
        let bytes = hex::decode(&ack.session_token).map_err(|err| OpenError::Rejected(err.to_string()))?;
        let mut token = [0u8; SESSION_TOKEN_LEN];
        if bytes.len() != SESSION_TOKEN_LEN {
            return Err(OpenError::Rejected("session_token was not 32 bytes".into()));
        }
        token.copy_from_slice(&bytes);

        Ok(Self {
            token,
            expiration_time: ack.expiration_time,
            next_nonce: 1,
        })
    }

    /// Next strictly-increasing nonce for a packet this session sends.
    pub fn nonce(&mut self) -> u64 {
        let n = self.next_nonce;
        self.next_nonce += 1;
        n
    }

    /// Build a request packet carrying this session's token and the next
    /// nonce.
    pub fn packet(&mut self, command: Command, payload_type: PayloadType, payload: Vec<u8>) -> Packet {
        let nonce = self.nonce();
        Packet::new(command, payload_type, nonce, self.token, payload)
    }

    /// Send `CLOSE_SESSION` and await its `GENERIC_ACK`.
    pub async fn close(&mut self, channel: &mut Channel, max_data_size: u64) -> Result<(), ClientError> {
        let request = self.packet(Command::CloseSession, PayloadType::Json, vec![]);
        channel.roundtrip(&request, max_data_size).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> ClientSession {
        ClientSession {
            token: [0x7a; SESSION_TOKEN_LEN],
            expiration_time: "2026-01-01T00:00:00Z".into(),
            next_nonce: 1,
        }
    }

    #[test]
    fn nonce_strictly_increases_from_one() {
        let mut session = fixture();
        assert_eq!(session.nonce(), 1);
        assert_eq!(session.nonce(), 2);
        assert_eq!(session.nonce(), 3);
    }

    #[test]
    fn packet_carries_the_session_token_and_the_next_nonce() {
        let mut session = fixture();
        let packet = session.packet(Command::GetUptime, PayloadType::Binary, vec![]);
        assert_eq!(packet.session_token, [0x7a; SESSION_TOKEN_LEN]);
        assert_eq!(packet.nonce, 1);
        let packet = session.packet(Command::GetUptime, PayloadType::Binary, vec![]);
        assert_eq!(packet.nonce, 2);
    }
}
