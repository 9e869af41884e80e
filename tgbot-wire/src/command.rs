use crate::error::ProtocolError;

/// The `command` field of a [`crate::Header`].
///
/// Values below 100 are requests a client may send; values at or above 100
/// are replies the server sends back. `LogEntry` never appears inside a
/// request/response exchange — it is pushed repeatedly by the log fan-out
/// sink over its own dedicated connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Command {
    OpenSession = 1,
    CloseSession = 2,
    WriteMsgToChatId = 3,
    CtrlSpamblock = 4,
    ObserveChatId = 5,
    ObserveAllChats = 6,
    SendFileToChatId = 7,
    GetUptime = 8,
    TransferFile = 9,
    TransferFileRequest = 10,
    TransferFileBegin = 11,
    TransferFileChunk = 12,
    TransferFileEnd = 13,

    OpenSessionAck = 100,
    GenericAck = 101,
    GetUptimeCallback = 102,
    TransferFileChunkResponse = 103,
    LogEntry = 104,
}

impl Command {
    /// Human-readable name, as used by the CLI client and by logging.
    pub fn name(self) -> &'static str {
        match self {
            Self::OpenSession => "OPEN_SESSION",
            Self::CloseSession => "CLOSE_SESSION",
            Self::WriteMsgToChatId => "WRITE_MSG_TO_CHAT_ID",
            Self::CtrlSpamblock => "CTRL_SPAMBLOCK",
            Self::ObserveChatId => "OBSERVE_CHAT_ID",
            Self::ObserveAllChats => "OBSERVE_ALL_CHATS",
            Self::SendFileToChatId => "SEND_FILE_TO_CHAT_ID",
            Self::GetUptime => "GET_UPTIME",
            Self::TransferFile => "TRANSFER_FILE",
            Self::TransferFileRequest => "TRANSFER_FILE_REQUEST",
            Self::TransferFileBegin => "TRANSFER_FILE_BEGIN",
            Self::TransferFileChunk => "TRANSFER_FILE_CHUNK",
            Self::TransferFileEnd => "TRANSFER_FILE_END",
            Self::OpenSessionAck => "OPEN_SESSION_ACK",
            Self::GenericAck => "GENERIC_ACK",
            Self::GetUptimeCallback => "GET_UPTIME_CALLBACK",
            Self::TransferFileChunkResponse => "TRANSFER_FILE_CHUNK_RESPONSE",
            Self::LogEntry => "LOG_ENTRY",
        }
    }

    /// Number of CLI arguments the client expects for this command, or
    /// `None` for commands the CLI front-end never builds directly (replies,
    /// and the in-process-only `TransferFile*` steps driven by the transfer
    /// engine rather than typed by a user).
    pub fn cli_arity(self) -> Option<usize> {
        match self {
            Self::WriteMsgToChatId => Some(2),
            Self::CtrlSpamblock => Some(1),
            Self::ObserveChatId => Some(2),
            Self::ObserveAllChats => Some(1),
            Self::SendFileToChatId => Some(3),
            Self::GetUptime => Some(0),
            Self::TransferFileRequest => Some(1),
            Self::CloseSession | Self::OpenSession => Some(0),
            _ => None,
        }
    }

    /// Whether this command is only ever produced internally by the server
    /// (e.g. as a protocol-engine reply) and must never be accepted off the
    /// wire as an incoming request.
    pub fn is_internal(self) -> bool {
        matches!(
            self,
            Self::OpenSessionAck
                | Self::GenericAck
                | Self::GetUptimeCallback
                | Self::TransferFileChunkResponse
                | Self::LogEntry
        )
    }
}

impl TryFrom<u32> for Command {
    type Error = ProtocolError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Self::OpenSession,
            2 => Self::CloseSession,
            3 => Self::WriteMsgToChatId,
            4 => Self::CtrlSpamblock,
            5 => Self::ObserveChatId,
            6 => Self::ObserveAllChats,
            7 => Self::SendFileToChatId,
            8 => Self::GetUptime,
            9 => Self::TransferFile,
            10 => Self::TransferFileRequest,
            11 => Self::TransferFileBegin,
            12 => Self::TransferFileChunk,
            13 => Self::TransferFileEnd,
            100 => Self::OpenSessionAck,
            101 => Self::GenericAck,
            102 => Self::GetUptimeCallback,
            103 => Self::TransferFileChunkResponse,
            104 => Self::LogEntry,
            other => return Err(ProtocolError::UnknownCommand(other)),
        })
    }
}

impl From<Command> for u32 {
    fn from(command: Command) -> Self {
        command as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        let all = [
            Command::OpenSession,
            Command::CloseSession,
            Command::WriteMsgToChatId,
            Command::CtrlSpamblock,
            Command::ObserveChatId,
            Command::ObserveAllChats,
            Command::SendFileToChatId,
            Command::GetUptime,
            Command::TransferFile,
            Command::TransferFileRequest,
            Command::TransferFileBegin,
            Command::TransferFileChunk,
            Command::TransferFileEnd,
            Command::OpenSessionAck,
            Command::GenericAck,
            Command::GetUptimeCallback,
            Command::TransferFileChunkResponse,
            Command::LogEntry,
        ];
        for cmd in all {
            let code: u32 = cmd.into();
            assert_eq!(Command::try_from(code).unwrap(), cmd);
        }
    }

    #[test]
    fn rejects_unknown_code() {
        assert_eq!(
            Command::try_from(9999),
            Err(ProtocolError::UnknownCommand(9999))
        );
    }

    #[test]
    fn replies_are_internal_only() {
        assert!(Command::GenericAck.is_internal());
        assert!(!Command::GetUptime.is_internal());
    }
}
