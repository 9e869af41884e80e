//! CLI argument parsing: each subcommand builds the payload struct for one
//! wire command. Shaped after `bin/scrape-docs`'s `clap`-derive CLI.
use clap::{Parser, Subcommand, ValueEnum};

use tgbot_wire::payload::{
    ChatId, CtrlSpamblock, FileType, ObserveAllChats, ObserveChatId, SendFileToChatId,
    SpamblockMode, WriteMsgToChatId, MAX_PATH,
};
use tgbot_wire::Command;

#[derive(Parser, Debug)]
#[command(name = "tgbot-client", about = "Driver for the tgbot socket control-plane protocol")]
pub struct Cli {
    /// Send payloads as JSON instead of the packed binary layout.
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub action: Action,
}

#[derive(Subcommand, Debug)]
pub enum Action {
    /// WRITE_MSG_TO_CHAT_ID
    Message { chat: ChatId, message: String },
    /// CTRL_SPAMBLOCK
    Spamblock { mode: CliSpamblockMode },
    /// OBSERVE_CHAT_ID
    Observe { chat: ChatId, observe: bool },
    /// OBSERVE_ALL_CHATS
    ObserveAll { observe: bool },
    /// SEND_FILE_TO_CHAT_ID
    SendFile {
        chat: ChatId,
        file_type: CliFileType,
        path: String,
    },
    /// GET_UPTIME
    Uptime,
    /// TRANSFER_FILE_REQUEST: ask the server for `src`, writing it to `dst`
    /// (defaulting to `src`'s file name in the current directory).
    Transfer {
        src: String,
        #[arg(long)]
        dst: Option<String>,
        #[arg(long)]
        overwrite: bool,
        #[arg(long)]
        hash_ignore: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Not a wire command: connects to the log fan-out sink instead of the
    /// command socket and prints `LOG_ENTRY` packets until disconnected.
    Logs {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum CliSpamblockMode {
    Off,
    Moderate,
    Strict,
}

impl From<CliSpamblockMode> for SpamblockMode {
    fn from(mode: CliSpamblockMode) -> Self {
        match mode {
            CliSpamblockMode::Off => Self::Off,
            CliSpamblockMode::Moderate => Self::Moderate,
            CliSpamblockMode::Strict => Self::Strict,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum CliFileType {
    Photo,
    Video,
    Sticker,
    Animation,
    Document,
    Dice,
}

impl From<CliFileType> for FileType {
    fn from(file_type: CliFileType) -> Self {
        match file_type {
            CliFileType::Photo => Self::Photo,
            CliFileType::Video => Self::Video,
            CliFileType::Sticker => Self::Sticker,
            CliFileType::Animation => Self::Animation,
            CliFileType::Document => Self::Document,
            CliFileType::Dice => Self::Dice,
        }
    }
}

impl Action {
    /// The wire command this subcommand drives, and how many positional
    /// arguments clap parsed for it — checked against `Command::cli_arity`
    /// so a future subcommand can't silently drift from the published
    /// arity table.
    fn wire_arity(&self) -> Option<(Command, usize)> {
        match self {
            Self::Message { .. } => Some((Command::WriteMsgToChatId, 2)),
            Self::Spamblock { .. } => Some((Command::CtrlSpamblock, 1)),
            Self::Observe { .. } => Some((Command::ObserveChatId, 2)),
            Self::ObserveAll { .. } => Some((Command::ObserveAllChats, 1)),
            Self::SendFile { .. } => Some((Command::SendFileToChatId, 3)),
            Self::Uptime => Some((Command::GetUptime, 0)),
            Self::Transfer { .. } => Some((Command::TransferFileRequest, 1)),
            Self::Logs { .. } => None,
        }
    }

    /// Panics if a subcommand's argument count ever drifts from
    /// `Command::cli_arity`'s published table; called once at startup.
    pub fn assert_matches_wire_arity(&self) {
        if let Some((command, arity)) = self.wire_arity() {
            let expected = command.cli_arity().unwrap_or_else(|| {
                panic!("{} has no published CLI arity but a subcommand exists for it", command.name())
            });
            assert_eq!(
                expected, arity,
                "{} subcommand arity drifted from Command::cli_arity",
                command.name()
            );
        }
    }
}

pub fn message_payload(chat: ChatId, message: String) -> WriteMsgToChatId {
    WriteMsgToChatId { chat, message }
}

pub fn spamblock_payload(mode: CliSpamblockMode) -> CtrlSpamblock {
    CtrlSpamblock { mode: mode.into() }
}

pub fn observe_payload(chat: ChatId, observe: bool) -> ObserveChatId {
    ObserveChatId { chat, observe }
}

pub fn observe_all_payload(observe: bool) -> ObserveAllChats {
    ObserveAllChats { observe }
}

pub fn send_file_payload(chat: ChatId, file_type: CliFileType, path: String) -> SendFileToChatId {
    if path.len() >= MAX_PATH {
        panic!("path exceeds MAX_PATH ({MAX_PATH}) bytes on the wire");
    }
    SendFileToChatId {
        chat,
        file_type: file_type.into(),
        path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subcommand_matches_its_published_wire_arity() {
        let actions = [
            Action::Message { chat: 1, message: "hi".into() },
            Action::Spamblock { mode: CliSpamblockMode::Off },
            Action::Observe { chat: 1, observe: true },
            Action::ObserveAll { observe: true },
            Action::SendFile { chat: 1, file_type: CliFileType::Document, path: "x".into() },
            Action::Uptime,
            Action::Transfer { src: "a".into(), dst: None, overwrite: false, hash_ignore: false, dry_run: false },
        ];
        for action in actions {
            action.assert_matches_wire_arity();
        }
    }
}
