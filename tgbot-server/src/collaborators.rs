//! Trait boundaries for the external collaborators the handler adapters
//! call into. No Telegram client, database, or spam-heuristic
//! implementation lives in this crate — only the interface shape.
use tgbot_wire::payload::FileType;

/// The Telegram Bot API façade.
#[async_trait::async_trait]
pub trait TelegramApi: Send + Sync {
    async fn send_message(&self, chat: i64, text: &str) -> Result<(), TgApiError>;
    async fn send_file(
        &self,
        chat: i64,
        file_type: FileType,
        path_or_file_id: &str,
        caption: Option<&str>,
    ) -> Result<(), TgApiError>;
    async fn download_file(&self, path: &str, file_id: &str) -> Result<bool, TgApiError>;
    async fn get_uptime(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TgApiError(pub String);

impl std::fmt::Display for TgApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TgApiError {}

/// The chat-observation subsystem (`OBSERVE_CHAT_ID` / `OBSERVE_ALL_CHATS`).
#[async_trait::async_trait]
pub trait ChatObserver: Send + Sync {
    async fn start_observing(&self, chat: i64) -> bool;
    async fn stop_observing(&self, chat: i64) -> bool;
    async fn observe_all(&self, observe: bool) -> bool;
    /// Whether `OBSERVE_ALL_CHATS` is currently active; the dispatcher
    /// consults this to reject a conflicting `OBSERVE_CHAT_ID`.
    async fn observing_all(&self) -> bool;
}

/// `CTRL_SPAMBLOCK`'s target.
#[async_trait::async_trait]
pub trait SpamBlock: Send + Sync {
    async fn set_config(&self, mode: tgbot_wire::payload::SpamblockMode);
}

/// Filesystem operations the transfer engine and `SEND_FILE_TO_CHAT_ID`
/// need, abstracted so an implementation can stream straight to disk
/// instead of buffering a multi-gigabyte transfer in memory.
#[async_trait::async_trait]
pub trait TransferFs: Send + Sync {
    async fn read_file(&self, path: &str) -> std::io::Result<Vec<u8>>;
    async fn write_file(&self, path: &str, bytes: &[u8]) -> std::io::Result<()>;
    fn sha256(&self, bytes: &[u8]) -> [u8; 32];
    async fn exists(&self, path: &str) -> bool;
}

/// The full set of collaborators a [`crate::state::ServerState`] needs.
pub struct Collaborators {
    pub telegram: Box<dyn TelegramApi>,
    pub observer: Box<dyn ChatObserver>,
    pub spam: Box<dyn SpamBlock>,
    pub fs: Box<dyn TransferFs>,
}

/// A test double backing all four collaborator traits with in-memory state,
/// so the dispatcher and handler-adapter logic can be exercised without a
/// live Telegram bot. Kept as a plain public module (rather than
/// `#[cfg(test)]`) so both this crate's unit tests and `tests/` integration
/// tests can build a server against it.
pub mod testing {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct NullTelegramApi {
        pub sent_messages: Mutex<Vec<(i64, String)>>,
        pub sent_files: Mutex<Vec<(i64, FileType, String)>>,
        pub fail_chat: Mutex<Option<i64>>,
    }

    #[async_trait::async_trait]
    impl TelegramApi for NullTelegramApi {
        async fn send_message(&self, chat: i64, text: &str) -> Result<(), TgApiError> {
            if self.fail_chat.lock().unwrap().as_ref() == Some(&chat) {
                return Err(TgApiError(format!("chat {chat} is unreachable")));
            }
            self.sent_messages
                .lock()
                .unwrap()
                .push((chat, text.to_string()));
            Ok(())
        }

        async fn send_file(
            &self,
            chat: i64,
            file_type: FileType,
            path_or_file_id: &str,
            _caption: Option<&str>,
        ) -> Result<(), TgApiError> {
            if self.fail_chat.lock().unwrap().as_ref() == Some(&chat) {
                return Err(TgApiError(format!("chat {chat} is unreachable")));
            }
            self.sent_files
                .lock()
                .unwrap()
                .push((chat, file_type, path_or_file_id.to_string()));
            Ok(())
        }

        async fn download_file(&self, _path: &str, _file_id: &str) -> Result<bool, TgApiError> {
            Ok(true)
        }

        async fn get_uptime(&self) -> String {
            "Uptime: 00:00:00".to_string()
        }
    }

    #[derive(Default)]
    pub struct NullChatObserver {
        pub observed: Mutex<HashSet<i64>>,
        pub observe_all: Mutex<bool>,
    }

    #[async_trait::async_trait]
    impl ChatObserver for NullChatObserver {
        async fn start_observing(&self, chat: i64) -> bool {
            self.observed.lock().unwrap().insert(chat)
        }

        async fn stop_observing(&self, chat: i64) -> bool {
            self.observed.lock().unwrap().remove(&chat)
        }

        async fn observe_all(&self, observe: bool) -> bool {
            *self.observe_all.lock().unwrap() = observe;
            true
        }

        async fn observing_all(&self) -> bool {
            *self.observe_all.lock().unwrap()
        }
    }

    #[derive(Default)]
    pub struct NullSpamBlock {
        pub mode: Mutex<Option<tgbot_wire::payload::SpamblockMode>>,
    }

    #[async_trait::async_trait]
    impl SpamBlock for NullSpamBlock {
        async fn set_config(&self, mode: tgbot_wire::payload::SpamblockMode) {
            *self.mode.lock().unwrap() = Some(mode);
        }
    }

    #[derive(Default)]
    pub struct NullTransferFs {
        pub files: Mutex<std::collections::HashMap<String, Vec<u8>>>,
    }

    #[async_trait::async_trait]
    impl TransferFs for NullTransferFs {
        async fn read_file(&self, path: &str) -> std::io::Result<Vec<u8>> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, path.to_string()))
        }

        async fn write_file(&self, path: &str, bytes: &[u8]) -> std::io::Result<()> {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_string(), bytes.to_vec());
            Ok(())
        }

        fn sha256(&self, bytes: &[u8]) -> [u8; 32] {
            use sha2::{Digest, Sha256};
            Sha256::digest(bytes).into()
        }

        async fn exists(&self, path: &str) -> bool {
            self.files.lock().unwrap().contains_key(path)
        }
    }

    pub fn null_collaborators() -> Collaborators {
        Collaborators {
            telegram: Box::new(NullTelegramApi::default()),
            observer: Box::new(NullChatObserver::default()),
            spam: Box::new(NullSpamBlock::default()),
            fs: Box::new(NullTransferFs::default()),
        }
    }
}
