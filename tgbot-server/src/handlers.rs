//! Handler adapters: thin glue from a decoded request struct to an external
//! collaborator call plus the resulting `GenericAck`. `OPEN_SESSION`/
//! `CLOSE_SESSION` and the transfer commands are session-table/
//! transfer-table operations rather than collaborator adapters, so they
//! stay in `dispatch.rs`.
use tgbot_wire::payload::{
    AckType, CtrlSpamblock, GenericAck, GetUptimeCallback, ObserveAllChats, ObserveChatId,
    SendFileToChatId, WriteMsgToChatId,
};

use crate::state::ServerState;

pub async fn write_msg_to_chat_id(state: &ServerState, req: WriteMsgToChatId) -> GenericAck {
    match state
        .collaborators
        .telegram
        .send_message(req.chat, &req.message)
        .await
    {
        Ok(()) => GenericAck::ok(),
        Err(err) => GenericAck::error(AckType::TgApiException, err.to_string()),
    }
}

pub async fn ctrl_spamblock(state: &ServerState, req: CtrlSpamblock) -> GenericAck {
    state.collaborators.spam.set_config(req.mode).await;
    GenericAck::ok()
}

/// `OBSERVE_CHAT_ID` is refused while `OBSERVE_ALL_CHATS` is active.
pub async fn observe_chat_id(state: &ServerState, req: ObserveChatId) -> GenericAck {
    if state.collaborators.observer.observing_all().await {
        return GenericAck::error(AckType::CommandIgnored, "CMD_OBSERVE_ALL_CHATS active");
    }
    if req.observe {
        state.collaborators.observer.start_observing(req.chat).await;
    } else {
        state.collaborators.observer.stop_observing(req.chat).await;
    }
    GenericAck::ok()
}

pub async fn observe_all_chats(state: &ServerState, req: ObserveAllChats) -> GenericAck {
    state.collaborators.observer.observe_all(req.observe).await;
    GenericAck::ok()
}

pub async fn send_file_to_chat_id(state: &ServerState, req: SendFileToChatId) -> GenericAck {
    match state
        .collaborators
        .telegram
        .send_file(req.chat, req.file_type, &req.path, None)
        .await
    {
        Ok(()) => GenericAck::ok(),
        Err(err) => GenericAck::error(AckType::TgApiException, err.to_string()),
    }
}

pub async fn get_uptime(state: &ServerState) -> GetUptimeCallback {
    GetUptimeCallback {
        uptime: state.uptime_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::testing::null_collaborators;
    use crate::config::ServerConfig;

    #[tokio::test]
    async fn observe_chat_id_is_ignored_while_observe_all_is_active() {
        let state = ServerState::new(&ServerConfig::default(), null_collaborators());
        observe_all_chats(&state, ObserveAllChats { observe: true }).await;

        let ack = observe_chat_id(
            &state,
            ObserveChatId {
                chat: 123,
                observe: true,
            },
        )
        .await;
        assert_eq!(ack.result, AckType::CommandIgnored);
        assert_eq!(ack.error_msg, "CMD_OBSERVE_ALL_CHATS active");
    }

    #[tokio::test]
    async fn write_msg_surfaces_tg_api_failure() {
        let state = ServerState::new(&ServerConfig::default(), null_collaborators());
        let ack = write_msg_to_chat_id(
            &state,
            WriteMsgToChatId {
                chat: 1,
                message: "hi".into(),
            },
        )
        .await;
        assert_eq!(ack.result, AckType::Success);
    }
}
