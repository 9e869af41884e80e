//! `tgbot-client` binary: resolves a transport from the environment,
//! dispatches one command, and exits. `logs` is the one subcommand that
//! bypasses the command socket entirely and instead drives the log
//! fan-out sink until disconnected.
use clap::Parser;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;

use tgbot_client::cli::{Action, Cli};
use tgbot_client::config::{ClientConfig, DEFAULT_LOG_PORT};
use tgbot_client::session::ClientSession;
use tgbot_client::transfer;
use tgbot_client::Channel;
use tgbot_wire::payload::{FileTransferMeta, HASH_LEN};
use tgbot_wire::PayloadType;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .expect("logger is installed exactly once at startup");

    let cli = Cli::parse();
    cli.action.assert_matches_wire_arity();

    if let Action::Logs { host, port } = &cli.action {
        let port = port.unwrap_or(DEFAULT_LOG_PORT);
        if let Err(err) = tgbot_client::log_view::run(host, port).await {
            error!("log viewer failed: {err}");
            std::process::exit(1);
        }
        return;
    }

    let config = ClientConfig::from_env();
    let payload_type = if cli.json { PayloadType::Json } else { PayloadType::Binary };

    if let Err(err) = run(config, payload_type, cli.action).await {
        error!("{err}");
        std::process::exit(1);
    }
}

async fn run(config: ClientConfig, payload_type: PayloadType, action: Action) -> Result<(), Box<dyn std::error::Error>> {
    let mut channel = Channel::connect(&config).await?;
    let mut session = ClientSession::open(&mut channel, config.max_data_size).await?;
    info!("session opened, expires {}", session.expiration_time);

    let result = dispatch(&mut channel, &mut session, &config, payload_type, action).await;

    session.close(&mut channel, config.max_data_size).await?;
    result
}

async fn dispatch(
    channel: &mut Channel,
    session: &mut ClientSession,
    config: &ClientConfig,
    payload_type: PayloadType,
    action: Action,
) -> Result<(), Box<dyn std::error::Error>> {
    use tgbot_client::cli::{message_payload, observe_all_payload, observe_payload, send_file_payload, spamblock_payload};
    use tgbot_wire::Command;

    match action {
        Action::Message { chat, message } => {
            let payload = message_payload(chat, message);
            simple_round_trip(channel, session, config, payload_type, Command::WriteMsgToChatId, |pt| {
                encode(pt, &payload, |p| p.encode_binary())
            })
            .await
        }
        Action::Spamblock { mode } => {
            let payload = spamblock_payload(mode);
            simple_round_trip(channel, session, config, payload_type, Command::CtrlSpamblock, |pt| {
                encode(pt, &payload, |p| p.encode_binary())
            })
            .await
        }
        Action::Observe { chat, observe } => {
            let payload = observe_payload(chat, observe);
            simple_round_trip(channel, session, config, payload_type, Command::ObserveChatId, |pt| {
                encode(pt, &payload, |p| p.encode_binary())
            })
            .await
        }
        Action::ObserveAll { observe } => {
            let payload = observe_all_payload(observe);
            simple_round_trip(channel, session, config, payload_type, Command::ObserveAllChats, |pt| {
                encode(pt, &payload, |p| p.encode_binary())
            })
            .await
        }
        Action::SendFile { chat, file_type, path } => {
            let payload = send_file_payload(chat, file_type, path);
            simple_round_trip(channel, session, config, payload_type, Command::SendFileToChatId, |pt| {
                encode(pt, &payload, |p| p.encode_binary())
            })
            .await
        }
        Action::Uptime => {
            let request = session.packet(Command::GetUptime, payload_type, vec![]);
            let reply = channel.roundtrip(&request, config.max_data_size).await?;
            let uptime: tgbot_wire::payload::GetUptimeCallback = match reply.payload_type {
                PayloadType::Binary => tgbot_wire::payload::GetUptimeCallback::decode_binary(&reply.payload)?,
                PayloadType::Json => serde_json::from_slice(&reply.payload)?,
            };
            println!("{}", uptime.uptime);
            Ok(())
        }
        Action::Transfer { src, dst, overwrite, hash_ignore, dry_run } => {
            let dst = dst.unwrap_or_else(|| {
                std::path::Path::new(&src)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| src.clone())
            });
            let meta = FileTransferMeta {
                src,
                dst,
                overwrite,
                hash_ignore,
                dry_run,
                hash: [0u8; HASH_LEN],
            };
            transfer::request(channel, session, config.max_data_size, payload_type, meta).await?;
            Ok(())
        }
        Action::Logs { .. } => unreachable!("handled before dispatch"),
    }
}

fn encode<T: serde::Serialize>(payload_type: PayloadType, value: &T, to_binary: impl FnOnce(&T) -> Vec<u8>) -> Vec<u8> {
    match payload_type {
        PayloadType::Binary => to_binary(value),
        PayloadType::Json => serde_json::to_vec(value).expect("wire payloads always serialize"),
    }
}

async fn simple_round_trip(
    channel: &mut Channel,
    session: &mut ClientSession,
    config: &ClientConfig,
    payload_type: PayloadType,
    command: tgbot_wire::Command,
    build: impl FnOnce(PayloadType) -> Vec<u8>,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = session.packet(command, payload_type, build(payload_type));
    let reply = channel.roundtrip(&request, config.max_data_size).await?;
    let ack: tgbot_wire::payload::GenericAck = match reply.payload_type {
        PayloadType::Binary => tgbot_wire::payload::GenericAck::decode_binary(&reply.payload)?,
        PayloadType::Json => serde_json::from_slice(&reply.payload)?,
    };
    if ack.result != tgbot_wire::payload::AckType::Success {
        return Err(format!("{:?}: {}", ack.result, ack.error_msg).into());
    }
    Ok(())
}
