//! `tgbot-server` binary: parses CLI flags, loads configuration, installs
//! the fan-out logger, and runs the listeners until Ctrl-C arrives.
//!
//! The Telegram API, chat-observer, spam-block, and filesystem
//! collaborators stay external, so this binary wires in the in-memory test
//! doubles from `collaborators::testing` as its default set; a real
//! deployment links in its own implementations of the four traits in
//! `collaborators.rs` and builds a [`ServerState`] with those instead.
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;

use tgbot_server::collaborators::testing::null_collaborators;
use tgbot_server::log_sink::{FanoutLogger, LogFanout};
use tgbot_server::{listener, log_sink, ServerConfig, ServerState};

#[derive(Parser, Debug)]
#[command(name = "tgbot-server", about = "The tgbot socket control-plane daemon")]
struct Cli {
    /// Path to a TOML file overriding the default configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level: error, warn, info, debug, or trace.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = Cli::parse();

    let level = cli.log_level.parse::<LevelFilter>().unwrap_or_else(|_| {
        eprintln!("invalid --log-level {:?}, defaulting to info", cli.log_level);
        LevelFilter::Info
    });

    let fanout = LogFanout::new();
    FanoutLogger::install(SimpleLogger::new().with_level(level), fanout.clone(), level)
        .expect("logger is installed exactly once at startup");

    let config = match &cli.config {
        Some(path) => match ServerConfig::from_toml_file(path) {
            Ok(config) => config,
            Err(err) => {
                error!("failed to load {}: {err}", path.display());
                std::process::exit(1);
            }
        },
        None => ServerConfig::default(),
    };

    info!(
        "starting tgbot-server: command_port={} log_port={} unix_socket={}",
        config.command_port,
        config.log_port,
        config.unix_socket_path.display()
    );

    let state = Arc::new(ServerState::new(&config, null_collaborators()));
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    listener::spawn_all(&config, state.clone(), shutdown_rx.clone());
    log_sink::spawn(config.log_port, fanout, shutdown_rx);

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {err}");
    }
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
}
