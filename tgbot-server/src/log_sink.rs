//! The log fan-out sink: a dedicated listener that, once a client connects,
//! streams every log record produced by the process as a framed
//! `LOG_ENTRY` packet until that client disconnects. Generalizes a single
//! stderr `simple_logger` install into a `log::Log` that both prints
//! locally and republishes onto a broadcast channel.
use std::net::{Ipv4Addr, SocketAddr};

use log::{debug, error, info, warn};
use tgbot_wire::payload::{LogEntry, LogSeverity};
use tgbot_wire::{codec, Command, Packet, PayloadType};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, watch};

/// Bound on the broadcast channel every log record is published onto. A log
/// viewer that falls behind drops the oldest entries rather than slowing
/// down the rest of the server (`tokio::sync::broadcast`'s usual trade-off).
const CHANNEL_CAPACITY: usize = 1024;

/// Handle shared by the installed logger (producer) and the log sink
/// listener (one consumer subscription per connected client).
#[derive(Clone)]
pub struct LogFanout {
    sender: broadcast::Sender<LogEntry>,
}

impl LogFanout {
    pub fn new() -> Self {
        let (sender, _receiver) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, entry: LogEntry) {
        let _ = self.sender.send(entry);
    }

    fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogFanout {
    fn default() -> Self {
        Self::new()
    }
}

/// `log::Log` wrapper that forwards every record to an inner logger (the
/// process's own stderr output) and republishes it as a [`LogEntry`] onto a
/// [`LogFanout`].
pub struct FanoutLogger {
    inner: Box<dyn log::Log>,
    fanout: LogFanout,
}

impl FanoutLogger {
    /// Install `inner` as the process-wide logger, wrapped so every record
    /// it accepts is also pushed onto `fanout`. Must be called at most once
    /// per process, before the first log record is emitted.
    pub fn install(
        inner: impl log::Log + 'static,
        fanout: LogFanout,
        max_level: log::LevelFilter,
    ) -> Result<(), log::SetLoggerError> {
        log::set_boxed_logger(Box::new(Self {
            inner: Box::new(inner),
            fanout,
        }))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl log::Log for FanoutLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.inner.enabled(record.metadata()) {
            return;
        }
        self.inner.log(record);
        self.fanout.publish(LogEntry {
            severity: map_level(record.level()),
            message: record.args().to_string(),
        });
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

fn map_level(level: log::Level) -> LogSeverity {
    match level {
        log::Level::Trace => LogSeverity::Trace,
        log::Level::Debug => LogSeverity::Debug,
        log::Level::Info => LogSeverity::Info,
        log::Level::Warn => LogSeverity::Warn,
        log::Level::Error => LogSeverity::Error,
    }
}

/// Bind the log sink listener on `port` and spawn its accept loop.
pub fn spawn(port: u16, fanout: LogFanout, mut shutdown: watch::Receiver<bool>) {
    tokio::spawn(async move {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        let listener = match TcpListener::bind(addr).await {
            Ok(l) => l,
            Err(err) => {
                error!("failed to bind log sink listener on {addr}: {err}");
                return;
            }
        };
        info!("log sink listening on {addr}");
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("log sink {addr} shutting down");
                    return;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let receiver = fanout.subscribe();
                            tokio::spawn(stream_to_client(stream, receiver, peer.to_string()));
                        }
                        Err(err) => warn!("accept failed on log sink {addr}: {err}"),
                    }
                }
            }
        }
    });
}

async fn stream_to_client(mut stream: TcpStream, mut entries: broadcast::Receiver<LogEntry>, peer: String) {
    let mut nonce = 1u64;
    loop {
        let entry = match entries.recv().await {
            Ok(entry) => entry,
            Err(broadcast::error::RecvError::Closed) => return,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("log sink client {peer} lagged, dropped {skipped} entries");
                continue;
            }
        };

        let packet = Packet::without_session(Command::LogEntry, PayloadType::Binary, nonce, entry.encode_binary());
        nonce += 1;
        if let Err(err) = codec::write(&mut stream, &packet).await {
            debug!("log sink client {peer} disconnected: {err}");
            return;
        }
    }
}
