//! Log-viewer mode: the counterpart to `tgbot_server::log_sink` (component
//! H). Opens a plain TCP connection to the log port and prints every framed
//! `LOG_ENTRY` packet until the server closes the stream.
use log::info;
use tgbot_wire::payload::{LogEntry, LogSeverity};
use tgbot_wire::{codec, header::DEFAULT_MAX_DATA_SIZE, ReadError};
use tokio::net::TcpStream;

pub async fn run(host: &str, port: u16) -> Result<(), ReadError> {
    let mut stream = TcpStream::connect((host, port)).await?;
    info!("watching logs on {host}:{port}");
    loop {
        let packet = match codec::read(&mut stream, DEFAULT_MAX_DATA_SIZE).await {
            Ok(packet) => packet,
            Err(ReadError::Io(_)) => {
                info!("log stream closed");
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        let entry = LogEntry::decode_binary(&packet.payload).map_err(|err| {
            ReadError::Protocol(tgbot_wire::ProtocolError::Decode(err.to_string()))
        })?;
        println!("[{}] {}", severity_label(entry.severity), entry.message);
    }
}

fn severity_label(severity: LogSeverity) -> &'static str {
    match severity {
        LogSeverity::Trace => "TRACE",
        LogSeverity::Debug => "DEBUG",
        LogSeverity::Info => "INFO",
        LogSeverity::Warn => "WARN",
        LogSeverity::Error => "ERROR",
    }
}
