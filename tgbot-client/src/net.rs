//! Transport connection for the client driver: an enum-of-streams mirroring
//! `tgbot_server::net::NetStream`, plus the UDP datagram path the server
//! side never needed a symmetric abstraction for (a client only ever dials
//! one peer over UDP, so a connected socket is enough).
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use log::info;
use tgbot_wire::{codec, Packet, ReadError};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpStream, UdpSocket, UnixStream};

use crate::config::{ClientConfig, Transport};

/// Client-side connect timeout (configurable in a real deployment).
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected stream transport (TCP or Unix-domain), grounded on
/// `grammers-mtsender::net::tcp::NetStream`'s enum-of-transports shape.
pub enum ClientStream {
    Tcp(TcpStream),
    Unix(UnixStream),
}

impl AsyncRead for ClientStream {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            Self::Unix(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ClientStream {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            Self::Unix(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(s) => Pin::new(s).poll_flush(cx),
            Self::Unix(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            Self::Unix(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// A connected channel to the server: either a byte stream (request/reply
/// driven by the wire codec) or a connected UDP socket (one packet per
/// datagram).
pub enum Channel {
    Stream(ClientStream),
    Udp(UdpSocket),
}

#[derive(Debug)]
pub enum ClientError {
    Io(io::Error),
    ConnectTimedOut,
    Wire(ReadError),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "i/o error: {err}"),
            Self::ConnectTimedOut => write!(f, "connect timed out after {CONNECT_TIMEOUT:?}"),
            Self::Wire(err) => write!(f, "protocol error: {err}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<io::Error> for ClientError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ReadError> for ClientError {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::Io(err) => Self::Io(err),
            other => Self::Wire(other),
        }
    }
}

impl Channel {
    /// Dial the transport `config` resolved to, honoring the 5 s connect
    /// timeout. For UDP, "connecting" only fixes the peer address on a
    /// locally bound socket; no handshake occurs until the first packet.
    pub async fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        info!("connecting to {:?}", config.transport);
        let connect = async {
            match &config.transport {
                Transport::Tcp(addr) => Ok(Self::Stream(ClientStream::Tcp(TcpStream::connect(addr).await?))),
                Transport::Unix(path) => Ok(Self::Stream(ClientStream::Unix(UnixStream::connect(path).await?))),
                Transport::Udp(addr) => {
                    let local = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
                    let socket = UdpSocket::bind(local).await?;
                    socket.connect(addr).await?;
                    Ok(Self::Udp(socket))
                }
            }
        };
        tokio::time::timeout(CONNECT_TIMEOUT, connect)
            .await
            .map_err(|_| ClientError::ConnectTimedOut)?
    }

    /// Write one packet. For UDP this is a single atomic datagram; for a
    /// stream transport it is the ordinary two-`write_all` codec path.
    pub async fn write(&mut self, packet: &Packet) -> Result<(), ClientError> {
        match self {
            Self::Stream(stream) => Ok(codec::write(stream, packet).await?),
            Self::Udp(socket) => {
                socket.send(&codec::encode(packet)).await?;
                Ok(())
            }
        }
    }

    /// Read one packet.
    pub async fn read(&mut self, max_data_size: u64) -> Result<Packet, ClientError> {
        match self {
            Self::Stream(stream) => Ok(codec::read(stream, max_data_size).await?),
            Self::Udp(socket) => {
                let mut buf = vec![0u8; max_data_size as usize + tgbot_wire::HEADER_SIZE];
                let len = socket.recv(&mut buf).await?;
                Ok(codec::decode(&buf[..len], max_data_size)?)
            }
        }
    }

    /// Write `packet` then read exactly one reply — the strict
    /// request/response shape every command but the chunked-transfer
    /// exchange uses (no multiplexed in-flight requests on one session).
    pub async fn roundtrip(&mut self, packet: &Packet, max_data_size: u64) -> Result<Packet, ClientError> {
        self.write(packet).await?;
        self.read(max_data_size).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_to_a_closed_tcp_port_fails_fast() {
        // Nothing listens on this port; the OS refuses the connection
        // immediately rather than timing out, so this also exercises the
        // ordinary io::Error path rather than ConnectTimedOut.
        let config = ClientConfig {
            transport: Transport::Tcp("127.0.0.1:1".parse().unwrap()),
            max_data_size: tgbot_wire::DEFAULT_MAX_DATA_SIZE,
        };
        let err = Channel::connect(&config).await.unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
    }

    #[test]
    fn client_error_display_reports_the_connect_timeout() {
        let err = ClientError::ConnectTimedOut;
        assert!(err.to_string().contains("timed out"));
    }
}
