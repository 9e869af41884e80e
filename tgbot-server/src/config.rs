//! Server-side configuration: typed defaults, optionally overridden by a
//! `--config` TOML file, in the style of the client driver's env-var
//! transport selection generalized to a full config struct.
use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

/// Default command-socket port.
pub const DEFAULT_COMMAND_PORT: u16 = 50000;
/// Default log fan-out port.
pub const DEFAULT_LOG_PORT: u16 = 50001;

#[derive(Debug)]
pub enum ConfigError {
    Read(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(err) => write!(f, "failed to read config file: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config file: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Deserialized shape of the optional TOML override file; every field is
/// optional so a config file only needs to mention what it overrides.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    command_port: Option<u16>,
    log_port: Option<u16>,
    unix_socket_path: Option<PathBuf>,
    enable_tcp4: Option<bool>,
    enable_tcp6: Option<bool>,
    enable_udp4: Option<bool>,
    enable_udp6: Option<bool>,
    enable_unix: Option<bool>,
    max_data_size: Option<u64>,
}

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub command_port: u16,
    pub log_port: u16,
    pub unix_socket_path: PathBuf,
    pub enable_tcp4: bool,
    pub enable_tcp6: bool,
    pub enable_udp4: bool,
    pub enable_udp6: bool,
    pub enable_unix: bool,
    pub max_data_size: u64,
}

impl Default for ServerConfig {
    /// Typical deployment: one local stream listener plus one TCP/IPv4
    /// listener, everything else disabled.
    fn default() -> Self {
        Self {
            command_port: DEFAULT_COMMAND_PORT,
            log_port: DEFAULT_LOG_PORT,
            unix_socket_path: std::env::temp_dir().join("tgbot.sock"),
            enable_tcp4: true,
            enable_tcp6: false,
            enable_udp4: false,
            enable_udp6: false,
            enable_unix: true,
            max_data_size: tgbot_wire::DEFAULT_MAX_DATA_SIZE,
        }
    }
}

impl ServerConfig {
    /// Load the defaults, then apply any fields present in the TOML file at
    /// `path`.
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        let file: ConfigFile = toml::from_str(&text).map_err(ConfigError::Parse)?;
        Ok(Self::default().apply(file))
    }

    fn apply(mut self, file: ConfigFile) -> Self {
        if let Some(v) = file.command_port {
            self.command_port = v;
        }
        if let Some(v) = file.log_port {
            self.log_port = v;
        }
        if let Some(v) = file.unix_socket_path {
            self.unix_socket_path = v;
        }
        if let Some(v) = file.enable_tcp4 {
            self.enable_tcp4 = v;
        }
        if let Some(v) = file.enable_tcp6 {
            self.enable_tcp6 = v;
        }
        if let Some(v) = file.enable_udp4 {
            self.enable_udp4 = v;
        }
        if let Some(v) = file.enable_udp6 {
            self.enable_udp6 = v;
        }
        if let Some(v) = file.enable_unix {
            self.enable_unix = v;
        }
        if let Some(v) = file.max_data_size {
            self.max_data_size = v;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = ServerConfig::default();
        assert_eq!(config.command_port, 50000);
        assert_eq!(config.log_port, 50001);
        assert!(config.enable_tcp4);
        assert!(config.enable_unix);
        assert!(!config.enable_tcp6);
    }

    #[test]
    fn toml_override_merges_onto_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tgbot-server.toml");
        std::fs::write(&path, "command_port = 60000\nenable_tcp6 = true\n").unwrap();

        let config = ServerConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.command_port, 60000);
        assert!(config.enable_tcp6);
        // untouched fields keep their default
        assert_eq!(config.log_port, DEFAULT_LOG_PORT);
    }
}
