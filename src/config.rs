//! Configuration shared by the sender and receiver programs.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values, and anything left
//! unset falls back to the built-in defaults (`127.0.0.1:6666`, 10 KiB
//! buffers, one million iterations).

use clap::Parser;
use serde::Deserialize;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

/// Command-line arguments accepted by both programs
#[derive(Parser, Debug, Default)]
#[command(version, about = "Point-to-point TCP throughput benchmark", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to (sender) or connect to (receiver)
    #[arg(short = 'a', long)]
    pub host: Option<String>,

    /// TCP port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Size of the transfer buffer in bytes
    #[arg(short, long)]
    pub buffer_size: Option<usize>,

    /// Number of buffers the sender writes; the receiver's goal is
    /// iterations * buffer size
    #[arg(short = 'n', long)]
    pub iterations: Option<u64>,

    /// Byte value the sender fills its buffer with
    #[arg(short, long)]
    pub fill_byte: Option<u8>,

    /// SO_SNDBUF for the sender's connection
    #[arg(long)]
    pub send_buffer: Option<usize>,

    /// SO_RCVBUF for the receiver's connection
    #[arg(long)]
    pub recv_buffer: Option<usize>,

    /// Disable Nagle's algorithm on the connection
    #[arg(long)]
    pub nodelay: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub socket: SocketConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the sender listens and the receiver connects
#[derive(Debug, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Shape of the transfer
#[derive(Debug, Deserialize)]
pub struct TransferConfig {
    /// Bytes per write on the sender, bytes per read on the receiver
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default = "default_iterations")]
    pub iterations: u64,
    #[serde(default = "default_fill_byte")]
    pub fill_byte: u8,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            iterations: default_iterations(),
            fill_byte: default_fill_byte(),
        }
    }
}

/// Optional socket tuning; unset values leave the kernel defaults alone
#[derive(Debug, Deserialize, Default)]
pub struct SocketConfig {
    pub send_buffer: Option<usize>,
    pub recv_buffer: Option<usize>,
    #[serde(default)]
    pub nodelay: bool,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    6666
}

fn default_buffer_size() -> usize {
    10 * 1024 // 10 KiB
}

fn default_iterations() -> u64 {
    1000 * 1000
}

fn default_fill_byte() -> u8 {
    12
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub buffer_size: usize,
    pub iterations: u64,
    pub fill_byte: u8,
    pub send_buffer: Option<usize>,
    pub recv_buffer: Option<usize>,
    pub nodelay: bool,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            buffer_size: default_buffer_size(),
            iterations: default_iterations(),
            fill_byte: default_fill_byte(),
            send_buffer: None,
            recv_buffer: None,
            nodelay: false,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_cli(CliArgs::parse())
    }

    /// Merge already-parsed CLI arguments with the TOML file they name.
    pub fn from_cli(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        let config = Config {
            host: cli.host.unwrap_or(toml_config.connection.host),
            port: cli.port.unwrap_or(toml_config.connection.port),
            buffer_size: cli
                .buffer_size
                .unwrap_or(toml_config.transfer.buffer_size),
            iterations: cli.iterations.unwrap_or(toml_config.transfer.iterations),
            fill_byte: cli.fill_byte.unwrap_or(toml_config.transfer.fill_byte),
            send_buffer: cli.send_buffer.or(toml_config.socket.send_buffer),
            recv_buffer: cli.recv_buffer.or(toml_config.socket.recv_buffer),
            nodelay: cli.nodelay || toml_config.socket.nodelay,
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the transfer loops cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::Invalid("buffer size must be non-zero".into()));
        }
        if self.checked_goal().is_none() {
            return Err(ConfigError::Invalid(format!(
                "{} iterations of {} bytes overflows the byte goal",
                self.iterations, self.buffer_size
            )));
        }
        Ok(())
    }

    /// Total bytes the sender writes and the receiver waits for.
    ///
    /// Saturates on overflow; `validate` rejects such configs up front.
    pub fn goal(&self) -> u64 {
        self.checked_goal().unwrap_or(u64::MAX)
    }

    fn checked_goal(&self) -> Option<u64> {
        self.iterations.checked_mul(self.buffer_size as u64)
    }

    /// Resolve `host:port` into a socket address.
    pub fn socket_addr(&self) -> std::io::Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    format!("no address found for {}:{}", self.host, self.port),
                )
            })
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::Invalid(reason) => write!(f, "Invalid configuration: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}
