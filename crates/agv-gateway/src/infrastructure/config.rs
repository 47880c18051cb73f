//! TOML configuration for the gateway.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration:
//!
//! ```toml
//! [network]
//! bind_address = "0.0.0.0"
//! port = 4001
//! backlog = 5
//! receive_buffer = 1024
//! nodelay = true
//!
//! [scheduler]
//! tick_interval_ms = 50
//!
//! [logging]
//! log_level = "info"
//! ```
//!
//! Fields annotated with `#[serde(default = "some_fn")]` take the value of
//! `some_fn()` when absent, which also keeps older files loadable after new
//! fields are added.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be rendered as TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value parsed but is unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GatewayConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listening socket settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Interface to listen on.  `"0.0.0.0"` binds all IPv4 interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    /// TCP port the controller connects to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// `listen()` backlog.
    #[serde(default = "default_backlog")]
    pub backlog: u32,
    /// Bytes requested per read by the echo responder.
    #[serde(default = "default_receive_buffer")]
    pub receive_buffer: usize,
    /// Disable Nagle's algorithm on the accepted socket.
    #[serde(default = "default_true")]
    pub nodelay: bool,
}

/// Repeated-send scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerConfig {
    /// Milliseconds between scheduler ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}
fn default_port() -> u16 {
    4001
}
fn default_backlog() -> u32 {
    crate::infrastructure::network::DEFAULT_BACKLOG
}
fn default_receive_buffer() -> usize {
    crate::application::echo_handshake::RECEIVE_BUFFER
}
fn default_true() -> bool {
    true
}
fn default_tick_interval_ms() -> u64 {
    50
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            backlog: default_backlog(),
            receive_buffer: default_receive_buffer(),
            nodelay: default_true(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl GatewayConfig {
    /// Rejects values that parse but cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.tick_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.network.receive_buffer == 0 {
            return Err(ConfigError::Invalid(
                "network.receive_buffer must be greater than 0".to_string(),
            ));
        }
        if self.network.backlog == 0 {
            return Err(ConfigError::Invalid(
                "network.backlog must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if rendering fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Parses and validates TOML text.
///
/// # Errors
///
/// [`ConfigError::Parse`] for malformed TOML, [`ConfigError::Invalid`] for
/// unusable values.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let cfg: GatewayConfig = toml::from_str(content)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Loads the config at `path`, returning defaults if the file does not exist.
///
/// # Errors
///
/// [`ConfigError::Io`] for file-system errors other than "not found", plus
/// everything [`parse_config`] returns.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(GatewayConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        // Arrange / Act
        let cfg = GatewayConfig::default();

        // Assert
        assert_eq!(cfg.network.bind_address, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(cfg.network.port, 4001);
        assert_eq!(cfg.network.backlog, 5);
        assert_eq!(cfg.network.receive_buffer, 1024);
        assert!(cfg.network.nodelay);
        assert_eq!(cfg.scheduler.tick_interval(), Duration::from_millis(50));
        assert_eq!(cfg.logging.log_level, "info");
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        assert_eq!(parse_config("").unwrap(), GatewayConfig::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        // Arrange
        let text = "[network]\nport = 5000\nbind_address = \"127.0.0.1\"\n";

        // Act
        let cfg = parse_config(text).unwrap();

        // Assert
        assert_eq!(cfg.network.port, 5000);
        assert_eq!(cfg.network.bind_address, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(cfg.network.backlog, 5);
        assert_eq!(cfg.scheduler, SchedulerConfig::default());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let result = parse_config("[network\nport = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_bad_ip_is_parse_error() {
        let result = parse_config("[network]\nbind_address = \"not-an-ip\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_tick_interval_is_rejected() {
        let result = parse_config("[scheduler]\ntick_interval_ms = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_receive_buffer_is_rejected() {
        let result = parse_config("[network]\nreceive_buffer = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rendered_config_parses_back() {
        // Arrange
        let mut cfg = GatewayConfig::default();
        cfg.network.port = 9000;
        cfg.scheduler.tick_interval_ms = 20;

        // Act
        let text = cfg.to_toml().expect("serialize");
        let restored = parse_config(&text).expect("deserialize");

        // Assert
        assert_eq!(cfg, restored);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("agv-gateway-config-that-does-not-exist.toml");
        assert_eq!(load_config(&path).unwrap(), GatewayConfig::default());
    }

    #[test]
    fn test_load_config_reads_file() {
        // Arrange
        let path = std::env::temp_dir().join(format!(
            "agv-gateway-config-test-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[logging]\nlog_level = \"debug\"\n").unwrap();

        // Act
        let cfg = load_config(&path);
        let _ = std::fs::remove_file(&path);

        // Assert
        assert_eq!(cfg.unwrap().logging.log_level, "debug");
    }
}
