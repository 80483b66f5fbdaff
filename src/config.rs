//! # Configuration Management
//!
//! Centralized configuration for ICMP sessions.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()`
//!
//! ## Defaults
//! - Identifier derived from the process id, sequence starting at 1
//! - 1500-byte receive buffer (one Ethernet MTU)
//! - No socket deadlines: a receive blocks until a datagram arrives
//! - RFC 1071 checksum, received checksums not verified

use crate::core::checksum::ChecksumAlgorithm;
use crate::core::message::{ICMP_HEADER_LEN, IPV4_HEADER_LEN};
use crate::error::{IcmpError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Default receive buffer size in bytes
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 1500;

/// Largest datagram an IPv4 socket can deliver
pub const MAX_RECV_BUFFER_SIZE: usize = 65_535;

/// First sequence number used by a session
pub const DEFAULT_INITIAL_SEQUENCE: u16 = 1;

/// Prefix marking validation entries that do not prevent use
const WARNING_PREFIX: &str = "WARNING";

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct IcmpConfig {
    /// Identifier and sequence settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Raw socket settings
    #[serde(default)]
    pub socket: SocketConfig,

    /// Checksum settings
    #[serde(default)]
    pub codec: CodecConfig,
}

impl IcmpConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| IcmpError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| IcmpError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| IcmpError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(val) = env_parse::<u16>("ICMP_IDENTIFIER")? {
            config.session.identifier = val;
        }

        if let Some(val) = env_parse::<u16>("ICMP_INITIAL_SEQUENCE")? {
            config.session.initial_sequence = val;
        }

        if let Some(val) = env_parse::<usize>("ICMP_RECV_BUFFER_SIZE")? {
            config.socket.recv_buffer_size = val;
        }

        if let Some(val) = env_parse::<u64>("ICMP_READ_TIMEOUT_MS")? {
            config.socket.read_timeout = Some(Duration::from_millis(val));
        }

        if let Some(val) = env_parse::<u64>("ICMP_WRITE_TIMEOUT_MS")? {
            config.socket.write_timeout = Some(Duration::from_millis(val));
        }

        if let Some(val) = env_parse::<u32>("ICMP_TTL")? {
            config.socket.ttl = Some(val);
        }

        if let Ok(name) = std::env::var("ICMP_CHECKSUM_ALGORITHM") {
            config.codec.checksum = match name.to_ascii_lowercase().as_str() {
                "rfc1071" => ChecksumAlgorithm::Rfc1071,
                "legacy" => ChecksumAlgorithm::Legacy,
                other => {
                    return Err(IcmpError::ConfigError(format!(
                        "Invalid ICMP_CHECKSUM_ALGORITHM: '{other}' (expected 'rfc1071' or 'legacy')"
                    )))
                }
            };
        }

        if let Some(val) = env_parse::<bool>("ICMP_VERIFY_CHECKSUM")? {
            config.codec.verify_checksum = val;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| IcmpError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| IcmpError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.socket.validate());
        errors.extend(self.codec.validate());
        errors
    }

    /// Validation entries that prevent use, i.e. everything but warnings
    pub fn validate_errors(&self) -> Vec<String> {
        self.validate()
            .into_iter()
            .filter(|e| !e.starts_with(WARNING_PREFIX))
            .collect()
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        validation_result(self.validate())
    }

    /// Like [`validate_strict`](Self::validate_strict), but warnings alone pass
    pub fn validate_usable(&self) -> Result<()> {
        validation_result(self.validate_errors())
    }
}

fn validation_result(errors: Vec<String>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(IcmpError::ConfigError(format!(
            "Configuration validation failed:\n  - {}",
            errors.join("\n  - ")
        )))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| IcmpError::ConfigError(format!("Invalid value for {key}: '{raw}'"))),
        Err(_) => Ok(None),
    }
}

/// Identifier and sequence numbering for a session
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Identifier stamped on every request; defaults to the low 16 bits of the process id
    pub identifier: u16,

    /// Sequence number of the first request a session sends
    pub initial_sequence: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            identifier: std::process::id() as u16,
            initial_sequence: DEFAULT_INITIAL_SEQUENCE,
        }
    }
}

/// Raw socket configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SocketConfig {
    /// Receive buffer size; longer datagrams are truncated by the socket
    pub recv_buffer_size: usize,

    /// Receive deadline; `None` blocks until a datagram arrives
    #[serde(default, with = "option_duration_serde")]
    pub read_timeout: Option<Duration>,

    /// Send deadline; `None` blocks until the datagram is queued
    #[serde(default, with = "option_duration_serde")]
    pub write_timeout: Option<Duration>,

    /// IP time-to-live for outgoing datagrams; `None` keeps the OS default
    #[serde(default)]
    pub ttl: Option<u32>,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            read_timeout: None,
            write_timeout: None,
            ttl: None,
        }
    }
}

impl SocketConfig {
    /// Validate socket configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let min = IPV4_HEADER_LEN + ICMP_HEADER_LEN;
        if self.recv_buffer_size < min {
            errors.push(format!(
                "Receive buffer too small: {} bytes (minimum: {min} bytes for IPv4 + ICMP headers)",
                self.recv_buffer_size
            ));
        } else if self.recv_buffer_size > MAX_RECV_BUFFER_SIZE {
            errors.push(format!(
                "Receive buffer too large: {} bytes (maximum: {MAX_RECV_BUFFER_SIZE} bytes)",
                self.recv_buffer_size
            ));
        }

        if self.read_timeout.is_some_and(|t| t.is_zero()) {
            errors.push("Read timeout cannot be zero (omit it to block indefinitely)".to_string());
        }

        if self.write_timeout.is_some_and(|t| t.is_zero()) {
            errors.push("Write timeout cannot be zero (omit it to block indefinitely)".to_string());
        }

        if let Some(ttl) = self.ttl {
            if ttl == 0 || ttl > 255 {
                errors.push(format!("Invalid TTL: {ttl} (valid range: 1-255)"));
            }
        }

        errors
    }
}

/// Checksum configuration
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct CodecConfig {
    /// Algorithm used when serializing requests
    #[serde(default)]
    pub checksum: ChecksumAlgorithm,

    /// Reject replies whose carried checksum does not match a recomputation
    #[serde(default)]
    pub verify_checksum: bool,
}

impl CodecConfig {
    /// Validate codec configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.checksum == ChecksumAlgorithm::Legacy {
            errors.push(format!(
                "{WARNING_PREFIX}: Legacy checksum is selected - most hosts drop requests carrying it"
            ));
        }

        errors
    }
}

/// Helper module for optional Duration serialization/deserialization as milliseconds
mod option_duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.map(|d| d.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
