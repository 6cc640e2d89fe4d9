//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{RcLinkError, Result};
use crate::link::{Role, TrackerConfig};
use crate::protocol::MAX_PAYLOAD_SIZE;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub failsafe: FailsafeConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Link role in the config file
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoleConfig {
    Ground,
    Aircraft,
}

impl From<RoleConfig> for Role {
    fn from(role: RoleConfig) -> Self {
        match role {
            RoleConfig::Ground => Role::Ground,
            RoleConfig::Aircraft => Role::Aircraft,
        }
    }
}

/// Protocol and link-health configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    #[serde(default = "default_role")]
    pub role: RoleConfig,

    #[serde(default = "default_protocol_version")]
    pub protocol_version: u8,

    #[serde(default = "default_link_timeout_ms")]
    pub timeout_ms: u32,

    #[serde(default = "default_loss_threshold")]
    pub loss_threshold: u8,

    #[serde(default = "default_statistics_enabled")]
    pub statistics_enabled: bool,

    #[serde(default = "default_update_rate_hz")]
    pub update_rate_hz: u32,

    #[serde(default = "default_command_payload_size")]
    pub command_payload_size: usize,

    #[serde(default = "default_telemetry_payload_size")]
    pub telemetry_payload_size: usize,
}

/// Failsafe configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FailsafeConfig {
    /// Raw command bytes handed out while the link is lost
    #[serde(default = "default_failsafe_command")]
    pub command: Vec<u8>,
}

/// Serial radio adapter configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Device path; empty means auto-detect
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

/// Link statistics logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,

    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_role() -> RoleConfig { RoleConfig::Ground }
fn default_protocol_version() -> u8 { crate::protocol::PROTOCOL_VERSION }
fn default_link_timeout_ms() -> u32 { crate::link::tracker::DEFAULT_LINK_TIMEOUT_MS }
fn default_loss_threshold() -> u8 { crate::link::tracker::DEFAULT_LINK_LOSS_THRESHOLD }
fn default_statistics_enabled() -> bool { true }
fn default_update_rate_hz() -> u32 { 50 }
fn default_command_payload_size() -> usize { 18 }
fn default_telemetry_payload_size() -> usize { 22 }

fn default_failsafe_command() -> Vec<u8> { crate::link::DEFAULT_FAILSAFE_COMMAND.to_vec() }

fn default_baud_rate() -> u32 { 115200 }
fn default_channel_capacity() -> usize { 16 }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_interval_ms() -> u64 { 1000 }
fn default_log_format() -> String { "jsonl".to_string() }

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            role: default_role(),
            protocol_version: default_protocol_version(),
            timeout_ms: default_link_timeout_ms(),
            loss_threshold: default_loss_threshold(),
            statistics_enabled: default_statistics_enabled(),
            update_rate_hz: default_update_rate_hz(),
            command_payload_size: default_command_payload_size(),
            telemetry_payload_size: default_telemetry_payload_size(),
        }
    }
}

impl Default for FailsafeConfig {
    fn default() -> Self {
        Self {
            command: default_failsafe_command(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            log_interval_ms: default_log_interval_ms(),
            format: default_log_format(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            failsafe: FailsafeConfig::default(),
            serial: SerialConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl LinkConfig {
    /// Tracker settings derived from this section
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            timeout_ms: self.timeout_ms,
            loss_threshold: self.loss_threshold,
            statistics: self.statistics_enabled,
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> RcLinkError {
    RcLinkError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rc_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        let link = &self.link;

        if link.protocol_version == 0 {
            return Err(invalid("protocol_version must be between 1 and 255"));
        }

        if link.timeout_ms == 0 || link.timeout_ms > 60000 {
            return Err(invalid("timeout_ms must be between 1 and 60000"));
        }

        if link.loss_threshold == 0 {
            return Err(invalid("loss_threshold must be greater than 0"));
        }

        if link.update_rate_hz == 0 || link.update_rate_hz > 1000 {
            return Err(invalid("update_rate_hz must be between 1 and 1000"));
        }

        for (name, size) in [
            ("command_payload_size", link.command_payload_size),
            ("telemetry_payload_size", link.telemetry_payload_size),
        ] {
            if size > MAX_PAYLOAD_SIZE {
                return Err(invalid(format!("{} must be at most {}", name, MAX_PAYLOAD_SIZE)));
            }
        }

        // Failsafe must be a drop-in replacement for a real command
        if self.failsafe.command.len() != link.command_payload_size {
            return Err(invalid(format!(
                "failsafe command is {} bytes, command_payload_size is {}",
                self.failsafe.command.len(),
                link.command_payload_size
            )));
        }

        // Serial port can be empty (auto-detect)
        if ![9600, 57600, 115200, 230400, 460800, 921600].contains(&self.serial.baud_rate) {
            return Err(invalid("baud_rate must be one of: 9600, 57600, 115200, 230400, 460800, 921600"));
        }

        if self.serial.channel_capacity == 0 {
            return Err(invalid("channel_capacity must be greater than 0"));
        }

        // Validate telemetry configuration
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.log_interval_ms == 0 || self.telemetry.log_interval_ms > 60000 {
            return Err(invalid("log_interval_ms must be between 1 and 60000"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.telemetry.format != "jsonl" {
            return Err(invalid("log format must be 'jsonl' (only supported format)"));
        }

        Ok(())
    }
}
