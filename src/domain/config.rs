//! # Configuration
//!
//! Loads and validates the bridge configuration file (`config.yaml`).
//! JSON configuration files load as well, since YAML is a superset of JSON.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Main application configuration structure.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub irc: IrcConfig,
    pub event_fabric: EventFabricConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where to read the change feed from.
#[derive(Debug, Deserialize, Clone)]
pub struct IrcConfig {
    #[serde(default)]
    pub server: String,
    #[serde(default = "default_irc_port")]
    pub port: u16,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub nickname: String,
    /// Only messages from this nick are treated as feed data.
    #[serde(default = "default_listen_nickname")]
    pub listen_nickname: String,
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
}

impl IrcConfig {
    pub fn new(server: &str, port: u16, channel: &str, nickname: &str, listen_nickname: &str) -> Self {
        Self {
            server: server.to_string(),
            port,
            channel: channel.to_string(),
            nickname: nickname.to_string(),
            listen_nickname: listen_nickname.to_string(),
            reconnect_delay_secs: default_reconnect_delay(),
        }
    }
}

/// Event Fabric account and target stream.
#[derive(Debug, Deserialize, Clone)]
pub struct EventFabricConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default = "default_event_fabric_url")]
    pub url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_irc_port() -> u16 {
    6667
}
fn default_listen_nickname() -> String {
    "rc-pmtpa".to_string()
}
fn default_reconnect_delay() -> u64 {
    60
}
fn default_event_fabric_url() -> String {
    "http://event-fabric.com/api".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Reads, parses and validates the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Error loading config from {}", path.display()))?;
        let config: AppConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Names of required fields that are missing or empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let required = [
            ("event_fabric.username", &self.event_fabric.username),
            ("event_fabric.password", &self.event_fabric.password),
            ("event_fabric.channel", &self.event_fabric.channel),
            ("irc.server", &self.irc.server),
            ("irc.channel", &self.irc.channel),
            ("irc.nickname", &self.irc.nickname),
            ("irc.listen_nickname", &self.irc.listen_nickname),
        ];

        required
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_fields();
        for field in &missing {
            tracing::error!("{}", crate::strings::logs::missing_field(field));
        }
        if !missing.is_empty() {
            bail!("Missing required config fields: {}", missing.join(", "));
        }
        Ok(())
    }
}
