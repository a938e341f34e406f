//! Core configuration types and loading.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use thiserror::Error;

use super::defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server identity and greeting.
    #[serde(default)]
    pub server: ServerConfig,
    /// Network listen configuration.
    #[serde(default)]
    pub listen: ListenConfig,
    /// Command line parsing.
    #[serde(default)]
    pub parser: ParserConfig,
    /// Per-connection resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Host bans.
    #[serde(default)]
    pub security: SecurityConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name, shown in logs.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Lines sent to every new connection before anything else.
    #[serde(default)]
    pub welcome: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            welcome: Vec::new(),
        }
    }
}

/// Network listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_listen_address")]
    pub address: SocketAddr,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: default_listen_address(),
        }
    }
}

/// How input lines are split and what the built-in messages say.
#[derive(Debug, Clone, Deserialize)]
pub struct ParserConfig {
    /// Separates the command name from its arguments.
    #[serde(default = "default_separator")]
    pub separator: String,
    /// Typing this while a prompt is active abandons the prompt.
    #[serde(default = "default_abort_command")]
    pub abort_command: String,
    /// Sent when no command matches.
    #[serde(default = "default_huh_message")]
    pub huh_message: String,
    /// Sent when a command fails.
    #[serde(default = "default_error_message")]
    pub error_message: String,
    /// Single leading characters that stand in for a command name.
    #[serde(default = "default_substitutions")]
    pub substitutions: BTreeMap<String, String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            abort_command: default_abort_command(),
            huh_message: default_huh_message(),
            error_message: default_error_message(),
            substitutions: default_substitutions(),
        }
    }
}

impl ParserConfig {
    /// Substitutions keyed by character. Entries whose key is not exactly one
    /// character are skipped; `validate` reports them.
    pub fn substitution_chars(&self) -> BTreeMap<char, String> {
        self.substitutions
            .iter()
            .filter_map(|(key, name)| {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some((c, name.clone())),
                    _ => None,
                }
            })
            .collect()
    }
}

/// Per-connection resource limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Longest accepted input line in bytes, excluding the terminator.
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
    /// Outgoing queue depth per connection, in lines.
    #[serde(default = "default_sendq")]
    pub sendq: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_line_length: default_max_line_length(),
            sendq: default_sendq(),
        }
    }
}

/// Security configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    /// IP addresses refused at accept time.
    #[serde(default)]
    pub banned_hosts: Vec<String>,
}

impl SecurityConfig {
    /// Parsed banned hosts. Unparsable entries are skipped; `validate` reports them.
    pub fn banned_addrs(&self) -> Vec<IpAddr> {
        self.banned_hosts
            .iter()
            .filter_map(|host| host.trim().parse().ok())
            .collect()
    }
}
