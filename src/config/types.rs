use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::defaults::{default_encoding, default_port, default_realname, default_user};
use super::validation::{self, ValidationError};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Connection and identity settings for one client.
///
/// Fixed for the lifetime of a [`Client`](crate::Client); there is no
/// reconfiguration mid-run.
///
/// ```toml
/// [client]
/// host = "irc.libera.chat"
/// port = 6697
/// tls = true
/// nick = "asif"
/// channels = ["#asif"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Server hostname or address.
    pub host: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Requested nickname. `_` is appended while the server reports it in use.
    pub nick: String,
    /// Username (ident).
    #[serde(default = "default_user")]
    pub user: String,
    /// Real name shown in WHOIS.
    #[serde(default = "default_realname")]
    pub realname: String,
    /// Wrap the connection in TLS.
    #[serde(default)]
    pub tls: bool,
    /// Server password, sent as `PASS` before registering.
    #[serde(default)]
    pub password: Option<String>,
    /// Text encoding label for the wire (e.g. `utf-8`, `latin1`).
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// Channels to join once registration completes.
    #[serde(default)]
    pub channels: Vec<String>,
}

/// On-disk layout: everything lives under a `[client]` table.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    client: ClientConfig,
}

impl ClientConfig {
    /// Create a configuration with defaults for everything but the essentials.
    pub fn new(host: impl Into<String>, port: u16, nick: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            nick: nick.into(),
            user: default_user(),
            realname: default_realname(),
            tls: false,
            password: None,
            encoding: default_encoding(),
            channels: Vec::new(),
        }
    }

    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(file.client)
    }

    /// Validate the configuration, returning every problem found.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        validation::validate(self)
    }

    /// `host:port`, as used for connecting and in log fields.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_realname(mut self, realname: impl Into<String>) -> Self {
        self.realname = realname.into();
        self
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channels.push(channel.into());
        self
    }
}
