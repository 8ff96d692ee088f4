//! Console client configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use rutty_core::{Origin, RuttyError};

/// Top-level configuration for the console client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server settings.
    pub network: NetworkConfig,
    /// Local terminal settings.
    pub terminal: TerminalConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// HTTP(S) origin of the RuTTY server.
    pub origin: String,
    /// Reconnection delay in seconds used until the server sends its own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconnect: Option<u64>,
}

/// Local terminal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Window title shown until the server provides one.
    pub title: String,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
    /// Optional log file. If empty, logs to stderr.
    pub file: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            origin: "http://127.0.0.1:3000".into(),
            reconnect: None,
        }
    }
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            title: "RuTTY".into(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            file: String::new(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ClientConfig {
    /// Read a TOML file. A missing file is `NotFound`; a malformed one is
    /// `InvalidData`.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// The default configuration as a TOML document.
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&Self::default())
    }

    /// The configured server origin.
    pub fn origin(&self) -> Result<Origin, RuttyError> {
        Origin::parse(&self.network.origin)
    }
}

// ── Tests ────────────────────────────────────────────────────────
