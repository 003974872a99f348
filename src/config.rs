//! Client configuration.
//!
//! Defaults layered under an optional TOML file and `PARLOR_*`
//! environment variables, e.g. `PARLOR_SERVER_URL=wss://chat.internal`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::connection::RetryConfig;

/// Default chat server base URL.
const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8080";

/// Configuration for the chat client core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Chat server base URL; channels connect to
    /// `{server_url}/api/chat?session_id={id}`.
    pub server_url: String,
    /// Directory for the file-backed store.
    pub data_dir: PathBuf,
    /// When set, only the newest N messages per session are persisted.
    /// The in-memory log is never truncated.
    pub max_persisted_messages: Option<usize>,
    /// Connect retry policy. Disabled by default: reconnection is a
    /// caller action.
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            data_dir: default_data_dir(),
            max_persisted_messages: None,
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration: defaults, then the optional TOML file, then
    /// `PARLOR_*` environment variables, later sources winning.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&ClientConfig::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(config::Environment::with_prefix("PARLOR").separator("__"));
        builder.build()?.try_deserialize()
    }
}

/// Platform data directory for the client, falling back to a local
/// directory when the platform offers none.
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parlor")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert!(config.max_persisted_messages.is_none());
        assert_eq!(config.retry.max_retries, 0);
    }

    #[test]
    fn test_load_without_file_yields_defaults() {
        let config = ClientConfig::load(None).unwrap();
        assert_eq!(config.server_url, ClientConfig::default().server_url);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "server_url = \"wss://chat.internal\"").unwrap();
        writeln!(file, "max_persisted_messages = 500").unwrap();

        let config = ClientConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server_url, "wss://chat.internal");
        assert_eq!(config.max_persisted_messages, Some(500));
    }
}
