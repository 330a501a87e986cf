//! Client configuration, loaded once at startup.

use std::path::Path;

use pairsync_registry::DescriptorConfig;
use pairsync_session::SessionConfig;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Everything the client reads from its config file.
///
/// ```json
/// {
///   "servers": [
///     { "uri": "wss://a.example/hub", "priority": 10, "credential": "main" }
///   ],
///   "session": { "handshake_timeout_ms": 5000 }
/// }
/// ```
///
/// Server order matters: the n-th entry gets index `S-n`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub servers: Vec<DescriptorConfig>,

    #[serde(default)]
    pub session: SessionConfig,
}

impl ClientConfig {
    /// Parses a config from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(
            path = %path.display(),
            servers = config.servers.len(),
            "config loaded"
        );
        Ok(config)
    }
}
