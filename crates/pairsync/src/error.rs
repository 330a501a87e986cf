//! Unified error type for PairSync.

use std::path::PathBuf;

use pairsync_protocol::ServerIndex;
use pairsync_registry::RegistryError;
use pairsync_session::SessionError;

/// Top-level error returned by [`PairRegistry`](crate::PairRegistry) and
/// [`ClientConfig`](crate::ClientConfig).
///
/// Connect failures never surface here: sessions retry them in the
/// background and report them through
/// [`SessionStatus::last_error`](pairsync_session::SessionStatus).
/// Transport and protocol failures of an explicit push arrive wrapped in
/// [`SessionError`].
#[derive(Debug, thiserror::Error)]
pub enum PairSyncError {
    /// The client config could not be read or parsed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A registry edit failed (invalid descriptor, unknown index).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A session operation failed (not connected, unknown pair, ...).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The server is registered but disabled.
    #[error("server {0} is disabled")]
    Disabled(ServerIndex),
}

/// Errors loading a [`ClientConfig`](crate::ClientConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
