//! Error types for the registry layer.

use pairsync_protocol::ServerIndex;

/// Errors that can occur while editing the server registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The descriptor was rejected at add-time (bad URI, unknown
    /// protocol version, ...). Nothing was registered.
    #[error("invalid server descriptor: {0}")]
    InvalidDescriptor(String),

    /// No live descriptor has this index. Either it was never assigned
    /// or the server has been removed.
    #[error("server {0} not found")]
    NotFound(ServerIndex),
}
