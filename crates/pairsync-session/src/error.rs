//! Error types for the session layer.

use std::time::Duration;

use pairsync_protocol::{NameHash, ProtocolError, ProtocolVersion, ServerIndex};
use pairsync_transport::TransportError;

/// Why a connect attempt failed.
///
/// Split into two classes:
/// - **terminal** ([`AuthRejected`](Self::AuthRejected),
///   [`VersionMismatch`](Self::VersionMismatch),
///   [`Credential`](Self::Credential)): retrying can't help, so the
///   session halts and surfaces the error.
/// - **transient** (everything else): the session backs off and retries.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// The server refused the credential.
    #[error("server rejected credentials: {0}")]
    AuthRejected(String),

    /// The server needs a newer protocol than this session speaks.
    #[error("server requires protocol {minimum} or newer, offered {offered}")]
    VersionMismatch {
        offered: ProtocolVersion,
        minimum: ProtocolVersion,
    },

    /// The descriptor's credential handle could not be resolved.
    #[error("no credential available for {0:?}")]
    Credential(String),

    /// Dialing or the handshake exchange failed at the transport level.
    #[error("network unreachable: {0}")]
    NetworkUnreachable(#[from] TransportError),

    /// Connect plus handshake did not finish in time.
    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered `Hello` with something other than
    /// `Welcome`/`Rejected`.
    #[error("invalid handshake: {0}")]
    InvalidHandshake(String),
}

impl ConnectError {
    /// Returns `true` for errors the session will not retry on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::AuthRejected(_) | Self::VersionMismatch { .. } | Self::Credential(_)
        )
    }
}

/// Errors returned by operations on a [`SessionHandle`](crate::SessionHandle).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The operation needs a live connection and the session has none.
    #[error("session {0} is not connected")]
    NotConnected(ServerIndex),

    /// The session's protocol version lacks the needed capability.
    #[error("session {server} does not support {capability}")]
    Unsupported {
        server: ServerIndex,
        capability: &'static str,
    },

    /// The name hash is not in this session's roster.
    #[error("{name_hash} is not paired through session {server}")]
    UnknownPair {
        server: ServerIndex,
        name_hash: NameHash,
    },

    /// The session task has exited.
    #[error("session {0} is unavailable")]
    Unavailable(ServerIndex),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
