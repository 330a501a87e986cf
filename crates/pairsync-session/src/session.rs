//! Session configuration and lifecycle state.
//!
//! A "session" is the client's live relationship with ONE synchronization
//! server. It tracks:
//! - WHAT state the connection is in ([`SessionState`])
//! - WHY it last failed to connect, if it did ([`SessionStatus`])
//! - HOW long handshakes and retries may take ([`SessionConfig`])

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConnectError;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Timing knobs shared by every session.
///
/// Deserializes with `#[serde(default)]`, so a config file only needs to
/// mention the fields it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Upper bound (ms) for dialing, sending `Hello` and receiving the
    /// server's answer. Steady-state traffic has no timeout.
    pub handshake_timeout_ms: u64,

    /// Delay schedule between failed connect attempts.
    pub backoff: BackoffConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: 10_000,
            backoff: BackoffConfig::default(),
        }
    }
}

/// Shortest handshake timeout a session accepts.
const MIN_HANDSHAKE_TIMEOUT_MS: u64 = 10;

impl SessionConfig {
    /// Clamps out-of-range values so sessions can make progress.
    ///
    /// - `handshake_timeout_ms` is at least 10.
    /// - `backoff` goes through [`BackoffConfig::validated`].
    pub fn validated(mut self) -> Self {
        if self.handshake_timeout_ms < MIN_HANDSHAKE_TIMEOUT_MS {
            tracing::warn!(
                handshake_timeout_ms = self.handshake_timeout_ms,
                min = MIN_HANDSHAKE_TIMEOUT_MS,
                "handshake timeout too short, clamping"
            );
            self.handshake_timeout_ms = MIN_HANDSHAKE_TIMEOUT_MS;
        }
        self.backoff = self.backoff.validated();
        self
    }

    /// The handshake timeout as a `Duration`.
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

/// Exponential backoff with random jitter.
///
/// The n-th retry waits `min(initial_ms * 2^n, max_ms)` plus up to
/// `jitter_ms` of random delay so sessions that failed together don't
/// retry in lockstep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub initial_ms: u64,
    pub max_ms: u64,
    pub jitter_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: 1_000,
            max_ms: 30_000,
            jitter_ms: 500,
        }
    }
}

impl BackoffConfig {
    /// Clamps out-of-range values so the schedule is usable.
    ///
    /// - `initial_ms` is at least 1.
    /// - `max_ms` is at least `initial_ms`.
    pub fn validated(mut self) -> Self {
        if self.initial_ms == 0 {
            tracing::warn!("backoff initial_ms is 0, using 1");
            self.initial_ms = 1;
        }
        if self.max_ms < self.initial_ms {
            tracing::warn!(
                max_ms = self.max_ms,
                initial_ms = self.initial_ms,
                "backoff max_ms below initial_ms, clamping"
            );
            self.max_ms = self.initial_ms;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where a session is in its connection lifecycle.
///
/// ```text
///                 ┌───────────── renewed attempt ─────────────┐
///                 ▼                                           │
/// Disconnected → Connecting ──ok──→ Connected ──fault──→ Reconnecting
///                 │                     ▲                     │
///                 └──transient error──→ │ ←────────ok─────────┘
///                                  Reconnecting (backoff + retry)
///
/// any state ──stop──→ Disposing ──→ Disconnected
/// ```
///
/// Terminal connect errors (rejected credentials, version mismatch) halt
/// the session in `Disconnected` with the error recorded in
/// [`SessionStatus::last_error`]; it does not retry on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Disposing,
}

impl SessionState {
    /// Returns `true` if the session can exchange messages right now.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Reconnecting => "Reconnecting",
            Self::Disposing => "Disposing",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Observable status of a session: its state plus the last connect error.
///
/// `last_error` is cleared once the session reaches `Connected`.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub state: SessionState,
    pub last_error: Option<Arc<ConnectError>>,
}

impl Default for SessionStatus {
    /// A session that has never tried to connect.
    fn default() -> Self {
        Self::new(SessionState::Disconnected)
    }
}

impl SessionStatus {
    pub(crate) fn new(state: SessionState) -> Self {
        Self {
            state,
            last_error: None,
        }
    }

    /// Returns `true` if the session stopped on an error it won't retry.
    pub fn is_halted(&self) -> bool {
        self.state == SessionState::Disconnected
            && self.last_error.as_ref().is_some_and(|e| e.is_terminal())
    }
}
