//! Per-server sessions for PairSync.
//!
//! A session is the client's live relationship with ONE synchronization
//! server:
//!
//! 1. **Lifecycle**: dialing, handshaking and reconnecting with backoff
//!    ([`SessionState`], [`SessionConfig`])
//! 2. **Roster**: which entities that server reports as paired
//!    ([`Roster`], [`Pair`])
//! 3. **Pushes**: rendering server state once the [`Arbitrator`]
//!    grants authority, and sending local state back
//!
//! Each session runs as its own Tokio task and never observes another
//! session's traffic.
//!
//! # How it fits in the stack
//!
//! ```text
//! Orchestrator (above)  ← spawns one session per registered server
//!     ↕
//! Session Layer (this crate)  ← connection state, roster, authority checks
//!     ↕
//! Transport + Protocol (below)  ← frames and messages
//! ```
//!
//! [`Arbitrator`]: pairsync_authority::Arbitrator

mod actor;
mod auth;
mod backoff;
mod error;
mod pipeline;
mod roster;
mod session;

pub use actor::{SessionContext, SessionHandle, spawn_session};
pub use auth::{CredentialStore, StaticCredentials};
pub use error::{ConnectError, SessionError};
pub use pipeline::{
    ChannelNotifier, DiscardPipeline, Notifier, NullNotifier, RenderError, RenderPipeline,
    StatusEvent, TracingNotifier,
};
pub use roster::{Pair, Roster};
pub use session::{BackoffConfig, SessionConfig, SessionState, SessionStatus};
