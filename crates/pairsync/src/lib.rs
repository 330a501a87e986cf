//! # PairSync
//!
//! Keeps one client connected to several independent synchronization
//! servers at once, and decides which server may write an entity that
//! more than one of them knows about.
//!
//! - Each registered server gets its own session task with its own
//!   reconnect loop ([`pairsync_session`]).
//! - Entities are correlated across servers by
//!   [`NameHash`](pairsync_protocol::NameHash).
//! - When two servers push state for the same entity, the
//!   [`Arbitrator`](pairsync_authority::Arbitrator) grants render
//!   authority by operator priority. Ties keep the current holder.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pairsync::prelude::*;
//!
//! # async fn run() -> Result<(), PairSyncError> {
//! let config = ClientConfig::load("pairsync.json")?;
//! let ctx = SessionContext::new(
//!     WebSocketConnector,
//!     StaticCredentials::new().with("main", "secret"),
//! );
//!
//! let mut pairs = PairRegistry::from_config(config, ctx)?;
//! pairs.connect_all().await;
//! // ... later
//! for name_hash in pairs.paired_name_hashes() {
//!     println!("{name_hash} via {:?}", pairs.servers_for(&name_hash));
//! }
//! pairs.disconnect_all().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
pub mod logging;
mod orchestrator;

pub use config::ClientConfig;
pub use error::{ConfigError, PairSyncError};
pub use orchestrator::PairRegistry;

pub use pairsync_authority as authority;
pub use pairsync_protocol as protocol;
pub use pairsync_registry as registry;
pub use pairsync_session as session;
pub use pairsync_transport as transport;

/// Everything a typical client needs, in one import.
pub mod prelude {
    pub use crate::{ClientConfig, ConfigError, PairRegistry, PairSyncError};
    pub use pairsync_authority::{Arbitrator, AuthorityLock, Grant};
    pub use pairsync_protocol::{NameHash, Priority, ProtocolVersion, RemoteUid, ServerIndex};
    pub use pairsync_registry::{CredentialRef, DescriptorConfig, ServerDescriptor};
    pub use pairsync_session::{
        ChannelNotifier, ConnectError, CredentialStore, Notifier, Pair, RenderError,
        RenderPipeline, Roster, SessionConfig, SessionContext, SessionError, SessionHandle,
        SessionState, SessionStatus, StaticCredentials, StatusEvent,
    };
    pub use pairsync_transport::{MemoryConnector, WebSocketConnector};
}
