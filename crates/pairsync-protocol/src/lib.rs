//! Shared vocabulary for PairSync.
//!
//! - **Identity types** ([`ServerIndex`], [`NameHash`], [`RemoteUid`],
//!   [`Priority`], [`ProtocolVersion`]) used by every layer.
//! - **Session messages** ([`ClientMessage`], [`ServerMessage`]) exchanged
//!   with one synchronization server.
//! - **Session kinds** ([`SessionKind`], [`SESSION_KINDS`]) describing
//!   what each protocol version can do.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) turning those messages
//!   into frames and back.
//!
//! ```text
//! Transport (frames) → Protocol (messages) → Session (roster, pushes)
//! ```

mod codec;
mod error;
mod kind;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use kind::{Capabilities, SESSION_KINDS, SessionKind};
pub use types::{
    ClientMessage, NameHash, Priority, ProtocolVersion, RejectReason,
    RemoteUid, RosterEntry, ServerIndex, ServerMessage,
};
