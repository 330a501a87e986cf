//! Core types shared by every PairSync layer.
//!
//! The identity newtypes keep the different "numbers and strings" of the
//! system apart: a [`ServerIndex`] is never confused with a
//! [`Priority`], and a server's [`RemoteUid`] is never used where the
//! client-local [`NameHash`] belongs.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Stable index of a registered server.
///
/// Assigned in registration order and never reused, so it doubles as the
/// identity of the session that talks to that server.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ServerIndex(pub u32);

impl fmt::Display for ServerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// Operator-configured rank used to settle authority contention.
///
/// Higher wins. Equal priorities never displace an incumbent holder.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct Priority(pub i32);

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable, client-local identifier of a physical remote entity.
///
/// Two servers may know the same entity under different [`RemoteUid`]s;
/// the name hash is what correlates them.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NameHash(String);

impl NameHash {
    /// Wraps a precomputed hash string.
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Returns the hash as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NameHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier a single server uses for a remote entity.
///
/// Only meaningful within the session that received it.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RemoteUid(String);

impl RemoteUid {
    /// Wraps a server-issued UID.
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    /// Returns the UID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session protocol version offered in the handshake.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProtocolVersion(pub u32);

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Session messages
// ---------------------------------------------------------------------------

/// One entity a server reports as paired.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RosterEntry {
    /// The server's UID for the entity.
    pub uid: RemoteUid,
    /// The client-local correlation key.
    pub name_hash: NameHash,
}

/// Why a server refused the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RejectReason {
    /// The credential was not accepted.
    Unauthorized { message: String },

    /// The offered protocol version is below what the server supports.
    VersionTooOld { minimum: ProtocolVersion },
}

/// Messages the client sends to a server.
///
/// Internally tagged, so `Hello` looks like
/// `{ "type": "Hello", "version": 2, "token": "..." }` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// First frame of every connection.
    Hello {
        version: ProtocolVersion,
        token: String,
    },

    /// Local state for one paired entity. The payload is opaque here.
    Push { uid: RemoteUid, payload: Vec<u8> },

    /// Sent before the client closes the connection on purpose.
    Goodbye { reason: String },
}

/// Messages a server sends to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Handshake accepted. `session_uid` is the client's own UID there.
    Welcome { session_uid: RemoteUid },

    /// Handshake refused; the server closes afterwards.
    Rejected { reason: RejectReason },

    /// Replaces the whole roster.
    RosterSnapshot { entries: Vec<RosterEntry> },

    /// One entity became paired.
    RosterAdded { entry: RosterEntry },

    /// One entity is no longer paired.
    RosterRemoved { uid: RemoteUid },

    /// Remote state for one entity, to be rendered locally.
    Push {
        uid: RemoteUid,
        name_hash: NameHash,
        payload: Vec<u8>,
    },
}

// =========================================================================
// Tests
// =========================================================================
