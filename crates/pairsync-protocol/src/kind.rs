//! Protocol versions the client can speak and what each one allows.
//!
//! A session is built for exactly one [`SessionKind`]. Instead of a
//! session type per version, behavior differences are looked up in
//! [`SESSION_KINDS`] through the kind's [`Capabilities`].

use crate::ProtocolVersion;

/// Optional features of a protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Server may send `RosterAdded`/`RosterRemoved` between snapshots.
    pub roster_deltas: bool,
    /// Client may send `Push` frames to the server.
    pub push_state: bool,
}

/// A protocol version together with its capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionKind {
    pub version: ProtocolVersion,
    pub capabilities: Capabilities,
}

/// Every version this client implements, oldest first.
pub const SESSION_KINDS: &[SessionKind] = &[
    SessionKind {
        version: ProtocolVersion(1),
        capabilities: Capabilities {
            roster_deltas: false,
            push_state: false,
        },
    },
    SessionKind {
        version: ProtocolVersion(2),
        capabilities: Capabilities {
            roster_deltas: true,
            push_state: true,
        },
    },
];

impl SessionKind {
    /// Looks up the kind for a specific version.
    pub fn for_version(version: ProtocolVersion) -> Option<&'static SessionKind> {
        SESSION_KINDS.iter().find(|kind| kind.version == version)
    }

    /// The newest version, used when a server does not pin one.
    pub fn latest() -> &'static SessionKind {
        // The table is a non-empty constant.
        &SESSION_KINDS[SESSION_KINDS.len() - 1]
    }
}
