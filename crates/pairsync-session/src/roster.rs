//! Roster snapshots: which entities a server currently reports as paired.

use std::collections::{BTreeMap, BTreeSet};

use pairsync_protocol::{NameHash, RemoteUid, RosterEntry, ServerIndex};

/// A remote entity as known through one particular session.
///
/// The same physical entity seen through two servers yields two `Pair`s
/// with different `server` (and usually different `uid`) but the same
/// `name_hash`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pair {
    pub server: ServerIndex,
    pub uid: RemoteUid,
    pub name_hash: NameHash,
}

/// Immutable view of one session's roster.
///
/// Updates never mutate a published roster; they build a new one
/// ([`with_added`](Self::with_added), [`with_removed`](Self::with_removed))
/// which the session then publishes as a fresh `Arc<Roster>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    entries: BTreeMap<RemoteUid, NameHash>,
}

impl Roster {
    /// An empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a roster from a full snapshot. Later duplicates of a UID win.
    pub fn from_entries(entries: impl IntoIterator<Item = RosterEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| (e.uid, e.name_hash))
                .collect(),
        }
    }

    /// A copy of this roster with `entry` added (or its UID re-pointed).
    pub fn with_added(&self, entry: RosterEntry) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(entry.uid, entry.name_hash);
        Self { entries }
    }

    /// A copy of this roster without `uid`, plus the name hash it had.
    pub fn with_removed(&self, uid: &RemoteUid) -> (Self, Option<NameHash>) {
        let mut entries = self.entries.clone();
        let removed = entries.remove(uid);
        (Self { entries }, removed)
    }

    /// Returns `true` if any UID in this roster maps to `name_hash`.
    pub fn contains(&self, name_hash: &NameHash) -> bool {
        self.entries.values().any(|h| h == name_hash)
    }

    /// The UID this server uses for `name_hash`, if paired.
    pub fn uid_for(&self, name_hash: &NameHash) -> Option<&RemoteUid> {
        self.entries
            .iter()
            .find_map(|(uid, h)| (h == name_hash).then_some(uid))
    }

    /// The name hash this server's `uid` is paired with.
    pub fn name_hash_for(&self, uid: &RemoteUid) -> Option<&NameHash> {
        self.entries.get(uid)
    }

    /// Distinct name hashes in this roster.
    pub fn name_hashes(&self) -> BTreeSet<NameHash> {
        self.entries.values().cloned().collect()
    }

    /// This roster as `Pair` records for `server`, ordered by UID.
    pub fn pairs(&self, server: ServerIndex) -> Vec<Pair> {
        self.entries
            .iter()
            .map(|(uid, name_hash)| Pair {
                server,
                uid: uid.clone(),
                name_hash: name_hash.clone(),
            })
            .collect()
    }

    /// Iterates `(uid, name_hash)` in UID order.
    pub fn iter(&self) -> impl Iterator<Item = (&RemoteUid, &NameHash)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
