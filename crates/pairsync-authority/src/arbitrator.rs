//! The authority table and its three operations.
//!
//! # Concurrency note
//!
//! The whole table sits behind one `std::sync::Mutex`. Every operation is
//! a single lookup-compare-write with no I/O and no `.await`, so the
//! critical section is tiny and a blocking mutex is the right tool even
//! inside async session tasks.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use pairsync_protocol::{NameHash, Priority, ServerIndex};

/// Who may currently write one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorityLock {
    /// Index of the session holding authority.
    pub holder: ServerIndex,
    /// The holder's priority at the time it was granted.
    pub priority: Priority,
}

/// Outcome of [`Arbitrator::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// No lock existed; the requester now holds a fresh one.
    Created,
    /// The requester already held the lock.
    Renewed,
    /// The requester out-ranked the holder and took the lock over.
    Transferred { from: ServerIndex },
    /// The holder ranks equal or higher and keeps the lock.
    Denied { holder: ServerIndex },
}

impl Grant {
    /// Returns `true` unless the request was denied.
    pub fn is_granted(&self) -> bool {
        !matches!(self, Self::Denied { .. })
    }
}

/// Process-wide table of authority locks, keyed by name hash.
///
/// Shared between sessions as `Arc<Arbitrator>`.
///
/// ## Lifecycle of a lock
///
/// ```text
/// request() ──→ [held by A] ──request() by higher──→ [held by B]
///                    │                                    │
///                    ▼ release() by A                     ▼ release() by B
///                 (gone)                               (gone)
/// ```
///
/// Locks are never created speculatively and never expire. A lock left
/// behind by a session that vanished without releasing stays until a
/// higher-priority session claims it or its holder index releases it.
#[derive(Debug, Default)]
pub struct Arbitrator {
    locks: Mutex<HashMap<NameHash, AuthorityLock>>,
}

impl Arbitrator {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests write authority for `name_hash` and reports what happened.
    ///
    /// Ties favor the incumbent. A transfer does not notify the previous
    /// holder; it will find out the next time it asks.
    pub fn request(
        &self,
        name_hash: &NameHash,
        session: ServerIndex,
        priority: Priority,
    ) -> Grant {
        let mut locks = self.table();

        let grant = match locks.get_mut(name_hash) {
            None => {
                locks.insert(
                    name_hash.clone(),
                    AuthorityLock {
                        holder: session,
                        priority,
                    },
                );
                Grant::Created
            }
            Some(lock) if lock.holder == session => Grant::Renewed,
            Some(lock) if lock.priority < priority => {
                let from = lock.holder;
                *lock = AuthorityLock {
                    holder: session,
                    priority,
                };
                Grant::Transferred { from }
            }
            Some(lock) => Grant::Denied {
                holder: lock.holder,
            },
        };
        drop(locks);

        match grant {
            Grant::Created => {
                tracing::debug!(%name_hash, %session, %priority, "authority granted")
            }
            Grant::Renewed => {}
            Grant::Transferred { from } => tracing::info!(
                %name_hash,
                %session,
                %from,
                %priority,
                "authority transferred"
            ),
            Grant::Denied { holder } => tracing::debug!(
                %name_hash,
                %session,
                %holder,
                "authority denied"
            ),
        }
        grant
    }

    /// Requests authority and returns the index that holds it afterwards.
    ///
    /// Equal to `session` when granted, the incumbent otherwise.
    pub fn request_authority(
        &self,
        name_hash: &NameHash,
        session: ServerIndex,
        priority: Priority,
    ) -> ServerIndex {
        match self.request(name_hash, session, priority) {
            Grant::Denied { holder } => holder,
            _ => session,
        }
    }

    /// Returns `true` if `session` may write `name_hash` right now.
    ///
    /// Fail-open: with no lock yet, every session may write.
    pub fn has_authority(&self, name_hash: &NameHash, session: ServerIndex) -> bool {
        self.table()
            .get(name_hash)
            .is_none_or(|lock| lock.holder == session)
    }

    /// Removes the lock only if `session` holds it.
    ///
    /// Returns `false` when another session holds it or no lock exists.
    pub fn release_authority(&self, name_hash: &NameHash, session: ServerIndex) -> bool {
        let mut locks = self.table();
        let held = locks
            .get(name_hash)
            .is_some_and(|lock| lock.holder == session);
        if held {
            locks.remove(name_hash);
            tracing::debug!(%name_hash, %session, "authority released");
        }
        held
    }

    /// Releases every lock `session` holds. Used on session teardown.
    ///
    /// Returns the released name hashes, sorted.
    pub fn release_all(&self, session: ServerIndex) -> Vec<NameHash> {
        let mut released = Vec::new();
        self.table().retain(|name_hash, lock| {
            if lock.holder == session {
                released.push(name_hash.clone());
                false
            } else {
                true
            }
        });
        released.sort();
        if !released.is_empty() {
            tracing::debug!(%session, count = released.len(), "released all authority");
        }
        released
    }

    /// Current lock for `name_hash`, if any.
    pub fn holder(&self, name_hash: &NameHash) -> Option<AuthorityLock> {
        self.table().get(name_hash).copied()
    }

    /// Copy of the whole table.
    pub fn snapshot(&self) -> HashMap<NameHash, AuthorityLock> {
        self.table().clone()
    }

    /// Number of live locks.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    /// Returns `true` if no locks exist.
    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    /// Enters the critical section.
    ///
    /// A poisoned mutex means some thread panicked mid-operation. Every
    /// operation writes the map in one step, so the recovered table is
    /// still consistent; log loudly and carry on.
    fn table(&self) -> MutexGuard<'_, HashMap<NameHash, AuthorityLock>> {
        self.locks.lock().unwrap_or_else(|poisoned| {
            tracing::error!("authority table lock poisoned; continuing with recovered table");
            poisoned.into_inner()
        })
    }
}
