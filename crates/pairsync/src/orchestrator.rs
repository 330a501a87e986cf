//! The pair registry: one owned object tying servers, sessions and
//! authority together.
//!
//! [`PairRegistry`] owns the [`ServerRegistry`] and the table of live
//! sessions. It drives bulk connect and disconnect, and merges every
//! session's roster into the views presentation layers need.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use futures_util::future::join_all;
use pairsync_authority::Arbitrator;
use pairsync_protocol::{NameHash, Priority, ServerIndex};
use pairsync_registry::{DescriptorConfig, RegistryError, ServerDescriptor, ServerRegistry};
use pairsync_session::{
    CredentialStore, Pair, SessionContext, SessionError, SessionHandle, SessionStatus,
    spawn_session,
};
use pairsync_transport::Connector;

use crate::{ClientConfig, PairSyncError};

/// Registered servers plus the session running for each connected one.
///
/// Sessions are created on [`connect`](Self::connect) and destroyed on
/// [`disconnect`](Self::disconnect), removal or disabling. Every session
/// shares the context's [`Arbitrator`].
pub struct PairRegistry<K, A> {
    registry: ServerRegistry,
    sessions: BTreeMap<ServerIndex, SessionHandle>,
    ctx: SessionContext<K, A>,
}

impl<K: Connector, A: CredentialStore> PairRegistry<K, A> {
    /// Creates an empty registry whose sessions use `ctx`.
    pub fn new(ctx: SessionContext<K, A>) -> Self {
        Self {
            registry: ServerRegistry::new(),
            sessions: BTreeMap::new(),
            ctx,
        }
    }

    /// Builds a registry from a loaded config.
    ///
    /// The config's session timings replace the ones in `ctx`. Servers
    /// are registered in file order; nothing connects yet.
    ///
    /// # Errors
    /// [`RegistryError::InvalidDescriptor`] for the first bad server entry.
    pub fn from_config(
        config: ClientConfig,
        ctx: SessionContext<K, A>,
    ) -> Result<Self, PairSyncError> {
        let ctx = ctx.with_config(config.session);
        Ok(Self {
            registry: ServerRegistry::from_configs(config.servers)?,
            sessions: BTreeMap::new(),
            ctx,
        })
    }

    // -----------------------------------------------------------------
    // Registry edits
    // -----------------------------------------------------------------

    /// Registers a server. It stays disconnected until connected.
    pub fn add_server(&mut self, config: DescriptorConfig) -> Result<ServerIndex, PairSyncError> {
        Ok(self.registry.add(config)?)
    }

    /// Stops the server's session (if any) and tombstones its index.
    pub async fn remove_server(
        &mut self,
        index: ServerIndex,
    ) -> Result<ServerDescriptor, PairSyncError> {
        self.registry.get(index)?;
        self.disconnect(index).await?;
        Ok(self.registry.remove(index)?)
    }

    /// Changes a server's priority and returns the previous one.
    ///
    /// The running session uses the new value for future authority
    /// requests. Locks it already holds are not re-arbitrated.
    pub async fn set_priority(
        &mut self,
        index: ServerIndex,
        priority: Priority,
    ) -> Result<Priority, PairSyncError> {
        let previous = self.registry.set_priority(index, priority)?;
        if let Some(session) = self.live_session(index) {
            session.set_priority(priority).await?;
        }
        Ok(previous)
    }

    /// Enables or disables a server.
    ///
    /// Disabling cancels any in-flight connect and tears the session
    /// down, releasing its authority locks.
    pub async fn set_enabled(
        &mut self,
        index: ServerIndex,
        enabled: bool,
    ) -> Result<(), PairSyncError> {
        self.registry.set_enabled(index, enabled)?;
        if !enabled {
            self.disconnect(index).await?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Connect / disconnect
    // -----------------------------------------------------------------

    /// Starts (or renews) the connection to one server.
    ///
    /// Returns as soon as the session has the request; it connects in
    /// the background. Watch the returned handle for progress.
    pub async fn connect(&mut self, index: ServerIndex) -> Result<SessionHandle, PairSyncError> {
        let session = self.ensure_session(index)?;
        session.connect().await?;
        Ok(session)
    }

    /// Asks every enabled server to connect, all at once.
    ///
    /// A slow or unreachable server never delays the others: each
    /// session dials on its own task. Returns the indices asked.
    pub async fn connect_all(&mut self) -> Vec<ServerIndex> {
        let indices: Vec<ServerIndex> = self.registry.enabled().map(|d| d.index).collect();

        let mut sessions = Vec::with_capacity(indices.len());
        for index in indices {
            match self.ensure_session(index) {
                Ok(session) => sessions.push(session),
                Err(e) => tracing::warn!(server = %index, error = %e, "cannot start session"),
            }
        }

        let results = join_all(sessions.iter().map(|session| session.connect())).await;

        let mut asked = Vec::with_capacity(sessions.len());
        for (session, result) in sessions.iter().zip(results) {
            match result {
                Ok(()) => asked.push(session.index()),
                Err(e) => tracing::warn!(server = %session.index(), error = %e, "connect failed"),
            }
        }
        tracing::info!(servers = asked.len(), "connecting to all enabled servers");
        asked
    }

    /// Stops one server's session and waits for it to release its locks.
    ///
    /// Does nothing if the server has no session.
    pub async fn disconnect(&mut self, index: ServerIndex) -> Result<(), PairSyncError> {
        let Some(session) = self.sessions.remove(&index) else {
            return Ok(());
        };
        match session.shutdown().await {
            Ok(()) => Ok(()),
            // Already gone; nothing left to release.
            Err(SessionError::Unavailable(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Stops every session concurrently. Best effort: failures are
    /// logged, not retried.
    pub async fn disconnect_all(&mut self) {
        let sessions: Vec<SessionHandle> =
            std::mem::take(&mut self.sessions).into_values().collect();
        let results = join_all(sessions.iter().map(|session| session.shutdown())).await;

        for (session, result) in sessions.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(server = %session.index(), error = %e, "disconnect failed");
            }
        }
        tracing::info!(servers = sessions.len(), "disconnected from all servers");
    }

    // -----------------------------------------------------------------
    // Pushes
    // -----------------------------------------------------------------

    /// Sends local state for `name_hash` through one server only.
    ///
    /// # Errors
    /// [`PairSyncError::Session`] with `NotConnected`, `Unsupported` or
    /// `UnknownPair`; [`PairSyncError::Registry`] for an unknown index.
    pub async fn push(
        &self,
        index: ServerIndex,
        name_hash: NameHash,
        payload: Vec<u8>,
    ) -> Result<(), PairSyncError> {
        self.registry.get(index)?;
        let session = self
            .live_session(index)
            .ok_or(SessionError::NotConnected(index))?;
        Ok(session.push(name_hash, payload).await?)
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// Every registered server, in index order.
    pub fn servers(&self) -> Vec<ServerDescriptor> {
        self.registry.list()
    }

    pub fn server(&self, index: ServerIndex) -> Result<&ServerDescriptor, RegistryError> {
        self.registry.get(index)
    }

    /// The running session for `index`, if any.
    pub fn session(&self, index: ServerIndex) -> Option<&SessionHandle> {
        self.sessions.get(&index)
    }

    /// Status of a server's session. Servers without one report
    /// `Disconnected` with no error.
    pub fn status(&self, index: ServerIndex) -> Result<SessionStatus, RegistryError> {
        self.registry.get(index)?;
        Ok(self
            .sessions
            .get(&index)
            .map(SessionHandle::status)
            .unwrap_or_default())
    }

    /// Every pair known through any session, ordered by server then UID.
    ///
    /// An entity seen through two servers appears twice.
    pub fn pairs(&self) -> Vec<Pair> {
        self.sessions
            .values()
            .flat_map(SessionHandle::pairs)
            .collect()
    }

    /// Pairs known through one server.
    pub fn pairs_via(&self, index: ServerIndex) -> Vec<Pair> {
        self.sessions
            .get(&index)
            .map(SessionHandle::pairs)
            .unwrap_or_default()
    }

    /// Distinct name hashes visible through any session, sorted.
    pub fn paired_name_hashes(&self) -> BTreeSet<NameHash> {
        self.sessions
            .values()
            .flat_map(|session| session.roster().name_hashes())
            .collect()
    }

    /// Servers whose roster currently contains `name_hash`.
    pub fn servers_for(&self, name_hash: &NameHash) -> Vec<ServerIndex> {
        self.sessions
            .values()
            .filter(|session| session.roster().contains(name_hash))
            .map(SessionHandle::index)
            .collect()
    }

    /// The session currently holding render authority for `name_hash`.
    pub fn authority_holder(&self, name_hash: &NameHash) -> Option<ServerIndex> {
        self.ctx.arbitrator().holder(name_hash).map(|lock| lock.holder)
    }

    /// The arbitrator shared by every session.
    pub fn arbitrator(&self) -> &Arc<Arbitrator> {
        self.ctx.arbitrator()
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    /// The session for `index`, spawning one if missing or exited.
    fn ensure_session(&mut self, index: ServerIndex) -> Result<SessionHandle, PairSyncError> {
        let descriptor = self.registry.get(index)?;
        if !descriptor.enabled {
            return Err(PairSyncError::Disabled(index));
        }

        if let Some(session) = self.live_session(index) {
            return Ok(session.clone());
        }

        let session = spawn_session(descriptor.clone(), self.ctx.clone());
        self.sessions.insert(index, session.clone());
        Ok(session)
    }

    fn live_session(&self, index: ServerIndex) -> Option<&SessionHandle> {
        self.sessions
            .get(&index)
            .filter(|session| !session.is_closed())
    }
}

impl<K, A> std::fmt::Debug for PairRegistry<K, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairRegistry")
            .field("registry", &self.registry)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}
