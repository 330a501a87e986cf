//! Session actor: one Tokio task per registered server.
//!
//! The task owns the connection, the roster and the retry schedule for
//! its server. Nothing else touches them; callers talk to it through a
//! [`SessionHandle`] (commands over an mpsc channel) and observe it
//! through `watch` channels (status and roster snapshots). The only
//! state a session shares with its siblings is the [`Arbitrator`].

use std::pin::pin;
use std::sync::Arc;

use pairsync_authority::{Arbitrator, Grant};
use pairsync_protocol::{
    ClientMessage, Codec, JsonCodec, NameHash, Priority, RejectReason, RemoteUid, ServerIndex,
    ServerMessage, SessionKind,
};
use pairsync_registry::ServerDescriptor;
use pairsync_transport::{Connection, Connector, TransportError};
use tokio::sync::{mpsc, oneshot, watch};

use crate::backoff::Backoff;
use crate::{
    ConnectError, CredentialStore, DiscardPipeline, Notifier, Pair, RenderPipeline, Roster,
    SessionConfig, SessionError, SessionState, SessionStatus, StatusEvent, TracingNotifier,
};

/// Pending commands a session buffers before callers wait.
const COMMAND_CHANNEL_SIZE: usize = 32;

/// Commands sent to a session actor through its channel.
pub(crate) enum SessionCommand {
    /// Start connecting. Renews the attempt when halted or backing off.
    Connect,

    /// Use a new priority for future authority requests.
    SetPriority(Priority),

    /// Send local state for one paired entity to this server.
    Push {
        name_hash: NameHash,
        payload: Vec<u8>,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Close the connection, release authority and stop the task.
    Shutdown { reply: oneshot::Sender<()> },
}

// ---------------------------------------------------------------------------
// SessionContext
// ---------------------------------------------------------------------------

/// Everything a session needs besides its descriptor.
///
/// One context is usually shared by all sessions of a client: same
/// connector, same credential store, and above all the same
/// [`Arbitrator`].
pub struct SessionContext<K, A> {
    connector: Arc<K>,
    credentials: Arc<A>,
    arbitrator: Arc<Arbitrator>,
    pipeline: Arc<dyn RenderPipeline>,
    notifier: Arc<dyn Notifier>,
    config: SessionConfig,
}

impl<K, A> Clone for SessionContext<K, A> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            credentials: Arc::clone(&self.credentials),
            arbitrator: Arc::clone(&self.arbitrator),
            pipeline: Arc::clone(&self.pipeline),
            notifier: Arc::clone(&self.notifier),
            config: self.config.clone(),
        }
    }
}

impl<K: Connector, A: CredentialStore> SessionContext<K, A> {
    /// Creates a context with a fresh arbitrator, a discarding pipeline,
    /// a tracing notifier and default timings.
    pub fn new(connector: K, credentials: A) -> Self {
        Self {
            connector: Arc::new(connector),
            credentials: Arc::new(credentials),
            arbitrator: Arc::new(Arbitrator::new()),
            pipeline: Arc::new(DiscardPipeline),
            notifier: Arc::new(TracingNotifier),
            config: SessionConfig::default(),
        }
    }

    /// Shares an existing arbitrator.
    pub fn with_arbitrator(mut self, arbitrator: Arc<Arbitrator>) -> Self {
        self.arbitrator = arbitrator;
        self
    }

    pub fn with_pipeline(mut self, pipeline: impl RenderPipeline) -> Self {
        self.pipeline = Arc::new(pipeline);
        self
    }

    pub fn with_notifier(mut self, notifier: impl Notifier) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    /// Replaces the session timings. Out-of-range values are clamped.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config.validated();
        self
    }

    pub fn arbitrator(&self) -> &Arc<Arbitrator> {
        &self.arbitrator
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Handle to a running session actor.
///
/// Cheap to clone. Reads (state, roster) come straight from the watch
/// channels and never wait on the task.
#[derive(Clone)]
pub struct SessionHandle {
    index: ServerIndex,
    kind: &'static SessionKind,
    sender: mpsc::Sender<SessionCommand>,
    status: watch::Receiver<SessionStatus>,
    roster: watch::Receiver<Arc<Roster>>,
}

impl SessionHandle {
    /// Index of the server this session talks to.
    pub fn index(&self) -> ServerIndex {
        self.index
    }

    /// Protocol version and capabilities fixed at spawn time.
    pub fn kind(&self) -> &'static SessionKind {
        self.kind
    }

    pub fn state(&self) -> SessionState {
        self.status.borrow().state
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Current roster snapshot. Never blocks on the session.
    pub fn roster(&self) -> Arc<Roster> {
        Arc::clone(&self.roster.borrow())
    }

    /// The roster as `Pair` records for this server.
    pub fn pairs(&self) -> Vec<Pair> {
        self.roster().pairs(self.index)
    }

    /// Asks the session to connect. Returns once the command is queued.
    pub async fn connect(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Connect).await
    }

    /// Changes the priority used for future authority requests.
    ///
    /// Locks already held keep the priority they were granted at.
    pub async fn set_priority(&self, priority: Priority) -> Result<(), SessionError> {
        self.send(SessionCommand::SetPriority(priority)).await
    }

    /// Sends local state for `name_hash` to this server.
    ///
    /// # Errors
    /// - [`SessionError::Unsupported`] if the protocol version can't push
    /// - [`SessionError::NotConnected`] if there is no live connection
    /// - [`SessionError::UnknownPair`] if the roster lacks `name_hash`
    pub async fn push(&self, name_hash: NameHash, payload: Vec<u8>) -> Result<(), SessionError> {
        if !self.kind.capabilities.push_state {
            return Err(SessionError::Unsupported {
                server: self.index,
                capability: "push_state",
            });
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::Push {
            name_hash,
            payload,
            reply: reply_tx,
        })
        .await?;
        reply_rx
            .await
            .map_err(|_| SessionError::Unavailable(self.index))?
    }

    /// Stops the session and waits until it has released its authority
    /// locks and published an empty roster.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::Shutdown { reply: reply_tx })
            .await?;
        reply_rx
            .await
            .map_err(|_| SessionError::Unavailable(self.index))
    }

    /// Waits until the session reaches `state`.
    pub async fn wait_for_state(&self, state: SessionState) -> Result<SessionStatus, SessionError> {
        self.wait_for_status(|status| status.state == state).await
    }

    /// Waits until `predicate` holds for the session status.
    pub async fn wait_for_status(
        &self,
        predicate: impl FnMut(&SessionStatus) -> bool,
    ) -> Result<SessionStatus, SessionError> {
        let mut rx = self.status.clone();
        let status = rx
            .wait_for(predicate)
            .await
            .map_err(|_| SessionError::Unavailable(self.index))?;
        Ok(status.clone())
    }

    /// Waits until `predicate` holds for the roster.
    pub async fn wait_for_roster(
        &self,
        mut predicate: impl FnMut(&Roster) -> bool,
    ) -> Result<Arc<Roster>, SessionError> {
        let mut rx = self.roster.clone();
        let roster = rx
            .wait_for(|roster| predicate(roster))
            .await
            .map_err(|_| SessionError::Unavailable(self.index))?;
        Ok(Arc::clone(&roster))
    }

    /// A receiver that sees every status change.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// A receiver that sees every roster snapshot.
    pub fn subscribe_roster(&self) -> watch::Receiver<Arc<Roster>> {
        self.roster.clone()
    }

    /// Returns `true` once the session task has exited.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| SessionError::Unavailable(self.index))
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("index", &self.index)
            .field("version", &self.kind.version)
            .field("state", &self.state())
            .finish()
    }
}

/// Spawns a session actor for `descriptor` and returns its handle.
///
/// The session starts `Disconnected`; call [`SessionHandle::connect`].
pub fn spawn_session<K: Connector, A: CredentialStore>(
    descriptor: ServerDescriptor,
    ctx: SessionContext<K, A>,
) -> SessionHandle {
    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
    let (status_tx, status_rx) = watch::channel(SessionStatus::new(SessionState::Disconnected));
    let (roster_tx, roster_rx) = watch::channel(Arc::new(Roster::new()));

    let handle = SessionHandle {
        index: descriptor.index,
        kind: descriptor.kind,
        sender: tx,
        status: status_rx,
        roster: roster_rx,
    };

    let actor = SessionActor {
        priority: descriptor.priority,
        backoff: Backoff::new(ctx.config.backoff.clone()),
        link: Link {
            descriptor,
            ctx,
            codec: JsonCodec,
        },
        commands: rx,
        status: status_tx,
        roster: roster_tx,
    };

    tokio::spawn(actor.run());

    handle
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// What the actor does next.
enum Step {
    /// Wait for a connect command.
    Idle,
    /// Dial and handshake, publishing the given state meanwhile.
    Connect(SessionState),
    /// Back off, then reconnect.
    Retry,
    /// Tear down and exit.
    Stop(Option<oneshot::Sender<()>>),
}

/// Lifecycle commands that interrupt whatever the actor is waiting on.
enum Control {
    Connect,
    Stop(Option<oneshot::Sender<()>>),
}

/// The parts of the actor that stay fixed for its whole life.
///
/// Kept apart from the mutable fields so a pinned handshake future can
/// borrow it while the command channel is still being polled.
struct Link<K, A> {
    descriptor: ServerDescriptor,
    ctx: SessionContext<K, A>,
    codec: JsonCodec,
}

impl<K: Connector, A: CredentialStore> Link<K, A> {
    fn index(&self) -> ServerIndex {
        self.descriptor.index
    }

    fn notify(&self, event: StatusEvent) {
        self.ctx.notifier.notify(event);
    }

    /// Dials the server and runs the `Hello` exchange within the
    /// handshake timeout.
    async fn handshake(&self) -> Result<K::Connection, ConnectError> {
        let limit = self.ctx.config.handshake_timeout();
        tokio::time::timeout(limit, self.open())
            .await
            .map_err(|_| ConnectError::Timeout(limit))?
    }

    async fn open(&self) -> Result<K::Connection, ConnectError> {
        let token = self
            .ctx
            .credentials
            .resolve(&self.descriptor.credential)
            .await?;
        let conn = self
            .ctx
            .connector
            .connect(self.descriptor.connect_uri())
            .await?;

        match self.hello(&conn, token).await {
            Ok(()) => Ok(conn),
            Err(err) => {
                let _ = conn.close().await;
                Err(err)
            }
        }
    }

    async fn hello(&self, conn: &K::Connection, token: String) -> Result<(), ConnectError> {
        let offered = self.descriptor.kind.version;
        let frame = self
            .codec
            .encode(&ClientMessage::Hello {
                version: offered,
                token,
            })
            .map_err(|e| ConnectError::InvalidHandshake(e.to_string()))?;
        conn.send(&frame).await?;

        let reply = conn.recv().await?.ok_or_else(|| {
            TransportError::ConnectionClosed("closed during handshake".to_string())
        })?;

        match self.codec.decode::<ServerMessage>(&reply) {
            Ok(ServerMessage::Welcome { session_uid }) => {
                tracing::debug!(
                    server = %self.index(),
                    connection = %conn.id(),
                    %session_uid,
                    "handshake accepted"
                );
                Ok(())
            }
            Ok(ServerMessage::Rejected {
                reason: RejectReason::Unauthorized { message },
            }) => Err(ConnectError::AuthRejected(message)),
            Ok(ServerMessage::Rejected {
                reason: RejectReason::VersionTooOld { minimum },
            }) => Err(ConnectError::VersionMismatch { offered, minimum }),
            Ok(other) => Err(ConnectError::InvalidHandshake(format!(
                "expected Welcome, got {other:?}"
            ))),
            Err(e) => Err(ConnectError::InvalidHandshake(e.to_string())),
        }
    }
}

struct SessionActor<K, A> {
    link: Link<K, A>,
    priority: Priority,
    backoff: Backoff,
    commands: mpsc::Receiver<SessionCommand>,
    status: watch::Sender<SessionStatus>,
    roster: watch::Sender<Arc<Roster>>,
}

impl<K: Connector, A: CredentialStore> SessionActor<K, A> {
    async fn run(mut self) {
        let index = self.link.index();
        tracing::info!(
            server = %index,
            uri = self.link.descriptor.connect_uri(),
            version = %self.link.descriptor.kind.version,
            "session actor started"
        );

        let mut step = Step::Idle;
        let reply = loop {
            step = match step {
                Step::Idle => self.idle().await,
                Step::Connect(state) => self.attempt(state).await,
                Step::Retry => self.retry().await,
                Step::Stop(reply) => break reply,
            };
        };

        self.teardown();
        tracing::info!(server = %index, "session actor stopped");
        if let Some(reply) = reply {
            let _ = reply.send(());
        }
    }

    /// Waits in `Disconnected` until told to connect or stop.
    async fn idle(&mut self) -> Step {
        self.set_state(SessionState::Disconnected);
        loop {
            let command = self.commands.recv().await;
            match offline_command(self.link.index(), &mut self.priority, command) {
                Some(Control::Connect) => {
                    self.backoff.reset();
                    return Step::Connect(SessionState::Connecting);
                }
                Some(Control::Stop(reply)) => return Step::Stop(reply),
                None => {}
            }
        }
    }

    /// One dial + handshake. Commands are still served meanwhile, and a
    /// stop command drops the in-flight attempt.
    async fn attempt(&mut self, state: SessionState) -> Step {
        self.set_state(state);
        let index = self.link.index();

        let result = {
            let mut handshake = pin!(self.link.handshake());
            loop {
                tokio::select! {
                    result = &mut handshake => break result,
                    command = self.commands.recv() => {
                        match offline_command(index, &mut self.priority, command) {
                            Some(Control::Connect) => {
                                tracing::debug!(server = %index, "already connecting");
                            }
                            Some(Control::Stop(reply)) => {
                                tracing::debug!(server = %index, "connect attempt cancelled");
                                return Step::Stop(reply);
                            }
                            None => {}
                        }
                    }
                }
            }
        };

        match result {
            Ok(conn) => {
                self.backoff.reset();
                self.status.send_modify(|status| {
                    status.state = SessionState::Connected;
                    status.last_error = None;
                });
                tracing::info!(server = %index, connection = %conn.id(), "session connected");
                self.link.notify(StatusEvent::Connected { server: index });
                self.connected(conn).await
            }
            Err(err) => {
                let terminal = err.is_terminal();
                self.link.notify(StatusEvent::ConnectFailed {
                    server: index,
                    error: err.to_string(),
                    terminal,
                });
                let next = if terminal {
                    tracing::warn!(server = %index, error = %err, "connect failed, halting");
                    SessionState::Disconnected
                } else {
                    tracing::debug!(server = %index, error = %err, "connect failed, retrying");
                    SessionState::Reconnecting
                };
                self.status.send_modify(|status| {
                    status.state = next;
                    status.last_error = Some(Arc::new(err));
                });
                if terminal { Step::Idle } else { Step::Retry }
            }
        }
    }

    /// Sleeps out the next backoff delay in `Reconnecting`.
    async fn retry(&mut self) -> Step {
        let index = self.link.index();
        let delay = self.backoff.next_delay();
        tracing::debug!(
            server = %index,
            attempt = self.backoff.attempt(),
            delay_ms = delay.as_millis() as u64,
            "backing off"
        );

        let mut sleep = pin!(tokio::time::sleep(delay));
        loop {
            tokio::select! {
                () = &mut sleep => return Step::Connect(SessionState::Reconnecting),
                command = self.commands.recv() => {
                    match offline_command(index, &mut self.priority, command) {
                        Some(Control::Connect) => {
                            self.backoff.reset();
                            return Step::Connect(SessionState::Connecting);
                        }
                        Some(Control::Stop(reply)) => return Step::Stop(reply),
                        None => {}
                    }
                }
            }
        }
    }

    /// Serves frames and commands until the connection faults or the
    /// session is stopped.
    async fn connected(&mut self, conn: K::Connection) -> Step {
        let index = self.link.index();

        loop {
            tokio::select! {
                frame = conn.recv() => match frame {
                    Ok(Some(bytes)) => self.on_frame(&bytes),
                    Ok(None) => {
                        tracing::warn!(server = %index, "server closed the connection");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(server = %index, error = %e, "connection fault");
                        break;
                    }
                },
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Connect) => {}
                    Some(SessionCommand::SetPriority(priority)) => {
                        self.set_priority(priority);
                    }
                    Some(SessionCommand::Push { name_hash, payload, reply }) => {
                        let result = self.send_push(&conn, name_hash, payload).await;
                        let _ = reply.send(result);
                    }
                    Some(SessionCommand::Shutdown { reply }) => {
                        self.goodbye(&conn).await;
                        self.link.notify(StatusEvent::Disconnected { server: index });
                        return Step::Stop(Some(reply));
                    }
                    None => {
                        self.goodbye(&conn).await;
                        self.link.notify(StatusEvent::Disconnected { server: index });
                        return Step::Stop(None);
                    }
                },
            }
        }

        // Transport fault: the roster is no longer trustworthy.
        self.link.notify(StatusEvent::Disconnected { server: index });
        self.clear_roster();
        self.set_state(SessionState::Reconnecting);
        Step::Retry
    }

    fn on_frame(&mut self, bytes: &[u8]) {
        let index = self.link.index();
        let message = match self.link.codec.decode::<ServerMessage>(bytes) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(server = %index, error = %e, "dropping malformed frame");
                return;
            }
        };

        let deltas = self.link.descriptor.kind.capabilities.roster_deltas;
        match message {
            ServerMessage::RosterSnapshot { entries } => {
                self.replace_roster(Roster::from_entries(entries));
            }
            ServerMessage::RosterAdded { entry } if deltas => {
                let next = self.roster.borrow().with_added(entry);
                self.replace_roster(next);
            }
            ServerMessage::RosterRemoved { uid } if deltas => {
                let (next, _) = self.roster.borrow().with_removed(&uid);
                self.replace_roster(next);
            }
            ServerMessage::RosterAdded { .. } | ServerMessage::RosterRemoved { .. } => {
                tracing::warn!(
                    server = %index,
                    version = %self.link.descriptor.kind.version,
                    "roster delta not supported by this protocol version, ignoring"
                );
            }
            ServerMessage::Push {
                uid,
                name_hash,
                payload,
            } => {
                tracing::trace!(server = %index, %uid, %name_hash, "state pushed");
                self.on_push(&uid, &name_hash, &payload);
            }
            ServerMessage::Welcome { .. } | ServerMessage::Rejected { .. } => {
                tracing::debug!(server = %index, "unexpected handshake message, ignoring");
            }
        }
    }

    /// Arbitrates a server-pushed state update and renders it if this
    /// session wins.
    ///
    /// The entity is the one this session's roster pairs with `uid`; the
    /// frame's own name hash must agree with it.
    fn on_push(&self, uid: &RemoteUid, claimed: &NameHash, payload: &[u8]) {
        let index = self.link.index();
        let Some(name_hash) = self.roster.borrow().name_hash_for(uid).cloned() else {
            tracing::debug!(server = %index, %uid, "push for unpaired entity, ignoring");
            return;
        };
        if name_hash != *claimed {
            tracing::debug!(
                server = %index,
                %uid,
                paired = %name_hash,
                %claimed,
                "push names a different entity than its uid, ignoring"
            );
            return;
        }

        let arbitrator = &self.link.ctx.arbitrator;
        if let Grant::Denied { holder } = arbitrator.request(&name_hash, index, self.priority) {
            self.link.notify(StatusEvent::AuthorityDenied {
                server: index,
                name_hash,
                holder,
            });
            return;
        }

        // A higher-priority session may have taken over since the grant.
        if !arbitrator.has_authority(&name_hash, index) {
            tracing::debug!(server = %index, %name_hash, "authority lost before render");
            return;
        }

        if let Err(e) = self.link.ctx.pipeline.apply_state(&name_hash, payload) {
            tracing::warn!(server = %index, %name_hash, error = %e, "render failed");
        }
    }

    async fn send_push(
        &self,
        conn: &K::Connection,
        name_hash: NameHash,
        payload: Vec<u8>,
    ) -> Result<(), SessionError> {
        let index = self.link.index();
        let uid = self
            .roster
            .borrow()
            .uid_for(&name_hash)
            .cloned()
            .ok_or(SessionError::UnknownPair {
                server: index,
                name_hash,
            })?;

        let frame = self
            .link
            .codec
            .encode(&ClientMessage::Push { uid, payload })?;
        conn.send(&frame).await?;
        Ok(())
    }

    async fn goodbye(&self, conn: &K::Connection) {
        let index = self.link.index();
        let goodbye = ClientMessage::Goodbye {
            reason: "client shutdown".to_string(),
        };
        if let Ok(frame) = self.link.codec.encode(&goodbye) {
            if let Err(e) = conn.send(&frame).await {
                tracing::debug!(server = %index, error = %e, "goodbye not delivered");
            }
        }
        if let Err(e) = conn.close().await {
            tracing::debug!(server = %index, error = %e, "close failed");
        }
    }

    /// Publishes `next` and releases authority for every name hash that
    /// dropped out of the roster.
    fn replace_roster(&self, next: Roster) {
        let index = self.link.index();
        let before = self.roster.borrow().name_hashes();
        let after = next.name_hashes();
        for name_hash in before.difference(&after) {
            self.link
                .ctx
                .arbitrator
                .release_authority(name_hash, index);
        }

        tracing::debug!(server = %index, pairs = next.len(), "roster updated");
        self.roster.send_replace(Arc::new(next));
    }

    /// Empties the roster and releases every lock this session holds.
    fn clear_roster(&self) {
        let index = self.link.index();
        let released = self.link.ctx.arbitrator.release_all(index);
        if !released.is_empty() {
            tracing::debug!(server = %index, released = released.len(), "released authority");
        }
        self.roster.send_replace(Arc::new(Roster::new()));
    }

    fn set_priority(&mut self, priority: Priority) {
        tracing::debug!(server = %self.link.index(), %priority, "priority changed");
        self.priority = priority;
    }

    fn set_state(&self, state: SessionState) {
        let previous = self.status.borrow().state;
        if previous != state {
            tracing::debug!(
                server = %self.link.index(),
                from = %previous,
                to = %state,
                "session state changed"
            );
        }
        self.status.send_modify(|status| status.state = state);
    }

    fn teardown(&self) {
        self.set_state(SessionState::Disposing);
        self.clear_roster();
        self.set_state(SessionState::Disconnected);
    }
}

/// Serves a command while no connection is up.
///
/// Priority edits are applied in place and pushes are refused; the
/// lifecycle commands are returned for the caller to act on.
fn offline_command(
    index: ServerIndex,
    priority: &mut Priority,
    command: Option<SessionCommand>,
) -> Option<Control> {
    match command {
        Some(SessionCommand::Connect) => Some(Control::Connect),
        Some(SessionCommand::SetPriority(next)) => {
            tracing::debug!(server = %index, priority = %next, "priority changed");
            *priority = next;
            None
        }
        Some(SessionCommand::Push { reply, .. }) => {
            let _ = reply.send(Err(SessionError::NotConnected(index)));
            None
        }
        Some(SessionCommand::Shutdown { reply }) => Some(Control::Stop(Some(reply))),
        // Every handle is gone; nobody can reach this session again.
        None => Some(Control::Stop(None)),
    }
}
