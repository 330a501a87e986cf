//! Integration tests for the session actor, driven by in-memory mock servers.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use pairsync_authority::Arbitrator;
use pairsync_protocol::{
    ClientMessage, Codec, JsonCodec, NameHash, Priority, ProtocolVersion, RejectReason,
    RemoteUid, RosterEntry, ServerIndex, ServerMessage,
};
use pairsync_registry::{CredentialRef, DescriptorConfig, ServerRegistry};
use pairsync_session::*;
use pairsync_transport::{Connection, MemoryConnection, MemoryConnector, MemoryListener};
use tokio::sync::mpsc;

// =========================================================================
// Harness
// =========================================================================

type Rendered = mpsc::UnboundedReceiver<(NameHash, Vec<u8>)>;

/// Forwards every rendered update to the test.
struct ChannelPipeline(mpsc::UnboundedSender<(NameHash, Vec<u8>)>);

impl RenderPipeline for ChannelPipeline {
    fn apply_state(&self, name_hash: &NameHash, payload: &[u8]) -> Result<(), RenderError> {
        self.0
            .send((name_hash.clone(), payload.to_vec()))
            .map_err(|_| RenderError("test receiver gone".into()))
    }
}

struct Harness {
    connector: MemoryConnector,
    registry: ServerRegistry,
    arbitrator: Arc<Arbitrator>,
    events: mpsc::UnboundedReceiver<StatusEvent>,
    ctx: SessionContext<MemoryConnector, StaticCredentials>,
}

impl Harness {
    fn new() -> Self {
        let connector = MemoryConnector::new();
        let (notifier, events) = ChannelNotifier::new();
        let ctx = SessionContext::new(
            connector.clone(),
            StaticCredentials::new().with("main", "secret"),
        )
        .with_notifier(notifier)
        .with_config(SessionConfig {
            handshake_timeout_ms: 200,
            backoff: BackoffConfig {
                initial_ms: 10,
                max_ms: 40,
                jitter_ms: 0,
            },
        });
        let arbitrator = Arc::clone(ctx.arbitrator());

        Self {
            connector,
            registry: ServerRegistry::new(),
            arbitrator,
            events,
            ctx,
        }
    }

    fn spawn(&mut self, config: DescriptorConfig) -> (SessionHandle, Rendered) {
        let index = self.registry.add(config).unwrap();
        let descriptor = self.registry.get(index).unwrap().clone();
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = self.ctx.clone().with_pipeline(ChannelPipeline(tx));
        (spawn_session(descriptor, ctx), rx)
    }

    /// Waits for the first event matching `predicate`, skipping others.
    async fn event(&mut self, predicate: impl Fn(&StatusEvent) -> bool) -> StatusEvent {
        within(async {
            loop {
                let event = self.events.recv().await.expect("notifier closed");
                if predicate(&event) {
                    return event;
                }
            }
        })
        .await
    }
}

fn server(uri: &str) -> DescriptorConfig {
    DescriptorConfig::new(uri, CredentialRef::new("main"))
}

fn entry(uid: &str, hash: &str) -> RosterEntry {
    RosterEntry {
        uid: RemoteUid::new(uid),
        name_hash: NameHash::new(hash),
    }
}

async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}

// =========================================================================
// Mock server helpers
// =========================================================================

async fn send(conn: &MemoryConnection, msg: &ServerMessage) {
    conn.send(&JsonCodec.encode(msg).unwrap()).await.unwrap();
}

async fn recv(conn: &MemoryConnection) -> ClientMessage {
    let frame = within(conn.recv()).await.unwrap().expect("client hung up");
    JsonCodec.decode(&frame).unwrap()
}

/// Accepts the next client and returns its `Hello`.
async fn accept(listener: &mut MemoryListener) -> (MemoryConnection, ClientMessage) {
    let conn = within(listener.accept()).await.expect("listener closed");
    let hello = recv(&conn).await;
    (conn, hello)
}

/// Accepts the next client and completes the handshake.
async fn welcome(listener: &mut MemoryListener) -> MemoryConnection {
    let (conn, hello) = accept(listener).await;
    assert!(matches!(hello, ClientMessage::Hello { .. }));
    send(
        &conn,
        &ServerMessage::Welcome {
            session_uid: RemoteUid::new("client"),
        },
    )
    .await;
    conn
}

async fn snapshot(conn: &MemoryConnection, entries: Vec<RosterEntry>) {
    send(conn, &ServerMessage::RosterSnapshot { entries }).await;
}

async fn push(conn: &MemoryConnection, uid: &str, hash: &str, payload: &[u8]) {
    send(
        conn,
        &ServerMessage::Push {
            uid: RemoteUid::new(uid),
            name_hash: NameHash::new(hash),
            payload: payload.to_vec(),
        },
    )
    .await;
}

// =========================================================================
// Handshake and lifecycle
// =========================================================================

#[tokio::test]
async fn test_connect_handshake_reaches_connected() {
    let mut h = Harness::new();
    let mut listener = h.connector.listen("mem://a");
    let (session, _rendered) = h.spawn(server("mem://a"));
    assert_eq!(session.state(), SessionState::Disconnected);

    session.connect().await.unwrap();
    let (conn, hello) = accept(&mut listener).await;
    assert_eq!(
        hello,
        ClientMessage::Hello {
            version: ProtocolVersion(2),
            token: "secret".into(),
        }
    );
    send(
        &conn,
        &ServerMessage::Welcome {
            session_uid: RemoteUid::new("client"),
        },
    )
    .await;

    let status = within(session.wait_for_state(SessionState::Connected))
        .await
        .unwrap();
    assert!(status.last_error.is_none());
    h.event(|e| matches!(e, StatusEvent::Connected { server } if *server == ServerIndex(0)))
        .await;
}

#[test]
fn test_context_clamps_zero_handshake_timeout() {
    let ctx = SessionContext::new(MemoryConnector::new(), StaticCredentials::new())
        .with_config(SessionConfig {
            handshake_timeout_ms: 0,
            ..SessionConfig::default()
        });

    assert!(ctx.config().handshake_timeout_ms > 0);
}

#[tokio::test]
async fn test_connect_hub_override_dials_hub_uri() {
    let mut h = Harness::new();
    let mut hub = h.connector.listen("mem://hub");
    let mut config = server("mem://direct");
    config.overrides.hub_uri = Some("mem://hub".into());
    let (session, _rendered) = h.spawn(config);

    session.connect().await.unwrap();
    let _conn = welcome(&mut hub).await;

    within(session.wait_for_state(SessionState::Connected))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_connect_auth_rejected_halts_without_retry() {
    let mut h = Harness::new();
    let mut listener = h.connector.listen("mem://a");
    let (session, _rendered) = h.spawn(server("mem://a"));

    session.connect().await.unwrap();
    let (conn, _) = accept(&mut listener).await;
    send(
        &conn,
        &ServerMessage::Rejected {
            reason: RejectReason::Unauthorized {
                message: "bad token".into(),
            },
        },
    )
    .await;

    let status = within(session.wait_for_status(|s| s.is_halted()))
        .await
        .unwrap();
    assert_eq!(status.state, SessionState::Disconnected);
    assert!(matches!(
        status.last_error.as_deref(),
        Some(ConnectError::AuthRejected(message)) if message == "bad token"
    ));
    h.event(|e| matches!(e, StatusEvent::ConnectFailed { terminal: true, .. }))
        .await;

    // No automatic retry.
    let retry = tokio::time::timeout(Duration::from_millis(150), listener.accept()).await;
    assert!(retry.is_err());
}

#[tokio::test]
async fn test_connect_version_too_old_is_version_mismatch() {
    let mut h = Harness::new();
    let mut listener = h.connector.listen("mem://a");
    let (session, _rendered) = h.spawn(server("mem://a").protocol(1));

    session.connect().await.unwrap();
    let (conn, hello) = accept(&mut listener).await;
    assert!(matches!(
        hello,
        ClientMessage::Hello { version, .. } if version == ProtocolVersion(1)
    ));
    send(
        &conn,
        &ServerMessage::Rejected {
            reason: RejectReason::VersionTooOld {
                minimum: ProtocolVersion(2),
            },
        },
    )
    .await;

    let status = within(session.wait_for_status(|s| s.is_halted()))
        .await
        .unwrap();
    assert!(matches!(
        status.last_error.as_deref(),
        Some(ConnectError::VersionMismatch { offered, minimum })
            if *offered == ProtocolVersion(1) && *minimum == ProtocolVersion(2)
    ));
}

#[tokio::test]
async fn test_connect_unknown_credential_halts_before_dialing() {
    let mut h = Harness::new();
    let mut listener = h.connector.listen("mem://a");
    let (session, _rendered) = h.spawn(DescriptorConfig::new(
        "mem://a",
        CredentialRef::new("missing"),
    ));

    session.connect().await.unwrap();

    let status = within(session.wait_for_status(|s| s.is_halted()))
        .await
        .unwrap();
    assert!(matches!(
        status.last_error.as_deref(),
        Some(ConnectError::Credential(_))
    ));
    let dialed = tokio::time::timeout(Duration::from_millis(50), listener.accept()).await;
    assert!(dialed.is_err());
}

#[tokio::test]
async fn test_connect_after_halt_is_renewed_attempt() {
    let mut h = Harness::new();
    let mut listener = h.connector.listen("mem://a");
    let (session, _rendered) = h.spawn(server("mem://a"));

    session.connect().await.unwrap();
    let (conn, _) = accept(&mut listener).await;
    send(
        &conn,
        &ServerMessage::Rejected {
            reason: RejectReason::Unauthorized {
                message: "expired".into(),
            },
        },
    )
    .await;
    within(session.wait_for_status(|s| s.is_halted()))
        .await
        .unwrap();

    session.connect().await.unwrap();
    let _conn = welcome(&mut listener).await;

    let status = within(session.wait_for_state(SessionState::Connected))
        .await
        .unwrap();
    assert!(status.last_error.is_none());
}

#[tokio::test]
async fn test_connect_unreachable_retries_in_reconnecting() {
    let mut h = Harness::new();
    let (session, _rendered) = h.spawn(server("mem://late"));

    session.connect().await.unwrap();
    let status = within(session.wait_for_status(|s| {
        s.state == SessionState::Reconnecting && s.last_error.is_some()
    }))
    .await
    .unwrap();
    assert!(matches!(
        status.last_error.as_deref(),
        Some(ConnectError::NetworkUnreachable(_))
    ));
    h.event(|e| matches!(e, StatusEvent::ConnectFailed { terminal: false, .. }))
        .await;

    // The server comes up; backoff retries find it.
    let mut listener = h.connector.listen("mem://late");
    let _conn = welcome(&mut listener).await;
    within(session.wait_for_state(SessionState::Connected))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_connect_silent_server_times_out_and_retries() {
    let mut h = Harness::new();
    let mut listener = h.connector.listen("mem://a");
    let (session, _rendered) = h.spawn(server("mem://a"));

    session.connect().await.unwrap();
    let (_conn, _) = accept(&mut listener).await;

    let status = within(session.wait_for_status(|s| s.last_error.is_some()))
        .await
        .unwrap();
    assert!(matches!(
        status.last_error.as_deref(),
        Some(ConnectError::Timeout(_))
    ));
    assert_eq!(status.state, SessionState::Reconnecting);
}

#[tokio::test]
async fn test_connect_garbage_reply_is_invalid_handshake() {
    let mut h = Harness::new();
    let mut listener = h.connector.listen("mem://a");
    let (session, _rendered) = h.spawn(server("mem://a"));

    session.connect().await.unwrap();
    let (conn, _) = accept(&mut listener).await;
    conn.send(b"not json").await.unwrap();

    let status = within(session.wait_for_status(|s| s.last_error.is_some()))
        .await
        .unwrap();
    let err = status.last_error.unwrap();
    assert!(matches!(*err, ConnectError::InvalidHandshake(_)));
    assert!(!err.is_terminal());
}

#[tokio::test]
async fn test_shutdown_cancels_in_flight_connect() {
    let mut h = Harness::new();
    let mut listener = h.connector.listen("mem://a");
    let (session, _rendered) = h.spawn(server("mem://a"));

    session.connect().await.unwrap();
    let (_conn, _) = accept(&mut listener).await;

    within(session.shutdown()).await.unwrap();
    assert_eq!(session.state(), SessionState::Disconnected);
}

// =========================================================================
// Roster
// =========================================================================

#[tokio::test]
async fn test_roster_snapshot_and_deltas_publish_new_snapshots() {
    let mut h = Harness::new();
    let mut listener = h.connector.listen("mem://a");
    let (session, _rendered) = h.spawn(server("mem://a"));

    session.connect().await.unwrap();
    let conn = welcome(&mut listener).await;
    snapshot(&conn, vec![entry("U1", "a"), entry("U2", "b")]).await;

    let first = within(session.wait_for_roster(|r| r.len() == 2))
        .await
        .unwrap();

    send(
        &conn,
        &ServerMessage::RosterAdded {
            entry: entry("U3", "c"),
        },
    )
    .await;
    send(
        &conn,
        &ServerMessage::RosterRemoved {
            uid: RemoteUid::new("U1"),
        },
    )
    .await;

    let roster = within(session.wait_for_roster(|r| {
        r.contains(&NameHash::new("c")) && !r.contains(&NameHash::new("a"))
    }))
    .await
    .unwrap();
    assert_eq!(roster.len(), 2);

    // Earlier snapshots are never mutated.
    assert_eq!(first.len(), 2);
    assert!(first.contains(&NameHash::new("a")));

    let pairs = session.pairs();
    assert!(pairs.iter().all(|p| p.server == ServerIndex(0)));
    assert_eq!(pairs.len(), 2);
}

#[tokio::test]
async fn test_roster_deltas_ignored_on_v1() {
    let mut h = Harness::new();
    let mut listener = h.connector.listen("mem://a");
    let (session, _rendered) = h.spawn(server("mem://a").protocol(1));

    session.connect().await.unwrap();
    let conn = welcome(&mut listener).await;
    snapshot(&conn, vec![entry("U1", "a")]).await;
    send(
        &conn,
        &ServerMessage::RosterAdded {
            entry: entry("U2", "b"),
        },
    )
    .await;
    snapshot(&conn, vec![entry("U1", "a"), entry("U3", "c")]).await;

    let roster = within(session.wait_for_roster(|r| r.contains(&NameHash::new("c"))))
        .await
        .unwrap();
    assert!(!roster.contains(&NameHash::new("b")));
}

#[tokio::test]
async fn test_roster_removal_releases_authority() {
    let mut h = Harness::new();
    let mut listener = h.connector.listen("mem://a");
    let (session, mut rendered) = h.spawn(server("mem://a"));

    session.connect().await.unwrap();
    let conn = welcome(&mut listener).await;
    snapshot(&conn, vec![entry("U1", "p")]).await;
    push(&conn, "U1", "p", b"state").await;
    within(rendered.recv()).await.unwrap();
    assert_eq!(
        h.arbitrator.holder(&NameHash::new("p")).map(|l| l.holder),
        Some(ServerIndex(0))
    );

    send(
        &conn,
        &ServerMessage::RosterRemoved {
            uid: RemoteUid::new("U1"),
        },
    )
    .await;
    within(session.wait_for_roster(|r| r.is_empty()))
        .await
        .unwrap();

    assert!(h.arbitrator.holder(&NameHash::new("p")).is_none());
}

#[tokio::test]
async fn test_transport_fault_clears_roster_and_reconnects() {
    let mut h = Harness::new();
    let mut listener = h.connector.listen("mem://a");
    let (session, mut rendered) = h.spawn(server("mem://a"));

    session.connect().await.unwrap();
    let conn = welcome(&mut listener).await;
    snapshot(&conn, vec![entry("U1", "p")]).await;
    push(&conn, "U1", "p", b"state").await;
    within(rendered.recv()).await.unwrap();

    conn.close().await.unwrap();

    within(session.wait_for_roster(|r| r.is_empty()))
        .await
        .unwrap();
    assert!(h.arbitrator.is_empty());
    h.event(|e| matches!(e, StatusEvent::Disconnected { .. }))
        .await;

    let _conn = welcome(&mut listener).await;
    within(session.wait_for_state(SessionState::Connected))
        .await
        .unwrap();
}

// =========================================================================
// Pushes and authority
// =========================================================================

#[tokio::test]
async fn test_inbound_push_renders_when_authorized() {
    let mut h = Harness::new();
    let mut listener = h.connector.listen("mem://a");
    let (session, mut rendered) = h.spawn(server("mem://a"));

    session.connect().await.unwrap();
    let conn = welcome(&mut listener).await;
    snapshot(&conn, vec![entry("U1", "p")]).await;
    push(&conn, "U1", "p", b"hat=red").await;

    let (name_hash, payload) = within(rendered.recv()).await.unwrap();
    assert_eq!(name_hash, NameHash::new("p"));
    assert_eq!(payload, b"hat=red");
}

#[tokio::test]
async fn test_inbound_push_for_unpaired_entity_is_ignored() {
    let mut h = Harness::new();
    let mut listener = h.connector.listen("mem://a");
    let (session, mut rendered) = h.spawn(server("mem://a"));

    session.connect().await.unwrap();
    let conn = welcome(&mut listener).await;
    snapshot(&conn, vec![entry("U1", "p")]).await;
    push(&conn, "U9", "stranger", b"x").await;
    push(&conn, "U1", "p", b"y").await;

    // Frames are handled in order, so the second render proves the
    // first push was dropped.
    let (name_hash, _) = within(rendered.recv()).await.unwrap();
    assert_eq!(name_hash, NameHash::new("p"));
    assert!(h.arbitrator.holder(&NameHash::new("stranger")).is_none());
}

#[tokio::test]
async fn test_inbound_push_resolves_entity_from_uid() {
    let mut h = Harness::new();
    let mut listener = h.connector.listen("mem://a");
    let (session, mut rendered) = h.spawn(server("mem://a"));

    session.connect().await.unwrap();
    let conn = welcome(&mut listener).await;
    snapshot(&conn, vec![entry("U1", "alice"), entry("U2", "bob")]).await;
    // U1 is alice on this server; the frame's claim of bob is not trusted.
    push(&conn, "U1", "bob", b"spoofed").await;
    push(&conn, "U2", "bob", b"genuine").await;

    let (name_hash, payload) = within(rendered.recv()).await.unwrap();
    assert_eq!(name_hash, NameHash::new("bob"));
    assert_eq!(payload, b"genuine");
    assert!(h.arbitrator.holder(&NameHash::new("alice")).is_none());
}

#[tokio::test]
async fn test_inbound_push_contention_lower_priority_is_denied() {
    let mut h = Harness::new();
    let mut listener_a = h.connector.listen("mem://a");
    let mut listener_b = h.connector.listen("mem://b");
    let (a, mut rendered_a) = h.spawn(server("mem://a").priority(1));
    let (b, mut rendered_b) = h.spawn(server("mem://b").priority(5));

    a.connect().await.unwrap();
    b.connect().await.unwrap();
    let conn_a = welcome(&mut listener_a).await;
    let conn_b = welcome(&mut listener_b).await;
    snapshot(&conn_a, vec![entry("A-1", "p")]).await;
    snapshot(&conn_b, vec![entry("B-7", "p")]).await;

    push(&conn_b, "B-7", "p", b"from-b").await;
    let (_, payload) = within(rendered_b.recv()).await.unwrap();
    assert_eq!(payload, b"from-b");

    push(&conn_a, "A-1", "p", b"from-a").await;
    let denied = h
        .event(|e| matches!(e, StatusEvent::AuthorityDenied { .. }))
        .await;
    assert_eq!(
        denied,
        StatusEvent::AuthorityDenied {
            server: a.index(),
            name_hash: NameHash::new("p"),
            holder: b.index(),
        }
    );
    assert!(rendered_a.try_recv().is_err());
}

#[tokio::test]
async fn test_set_priority_applies_to_future_requests() {
    let mut h = Harness::new();
    let mut listener_a = h.connector.listen("mem://a");
    let mut listener_b = h.connector.listen("mem://b");
    let (a, mut rendered_a) = h.spawn(server("mem://a").priority(1));
    let (b, mut rendered_b) = h.spawn(server("mem://b").priority(0));

    a.connect().await.unwrap();
    b.connect().await.unwrap();
    let conn_a = welcome(&mut listener_a).await;
    let conn_b = welcome(&mut listener_b).await;
    snapshot(&conn_a, vec![entry("A-1", "p")]).await;
    snapshot(&conn_b, vec![entry("B-1", "p")]).await;

    push(&conn_a, "A-1", "p", b"a").await;
    within(rendered_a.recv()).await.unwrap();

    push(&conn_b, "B-1", "p", b"b").await;
    h.event(|e| matches!(e, StatusEvent::AuthorityDenied { .. }))
        .await;

    b.set_priority(Priority(5)).await.unwrap();
    push(&conn_b, "B-1", "p", b"b2").await;
    let (_, payload) = within(rendered_b.recv()).await.unwrap();
    assert_eq!(payload, b"b2");
    assert_eq!(
        h.arbitrator.holder(&NameHash::new("p")).map(|l| l.holder),
        Some(b.index())
    );
}

#[tokio::test]
async fn test_outbound_push_sends_server_uid() {
    let mut h = Harness::new();
    let mut listener = h.connector.listen("mem://a");
    let (session, _rendered) = h.spawn(server("mem://a"));

    session.connect().await.unwrap();
    let conn = welcome(&mut listener).await;
    snapshot(&conn, vec![entry("U1", "p")]).await;
    within(session.wait_for_roster(|r| !r.is_empty()))
        .await
        .unwrap();

    session
        .push(NameHash::new("p"), b"local".to_vec())
        .await
        .unwrap();

    assert_eq!(
        recv(&conn).await,
        ClientMessage::Push {
            uid: RemoteUid::new("U1"),
            payload: b"local".to_vec(),
        }
    );
}

#[tokio::test]
async fn test_outbound_push_errors() {
    let mut h = Harness::new();
    let mut listener = h.connector.listen("mem://a");
    let (session, _rendered) = h.spawn(server("mem://a"));
    let (legacy, _legacy_rendered) = h.spawn(server("mem://old").protocol(1));

    let err = session.push(NameHash::new("p"), vec![]).await.unwrap_err();
    assert!(matches!(err, SessionError::NotConnected(_)));

    let err = legacy.push(NameHash::new("p"), vec![]).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Unsupported { capability: "push_state", .. }
    ));

    session.connect().await.unwrap();
    let _conn = welcome(&mut listener).await;
    within(session.wait_for_state(SessionState::Connected))
        .await
        .unwrap();

    let err = session
        .push(NameHash::new("nobody"), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::UnknownPair { .. }));
}

// =========================================================================
// Shutdown and isolation
// =========================================================================

#[tokio::test]
async fn test_shutdown_releases_authority_and_says_goodbye() {
    let mut h = Harness::new();
    let mut listener = h.connector.listen("mem://a");
    let (session, mut rendered) = h.spawn(server("mem://a"));

    session.connect().await.unwrap();
    let conn = welcome(&mut listener).await;
    snapshot(&conn, vec![entry("U1", "p"), entry("U2", "q")]).await;
    push(&conn, "U1", "p", b"1").await;
    push(&conn, "U2", "q", b"2").await;
    within(rendered.recv()).await.unwrap();
    within(rendered.recv()).await.unwrap();
    assert_eq!(h.arbitrator.len(), 2);

    within(session.shutdown()).await.unwrap();

    assert!(h.arbitrator.is_empty());
    assert!(session.roster().is_empty());
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(matches!(recv(&conn).await, ClientMessage::Goodbye { .. }));

    within(async {
        while !session.is_closed() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(matches!(
        session.connect().await,
        Err(SessionError::Unavailable(_))
    ));
}

#[tokio::test]
async fn test_partitioned_session_does_not_affect_healthy_one() {
    let mut h = Harness::new();
    let mut listener_a = h.connector.listen("mem://a");
    let mut listener_b = h.connector.listen("mem://b");
    let (a, mut rendered_a) = h.spawn(server("mem://a").priority(10));
    let (b, mut rendered_b) = h.spawn(server("mem://b").priority(1));

    a.connect().await.unwrap();
    b.connect().await.unwrap();
    let conn_a = welcome(&mut listener_a).await;
    let conn_b = welcome(&mut listener_b).await;

    snapshot(&conn_a, vec![entry("A-1", "q")]).await;
    push(&conn_a, "A-1", "q", b"from-a").await;
    within(rendered_a.recv()).await.unwrap();
    snapshot(&conn_b, vec![entry("B-1", "p")]).await;
    push(&conn_b, "B-1", "p", b"from-b").await;
    within(rendered_b.recv()).await.unwrap();
    assert_eq!(
        h.arbitrator.holder(&NameHash::new("q")).map(|l| l.holder),
        Some(a.index())
    );

    // A's server vanishes mid-session.
    drop(listener_a);
    conn_a.close().await.unwrap();

    within(a.wait_for_roster(|r| r.is_empty())).await.unwrap();
    assert!(h.arbitrator.holder(&NameHash::new("q")).is_none());

    send(
        &conn_b,
        &ServerMessage::RosterAdded {
            entry: entry("B-2", "r"),
        },
    )
    .await;
    within(b.wait_for_roster(|r| r.len() == 2)).await.unwrap();
    push(&conn_b, "B-2", "r", b"still-here").await;

    let (name_hash, payload) = within(rendered_b.recv()).await.unwrap();
    assert_eq!(name_hash, NameHash::new("r"));
    assert_eq!(payload, b"still-here");
    assert_eq!(b.state(), SessionState::Connected);
    assert_ne!(a.state(), SessionState::Connected);
    assert_eq!(
        h.arbitrator.holder(&NameHash::new("r")).map(|l| l.holder),
        Some(b.index())
    );
    assert_eq!(
        h.arbitrator.holder(&NameHash::new("p")).map(|l| l.holder),
        Some(b.index())
    );
}
