//! Outbound collaborators: where rendered state and status events go.
//!
//! PairSync doesn't apply cosmetic state or show UI itself. It calls a
//! [`RenderPipeline`] once a session holds authority for an entity, and
//! reports lifecycle changes to a [`Notifier`]. Both are plain
//! synchronous traits so they can sit behind `Arc<dyn ...>`; an
//! implementation that needs async work should hand it off to its own
//! task and return immediately.

use pairsync_protocol::{NameHash, ServerIndex};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// RenderPipeline
// ---------------------------------------------------------------------------

/// The render pipeline refused or failed to apply a state update.
#[derive(Debug, thiserror::Error)]
#[error("render failed: {0}")]
pub struct RenderError(pub String);

/// Applies remote state for one entity locally.
///
/// Only ever called by a session that has just confirmed it holds
/// authority for `name_hash`.
pub trait RenderPipeline: Send + Sync + 'static {
    fn apply_state(&self, name_hash: &NameHash, payload: &[u8]) -> Result<(), RenderError>;
}

/// A pipeline that accepts and discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardPipeline;

impl RenderPipeline for DiscardPipeline {
    fn apply_state(&self, name_hash: &NameHash, payload: &[u8]) -> Result<(), RenderError> {
        tracing::trace!(%name_hash, bytes = payload.len(), "discarding render");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Something worth telling the user about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// The session finished its handshake.
    Connected { server: ServerIndex },

    /// The session lost or closed its connection.
    Disconnected { server: ServerIndex },

    /// A connect attempt failed. `terminal` means no retry will follow.
    ConnectFailed {
        server: ServerIndex,
        error: String,
        terminal: bool,
    },

    /// The server pushed state for an entity another server controls.
    AuthorityDenied {
        server: ServerIndex,
        name_hash: NameHash,
        holder: ServerIndex,
    },
}

/// Receives best-effort status events. Must not block.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, event: StatusEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, event: StatusEvent) {
        match event {
            StatusEvent::Connected { server } => {
                tracing::info!(%server, "connected to server");
            }
            StatusEvent::Disconnected { server } => {
                tracing::info!(%server, "disconnected from server");
            }
            StatusEvent::ConnectFailed {
                server,
                error,
                terminal: true,
            } => tracing::error!(%server, %error, "connect failed, not retrying"),
            StatusEvent::ConnectFailed { server, error, .. } => {
                tracing::warn!(%server, %error, "connect failed, will retry");
            }
            StatusEvent::AuthorityDenied {
                server,
                name_hash,
                holder,
            } => tracing::warn!(%server, %name_hash, %holder, "render authority denied"),
        }
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: StatusEvent) {}
}

/// Forwards events into an unbounded channel.
///
/// Sending never blocks; events are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<StatusEvent>,
}

impl ChannelNotifier {
    /// Creates a notifier and the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: StatusEvent) {
        let _ = self.sender.send(event);
    }
}
