//! In-process transport backed by Tokio channels.
//!
//! A [`MemoryConnector`] keeps a table of listening URIs. Dialing a URI
//! creates a connected pair of [`MemoryConnection`]s and hands the server
//! half to whichever [`MemoryListener`] owns that URI. Dropping the
//! listener makes the URI unreachable, which is how tests simulate a
//! partitioned server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, mpsc};

use crate::{Connection, ConnectionId, Connector, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_MEMORY_ID: AtomicU64 = AtomicU64::new(1);

type Frame = Vec<u8>;

/// Dials in-process listeners registered on the same connector.
///
/// Cheap to clone; clones share the listener table.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    listeners: Arc<StdMutex<HashMap<String, mpsc::UnboundedSender<MemoryConnection>>>>,
}

impl MemoryConnector {
    /// Creates a connector with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts listening on `uri`, replacing any previous listener.
    pub fn listen(&self, uri: impl Into<String>) -> MemoryListener {
        let uri = uri.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        listeners.insert(uri.clone(), tx);
        tracing::debug!(uri, "memory listener registered");
        MemoryListener { uri, incoming: rx }
    }
}

impl Connector for MemoryConnector {
    type Connection = MemoryConnection;

    async fn connect(
        &self,
        uri: &str,
    ) -> Result<MemoryConnection, TransportError> {
        let unreachable = || TransportError::Unreachable {
            uri: uri.to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "no listener",
            ),
        };

        let listener = {
            let listeners = self
                .listeners
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            listeners.get(uri).cloned()
        }
        .ok_or_else(unreachable)?;

        let (client, server) = MemoryConnection::pair();
        listener.send(server).map_err(|_| unreachable())?;
        Ok(client)
    }
}

/// The accepting side of a memory URI.
pub struct MemoryListener {
    uri: String,
    incoming: mpsc::UnboundedReceiver<MemoryConnection>,
}

impl MemoryListener {
    /// Waits for the next client to dial this listener's URI.
    ///
    /// Returns `None` once every connector clone has been dropped.
    pub async fn accept(&mut self) -> Option<MemoryConnection> {
        self.incoming.recv().await
    }

    /// The URI this listener is registered under.
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

/// One end of an in-process connection.
pub struct MemoryConnection {
    id: ConnectionId,
    outgoing: Mutex<Option<mpsc::UnboundedSender<Frame>>>,
    incoming: Mutex<mpsc::UnboundedReceiver<Frame>>,
}

impl MemoryConnection {
    /// Creates two connected ends. Frames sent on one arrive on the other.
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        let next_id =
            || ConnectionId::new(NEXT_MEMORY_ID.fetch_add(1, Ordering::Relaxed));

        let left = Self {
            id: next_id(),
            outgoing: Mutex::new(Some(a_tx)),
            incoming: Mutex::new(b_rx),
        };
        let right = Self {
            id: next_id(),
            outgoing: Mutex::new(Some(b_tx)),
            incoming: Mutex::new(a_rx),
        };
        (left, right)
    }
}

impl Connection for MemoryConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let outgoing = self.outgoing.lock().await;
        let tx = outgoing.as_ref().ok_or_else(|| {
            TransportError::ConnectionClosed("closed locally".into())
        })?;
        tx.send(data.to_vec()).map_err(|_| {
            TransportError::ConnectionClosed("peer went away".into())
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.incoming.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), TransportError> {
        // Dropping the sender ends the peer's stream.
        self.outgoing.lock().await.take();
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
