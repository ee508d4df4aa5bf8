use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::info;

use callscope_registry::{ConnectionId, ConnectionRegistry, RegistryError};

/// Outbound queue handle for one live socket.
pub type OutboundSender = mpsc::Sender<String>;

/// In-process map of live sockets: conn_id -> outbound sender.
pub type LiveConnections = Arc<DashMap<String, OutboundSender>>;

/// The only legitimate path for adding connections to the registry; removal
/// also happens opportunistically from the dispatcher's pruning.
///
/// Both directions are idempotent: a repeated connect overwrites the live
/// entry and the registry add is INSERT OR IGNORE; a repeated disconnect
/// removes nothing and errors nowhere.
pub struct ConnectionLifecycle {
    registry: Arc<dyn ConnectionRegistry>,
    live: LiveConnections,
}

impl ConnectionLifecycle {
    pub fn new(registry: Arc<dyn ConnectionRegistry>, live: LiveConnections) -> Self {
        Self { registry, live }
    }

    /// Transport connect notification. The registry write comes first so a
    /// dispatch pass starting now already sees the connection; if it fails
    /// the caller must drop the socket rather than serve an unregistered
    /// viewer.
    pub fn on_connect(&self, id: &ConnectionId, tx: OutboundSender) -> Result<(), RegistryError> {
        self.registry.add(id)?;
        self.live.insert(id.as_str().to_string(), tx);
        info!(conn_id = %id, "connection registered");
        Ok(())
    }

    /// Transport disconnect notification. The live entry goes first so no
    /// further pushes can enqueue to a closing socket.
    pub fn on_disconnect(&self, id: &ConnectionId) {
        self.live.remove(id.as_str());
        if let Err(e) = self.registry.remove(id) {
            tracing::warn!(conn_id = %id, error = %e, "registry remove failed on disconnect");
        }
        info!(conn_id = %id, "connection removed");
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}
