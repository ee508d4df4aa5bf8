use async_trait::async_trait;
use thiserror::Error;

use callscope_registry::ConnectionId;

/// Classified failure of one push attempt.
#[derive(Debug, Error)]
pub enum PushError {
    /// The target connection no longer exists. The only failure class that
    /// removes the connection from the registry.
    #[error("connection gone")]
    ConnectionGone,

    /// Transient transport trouble (network, throttling, slow consumer).
    /// Logged; the connection is retained.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Per (event, connection) result of one dispatch pass. Never persisted —
/// used only to drive registry pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    ConnectionGone,
}

/// Push-delivery primitive of the connection transport boundary.
///
/// Implementations must be `Send + Sync` so a single dispatcher can fan a
/// pass out across connections concurrently.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Deliver one serialized event to one connection.
    async fn push(&self, id: &ConnectionId, payload: &[u8]) -> Result<(), PushError>;
}
