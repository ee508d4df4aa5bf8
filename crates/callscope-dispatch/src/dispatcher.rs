use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{info, warn};

use callscope_protocol::EventEnvelope;
use callscope_registry::{ConnectionId, ConnectionRegistry};

use crate::error::Result;
use crate::transport::{PushError, PushTransport};

/// Counters for one dispatch pass, logged and returned for tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Connections read from the registry at the start of the pass.
    pub attempted: usize,
    pub delivered: usize,
    /// Connections proven gone and removed from the registry.
    pub pruned: usize,
    /// Transient failures — connection retained, no retry within the pass.
    pub failed: usize,
}

/// Internal classification of one delivery attempt.
enum Attempt {
    Delivered,
    Gone,
    Failed,
}

/// Fans one event out to every believed-open connection.
///
/// Each pass reads the full connection set, serializes the event once, and
/// attempts one push per connection. Pushes within a pass run concurrently
/// and in isolation — one connection's failure never aborts delivery to the
/// others. A stale-endpoint failure prunes that connection from the registry;
/// this is the only cleanup path, there is no separate reaper. The caller is
/// expected to feed passes one event at a time in arrival order, which keeps
/// per-connection event ordering intact.
pub struct FanoutDispatcher {
    registry: Arc<dyn ConnectionRegistry>,
    transport: Arc<dyn PushTransport>,
    push_timeout: Duration,
}

impl FanoutDispatcher {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        transport: Arc<dyn PushTransport>,
        push_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            transport,
            push_timeout,
        }
    }

    /// Run one dispatch pass for one event.
    pub async fn dispatch(&self, envelope: &EventEnvelope) -> Result<DispatchSummary> {
        let payload = serde_json::to_vec(envelope)?;
        let ids = self.registry.list_all()?;

        let attempts = join_all(ids.iter().map(|id| self.deliver(id, &payload))).await;

        let mut summary = DispatchSummary {
            attempted: ids.len(),
            ..DispatchSummary::default()
        };
        for (id, attempt) in ids.iter().zip(attempts) {
            match attempt {
                Attempt::Delivered => summary.delivered += 1,
                Attempt::Gone => {
                    if let Err(e) = self.registry.remove(id) {
                        warn!(conn_id = %id, error = %e, "failed to prune gone connection");
                    }
                    summary.pruned += 1;
                }
                Attempt::Failed => summary.failed += 1,
            }
        }

        info!(
            detail_type = envelope.detail_type.as_deref().unwrap_or("<none>"),
            attempted = summary.attempted,
            delivered = summary.delivered,
            pruned = summary.pruned,
            failed = summary.failed,
            "dispatch pass complete"
        );
        Ok(summary)
    }

    /// One push attempt under the configured timeout. At most once per
    /// connection per pass; the classification decides retention.
    async fn deliver(&self, id: &ConnectionId, payload: &[u8]) -> Attempt {
        match tokio::time::timeout(self.push_timeout, self.transport.push(id, payload)).await {
            Ok(Ok(())) => Attempt::Delivered,
            Ok(Err(PushError::ConnectionGone)) => {
                info!(conn_id = %id, "stale connection detected during push");
                Attempt::Gone
            }
            Ok(Err(PushError::Transport(reason))) => {
                warn!(conn_id = %id, %reason, "push failed, connection retained");
                Attempt::Failed
            }
            Err(_) => {
                // A timeout cannot prove the peer is gone — retain.
                warn!(
                    conn_id = %id,
                    timeout_ms = self.push_timeout.as_millis() as u64,
                    "push timed out, connection retained"
                );
                Attempt::Failed
            }
        }
    }
}
