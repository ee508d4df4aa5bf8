use async_trait::async_trait;
use tokio::sync::mpsc::error::TrySendError;

use callscope_dispatch::{PushError, PushTransport};
use callscope_registry::ConnectionId;

use crate::lifecycle::LiveConnections;

/// Push delivery over the live WebSocket map.
///
/// A connection id with no live socket, or one whose outbound channel has
/// closed, is the stale-endpoint class — the dispatcher prunes it. A full
/// outbound queue means a slow consumer: transient, the viewer is retained
/// and simply misses this event.
pub struct WsPushTransport {
    live: LiveConnections,
}

impl WsPushTransport {
    pub fn new(live: LiveConnections) -> Self {
        Self { live }
    }
}

#[async_trait]
impl PushTransport for WsPushTransport {
    async fn push(&self, id: &ConnectionId, payload: &[u8]) -> Result<(), PushError> {
        let Some(entry) = self.live.get(id.as_str()) else {
            return Err(PushError::ConnectionGone);
        };

        // Payload is the envelope we serialized ourselves — always UTF-8.
        let text = String::from_utf8_lossy(payload).into_owned();
        match entry.value().try_send(text) {
            Ok(()) => Ok(()),
            Err(TrySendError::Closed(_)) => Err(PushError::ConnectionGone),
            Err(TrySendError::Full(_)) => {
                Err(PushError::Transport("outbound queue full".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use dashmap::DashMap;
    use tokio::sync::mpsc;

    use callscope_dispatch::FanoutDispatcher;
    use callscope_protocol::EventEnvelope;
    use callscope_registry::{db::init_db, ConnectionRegistry, SqliteRegistry};

    fn live_map() -> LiveConnections {
        Arc::new(DashMap::new())
    }

    #[tokio::test]
    async fn unknown_connection_is_gone() {
        let transport = WsPushTransport::new(live_map());
        let err = transport
            .push(&ConnectionId::from("nobody"), b"{}")
            .await
            .unwrap_err();
        assert!(matches!(err, PushError::ConnectionGone));
    }

    #[tokio::test]
    async fn closed_receiver_is_gone() {
        let live = live_map();
        let (tx, rx) = mpsc::channel(4);
        live.insert("conn-1".to_string(), tx);
        drop(rx);

        let transport = WsPushTransport::new(live);
        let err = transport
            .push(&ConnectionId::from("conn-1"), b"{}")
            .await
            .unwrap_err();
        assert!(matches!(err, PushError::ConnectionGone));
    }

    #[tokio::test]
    async fn full_queue_is_transient_not_gone() {
        let live = live_map();
        let (tx, _rx) = mpsc::channel(1);
        live.insert("slow".to_string(), tx);

        let transport = WsPushTransport::new(live);
        let id = ConnectionId::from("slow");
        transport.push(&id, b"first").await.unwrap();
        let err = transport.push(&id, b"second").await.unwrap_err();
        assert!(matches!(err, PushError::Transport(_)));
    }

    #[tokio::test]
    async fn delivered_payload_reaches_the_socket_queue() {
        let live = live_map();
        let (tx, mut rx) = mpsc::channel(4);
        live.insert("conn-1".to_string(), tx);

        let transport = WsPushTransport::new(live);
        transport
            .push(&ConnectionId::from("conn-1"), br#"{"detail":null}"#)
            .await
            .unwrap();
        assert_eq!(rx.try_recv().unwrap(), r#"{"detail":null}"#);
    }

    // Full path: ingress adapter -> bus -> dispatch pass. A streaming
    // fully-started event fires exactly one pipeline trigger and still
    // reaches every open connection unchanged.
    #[tokio::test]
    async fn streaming_started_triggers_pipeline_and_fans_out() {
        use std::sync::Mutex;

        use callscope_ingress::{
            AnalyticsTrigger, IngressAdapter, PipelineHandle, StreamSource, TriggerError,
        };

        struct CountingTrigger {
            pipelines: Mutex<Vec<(StreamSource, StreamSource)>>,
        }

        #[async_trait]
        impl AnalyticsTrigger for CountingTrigger {
            async fn create_analytics_pipeline(
                &self,
                customer: &StreamSource,
                agent: &StreamSource,
            ) -> Result<PipelineHandle, TriggerError> {
                self.pipelines
                    .lock()
                    .unwrap()
                    .push((customer.clone(), agent.clone()));
                Ok(PipelineHandle {
                    pipeline_id: "p-e2e".to_string(),
                })
            }

            async fn start_tone_analysis(
                &self,
                _connector_id: &str,
                _transaction_id: &str,
            ) -> Result<(), TriggerError> {
                Ok(())
            }
        }

        let conn = rusqlite::Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        let registry: Arc<dyn ConnectionRegistry> = Arc::new(SqliteRegistry::new(conn));

        let live = live_map();
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        live.insert("viewer-a".to_string(), tx_a);
        live.insert("viewer-b".to_string(), tx_b);
        registry.add(&ConnectionId::from("viewer-a")).unwrap();
        registry.add(&ConnectionId::from("viewer-b")).unwrap();

        let trigger = Arc::new(CountingTrigger {
            pipelines: Mutex::new(Vec::new()),
        });
        let (bus_tx, mut bus_rx) = mpsc::channel(8);
        let ingress = IngressAdapter::new(
            trigger.clone(),
            bus_tx,
            Duration::from_millis(100),
        );

        let envelope = EventEnvelope::new(
            "StreamingStatus",
            serde_json::json!({
                "streamingStatus": "ALL_STARTED",
                "streams": [
                    {"streamId": "s-cust", "startCursor": "A", "role": "CUSTOMER"},
                    {"streamId": "s-agent", "startCursor": "B", "role": "AGENT"},
                ],
            }),
        );
        ingress.ingest(envelope).await.unwrap();

        // Exactly one pipeline trigger, bound by role with its cursor.
        {
            let pipelines = trigger.pipelines.lock().unwrap();
            assert_eq!(pipelines.len(), 1);
            let (customer, agent) = &pipelines[0];
            assert_eq!(customer.stream_id, "s-cust");
            assert_eq!(customer.start_cursor, "A");
            assert_eq!(agent.stream_id, "s-agent");
            assert_eq!(agent.start_cursor, "B");
        }

        // Drain the bus into a dispatch pass, like the gateway loop does.
        let transport = Arc::new(WsPushTransport::new(live));
        let dispatcher =
            FanoutDispatcher::new(registry, transport, Duration::from_millis(100));
        let forwarded = bus_rx.recv().await.unwrap();
        let summary = dispatcher.dispatch(&forwarded).await.unwrap();
        assert_eq!(summary.delivered, 2);

        for rx in [&mut rx_a, &mut rx_b] {
            let delivered: EventEnvelope = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
            assert_eq!(delivered.detail_type.as_deref(), Some("StreamingStatus"));
            assert_eq!(delivered.detail["streamingStatus"], "ALL_STARTED");
        }
    }

    // End-to-end over the real pieces: sqlite registry + ws transport +
    // dispatcher. A registered id with no live socket is pruned; live
    // viewers receive events in dispatch order.
    #[tokio::test]
    async fn dispatch_prunes_dead_and_preserves_order_for_live_viewers() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        let registry: Arc<dyn ConnectionRegistry> = Arc::new(SqliteRegistry::new(conn));

        let live = live_map();
        let (tx, mut rx) = mpsc::channel(8);
        live.insert("viewer".to_string(), tx);

        registry.add(&ConnectionId::from("viewer")).unwrap();
        registry.add(&ConnectionId::from("ghost")).unwrap();

        let transport = Arc::new(WsPushTransport::new(live));
        let dispatcher =
            FanoutDispatcher::new(Arc::clone(&registry), transport, Duration::from_millis(100));

        let first = EventEnvelope::new(
            "Transcript",
            serde_json::json!({"channel": "ch_0", "text": "one", "final": true}),
        );
        let second = EventEnvelope::new(
            "Transcript",
            serde_json::json!({"channel": "ch_0", "text": "two", "final": true}),
        );

        let summary = dispatcher.dispatch(&first).await.unwrap();
        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.pruned, 1);
        dispatcher.dispatch(&second).await.unwrap();

        // Ghost is gone from the registry after the first pass.
        assert_eq!(
            registry.list_all().unwrap(),
            vec![ConnectionId::from("viewer")]
        );

        // The live viewer saw both events, in dispatch order.
        let one: EventEnvelope = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        let two: EventEnvelope = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(one.detail["text"], "one");
        assert_eq!(two.detail["text"], "two");
    }
}
