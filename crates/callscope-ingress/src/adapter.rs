use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use callscope_protocol::envelope::{ANALYTICS_READY, STREAMING_ALL_STARTED};
use callscope_protocol::{
    EventCategory, EventEnvelope, ParticipantRole, StreamingStatusDetail,
    VoiceAnalyticsStatusDetail,
};

use crate::error::{IngressError, Result};
use crate::trigger::{AnalyticsTrigger, StreamSource};

/// Accepts one raw event at a time from the upstream channel.
///
/// Every event is forwarded onto the dispatch bus first; the status
/// categories that mark a call as analyzable then fire their upstream
/// trigger. The two steps are isolated: a trigger failure (or timeout, or a
/// mis-shaped detail) is logged and the event still reaches viewers.
pub struct IngressAdapter {
    trigger: Arc<dyn AnalyticsTrigger>,
    forward_tx: mpsc::Sender<EventEnvelope>,
    trigger_timeout: Duration,
}

impl IngressAdapter {
    pub fn new(
        trigger: Arc<dyn AnalyticsTrigger>,
        forward_tx: mpsc::Sender<EventEnvelope>,
        trigger_timeout: Duration,
    ) -> Self {
        Self {
            trigger,
            forward_tx,
            trigger_timeout,
        }
    }

    /// Ingest one event: forward, then run any side effects.
    pub async fn ingest(&self, envelope: EventEnvelope) -> Result<()> {
        let category = envelope.category();
        if envelope.detail_type.is_none() {
            // Malformed events keep flowing so the dashboard can show them raw.
            warn!("event missing detail-type, forwarding as generic notification");
        }

        self.forward_tx
            .send(envelope.clone())
            .await
            .map_err(|_| IngressError::BusClosed)?;

        match category {
            EventCategory::StreamingStatus => self.maybe_create_pipeline(&envelope).await,
            EventCategory::VoiceAnalyticsStatus => self.maybe_start_tone_analysis(&envelope).await,
            _ => {}
        }
        Ok(())
    }

    /// `ALL_STARTED` with both party roles present starts the pipeline.
    async fn maybe_create_pipeline(&self, envelope: &EventEnvelope) {
        let detail: StreamingStatusDetail = match envelope.decode_detail() {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "unreadable streaming-status detail, skipping trigger");
                return;
            }
        };
        if detail.streaming_status != STREAMING_ALL_STARTED {
            return;
        }

        let (Some(customer), Some(agent)) = (
            detail.stream_for(ParticipantRole::Customer),
            detail.stream_for(ParticipantRole::Agent),
        ) else {
            warn!("streaming fully started without both party streams, skipping trigger");
            return;
        };

        let customer = StreamSource {
            stream_id: customer.stream_id.clone(),
            start_cursor: customer.start_cursor.clone(),
        };
        let agent = StreamSource {
            stream_id: agent.stream_id.clone(),
            start_cursor: agent.start_cursor.clone(),
        };

        match tokio::time::timeout(
            self.trigger_timeout,
            self.trigger.create_analytics_pipeline(&customer, &agent),
        )
        .await
        {
            Ok(Ok(handle)) => {
                info!(pipeline_id = %handle.pipeline_id, "analytics pipeline started")
            }
            Ok(Err(e)) => warn!(error = %e, "pipeline creation failed"),
            Err(_) => warn!(
                timeout_ms = self.trigger_timeout.as_millis() as u64,
                "pipeline creation timed out"
            ),
        }
    }

    /// `AnalyticsReady` starts tone analysis for the call leg.
    async fn maybe_start_tone_analysis(&self, envelope: &EventEnvelope) {
        let detail: VoiceAnalyticsStatusDetail = match envelope.decode_detail() {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "unreadable voice-analytics detail, skipping trigger");
                return;
            }
        };
        if detail.detail_status != ANALYTICS_READY {
            return;
        }

        match tokio::time::timeout(
            self.trigger_timeout,
            self.trigger
                .start_tone_analysis(&detail.connector_id, &detail.transaction_id),
        )
        .await
        {
            Ok(Ok(())) => info!(
                connector_id = %detail.connector_id,
                transaction_id = %detail.transaction_id,
                "tone analysis started"
            ),
            Ok(Err(e)) => warn!(error = %e, "tone analysis start failed"),
            Err(_) => warn!(
                timeout_ms = self.trigger_timeout.as_millis() as u64,
                "tone analysis start timed out"
            ),
        }
    }
}
