use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Language the tone-analysis task is started with.
const TONE_ANALYSIS_LANGUAGE: &str = "en-US";

/// One media stream handed to pipeline creation: a correlation identifier
/// plus the cursor analysis starts from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSource {
    pub stream_id: String,
    pub start_cursor: String,
}

/// Handle returned by pipeline creation, opaque to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineHandle {
    pub pipeline_id: String,
}

#[derive(Debug, Error)]
pub enum TriggerError {
    /// The request could not be sent or the response not read.
    #[error("trigger request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status.
    #[error("trigger endpoint rejected the request: status {status}")]
    Rejected { status: u16 },
}

/// Upstream action triggers fired when a call becomes analyzable.
///
/// Both calls are fire-and-forget from the ingress adapter's perspective:
/// failures are logged, never propagated to viewer-facing delivery. The
/// trait seam exists so tests can verify call arguments with a double.
#[async_trait]
pub trait AnalyticsTrigger: Send + Sync {
    /// Start the analytics pipeline for a two-party call. The customer and
    /// agent streams carry their own correlation identifiers and cursors.
    async fn create_analytics_pipeline(
        &self,
        customer: &StreamSource,
        agent: &StreamSource,
    ) -> Result<PipelineHandle, TriggerError>;

    /// Start voice-tone analysis for one call leg.
    async fn start_tone_analysis(
        &self,
        connector_id: &str,
        transaction_id: &str,
    ) -> Result<(), TriggerError>;
}

/// HTTP implementation posting to two configured opaque endpoints.
pub struct HttpAnalyticsTrigger {
    client: reqwest::Client,
    pipeline_endpoint: String,
    tone_endpoint: String,
}

impl HttpAnalyticsTrigger {
    pub fn new(pipeline_endpoint: impl Into<String>, tone_endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            pipeline_endpoint: pipeline_endpoint.into(),
            tone_endpoint: tone_endpoint.into(),
        }
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, TriggerError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| TriggerError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TriggerError::Rejected {
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl AnalyticsTrigger for HttpAnalyticsTrigger {
    async fn create_analytics_pipeline(
        &self,
        customer: &StreamSource,
        agent: &StreamSource,
    ) -> Result<PipelineHandle, TriggerError> {
        // Fresh correlation id per request, carried through for tracing.
        let request_id = uuid::Uuid::new_v4().to_string();
        let body = serde_json::json!({
            "requestId": request_id,
            "streams": [
                {
                    "streamId": customer.stream_id,
                    "startCursor": customer.start_cursor,
                    "channel": 0,
                    "role": "CUSTOMER",
                },
                {
                    "streamId": agent.stream_id,
                    "startCursor": agent.start_cursor,
                    "channel": 1,
                    "role": "AGENT",
                },
            ],
        });

        debug!(request_id = %request_id, "requesting analytics pipeline");
        let response = self.post_json(&self.pipeline_endpoint, &body).await?;
        response
            .json::<PipelineHandle>()
            .await
            .map_err(|e| TriggerError::Request(e.to_string()))
    }

    async fn start_tone_analysis(
        &self,
        connector_id: &str,
        transaction_id: &str,
    ) -> Result<(), TriggerError> {
        let body = serde_json::json!({
            "connectorId": connector_id,
            "transactionId": transaction_id,
            "languageCode": TONE_ANALYSIS_LANGUAGE,
        });

        debug!(connector_id, transaction_id, "requesting tone analysis");
        self.post_json(&self.tone_endpoint, &body).await?;
        Ok(())
    }
}
