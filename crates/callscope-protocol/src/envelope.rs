use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

// Recognized `detail-type` discriminants. Anything else is a generic
// notification and passes through unchanged.
pub const TRANSCRIPT: &str = "Transcript";
pub const VOICE_TONE_SENTIMENT: &str = "VoiceToneSentiment";
pub const RECORDING: &str = "Recording";
pub const VOICE_ANALYTICS_STATUS: &str = "VoiceAnalyticsStatus";
pub const STREAMING_STATUS: &str = "StreamingStatus";
pub const PIPELINE_STATE_CHANGE: &str = "PipelineStateChange";

/// `streamingStatus` value that marks a call as analyzable.
pub const STREAMING_ALL_STARTED: &str = "ALL_STARTED";
/// `detailStatus` value that allows tone analysis to start.
pub const ANALYTICS_READY: &str = "AnalyticsReady";

/// Event category derived from the `detail-type` discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    Transcript,
    Sentiment,
    Recording,
    VoiceAnalyticsStatus,
    StreamingStatus,
    PipelineState,
    Generic,
}

/// The one JSON envelope shared by the upstream channel and the viewer-facing
/// push payload.
/// Wire: `{ "detail-type": "Transcript", "timestamp": "...", "detail": {...} }`
///
/// Every field is tolerant: an envelope with no discriminant is a malformed
/// event that still classifies as [`EventCategory::Generic`] and is forwarded
/// verbatim. Unrecognized top-level fields survive a round trip through the
/// flattened `extra` map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(
        rename = "detail-type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub detail_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub detail: Value,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl EventEnvelope {
    pub fn new(detail_type: impl Into<String>, detail: impl Serialize) -> Self {
        Self {
            detail_type: Some(detail_type.into()),
            timestamp: None,
            detail: serde_json::to_value(detail).unwrap_or(Value::Null),
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Build an envelope from arbitrary inbound JSON.
    ///
    /// A JSON object maps onto the envelope fields directly; any non-object
    /// value is wrapped whole into `detail` so it can still be forwarded.
    pub fn from_raw(value: Value) -> Self {
        match serde_json::from_value::<EventEnvelope>(value.clone()) {
            Ok(envelope) => envelope,
            Err(_) => Self {
                detail_type: None,
                timestamp: None,
                detail: value,
                extra: serde_json::Map::new(),
            },
        }
    }

    /// Classify by discriminant. Missing or unknown discriminants are Generic.
    pub fn category(&self) -> EventCategory {
        match self.detail_type.as_deref() {
            Some(TRANSCRIPT) => EventCategory::Transcript,
            Some(VOICE_TONE_SENTIMENT) => EventCategory::Sentiment,
            Some(RECORDING) => EventCategory::Recording,
            Some(VOICE_ANALYTICS_STATUS) => EventCategory::VoiceAnalyticsStatus,
            Some(STREAMING_STATUS) => EventCategory::StreamingStatus,
            Some(PIPELINE_STATE_CHANGE) => EventCategory::PipelineState,
            _ => EventCategory::Generic,
        }
    }

    /// Deserialize `detail` into a typed payload.
    pub fn decode_detail<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.detail.clone())
    }
}
