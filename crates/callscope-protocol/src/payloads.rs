use serde::{Deserialize, Serialize};

/// The agent leg of a two-party call is always channel zero; every other
/// channel identity belongs to the customer.
pub const AGENT_CHANNEL: &str = "ch_0";

/// One transcription result for a single channel.
///
/// Partial segments replace the speaker's current line on the dashboard;
/// a final segment appends to the finished transcript and clears the slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    /// Channel identity (`"ch_0"` = agent leg).
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    pub text: String,
    #[serde(rename = "final")]
    pub is_final: bool,
}

/// Per-class voice-tone probabilities over one analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneScore {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

/// One averaged voice-tone sample for one party.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentSample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_end: Option<String>,
    pub score: ToneScore,
    /// Subject role flag: `true` samples belong to the agent series on the
    /// dashboard, everything else to the customer series.
    pub is_caller: bool,
}

/// Where the call recording landed. Latest value wins client-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingStatus {
    pub location: String,
}

/// Status detail for the voice-analytics session of one call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceAnalyticsStatusDetail {
    pub detail_status: String,
    pub connector_id: String,
    pub transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_caller: Option<bool>,
}

/// Role tag carried on each stream of a streaming-status event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantRole {
    Customer,
    Agent,
}

/// One media stream named by a streaming-status event: a correlation
/// identifier plus the cursor analysis should start from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDescriptor {
    pub stream_id: String,
    pub start_cursor: String,
    pub role: ParticipantRole,
}

/// Detail of a streaming-status event. `ALL_STARTED` with both roles present
/// is the signal that the call has become analyzable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingStatusDetail {
    pub streaming_status: String,
    #[serde(default)]
    pub streams: Vec<StreamDescriptor>,
}

impl StreamingStatusDetail {
    /// Find the stream carrying the given role tag.
    pub fn stream_for(&self, role: ParticipantRole) -> Option<&StreamDescriptor> {
        self.streams.iter().find(|s| s.role == role)
    }
}
