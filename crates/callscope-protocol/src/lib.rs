pub mod envelope;
pub mod payloads;

pub use envelope::{EventCategory, EventEnvelope};
pub use payloads::{
    ParticipantRole, RecordingStatus, SentimentSample, StreamDescriptor, StreamingStatusDetail,
    ToneScore, TranscriptSegment, VoiceAnalyticsStatusDetail,
};
