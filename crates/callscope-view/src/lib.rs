pub mod view;

pub use view::{
    consume, merged_tone_score, speaker_role, LiveView, SentimentPoint, SpeakerRole,
    TranscriptLine,
};
