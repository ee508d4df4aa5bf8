use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;

use callscope_protocol::payloads::AGENT_CHANNEL;
use callscope_protocol::{
    EventCategory, EventEnvelope, RecordingStatus, SentimentSample, ToneScore, TranscriptSegment,
};

/// Which side of the call a view item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeakerRole {
    Customer,
    Agent,
}

impl SpeakerRole {
    pub fn label(&self) -> &'static str {
        match self {
            SpeakerRole::Customer => "Customer",
            SpeakerRole::Agent => "Agent",
        }
    }
}

/// Channel zero is the agent leg; every other channel is the customer.
pub fn speaker_role(channel: &str) -> SpeakerRole {
    if channel == AGENT_CHANNEL {
        SpeakerRole::Agent
    } else {
        SpeakerRole::Customer
    }
}

/// Collapse a score triple into the single chart value:
/// positive pulls up, negative pulls down, neutral contributes nothing.
pub fn merged_tone_score(score: &ToneScore) -> f64 {
    score.positive * 1.5 - score.negative * 1.5
}

/// One rendered transcript line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub role: SpeakerRole,
    pub text: String,
}

impl TranscriptLine {
    /// Render as the dashboard shows it: `[Agent] hello`.
    pub fn render(&self) -> String {
        format!("[{}] {}", self.role.label(), self.text)
    }
}

/// One point on a sentiment series.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentPoint {
    /// End of the analysis window this sample averages over, when known.
    pub at: Option<String>,
    pub value: f64,
}

/// Live dashboard state rebuilt from the delivered event stream.
///
/// The view holds no history of its own: on reconnect it starts empty and
/// rebuilds from subsequently delivered events only. Events are applied in
/// delivery order by a single consumption loop; later events supersede
/// earlier ones only here, never upstream.
#[derive(Debug, Default)]
pub struct LiveView {
    /// Finalized transcript lines, in arrival order.
    pub transcript: Vec<TranscriptLine>,
    /// Transient partial line per speaker, replaced until finalized.
    pub current_line: HashMap<SpeakerRole, TranscriptLine>,
    pub customer_sentiment: Vec<SentimentPoint>,
    pub agent_sentiment: Vec<SentimentPoint>,
    /// Latest-wins recording location.
    pub recording_location: Option<String>,
    /// Append-only raw log of every other delivered category.
    pub notifications: Vec<EventEnvelope>,
}

impl LiveView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one delivered event to the view.
    pub fn apply(&mut self, envelope: &EventEnvelope) {
        match envelope.category() {
            EventCategory::Transcript => self.apply_transcript(envelope),
            EventCategory::Sentiment => self.apply_sentiment(envelope),
            EventCategory::Recording => self.apply_recording(envelope),
            _ => self.notifications.push(envelope.clone()),
        }
    }

    fn apply_transcript(&mut self, envelope: &EventEnvelope) {
        let segment: TranscriptSegment = match envelope.decode_detail() {
            Ok(s) => s,
            Err(e) => {
                debug!(error = %e, "unreadable transcript detail, keeping raw");
                self.notifications.push(envelope.clone());
                return;
            }
        };

        let role = speaker_role(&segment.channel);
        let line = TranscriptLine {
            role,
            text: segment.text,
        };
        if segment.is_final {
            self.transcript.push(line);
            self.current_line.remove(&role);
        } else {
            self.current_line.insert(role, line);
        }
    }

    fn apply_sentiment(&mut self, envelope: &EventEnvelope) {
        let sample: SentimentSample = match envelope.decode_detail() {
            Ok(s) => s,
            Err(e) => {
                debug!(error = %e, "unreadable sentiment detail, keeping raw");
                self.notifications.push(envelope.clone());
                return;
            }
        };

        let point = SentimentPoint {
            at: sample.window_end.clone(),
            value: merged_tone_score(&sample.score),
        };
        if sample.is_caller {
            self.agent_sentiment.push(point);
        } else {
            self.customer_sentiment.push(point);
        }
    }

    fn apply_recording(&mut self, envelope: &EventEnvelope) {
        let status: RecordingStatus = match envelope.decode_detail() {
            Ok(s) => s,
            Err(e) => {
                debug!(error = %e, "unreadable recording detail, keeping raw");
                self.notifications.push(envelope.clone());
                return;
            }
        };
        self.recording_location = Some(status.location);
    }

    /// Full finished transcript, one rendered line per row.
    pub fn full_transcript(&self) -> String {
        self.transcript
            .iter()
            .map(TranscriptLine::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Single stream-consumption loop: drains delivered events into the shared
/// view until the channel closes.
pub async fn consume(mut rx: mpsc::Receiver<EventEnvelope>, view: Arc<Mutex<LiveView>>) {
    while let Some(envelope) = rx.recv().await {
        view.lock().unwrap().apply(&envelope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(channel: &str, text: &str, is_final: bool) -> EventEnvelope {
        EventEnvelope::new(
            "Transcript",
            serde_json::json!({"channel": channel, "text": text, "final": is_final}),
        )
    }

    fn sentiment(positive: f64, negative: f64, neutral: f64, is_caller: bool) -> EventEnvelope {
        EventEnvelope::new(
            "VoiceToneSentiment",
            serde_json::json!({
                "windowEnd": "2026-08-06T12:00:05Z",
                "score": {"positive": positive, "negative": negative, "neutral": neutral},
                "isCaller": is_caller,
            }),
        )
    }

    #[test]
    fn agent_channel_renders_with_agent_prefix() {
        let mut view = LiveView::new();
        view.apply(&transcript("ch_0", "hello", true));

        assert_eq!(view.transcript[0].render(), "[Agent] hello");
    }

    #[test]
    fn any_other_channel_renders_as_customer() {
        let mut view = LiveView::new();
        view.apply(&transcript("ch_1", "hi there", true));
        view.apply(&transcript("ch_99", "still me", true));

        assert_eq!(view.transcript[0].render(), "[Customer] hi there");
        assert_eq!(view.transcript[1].render(), "[Customer] still me");
    }

    #[test]
    fn partial_then_final_leaves_one_line_and_empty_slot() {
        let mut view = LiveView::new();
        view.apply(&transcript("ch_0", "hel", false));
        assert_eq!(
            view.current_line[&SpeakerRole::Agent].text,
            "hel".to_string()
        );
        assert!(view.transcript.is_empty());

        view.apply(&transcript("ch_0", "hello", true));
        assert_eq!(view.transcript.len(), 1);
        assert_eq!(view.transcript[0].text, "hello");
        assert!(view.current_line.get(&SpeakerRole::Agent).is_none());
    }

    #[test]
    fn partials_replace_per_speaker_independently() {
        let mut view = LiveView::new();
        view.apply(&transcript("ch_0", "agent says", false));
        view.apply(&transcript("ch_1", "customer says", false));
        view.apply(&transcript("ch_0", "agent says more", false));

        assert_eq!(view.current_line.len(), 2);
        assert_eq!(
            view.current_line[&SpeakerRole::Agent].text,
            "agent says more"
        );
        assert_eq!(
            view.current_line[&SpeakerRole::Customer].text,
            "customer says"
        );
    }

    #[test]
    fn merged_scalar_matches_contract() {
        let score = ToneScore {
            positive: 0.8,
            negative: 0.1,
            neutral: 0.1,
        };
        assert!((merged_tone_score(&score) - 1.05).abs() < 1e-9);
    }

    #[test]
    fn sentiment_routes_by_subject_flag() {
        let mut view = LiveView::new();
        view.apply(&sentiment(0.8, 0.1, 0.1, true));
        view.apply(&sentiment(0.2, 0.6, 0.2, false));

        assert_eq!(view.agent_sentiment.len(), 1);
        assert!((view.agent_sentiment[0].value - 1.05).abs() < 1e-9);
        assert_eq!(view.customer_sentiment.len(), 1);
        assert!((view.customer_sentiment[0].value - (-0.6)).abs() < 1e-9);
    }

    #[test]
    fn recording_location_is_latest_wins() {
        let mut view = LiveView::new();
        view.apply(&EventEnvelope::new(
            "Recording",
            serde_json::json!({"location": "s3://bucket/one.wav"}),
        ));
        view.apply(&EventEnvelope::new(
            "Recording",
            serde_json::json!({"location": "s3://bucket/two.wav"}),
        ));

        assert_eq!(
            view.recording_location.as_deref(),
            Some("s3://bucket/two.wav")
        );
    }

    #[test]
    fn unknown_categories_land_in_the_raw_log() {
        let mut view = LiveView::new();
        let env = EventEnvelope::new("SomeNewThing", serde_json::json!({"x": 1}));
        view.apply(&env);
        view.apply(&EventEnvelope::new(
            "PipelineStateChange",
            serde_json::json!({"state": "InProgress"}),
        ));

        assert_eq!(view.notifications.len(), 2);
        assert_eq!(view.notifications[0].detail["x"], 1);
        assert!(view.transcript.is_empty());
    }

    #[test]
    fn malformed_transcript_detail_is_kept_raw() {
        let mut view = LiveView::new();
        view.apply(&EventEnvelope::new(
            "Transcript",
            serde_json::json!({"nonsense": true}),
        ));

        assert!(view.transcript.is_empty());
        assert_eq!(view.notifications.len(), 1);
    }

    #[test]
    fn full_transcript_joins_lines_in_order() {
        let mut view = LiveView::new();
        view.apply(&transcript("ch_0", "hello", true));
        view.apply(&transcript("ch_1", "hi", true));

        assert_eq!(view.full_transcript(), "[Agent] hello\n[Customer] hi");
    }

    #[tokio::test]
    async fn consume_applies_events_in_delivery_order() {
        let (tx, rx) = mpsc::channel(8);
        let view = Arc::new(Mutex::new(LiveView::new()));
        let task = tokio::spawn(consume(rx, Arc::clone(&view)));

        // e1 ingressed strictly before e2 — effects must apply in order.
        tx.send(transcript("ch_0", "first", true)).await.unwrap();
        tx.send(transcript("ch_0", "second", true)).await.unwrap();
        drop(tx);
        task.await.unwrap();

        let view = view.lock().unwrap();
        assert_eq!(view.transcript[0].text, "first");
        assert_eq!(view.transcript[1].text, "second");
    }
}
