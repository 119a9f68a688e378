//! Wire types at the boundary between STT backends and the fusion core.
//!
//! Whatever fetches transcripts (an orchestration script, a replay tool, a
//! test fixture) converts each backend's native response into a
//! [`SourceTranscript`] before handing it to the consensus pipeline. This
//! keeps the core free of provider dependencies: Deepgram, Whisper, Naver
//! and friends all flatten to the same shape here.

/// One timed phrase (or word) as reported by a backend.
///
/// Times are in float seconds, as providers report them. `confidence` is
/// `None` when the backend reports no confidence signal at all — downstream
/// voting treats "unknown confidence" differently from "low confidence", so
/// absence must never be collapsed into a default number at this layer.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Entry {
    pub text: String,
    pub start: f64,
    pub end: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// One backend's complete output for a clip.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SourceTranscript {
    pub source: String,
    pub entries: Vec<Entry>,
}

impl Entry {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_confidence_deserializes_as_none() {
        let json = r#"{"source":"whisper","entries":[{"text":"hello","start":0.1,"end":0.5}]}"#;
        let t: SourceTranscript = serde_json::from_str(json).unwrap();
        assert_eq!(t.source, "whisper");
        assert_eq!(t.entries[0].confidence, None);
    }

    #[test]
    fn present_confidence_survives() {
        let json = r#"{"text":"hello","start":0.1,"end":0.5,"confidence":0.9}"#;
        let e: Entry = serde_json::from_str(json).unwrap();
        assert_eq!(e.confidence, Some(0.9));
    }
}
