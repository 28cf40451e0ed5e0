//! Transcript data model — the normalized output of one transcription call.

use serde::{Deserialize, Serialize};

/// A single transcribed token with start/end timestamps in seconds.
///
/// The text field travels as `"word"` on the wire, matching the upstream
/// transcription API and the consumers already reading this relay's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    #[serde(rename = "word")]
    pub text: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds (>= start)
    pub end: f64,
}

impl Word {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }
}

/// A segment as reported by the transcription provider itself (phrase-level,
/// variable width). Passed through untouched on the raw transcript route;
/// the fixed-width windows downstream consumers sync to are computed by
/// [`crate::segment::segment_transcript`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSegment {
    pub id: i64,
    pub start: f64,
    pub end: f64,
    pub text: String,
    /// end - start, precomputed for consumers.
    pub duration: f64,
}

/// Full output of the transcription adapter for one audio input.
///
/// Owned by a single request and discarded after segmentation. `words` and
/// `source_segments` are empty when the provider response omits them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub full_text: String,
    pub language: String,
    /// Total audio duration in seconds
    pub duration: f64,
    pub words: Vec<Word>,
    pub source_segments: Vec<SourceSegment>,
}

impl Transcript {
    /// Empty transcript with zero duration; the shape every route degrades to
    /// when the provider returns no timing data.
    pub fn empty() -> Self {
        Self {
            full_text: String::new(),
            language: String::new(),
            duration: 0.0,
            words: Vec::new(),
            source_segments: Vec::new(),
        }
    }
}
