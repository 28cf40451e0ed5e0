//! Buckets word-level transcripts into fixed-width time windows.
//!
//! The timeline `[0, duration)` is tiled with windows of `segment_duration`
//! seconds; each word lands in exactly one window, chosen by its start time.
//! Downstream lyric/subtitle sync reads the windows in order.

use crate::error::{TranscribeError, TranscribeResult};
use crate::transcript::{Transcript, Word};
use serde::{Deserialize, Serialize};

/// One fixed-width window of the audio timeline, annotated with the words
/// that start inside it. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: usize,
    /// Window start in seconds, rounded to 2 decimals.
    pub start: f64,
    /// Window end in seconds (clamped to the total duration), rounded to 2 decimals.
    pub end: f64,
    pub duration: f64,
    pub has_content: bool,
    /// Assigned words joined by single spaces, trimmed.
    pub text: String,
    pub word_count: usize,
    pub words: Vec<Word>,
}

/// Partition `transcript` into windows of `segment_duration` seconds.
///
/// Window `i` covers `[i*d, min((i+1)*d, duration))`. A word is assigned to
/// the window containing its **start** time (half-open), so a word starting
/// exactly on a boundary belongs to the later window, and a word that starts
/// before a boundary and rings past it stays in the earlier one.
///
/// Fails with [`TranscribeError::InvalidInput`] when `segment_duration` is
/// zero, negative, or NaN.
pub fn segment_transcript(
    transcript: &Transcript,
    segment_duration: f64,
) -> TranscribeResult<Vec<Segment>> {
    if !(segment_duration > 0.0) {
        return Err(TranscribeError::InvalidInput(format!(
            "segment_duration must be > 0, got {segment_duration}"
        )));
    }

    let total_duration = transcript.duration.max(0.0);

    // floor + 1, not ceil: when the duration is an exact multiple of the
    // window width this leaves one trailing zero-width window. Known quirk,
    // kept as-is; existing consumers of the relay see that extra window
    // and may count on it.
    let total_segments = (total_duration / segment_duration).floor() as usize + 1;

    let mut segments = Vec::with_capacity(total_segments);
    for i in 0..total_segments {
        let start = i as f64 * segment_duration;
        let end = ((i + 1) as f64 * segment_duration).min(total_duration);

        let words: Vec<Word> = transcript
            .words
            .iter()
            .filter(|w| w.start >= start && w.start < end)
            .cloned()
            .collect();

        let text = words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string();

        segments.push(Segment {
            id: i,
            start: round2(start),
            end: round2(end),
            duration: round2(end - start),
            has_content: !words.is_empty(),
            word_count: words.len(),
            text,
            words,
        });
    }

    Ok(segments)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
