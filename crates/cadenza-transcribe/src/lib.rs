//! # cadenza-transcribe — audio in, timed lyric windows out
//!
//! Library half of the cadenza relay: the gateway hands an audio payload to
//! the [`Transcriber`] adapter, gets a word-level [`Transcript`] back, and
//! buckets it into fixed-width [`Segment`] windows for lyric/subtitle sync.
//!
//! ```text
//! ┌──────────────┐   ┌───────────────────┐   ┌──────────────────┐
//! │ audio bytes  │ → │ Transcriber       │ → │ segment_transcript│
//! │ (upload/b64) │   │ (Whisper API)     │   │ (fixed windows)   │
//! └──────────────┘   └───────────────────┘   └──────────────────┘
//! ```
//!
//! Everything network-facing sits behind the [`Transcriber`] trait, so the
//! segmenter and HTTP surface test against [`PlaceholderTranscriber`].

pub mod config;
pub mod error;
pub mod segment;
pub mod stt;
pub mod transcript;

pub use config::{RelayConfig, DEFAULT_SEGMENT_DURATION, MAX_AUDIO_BYTES, UPSTREAM_TIMEOUT};
pub use error::{TranscribeError, TranscribeResult};
pub use segment::{segment_transcript, Segment};
pub use stt::{sanitize_filename, PlaceholderTranscriber, Transcriber, WhisperApi};
pub use transcript::{SourceSegment, Transcript, Word};
