//! **Speech-to-text adapter** — forwards one audio payload to the OpenAI
//! transcription API and returns a normalized [`Transcript`].
//!
//! Implement [`Transcriber`] for the production [`WhisperApi`] client or the
//! offline [`PlaceholderTranscriber`]; the gateway and segmenter only ever
//! see the trait, so nothing downstream touches the network in tests.

use crate::config::{RelayConfig, UPSTREAM_TIMEOUT};
use crate::error::{TranscribeError, TranscribeResult};
use crate::transcript::{SourceSegment, Transcript, Word};
use async_trait::async_trait;
use serde::Deserialize;
use std::io::Write;
use tempfile::NamedTempFile;

/// Fallback when the client sends no usable filename.
const DEFAULT_FILENAME: &str = "audio.mp3";

/// Backend for converting raw audio bytes into a [`Transcript`].
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one audio payload. `filename` is advisory (extension and
    /// upload name); the bytes are the source of truth.
    async fn transcribe(&self, audio: &[u8], filename: &str) -> TranscribeResult<Transcript>;
}

/// Production adapter: POST `{base}/audio/transcriptions` with word-level
/// timestamp granularity and a verbose_json response.
///
/// The payload is staged in a [`NamedTempFile`] for the duration of the call;
/// dropping the guard deletes the file on success, upstream failure, and IO
/// failure alike.
#[derive(Debug, Clone)]
pub struct WhisperApi {
    base_url: String,
    api_key: String,
    model: String,
    language: Option<String>,
    client: reqwest::Client,
}

impl WhisperApi {
    /// Build the client from an injected [`RelayConfig`].
    pub fn new(config: &RelayConfig) -> TranscribeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            language: config.language.clone(),
            client,
        })
    }
}

#[async_trait]
impl Transcriber for WhisperApi {
    async fn transcribe(&self, audio: &[u8], filename: &str) -> TranscribeResult<Transcript> {
        if audio.is_empty() {
            return Err(TranscribeError::InvalidInput("empty audio payload".into()));
        }

        let filename = sanitize_filename(filename);
        // Staged file lives until `staged` drops at the end of this call,
        // so every return path below releases it.
        let staged = stage_audio(audio, &filename)?;
        let staged_bytes = tokio::fs::read(staged.path()).await?;

        let part = reqwest::multipart::Part::bytes(staged_bytes)
            .file_name(filename.clone())
            .mime_str("audio/mpeg")?;
        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word");
        if let Some(lang) = &self.language {
            form = form.text("language", lang.clone());
        }

        let url = format!("{}/audio/transcriptions", self.base_url);
        tracing::debug!(target: "cadenza::stt", %url, %filename, bytes = audio.len(), "transcription request");

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            tracing::warn!(target: "cadenza::stt", status = status.as_u16(), "transcription API error");
            return Err(TranscribeError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let raw: VerboseTranscription = res.json().await?;
        let transcript = raw.into_transcript();
        tracing::info!(
            target: "cadenza::stt",
            duration = transcript.duration,
            words = transcript.words.len(),
            segments = transcript.source_segments.len(),
            "transcription complete"
        );
        Ok(transcript)
    }
}

/// Write the payload to a scoped temp file carrying the original extension.
fn stage_audio(audio: &[u8], filename: &str) -> TranscribeResult<NamedTempFile> {
    let suffix = std::path::Path::new(filename)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let mut staged = tempfile::Builder::new()
        .prefix("cadenza-")
        .suffix(&suffix)
        .tempfile()?;
    staged.write_all(audio)?;
    staged.flush()?;
    Ok(staged)
}

/// Strip path components and anything outside a conservative character set;
/// fall back to `audio.mp3` when nothing usable remains.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        cleaned
    }
}

/// verbose_json response shape. `words` and `segments` are optional: some
/// responses omit one or both, and the relay degrades to empty lists rather
/// than failing.
#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    #[serde(default)]
    text: String,
    #[serde(default)]
    language: String,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    segments: Vec<RawSegment>,
    #[serde(default)]
    words: Vec<RawWord>,
}

#[derive(Debug, Deserialize)]
struct RawWord {
    #[serde(default)]
    word: String,
    #[serde(default)]
    start: f64,
    #[serde(default)]
    end: f64,
}

#[derive(Debug, Deserialize)]
struct RawSegment {
    #[serde(default)]
    id: i64,
    #[serde(default)]
    start: f64,
    #[serde(default)]
    end: f64,
    #[serde(default)]
    text: String,
}

impl VerboseTranscription {
    fn into_transcript(self) -> Transcript {
        Transcript {
            full_text: self.text.trim().to_string(),
            language: self.language,
            duration: self.duration,
            words: self
                .words
                .into_iter()
                .map(|w| Word::new(w.word, w.start, w.end))
                .collect(),
            source_segments: self
                .segments
                .into_iter()
                .map(|s| SourceSegment {
                    id: s.id,
                    start: s.start,
                    end: s.end,
                    duration: s.end - s.start,
                    text: s.text.trim().to_string(),
                })
                .collect(),
        }
    }
}

/// Offline backend: returns a canned transcript. Lets the gateway and the
/// segmenter run without credentials or network.
#[derive(Debug, Default)]
pub struct PlaceholderTranscriber {
    /// If set, return this transcript instead of the empty default.
    pub transcript: Option<Transcript>,
}

impl PlaceholderTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transcript(transcript: Transcript) -> Self {
        Self {
            transcript: Some(transcript),
        }
    }
}

#[async_trait]
impl Transcriber for PlaceholderTranscriber {
    async fn transcribe(&self, _audio: &[u8], _filename: &str) -> TranscribeResult<Transcript> {
        match &self.transcript {
            Some(t) => Ok(t.clone()),
            None => Ok(Transcript::empty()),
        }
    }
}
