//! Relay configuration loaded from the environment.
//!
//! Read once at startup into an explicit struct and injected into the
//! adapter; business logic never touches ambient environment variables.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | OPENAI_API_KEY | (required) | Bearer key for the transcription API. The gateway refuses to start without it. |
//! | PORT | 5000 | Listen port for the gateway. |
//! | STT_API_URL | https://api.openai.com/v1 | Base URL of the transcription API (point at a stub for tests). |
//! | WHISPER_MODEL | whisper-1 | Transcription model name. |
//! | WHISPER_LANGUAGE | (unset) | When set, pins the upstream `language` field; unset = auto-detect. |

use crate::error::{TranscribeError, TranscribeResult};
use std::time::Duration;

/// Upstream provider limit on audio payload size (25 MB). Callers reject
/// larger payloads before the adapter runs.
pub const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// Ceiling on one upstream call. Transcribing several minutes of audio is
/// slow, so the ceiling is minutes, not seconds.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(300);

/// Window width used when a request does not specify `segment_duration`.
pub const DEFAULT_SEGMENT_DURATION: f64 = 4.0;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "whisper-1";
const DEFAULT_PORT: u16 = 5000;

/// Read-only relay configuration shared across requests.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Bearer key for the transcription API.
    pub api_key: String,
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1).
    pub base_url: String,
    /// Transcription model (whisper-1).
    pub model: String,
    /// Pinned transcription language; None lets the provider auto-detect.
    pub language: Option<String>,
    /// Gateway listen port.
    pub port: u16,
}

impl RelayConfig {
    /// Load from environment. Missing OPENAI_API_KEY or an unparsable PORT
    /// is a startup error, not something to limp past.
    pub fn from_env() -> TranscribeResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                TranscribeError::Config("OPENAI_API_KEY environment variable is required".into())
            })?;

        let base_url = std::env::var("STT_API_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let model = std::env::var("WHISPER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let language = std::env::var("WHISPER_LANGUAGE")
            .ok()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        let port = match std::env::var("PORT") {
            Ok(raw) => raw.trim().parse::<u16>().map_err(|_| {
                TranscribeError::Config(format!("PORT must be a port number, got {raw:?}"))
            })?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            api_key,
            base_url,
            model,
            language,
            port,
        })
    }

    /// Whether a usable API key is present (reported by the health route).
    pub fn api_key_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
