//! Axum webhook gateway for the cadenza relay.
//!
//! Accepts an audio payload (multipart upload or base64 JSON), forwards it to
//! the Whisper transcription API through the [`Transcriber`] seam, and
//! answers with fixed-width lyric-sync segments. One independent task per
//! request; the only shared state is read-only configuration.

use axum::{
    extract::{DefaultBodyLimit, Json, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use cadenza_transcribe::{
    segment_transcript, RelayConfig, TranscribeError, Transcriber, WhisperApi,
    DEFAULT_SEGMENT_DURATION, MAX_AUDIO_BYTES,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Room for a 25 MB payload plus base64/multipart overhead.
const BODY_LIMIT_BYTES: usize = 40 * 1024 * 1024;

const SERVICE_NAME: &str = "cadenza-gateway";

#[derive(Clone)]
struct AppState {
    config: Arc<RelayConfig>,
    transcriber: Arc<dyn Transcriber>,
}

type ApiResponse = (StatusCode, axum::Json<serde_json::Value>);

#[tokio::main]
async fn main() {
    // Load .env first: the Whisper API key stays in the backend environment,
    // never in request payloads.
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = match RelayConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[{SERVICE_NAME}] {e}");
            std::process::exit(1);
        }
    };
    let transcriber = match WhisperApi::new(&config) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("[{SERVICE_NAME}] failed to build Whisper client: {e}");
            std::process::exit(1);
        }
    };

    let port = config.port;
    let state = AppState {
        config: Arc::new(config),
        transcriber: Arc::new(transcriber),
    };
    let app = router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(target: "cadenza::gateway", "{} listening on {}", SERVICE_NAME, addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!(target: "cadenza::gateway", "server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(target: "cadenza::gateway", "shutdown requested (Ctrl+C)");
        }
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/process-audio", post(process_audio))
        .route("/process-audio-base64", post(process_audio_base64))
        .route("/whisper", post(whisper_passthrough))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
}

/// GET / – service descriptor.
async fn index() -> axum::Json<serde_json::Value> {
    axum::Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /health",
            "process_audio": "POST /process-audio (multipart: audio, segment_duration)",
            "process_audio_base64": "POST /process-audio-base64 (JSON: audio_data, filename, segment_duration)",
            "whisper": "POST /whisper (JSON: audioData, fileName) — raw transcript pass-through",
        },
    }))
}

/// GET /health – liveness check plus whether the upstream API key is configured.
async fn health(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    axum::Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "api_key_configured": state.config.api_key_configured(),
    }))
}

/// POST /process-audio – multipart field `audio` (required) plus optional
/// `segment_duration` (seconds, default 4.0).
async fn process_audio(State(state): State<AppState>, mut multipart: Multipart) -> ApiResponse {
    let mut audio: Option<Vec<u8>> = None;
    let mut filename = "audio.mp3".to_string();
    let mut segment_duration = DEFAULT_SEGMENT_DURATION;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => return client_error(format!("malformed multipart body: {e}")),
        };
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "audio" => {
                if let Some(n) = field.file_name() {
                    filename = n.to_string();
                }
                match field.bytes().await {
                    Ok(bytes) => audio = Some(bytes.to_vec()),
                    Err(e) => return client_error(format!("failed to read audio field: {e}")),
                }
            }
            "segment_duration" => {
                let raw = match field.text().await {
                    Ok(t) => t,
                    Err(e) => return client_error(format!("failed to read segment_duration: {e}")),
                };
                match raw.trim().parse::<f64>() {
                    Ok(v) => segment_duration = v,
                    Err(_) => {
                        return client_error(format!("segment_duration must be a number, got {raw:?}"))
                    }
                }
            }
            _ => {}
        }
    }

    let Some(audio) = audio else {
        return client_error("No audio file provided");
    };
    run_pipeline(&state, &audio, &filename, segment_duration).await
}

/// JSON body for the base64 routes. Accepts both snake_case and the
/// camelCase keys the original webhook consumers send.
#[derive(Debug, Deserialize)]
struct Base64Body {
    #[serde(default, alias = "audioData")]
    audio_data: Option<String>,
    #[serde(default, alias = "fileName")]
    filename: Option<String>,
    #[serde(default)]
    segment_duration: Option<f64>,
}

impl Base64Body {
    /// Decode the payload, or explain what the client got wrong.
    fn decode_audio(&self) -> Result<Vec<u8>, ApiResponse> {
        let encoded = self
            .audio_data
            .as_deref()
            .ok_or_else(|| client_error("No audio data provided"))?;
        BASE64_STANDARD
            .decode(encoded.trim())
            .map_err(|e| client_error(format!("invalid base64 audio data: {e}")))
    }

    fn filename(&self) -> &str {
        self.filename.as_deref().unwrap_or("audio.mp3")
    }
}

/// POST /process-audio-base64 – JSON `{ audio_data | audioData, filename,
/// segment_duration }`; same pipeline as the multipart route.
async fn process_audio_base64(
    State(state): State<AppState>,
    Json(body): Json<Base64Body>,
) -> ApiResponse {
    let audio = match body.decode_audio() {
        Ok(bytes) => bytes,
        Err(resp) => return resp,
    };
    let segment_duration = body.segment_duration.unwrap_or(DEFAULT_SEGMENT_DURATION);
    run_pipeline(&state, &audio, body.filename(), segment_duration).await
}

/// Shared pipeline: size check → transcribe → bucket into windows.
async fn run_pipeline(
    state: &AppState,
    audio: &[u8],
    filename: &str,
    segment_duration: f64,
) -> ApiResponse {
    if audio.is_empty() {
        return client_error("No audio file provided");
    }
    if audio.len() > MAX_AUDIO_BYTES {
        return client_error("File too large (max 25MB)");
    }

    let transcript = match state.transcriber.transcribe(audio, filename).await {
        Ok(t) => t,
        Err(e) => return error_response(&e),
    };
    let segments = match segment_transcript(&transcript, segment_duration) {
        Ok(s) => s,
        Err(e) => return error_response(&e),
    };

    tracing::info!(
        target: "cadenza::gateway",
        duration = transcript.duration,
        words = transcript.words.len(),
        segments = segments.len(),
        "audio processed"
    );

    (
        StatusCode::OK,
        axum::Json(json!({
            "success": true,
            "full_text": transcript.full_text,
            "language": transcript.language,
            "total_duration": transcript.duration,
            "segments_count": segments.len(),
            "words_count": transcript.words.len(),
            "segments": segments,
        })),
    )
}

/// POST /whisper – legacy pass-through: transcribe and return the provider's
/// own segments and words without fixed-width bucketing. Kept wire-compatible
/// with the first deployment of this relay, upstream-status mirroring included.
async fn whisper_passthrough(
    State(state): State<AppState>,
    Json(body): Json<Base64Body>,
) -> ApiResponse {
    let audio = match body.decode_audio() {
        Ok(bytes) => bytes,
        Err(resp) => return resp,
    };
    if audio.len() > MAX_AUDIO_BYTES {
        return (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({ "error": "File too large (max 25MB)" })),
        );
    }

    match state.transcriber.transcribe(&audio, body.filename()).await {
        Ok(t) => (
            StatusCode::OK,
            axum::Json(json!({
                "success": true,
                "full_text": t.full_text,
                "language": t.language,
                "duration": t.duration,
                "segments_count": t.source_segments.len(),
                "words_count": t.words.len(),
                "segments": t.source_segments,
                "words": t.words,
            })),
        ),
        Err(TranscribeError::Upstream { status, body }) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            axum::Json(json!({
                "error": "OpenAI API error",
                "details": body,
                "status": status,
            })),
        ),
        Err(e) if e.is_client_error() => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({ "error": e.to_string() })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(json!({ "error": "Internal server error", "details": e.to_string() })),
        ),
    }
}

fn client_error(message: impl Into<String>) -> ApiResponse {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({ "success": false, "error": message.into() })),
    )
}

fn error_response(err: &TranscribeError) -> ApiResponse {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    tracing::warn!(target: "cadenza::gateway", "request failed: {}", err);
    (
        status,
        axum::Json(json!({ "success": false, "error": err.to_string() })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use cadenza_transcribe::{PlaceholderTranscriber, SourceSegment, Transcript, Word};
    use tower::ServiceExt;

    fn test_config() -> RelayConfig {
        RelayConfig {
            api_key: "sk-test".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "whisper-1".to_string(),
            language: None,
            port: 5000,
        }
    }

    fn test_app(transcript: Option<Transcript>) -> Router {
        let transcriber: Arc<dyn Transcriber> = Arc::new(match transcript {
            Some(t) => PlaceholderTranscriber::with_transcript(t),
            None => PlaceholderTranscriber::new(),
        });
        router(AppState {
            config: Arc::new(test_config()),
            transcriber,
        })
    }

    fn sample_transcript() -> Transcript {
        Transcript {
            full_text: "one two three".to_string(),
            language: "en".to_string(),
            duration: 10.0,
            words: vec![
                Word::new("one", 3.9, 4.2),
                Word::new("two", 4.0, 4.3),
                Word::new("three", 7.99, 8.5),
            ],
            source_segments: vec![SourceSegment {
                id: 0,
                start: 0.0,
                end: 10.0,
                text: "one two three".to_string(),
                duration: 10.0,
            }],
        }
    }

    async fn json_response(res: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_service_and_key_status() {
        let app = test_app(None);
        let res = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = json_response(res).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], "cadenza-gateway");
        assert_eq!(json["api_key_configured"], true);
    }

    #[tokio::test]
    async fn index_describes_the_routes() {
        let app = test_app(None);
        let res = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = json_response(res).await;
        assert_eq!(json["service"], "cadenza-gateway");
        assert!(json["endpoints"]["process_audio"].is_string());
    }

    #[tokio::test]
    async fn base64_route_returns_fixed_windows() {
        let app = test_app(Some(sample_transcript()));
        let body = json!({
            "audioData": BASE64_STANDARD.encode(b"fake-mp3"),
            "segment_duration": 4.0,
        });
        let res = app
            .oneshot(json_request("/process-audio-base64", body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let json = json_response(res).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["total_duration"], 10.0);
        assert_eq!(json["segments_count"], 3);
        assert_eq!(json["words_count"], 3);
        // Boundary word "two" (start 4.0) lands in the second window.
        assert_eq!(json["segments"][0]["word_count"], 1);
        assert_eq!(json["segments"][1]["word_count"], 2);
        assert_eq!(json["segments"][1]["text"], "two three");
        assert_eq!(json["segments"][2]["has_content"], false);
        assert_eq!(json["segments"][2]["duration"], 2.0);
        assert_eq!(json["segments"][0]["words"][0]["word"], "one");
    }

    #[tokio::test]
    async fn base64_route_accepts_snake_case_key() {
        let app = test_app(Some(sample_transcript()));
        let body = json!({ "audio_data": BASE64_STANDARD.encode(b"fake-mp3") });
        let res = app
            .oneshot(json_request("/process-audio-base64", body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = json_response(res).await;
        // Default window width is 4.0 seconds.
        assert_eq!(json["segments_count"], 3);
    }

    #[tokio::test]
    async fn missing_audio_data_is_a_client_error() {
        let app = test_app(None);
        let res = app
            .oneshot(json_request("/process-audio-base64", json!({})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let json = json_response(res).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "No audio data provided");
    }

    #[tokio::test]
    async fn invalid_base64_is_a_client_error() {
        let app = test_app(None);
        let res = app
            .oneshot(json_request(
                "/process-audio-base64",
                json!({ "audioData": "!!! not base64 !!!" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let json = json_response(res).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn non_positive_segment_duration_is_a_client_error() {
        let app = test_app(Some(sample_transcript()));
        let body = json!({
            "audioData": BASE64_STANDARD.encode(b"fake-mp3"),
            "segment_duration": 0.0,
        });
        let res = app
            .oneshot(json_request("/process-audio-base64", body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_payload_is_rejected_before_transcription() {
        let app = test_app(None);
        let body = json!({
            "audioData": BASE64_STANDARD.encode(vec![0u8; MAX_AUDIO_BYTES + 1]),
        });
        let res = app
            .oneshot(json_request("/process-audio-base64", body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let json = json_response(res).await;
        assert_eq!(json["error"], "File too large (max 25MB)");
    }

    #[tokio::test]
    async fn multipart_route_returns_fixed_windows() {
        let app = test_app(Some(sample_transcript()));
        let boundary = "cadenza-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"segment_duration\"\r\n\r\n\
             4\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"audio\"; filename=\"clip.mp3\"\r\n\
             Content-Type: audio/mpeg\r\n\r\n\
             FAKEMP3BYTES\r\n\
             --{boundary}--\r\n"
        );
        let req = Request::builder()
            .method("POST")
            .uri("/process-audio")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = json_response(res).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["segments_count"], 3);
    }

    #[tokio::test]
    async fn multipart_without_audio_field_is_a_client_error() {
        let app = test_app(None);
        let boundary = "cadenza-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"segment_duration\"\r\n\r\n\
             4\r\n\
             --{boundary}--\r\n"
        );
        let req = Request::builder()
            .method("POST")
            .uri("/process-audio")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let json = json_response(res).await;
        assert_eq!(json["error"], "No audio file provided");
    }

    #[tokio::test]
    async fn whisper_route_passes_the_transcript_through() {
        let app = test_app(Some(sample_transcript()));
        let body = json!({ "audioData": BASE64_STANDARD.encode(b"fake-mp3"), "fileName": "take.mp3" });
        let res = app.oneshot(json_request("/whisper", body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let json = json_response(res).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["duration"], 10.0);
        assert_eq!(json["segments_count"], 1);
        assert_eq!(json["segments"][0]["text"], "one two three");
        assert_eq!(json["segments"][0]["duration"], 10.0);
        assert_eq!(json["words_count"], 3);
        assert_eq!(json["words"][0]["word"], "one");
        // No bucketing on this route.
        assert!(json.get("total_duration").is_none());
    }
}
