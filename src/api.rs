//! HTTP API for the presentation layer.
//!
//! Runs on port 8768 (configurable) using axum. Every handler answers with
//! a normal JSON body; core failures are already folded into the values.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::gateway::SpeechGateway;
use crate::judge::{PhotoJudge, Verdict};
use crate::narrator::Narrator;
use crate::photo::Photo;
use crate::prompt::{Prompt, PromptProvider};
use crate::store::SubmissionStore;
use crate::streak::compute_streak;

#[derive(Clone)]
pub struct ApiState {
    pub prompts: Arc<PromptProvider>,
    pub judge: Arc<PhotoJudge>,
    pub narrator: Arc<Narrator>,
    pub speech: Arc<SpeechGateway>,
    pub store: Arc<SubmissionStore>,
    /// Session accessibility flag; narration routes are no-ops when off.
    pub narration: bool,
}

// --- Request/Response types ---

#[derive(Deserialize)]
struct ImagePayload {
    #[serde(default)]
    image_base64: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

impl ImagePayload {
    /// `Ok(None)` when no image was sent.
    fn decode(&self) -> Result<Option<Photo>, base64::DecodeError> {
        let Some(encoded) = self.image_base64.as_deref().filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };
        // Accept data URLs as well as bare base64.
        let encoded = encoded.split_once(',').map_or(encoded, |(_, data)| data);
        let bytes = STANDARD.decode(encoded.trim())?;
        Ok(Some(match self.mime_type.as_deref() {
            Some(mime) if !mime.is_empty() => Photo::new(bytes, mime),
            _ => Photo::from_bytes(bytes),
        }))
    }
}

#[derive(Deserialize)]
struct JudgeRequest {
    #[serde(default)]
    prompt: Option<String>,
    #[serde(flatten)]
    image: ImagePayload,
}

#[derive(Deserialize)]
struct DescribeRequest {
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    speak: bool,
    #[serde(flatten)]
    image: ImagePayload,
}

#[derive(Deserialize)]
struct SpeakRequest {
    text: String,
}

#[derive(Serialize)]
struct StatusResponse {
    speaking: bool,
    narration: bool,
}

#[derive(Serialize)]
struct StreakResponse {
    streak: u32,
    submissions: usize,
}

#[derive(Serialize)]
struct SimpleResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl SimpleResponse {
    fn ok(status: &str) -> Self {
        Self {
            status: status.into(),
            description: None,
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            description: None,
            error: Some(message.into()),
        }
    }
}

/// Build the axum router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(handle_status))
        .route("/prompt", get(handle_prompt))
        .route("/judge", post(handle_judge))
        .route("/describe", post(handle_describe))
        .route("/speak", post(handle_speak))
        .route("/stop", post(handle_stop))
        .route("/streak", get(handle_streak))
        .with_state(state)
}

/// Start the API server as a background tokio task.
pub async fn start_api(state: ApiState, port: u16) -> Option<tokio::task::JoinHandle<()>> {
    let app = router(state);
    let addr = format!("127.0.0.1:{port}");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            warn!("Failed to bind API on {addr}: {e}");
            return None;
        }
    };
    info!("API server listening on {addr}");

    Some(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!("API server error: {e}");
        }
    }))
}

// --- Handlers ---

async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        speaking: state.speech.is_speaking(),
        narration: state.narration,
    })
}

async fn handle_prompt(State(state): State<ApiState>) -> Json<Prompt> {
    Json(state.prompts.get_prompt().await)
}

async fn handle_judge(State(state): State<ApiState>, Json(req): Json<JudgeRequest>) -> Json<Verdict> {
    let photo = match req.image.decode() {
        Ok(photo) => photo,
        Err(e) => return Json(Verdict::rejected(format!("ERROR: invalid image data: {e}"))),
    };

    let prompt = match req.prompt.filter(|p| !p.trim().is_empty()) {
        Some(p) => p,
        None => state.prompts.get_prompt().await.text,
    };

    Json(state.judge.judge(&prompt, photo.as_ref()).await)
}

async fn handle_describe(
    State(state): State<ApiState>,
    Json(req): Json<DescribeRequest>,
) -> Json<SimpleResponse> {
    if !state.narration {
        return Json(SimpleResponse::ok("disabled"));
    }

    let photo = match req.image.decode() {
        Ok(Some(photo)) => photo,
        Ok(None) => return Json(SimpleResponse::err("no image received")),
        Err(e) => return Json(SimpleResponse::err(format!("invalid image data: {e}"))),
    };

    let description = state.narrator.describe_photo(&photo, req.prompt.as_deref()).await;

    if req.speak {
        let narrator = state.narrator.clone();
        let text = description.clone();
        tokio::spawn(async move {
            narrator.announce(&text).await;
        });
    }

    Json(SimpleResponse {
        description: Some(description),
        ..SimpleResponse::ok("ok")
    })
}

async fn handle_speak(State(state): State<ApiState>, Json(req): Json<SpeakRequest>) -> Json<SimpleResponse> {
    if !state.narration {
        return Json(SimpleResponse::ok("disabled"));
    }
    if req.text.trim().is_empty() {
        return Json(SimpleResponse::err("empty text"));
    }

    let preview: String = req.text.chars().take(80).collect();
    info!("HTTP /speak: \"{}\" ({} chars)", preview.replace('\n', " "), req.text.len());

    // Fire-and-forget; a later /speak or /stop supersedes this one.
    let narrator = state.narrator.clone();
    tokio::spawn(async move {
        let outcome = narrator.announce(&req.text).await;
        info!("Speech finished: {outcome:?}");
    });

    Json(SimpleResponse::ok("speaking"))
}

async fn handle_stop(State(state): State<ApiState>) -> Json<SimpleResponse> {
    state.speech.stop();
    Json(SimpleResponse::ok("stopped"))
}

async fn handle_streak(State(state): State<ApiState>) -> Json<StreakResponse> {
    let records = state.store.load();
    Json(StreakResponse {
        streak: compute_streak(&records),
        submissions: records.len(),
    })
}
