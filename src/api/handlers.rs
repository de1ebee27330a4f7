//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    ChatRequest, ChatResponse, ErrorResponse, StateResponse, TranscriptResponse, VersionResponse,
};
use super::AppState;
use crate::runtime::{GateError, SyncError};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Input affordances
        .route("/api/state", get(get_state))
        // Transcript cache
        .route("/api/transcript", get(get_transcript))
        .route("/api/transcript/refresh", post(refresh_transcript))
        // Submit entry point
        .route("/api/chat", post(send_chat))
        // SSE streaming
        .route("/api/stream", get(stream_session))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

async fn get_state(State(state): State<AppState>) -> Json<StateResponse> {
    Json(StateResponse {
        input_disabled: state.session.input_disabled(),
        model: state.session.model_id().to_string(),
    })
}

async fn get_transcript(State(state): State<AppState>) -> Json<TranscriptResponse> {
    Json(TranscriptResponse::from(&state.session.transcript()))
}

async fn refresh_transcript(
    State(state): State<AppState>,
) -> Result<Json<TranscriptResponse>, AppError> {
    state.session.refresh().await?;
    // A newer refresh may have overtaken this one; report what is cached
    Ok(Json(TranscriptResponse::from(&state.session.transcript())))
}

async fn send_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    // Detached so a client disconnect cannot cancel the turn mid-append
    let session = state.session.clone();
    let turn = tokio::spawn(async move { session.submit(&req.text).await })
        .await
        .map_err(|e| AppError::Internal(format!("Submit task failed: {e}")))??;
    Ok(Json(ChatResponse::new(turn)))
}

async fn stream_session(State(state): State<AppState>) -> impl IntoResponse {
    sse_stream(
        state.session.subscribe_disabled(),
        state.session.subscribe_transcript(),
        state.session.subscribe_notices(),
    )
}

async fn get_version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(&'static str, String),
    Conflict(&'static str, String),
    BadGateway(&'static str, String),
    Internal(String),
}

impl From<GateError> for AppError {
    fn from(err: GateError) -> Self {
        let message = err.to_string();
        match err {
            GateError::EmptyInput => AppError::BadRequest("empty_input", message),
            GateError::Busy => AppError::Conflict("busy", message),
            GateError::Service(_) => AppError::BadGateway("service_error", message),
            GateError::InvalidTransition(_) => AppError::Internal(message),
        }
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        let message = err.to_string();
        match err {
            SyncError::GateBusy => AppError::Conflict("busy", message),
            SyncError::Service(_) => AppError::BadGateway("sync_error", message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(code, msg) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::new(code, msg))
            }
            AppError::Conflict(code, msg) => (StatusCode::CONFLICT, ErrorResponse::new(code, msg)),
            AppError::BadGateway(code, msg) => {
                (StatusCode::BAD_GATEWAY, ErrorResponse::new(code, msg))
            }
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("internal", msg),
            ),
        };

        (status, Json(body)).into_response()
    }
}
