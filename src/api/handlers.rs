//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    AcceptedResponse, AssignmentRequest, CreateSessionRequest, CreateSessionResponse,
    ErrorResponse, ModelsResponse, QuizRequest, SessionListResponse, SessionResponse,
    SnapshotListResponse, SuccessResponse,
};
use super::AppState;
use crate::db::DbError;
use crate::runtime::{InboxError, RuntimeError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

const DEFAULT_BACKGROUND: &str = "No background provided";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/snapshots", get(get_snapshots))
        // SSE streaming
        .route("/api/sessions/:id/stream", get(stream_session))
        // Learner input
        .route("/api/sessions/:id/quiz", post(submit_quiz))
        .route("/api/sessions/:id/assignment", post(submit_assignment))
        // Lifecycle
        .route("/api/sessions/:id/cancel", post(cancel_session))
        .route("/api/sessions/:id/resume", post(resume_session))
        .route("/api/sessions/:id/delete", post(delete_session))
        // Model info
        .route("/api/models", get(list_models))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Sessions
// ============================================================

async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    let topic = req.topic.trim();
    if topic.is_empty() {
        return Err(AppError::BadRequest("Topic must not be empty".to_string()));
    }
    let background = req
        .background
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .unwrap_or(DEFAULT_BACKGROUND);

    let session = state
        .sessions
        .start_session(req.session_id, topic, background)
        .await?;

    Ok(Json(CreateSessionResponse {
        session_id: session.id,
        state: session.state,
    }))
}

async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<SessionListResponse>, AppError> {
    let sessions = state.sessions.db().list_sessions()?;
    Ok(Json(SessionListResponse { sessions }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.sessions.db().get_session(&id)?;
    let awaiting = state.sessions.awaiting(&id).await;

    Ok(Json(SessionResponse {
        session_id: session.id,
        state: session.state,
        snapshot_count: session.snapshot_count,
        awaiting,
    }))
}

async fn get_snapshots(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SnapshotListResponse>, AppError> {
    // 404 rather than an empty list for unknown sessions
    state.sessions.db().get_session(&id)?;
    let snapshots = state.sessions.db().get_snapshots(&id)?;
    Ok(Json(SnapshotListResponse { snapshots }))
}

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (init_event, broadcast_rx) = state.sessions.subscribe(&id).await?;
    Ok(sse_stream(init_event, broadcast_rx))
}

// ============================================================
// Learner Input
// ============================================================

async fn submit_quiz(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<QuizRequest>,
) -> Result<Json<AcceptedResponse>, AppError> {
    state.sessions.submit_quiz(&id, req.answers).await?;
    Ok(Json(AcceptedResponse { accepted: true }))
}

async fn submit_assignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AssignmentRequest>,
) -> Result<Json<AcceptedResponse>, AppError> {
    state.sessions.submit_assignment(&id, req.submission).await?;
    Ok(Json(AcceptedResponse { accepted: true }))
}

// ============================================================
// Lifecycle
// ============================================================

async fn cancel_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.sessions.cancel(&id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn resume_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.sessions.resume(&id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.sessions.delete(&id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// Model Info
// ============================================================

async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.llm_registry.available_model_info(),
        default: state.sessions.config().model_id.clone(),
    })
}

async fn get_version() -> &'static str {
    concat!("professor ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::SessionNotFound(_) => AppError::NotFound(e.to_string()),
            DbError::SessionExists(_) => AppError::Conflict(e.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<RuntimeError> for AppError {
    fn from(e: RuntimeError) -> Self {
        match e {
            RuntimeError::Db(db) => db.into(),
            RuntimeError::Inbox(InboxError::NotAwaiting { .. })
            | RuntimeError::Finished(_)
            | RuntimeError::NotRunning(_) => AppError::Conflict(e.to_string()),
            RuntimeError::Inbox(InboxError::Closed) | RuntimeError::Closed(_) => {
                AppError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
