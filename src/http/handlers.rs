use super::state::{AppState, RecordSink, SessionEntry, SessionRecord};
use crate::adapter::SessionEventSink;
use crate::error::{ErrorKind, StartError};
use crate::session::SessionStats;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct StartSessionRequest {
    /// Vendor override; defaults to the configured primary. "mock" runs
    /// the loopback engine for connectivity testing.
    pub vendor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: u32,
    pub state: String,
}

#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub session_id: u32,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: u32,
    #[serde(flatten)]
    pub record: SessionRecord,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: Option<ErrorKind>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions/start
/// Start a new recognition session
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> impl IntoResponse {
    let record = Arc::new(RecordSink::new());

    let session = match state
        .service
        .start_session(
            req.vendor.as_deref(),
            Arc::clone(&record) as Arc<dyn SessionEventSink>,
        )
        .await
    {
        Ok(session) => session,
        Err(e @ StartError::Busy) => {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: e.to_string(),
                    kind: Some(e.kind()),
                }),
            )
                .into_response();
        }
        Err(e) => {
            error!("failed to start session: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                    kind: Some(e.kind()),
                }),
            )
                .into_response();
        }
    };

    let session_id = session.id();
    info!("started session {}", session_id);

    state
        .insert_session(session_id, Arc::new(SessionEntry { session, record }))
        .await;

    (
        StatusCode::OK,
        Json(StartSessionResponse {
            session_id,
            state: "recording".to_string(),
        }),
    )
        .into_response()
}

/// POST /sessions/:id/stop
/// End recording and let the session process what was heard
pub async fn stop_session(
    State(state): State<AppState>,
    Path(session_id): Path<u32>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&session_id) {
        Some(entry) => {
            entry.session.stop();
            (
                StatusCode::OK,
                Json(ControlResponse {
                    session_id,
                    status: "processing".to_string(),
                }),
            )
                .into_response()
        }
        None => not_found(session_id),
    }
}

/// POST /sessions/:id/cancel
/// Abort a session; no further events are delivered
pub async fn cancel_session(
    State(state): State<AppState>,
    Path(session_id): Path<u32>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&session_id) {
        Some(entry) => {
            entry.session.cancel();
            entry.record.mark_canceled();
            info!("canceled session {}", session_id);
            (
                StatusCode::OK,
                Json(ControlResponse {
                    session_id,
                    status: "canceled".to_string(),
                }),
            )
                .into_response()
        }
        None => not_found(session_id),
    }
}

/// GET /sessions/:id
/// Current state, text so far, and accounting for a session
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<u32>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&session_id) {
        Some(entry) => (
            StatusCode::OK,
            Json(SessionStatusResponse {
                session_id,
                record: entry.record.snapshot(),
                stats: entry.session.stats(),
            }),
        )
            .into_response(),
        None => not_found(session_id),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

fn not_found(session_id: u32) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("session {} not found", session_id),
            kind: None,
        }),
    )
        .into_response()
}
