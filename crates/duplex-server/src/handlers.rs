//! REST handlers for the notes API and health endpoint.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use duplex_core::ids::NoteId;
use duplex_core::note::{BackendId, NoteDraft, WriteTarget};

use crate::orchestrator::OrchestratorError;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_target")]
    pub target: WriteTarget,
}

fn default_target() -> WriteTarget {
    WriteTarget::Both
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn error_response(err: OrchestratorError) -> ApiError {
    match err {
        OrchestratorError::InvalidNote(msg) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": msg })))
        }
        OrchestratorError::NotFound { backend, id } => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": format!("note {id} not found on backend {backend}"),
            })),
        ),
        OrchestratorError::TotalWriteFailure { failures } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "overallSuccess": false,
                "perTarget": failures,
            })),
        ),
        OrchestratorError::Store(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}

fn parse_backend(raw: &str) -> Result<BackendId, ApiError> {
    raw.parse().map_err(|e: String| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e, "validBackends": ["primary", "analytics"] })),
        )
    })
}

/// POST /notes — write a note to the requested targets. Partial failure is
/// reported inside a 201 body; only an all-targets failure is a 500.
pub async fn create_note(
    State(state): State<AppState>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let draft = NoteDraft::new(req.title, req.content);
    let outcome = state
        .orchestrator
        .write_to_all(&draft, req.target)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(json!(outcome))))
}

/// GET /notes — merged listing across all readable backends.
pub async fn list_notes(State(state): State<AppState>) -> Json<serde_json::Value> {
    let notes = state.orchestrator.read_all().await;
    Json(json!({ "notes": notes }))
}

/// GET /notes/{backend}/{id}
pub async fn get_note(
    State(state): State<AppState>,
    Path((backend, id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let backend = parse_backend(&backend)?;
    let note = state
        .orchestrator
        .read_one(backend, &NoteId::from_raw(id))
        .await
        .map_err(error_response)?;
    Ok(Json(json!(note)))
}

/// PUT /notes/{backend}/{id}
pub async fn update_note(
    State(state): State<AppState>,
    Path((backend, id)): Path<(String, String)>,
    Json(draft): Json<NoteDraft>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let backend = parse_backend(&backend)?;
    let note = state
        .orchestrator
        .update_one(backend, &NoteId::from_raw(id), &draft)
        .await
        .map_err(error_response)?;
    Ok(Json(json!(note)))
}

/// DELETE /notes/{backend}/{id}
pub async fn delete_note(
    State(state): State<AppState>,
    Path((backend, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let backend = parse_backend(&backend)?;
    state
        .orchestrator
        .delete_one(backend, &NoteId::from_raw(id))
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /health — reports the latest recorded snapshot for each backend.
/// Freshness comes from the periodic probe task, so serving this endpoint
/// costs no store round trips. Any non-healthy snapshot turns the overall
/// answer into a 503, but the body always carries the full picture.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let backends = state.orchestrator.health_all();
    let all_healthy = backends.iter().all(|b| b.is_healthy());
    let status = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if all_healthy { "healthy" } else { "degraded" },
            "backends": backends,
            "observers": state.hub.count(),
        })),
    )
}
