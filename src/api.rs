use std::sync::Arc;

use shuttle_axum::axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::error::StorageFailure;
use crate::model::ChangeRecord;
use crate::scheduler::{CycleReport, Monitor, SchedulerState};
use crate::status::StatusReport;

const DEFAULT_CHANGES_LIMIT: usize = 20;
const MAX_CHANGES_LIMIT: usize = 200;

#[derive(Clone)]
pub struct AppState {
    monitor: Arc<Monitor>,
}

pub fn router(monitor: Arc<Monitor>) -> Router {
    let state = AppState { monitor };

    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route("/api/changes", get(changes))
        .route("/api/check", post(check_now))
        .route("/api/status/acknowledge", post(acknowledge))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

struct ApiError(StorageFailure);

impl From<StorageFailure> for ApiError {
    fn from(e: StorageFailure) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(target: "api", error = %self.0, "store query failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "error", "message": self.0.to_string() })),
        )
            .into_response()
    }
}

#[derive(serde::Serialize)]
struct HealthOut {
    status: &'static str,
    scheduler: SchedulerState,
    cycles_completed: u64,
}

async fn health(State(state): State<AppState>) -> Json<HealthOut> {
    Json(HealthOut {
        status: "healthy",
        scheduler: state.monitor.state(),
        cycles_completed: state.monitor.cycles_completed(),
    })
}

#[derive(serde::Serialize)]
struct StatusOut {
    status: &'static str,
    data: Vec<StatusReport>,
}

async fn status(State(state): State<AppState>) -> Result<Json<StatusOut>, ApiError> {
    let data = state.monitor.status_snapshot()?;
    Ok(Json(StatusOut {
        status: "success",
        data,
    }))
}

#[derive(serde::Deserialize)]
struct ChangesQuery {
    #[serde(default)]
    limit: Option<usize>,
}

async fn changes(
    State(state): State<AppState>,
    Query(q): Query<ChangesQuery>,
) -> Result<Json<Vec<ChangeRecord>>, ApiError> {
    let limit = q
        .limit
        .unwrap_or(DEFAULT_CHANGES_LIMIT)
        .clamp(1, MAX_CHANGES_LIMIT);
    Ok(Json(state.monitor.store().recent_changes(limit)?))
}

/// Runs a full cycle; waits for a timer cycle in progress to finish first.
async fn check_now(State(state): State<AppState>) -> Json<CycleReport> {
    Json(state.monitor.trigger_manual_check().await)
}

#[derive(serde::Serialize)]
struct AckOut {
    reset: usize,
}

async fn acknowledge(State(state): State<AppState>) -> Result<Json<AckOut>, ApiError> {
    let reset = state.monitor.store().reset_new_content_flags()?;
    tracing::info!(target: "api", reset, "new-content flags acknowledged");
    Ok(Json(AckOut { reset }))
}
