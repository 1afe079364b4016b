use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use crate::monitor::PassReport;
use crate::web::{AppError, AppState};

pub fn create_cron_router() -> Router<Arc<AppState>> {
    Router::new().route("/check", get(run_check_pass))
}

#[derive(Debug, Serialize)]
pub struct CronResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: PassReport,
}

/// Runs one pass over every check. Per-check failures are part of the report;
/// only failing to load the checks fails the request.
#[axum::debug_handler]
async fn run_check_pass(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<CronResponse>, AppError> {
    let report = app_state.runner.run_pass().await.map_err(|e| {
        error!(error = %e, "Cron job failed.");
        AppError::ServerError("Cron job failed".to_string())
    })?;

    Ok(Json(CronResponse {
        success: true,
        report,
    }))
}
