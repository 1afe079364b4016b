use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    routing::{get, patch, post},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::db::entities::{check, check_result};
use crate::db::services::check_result_service::{self, CheckMetrics, TimeRange};
use crate::db::services::check_service;
use crate::web::models::AuthenticatedUser;
use crate::web::models::check_models::{
    CreateCheck, DEFAULT_HISTORY_LIMIT, HistoryQuery, MetricsQuery, UpdateCheck,
};
use crate::web::{AppError, AppState};

pub fn create_check_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_check))
        .route("/site/{site_id}", get(list_checks_for_site))
        .route("/{id}", patch(update_check).delete(delete_check))
        .route("/{id}/history", get(get_check_history))
        .route("/{id}/metrics", get(get_check_metrics))
}

#[axum::debug_handler]
async fn list_checks_for_site(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(site_id): Path<i32>,
) -> Result<Json<Vec<check::Model>>, AppError> {
    let checks = check_service::list_checks_for_site(&app_state.db_pool, site_id, authenticated_user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Site not found".to_string()))?;
    Ok(Json(checks))
}

#[axum::debug_handler]
async fn create_check(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateCheck>,
) -> Result<(StatusCode, Json<check::Model>), AppError> {
    payload.validate().map_err(AppError::InvalidInput)?;

    let created = check_service::create_check(&app_state.db_pool, authenticated_user.id, payload)
        .await?
        .ok_or_else(|| AppError::NotFound("Site not found".to_string()))?;
    info!(check_id = created.id, site_id = created.site_id, "Check created.");

    trigger_initial_check(&app_state, headers.get(header::AUTHORIZATION).cloned());

    Ok((StatusCode::CREATED, Json(created)))
}

/// Asks the cron endpoint for an immediate pass so the new check gets a first
/// result without waiting for the next tick. Failures are only logged.
fn trigger_initial_check(app_state: &AppState, authorization: Option<HeaderValue>) {
    let client = app_state.http_client.clone();
    let api_url = app_state.config.api_url.clone();
    tokio::spawn(async move {
        request_initial_check(&client, &api_url, authorization).await;
    });
}

/// Returns whether the cron endpoint accepted the request.
async fn request_initial_check(
    client: &reqwest::Client,
    api_url: &str,
    authorization: Option<HeaderValue>,
) -> bool {
    let url = format!("{}/api/cron/check", api_url.trim_end_matches('/'));
    let mut request = client.get(&url);
    if let Some(value) = authorization {
        request = request.header(header::AUTHORIZATION, value);
    }
    match request.send().await {
        Ok(response) if response.status().is_success() => true,
        Ok(response) => {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%url, %status, body, "Failed to trigger initial check.");
            false
        }
        Err(e) => {
            error!(%url, error = %e, "Error triggering initial check.");
            false
        }
    }
}

#[axum::debug_handler]
async fn update_check(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCheck>,
) -> Result<Json<check::Model>, AppError> {
    payload.validate().map_err(AppError::InvalidInput)?;

    let updated = check_service::update_check(&app_state.db_pool, id, authenticated_user.id, payload)
        .await?
        .ok_or_else(|| AppError::NotFound("Check not found".to_string()))?;
    Ok(Json(updated))
}

#[axum::debug_handler]
async fn delete_check(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !check_service::delete_check(&app_state.db_pool, id, authenticated_user.id).await? {
        return Err(AppError::NotFound("Check not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "message": "Check deleted successfully" })))
}

#[axum::debug_handler]
async fn get_check_history(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<check_result::Model>>, AppError> {
    ensure_check_owned(&app_state, id, &authenticated_user).await?;

    let range = TimeRange::for_history(query.start_date, query.end_date, Utc::now());
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let results =
        check_result_service::get_results_for_check(&app_state.db_pool, id, range, Some(limit)).await?;
    Ok(Json(results))
}

#[axum::debug_handler]
async fn get_check_metrics(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<CheckMetrics>, AppError> {
    ensure_check_owned(&app_state, id, &authenticated_user).await?;

    let range = TimeRange::for_metrics(query.start_date, query.end_date);
    let metrics = check_result_service::get_metrics_for_check(&app_state.db_pool, id, range).await?;
    Ok(Json(metrics))
}

async fn ensure_check_owned(
    app_state: &AppState,
    check_id: i32,
    user: &AuthenticatedUser,
) -> Result<check::Model, AppError> {
    check_service::find_check_for_user(&app_state.db_pool, check_id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Check not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn initial_check_forwards_the_callers_authorization() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/cron/check")
            .match_header("authorization", "Bearer caller-token")
            .with_status(200)
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;

        let accepted = request_initial_check(
            &reqwest::Client::new(),
            &format!("{}/", server.url()),
            Some(HeaderValue::from_static("Bearer caller-token")),
        )
        .await;

        assert!(accepted);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn initial_check_without_authorization_sends_none() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/cron/check")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .create_async()
            .await;

        assert!(request_initial_check(&reqwest::Client::new(), &server.url(), None).await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_initial_check_is_swallowed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/cron/check")
            .with_status(500)
            .with_body(r#"{"error":"Cron job failed"}"#)
            .create_async()
            .await;

        assert!(!request_initial_check(&reqwest::Client::new(), &server.url(), None).await);
    }
}
