use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use std::sync::Arc;
use tracing::info;

use crate::db::entities::site;
use crate::db::services::site_service;
use crate::web::models::AuthenticatedUser;
use crate::web::models::site_models::{CreateSite, CreatedSite, SiteWithChecks, UpdateSite};
use crate::web::{AppError, AppState};

pub fn create_site_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_sites).post(create_site))
        .route(
            "/{id}",
            get(get_site).patch(update_site).delete(delete_site),
        )
}

#[axum::debug_handler]
async fn list_sites(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<SiteWithChecks>>, AppError> {
    let sites = site_service::list_sites_for_user(&app_state.db_pool, authenticated_user.id).await?;
    Ok(Json(sites))
}

#[axum::debug_handler]
async fn get_site(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<SiteWithChecks>, AppError> {
    let site = site_service::get_site_with_checks(&app_state.db_pool, id, authenticated_user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Site not found".to_string()))?;
    Ok(Json(site))
}

#[axum::debug_handler]
async fn create_site(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateSite>,
) -> Result<(StatusCode, Json<CreatedSite>), AppError> {
    payload.validate().map_err(AppError::InvalidInput)?;

    let created = site_service::create_site(&app_state.db_pool, authenticated_user.id, payload).await?;
    info!(
        site_id = created.site.id,
        user_id = authenticated_user.id,
        with_check = created.check.is_some(),
        "Site created."
    );
    Ok((StatusCode::CREATED, Json(created)))
}

#[axum::debug_handler]
async fn update_site(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateSite>,
) -> Result<Json<site::Model>, AppError> {
    payload.validate().map_err(AppError::InvalidInput)?;

    let updated = site_service::update_site(&app_state.db_pool, id, authenticated_user.id, payload)
        .await?
        .ok_or_else(|| AppError::NotFound("Site not found".to_string()))?;
    Ok(Json(updated))
}

#[axum::debug_handler]
async fn delete_site(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !site_service::delete_site(&app_state.db_pool, id, authenticated_user.id).await? {
        return Err(AppError::NotFound("Site not found".to_string()));
    }
    info!(site_id = id, user_id = authenticated_user.id, "Site deleted.");
    Ok(Json(serde_json::json!({ "message": "Site deleted successfully" })))
}
