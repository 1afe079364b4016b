use axum::{
    Json, Router,
    http::Method,
    middleware as axum_middleware,
    routing::get,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::monitor::CheckRunner;
use crate::server::config::ServerConfig;
use crate::web::{middleware::auth, routes::*};

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

pub use error::AppError;

pub struct AppState {
    pub db_pool: DatabaseConnection,
    pub runner: Arc<CheckRunner>,
    pub config: Arc<ServerConfig>,
    /// Client for requests this server makes to itself.
    pub http_client: reqwest::Client,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

async fn root_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn create_axum_router(
    db_pool: DatabaseConnection,
    runner: Arc<CheckRunner>,
    config: Arc<ServerConfig>,
) -> Router {
    let app_state = Arc::new(AppState {
        db_pool,
        runner,
        config,
        http_client: reqwest::Client::new(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_check_handler))
        .nest("/api/cron", cron_routes::create_cron_router())
        .nest(
            "/api/sites",
            site_routes::create_site_router()
                .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth::auth)),
        )
        .nest(
            "/api/checks",
            check_routes::create_check_router()
                .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth::auth)),
        )
        .with_state(app_state)
        .layer(cors)
}
