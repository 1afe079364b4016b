//! `AppError` to HTTP response mapping.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use sea_orm::DbErr;
use uptime_backend::db::services::StoreError;
use uptime_backend::web::AppError;

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn invalid_input_returns_400_with_message() {
    let (status, json) = error_to_response(AppError::InvalidInput("Name is required".into())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Name is required");
}

#[tokio::test]
async fn invalid_credentials_returns_401() {
    let (status, json) = error_to_response(AppError::InvalidCredentials).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Unauthorized");
}

#[tokio::test]
async fn not_found_returns_404() {
    let (status, json) = error_to_response(AppError::NotFound("Check not found".into())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Check not found");
}

#[tokio::test]
async fn database_errors_return_500() {
    let err: AppError = DbErr::Custom("pool exhausted".into()).into();
    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().starts_with("Database error:"));
}

#[tokio::test]
async fn store_not_found_maps_to_404() {
    let err: AppError = StoreError::NotFound("check 7".into()).into();
    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "check 7");
}
