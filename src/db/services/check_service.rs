//! CRUD for checks. Ownership is always resolved through the parent site.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::db::entities::{check, prelude::*};
use crate::db::services::site_service;
use crate::web::models::check_models::{CreateCheck, UpdateCheck};

/// Returns `None` when the site is missing or not owned by `user_id`.
pub async fn list_checks_for_site(
    db: &DatabaseConnection,
    site_id: i32,
    user_id: i32,
) -> Result<Option<Vec<check::Model>>, DbErr> {
    if site_service::find_site_for_user(db, site_id, user_id)
        .await?
        .is_none()
    {
        return Ok(None);
    }

    let checks = Check::find()
        .filter(check::Column::SiteId.eq(site_id))
        .order_by_desc(check::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(Some(checks))
}

pub async fn create_check(
    db: &DatabaseConnection,
    user_id: i32,
    payload: CreateCheck,
) -> Result<Option<check::Model>, DbErr> {
    let site = match site_service::find_site_for_user(db, payload.site_id, user_id).await? {
        Some(site) => site,
        None => return Ok(None),
    };

    let now = Utc::now();
    let saved = check::ActiveModel {
        site_id: Set(site.id),
        check_type: Set(payload.check_type),
        interval_seconds: Set(payload.interval.unwrap_or(check::DEFAULT_INTERVAL_SECONDS)),
        status: Set(check::PENDING_STATUS.to_string()),
        latency_ms: Set(None),
        response_text: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(Some(saved))
}

pub async fn find_check_for_user(
    db: &DatabaseConnection,
    check_id: i32,
    user_id: i32,
) -> Result<Option<check::Model>, DbErr> {
    let found = Check::find_by_id(check_id)
        .find_also_related(Site)
        .one(db)
        .await?;

    Ok(match found {
        Some((check, Some(site))) if site.user_id == user_id => Some(check),
        _ => None,
    })
}

pub async fn update_check(
    db: &DatabaseConnection,
    check_id: i32,
    user_id: i32,
    payload: UpdateCheck,
) -> Result<Option<check::Model>, DbErr> {
    let existing = match find_check_for_user(db, check_id, user_id).await? {
        Some(check) => check,
        None => return Ok(None),
    };

    let mut active_check: check::ActiveModel = existing.into();
    if let Some(check_type) = payload.check_type {
        active_check.check_type = Set(check_type);
    }
    if let Some(interval) = payload.interval {
        active_check.interval_seconds = Set(interval);
    }
    active_check.updated_at = Set(Utc::now());

    Ok(Some(active_check.update(db).await?))
}

pub async fn delete_check(db: &DatabaseConnection, check_id: i32, user_id: i32) -> Result<bool, DbErr> {
    if find_check_for_user(db, check_id, user_id).await?.is_none() {
        return Ok(false);
    }
    let result = Check::delete_by_id(check_id).exec(db).await?;
    Ok(result.rows_affected > 0)
}
