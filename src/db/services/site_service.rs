//! CRUD for sites. Every query is scoped to the owning user.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::db::entities::{check, check_result, prelude::*, site};
use crate::db::enums::SiteStatus;
use crate::web::models::site_models::{CreateSite, CreatedSite, SiteWithChecks, UpdateSite};

pub async fn list_sites_for_user(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<SiteWithChecks>, DbErr> {
    let rows = Site::find()
        .filter(site::Column::UserId.eq(user_id))
        .order_by_asc(site::Column::Id)
        .find_with_related(Check)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(site, checks)| SiteWithChecks { site, checks })
        .collect())
}

pub async fn find_site_for_user(
    db: &DatabaseConnection,
    site_id: i32,
    user_id: i32,
) -> Result<Option<site::Model>, DbErr> {
    Site::find_by_id(site_id)
        .filter(site::Column::UserId.eq(user_id))
        .one(db)
        .await
}

pub async fn get_site_with_checks(
    db: &DatabaseConnection,
    site_id: i32,
    user_id: i32,
) -> Result<Option<SiteWithChecks>, DbErr> {
    let site = match find_site_for_user(db, site_id, user_id).await? {
        Some(site) => site,
        None => return Ok(None),
    };
    let checks = site.find_related(Check).all(db).await?;
    Ok(Some(SiteWithChecks { site, checks }))
}

pub async fn create_site(
    db: &DatabaseConnection,
    user_id: i32,
    payload: CreateSite,
) -> Result<CreatedSite, DbErr> {
    let now = Utc::now();
    let txn = db.begin().await?;

    let saved_site = site::ActiveModel {
        user_id: Set(user_id),
        name: Set(payload.name.trim().to_string()),
        url: Set(payload.url),
        description: Set(payload.description),
        status: Set(SiteStatus::default()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let saved_check = match payload.check {
        Some(new_check) => Some(
            check::ActiveModel {
                site_id: Set(saved_site.id),
                check_type: Set(new_check.check_type),
                interval_seconds: Set(new_check
                    .interval
                    .unwrap_or(check::DEFAULT_INTERVAL_SECONDS)),
                status: Set(check::PENDING_STATUS.to_string()),
                latency_ms: Set(None),
                response_text: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?,
        ),
        None => None,
    };

    txn.commit().await?;

    Ok(CreatedSite {
        site: saved_site,
        check: saved_check,
    })
}

pub async fn update_site(
    db: &DatabaseConnection,
    site_id: i32,
    user_id: i32,
    payload: UpdateSite,
) -> Result<Option<site::Model>, DbErr> {
    let existing = match find_site_for_user(db, site_id, user_id).await? {
        Some(site) => site,
        None => return Ok(None),
    };

    let mut active_site: site::ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active_site.name = Set(name.trim().to_string());
    }
    if let Some(url) = payload.url {
        active_site.url = Set(url);
    }
    if let Some(description) = payload.description {
        active_site.description = Set(Some(description));
    }
    active_site.updated_at = Set(Utc::now());

    let updated = active_site.update(db).await?;
    Ok(Some(updated))
}

/// Deletes a site with its checks and their history. Returns `false` when the
/// site does not exist or belongs to someone else.
pub async fn delete_site(db: &DatabaseConnection, site_id: i32, user_id: i32) -> Result<bool, DbErr> {
    let txn = db.begin().await?;

    let owned = Site::find_by_id(site_id)
        .filter(site::Column::UserId.eq(user_id))
        .one(&txn)
        .await?;
    if owned.is_none() {
        return Ok(false);
    }

    let check_ids: Vec<i32> = Check::find()
        .select_only()
        .column(check::Column::Id)
        .filter(check::Column::SiteId.eq(site_id))
        .into_tuple::<i32>()
        .all(&txn)
        .await?;

    if !check_ids.is_empty() {
        CheckResult::delete_many()
            .filter(check_result::Column::CheckId.is_in(check_ids))
            .exec(&txn)
            .await?;
        Check::delete_many()
            .filter(check::Column::SiteId.eq(site_id))
            .exec(&txn)
            .await?;
    }

    Site::delete_by_id(site_id).exec(&txn).await?;
    txn.commit().await?;
    Ok(true)
}
