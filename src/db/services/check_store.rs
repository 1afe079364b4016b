//! Storage boundary used by the check runner.
//!
//! The runner only needs two things from storage: the list of every check
//! joined with its site, and a way to persist the outcome of one probe. Both
//! are expressed through [`CheckStore`] so the runner can be driven by an
//! in-memory store in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::db::entities::{check, check_result, prelude::*, site};
use crate::db::enums::SiteStatus;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("Record not found: {0}")]
    NotFound(String),
}

/// A check row together with its owning site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckWithSite {
    pub check: check::Model,
    pub site: site::Model,
}

/// Everything written for one probe execution.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckRun {
    pub check_id: i32,
    pub site_id: i32,
    pub timestamp: DateTime<Utc>,
    pub status: String,
    pub latency_ms: i64,
    pub response_text: String,
    pub site_status: SiteStatus,
}

#[async_trait]
pub trait CheckStore: Send + Sync {
    /// Loads every check with its parent site, in a stable order.
    async fn list_checks_with_site(&self) -> Result<Vec<CheckWithSite>, StoreError>;

    /// Appends the history row, mirrors it onto the check and sets the site status.
    /// Returns the updated check.
    async fn record_run(&self, run: &CheckRun) -> Result<check::Model, StoreError>;
}

pub struct SeaOrmCheckStore {
    db: DatabaseConnection,
}

impl SeaOrmCheckStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CheckStore for SeaOrmCheckStore {
    async fn list_checks_with_site(&self) -> Result<Vec<CheckWithSite>, StoreError> {
        let rows = Check::find()
            .find_also_related(Site)
            .order_by_asc(check::Column::Id)
            .all(&self.db)
            .await?;

        let checks = rows
            .into_iter()
            .filter_map(|(check, site)| match site {
                Some(site) => Some(CheckWithSite { check, site }),
                None => {
                    warn!(check_id = check.id, site_id = check.site_id, "Check has no parent site. Ignoring it.");
                    None
                }
            })
            .collect();
        Ok(checks)
    }

    async fn record_run(&self, run: &CheckRun) -> Result<check::Model, StoreError> {
        let txn = self.db.begin().await?;

        check_result::ActiveModel {
            check_id: Set(run.check_id),
            timestamp: Set(run.timestamp),
            status: Set(run.status.clone()),
            latency_ms: Set(run.latency_ms),
            response_text: Set(run.response_text.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let updated_check = check::ActiveModel {
            id: Set(run.check_id),
            status: Set(run.status.clone()),
            latency_ms: Set(Some(run.latency_ms)),
            response_text: Set(Some(run.response_text.clone())),
            updated_at: Set(run.timestamp),
            ..Default::default()
        }
        .update(&txn)
        .await
        .map_err(|e| match e {
            DbErr::RecordNotUpdated => StoreError::NotFound(format!("check {}", run.check_id)),
            other => StoreError::Database(other),
        })?;

        site::ActiveModel {
            id: Set(run.site_id),
            status: Set(run.site_status.clone()),
            updated_at: Set(run.timestamp),
            ..Default::default()
        }
        .update(&txn)
        .await
        .map_err(|e| match e {
            DbErr::RecordNotUpdated => StoreError::NotFound(format!("site {}", run.site_id)),
            other => StoreError::Database(other),
        })?;

        txn.commit().await?;
        Ok(updated_check)
    }
}
