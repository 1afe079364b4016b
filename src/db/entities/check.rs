use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::CheckType;

/// Status value of a check that has never been probed.
pub const PENDING_STATUS: &str = "pending";

pub const MIN_INTERVAL_SECONDS: i32 = 30;
pub const DEFAULT_INTERVAL_SECONDS: i32 = 300;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "checks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub site_id: i32,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub check_type: CheckType,
    pub interval_seconds: i32,
    // Mirror of the latest check_results row.
    pub status: String,
    #[sea_orm(nullable)]
    pub latency_ms: Option<i64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub response_text: Option<String>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::site::Entity",
        from = "Column::SiteId",
        to = "super::site::Column::Id",
        on_delete = "Cascade"
    )]
    Site,

    #[sea_orm(has_many = "super::check_result::Entity")]
    CheckResult,
}

impl Related<super::site::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Site.def()
    }
}

impl Related<super::check_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CheckResult.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
