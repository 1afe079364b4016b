use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One immutable history row per probe execution.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "check_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub check_id: i32,
    pub timestamp: ChronoDateTimeUtc,
    pub status: String,
    pub latency_ms: i64,
    #[sea_orm(column_type = "Text")]
    pub response_text: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::check::Entity",
        from = "Column::CheckId",
        to = "super::check::Column::Id",
        on_delete = "Cascade"
    )]
    Check,
}

impl Related<super::check::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Check.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
