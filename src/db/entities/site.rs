use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::SiteStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "sites")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub url: String,
    #[sea_orm(nullable)]
    pub description: Option<String>,
    /// Written by the check runner only; CRUD sets the default on insert.
    pub status: SiteStatus,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(has_many = "super::check::Entity")]
    Check,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::check::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Check.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
