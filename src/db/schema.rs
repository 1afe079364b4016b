//! Startup schema bootstrap: creates any missing tables from the entity definitions.

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Schema};
use tracing::debug;

use super::entities::{check, check_result, site, user};

pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    // Parents before children so foreign keys resolve.
    create_table_if_missing(db, &schema, user::Entity).await?;
    create_table_if_missing(db, &schema, site::Entity).await?;
    create_table_if_missing(db, &schema, check::Entity).await?;
    create_table_if_missing(db, &schema, check_result::Entity).await?;
    Ok(())
}

async fn create_table_if_missing<E>(
    db: &DatabaseConnection,
    schema: &Schema,
    entity: E,
) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let table = entity.table_name().to_owned();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    let backend = db.get_database_backend();
    db.execute(backend.build(&statement)).await?;
    debug!(table = %table, "Ensured table exists.");
    Ok(())
}
