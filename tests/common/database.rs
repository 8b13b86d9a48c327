//! Test database setup and management
#![allow(dead_code)]

use ruforo_moderation::app_config::DatabaseConfig;
use ruforo_moderation::db;
use ruforo_moderation::orm::{
    moderated_object_logs, moderated_objects, moderation_categories, moderation_penalties,
    moderation_reports,
};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Schema, Statement};

/// Indexes the entity definitions cannot express
const UNIQUE_INDEXES: &[&str] = &[
    moderated_objects::UNIQUE_INDEX,
    moderation_reports::UNIQUE_INDEX,
];

/// Get a fresh in-memory database
///
/// Every connection to `sqlite::memory:` is its own database, so the pool is
/// held to a single connection that lives as long as the test.
pub async fn get_test_db() -> Result<DatabaseConnection, DbErr> {
    db::connect(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..DatabaseConfig::default()
    })
    .await
}

async fn create_table<E>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    db.execute(backend.build(&schema.create_table_from_entity(entity)))
        .await?;
    Ok(())
}

/// Setup test database - connect and create the moderation tables
pub async fn setup_test_database() -> Result<DatabaseConnection, DbErr> {
    let db = get_test_db().await?;

    // Parents before children
    create_table(&db, moderation_categories::Entity).await?;
    create_table(&db, moderated_objects::Entity).await?;
    create_table(&db, moderation_reports::Entity).await?;
    create_table(&db, moderation_penalties::Entity).await?;
    create_table(&db, moderated_object_logs::Entity).await?;

    for sql in UNIQUE_INDEXES {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            sql.to_string(),
        ))
        .await?;
    }

    Ok(db)
}
