//! Database connection setup and helpers for interpreting database failures.

use crate::app_config::DatabaseConfig;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Statement,
};
use std::time::Duration;

/// Namespace for advisory locks taken on a user's penalty history.
const PENALTY_LOCK_NAMESPACE: i32 = 0x4d4f44; // "MOD"

/// Open a connection pool using the given configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .sqlx_logging(config.sqlx_logging);

    let db = Database::connect(options).await?;
    log::info!(
        "Connected to {:?} database (max_connections = {})",
        db.get_database_backend(),
        config.max_connections
    );
    Ok(db)
}

/// Whether the error came from a unique constraint rejecting an insert.
///
/// DbErr only carries the driver's message, so this matches on the wording
/// used by PostgreSQL, MySQL and SQLite.
pub fn is_unique_violation(err: &DbErr) -> bool {
    let msg = err.to_string();
    msg.contains("duplicate key value violates unique constraint")
        || msg.contains("UNIQUE constraint failed")
        || msg.contains("Duplicate entry")
}

/// Whether the error is a serialization failure or deadlock the caller may retry.
pub fn is_serialization_failure(err: &DbErr) -> bool {
    let msg = err.to_string();
    msg.contains("could not serialize access")
        || msg.contains("deadlock detected")
        || msg.contains("Deadlock found")
        || msg.contains("database is locked")
}

/// Take a row lock on a moderated object for the rest of the transaction.
///
/// Only PostgreSQL does anything here; SQLite serializes writers on its own.
pub async fn lock_moderated_object<C>(conn: &C, moderated_object_id: i32) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    if conn.get_database_backend() != DbBackend::Postgres {
        return Ok(());
    }

    conn.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT id FROM moderated_objects WHERE id = $1 FOR UPDATE",
        vec![moderated_object_id.into()],
    ))
    .await?;
    Ok(())
}

/// Serialize penalty issuing for one user until the transaction ends.
///
/// Two verifications against the same user would otherwise read the same
/// prior-penalty count and issue the same duration.
pub async fn lock_user_penalties<C>(conn: &C, user_id: i32) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    if conn.get_database_backend() != DbBackend::Postgres {
        return Ok(());
    }

    conn.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT pg_advisory_xact_lock($1, $2)",
        vec![PENALTY_LOCK_NAMESPACE.into(), user_id.into()],
    ))
    .await?;
    Ok(())
}
