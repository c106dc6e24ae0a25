//! Self-hosted Postgres backend.
//!
//! Documents live in one table per collection. Every committed row change
//! fires a `pg_notify` on [`listener::CHANNEL`]; [`listener`] bridges those
//! onto a [`ChangeBus`](notesync_events::ChangeBus), which drives the live
//! queries handed out by [`store::PgDocumentStore`].

pub mod listener;
pub mod objects;
pub mod schema;
pub mod store;

use sqlx::postgres::PgPoolOptions;

pub use objects::LocalObjectStore;
pub use store::PgDocumentStore;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}

/// Round-trip a trivial query to verify the pool can reach the database.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
