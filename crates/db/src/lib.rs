//! `roadnoise-db` -- PostgreSQL persistence for the traffic-noise ingest.
//!
//! Models mirror table rows, repositories are zero-sized structs of async
//! query functions, and [`writer::BatchWriter`] persists one ingest run
//! as independent transactional groups.

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;
pub mod writer;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to prove the connection works.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}

/// Empty every ingest table ahead of a bulk rebuild.
pub async fn clear_ingest_tables(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("TRUNCATE acoustic_samples, detections, monthly_buckets, daily_buckets")
        .execute(pool)
        .await?;
    tracing::info!("Cleared detections, acoustic samples and buckets");
    Ok(())
}
