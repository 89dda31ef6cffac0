//! Database connection pool and boot-time schema setup.
//!
//! Connection failure is not fatal: the caller falls back to the
//! ephemeral store and the service keeps running without persistence.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::AppConfig;

/// Create a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Ensure the `scans` table exists.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scans (
            id UUID PRIMARY KEY,
            target_url TEXT NOT NULL,
            scan_output TEXT NOT NULL,
            insights JSONB NOT NULL,
            errors JSONB NOT NULL DEFAULT '[]'::jsonb,
            requested_by TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Try to connect and prepare the schema, returning `None` when the
/// database is unreachable so the caller can degrade to ephemeral mode.
pub async fn connect(config: &AppConfig) -> Option<PgPool> {
    let url = match &config.database_url {
        Some(url) => url,
        None => {
            tracing::warn!("DATABASE_URL not set; scan results will not be persisted");
            return None;
        }
    };

    match create_pool(url, config.database_max_connections).await {
        Ok(pool) => match ensure_schema(&pool).await {
            Ok(()) => {
                tracing::info!("Connected to PostgreSQL database");
                Some(pool)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to prepare schema; continuing without persistence");
                None
            }
        },
        Err(e) => {
            tracing::error!(error = %e, "Database connection error; continuing without persistence");
            None
        }
    }
}
