//! Persistence gateway for scan results.
//!
//! One interface, two implementations selected once at startup: a durable
//! PostgreSQL store and an ephemeral no-op store. Call sites never branch
//! on connectivity, and reads never raise — an unreachable store looks
//! like an empty history.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::models::scan::{ScanContext, ScanInsights, ScanRecord};

/// Result of a save. `durable` is false when the result only exists in
/// this response: it will not appear in later `list`/`get` calls.
#[derive(Debug, Clone)]
pub struct SavedScan {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub durable: bool,
}

/// Scan result store, selected at startup from database availability.
#[derive(Clone)]
pub enum ScanStore {
    Durable(PgPool),
    Ephemeral,
}

impl ScanStore {
    pub fn from_pool(pool: Option<PgPool>) -> Self {
        match pool {
            Some(pool) => Self::Durable(pool),
            None => Self::Ephemeral,
        }
    }

    pub fn is_durable(&self) -> bool {
        matches!(self, Self::Durable(_))
    }

    /// Persist a scan result. Never fails the request: if the store is
    /// unreachable at call time the result gets a locally generated,
    /// time-ordered id and is reported as non-durable.
    pub async fn save(
        &self,
        ctx: &ScanContext,
        target_url: &str,
        scan_output: &str,
        insights: &ScanInsights,
        errors: &[String],
    ) -> SavedScan {
        let id = Uuid::now_v7();

        if let Self::Durable(pool) = self {
            let result = sqlx::query(
                r#"
                INSERT INTO scans (id, target_url, scan_output, insights, errors, requested_by, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(id)
            .bind(target_url)
            .bind(scan_output)
            .bind(Json(insights))
            .bind(Json(errors))
            .bind(&ctx.requested_by)
            .bind(ctx.started_at)
            .execute(pool)
            .await;

            match result {
                Ok(_) => {
                    return SavedScan {
                        id,
                        created_at: ctx.started_at,
                        durable: true,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Save failed; scan result will not be persisted");
                }
            }
        }

        SavedScan {
            id,
            created_at: ctx.started_at,
            durable: false,
        }
    }

    /// All persisted scans, newest first. Empty when the store is
    /// ephemeral or unreachable.
    pub async fn list(&self) -> Vec<ScanRecord> {
        match self {
            Self::Durable(pool) => {
                let result = sqlx::query_as::<_, ScanRecord>(
                    r#"
                    SELECT id, target_url, scan_output, insights, errors, requested_by, created_at
                    FROM scans
                    ORDER BY created_at DESC
                    "#,
                )
                .fetch_all(pool)
                .await;

                match result {
                    Ok(rows) => rows,
                    Err(e) => {
                        warn!(error = %e, "History fetch failed; returning empty history");
                        Vec::new()
                    }
                }
            }
            Self::Ephemeral => Vec::new(),
        }
    }

    /// One persisted scan by id; `None` for unknown ids and unreachable
    /// stores alike.
    pub async fn get(&self, id: Uuid) -> Option<ScanRecord> {
        match self {
            Self::Durable(pool) => {
                let result = sqlx::query_as::<_, ScanRecord>(
                    r#"
                    SELECT id, target_url, scan_output, insights, errors, requested_by, created_at
                    FROM scans
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .fetch_optional(pool)
                .await;

                match result {
                    Ok(row) => row,
                    Err(e) => {
                        warn!(error = %e, scan_id = %id, "Scan fetch failed");
                        None
                    }
                }
            }
            Self::Ephemeral => None,
        }
    }
}
