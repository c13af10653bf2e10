//! Exclusion store.
//!
//! `ExclusionStore` persists the set of site ids the operator has hidden.
//! Rows are independent of the `sites` table: an id may be excluded before
//! any sync has brought the site in, and nothing ever removes an exclusion
//! automatically.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::error::{is_missing_table, AppError};
use crate::repository::parse_timestamp;

/// A hidden site id and when it was hidden.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exclusion {
    pub site_id: String,
    pub excluded_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct ExclusionStore {
    pool: SqlitePool,
}

impl ExclusionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Hide `site_id`. Excluding an id twice is a successful no-op.
    ///
    /// Returns `true` when a new row was recorded.
    pub async fn exclude(&self, site_id: &str) -> Result<bool, AppError> {
        let site_id = site_id.trim();
        if site_id.is_empty() {
            return Err(AppError::Validation("Site ID is required".to_string()));
        }

        let result = sqlx::query(
            "INSERT INTO excluded_sites (site_id, excluded_at) VALUES (?, ?)
             ON CONFLICT(site_id) DO NOTHING",
        )
        .bind(site_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All hidden ids. A missing table (first run) reads as an empty set.
    pub async fn excluded_ids(&self) -> Result<HashSet<String>, AppError> {
        let rows = match sqlx::query("SELECT site_id FROM excluded_sites")
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => rows,
            Err(err) if is_missing_table(&err) => {
                tracing::debug!("excluded_sites table missing; treating exclusions as empty");
                return Ok(HashSet::new());
            }
            Err(err) => return Err(err.into()),
        };

        rows.iter()
            .map(|row| row.try_get::<String, _>("site_id").map_err(AppError::from))
            .collect()
    }

    /// All exclusions, most recent first.
    pub async fn list(&self) -> Result<Vec<Exclusion>, AppError> {
        let rows = sqlx::query(
            "SELECT site_id, excluded_at FROM excluded_sites ORDER BY excluded_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<Exclusion, AppError> {
                let site_id: String = row.try_get("site_id")?;
                let excluded_at: Option<String> = row.try_get("excluded_at")?;
                Ok(Exclusion {
                    site_id,
                    excluded_at: excluded_at.as_deref().and_then(parse_timestamp),
                })
            })
            .collect()
    }
}
