//! Database repository for the site inventory.
//!
//! All SQLite read/write logic for the `sites` table lives here. The sync
//! reconciler calls [`SiteRepository::replace_scoped`] once per pass, the
//! seeder calls [`SiteRepository::insert_if_absent`], and the listing service
//! reads everything back with [`SiteRepository::list_all`].

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error::AppError;

/// Where a row came from. Reconciliation only ever replaces rows of the
/// source it syncs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SiteSource {
    #[default]
    Netlify,
    Wpmu,
    Other,
}

impl SiteSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteSource::Netlify => "netlify",
            SiteSource::Wpmu => "wpmu",
            SiteSource::Other => "other",
        }
    }

    /// NULL (legacy rows) reads as `netlify`; anything unrecognised as `other`.
    pub fn from_column(value: Option<&str>) -> Self {
        match value {
            None | Some("netlify") => SiteSource::Netlify,
            Some("wpmu") => SiteSource::Wpmu,
            Some(_) => SiteSource::Other,
        }
    }
}

impl fmt::Display for SiteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A previously generated screenshot URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotRef {
    pub url: String,
    pub captured_at: Option<DateTime<Utc>>,
}

/// One hosted website as stored in the `sites` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub name: String,
    pub url: String,
    pub custom_domain: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub source: SiteSource,
    pub screenshot: Option<ScreenshotRef>,
}

impl Site {
    /// The address shown to the operator: the custom domain when one is set,
    /// otherwise the provider URL.
    pub fn display_target(&self) -> &str {
        match self.custom_domain.as_deref() {
            Some(domain) if !domain.trim().is_empty() => domain,
            _ => &self.url,
        }
    }
}

/// What a scoped replace did to the table.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReplaceOutcome {
    pub upserted: usize,
    pub deleted: usize,
    /// Incoming ids left alone because another source owns the row.
    pub skipped: Vec<String>,
}

/// Repository for reading and writing sites to SQLite.
#[derive(Clone)]
pub struct SiteRepository {
    pool: SqlitePool,
}

const SITE_COLUMNS: &str = "id, name, url, custom_domain, created_at, updated_at, source, screenshot_url, screenshot_updated_at";

impl SiteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Every row in insertion order.
    pub async fn list_all(&self) -> Result<Vec<Site>, AppError> {
        let sql = format!("SELECT {} FROM sites ORDER BY rowid ASC", SITE_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let sites = rows.iter().map(site_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }

    pub async fn find(&self, id: &str) -> Result<Option<Site>, AppError> {
        let sql = format!("SELECT {} FROM sites WHERE id = ?", SITE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(site_from_row).transpose()?)
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM sites")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("cnt")?)
    }

    /// Replace the rows owned by `source` (or with no source) with `sites`
    /// in a single transaction.
    ///
    /// Each incoming site is upserted by id; the cached screenshot of an
    /// existing row survives. An id already owned by a different source is
    /// left untouched and reported in [`ReplaceOutcome::skipped`]. When
    /// `delete_stale` is set, rows of `source` or NULL source whose id is not
    /// in `sites` are removed. Rows of other sources are never deleted.
    pub async fn replace_scoped(
        &self,
        source: SiteSource,
        sites: &[Site],
        delete_stale: bool,
    ) -> Result<ReplaceOutcome, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut outcome = ReplaceOutcome::default();

        for site in sites {
            let result = sqlx::query(
                "INSERT INTO sites (id, name, url, custom_domain, created_at, updated_at, source)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    url = excluded.url,
                    custom_domain = excluded.custom_domain,
                    created_at = excluded.created_at,
                    updated_at = excluded.updated_at,
                    source = excluded.source
                 WHERE sites.source IS NULL OR sites.source = excluded.source",
            )
            .bind(&site.id)
            .bind(&site.name)
            .bind(&site.url)
            .bind(site.custom_domain.as_deref())
            .bind(site.created_at.map(|ts| ts.to_rfc3339()))
            .bind(site.updated_at.map(|ts| ts.to_rfc3339()))
            .bind(source.as_str())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                outcome.skipped.push(site.id.clone());
            } else {
                outcome.upserted += 1;
            }
        }

        if delete_stale {
            let keep: HashSet<&str> = sites.iter().map(|site| site.id.as_str()).collect();
            let rows = sqlx::query("SELECT id FROM sites WHERE source IS NULL OR source = ?")
                .bind(source.as_str())
                .fetch_all(&mut *tx)
                .await?;

            for row in rows {
                let id: String = row.try_get("id")?;
                if keep.contains(id.as_str()) {
                    continue;
                }
                let result = sqlx::query(
                    "DELETE FROM sites WHERE id = ? AND (source IS NULL OR source = ?)",
                )
                .bind(&id)
                .bind(source.as_str())
                .execute(&mut *tx)
                .await?;
                outcome.deleted += result.rows_affected() as usize;
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    /// Insert `site` unless a row already uses its id or its custom domain.
    /// Returns `true` when a row was written.
    pub async fn insert_if_absent(&self, site: &Site) -> Result<bool, AppError> {
        let domain = site.custom_domain.as_deref().unwrap_or(&site.id);
        let existing = sqlx::query(
            "SELECT COUNT(*) AS cnt FROM sites WHERE id = ? OR id = ? OR custom_domain = ?",
        )
        .bind(&site.id)
        .bind(domain)
        .bind(domain)
        .fetch_one(&self.pool)
        .await?;
        let count: i64 = existing.try_get("cnt")?;
        if count > 0 {
            return Ok(false);
        }

        let result = sqlx::query(
            "INSERT INTO sites (id, name, url, custom_domain, created_at, updated_at, source)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&site.id)
        .bind(&site.name)
        .bind(&site.url)
        .bind(site.custom_domain.as_deref())
        .bind(site.created_at.map(|ts| ts.to_rfc3339()))
        .bind(site.updated_at.map(|ts| ts.to_rfc3339()))
        .bind(site.source.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Store a screenshot URL for `id`. Returns `false` if the id is unknown.
    pub async fn set_screenshot(
        &self,
        id: &str,
        url: &str,
        captured_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE sites SET screenshot_url = ?, screenshot_updated_at = ? WHERE id = ?",
        )
        .bind(url)
        .bind(captured_at.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sites that have never had a screenshot generated.
    pub async fn without_screenshot(&self) -> Result<Vec<Site>, AppError> {
        let sql = format!(
            "SELECT {} FROM sites WHERE screenshot_url IS NULL ORDER BY rowid ASC",
            SITE_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let sites = rows.iter().map(site_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }
}

/// Parse a stored or remote timestamp. Unparseable values read as absent.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

fn site_from_row(row: &SqliteRow) -> Result<Site, sqlx::Error> {
    let created_at: Option<String> = row.try_get("created_at")?;
    let updated_at: Option<String> = row.try_get("updated_at")?;
    let source: Option<String> = row.try_get("source")?;
    let screenshot_url: Option<String> = row.try_get("screenshot_url")?;
    let screenshot_updated_at: Option<String> = row.try_get("screenshot_updated_at")?;

    Ok(Site {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        url: row.try_get("url")?,
        custom_domain: row
            .try_get::<Option<String>, _>("custom_domain")?
            .filter(|domain| !domain.trim().is_empty()),
        created_at: created_at.as_deref().and_then(parse_timestamp),
        updated_at: updated_at.as_deref().and_then(parse_timestamp),
        source: SiteSource::from_column(source.as_deref()),
        screenshot: screenshot_url.map(|url| ScreenshotRef {
            url,
            captured_at: screenshot_updated_at.as_deref().and_then(parse_timestamp),
        }),
    })
}


#[cfg(test)]
mod tests {
    use super::fixtures::site;
    use super::*;

    use crate::db::create_pool;

    async fn make_repo() -> SiteRepository {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        SiteRepository::new(pool)
    }

    #[tokio::test]
    async fn list_all_returns_empty_when_no_data() {
        let repo = make_repo().await;
        assert!(repo.list_all().await.unwrap().is_empty());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn replace_scoped_inserts_and_reads_back() {
        let repo = make_repo().await;
        let mut incoming = site("abc", SiteSource::Netlify);
        incoming.custom_domain = Some("example.com".into());

        let outcome = repo
            .replace_scoped(SiteSource::Netlify, &[incoming.clone()], true)
            .await
            .unwrap();
        assert_eq!(outcome.upserted, 1);
        assert_eq!(outcome.deleted, 0);

        let stored = repo.find("abc").await.unwrap().unwrap();
        assert_eq!(stored, incoming);
        assert_eq!(stored.display_target(), "example.com");
    }

    #[tokio::test]
    async fn replace_scoped_keeps_other_sources() {
        let repo = make_repo().await;
        repo.insert_if_absent(&site("a", SiteSource::Wpmu)).await.unwrap();
        repo.replace_scoped(SiteSource::Netlify, &[site("b", SiteSource::Netlify)], true)
            .await
            .unwrap();

        let outcome = repo
            .replace_scoped(SiteSource::Netlify, &[site("c", SiteSource::Netlify)], true)
            .await
            .unwrap();
        assert_eq!(outcome.deleted, 1);

        let ids: Vec<String> = repo.list_all().await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn replace_scoped_skips_ids_owned_by_other_source() {
        let repo = make_repo().await;
        let wpmu = site("shared", SiteSource::Wpmu);
        repo.insert_if_absent(&wpmu).await.unwrap();

        let mut remote = site("shared", SiteSource::Netlify);
        remote.name = "overwritten".into();
        let outcome = repo
            .replace_scoped(SiteSource::Netlify, &[remote], true)
            .await
            .unwrap();

        assert_eq!(outcome.skipped, vec!["shared".to_string()]);
        assert_eq!(outcome.upserted, 0);
        let stored = repo.find("shared").await.unwrap().unwrap();
        assert_eq!(stored.name, wpmu.name);
        assert_eq!(stored.source, SiteSource::Wpmu);
    }

    #[tokio::test]
    async fn replace_scoped_treats_null_source_as_synced_source() {
        let repo = make_repo().await;
        sqlx::query("INSERT INTO sites (id, name, url, source) VALUES ('legacy', 'Legacy', 'https://legacy.netlify.app', NULL)")
            .execute(&repo.pool)
            .await
            .unwrap();

        let listed = repo.list_all().await.unwrap();
        assert_eq!(listed[0].source, SiteSource::Netlify);

        let outcome = repo.replace_scoped(SiteSource::Netlify, &[], true).await.unwrap();
        assert_eq!(outcome.deleted, 1);
        assert!(repo.find("legacy").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replace_scoped_without_delete_keeps_stale_rows() {
        let repo = make_repo().await;
        repo.replace_scoped(SiteSource::Netlify, &[site("old", SiteSource::Netlify)], true)
            .await
            .unwrap();

        let outcome = repo
            .replace_scoped(SiteSource::Netlify, &[site("new", SiteSource::Netlify)], false)
            .await
            .unwrap();
        assert_eq!(outcome.deleted, 0);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn upsert_preserves_cached_screenshot() {
        let repo = make_repo().await;
        repo.replace_scoped(SiteSource::Netlify, &[site("abc", SiteSource::Netlify)], true)
            .await
            .unwrap();
        assert!(repo
            .set_screenshot("abc", "https://shots.example/abc.png", Utc::now())
            .await
            .unwrap());

        let mut renamed = site("abc", SiteSource::Netlify);
        renamed.name = "renamed".into();
        repo.replace_scoped(SiteSource::Netlify, &[renamed], true)
            .await
            .unwrap();

        let stored = repo.find("abc").await.unwrap().unwrap();
        assert_eq!(stored.name, "renamed");
        assert_eq!(
            stored.screenshot.map(|shot| shot.url).as_deref(),
            Some("https://shots.example/abc.png")
        );
    }

    #[tokio::test]
    async fn insert_if_absent_matches_id_or_custom_domain() {
        let repo = make_repo().await;
        let mut netlify = site("n1", SiteSource::Netlify);
        netlify.custom_domain = Some("example.com".into());
        repo.replace_scoped(SiteSource::Netlify, &[netlify], true)
            .await
            .unwrap();

        let mut seeded = site("example.com", SiteSource::Wpmu);
        seeded.custom_domain = Some("example.com".into());
        assert!(!repo.insert_if_absent(&seeded).await.unwrap());

        let mut fresh = site("fresh.io", SiteSource::Wpmu);
        fresh.custom_domain = Some("fresh.io".into());
        assert!(repo.insert_if_absent(&fresh).await.unwrap());
        assert!(!repo.insert_if_absent(&fresh).await.unwrap());
    }

    #[tokio::test]
    async fn set_screenshot_returns_false_for_missing_id() {
        let repo = make_repo().await;
        let updated = repo
            .set_screenshot("missing", "https://shots.example/x.png", Utc::now())
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn without_screenshot_lists_only_uncaptured_sites() {
        let repo = make_repo().await;
        repo.replace_scoped(
            SiteSource::Netlify,
            &[site("a", SiteSource::Netlify), site("b", SiteSource::Netlify)],
            true,
        )
        .await
        .unwrap();
        repo.set_screenshot("a", "https://shots.example/a.png", Utc::now())
            .await
            .unwrap();

        let pending = repo.without_screenshot().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "b");
    }

    #[test]
    fn unknown_source_reads_as_other() {
        assert_eq!(SiteSource::from_column(Some("ftp")), SiteSource::Other);
        assert_eq!(SiteSource::from_column(None), SiteSource::Netlify);
    }

    #[test]
    fn parse_timestamp_accepts_fractional_seconds() {
        assert!(parse_timestamp("2024-01-15T10:00:00.123Z").is_some());
        assert!(parse_timestamp("not a date").is_none());
    }
}
