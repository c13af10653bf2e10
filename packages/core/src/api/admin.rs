//! Operator endpoints: sync, bulk seed and screenshot maintenance.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use super::exclude::SiteIdRequest;
use super::AppState;
use crate::error::AppError;
use crate::scheduler::sync_once;
use crate::seed;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub message: String,
    /// Rows upserted in this pass.
    pub total: usize,
    pub deleted: usize,
    pub pages_fetched: u32,
    pub errors: Vec<String>,
}

/// `POST /api/admin/sync`: mirror the hosting inventory into the database.
pub async fn sync_sites(State(state): State<AppState>) -> Result<Json<SyncResponse>, AppError> {
    let reconciler = state.reconciler()?;
    let report = sync_once(&reconciler, &state.metrics).await?;

    Ok(Json(SyncResponse {
        success: true,
        message: "Sites synced successfully".to_string(),
        total: report.synced_count,
        deleted: report.deleted_count,
        pages_fetched: report.pages_fetched,
        errors: report.errors,
    }))
}

/// `POST /api/admin/seed`: add a row for every WPMU domain not yet known.
pub async fn seed_sites(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let report = seed::seed_sites(&state.sites()?, &state.wpmu).await?;
    Ok(Json(json!({
        "success": true,
        "message": "WPMU sites added successfully",
        "added": report.added,
        "skipped": report.skipped,
        "total": report.total,
    })))
}

/// `POST /api/screenshots`: store a URL that forces a new capture.
pub async fn refresh_screenshot(
    State(state): State<AppState>,
    body: Option<Json<SiteIdRequest>>,
) -> Result<Json<Value>, AppError> {
    let site_id = SiteIdRequest::require(body)?;
    let sites = state.sites()?;
    let site = sites
        .find(&site_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Site {}", site_id)))?;

    let screenshot_url = state.screenshots.fresh(site.display_target());
    let captured_at = Utc::now();
    sites
        .set_screenshot(&site.id, &screenshot_url, captured_at)
        .await?;

    tracing::info!("Screenshot refreshed for {}", site.id);
    Ok(Json(json!({
        "success": true,
        "siteId": site.id,
        "screenshotUrl": screenshot_url,
        "screenshotUpdatedAt": captured_at,
        "message": "Screenshot refreshed",
    })))
}

/// `POST /api/screenshots/generate`: fill in a primary URL for every site
/// that has none.
pub async fn generate_screenshots(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let sites = state.sites()?;
    let pending = sites.without_screenshot().await?;
    let captured_at = Utc::now();

    let mut updated = 0usize;
    for site in &pending {
        let url = state.screenshots.primary(site.display_target());
        if sites.set_screenshot(&site.id, &url, captured_at).await? {
            updated += 1;
        }
    }

    tracing::info!("Generated screenshots for {} sites", updated);
    Ok(Json(json!({
        "success": true,
        "message": format!("Generated screenshots for {} sites", updated),
        "total": updated,
    })))
}
