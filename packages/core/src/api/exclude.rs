use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::AppState;
use crate::error::AppError;
use crate::store::Exclusion;

/// Body shared by the endpoints that act on one site.
#[derive(Debug, Default, Deserialize)]
pub struct SiteIdRequest {
    #[serde(rename = "siteId", default)]
    pub site_id: Option<String>,
}

impl SiteIdRequest {
    /// The trimmed id. A missing body, a missing field and a blank value are
    /// all the same validation error.
    pub fn require(body: Option<Json<SiteIdRequest>>) -> Result<String, AppError> {
        body.and_then(|Json(request)| request.site_id)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Validation("Site ID is required".into()))
    }
}

/// `POST /api/exclude`: hide a site from every later listing.
pub async fn exclude_site(
    State(state): State<AppState>,
    body: Option<Json<SiteIdRequest>>,
) -> Result<Json<Value>, AppError> {
    let site_id = SiteIdRequest::require(body)?;
    let newly_excluded = state.exclusions()?.exclude(&site_id).await?;
    if newly_excluded {
        state.metrics.exclusions_total.inc();
    }
    tracing::info!(site_id = %site_id, newly_excluded, "Site excluded");

    let message = if newly_excluded {
        "Site excluded successfully"
    } else {
        "Site was already excluded"
    };
    Ok(Json(json!({
        "success": true,
        "siteId": site_id,
        "message": message,
    })))
}

#[derive(Debug, Serialize)]
pub struct ExclusionsResponse {
    pub success: bool,
    pub exclusions: Vec<Exclusion>,
    pub total: usize,
}

/// `GET /api/exclusions`
pub async fn list_exclusions(
    State(state): State<AppState>,
) -> Result<Json<ExclusionsResponse>, AppError> {
    let exclusions = state.exclusions()?.list().await?;
    Ok(Json(ExclusionsResponse {
        success: true,
        total: exclusions.len(),
        exclusions,
    }))
}
