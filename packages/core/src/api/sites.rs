//! Read endpoints: `GET /api/sites` and `GET /api/gallery`.
//!
//! Both answer with `Cache-Control: no-store` on success and on failure.

use axum::{
    extract::{Query, State},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};

use super::headers::no_store;
use super::AppState;
use crate::error::AppError;
use crate::gallery::{FilterMode, Gallery, GalleryPage, SortMode};
use crate::listing::{AnnotatedSite, Listing, ListingState};

const NO_SITES_MESSAGE: &str = "No sites yet. Run a sync to import sites from Netlify.";

#[derive(Debug, Serialize)]
pub struct SitesResponse {
    pub success: bool,
    pub status: ListingState,
    pub sites: Vec<AnnotatedSite>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<Listing> for SitesResponse {
    fn from(listing: Listing) -> Self {
        let message = match listing.state {
            ListingState::NoSitesYet => Some(NO_SITES_MESSAGE.to_string()),
            ListingState::Ready => None,
        };
        Self {
            success: true,
            status: listing.state,
            total: listing.total(),
            sites: listing.sites,
            message,
        }
    }
}

pub async fn list_sites(State(state): State<AppState>) -> Response {
    no_store(load_sites(&state).await)
}

async fn load_sites(state: &AppState) -> Result<Json<SitesResponse>, AppError> {
    let listing = state.listing()?.list_sites().await?;
    state.metrics.listings_served_total.inc();
    Ok(Json(listing.into()))
}

#[derive(Debug, Default, Deserialize)]
pub struct GalleryQuery {
    pub q: Option<String>,
    pub sort: Option<String>,
    pub filter: Option<String>,
    /// Kept as text so a malformed value is reported like any other
    /// validation error.
    pub page: Option<String>,
}

fn parse_page(raw: Option<&str>) -> Result<usize, AppError> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| AppError::Validation(format!("Invalid page: {}", raw))),
        None => Ok(1),
    }
}

#[derive(Debug, Serialize)]
pub struct GalleryResponse {
    pub success: bool,
    pub status: ListingState,
    #[serde(flatten)]
    pub page: GalleryPage,
}

pub async fn gallery(
    State(state): State<AppState>,
    Query(query): Query<GalleryQuery>,
) -> Response {
    no_store(load_gallery(&state, query).await)
}

async fn load_gallery(
    state: &AppState,
    query: GalleryQuery,
) -> Result<Json<GalleryResponse>, AppError> {
    let sort = query
        .sort
        .as_deref()
        .map(str::parse::<SortMode>)
        .transpose()?
        .unwrap_or_default();
    let filter = query
        .filter
        .as_deref()
        .map(str::parse::<FilterMode>)
        .transpose()?
        .unwrap_or_default();
    let page = parse_page(query.page.as_deref())?;

    let listing = state.listing()?.list_sites().await?;
    state.metrics.listings_served_total.inc();

    let status = listing.state;
    let mut gallery = Gallery::new(listing.sites);
    gallery.set_search(query.q.unwrap_or_default());
    gallery.set_sort(sort);
    gallery.set_filter(filter);
    gallery.set_page(page);

    Ok(Json(GalleryResponse {
        success: true,
        status,
        page: gallery.current_page(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_parameter_parsing() {
        assert_eq!(parse_page(None).unwrap(), 1);
        assert_eq!(parse_page(Some(" ")).unwrap(), 1);
        assert_eq!(parse_page(Some("3")).unwrap(), 3);
        assert_eq!(parse_page(Some("0")).unwrap(), 0);
        assert!(matches!(parse_page(Some("abc")), Err(AppError::Validation(_))));
        assert!(matches!(parse_page(Some("-1")), Err(AppError::Validation(_))));
    }
}
