//! HTTP surface: shared state and route assembly.

pub mod admin;
pub mod exclude;
pub mod headers;
pub mod health;
pub mod sites;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::classify::DomainSet;
use crate::config::{Config, MISSING_DATABASE, MISSING_HOSTING_TOKEN};
use crate::error::AppError;
use crate::listing::ListingService;
use crate::metrics::AppMetrics;
use crate::repository::SiteRepository;
use crate::services::screenshot::ScreenshotUrls;
use crate::store::ExclusionStore;
use crate::sync::{HostingInventory, SyncLimits, SyncReconciler};

/// Everything a handler may need. Missing pieces (`pool`, `inventory`) are
/// reported per request as configuration errors rather than at startup, so
/// the listing can explain what is missing.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: Option<SqlitePool>,
    pub inventory: Option<Arc<dyn HostingInventory + Send + Sync>>,
    pub wpmu: Arc<DomainSet>,
    pub screenshots: ScreenshotUrls,
    pub metrics: Arc<AppMetrics>,
}

impl AppState {
    pub fn pool(&self) -> Result<&SqlitePool, AppError> {
        self.pool
            .as_ref()
            .ok_or_else(|| AppError::Config(MISSING_DATABASE.into()))
    }

    pub fn sites(&self) -> Result<SiteRepository, AppError> {
        Ok(SiteRepository::new(self.pool()?.clone()))
    }

    pub fn exclusions(&self) -> Result<ExclusionStore, AppError> {
        Ok(ExclusionStore::new(self.pool()?.clone()))
    }

    pub fn listing(&self) -> Result<ListingService, AppError> {
        Ok(ListingService::new(
            self.sites()?,
            self.exclusions()?,
            self.wpmu.clone(),
            self.screenshots.clone(),
        ))
    }

    /// Database is checked before the token so each gets its own message.
    pub fn reconciler(&self) -> Result<SyncReconciler, AppError> {
        let sites = self.sites()?;
        let inventory = self
            .inventory
            .clone()
            .ok_or_else(|| AppError::Config(MISSING_HOSTING_TOKEN.into()))?;

        Ok(SyncReconciler::new(
            inventory,
            sites,
            SyncLimits {
                per_page: self.config.sync_per_page,
                max_pages: self.config.sync_max_pages,
            },
        ))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .route("/api/sites", get(sites::list_sites))
        .route("/api/gallery", get(sites::gallery))
        .route("/api/exclude", post(exclude::exclude_site))
        .route("/api/exclusions", get(exclude::list_exclusions))
        .route("/api/admin/sync", post(admin::sync_sites))
        .route("/api/admin/seed", post(admin::seed_sites))
        .route("/api/screenshots", post(admin::refresh_screenshot))
        .route("/api/screenshots/generate", post(admin::generate_screenshots))
        .route_layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            track_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn track_requests(
    State(metrics): State<Arc<AppMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let started = Instant::now();

    let response = next.run(request).await;

    metrics
        .http_request_duration
        .observe(started.elapsed().as_secs_f64());
    metrics
        .http_requests_total
        .with_label_values(&[method.as_str(), path.as_str(), response.status().as_str()])
        .inc();
    response
}
