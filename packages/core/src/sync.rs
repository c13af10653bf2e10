//! Hosting inventory reconciliation.
//!
//! A pass has two phases. The fetch phase pages through the hosting API
//! until an empty page (or the page cap) and performs no writes, so any
//! fetch failure leaves the mirror exactly as it was. The write phase hands
//! the collected inventory to [`SiteRepository::replace_scoped`], which only
//! touches rows of the synced source.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppError;
use crate::repository::{parse_timestamp, Site, SiteRepository, SiteSource};
use crate::services::netlify::{NetlifyClient, RemoteSite};

/// Source of the authoritative site inventory.
#[async_trait]
pub trait HostingInventory {
    /// Fetch one 1-based page. An empty vector means there are no more pages.
    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<Vec<RemoteSite>, AppError>;

    /// Provenance tag written on every synced row.
    fn source(&self) -> SiteSource {
        SiteSource::Netlify
    }
}

#[async_trait]
impl HostingInventory for NetlifyClient {
    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<Vec<RemoteSite>, AppError> {
        self.fetch_sites_page(page, per_page).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SyncLimits {
    pub per_page: u32,
    pub max_pages: u32,
}

impl Default for SyncLimits {
    fn default() -> Self {
        Self {
            per_page: crate::config::DEFAULT_SYNC_PER_PAGE,
            max_pages: crate::config::DEFAULT_SYNC_MAX_PAGES,
        }
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub synced_count: usize,
    pub deleted_count: usize,
    pub pages_fetched: u32,
    /// Non-fatal problems: skipped items and an incomplete inventory.
    pub errors: Vec<String>,
}

pub struct SyncReconciler {
    inventory: Arc<dyn HostingInventory + Send + Sync>,
    sites: SiteRepository,
    limits: SyncLimits,
}

impl SyncReconciler {
    pub fn new(
        inventory: Arc<dyn HostingInventory + Send + Sync>,
        sites: SiteRepository,
        limits: SyncLimits,
    ) -> Self {
        Self {
            inventory,
            sites,
            limits,
        }
    }

    pub async fn reconcile(&self) -> Result<SyncReport, AppError> {
        let source = self.inventory.source();
        let mut report = SyncReport::default();

        let (remote, complete) = self.fetch_all(&mut report).await?;

        let mut incoming = Vec::with_capacity(remote.len());
        let mut seen = HashSet::new();
        for item in remote {
            match to_site(item, source) {
                Ok(site) if !seen.insert(site.id.clone()) => {
                    // Pages can shift while paging; first occurrence wins.
                    tracing::debug!("Remote site {} listed more than once", site.id);
                }
                Ok(site) => incoming.push(site),
                Err(reason) => report.errors.push(reason),
            }
        }

        if !complete {
            report.errors.push(format!(
                "Stopped after {} pages without reaching the end of the inventory; stale rows were kept",
                self.limits.max_pages
            ));
        }

        let outcome = self
            .sites
            .replace_scoped(source, &incoming, complete)
            .await?;

        for id in &outcome.skipped {
            report
                .errors
                .push(format!("Skipped remote site {}: id is owned by another source", id));
        }
        report.synced_count = outcome.upserted;
        report.deleted_count = outcome.deleted;

        tracing::info!(
            "Sync finished: {} upserted, {} deleted, {} pages, {} issues",
            report.synced_count,
            report.deleted_count,
            report.pages_fetched,
            report.errors.len()
        );

        Ok(report)
    }

    /// Collect every page. Returns the items and whether an empty page was
    /// reached before the cap.
    async fn fetch_all(
        &self,
        report: &mut SyncReport,
    ) -> Result<(Vec<RemoteSite>, bool), AppError> {
        let mut items = Vec::new();

        for page in 1..=self.limits.max_pages {
            let batch = self
                .inventory
                .fetch_page(page, self.limits.per_page)
                .await?;
            report.pages_fetched = page;

            if batch.is_empty() {
                return Ok((items, true));
            }
            tracing::debug!("Fetched page {} ({} sites)", page, batch.len());
            items.extend(batch);
        }

        Ok((items, false))
    }
}

fn to_site(item: RemoteSite, source: SiteSource) -> Result<Site, String> {
    let id = item.id.trim().to_string();
    if id.is_empty() {
        return Err("Skipped remote site with an empty id".to_string());
    }

    let url = item.url.unwrap_or_default();
    let name = item
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| id.clone());

    Ok(Site {
        name,
        url,
        custom_domain: item.custom_domain.filter(|domain| !domain.trim().is_empty()),
        created_at: item.created_at.as_deref().and_then(parse_timestamp),
        updated_at: item.updated_at.as_deref().and_then(parse_timestamp),
        source,
        screenshot: None,
        id,
    })
}
