//! Listing service: the read side of the gallery.
//!
//! Joins the site inventory against the exclusion store, orders the result
//! newest first and annotates every row with its classification and a
//! screenshot URL. Nothing is written and nothing is cached.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classify::{classify, Classification, DomainSet, HostingType};
use crate::error::AppError;
use crate::repository::{Site, SiteRepository, SiteSource};
use crate::services::screenshot::ScreenshotUrls;
use crate::store::ExclusionStore;

/// A visible site as the gallery consumes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedSite {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub source: SiteSource,
    pub screenshot_url: String,
    pub screenshot_updated_at: Option<DateTime<Utc>>,
    pub fallback_screenshots: Vec<String>,
    pub hosting_type: HostingType,
    pub is_netlify_sub: bool,
    pub is_dot_com: bool,
}

impl AnnotatedSite {
    /// `customDomain` if set, else `url`, without protocol or trailing slash.
    pub fn display_domain(&self) -> String {
        let target = self
            .custom_domain
            .as_deref()
            .filter(|domain| !domain.trim().is_empty())
            .unwrap_or(&self.url);
        strip_protocol(target)
    }

    pub fn classification(&self) -> Classification {
        Classification {
            hosting_type: self.hosting_type,
            is_netlify_sub: self.is_netlify_sub,
            is_dot_com: self.is_dot_com,
        }
    }
}

pub fn strip_protocol(target: &str) -> String {
    let target = target.trim();
    let bare = target
        .strip_prefix("https://")
        .or_else(|| target.strip_prefix("http://"))
        .unwrap_or(target);
    bare.trim_end_matches('/').to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingState {
    Ready,
    NoSitesYet,
}

#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub state: ListingState,
    pub sites: Vec<AnnotatedSite>,
}

impl Listing {
    pub fn total(&self) -> usize {
        self.sites.len()
    }
}

#[derive(Clone)]
pub struct ListingService {
    sites: SiteRepository,
    exclusions: ExclusionStore,
    wpmu: Arc<DomainSet>,
    screenshots: ScreenshotUrls,
}

impl ListingService {
    pub fn new(
        sites: SiteRepository,
        exclusions: ExclusionStore,
        wpmu: Arc<DomainSet>,
        screenshots: ScreenshotUrls,
    ) -> Self {
        Self {
            sites,
            exclusions,
            wpmu,
            screenshots,
        }
    }

    pub async fn list_sites(&self) -> Result<Listing, AppError> {
        let mut rows = self.sites.list_all().await?;
        if rows.is_empty() {
            return Ok(Listing {
                state: ListingState::NoSitesYet,
                sites: Vec::new(),
            });
        }

        // `list_all` yields insertion order and `sort_by` is stable, so equal
        // timestamps keep that order.
        rows.sort_by(|a, b| newest_first(a.created_at, b.created_at));

        let excluded = self.exclusions.excluded_ids().await?;
        let sites = rows
            .into_iter()
            .filter(|site| !excluded.contains(&site.id))
            .map(|site| self.annotate(site))
            .collect();

        Ok(Listing {
            state: ListingState::Ready,
            sites,
        })
    }

    fn annotate(&self, site: Site) -> AnnotatedSite {
        let classification = classify(&site, &self.wpmu);
        let target = site.display_target().to_string();
        let (screenshot_url, screenshot_updated_at) = match site.screenshot {
            Some(shot) => (shot.url, shot.captured_at),
            None => (self.screenshots.primary(&target), None),
        };

        AnnotatedSite {
            fallback_screenshots: self.screenshots.fallbacks(&target),
            id: site.id,
            name: site.name,
            url: site.url,
            custom_domain: site.custom_domain,
            created_at: site.created_at,
            updated_at: site.updated_at,
            source: site.source,
            screenshot_url,
            screenshot_updated_at,
            hosting_type: classification.hosting_type,
            is_netlify_sub: classification.is_netlify_sub,
            is_dot_com: classification.is_dot_com,
        }
    }
}

/// Descending by timestamp; rows without one go last.
pub fn newest_first(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
