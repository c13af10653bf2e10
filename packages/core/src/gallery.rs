//! Gallery view model.
//!
//! Holds the operator's controls (search, sort, classification filter, page)
//! over a listing and derives the visible page from them. Changing any
//! control other than the page sends the view back to page 1.

use std::cmp::Ordering;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::classify::HostingType;
use crate::error::AppError;
use crate::listing::{newest_first, AnnotatedSite};
use crate::store::ExclusionStore;

pub const SITES_PER_PAGE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    Name,
    Date,
    Domain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    All,
    Dotcom,
    Netlify,
    Wordpress,
}

impl FromStr for SortMode {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(SortMode::Name),
            "date" => Ok(SortMode::Date),
            "domain" => Ok(SortMode::Domain),
            other => Err(AppError::Validation(format!("Unknown sort mode: {}", other))),
        }
    }
}

impl FromStr for FilterMode {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(FilterMode::All),
            "dotcom" => Ok(FilterMode::Dotcom),
            "netlify" => Ok(FilterMode::Netlify),
            "wordpress" => Ok(FilterMode::Wordpress),
            other => Err(AppError::Validation(format!("Unknown filter: {}", other))),
        }
    }
}

impl FilterMode {
    pub fn matches(&self, site: &AnnotatedSite) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::Dotcom => site.is_dot_com,
            FilterMode::Netlify => site.hosting_type == HostingType::Netlify,
            FilterMode::Wordpress => site.hosting_type == HostingType::Wpmu,
        }
    }
}

/// Confirms an exclusion with the backend.
#[async_trait]
pub trait ExclusionCommand {
    async fn exclude(&self, site_id: &str) -> Result<(), AppError>;
}

#[async_trait]
impl ExclusionCommand for ExclusionStore {
    async fn exclude(&self, site_id: &str) -> Result<(), AppError> {
        ExclusionStore::exclude(self, site_id).await.map(|_| ())
    }
}

/// Badge counts over the unfiltered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FilterCounts {
    pub all: usize,
    pub dotcom: usize,
    pub netlify: usize,
    pub wordpress: usize,
}

impl FilterCounts {
    pub fn of(sites: &[AnnotatedSite]) -> Self {
        Self {
            all: sites.len(),
            dotcom: sites.iter().filter(|s| FilterMode::Dotcom.matches(s)).count(),
            netlify: sites.iter().filter(|s| FilterMode::Netlify.matches(s)).count(),
            wordpress: sites.iter().filter(|s| FilterMode::Wordpress.matches(s)).count(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryPage {
    pub sites: Vec<AnnotatedSite>,
    pub page: usize,
    pub total_pages: usize,
    /// Matches after search and filter.
    pub filtered_total: usize,
    /// Everything in the listing.
    pub total: usize,
    pub counts: FilterCounts,
}

/// Operator controls plus the in-memory list they apply to.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    sites: Vec<AnnotatedSite>,
    search_query: String,
    sort_mode: SortMode,
    filter_mode: FilterMode,
    page: usize,
}

impl Gallery {
    pub fn new(sites: Vec<AnnotatedSite>) -> Self {
        Self {
            sites,
            page: 1,
            ..Self::default()
        }
    }

    pub fn sites(&self) -> &[AnnotatedSite] {
        &self.sites
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.filter_mode
    }

    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
        self.page = 1;
    }

    pub fn set_sort(&mut self, mode: SortMode) {
        self.sort_mode = mode;
        self.page = 1;
    }

    pub fn set_filter(&mut self, mode: FilterMode) {
        self.filter_mode = mode;
        self.page = 1;
    }

    /// Only the page changes; 0 reads as 1.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Filtered and sorted, before paging.
    pub fn visible(&self) -> Vec<&AnnotatedSite> {
        let query = self.search_query.trim().to_lowercase();
        let mut matched: Vec<&AnnotatedSite> = self
            .sites
            .iter()
            .filter(|site| self.filter_mode.matches(site))
            .filter(|site| matches_search(site, &query))
            .collect();

        match self.sort_mode {
            SortMode::Name => matched.sort_by(|a, b| compare_ci(&a.name, &b.name)),
            SortMode::Date => matched.sort_by(|a, b| newest_first(a.created_at, b.created_at)),
            SortMode::Domain => {
                matched.sort_by(|a, b| compare_ci(&a.display_domain(), &b.display_domain()))
            }
        }
        matched
    }

    /// The current page. A page past the end is empty rather than an error.
    pub fn current_page(&self) -> GalleryPage {
        let visible = self.visible();
        let filtered_total = visible.len();
        let page = self.page();
        let start = (page - 1).saturating_mul(SITES_PER_PAGE);

        let sites = visible
            .into_iter()
            .skip(start)
            .take(SITES_PER_PAGE)
            .cloned()
            .collect();

        GalleryPage {
            sites,
            page,
            total_pages: filtered_total.div_ceil(SITES_PER_PAGE),
            filtered_total,
            total: self.sites.len(),
            counts: FilterCounts::of(&self.sites),
        }
    }

    /// Hide `site_id` through `command`. The site leaves the in-memory list
    /// only once the command succeeds; on failure the list is unchanged and
    /// the error is returned for display.
    pub async fn exclude<C>(&mut self, site_id: &str, command: &C) -> Result<(), AppError>
    where
        C: ExclusionCommand + Sync + ?Sized,
    {
        command.exclude(site_id).await?;
        self.sites.retain(|site| site.id != site_id);
        Ok(())
    }
}

fn matches_search(site: &AnnotatedSite, lowered_query: &str) -> bool {
    if lowered_query.is_empty() {
        return true;
    }
    site.name.to_lowercase().contains(lowered_query)
        || site.display_domain().to_lowercase().contains(lowered_query)
}

fn compare_ci(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

    use crate::repository::SiteSource;

    fn annotated(id: &str, name: &str, domain: Option<&str>, hosting: HostingType) -> AnnotatedSite {
        AnnotatedSite {
            id: id.to_string(),
            name: name.to_string(),
            url: format!("https://{}.netlify.app", id),
            custom_domain: domain.map(str::to_string),
            created_at: None,
            updated_at: None,
            source: SiteSource::Netlify,
            screenshot_url: String::new(),
            screenshot_updated_at: None,
            fallback_screenshots: Vec::new(),
            hosting_type: hosting,
            is_netlify_sub: true,
            is_dot_com: domain.map(|d| d.ends_with(".com")).unwrap_or(false),
        }
    }

    fn many(count: usize) -> Vec<AnnotatedSite> {
        (0..count)
            .map(|i| annotated(&format!("s{:03}", i), &format!("Site {:03}", i), None, HostingType::Netlify))
            .collect()
    }

    fn names(gallery: &Gallery) -> Vec<String> {
        gallery.visible().into_iter().map(|s| s.name.clone()).collect()
    }

    struct FakeCommand {
        fail: bool,
        called: AtomicBool,
    }

    #[async_trait]
    impl ExclusionCommand for FakeCommand {
        async fn exclude(&self, _site_id: &str) -> Result<(), AppError> {
            self.called.store(true, AtomicOrdering::SeqCst);
            if self.fail {
                Err(AppError::Database("disk full".into()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn modes_parse_from_query_values() {
        assert_eq!("Domain".parse::<SortMode>().unwrap(), SortMode::Domain);
        assert_eq!("wordpress".parse::<FilterMode>().unwrap(), FilterMode::Wordpress);
        assert!(matches!(
            "size".parse::<SortMode>(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn name_sort_is_case_insensitive() {
        let gallery = Gallery::new(vec![
            annotated("1", "Zeta", None, HostingType::Netlify),
            annotated("2", "alpha", None, HostingType::Netlify),
            annotated("3", "Beta", None, HostingType::Netlify),
        ]);
        assert_eq!(names(&gallery), vec!["alpha", "Beta", "Zeta"]);
    }

    #[test]
    fn name_sort_is_stable_for_equal_names() {
        let gallery = Gallery::new(vec![
            annotated("first", "Same", None, HostingType::Netlify),
            annotated("second", "same", None, HostingType::Netlify),
        ]);
        let ids: Vec<&str> = gallery.visible().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn date_sort_is_newest_first() {
        let mut old = annotated("old", "Old", None, HostingType::Netlify);
        old.created_at = Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
        let mut new = annotated("new", "New", None, HostingType::Netlify);
        new.created_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

        let mut gallery = Gallery::new(vec![old, new]);
        gallery.set_sort(SortMode::Date);
        assert_eq!(names(&gallery), vec!["New", "Old"]);
    }

    #[test]
    fn domain_sort_uses_display_domain() {
        let mut gallery = Gallery::new(vec![
            annotated("zz", "First", Some("Beta.com"), HostingType::Netlify),
            annotated("aa", "Second", Some("zulu.com"), HostingType::Netlify),
            annotated("mm", "Third", None, HostingType::Netlify),
        ]);
        gallery.set_sort(SortMode::Domain);
        assert_eq!(names(&gallery), vec!["First", "Third", "Second"]);
    }

    #[test]
    fn search_matches_name_or_domain_case_insensitively() {
        let mut gallery = Gallery::new(vec![
            annotated("a", "Portfolio", None, HostingType::Netlify),
            annotated("b", "Shop", Some("BestShop.com"), HostingType::Netlify),
            annotated("c", "Blog", None, HostingType::Netlify),
        ]);

        gallery.set_search("PORT");
        assert_eq!(names(&gallery), vec!["Portfolio"]);

        gallery.set_search("bestshop");
        assert_eq!(names(&gallery), vec!["Shop"]);

        // Protocol is stripped before matching.
        gallery.set_search("https");
        assert!(gallery.visible().is_empty());

        gallery.set_search("");
        assert_eq!(gallery.visible().len(), 3);
    }

    #[test]
    fn classification_filters_apply() {
        let mut gallery = Gallery::new(vec![
            annotated("a", "A", Some("a.com"), HostingType::Netlify),
            annotated("b", "B", Some("b.io"), HostingType::Wpmu),
            annotated("c", "C", Some("c.com"), HostingType::Wpmu),
        ]);

        gallery.set_filter(FilterMode::Dotcom);
        assert_eq!(names(&gallery), vec!["A", "C"]);
        gallery.set_filter(FilterMode::Netlify);
        assert_eq!(names(&gallery), vec!["A"]);
        gallery.set_filter(FilterMode::Wordpress);
        assert_eq!(names(&gallery), vec!["B", "C"]);
        gallery.set_filter(FilterMode::All);
        assert_eq!(gallery.visible().len(), 3);

        let counts = gallery.current_page().counts;
        assert_eq!(
            counts,
            FilterCounts {
                all: 3,
                dotcom: 2,
                netlify: 1,
                wordpress: 2
            }
        );
    }

    #[test]
    fn changing_controls_resets_page_but_page_change_does_not() {
        let mut gallery = Gallery::new(many(50));
        gallery.set_search("site");
        gallery.set_sort(SortMode::Domain);
        gallery.set_page(3);

        assert_eq!(gallery.page(), 3);
        assert_eq!(gallery.search_query(), "site");
        assert_eq!(gallery.sort_mode(), SortMode::Domain);

        gallery.set_search("site 0");
        assert_eq!(gallery.page(), 1);

        gallery.set_page(2);
        gallery.set_sort(SortMode::Name);
        assert_eq!(gallery.page(), 1);

        gallery.set_page(2);
        gallery.set_filter(FilterMode::Dotcom);
        assert_eq!(gallery.page(), 1);
        assert_eq!(gallery.filter_mode(), FilterMode::Dotcom);
    }

    #[test]
    fn pages_slice_the_sorted_list() {
        let mut gallery = Gallery::new(many(45));
        let first = gallery.current_page();
        assert_eq!(first.sites.len(), SITES_PER_PAGE);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.sites[0].name, "Site 000");

        gallery.set_page(3);
        let last = gallery.current_page();
        assert_eq!(last.sites.len(), 5);
        assert_eq!(last.sites[0].name, "Site 040");
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let mut gallery = Gallery::new(many(5));
        gallery.set_page(99);
        let page = gallery.current_page();
        assert!(page.sites.is_empty());
        assert_eq!(page.filtered_total, 5);
    }

    #[tokio::test]
    async fn exclude_removes_only_after_confirmation() {
        let mut gallery = Gallery::new(many(3));
        let ok = FakeCommand {
            fail: false,
            called: AtomicBool::new(false),
        };
        gallery.exclude("s001", &ok).await.unwrap();
        assert!(ok.called.load(AtomicOrdering::SeqCst));
        assert_eq!(gallery.sites().len(), 2);
        assert!(gallery.sites().iter().all(|s| s.id != "s001"));
    }

    #[tokio::test]
    async fn failed_exclude_keeps_the_site() {
        let mut gallery = Gallery::new(many(3));
        let failing = FakeCommand {
            fail: true,
            called: AtomicBool::new(false),
        };
        let err = gallery.exclude("s001", &failing).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(gallery.sites().len(), 3);
    }

    proptest! {
        #[test]
        fn paging_never_panics_and_partitions_results(count in 0usize..120, page in 0usize..12) {
            let mut gallery = Gallery::new(many(count));
            gallery.set_page(page);
            let current = gallery.current_page();

            prop_assert!(current.sites.len() <= SITES_PER_PAGE);
            let start = (page.max(1) - 1) * SITES_PER_PAGE;
            let expected = count.saturating_sub(start).min(SITES_PER_PAGE);
            prop_assert_eq!(current.sites.len(), expected);
            prop_assert_eq!(current.total_pages, (count + SITES_PER_PAGE - 1) / SITES_PER_PAGE);
        }

        #[test]
        fn name_sort_output_is_ordered(raw in proptest::collection::vec("[a-zA-Z]{1,8}", 0..30)) {
            let sites = raw
                .iter()
                .enumerate()
                .map(|(i, name)| annotated(&i.to_string(), name, None, HostingType::Netlify))
                .collect();
            let gallery = Gallery::new(sites);
            let sorted = names(&gallery);
            for pair in sorted.windows(2) {
                prop_assert!(pair[0].to_lowercase() <= pair[1].to_lowercase());
            }
        }
    }
}
