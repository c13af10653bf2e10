//! Bulk seeding of sites hosted on the WordPress multisite install.

use chrono::Utc;
use serde::Serialize;

use crate::classify::DomainSet;
use crate::error::AppError;
use crate::repository::{Site, SiteRepository, SiteSource};

const STRIPPED_SUFFIXES: &[&str] = &[".com", ".io", ".co", ".llc"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SeedReport {
    pub added: usize,
    pub skipped: usize,
    pub total: usize,
}

/// Display name for a bare domain: `spray-foam_101.com` becomes `Spray Foam 101`.
pub fn friendly(domain: &str) -> String {
    let stem = STRIPPED_SUFFIXES
        .iter()
        .find_map(|suffix| domain.strip_suffix(suffix))
        .unwrap_or(domain);

    stem.replace(['-', '_'], " ")
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Insert a `wpmu` row for every domain in `domains` that no existing row
/// already claims by id or custom domain.
pub async fn seed_sites(sites: &SiteRepository, domains: &DomainSet) -> Result<SeedReport, AppError> {
    let mut report = SeedReport {
        total: domains.len(),
        ..SeedReport::default()
    };
    let now = Utc::now();

    for domain in domains.sorted() {
        let site = Site {
            id: domain.to_string(),
            name: friendly(domain),
            url: format!("https://{}", domain),
            custom_domain: Some(domain.to_string()),
            created_at: Some(now),
            updated_at: None,
            source: SiteSource::Wpmu,
            screenshot: None,
        };

        if sites.insert_if_absent(&site).await? {
            report.added += 1;
        } else {
            report.skipped += 1;
        }
    }

    tracing::info!(
        "Seeded WPMU sites: {} added, {} skipped of {}",
        report.added,
        report.skipped,
        report.total
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{connect, create_pool};
    use crate::repository::fixtures::site;

    #[test]
    fn friendly_names() {
        assert_eq!(friendly("sprayfoam101.com"), "Sprayfoam101");
        assert_eq!(friendly("austin-concrete_co.io"), "Austin Concrete Co");
        assert_eq!(friendly("youngconstruction.llc"), "Youngconstruction");
        assert_eq!(friendly("importcarinsurance.co"), "Importcarinsurance");
        assert_eq!(friendly("example.org"), "Example.org");
    }

    #[tokio::test]
    async fn seeds_missing_domains_and_skips_existing() {
        let repo = SiteRepository::new(create_pool("sqlite::memory:").await.unwrap());

        let mut claimed = site("netlify-1", SiteSource::Netlify);
        claimed.custom_domain = Some("b.com".into());
        repo.replace_scoped(SiteSource::Netlify, &[claimed], true)
            .await
            .unwrap();

        let domains = DomainSet::new(["a.com", "b.com", "c.io"]);
        let report = seed_sites(&repo, &domains).await.unwrap();
        assert_eq!(
            report,
            SeedReport {
                added: 2,
                skipped: 1,
                total: 3
            }
        );

        let seeded = repo.find("a.com").await.unwrap().unwrap();
        assert_eq!(seeded.source, SiteSource::Wpmu);
        assert_eq!(seeded.name, "A");
        assert_eq!(seeded.url, "https://a.com");
        assert_eq!(seeded.custom_domain.as_deref(), Some("a.com"));
        assert!(seeded.created_at.is_some());

        let again = seed_sites(&repo, &domains).await.unwrap();
        assert_eq!(again.added, 0);
        assert_eq!(again.skipped, 3);
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn seeding_without_schema_is_not_initialized() {
        let repo = SiteRepository::new(connect("sqlite::memory:").await.unwrap());
        let err = seed_sites(&repo, &DomainSet::new(["a.com"])).await.unwrap_err();
        assert!(matches!(err, AppError::NotInitialized(_)));
    }
}
