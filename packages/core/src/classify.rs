//! Derived site classification.
//!
//! Nothing here is persisted: the listing service recomputes a
//! [`Classification`] for every site on every request, so edits to the
//! injected [`DomainSet`] show up on the next read.

use std::collections::HashSet;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::repository::Site;

/// Subdomain suffix the hosting provider hands out.
pub const NETLIFY_SUBDOMAIN_SUFFIX: &str = ".netlify.app";

/// Domains served by the WordPress multisite install, grouped by nameserver.
pub const DEFAULT_WPMU_DOMAINS: &[&str] = &[
    // ns1.wpdns.host
    "barndominiuminsurance.com",
    "bedlinerinsurance.com",
    "contractorinsurance.io",
    "customhomefinancing.com",
    "fencinginsurance.com",
    "foamdistributor.com",
    "foameverything.com",
    "jeepnamegenerator.com",
    "northernarizonainsurance.com",
    "sprayfoam101.com",
    "sprayfoaminsurance.com",
    "stormrestorationinsurance.com",
    "toterhomeinsurance.com",
    "wickenburginsurance.com",
    // ns2.wpdns.host
    "americanmadeinsurance.com",
    "austinconcreteco.com",
    "barndominiumfinancing.com",
    "barndominiuminsulation.com",
    "coatinginsurance.com",
    "coatingsinsurance.com",
    "coloradoconcreterepair.com",
    "dieselrepairaz.com",
    "foamtechsprayfoam.com",
    "hairphdsalon.com",
    "importcarinsurance.co",
    "maricopalandscaping.com",
    "northernlegacysprayfoam.com",
    "roofinginsurance.com",
    "sprayfoamrentalrig.com",
    "ssvinsurance.com",
    "tinyhomeinsulation.com",
    "tracthomecontractorinsurance.com",
    "wakeboatinsurance.com",
    "youngconstruction.llc",
    // ns3.wpdns.host
    "brrrrinsurance.com",
    "countrysidefinancing.com",
    "denverconcreterepair.com",
    "pikespeakconcreterepair.com",
    "pontooninsurance.com",
    "rzrinsurance.com",
    "sedonainsurance.com",
    "solarcontractorinsurance.com",
    "sprayfoaminsulationscottsdale.com",
    "sunlakesinsurance.com",
    "thrillmotorsports.com",
    "toyhaulerinsurance.com",
    "tracthomeinsurance.com",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostingType {
    Netlify,
    Wpmu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub hosting_type: HostingType,
    pub is_netlify_sub: bool,
    pub is_dot_com: bool,
}

/// Swappable lookup set of domains hosted outside the primary provider.
#[derive(Debug, Clone, Default)]
pub struct DomainSet {
    domains: HashSet<String>,
}

impl DomainSet {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|domain| normalize_host(domain.as_ref()))
                .filter(|domain| !domain.is_empty())
                .collect(),
        }
    }

    /// The built-in WPMU list.
    pub fn wpmu_default() -> Self {
        Self::new(DEFAULT_WPMU_DOMAINS.iter().copied())
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains(&normalize_host(domain))
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Domains in sorted order, for deterministic seeding.
    pub fn sorted(&self) -> Vec<&str> {
        let mut domains: Vec<&str> = self.domains.iter().map(String::as_str).collect();
        domains.sort_unstable();
        domains
    }
}

/// Lowercased bare host of a URL or domain: scheme, credentials, path, port,
/// trailing dot and a leading `www.` are dropped. Input that does not parse
/// as a URL is used as-is.
pub fn normalize_host(raw: &str) -> String {
    let trimmed = raw.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    let host = Url::parse(&candidate)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| trimmed.to_string());
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

/// Classify `site` against `wpmu`. The custom domain wins over the provider
/// URL whenever it is set.
pub fn classify(site: &Site, wpmu: &DomainSet) -> Classification {
    let effective = normalize_host(site.display_target());
    let provider_host = normalize_host(&site.url);

    Classification {
        hosting_type: if wpmu.contains(&effective) {
            HostingType::Wpmu
        } else {
            HostingType::Netlify
        },
        is_netlify_sub: provider_host.ends_with(NETLIFY_SUBDOMAIN_SUFFIX),
        is_dot_com: effective.ends_with(".com"),
    }
}
