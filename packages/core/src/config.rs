use std::env;

use crate::error::AppError;

pub const DEFAULT_HOSTING_API_URL: &str = "https://api.netlify.com/api/v1";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_SYNC_PER_PAGE: u32 = 100;
pub const DEFAULT_SYNC_MAX_PAGES: u32 = 50;

pub const MISSING_DATABASE: &str = "Database not configured (set DATABASE_URL)";
pub const MISSING_HOSTING_TOKEN: &str = "Netlify token not configured (set NETLIFY_ACCESS_TOKEN)";

/// Explicit service configuration, built once at startup and handed to each
/// component. Credentials stay optional here: a missing one only fails the
/// operations that need it, each with its own message.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub hosting_api_token: Option<String>,
    pub screenshot_api_key: Option<String>,
    pub hosting_api_url: String,
    pub bind_addr: String,
    pub sync_per_page: u32,
    pub sync_max_pages: u32,
    pub sync_interval_seconds: Option<u64>,
    pub wpmu_domains: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            hosting_api_token: None,
            screenshot_api_key: None,
            hosting_api_url: DEFAULT_HOSTING_API_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            sync_per_page: DEFAULT_SYNC_PER_PAGE,
            sync_max_pages: DEFAULT_SYNC_MAX_PAGES,
            sync_interval_seconds: None,
            wpmu_domains: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let sync_per_page = match get("SYNC_PER_PAGE") {
            Some(raw) => parse_positive(&raw, "SYNC_PER_PAGE")?,
            None => DEFAULT_SYNC_PER_PAGE,
        };
        let sync_max_pages = match get("SYNC_MAX_PAGES") {
            Some(raw) => parse_positive(&raw, "SYNC_MAX_PAGES")?,
            None => DEFAULT_SYNC_MAX_PAGES,
        };
        let sync_interval_seconds = match get("SYNC_INTERVAL_SECONDS") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or("SYNC_INTERVAL_SECONDS must be a positive number")?,
            ),
            None => None,
        };

        let wpmu_domains = get("WPMU_DOMAINS").map(|raw| {
            raw.split(',')
                .map(|domain| domain.trim().to_ascii_lowercase())
                .filter(|domain| !domain.is_empty())
                .collect()
        });

        Ok(Self {
            database_url: get("DATABASE_URL").or_else(|| get("NETLIFY_DATABASE_URL")),
            hosting_api_token: get("NETLIFY_ACCESS_TOKEN"),
            screenshot_api_key: get("APIFLASH_KEY"),
            hosting_api_url: get("NETLIFY_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_HOSTING_API_URL.to_string()),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            sync_per_page,
            sync_max_pages,
            sync_interval_seconds,
            wpmu_domains,
        })
    }

    pub fn require_database_url(&self) -> Result<&str, AppError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| AppError::Config(MISSING_DATABASE.into()))
    }

    pub fn require_hosting_api_token(&self) -> Result<&str, AppError> {
        self.hosting_api_token
            .as_deref()
            .ok_or_else(|| AppError::Config(MISSING_HOSTING_TOKEN.into()))
    }
}

fn parse_positive(raw: &str, key: &str) -> Result<u32, String> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| format!("{} must be a positive number", key))
}
