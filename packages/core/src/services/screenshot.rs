//! Screenshot URL construction.
//!
//! Pure string building: no request is made here. The image provider renders
//! the page when the browser loads the returned URL.

use reqwest::Url;

const APIFLASH_ENDPOINT: &str = "https://api.apiflash.com/v1/urltoimage";
const THUMIO_PREFIX: &str = "https://image.thum.io/get/width/1920/crop/1080/";

#[derive(Debug, Clone, Default)]
pub struct ScreenshotUrls {
    api_key: Option<String>,
}

impl ScreenshotUrls {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    /// Cached-capture URL for `target`. ApiFlash when a key is configured,
    /// thum.io otherwise.
    pub fn primary(&self, target: &str) -> String {
        let target = with_scheme(target);
        match &self.api_key {
            Some(key) => apiflash(key, &target, &[("delay", "2"), ("fresh", "false")]),
            None => thumio(&target),
        }
    }

    /// URL that forces the provider to capture a new image.
    pub fn fresh(&self, target: &str) -> String {
        let target = with_scheme(target);
        match &self.api_key {
            Some(key) => apiflash(
                key,
                &target,
                &[("delay", "3"), ("fresh", "true"), ("wait_until", "page_loaded")],
            ),
            None => thumio(&target),
        }
    }

    /// Alternatives for the client to try if the primary image fails.
    pub fn fallbacks(&self, target: &str) -> Vec<String> {
        vec![thumio(&with_scheme(target))]
    }
}

fn with_scheme(target: &str) -> String {
    let target = target.trim();
    if target.starts_with("http://") || target.starts_with("https://") {
        target.to_string()
    } else {
        format!("https://{}", target)
    }
}

fn thumio(target: &str) -> String {
    format!("{}{}", THUMIO_PREFIX, target)
}

fn apiflash(key: &str, target: &str, extra: &[(&str, &str)]) -> String {
    let mut params: Vec<(&str, &str)> = vec![
        ("access_key", key),
        ("url", target),
        ("width", "1920"),
        ("height", "1080"),
    ];
    params.extend_from_slice(extra);

    match Url::parse_with_params(APIFLASH_ENDPOINT, &params) {
        Ok(url) => url.into(),
        Err(err) => {
            tracing::warn!("Could not build ApiFlash URL ({}); using thum.io", err);
            thumio(target)
        }
    }
}
