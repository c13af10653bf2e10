use reqwest::Client;
use serde::Deserialize;

use crate::error::AppError;

/// Bearer-authenticated client for the hosting provider's site inventory.
#[derive(Clone)]
pub struct NetlifyClient {
    base_url: String,
    token: String,
    http: Client,
}

impl NetlifyClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            http: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// A site as the hosting API reports it. Only the fields the mirror keeps
/// are decoded; everything else in the payload is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSite {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub custom_domain: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl NetlifyClient {
    /// Fetch one page of `GET /sites`. Pages are 1-based.
    pub async fn fetch_sites_page(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<RemoteSite>, AppError> {
        let url = format!("{}/sites", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("page", page), ("per_page", per_page)])
            .send()
            .await
            .map_err(|err| AppError::Network(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream {
                status: response.status().as_u16(),
            });
        }

        let sites = response
            .json::<Vec<RemoteSite>>()
            .await
            .map_err(|err| AppError::Parse(err.to_string()))?;

        Ok(sites)
    }
}
