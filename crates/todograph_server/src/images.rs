//! Best-effort image enrichment for new tasks.
//!
//! Lookups are bounded by a timeout and every failure degrades to "no image";
//! task creation never waits longer than the timeout or fails because of it.

use log::{debug, warn};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use std::time::Duration;

const PEXELS_SEARCH_URL: &str = "https://api.pexels.com/v1/search";

/// Pexels photo search client.
#[derive(Debug, Clone)]
pub struct PexelsImageProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    timeout: Duration,
}

impl PexelsImageProvider {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: PEXELS_SEARCH_URL.to_string(),
            timeout,
        })
    }

    /// Points the client at a different search endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Returns the URL of the first photo matching `query`, if any.
    pub async fn find_image(&self, query: &str) -> Option<String> {
        match tokio::time::timeout(self.timeout, self.search(query)).await {
            Ok(Ok(url)) => {
                debug!(
                    "event=image_lookup module=images status=ok found={}",
                    url.is_some()
                );
                url
            }
            Ok(Err(err)) => {
                warn!("event=image_lookup module=images status=error error={err}");
                None
            }
            Err(_) => {
                warn!(
                    "event=image_lookup module=images status=timeout timeout_ms={}",
                    self.timeout.as_millis()
                );
                None
            }
        }
    }

    async fn search(&self, query: &str) -> reqwest::Result<Option<String>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("query", query), ("per_page", "1")])
            .header(AUTHORIZATION, self.api_key.as_str())
            .send()
            .await?
            .error_for_status()?;
        let body: SearchResponse = response.json().await?;
        Ok(body.first_image())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    src: PhotoSources,
}

#[derive(Debug, Deserialize)]
struct PhotoSources {
    medium: Option<String>,
    large: Option<String>,
    original: Option<String>,
}

impl SearchResponse {
    fn first_image(self) -> Option<String> {
        let src = self.photos.into_iter().next()?.src;
        src.medium.or(src.large).or(src.original)
    }
}
