//! Alternate feeds published per release branch
//!
//! When a runtime build is not yet on the default source, the release
//! branch's mapping file names a staging feed carrying it.

use crate::config::FeedConfig;
use crate::error::NegotiationError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Url;
use testhop_core::RuntimeVersion;
use tracing::{debug, info};

/// Release-branch identifier for a runtime version.
pub fn release_branch(version: &RuntimeVersion) -> String {
    format!("branch/{}", version.major_minor())
}

/// Resolves a release branch to a reachable alternate feed URL.
#[async_trait]
pub trait FeedDirectory: Send + Sync {
    async fn alternate_feed(&self, branch: &str) -> Result<String>;
}

/// Directory backed by the mapping files in the source-build repository.
#[derive(Debug, Clone)]
pub struct ReleaseFeeds {
    client: reqwest::Client,
    config: FeedConfig,
}

impl ReleaseFeeds {
    pub fn new(client: reqwest::Client, config: FeedConfig) -> Self {
        Self { client, config }
    }

    async fn probe(&self, url: &Url) -> Result<()> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NegotiationError::Unreachable {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl FeedDirectory for ReleaseFeeds {
    async fn alternate_feed(&self, branch: &str) -> Result<String> {
        let mapping_url = self.config.release_feed_url_for(branch);
        debug!(url = %mapping_url, "fetching release feed mapping");

        let body = self
            .client
            .get(&mapping_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let url = parse_feed_url(&body)?;
        self.probe(&url).await?;
        info!(branch, feed = %url, "alternate feed is reachable");
        Ok(url.to_string())
    }
}

/// Validate the body of a mapping file as an http(s) URL.
pub fn parse_feed_url(body: &str) -> Result<Url> {
    let candidate = body.trim();
    let invalid = || NegotiationError::InvalidFeedUrl {
        url: candidate.to_string(),
    };
    let url = Url::parse(candidate).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(invalid()),
    }
}
