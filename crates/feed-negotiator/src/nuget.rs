//! Package index lookups and feed-configuration rendering

use crate::config::FeedConfig;
use crate::error::NegotiationError;
use crate::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// File name the feed configuration is materialised under.
pub const FEED_CONFIG_FILE: &str = "nuget.config";

/// Answers whether a runtime build is published on the default source.
#[async_trait]
pub trait PackageIndex: Send + Sync {
    async fn is_listed(&self, version: &str) -> Result<bool>;
}

/// Index client for the NuGet autocomplete endpoint.
#[derive(Debug, Clone)]
pub struct NuGetIndex {
    client: reqwest::Client,
    config: FeedConfig,
}

impl NuGetIndex {
    pub fn new(client: reqwest::Client, config: FeedConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl PackageIndex for NuGetIndex {
    async fn is_listed(&self, version: &str) -> Result<bool> {
        debug!(package = %self.config.package_id, version, "querying package index");
        let body = self
            .client
            .get(&self.config.package_index_url)
            .query(&[
                ("id", self.config.package_id.as_str()),
                ("prerelease", "true"),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        is_version_listed(&body, version)
    }
}

#[derive(Debug, Deserialize)]
struct AutocompleteResponse {
    data: Option<Vec<String>>,
}

/// Whether `version` appears verbatim in an autocomplete response body.
pub fn is_version_listed(body: &str, version: &str) -> Result<bool> {
    let response: AutocompleteResponse = serde_json::from_str(body)?;
    let versions = response
        .data
        .ok_or_else(|| NegotiationError::UnexpectedListing("missing `data` array".to_string()))?;
    Ok(versions.iter().any(|v| v == version))
}

/// Render a feed configuration listing `urls` as package sources, keyed
/// by position.
pub fn render_feed_config(urls: &[String]) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    out.push_str("<configuration>\n");
    out.push_str("  <packageSources>\n");
    for (i, url) in urls.iter().enumerate() {
        out.push_str(&format!(
            "    <add key=\"{i}\" value=\"{}\" />\n",
            escape_attribute(url)
        ));
    }
    out.push_str("  </packageSources>\n");
    out.push_str("</configuration>\n");
    out
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
