//! Feed-Negotiator: package-source negotiation for testhop runs
//!
//! Decides, once per run, whether the default package source already
//! carries the runtime under test. If it does not, the release branch's
//! alternate feed is resolved and, together with any operator-supplied
//! feeds, rendered into a feed configuration the managed-framework backend
//! drops into each test directory.
//!
//! Negotiation never fails a run. Every lookup error is logged and the
//! result degrades to "no override".

pub mod config;
pub mod error;
pub mod inventory;
pub mod nuget;
pub mod release_feed;

pub use config::FeedConfig;
pub use error::NegotiationError;
pub use inventory::{latest_matching, parse_runtime_list, DotnetInventory, RuntimeInventory};
pub use nuget::{is_version_listed, render_feed_config, NuGetIndex, PackageIndex, FEED_CONFIG_FILE};
pub use release_feed::{parse_feed_url, release_branch, FeedDirectory, ReleaseFeeds};

use testhop_core::RuntimeVersion;
use tracing::{info, warn};

/// Result type for feed negotiation
pub type Result<T> = std::result::Result<T, NegotiationError>;

/// Generated feed configuration, applied to every managed-framework test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedOverride {
    pub urls: Vec<String>,
    /// Rendered configuration document.
    pub payload: String,
}

impl FeedOverride {
    pub fn from_urls(urls: Vec<String>) -> Option<Self> {
        if urls.is_empty() {
            return None;
        }
        let payload = render_feed_config(&urls);
        Some(Self { urls, payload })
    }
}

/// Build the HTTP client shared by the index and feed lookups.
pub fn http_client(config: &FeedConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.timeout)
        .build()
        .map_err(NegotiationError::from)
}

/// Runs the negotiation against its three collaborators.
pub struct FeedNegotiator<'a> {
    inventory: &'a dyn RuntimeInventory,
    index: &'a dyn PackageIndex,
    feeds: &'a dyn FeedDirectory,
}

impl<'a> FeedNegotiator<'a> {
    pub fn new(
        inventory: &'a dyn RuntimeInventory,
        index: &'a dyn PackageIndex,
        feeds: &'a dyn FeedDirectory,
    ) -> Self {
        Self {
            inventory,
            index,
            feeds,
        }
    }

    /// Resolve the feed override for a run of `target`.
    ///
    /// Discovered feeds come first, then `extra_feeds` in order.
    pub async fn negotiate(
        &self,
        target: &RuntimeVersion,
        extra_feeds: &[String],
    ) -> Option<FeedOverride> {
        let mut urls = Vec::new();

        match self.discover(target).await {
            Ok(Some(url)) => {
                info!(feed = %url, "packages are not live on the default source, adding alternate feed");
                urls.push(url);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "feed negotiation failed, continuing without an alternate feed"),
        }

        urls.extend(
            extra_feeds
                .iter()
                .map(|f| f.trim())
                .filter(|f| !f.is_empty())
                .map(str::to_string),
        );

        FeedOverride::from_urls(urls)
    }

    async fn discover(&self, target: &RuntimeVersion) -> Result<Option<String>> {
        let installed = self.inventory.installed_runtimes().await?;
        let Some(latest) = latest_matching(&installed, target) else {
            warn!(version = %target, "no installed runtime matches the requested version");
            return Ok(None);
        };

        if self.index.is_listed(&latest.to_string()).await? {
            info!(version = %latest, "runtime packages are live on the default source");
            return Ok(None);
        }

        let branch = release_branch(target);
        match self.feeds.alternate_feed(&branch).await {
            Ok(url) => Ok(Some(url)),
            Err(e) => {
                warn!(branch = %branch, error = %e, "dropping alternate feed");
                Ok(None)
            }
        }
    }
}
