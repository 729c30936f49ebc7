//! Endpoints and client settings for feed negotiation

use std::time::Duration;

/// Package whose listing tells whether a runtime build is published.
pub const DEFAULT_PACKAGE_ID: &str = "runtime.linux-x64.Microsoft.NetCore.DotNetAppHost";

pub const DEFAULT_PACKAGE_INDEX_URL: &str = "https://api-v2v3search-0.nuget.org/autocomplete";

/// `{branch}` is replaced with the release branch id.
pub const DEFAULT_RELEASE_FEED_URL: &str =
    "https://raw.githubusercontent.com/dotnet/source-build/{branch}/ProdConFeed.txt";

/// Feed negotiation configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Autocomplete endpoint of the package index
    pub package_index_url: String,
    /// Package id looked up in the index
    pub package_id: String,
    /// URL template of the branch-to-feed mapping file
    pub release_feed_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            package_index_url: DEFAULT_PACKAGE_INDEX_URL.to_string(),
            package_id: DEFAULT_PACKAGE_ID.to_string(),
            release_feed_url: DEFAULT_RELEASE_FEED_URL.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("testhop/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FeedConfig {
    /// Defaults, with `TESTHOP_PACKAGE_INDEX_URL` and
    /// `TESTHOP_RELEASE_FEED_URL` overriding the endpoints when set.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = var("TESTHOP_PACKAGE_INDEX_URL").filter(|u| !u.is_empty()) {
            self.package_index_url = url;
        }
        if let Some(url) = var("TESTHOP_RELEASE_FEED_URL").filter(|u| !u.is_empty()) {
            self.release_feed_url = url;
        }
        self
    }

    /// Mapping-file URL for `branch`.
    pub fn release_feed_url_for(&self, branch: &str) -> String {
        self.release_feed_url.replace("{branch}", branch)
    }
}
