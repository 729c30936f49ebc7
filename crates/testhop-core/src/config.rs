//! Run configuration.
//!
//! [`RunConfig`] carries everything the caller decided about a run;
//! [`RunTarget`] is the slice of it the selector and the backends need
//! (requested version, host platforms, disabled-test policy), fixed for
//! the whole run.

use crate::version::RuntimeVersion;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// File name of the run log inside the log directory.
pub const RUN_LOG_FILE: &str = "logfile.log";

/// File name of the aggregate properties artifact inside the log directory.
pub const RESULTS_FILE: &str = "results.properties";

/// File name of the JUnit XML report inside the log directory.
pub const JUNIT_FILE: &str = "results.xml";

/// Version and platform context of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTarget {
    /// The version exactly as the operator typed it; passed to shell tests.
    pub requested: String,
    pub version: RuntimeVersion,
    pub platforms: BTreeSet<String>,
    pub execute_disabled: bool,
}

impl RunTarget {
    pub fn new<I, S>(requested: &str, version: RuntimeVersion, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            requested: requested.trim().to_string(),
            version,
            platforms: platforms.into_iter().map(Into::into).collect(),
            execute_disabled: false,
        }
    }

    pub fn with_execute_disabled(mut self, execute_disabled: bool) -> Self {
        self.execute_disabled = execute_disabled;
        self
    }

}

/// Options controlling one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Directory walked for `test.json` files.
    pub test_root: PathBuf,
    /// Directory receiving the run log, per-test logs and the results file.
    pub log_dir: PathBuf,
    /// Stop the walk after the first failing test.
    pub fail_fast: bool,
    /// Echo run-log lines to stdout.
    pub verbose: bool,
    /// Write [`RESULTS_FILE`].
    pub write_results: bool,
    /// Extra package feeds, always injected.
    pub extra_feeds: Vec<String>,
    /// Purge user-level package caches before and after the run.
    pub clean_caches: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            test_root: PathBuf::from("."),
            log_dir: PathBuf::from("."),
            fail_fast: false,
            verbose: false,
            write_results: false,
            extra_feeds: Vec::new(),
            clean_caches: false,
        }
    }
}

impl RunConfig {
    pub fn new(test_root: impl Into<PathBuf>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            test_root: test_root.into(),
            log_dir: log_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_results_file(mut self, write_results: bool) -> Self {
        self.write_results = write_results;
        self
    }

    pub fn with_extra_feeds(mut self, feeds: Vec<String>) -> Self {
        self.extra_feeds = feeds;
        self
    }

    pub fn run_log_path(&self) -> PathBuf {
        self.log_dir.join(RUN_LOG_FILE)
    }

    pub fn results_path(&self) -> PathBuf {
        self.log_dir.join(RESULTS_FILE)
    }

    pub fn junit_path(&self) -> PathBuf {
        self.log_dir.join(JUNIT_FILE)
    }

    /// Per-test log artifact, written only when the test fails.
    pub fn test_log_path(&self, test_name: &str) -> PathBuf {
        self.log_dir.join(format!("logfile-{test_name}.log"))
    }
}
