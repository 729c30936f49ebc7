//! testhop - runtime test-suite orchestrator
//!
//! Walks a directory tree of `test.json` descriptors, runs every test that
//! applies to the requested runtime version and host platform, and exits
//! with the number of failed tests.
//!
//! ```text
//! testhop 8.0 ./tests --exit-on-fail --results
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use feed_negotiator::{
    http_client, DotnetInventory, FeedConfig, FeedNegotiator, FeedOverride, NuGetIndex,
    ReleaseFeeds,
};
use std::path::PathBuf;
use std::process::ExitCode;
use testhop_core::telemetry::level_for;
use testhop_core::{
    init_tracing, platform, Cleaner, RunConfig, RunLog, RunTarget, RuntimeVersion, VERSION,
};
use testhop_runner::{
    report, write_junit, write_properties, BackendDispatcher, DotnetCli, RunOrchestrator,
    RunSummary,
};
use tracing::{info, warn};

/// Exit status of a run that aborted before completing.
const FATAL_EXIT: u8 = 255;

#[derive(Parser, Debug)]
#[command(name = "testhop")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A test runner for standalone shell-based or xunit runtime tests", long_about = None)]
struct Cli {
    /// Runtime version under test, as major.minor[.patch]
    #[arg(value_name = "VERSION")]
    runtime_version: String,

    /// Directory to search for tests
    #[arg(default_value = ".")]
    test_root: PathBuf,

    /// Active platform ids (comma separated or repeated); detected when omitted
    #[arg(short, long = "platform", value_delimiter = ',')]
    platforms: Vec<String>,

    /// Stop after the first failing test
    #[arg(short, long)]
    exit_on_fail: bool,

    /// Echo the run log to stdout
    #[arg(short, long)]
    verbose: bool,

    /// Write results.properties into the log directory
    #[arg(short, long)]
    results: bool,

    /// Run tests even when their descriptor disables them
    #[arg(short = 'd', long)]
    run_disabled: bool,

    /// Extra package feed to use for every managed-framework test
    #[arg(short = 's', long = "additional-feed")]
    additional_feeds: Vec<String>,

    /// Directory for the run log, per-test logs and results
    #[arg(short = 'l', long, default_value = ".")]
    log_directory: PathBuf,

    /// Debug-level diagnostics
    #[arg(long)]
    debug: bool,

    /// Emit JSON-formatted diagnostics
    #[arg(long)]
    json_log: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json_summary: bool,

    /// Purge user-level package caches before and after the run
    #[arg(long)]
    clean_caches: bool,

    /// Skip feed negotiation; only --additional-feed entries are used
    #[arg(long)]
    no_negotiate: bool,

    /// Managed-framework driver program
    #[arg(long, env = "TESTHOP_DOTNET", default_value = "dotnet")]
    dotnet: PathBuf,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            verbose: self.verbose,
            clean_caches: self.clean_caches,
            ..RunConfig::new(&self.test_root, &self.log_directory)
                .with_fail_fast(self.exit_on_fail)
                .with_results_file(self.results)
                .with_extra_feeds(self.additional_feeds.clone())
        }
    }

    fn active_platforms(&self) -> Vec<String> {
        let given: Vec<String> = self
            .platforms
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        if given.is_empty() {
            platform::detect()
        } else {
            given
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json_log, level_for(cli.debug));

    match run(cli).await {
        Ok(summary) => ExitCode::from(summary.exit_code()),
        Err(e) => {
            eprintln!("testhop: {e:#}");
            ExitCode::from(FATAL_EXIT)
        }
    }
}

async fn run(cli: Cli) -> Result<RunSummary> {
    let version = RuntimeVersion::parse(&cli.runtime_version)
        .with_context(|| format!("Invalid runtime version {:?}", cli.runtime_version))?;
    let config = cli.run_config();

    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log directory {}", config.log_dir.display()))?;
    let log = RunLog::create(&config.run_log_path(), config.verbose)
        .with_context(|| format!("Failed to create run log {}", config.run_log_path().display()))?;

    println!("testhop {VERSION}");
    let target = RunTarget::new(&cli.runtime_version, version, cli.active_platforms())
        .with_execute_disabled(cli.run_disabled);
    log.record(&format!("Runtime version under test: {}", target.version));
    log.record(&format!(
        "Current platform is: {}",
        target.platforms.iter().cloned().collect::<Vec<_>>().join(", ")
    ));

    let feeds = negotiate_feeds(&cli, &target.version, &config.extra_feeds).await;
    if let Some(feeds) = &feeds {
        log.record(&format!("Using package feeds: {}", feeds.urls.join(", ")));
    }

    let dotnet = DotnetCli::new(&cli.dotnet);
    let cleaner = Cleaner::from_env();
    let dispatcher = BackendDispatcher::new(&target, &dotnet, feeds.as_ref(), &log, &config);

    let summary = RunOrchestrator::new(&config, &target, &cleaner, &log)
        .run(&dispatcher)
        .await
        .context("Run aborted")?;

    report(&summary, &log);
    write_junit(&config.junit_path(), &summary)?;
    if config.write_results {
        write_properties(&config.results_path(), &summary)?;
    }
    if cli.json_summary {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(summary)
}

/// Resolve the feed override for the run. Never fails; lookup problems
/// fall back to the operator's feeds alone.
async fn negotiate_feeds(
    cli: &Cli,
    version: &RuntimeVersion,
    extra_feeds: &[String],
) -> Option<FeedOverride> {
    let operator_only = || {
        FeedOverride::from_urls(
            extra_feeds
                .iter()
                .map(|f| f.trim())
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect(),
        )
    };

    if cli.no_negotiate {
        info!("feed negotiation disabled");
        return operator_only();
    }

    let config = FeedConfig::from_env();
    let client = match http_client(&config) {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "cannot build HTTP client, skipping feed negotiation");
            return operator_only();
        }
    };

    let inventory = DotnetInventory::new(&cli.dotnet);
    let index = NuGetIndex::new(client.clone(), config.clone());
    let release_feeds = ReleaseFeeds::new(client, config);

    FeedNegotiator::new(&inventory, &index, &release_feeds)
        .negotiate(version, extra_feeds)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["testhop", "6.0"]).unwrap();
        assert_eq!(cli.runtime_version, "6.0");
        assert_eq!(cli.test_root, PathBuf::from("."));
        assert_eq!(cli.log_directory, PathBuf::from("."));
        assert!(!cli.exit_on_fail);
        assert!(!cli.no_negotiate);
        assert!(cli.platforms.is_empty());

        let config = cli.run_config();
        assert!(!config.fail_fast);
        assert!(!config.write_results);
        assert!(config.extra_feeds.is_empty());
    }

    #[test]
    fn test_short_flags_map_to_config() {
        let cli = Cli::try_parse_from([
            "testhop",
            "8.0.1",
            "/suite",
            "-e",
            "-v",
            "-r",
            "-d",
            "-s",
            "https://a.example.com/index.json",
            "-s",
            "https://b.example.com/index.json",
            "-l",
            "/logs",
            "--clean-caches",
        ])
        .unwrap();

        assert!(cli.run_disabled);
        let config = cli.run_config();
        assert_eq!(config.test_root, PathBuf::from("/suite"));
        assert_eq!(config.log_dir, PathBuf::from("/logs"));
        assert!(config.fail_fast);
        assert!(config.verbose);
        assert!(config.write_results);
        assert!(config.clean_caches);
        assert_eq!(config.extra_feeds.len(), 2);
    }

    #[test]
    fn test_platforms_split_on_commas() {
        let cli = Cli::try_parse_from(["testhop", "6.0", "-p", "linux,fedora", "-p", "fedora39"])
            .unwrap();
        assert_eq!(cli.active_platforms(), vec!["linux", "fedora", "fedora39"]);
    }

    #[test]
    fn test_version_flag_and_positional_coexist() {
        let err = Cli::try_parse_from(["testhop", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);

        let cli = Cli::try_parse_from(["testhop", "8.0.1", "/suite"]).unwrap();
        assert_eq!(cli.runtime_version, "8.0.1");
        assert_eq!(cli.test_root, PathBuf::from("/suite"));
    }

    #[test]
    fn test_version_is_required() {
        assert!(Cli::try_parse_from(["testhop"]).is_err());
    }

    #[tokio::test]
    async fn test_invalid_version_is_fatal() {
        let logs = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from([
            "testhop",
            "six",
            "-l",
            logs.path().to_str().unwrap(),
            "--no-negotiate",
        ])
        .unwrap();
        assert!(run(cli).await.is_err());
    }

    #[tokio::test]
    async fn test_no_negotiate_keeps_operator_feeds() {
        let cli = Cli::try_parse_from([
            "testhop",
            "6.0",
            "--no-negotiate",
            "-s",
            "https://mirror.example.com/index.json",
        ])
        .unwrap();
        let feeds = negotiate_feeds(&cli, &RuntimeVersion::new(6, 0, 0), &cli.additional_feeds)
            .await
            .unwrap();
        assert_eq!(feeds.urls, vec!["https://mirror.example.com/index.json".to_string()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_end_to_end_run_writes_artifacts() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().unwrap();
        let logs = tempfile::tempdir().unwrap();
        let dir = root.path().join("smoke");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("test.json"),
            r#"{"name": "smoke", "enabled": true, "type": "bash", "version": "6.0"}"#,
        )
        .unwrap();
        let script = dir.join("test.sh");
        std::fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let cli = Cli::try_parse_from([
            "testhop",
            "6.0",
            root.path().to_str().unwrap(),
            "-p",
            "linux",
            "-r",
            "--no-negotiate",
            "-l",
            logs.path().to_str().unwrap(),
        ])
        .unwrap();

        let summary = run(cli).await.unwrap();
        assert_eq!((summary.total, summary.passed, summary.failed), (1, 1, 0));
        assert_eq!(summary.exit_code(), 0);
        assert!(logs.path().join("logfile.log").exists());
        assert_eq!(
            std::fs::read_to_string(logs.path().join("results.properties")).unwrap(),
            "tests.total=1\ntests.passed=1\ntests.failed=0\n"
        );
        let junit = std::fs::read_to_string(logs.path().join("results.xml")).unwrap();
        assert!(junit.contains("tests=\"1\" failures=\"0\" errors=\"0\""));
        assert!(junit.contains("<testcase name=\"smoke\" classname=\"TestSuite\">"));
    }
}
