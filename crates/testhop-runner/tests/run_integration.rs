//! Integration tests for whole runs against scripted tests and a fake
//! managed-framework driver.
#![cfg(unix)]

use feed_negotiator::FeedOverride;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use testhop_core::{Cleaner, RunConfig, RunError, RunLog, RunTarget, RuntimeVersion};
use testhop_runner::{
    report, write_junit, write_properties, BackendDispatcher, DotnetCli, RunOrchestrator,
    RunSummary,
};
use tempfile::TempDir;

/// Driver stand-in: appends each verb to `calls.txt`, snapshots any feed
/// config during restore, and fails a verb when a `fail-<verb>` marker
/// exists in the test directory.
const FAKE_DOTNET: &str = r#"#!/bin/sh
echo "$1" >> calls.txt
if [ "$1" = "restore" ] && [ -f nuget.config ]; then
  cp nuget.config seen-feed.txt
fi
if [ -f "fail-$1" ]; then
  echo "simulated $1 failure" >&2
  exit 4
fi
echo "$1 ok"
exit 0
"#;

fn write_executable(path: &Path, body: &str) {
    std::fs::write(path, body).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn shell_test(root: &Path, name: &str, script: &str) -> PathBuf {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("test.json"),
        format!(r#"{{"name": "{name}", "enabled": true, "type": "bash", "version": "6.0", "versionSpecific": false, "platformBlacklist": [], "cleanup": false}}"#),
    )
    .unwrap();
    write_executable(&dir.join("test.sh"), script);
    dir
}

fn managed_test(root: &Path, name: &str) -> PathBuf {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("test.json"),
        format!(r#"{{"name": "{name}", "enabled": true, "type": "xunit", "version": "3.1", "cleanup": true}}"#),
    )
    .unwrap();
    std::fs::write(
        dir.join(format!("{name}.csproj")),
        "<Project><PropertyGroup><TargetFramework>netcoreapp3.1</TargetFramework></PropertyGroup></Project>",
    )
    .unwrap();
    dir
}

struct Fixture {
    root: TempDir,
    logs: TempDir,
    tools: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self {
            root: tempfile::tempdir().unwrap(),
            logs: tempfile::tempdir().unwrap(),
            tools: tempfile::tempdir().unwrap(),
        };
        write_executable(&fixture.dotnet_path(), FAKE_DOTNET);
        fixture
    }

    fn dotnet_path(&self) -> PathBuf {
        self.tools.path().join("dotnet")
    }

    fn config(&self) -> RunConfig {
        RunConfig::new(self.root.path(), self.logs.path())
    }

    async fn run(
        &self,
        config: &RunConfig,
        feeds: Option<&FeedOverride>,
    ) -> Result<RunSummary, RunError> {
        let target = RunTarget::new("6.0", RuntimeVersion::new(6, 0, 0), ["linux"]);
        let dotnet = DotnetCli::new(self.dotnet_path());
        let cleaner = Cleaner::new(None, self.tools.path().join("tmp"));
        let log = RunLog::discard();
        let dispatcher = BackendDispatcher::new(&target, &dotnet, feeds, &log, config);

        RunOrchestrator::new(config, &target, &cleaner, &log)
            .run(&dispatcher)
            .await
    }
}

fn staging_feed() -> FeedOverride {
    FeedOverride::from_urls(vec!["https://staging.example.com/index.json".to_string()]).unwrap()
}

#[tokio::test]
async fn fail_fast_stops_after_first_failure() {
    let fx = Fixture::new();
    shell_test(fx.root.path(), "a", "#!/bin/sh\nexit 0\n");
    shell_test(fx.root.path(), "b", "#!/bin/sh\necho broken\nexit 3\n");
    let c = shell_test(fx.root.path(), "c", "#!/bin/sh\ntouch ran\nexit 0\n");

    let config = fx.config().with_fail_fast(true);
    let summary = fx.run(&config, None).await.unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 1);
    assert!(summary.halted_early);
    assert!(!c.join("ran").exists());
    assert_eq!(summary.exit_code(), 1);

    let log = std::fs::read_to_string(fx.logs.path().join("logfile-b.log")).unwrap();
    assert!(log.starts_with("b\n\n"));
    assert!(log.contains("# Standard Output:\nbroken\n"));
    assert!(log.contains("# Exit Code: 3"));
    assert!(!fx.logs.path().join("logfile-a.log").exists());
}

#[tokio::test]
async fn shell_test_gets_requested_version_without_openssl_conf() {
    let fx = Fixture::new();
    let dir = shell_test(
        fx.root.path(),
        "args",
        "#!/bin/sh\necho \"$1\" > version.txt\necho \"${OPENSSL_CONF:-unset}\" > openssl.txt\n",
    );
    std::env::set_var("OPENSSL_CONF", "/etc/bogus-openssl.cnf");

    let summary = fx.run(&fx.config(), None).await.unwrap();

    assert_eq!(summary.passed, 1);
    assert_eq!(std::fs::read_to_string(dir.join("version.txt")).unwrap(), "6.0\n");
    assert_eq!(std::fs::read_to_string(dir.join("openssl.txt")).unwrap(), "unset\n");
}

#[tokio::test]
async fn managed_test_uses_feed_override_and_removes_it() {
    let fx = Fixture::new();
    let ok = managed_test(fx.root.path(), "lib");
    let broken = managed_test(fx.root.path(), "restorefail");
    std::fs::write(broken.join("fail-restore"), "").unwrap();
    let feeds = staging_feed();

    let summary = fx.run(&fx.config(), Some(&feeds)).await.unwrap();

    assert_eq!((summary.total, summary.passed, summary.failed), (2, 1, 1));
    assert_eq!(summary.total, summary.passed + summary.failed);

    let csproj = std::fs::read_to_string(ok.join("lib.csproj")).unwrap();
    assert!(csproj.contains("<TargetFramework>net6.0</TargetFramework>"));
    assert_eq!(std::fs::read_to_string(ok.join("calls.txt")).unwrap(), "restore\ntest\n");
    assert!(std::fs::read_to_string(ok.join("seen-feed.txt"))
        .unwrap()
        .contains("https://staging.example.com/index.json"));

    assert_eq!(std::fs::read_to_string(broken.join("calls.txt")).unwrap(), "restore\n");
    let log = std::fs::read_to_string(fx.logs.path().join("logfile-restorefail.log")).unwrap();
    assert!(log.contains("simulated restore failure"));
    assert!(log.contains("# Exit Code: 4"));

    assert!(!ok.join("nuget.config").exists());
    assert!(!broken.join("nuget.config").exists());
}

#[tokio::test]
async fn stale_feed_config_aborts_before_launch() {
    let fx = Fixture::new();
    let dir = managed_test(fx.root.path(), "stale");
    std::fs::write(dir.join("nuget.config"), "<configuration />").unwrap();
    let feeds = staging_feed();

    let err = fx.run(&fx.config(), Some(&feeds)).await.unwrap_err();

    assert!(matches!(err, RunError::Operator(_)));
    assert!(!dir.join("calls.txt").exists());
    assert_eq!(
        std::fs::read_to_string(dir.join("nuget.config")).unwrap(),
        "<configuration />"
    );
}

#[tokio::test]
async fn load_failures_and_skips_are_reported() {
    let fx = Fixture::new();
    shell_test(fx.root.path(), "good", "#!/bin/sh\nexit 0\n");
    let mismatch = fx.root.path().join("renamed");
    std::fs::create_dir_all(&mismatch).unwrap();
    std::fs::write(
        mismatch.join("test.json"),
        r#"{"name": "original", "type": "bash", "version": "6.0"}"#,
    )
    .unwrap();
    let off = shell_test(fx.root.path(), "off", "#!/bin/sh\ntouch ran\n");
    std::fs::write(
        off.join("test.json"),
        r#"{"name": "off", "enabled": false, "type": "bash", "version": "6.0"}"#,
    )
    .unwrap();

    let summary = fx.run(&fx.config(), None).await.unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.load_failures, 1);
    assert_eq!(summary.skipped, 1);
    assert!(!off.join("ran").exists());
}

#[tokio::test]
async fn disabled_tests_run_on_request() {
    let fx = Fixture::new();
    let off = shell_test(fx.root.path(), "off", "#!/bin/sh\ntouch ran\n");
    std::fs::write(
        off.join("test.json"),
        r#"{"name": "off", "enabled": false, "type": "bash", "version": "6.0"}"#,
    )
    .unwrap();

    let config = fx.config();
    let target = RunTarget::new("6.0", RuntimeVersion::new(6, 0, 0), ["linux"])
        .with_execute_disabled(true);
    let dotnet = DotnetCli::new(fx.dotnet_path());
    let cleaner = Cleaner::new(None, fx.tools.path().join("tmp"));
    let log = RunLog::discard();
    let dispatcher = BackendDispatcher::new(&target, &dotnet, None, &log, &config);

    let summary = RunOrchestrator::new(&config, &target, &cleaner, &log)
        .run(&dispatcher)
        .await
        .unwrap();

    assert_eq!(summary.passed, 1);
    assert!(off.join("ran").exists());
}

#[tokio::test]
async fn run_log_properties_and_junit_artifacts() {
    let fx = Fixture::new();
    shell_test(fx.root.path(), "pass", "#!/bin/sh\nexit 0\n");
    shell_test(fx.root.path(), "fail", "#!/bin/sh\nexit 2\n");

    let config = fx.config().with_results_file(true);
    let target = RunTarget::new("6.0", RuntimeVersion::new(6, 0, 0), ["linux"]);
    let dotnet = DotnetCli::new(fx.dotnet_path());
    let cleaner = Cleaner::new(None, fx.tools.path().join("tmp"));
    let log = RunLog::create(&config.run_log_path(), false).unwrap();
    let dispatcher = BackendDispatcher::new(&target, &dotnet, None, &log, &config);

    let summary = RunOrchestrator::new(&config, &target, &cleaner, &log)
        .run(&dispatcher)
        .await
        .unwrap();
    report(&summary, &log);
    write_properties(&config.results_path(), &summary).unwrap();
    write_junit(&config.junit_path(), &summary).unwrap();

    let narration = std::fs::read_to_string(config.run_log_path()).unwrap();
    assert!(narration.contains("fail: FAIL - Code: 2"));
    assert!(narration.contains("pass: PASS"));
    assert!(narration.contains("Total: 2 Passed: 1 Failed: 1"));

    assert_eq!(
        std::fs::read_to_string(config.results_path()).unwrap(),
        "tests.total=2\ntests.passed=1\ntests.failed=1\n"
    );

    let junit = std::fs::read_to_string(config.junit_path()).unwrap();
    assert!(junit.contains("tests=\"2\" failures=\"1\" errors=\"0\""));
    assert!(junit.contains("<failure message=\"Exit code 2\" />\n    <system-out>fail\n\n"));
    assert!(junit.contains("<testcase name=\"pass\" classname=\"TestSuite\">\n    <system-out>pass\n\n"));
}
