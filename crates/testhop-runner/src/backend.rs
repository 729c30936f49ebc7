//! Execution backends.
//!
//! [`BackendDispatcher`] turns one eligible descriptor into an
//! [`Execution`]: an exit code plus the full captured output. Launch
//! failures never escape as errors; they become exit code `-1` and a
//! diagnostic block in the output. The only error a backend returns is an
//! [`OperatorError`], which aborts the run.

use crate::patcher::patch_build_descriptor;
use crate::runner::{run_step, Step};
use async_trait::async_trait;
use feed_negotiator::{FeedOverride, FEED_CONFIG_FILE};
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use testhop_core::{OperatorError, RunConfig, RunLog, RunTarget, TestDescriptor, TestKind};
use tracing::{debug, info, warn};

/// Script run by shell tests.
pub const SHELL_SCRIPT: &str = "test.sh";

/// Exit code recorded when a child process could not be launched.
pub const LAUNCH_FAILURE: i32 = -1;

/// Outcome of one test execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub exit_code: i32,
    pub output: String,
}

impl Execution {
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }
}

/// The managed-framework driver program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotnetCli {
    pub program: PathBuf,
}

impl DotnetCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for DotnetCli {
    fn default() -> Self {
        Self::new("dotnet")
    }
}

/// Runs one test to completion.
#[async_trait]
pub trait TestExecutor: Send + Sync {
    async fn execute(
        &self,
        descriptor: &TestDescriptor,
        test_dir: &Path,
    ) -> Result<Execution, OperatorError>;
}

/// Removes a materialized feed configuration when dropped, whatever the
/// test outcome.
#[derive(Debug)]
struct FeedConfigGuard {
    path: PathBuf,
}

impl FeedConfigGuard {
    fn install(path: PathBuf, payload: &str) -> io::Result<Self> {
        std::fs::write(&path, payload)?;
        debug!(path = ?path, "feed configuration written");
        Ok(Self { path })
    }
}

impl Drop for FeedConfigGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = ?self.path, "feed configuration removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = ?self.path, error = %e, "cannot remove feed configuration"),
        }
    }
}

/// Captured output of one test, built up step by step.
struct Transcript {
    text: String,
}

impl Transcript {
    fn new(test_name: &str) -> Self {
        Self {
            text: format!("{test_name}\n\n"),
        }
    }

    fn note(&mut self, line: &str) {
        let _ = writeln!(self.text, "{line}");
    }

    fn failure(&mut self, step: &str, error: &io::Error) -> i32 {
        let _ = writeln!(self.text, "# Launch Failure");
        let _ = writeln!(self.text, "step: {step}");
        let _ = writeln!(self.text, "kind: {:?}", error.kind());
        let _ = writeln!(self.text, "message: {error}");
        let _ = writeln!(self.text, "# Exit Code: {LAUNCH_FAILURE}");
        LAUNCH_FAILURE
    }

    /// Run `step`, append its block, return its exit code.
    async fn run(&mut self, step: Step) -> i32 {
        match run_step(&step).await {
            Ok(result) => {
                result.render_into(&mut self.text);
                result.exit_code
            }
            Err(e) => self.failure(&step.label, &e),
        }
    }

    fn finish(self, exit_code: i32) -> Execution {
        Execution {
            exit_code,
            output: self.text,
        }
    }
}

/// Dispatches descriptors to the backend for their kind and narrates the
/// outcome.
pub struct BackendDispatcher<'a> {
    target: &'a RunTarget,
    dotnet: &'a DotnetCli,
    feeds: Option<&'a FeedOverride>,
    log: &'a RunLog,
    config: &'a RunConfig,
}

impl<'a> BackendDispatcher<'a> {
    pub fn new(
        target: &'a RunTarget,
        dotnet: &'a DotnetCli,
        feeds: Option<&'a FeedOverride>,
        log: &'a RunLog,
        config: &'a RunConfig,
    ) -> Self {
        Self {
            target,
            dotnet,
            feeds,
            log,
            config,
        }
    }

    async fn run_kind(
        &self,
        descriptor: &TestDescriptor,
        test_dir: &Path,
    ) -> Result<Execution, OperatorError> {
        match &descriptor.kind {
            TestKind::ManagedFramework => self.run_managed(descriptor, test_dir).await,
            TestKind::Shell => Ok(self.run_shell(descriptor, test_dir).await),
            TestKind::Unsupported(kind) => {
                let mut transcript = Transcript::new(&descriptor.name);
                transcript.note(&format!("Unknown test type {kind:?}"));
                Ok(transcript.finish(1))
            }
        }
    }

    async fn run_managed(
        &self,
        descriptor: &TestDescriptor,
        test_dir: &Path,
    ) -> Result<Execution, OperatorError> {
        let feed_path = test_dir.join(FEED_CONFIG_FILE);
        if self.feeds.is_some() && feed_path.exists() {
            return Err(OperatorError::StaleFeedConfig { path: feed_path });
        }

        let mut transcript = Transcript::new(&descriptor.name);

        match patch_build_descriptor(test_dir, &descriptor.name, &self.target.version) {
            Ok(true) => debug!(test = %descriptor.name, "build descriptor retargeted"),
            Ok(false) => transcript.note("No project file to update"),
            Err(e) => {
                let code = transcript.failure("patch build descriptor", &e);
                return Ok(transcript.finish(code));
            }
        }

        let _guard = match self.feeds {
            Some(feeds) => match FeedConfigGuard::install(feed_path, &feeds.payload) {
                Ok(guard) => Some(guard),
                Err(e) => {
                    let code = transcript.failure("write feed configuration", &e);
                    return Ok(transcript.finish(code));
                }
            },
            None => None,
        };

        let restore = Step::new("dotnet restore", &self.dotnet.program, test_dir).arg("restore");
        let code = transcript.run(restore).await;
        if code != 0 {
            return Ok(transcript.finish(code));
        }

        let test = Step::new("dotnet test", &self.dotnet.program, test_dir).arg("test");
        let code = transcript.run(test).await;
        Ok(transcript.finish(code))
    }

    async fn run_shell(&self, descriptor: &TestDescriptor, test_dir: &Path) -> Execution {
        let mut transcript = Transcript::new(&descriptor.name);
        let script = test_dir.join(SHELL_SCRIPT);
        if !script.is_file() {
            transcript.note(&format!(
                "Unable to find '{SHELL_SCRIPT}' in {}",
                test_dir.display()
            ));
            return transcript.finish(1);
        }

        let step = Step::new(SHELL_SCRIPT, script, test_dir).arg(self.target.requested.clone());
        let code = transcript.run(step).await;
        transcript.finish(code)
    }

    fn persist_failure(&self, test_name: &str, execution: &Execution) {
        let path = self.config.test_log_path(test_name);
        if let Err(e) = std::fs::write(&path, &execution.output) {
            warn!(test = %test_name, path = ?path, error = %e, "cannot write test log");
        }
    }
}

#[async_trait]
impl TestExecutor for BackendDispatcher<'_> {
    async fn execute(
        &self,
        descriptor: &TestDescriptor,
        test_dir: &Path,
    ) -> Result<Execution, OperatorError> {
        let name = &descriptor.name;
        self.log.console(&format!("Running {name}"));
        self.log.test(name, "Running test...");

        let execution = self.run_kind(descriptor, test_dir).await?;

        if execution.passed() {
            self.log.test(name, "PASS");
            self.log.console("Result: PASS");
        } else {
            self.persist_failure(name, &execution);
            let line = format!("FAIL - Code: {}", execution.exit_code);
            self.log.test(name, &line);
            self.log.console(&format!("Result: {line}"));
        }
        info!(test = %name, exit_code = execution.exit_code, "test finished");

        Ok(execution)
    }
}
