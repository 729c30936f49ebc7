//! Child-process execution with captured output.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::debug;

/// Environment variables never handed to a test process.
pub const FILTERED_ENV: &[&str] = &["OPENSSL_CONF"];

/// One child process to run to completion.
#[derive(Debug, Clone)]
pub struct Step {
    /// Label used in diagnostics, e.g. `dotnet restore`.
    pub label: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl Step {
    pub fn new(label: impl Into<String>, program: impl Into<PathBuf>, working_dir: &Path) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.to_path_buf(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Result of a step that ran.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub label: String,
    pub command_line: String,

    /// Exit code (0 = success, -1 when killed by a signal).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl StepResult {
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }

    /// Append this step's transcript to `out`.
    pub fn render_into(&self, out: &mut String) {
        let _ = writeln!(out, "$ {}", self.command_line);
        out.push_str("# Standard Output:\n");
        push_block(out, &self.stdout);
        out.push_str("# Standard Error:\n");
        push_block(out, &self.stderr);
        let _ = writeln!(out, "# Exit Code: {}", self.exit_code);
    }
}

fn push_block(out: &mut String, text: &str) {
    out.push_str(text);
    if !text.is_empty() && !text.ends_with('\n') {
        out.push('\n');
    }
}

/// Run `step`, blocking until the child exits, and capture both streams
/// in full.
///
/// Only spawn and wait failures are errors; a non-zero exit is a normal
/// [`StepResult`].
pub async fn run_step(step: &Step) -> std::io::Result<StepResult> {
    let start = Instant::now();
    debug!(step = %step.label, dir = ?step.working_dir, "spawning");

    let mut command = Command::new(&step.program);
    command
        .args(&step.args)
        .current_dir(&step.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for name in FILTERED_ENV {
        command.env_remove(name);
    }

    let output = command.spawn()?.wait_with_output().await?;

    let duration_ms = start.elapsed().as_millis() as u64;
    let exit_code = output.status.code().unwrap_or(-1);
    debug!(step = %step.label, exit_code, duration_ms, "step finished");

    Ok(StepResult {
        label: step.label.clone(),
        command_line: step.command_line(),
        exit_code,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        duration_ms,
    })
}
