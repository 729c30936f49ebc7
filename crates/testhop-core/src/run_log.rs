//! The run log: a plain-text narration of the run written to
//! `logfile.log` in the log directory.
//!
//! A `RunLog` is passed explicitly to the components that narrate. Writing
//! to it never fails the run; I/O errors are reported through `tracing`.

use chrono::Utc;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

pub struct RunLog {
    file: Mutex<Option<File>>,
    path: Option<PathBuf>,
    echo: bool,
}

impl RunLog {
    /// Create (or truncate) the log file at `path`.
    ///
    /// With `echo`, every recorded line is also printed to stdout.
    pub fn create(path: &Path, echo: bool) -> io::Result<Self> {
        let mut file = File::create(path)?;
        writeln!(file, "testhop run started at {}", Utc::now().to_rfc3339())?;
        Ok(Self {
            file: Mutex::new(Some(file)),
            path: Some(path.to_path_buf()),
            echo,
        })
    }

    /// A log that keeps nothing. Used by tests and dry runs.
    pub fn discard() -> Self {
        Self {
            file: Mutex::new(None),
            path: None,
            echo: false,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append `line` to the log file.
    pub fn record(&self, line: &str) {
        debug!(target: "testhop::run_log", "{line}");
        self.write_line(line);
        if self.echo {
            println!("{line}");
        }
    }

    /// Append a line attributed to one test.
    pub fn test(&self, name: &str, message: &str) {
        self.record(&format!("{name}: {message}"));
    }

    /// Append `line` to the log file and always show it on the console.
    pub fn announce(&self, line: &str) {
        debug!(target: "testhop::run_log", "{line}");
        self.write_line(line);
        println!("{line}");
    }

    /// Show `line` on the console without recording it.
    pub fn console(&self, line: &str) {
        println!("{line}");
    }

    pub fn flush(&self) {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                if let Err(e) = file.flush() {
                    warn!(error = %e, "cannot flush run log");
                }
            }
        }
    }

    fn write_line(&self, line: &str) {
        let Ok(mut guard) = self.file.lock() else {
            return;
        };
        if let Some(file) = guard.as_mut() {
            if let Err(e) = writeln!(file, "{line}") {
                warn!(error = %e, "cannot write run log");
            }
        }
    }
}

impl std::fmt::Debug for RunLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLog")
            .field("path", &self.path)
            .field("echo", &self.echo)
            .finish()
    }
}
