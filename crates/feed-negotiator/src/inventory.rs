//! Locally installed runtimes
//!
//! Queried through the managed-framework driver's `--list-runtimes`, which
//! prints one runtime per line:
//!
//! ```text
//! Microsoft.AspNetCore.App 6.0.25 [/usr/lib64/dotnet/shared/Microsoft.AspNetCore.App]
//! Microsoft.NETCore.App 6.0.25 [/usr/lib64/dotnet/shared/Microsoft.NETCore.App]
//! ```

use crate::error::NegotiationError;
use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use testhop_core::RuntimeVersion;
use tokio::process::Command;
use tracing::debug;

/// Framework whose versions identify the runtime.
pub const RUNTIME_FRAMEWORK: &str = "Microsoft.NETCore.App";

/// Source of the locally installed runtime versions.
#[async_trait]
pub trait RuntimeInventory: Send + Sync {
    async fn installed_runtimes(&self) -> Result<Vec<RuntimeVersion>>;
}

/// Inventory backed by `dotnet --list-runtimes`.
#[derive(Debug, Clone)]
pub struct DotnetInventory {
    program: PathBuf,
}

impl DotnetInventory {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for DotnetInventory {
    fn default() -> Self {
        Self::new("dotnet")
    }
}

#[async_trait]
impl RuntimeInventory for DotnetInventory {
    async fn installed_runtimes(&self) -> Result<Vec<RuntimeVersion>> {
        let output = Command::new(&self.program)
            .arg("--list-runtimes")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                NegotiationError::Inventory(format!("cannot run {:?}: {e}", self.program))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(NegotiationError::Inventory(format!(
                "{:?} --list-runtimes exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(parse_runtime_list(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Runtime versions of [`RUNTIME_FRAMEWORK`] listed in `output`.
pub fn parse_runtime_list(output: &str) -> Vec<RuntimeVersion> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let framework = fields.next()?;
            let version = fields.next()?;
            if framework != RUNTIME_FRAMEWORK {
                return None;
            }
            match RuntimeVersion::parse(version) {
                Ok(v) => Some(v),
                Err(e) => {
                    debug!(line = %line, error = %e, "skipping unparsable runtime entry");
                    None
                }
            }
        })
        .collect()
}

/// Newest installed runtime in the same `major.minor` band as `target`.
pub fn latest_matching(installed: &[RuntimeVersion], target: &RuntimeVersion) -> Option<RuntimeVersion> {
    installed
        .iter()
        .filter(|v| v.same_feature_band(target))
        .max()
        .cloned()
}
