//! Run orchestration.
//!
//! Walks the discovered tests one at a time:
//! load → select → pre-clean → execute → post-clean → count.
//! Per-test problems are isolated to that test; only an [`OperatorError`]
//! from a backend or an unreadable test root ends the run.
//!
//! [`OperatorError`]: testhop_core::OperatorError

use crate::backend::TestExecutor;
use crate::discovery::{discover, Candidate};
use crate::reporter::RunSummary;
use testhop_core::{select, Cleaner, RunConfig, RunError, RunLog, RunTarget, TestDescriptor};
use tracing::{debug, info, warn};

/// What happened to one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Skipped,
    Passed,
    Failed,
}

/// Drives a whole run and owns its counters.
pub struct RunOrchestrator<'a> {
    config: &'a RunConfig,
    target: &'a RunTarget,
    cleaner: &'a Cleaner,
    log: &'a RunLog,
}

impl<'a> RunOrchestrator<'a> {
    pub fn new(
        config: &'a RunConfig,
        target: &'a RunTarget,
        cleaner: &'a Cleaner,
        log: &'a RunLog,
    ) -> Self {
        Self {
            config,
            target,
            cleaner,
            log,
        }
    }

    /// Run every eligible test under the configured root through `executor`.
    pub async fn run(&self, executor: &dyn TestExecutor) -> Result<RunSummary, RunError> {
        let candidates = discover(&self.config.test_root)?;
        info!(
            root = ?self.config.test_root,
            version = %self.target.version,
            platforms = ?self.target.platforms,
            candidates = candidates.len(),
            "starting run"
        );
        self.log.record(&format!(
            "Testing everything under {}",
            self.config.test_root.display()
        ));

        if self.config.clean_caches {
            self.clean_caches();
        }

        let mut summary = RunSummary::start();
        for candidate in &candidates {
            let visit = self.visit(candidate, executor, &mut summary).await?;
            if visit == Visit::Failed && self.config.fail_fast {
                info!(dir = ?candidate.dir, "halting after first failure");
                summary.halted_early = true;
                break;
            }
        }

        if self.config.clean_caches {
            self.clean_caches();
        }

        summary.finish();
        Ok(summary)
    }

    async fn visit(
        &self,
        candidate: &Candidate,
        executor: &dyn TestExecutor,
        summary: &mut RunSummary,
    ) -> Result<Visit, RunError> {
        let descriptor =
            match TestDescriptor::load(&candidate.descriptor_path(), candidate.files.iter().cloned()) {
                Ok(d) => d,
                Err(e) => {
                    let label = dir_label(candidate);
                    warn!(dir = ?candidate.dir, error = %e, "cannot load test");
                    self.log.test(&label, &format!("Failed to load test: {e}"));
                    self.log.console(&format!("Failed to load {label}"));
                    summary.record_load_failure(&label, &format!("Failed to load test: {e}"));
                    return Ok(Visit::Failed);
                }
            };

        let selection = select(&descriptor, self.target);
        if !selection.is_eligible() {
            debug!(test = %descriptor.name, reason = %selection, "skipping");
            self.log.test(&descriptor.name, &format!("Skipped ({selection})"));
            summary.record_skip();
            return Ok(Visit::Skipped);
        }

        self.clean_test(&descriptor, candidate);
        let execution = executor.execute(&descriptor, &candidate.dir).await?;
        self.clean_test(&descriptor, candidate);

        if execution.passed() {
            summary.record_pass(&descriptor.name, execution.output);
            Ok(Visit::Passed)
        } else {
            summary.record_failure(&descriptor.name, execution.exit_code, execution.output);
            Ok(Visit::Failed)
        }
    }

    fn clean_test(&self, descriptor: &TestDescriptor, candidate: &Candidate) {
        if !descriptor.cleanup {
            return;
        }
        match self.cleaner.clean_test_dir(&candidate.dir) {
            Ok(removed) => debug!(test = %descriptor.name, removed = removed.len(), "cleaned"),
            Err(e) => {
                warn!(test = %descriptor.name, error = %e, "cleanup failed");
                self.log.test(&descriptor.name, &format!("Cleanup failed: {e}"));
            }
        }
    }

    fn clean_caches(&self) {
        for e in self.cleaner.clean_caches() {
            warn!(error = %e, "cache cleanup failed");
            self.log.record(&format!("Cache cleanup failed: {e}"));
        }
    }
}

fn dir_label(candidate: &Candidate) -> String {
    candidate
        .dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| candidate.dir.display().to_string())
}
