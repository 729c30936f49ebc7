//! testhop runner
//!
//! Executes a tree of runtime tests:
//! - discovers test directories and walks them in order ([`RunOrchestrator`])
//! - runs managed-framework and shell tests as child processes ([`BackendDispatcher`])
//! - aggregates outcomes into a [`RunSummary`] and reports it

pub mod backend;
pub mod discovery;
pub mod orchestrator;
pub mod patcher;
pub mod reporter;
pub mod runner;

// Re-export key types
pub use backend::{BackendDispatcher, DotnetCli, Execution, TestExecutor};
pub use discovery::{discover, Candidate};
pub use orchestrator::RunOrchestrator;
pub use patcher::patch_build_descriptor;
pub use reporter::{
    render_junit, render_properties, report, write_junit, write_properties, Outcome, RunSummary,
    TestRecord,
};
pub use runner::{run_step, Step, StepResult};
