//! testhop core
//!
//! Plain data and pure logic shared by the testhop crates:
//! - loading `test.json` descriptors into [`TestDescriptor`]
//! - deciding which descriptors apply to a run ([`select`])
//! - runtime versions, host platforms, cleanup, the run log

pub mod cleanup;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod platform;
pub mod run_log;
pub mod selector;
pub mod telemetry;
pub mod version;

pub use cleanup::Cleaner;
pub use config::{RunConfig, RunTarget};
pub use descriptor::{TestDescriptor, TestKind, DESCRIPTOR_FILE};
pub use error::{CleanupError, DescriptorError, OperatorError, RunError, VersionError};
pub use run_log::RunLog;
pub use selector::{is_eligible, select, Selection};
pub use telemetry::init_tracing;
pub use version::{RuntimeVersion, VersionSpec};

/// testhop version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
