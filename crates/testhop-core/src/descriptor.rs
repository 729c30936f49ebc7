//! Test descriptor loading.
//!
//! Every test lives in its own directory next to a `test.json` file:
//!
//! ```json
//! {
//!   "name": "hello-world",
//!   "enabled": true,
//!   "type": "xunit",
//!   "version": "3.1",
//!   "versionSpecific": false,
//!   "platformBlacklist": ["rhel7"],
//!   "cleanup": true
//! }
//! ```

use crate::error::{DescriptorError, Result};
use crate::platform;
use crate::version::VersionSpec;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// File name of the per-test descriptor.
pub const DESCRIPTOR_FILE: &str = "test.json";

/// Execution backend a test asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TestKind {
    /// Restore + test through the managed-framework driver (`"xunit"`).
    ManagedFramework,
    /// A `test.sh` script in the test directory (`"bash"`).
    Shell,
    /// Loads fine, fails when dispatched.
    Unsupported(String),
}

impl TestKind {
    pub fn from_wire(kind: &str) -> Self {
        match kind.trim().to_ascii_lowercase().as_str() {
            "xunit" => TestKind::ManagedFramework,
            "bash" => TestKind::Shell,
            _ => TestKind::Unsupported(kind.to_string()),
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestKind::ManagedFramework => write!(f, "xunit"),
            TestKind::Shell => write!(f, "bash"),
            TestKind::Unsupported(kind) => write!(f, "{kind}"),
        }
    }
}

/// Typed, validated form of a `test.json` file. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDescriptor {
    pub name: String,
    pub enabled: bool,
    pub kind: TestKind,
    pub target_version: VersionSpec,
    pub version_specific: bool,
    pub platform_blacklist: BTreeSet<String>,
    pub cleanup: bool,
    /// Other files found next to the descriptor. Informational.
    pub discovered_files: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescriptor {
    name: Option<String>,
    enabled: Option<bool>,
    #[serde(rename = "type")]
    kind: Option<String>,
    version: Option<String>,
    version_specific: Option<bool>,
    platform_blacklist: Option<Vec<String>>,
    cleanup: Option<bool>,
}

impl TestDescriptor {
    /// Read and validate the descriptor at `config_path`.
    ///
    /// `files` are the names of the descriptor's sibling files.
    pub fn load<I>(config_path: &Path, files: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let text = std::fs::read_to_string(config_path).map_err(|source| DescriptorError::Io {
            path: config_path.to_path_buf(),
            source,
        })?;
        Self::from_json(config_path, &text, files)
    }

    /// Validate descriptor text that was read from `config_path`.
    pub fn from_json<I>(config_path: &Path, text: &str, files: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let path = config_path.to_path_buf();
        let raw: RawDescriptor =
            serde_json::from_str(text).map_err(|source| DescriptorError::Json {
                path: path.clone(),
                source,
            })?;

        let name = raw.name.ok_or_else(|| missing(&path, "name"))?;
        if name.trim().is_empty() {
            return Err(DescriptorError::EmptyName { path });
        }

        let directory = directory_name(&path);
        if directory.as_deref() != Some(name.as_str()) {
            return Err(DescriptorError::NameMismatch {
                name,
                directory: directory.unwrap_or_default(),
            });
        }

        let kind = raw
            .kind
            .map(|k| TestKind::from_wire(&k))
            .ok_or_else(|| missing(&path, "type"))?;

        let version = raw.version.ok_or_else(|| missing(&path, "version"))?;
        let target_version = VersionSpec::parse(&version).map_err(|source| {
            DescriptorError::InvalidVersion {
                path: path.clone(),
                source,
            }
        })?;

        let platform_blacklist: BTreeSet<String> =
            raw.platform_blacklist.unwrap_or_default().into_iter().collect();
        for entry in &platform_blacklist {
            if !platform::is_recognized(entry) {
                warn!(test = %name, platform = %entry, "unrecognized platform in blacklist");
            }
        }

        Ok(Self {
            name,
            enabled: raw.enabled.unwrap_or(true),
            kind,
            target_version,
            version_specific: raw.version_specific.unwrap_or(false),
            platform_blacklist,
            cleanup: raw.cleanup.unwrap_or(false),
            discovered_files: files
                .into_iter()
                .filter(|f| f != DESCRIPTOR_FILE)
                .collect(),
        })
    }
}

fn missing(path: &Path, field: &'static str) -> DescriptorError {
    DescriptorError::MissingField {
        path: path.to_path_buf(),
        field,
    }
}

fn directory_name(config_path: &Path) -> Option<String> {
    config_path
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
}

/// Path of the descriptor inside `test_dir`.
pub fn descriptor_path(test_dir: &Path) -> PathBuf {
    test_dir.join(DESCRIPTOR_FILE)
}
