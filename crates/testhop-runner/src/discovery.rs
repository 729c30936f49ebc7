//! Test discovery: every directory under the test root holding a
//! `test.json`, in path order.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use testhop_core::descriptor::descriptor_path;
use testhop_core::{RunError, DESCRIPTOR_FILE};
use tracing::{debug, warn};

/// A directory that holds a test descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub dir: PathBuf,
    /// Names of the regular files next to the descriptor.
    pub files: BTreeSet<String>,
}

impl Candidate {
    pub fn descriptor_path(&self) -> PathBuf {
        descriptor_path(&self.dir)
    }
}

/// Find all candidates below `root`, sorted by directory path.
///
/// Only an unreadable root is an error; unreadable subdirectories are
/// skipped with a warning. Symlinked directories are not followed.
pub fn discover(root: &Path) -> Result<Vec<Candidate>, RunError> {
    let entries = std::fs::read_dir(root).map_err(|source| RunError::TestRoot {
        path: root.to_path_buf(),
        source,
    })?;

    let mut candidates = Vec::new();
    visit(root, entries, &mut candidates);
    candidates.sort_by(|a, b| a.dir.cmp(&b.dir));
    debug!(root = ?root, count = candidates.len(), "tests discovered");
    Ok(candidates)
}

fn visit(dir: &Path, entries: std::fs::ReadDir, candidates: &mut Vec<Candidate>) {
    let mut files = BTreeSet::new();
    let mut subdirs = Vec::new();

    for entry in entries.filter_map(|e| e.ok()) {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            subdirs.push(entry.path());
        } else if file_type.is_file() {
            files.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }

    if files.contains(DESCRIPTOR_FILE) {
        candidates.push(Candidate {
            dir: dir.to_path_buf(),
            files,
        });
    }

    for sub in subdirs {
        match std::fs::read_dir(&sub) {
            Ok(entries) => visit(&sub, entries, candidates),
            Err(e) => warn!(dir = ?sub, error = %e, "skipping unreadable directory"),
        }
    }
}
