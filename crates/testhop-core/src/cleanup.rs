//! Best-effort removal of build artifacts and package caches.
//!
//! Every operation is idempotent: removing something that is already gone
//! is a no-op.

use crate::error::CleanupError;
use std::io;
use std::path::{Path, PathBuf};

/// Build outputs removed from a test directory when the test asks for cleanup.
pub const PROJECT_ARTIFACTS: &[&str] = &["bin", "obj", "project.lock.json"];

/// Package caches under the user's home directory.
pub const HOME_CACHES: &[&str] = &[
    ".nuget/packages",
    ".local/share/NuGet",
    ".dotnet",
    ".templateengine",
];

/// Runtime scratch directories under the temp directory.
pub const TMP_CACHES: &[&str] = &["NuGet", "NuGetScratch", ".dotnet", "VBCSCompiler", "Razor-Server"];

#[derive(Debug, Clone)]
pub struct Cleaner {
    home: Option<PathBuf>,
    tmp: PathBuf,
}

impl Cleaner {
    pub fn new(home: Option<PathBuf>, tmp: PathBuf) -> Self {
        Self { home, tmp }
    }

    /// Uses `$HOME` and the system temp directory.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var_os("HOME").map(PathBuf::from),
            std::env::temp_dir(),
        )
    }

    /// Remove [`PROJECT_ARTIFACTS`] from `test_dir`.
    ///
    /// Returns the paths that were actually removed.
    pub fn clean_test_dir(&self, test_dir: &Path) -> Result<Vec<PathBuf>, CleanupError> {
        let mut removed = Vec::new();
        for name in PROJECT_ARTIFACTS {
            let path = test_dir.join(name);
            if remove_path(&path)? {
                removed.push(path);
            }
        }
        Ok(removed)
    }

    /// Remove user-level package caches. Keeps going past failures and
    /// returns them all.
    pub fn clean_caches(&self) -> Vec<CleanupError> {
        let home = self.home.iter().flat_map(|home| HOME_CACHES.iter().map(move |c| home.join(c)));
        let tmp = TMP_CACHES.iter().map(|c| self.tmp.join(c));

        home.chain(tmp)
            .filter_map(|path| remove_path(&path).err())
            .collect()
    }
}

/// Remove a file or directory tree. `Ok(false)` when nothing was there.
pub fn remove_path(path: &Path) -> Result<bool, CleanupError> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(source) => {
            return Err(CleanupError {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let result = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(CleanupError {
            path: path.to_path_buf(),
            source,
        }),
    }
}
