//! Retargets a test's build descriptor at the runtime under test.

use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use testhop_core::RuntimeVersion;

const TARGET_FRAMEWORK: &str = r"<TargetFramework>net(?:coreapp)?\d+\.\d+</TargetFramework>";

fn target_framework() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(TARGET_FRAMEWORK).ok()).as_ref()
}

/// Build descriptor of the test named `name` in `test_dir`.
pub fn build_descriptor_path(test_dir: &Path, name: &str) -> PathBuf {
    test_dir.join(format!("{name}.csproj"))
}

/// Target-framework moniker for `version`: `netcoreappM.m` before 4.0,
/// `netM.m` after.
pub fn target_framework_moniker(version: &RuntimeVersion) -> String {
    if version.major < 4 {
        format!("netcoreapp{}", version.major_minor())
    } else {
        format!("net{}", version.major_minor())
    }
}

/// Rewrite every target-framework marker in `contents`.
pub fn patch_contents(contents: &str, version: &RuntimeVersion) -> String {
    let Some(pattern) = target_framework() else {
        return contents.to_string();
    };
    let replacement = format!(
        "<TargetFramework>{}</TargetFramework>",
        target_framework_moniker(version)
    );
    pattern
        .replace_all(contents, regex::NoExpand(&replacement))
        .into_owned()
}

/// Patch the build descriptor in place. `Ok(false)` when the test has none.
pub fn patch_build_descriptor(
    test_dir: &Path,
    name: &str,
    version: &RuntimeVersion,
) -> io::Result<bool> {
    let path = build_descriptor_path(test_dir, name);
    let contents = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    let patched = patch_contents(&contents, version);
    if patched != contents {
        std::fs::write(&path, patched)?;
    }
    Ok(true)
}
