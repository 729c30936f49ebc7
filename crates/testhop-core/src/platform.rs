//! Host platform identifiers.
//!
//! Identifiers are the strings test descriptors blacklist: the OS family
//! (`linux`), the distribution id (`fedora`), and the id joined with its
//! version (`fedora39`, `rhel8`).

use std::path::Path;
use tracing::warn;

/// Location of the os-release file on the host.
pub const OS_RELEASE: &str = "/etc/os-release";

const KNOWN_FAMILIES: &[&str] = &[
    "linux", "rhel", "centos", "fedora", "alpine", "ubuntu", "debian", "opensuse", "sles",
    "ol", "rocky", "almalinux", "amzn", "arch", "mariner", "azurelinux", "macos", "osx",
    "windows", "win",
];

/// Platform ids derived from os-release `lines`.
///
/// Returns `["linux", ID, ID+VERSION_ID]`. For `rhel` only the major part of
/// `VERSION_ID` is kept. Missing keys yield just `["linux"]`.
pub fn ids_from_os_release<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let mut ids = vec!["linux".to_string()];

    let Some(id) = value("ID", lines) else {
        return ids;
    };
    ids.push(id.clone());

    if let Some(mut version_id) = value("VERSION_ID", lines) {
        if id == "rhel" {
            if let Some(dot) = version_id.find('.') {
                if dot > 0 {
                    version_id.truncate(dot);
                }
            }
        }
        ids.push(format!("{id}{version_id}"));
    }

    ids
}

/// Platform ids for the current host, read from [`OS_RELEASE`].
pub fn detect() -> Vec<String> {
    detect_from(Path::new(OS_RELEASE))
}

/// Like [`detect`], reading an explicit os-release file.
pub fn detect_from(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let lines: Vec<&str> = text.lines().collect();
            ids_from_os_release(&lines)
        }
        Err(e) => {
            warn!(path = ?path, error = %e, "cannot read os-release, assuming plain linux");
            vec!["linux".to_string()]
        }
    }
}

/// Whether `id` looks like a platform identifier this tool knows about:
/// a known family, optionally followed by a version and/or architecture.
pub fn is_recognized(id: &str) -> bool {
    let id = id.trim().to_ascii_lowercase();
    let base = id.split('-').next().unwrap_or_default();
    KNOWN_FAMILIES.iter().any(|family| {
        base.strip_prefix(family)
            .map(|rest| rest.chars().all(|c| c.is_ascii_digit() || c == '.'))
            .unwrap_or(false)
    })
}

// Last assignment of `key` wins, like a shell sourcing the file.
fn value<S: AsRef<str>>(key: &str, lines: &[S]) -> Option<String> {
    let prefix = format!("{key}=");
    lines
        .iter()
        .filter_map(|line| line.as_ref().trim().strip_prefix(&prefix))
        .last()
        .map(unquote)
}

fn unquote(text: &str) -> String {
    let text = text.trim();
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return text[1..text.len() - 1].to_string();
        }
    }
    text.to_string()
}
