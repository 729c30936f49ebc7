//! Decides whether a descriptor applies to the current run.
//!
//! Pure logic: no I/O, no logging. Checks short-circuit in order:
//! enabled state, version, platform blacklist.

use crate::config::RunTarget;
use crate::descriptor::TestDescriptor;
use crate::version::{RuntimeVersion, VersionSpec};
use std::collections::BTreeSet;
use std::fmt;

/// Outcome of selection, with the reason a test was left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Eligible,
    Disabled,
    VersionMismatch,
    Blacklisted { platform: String },
}

impl Selection {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Selection::Eligible)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Eligible => write!(f, "eligible"),
            Selection::Disabled => write!(f, "disabled"),
            Selection::VersionMismatch => write!(f, "version does not apply"),
            Selection::Blacklisted { platform } => write!(f, "blacklisted on {platform}"),
        }
    }
}

/// Select `descriptor` against `target`.
pub fn select(descriptor: &TestDescriptor, target: &RunTarget) -> Selection {
    if !descriptor.enabled && !target.execute_disabled {
        return Selection::Disabled;
    }

    if !version_matches(descriptor, &target.version) {
        return Selection::VersionMismatch;
    }

    if let Some(platform) = blacklisted_on(descriptor, &target.platforms) {
        return Selection::Blacklisted {
            platform: platform.to_string(),
        };
    }

    Selection::Eligible
}

/// Boolean form of [`select`] over loose arguments.
pub fn is_eligible(
    descriptor: &TestDescriptor,
    run_version: &RuntimeVersion,
    run_platforms: &BTreeSet<String>,
    execute_disabled: bool,
) -> bool {
    if !descriptor.enabled && !execute_disabled {
        return false;
    }
    version_matches(descriptor, run_version) && blacklisted_on(descriptor, run_platforms).is_none()
}

/// Version-specific tests need an exact (or major-wildcard) match; baseline
/// tests apply from their declared version onward. A pre-release run counts
/// as its release.
pub fn version_matches(descriptor: &TestDescriptor, run_version: &RuntimeVersion) -> bool {
    let run_version = run_version.release();
    match (&descriptor.target_version, descriptor.version_specific) {
        (VersionSpec::Exact(v), true) => *v == run_version,
        (VersionSpec::AnyMinor { major }, true) => *major == run_version.major,
        (VersionSpec::Exact(v), false) => *v <= run_version,
        (VersionSpec::AnyMinor { major }, false) => *major <= run_version.major,
    }
}

fn blacklisted_on<'a>(
    descriptor: &TestDescriptor,
    platforms: &'a BTreeSet<String>,
) -> Option<&'a str> {
    platforms
        .iter()
        .find(|p| descriptor.platform_blacklist.contains(*p))
        .map(String::as_str)
}
