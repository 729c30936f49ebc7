//! Runtime versions and descriptor version specifiers.
//!
//! A [`RuntimeVersion`] is a `major.minor[.patch][-pre]` triple with a missing
//! patch normalised to zero, so `3.1` and `3.1.0` are the same version and
//! every pair of versions is ordered. A [`VersionSpec`] is what a test
//! descriptor declares: either an exact version or `N.x`, any minor of a
//! major.

use crate::error::VersionError;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A concrete runtime version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuntimeVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    /// Pre-release label such as `rc.2.23479.6`.
    pub pre: Option<String>,
}

impl RuntimeVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    /// Parse `major.minor[.patch][-pre]`.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(VersionError::Empty);
        }

        let (numbers, pre) = match input.split_once('-') {
            Some((numbers, pre)) if !pre.is_empty() => (numbers, Some(pre.to_string())),
            Some(_) => return Err(malformed(input, "empty pre-release label")),
            None => (input, None),
        };

        let parts: Vec<&str> = numbers.split('.').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(malformed(input, "expected major.minor[.patch]"));
        }

        let major = component(input, parts[0])?;
        let minor = component(input, parts[1])?;
        let patch = match parts.get(2) {
            Some(p) => component(input, p)?,
            None => 0,
        };

        Ok(Self {
            major,
            minor,
            patch,
            pre,
        })
    }

    /// `"M.m"`, the form used for build-descriptor markers and release branches.
    pub fn major_minor(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    /// The same version without its pre-release label. Eligibility is
    /// decided on this, so an `8.0.0-rc.2` run selects the 8.0 tests.
    pub fn release(&self) -> RuntimeVersion {
        RuntimeVersion::new(self.major, self.minor, self.patch)
    }

    /// Whether `self` has the same major and minor as `other`.
    pub fn same_feature_band(&self, other: &RuntimeVersion) -> bool {
        self.major == other.major && self.minor == other.minor
    }
}

fn component(input: &str, part: &str) -> Result<u32, VersionError> {
    if part.is_empty() {
        return Err(malformed(input, "empty component"));
    }
    part.parse::<u32>()
        .map_err(|_| malformed(input, &format!("component {part:?} is not a number")))
}

fn malformed(input: &str, reason: &str) -> VersionError {
    VersionError::Malformed {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

impl Ord for RuntimeVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for RuntimeVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

impl FromStr for RuntimeVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The version a test descriptor targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    /// A concrete version.
    Exact(RuntimeVersion),
    /// `N.x`: any minor release of major `N`.
    AnyMinor { major: u32 },
}

impl VersionSpec {
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if let Some((major, "x")) = trimmed.split_once('.') {
            let major = component(trimmed, major)?;
            return Ok(VersionSpec::AnyMinor { major });
        }
        RuntimeVersion::parse(trimmed).map(VersionSpec::Exact)
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Exact(v) => write!(f, "{v}"),
            VersionSpec::AnyMinor { major } => write!(f, "{major}.x"),
        }
    }
}

impl FromStr for VersionSpec {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
