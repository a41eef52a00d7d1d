use crate::domain::prerelease::{PreRelease, PreReleaseType};
use crate::error::{PolyversError, Result};
use std::fmt;
use std::str::FromStr;

/// PEP-440 version: `[N!]N(.N)*[{a|b|rc}N][.postN][.devN][+local]`
///
/// Parsing, normalisation and ordering come from `pep440_rs`, so `1.0 == 1.0.0`
/// while both still display the release segments they were written with.
/// Only the bump arithmetic lives here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version(pep440_rs::Version);

impl Version {
    /// Create a final `major.minor.patch` release
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version::from_release(vec![major, minor, patch])
    }

    /// Create a final release from its segments
    pub fn from_release(release: Vec<u64>) -> Self {
        Version(pep440_rs::Version::new(release))
    }

    /// The base that unreleased projects are bumped from
    pub fn zero() -> Self {
        Version::new(0, 0, 0)
    }

    /// Parse a version string (e.g., "1.2.3", "v2.0rc1", "1.0.post2.dev3+local.7")
    pub fn parse(s: &str) -> Result<Self> {
        s.trim()
            .parse::<pep440_rs::Version>()
            .map(Version)
            .map_err(|e| PolyversError::version(format!("Invalid PEP-440 version '{}': {}", s, e)))
    }

    pub fn epoch(&self) -> u64 {
        self.0.epoch()
    }

    pub fn release(&self) -> &[u64] {
        self.0.release()
    }

    /// Release segment at `index`, with missing segments read as 0
    pub fn release_at(&self, index: usize) -> u64 {
        self.release().get(index).copied().unwrap_or(0)
    }

    pub fn pre(&self) -> Option<PreRelease> {
        self.0.pre().map(PreRelease::from)
    }

    pub fn post(&self) -> Option<u64> {
        self.0.post()
    }

    pub fn dev(&self) -> Option<u64> {
        self.0.dev()
    }

    /// Pre-releases and developmental releases sort before their final release.
    pub fn is_prerelease(&self) -> bool {
        self.pre().is_some() || self.dev().is_some()
    }

    /// This version without its local label
    pub fn public(&self) -> Version {
        Version(
            pep440_rs::Version::new(self.release())
                .with_epoch(self.epoch())
                .with_pre(self.0.pre())
                .with_post(self.post())
                .with_dev(self.dev()),
        )
    }

    /// The public version with `label` as its local part, e.g. `2.g79ceebf8`
    pub fn with_local_label(&self, label: &str) -> Result<Version> {
        Version::parse(&format!("{}+{}", self.public(), label))
    }

    /// Bump version according to bump type
    pub fn bump(&self, bump_type: &VersionBump) -> Self {
        match bump_type {
            VersionBump::Major => self.bump_release(0),
            VersionBump::Minor => self.bump_release(1),
            VersionBump::Patch => self.bump_release(2),
            VersionBump::PreRelease(phase) => self.bump_prerelease(*phase),
            VersionBump::Explicit(version) => version.clone(),
        }
    }

    /// Whether this version sorts below the final release of its segments.
    ///
    /// `1.0rc1` and `1.0.dev2` do, `1.0.post1.dev1` does not.
    fn precedes_release(&self) -> bool {
        self.pre().is_some() || (self.dev().is_some() && self.post().is_none())
    }

    fn bump_release(&self, index: usize) -> Self {
        let mut release = self.release().to_vec();
        if release.len() <= index {
            release.resize(index + 1, 0);
        }

        // A pre-release of exactly the target release is finalized, not skipped.
        let finalize = self.precedes_release() && release[index + 1..].iter().all(|&n| n == 0);
        if !finalize {
            release[index] += 1;
            release[index + 1..].iter_mut().for_each(|n| *n = 0);
        }

        Version(pep440_rs::Version::new(release).with_epoch(self.epoch()))
    }

    fn bump_prerelease(&self, phase: Option<PreReleaseType>) -> Self {
        let phase_or_alpha = phase.unwrap_or(PreReleaseType::Alpha);

        let (release, pre) = match (self.pre(), self.post(), self.dev()) {
            (Some(pre), _, _) => (self.release().to_vec(), pre.advance(phase)),
            (None, None, Some(_)) => (self.release().to_vec(), PreRelease::new(phase_or_alpha, 0)),
            _ => {
                let mut release = self.release().to_vec();
                if release.len() < 3 {
                    release.resize(3, 0);
                }
                release[2] += 1;
                release[3..].iter_mut().for_each(|n| *n = 0);
                (release, PreRelease::new(phase_or_alpha, 0))
            }
        };

        Version(
            pep440_rs::Version::new(release)
                .with_epoch(self.epoch())
                .with_pre(Some(pre.into())),
        )
    }
}

impl FromStr for Version {
    type Err = PolyversError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Version bump request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionBump {
    Major,
    Minor,
    Patch,
    /// Advance (or start) a pre-release, optionally in the given phase
    PreRelease(Option<PreReleaseType>),
    /// Jump to exactly this version
    Explicit(Version),
}

impl VersionBump {
    /// Apply a `--pre` phase; only meaningful for pre-release bumps.
    pub fn with_phase(self, phase: Option<PreReleaseType>) -> Self {
        match (self, phase) {
            (VersionBump::PreRelease(_), Some(p)) => VersionBump::PreRelease(Some(p)),
            (bump, _) => bump,
        }
    }
}

impl FromStr for VersionBump {
    type Err = PolyversError;

    /// Accepts `major`, `minor`, `patch`, `prerelease` (or `pre`), or a version.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "major" => Ok(VersionBump::Major),
            "minor" => Ok(VersionBump::Minor),
            "patch" => Ok(VersionBump::Patch),
            "prerelease" | "pre" => Ok(VersionBump::PreRelease(None)),
            _ => Version::parse(s).map(VersionBump::Explicit),
        }
    }
}

impl fmt::Display for VersionBump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionBump::Major => write!(f, "major"),
            VersionBump::Minor => write!(f, "minor"),
            VersionBump::Patch => write!(f, "patch"),
            VersionBump::PreRelease(None) => write!(f, "prerelease"),
            VersionBump::PreRelease(Some(phase)) => write!(f, "prerelease({})", phase),
            VersionBump::Explicit(v) => write!(f, "explicit {}", v),
        }
    }
}
