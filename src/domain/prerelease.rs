//! Pre-release segments of PEP-440 versions
//!
//! A pre-release is a phase (alpha, beta, release candidate) plus a number,
//! rendered canonically as `a0`, `b3`, `rc1`.
//! See https://peps.python.org/pep-0440/#pre-releases

use crate::error::{PolyversError, Result};
use std::fmt;
use std::str::FromStr;

/// Pre-release phase, ordered `a < b < rc`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreReleaseType {
    /// Alpha pre-release
    Alpha,
    /// Beta pre-release
    Beta,
    /// Release candidate
    ReleaseCandidate,
}

impl PreReleaseType {
    /// Parse a pre-release phase from a string
    ///
    /// Accepts the PEP-440 spellings: "a", "alpha", "b", "beta",
    /// "c", "rc", "pre", "preview" (case-insensitive).
    pub fn parse(s: &str) -> Result<Self> {
        s.parse()
    }
}

impl FromStr for PreReleaseType {
    type Err = PolyversError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "a" | "alpha" => Ok(PreReleaseType::Alpha),
            "b" | "beta" => Ok(PreReleaseType::Beta),
            "c" | "rc" | "pre" | "preview" => Ok(PreReleaseType::ReleaseCandidate),
            _ => Err(PolyversError::version(format!(
                "Invalid pre-release phase: '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for PreReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreReleaseType::Alpha => write!(f, "a"),
            PreReleaseType::Beta => write!(f, "b"),
            PreReleaseType::ReleaseCandidate => write!(f, "rc"),
        }
    }
}

/// Pre-release phase with its number
///
/// # Examples
/// - "a0" -> PreRelease { phase: Alpha, number: 0 }
/// - "b2" -> PreRelease { phase: Beta, number: 2 }
/// - "rc1" -> PreRelease { phase: ReleaseCandidate, number: 1 }
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PreRelease {
    pub phase: PreReleaseType,
    pub number: u64,
}

impl PreRelease {
    pub fn new(phase: PreReleaseType, number: u64) -> Self {
        PreRelease { phase, number }
    }

    /// Advance towards `phase` (or stay in the current one when `None`).
    ///
    /// Same phase increments the number; a different phase restarts at 0.
    /// Moving to an earlier phase yields a lower pre-release, which callers
    /// must reject.
    pub fn advance(&self, phase: Option<PreReleaseType>) -> Self {
        match phase {
            Some(p) if p != self.phase => PreRelease::new(p, 0),
            _ => PreRelease::new(self.phase, self.number + 1),
        }
    }
}

impl From<pep440_rs::Prerelease> for PreRelease {
    fn from(pre: pep440_rs::Prerelease) -> Self {
        let phase = match pre.kind {
            pep440_rs::PrereleaseKind::Alpha => PreReleaseType::Alpha,
            pep440_rs::PrereleaseKind::Beta => PreReleaseType::Beta,
            pep440_rs::PrereleaseKind::Rc => PreReleaseType::ReleaseCandidate,
        };
        PreRelease::new(phase, pre.number)
    }
}

impl From<PreRelease> for pep440_rs::Prerelease {
    fn from(pre: PreRelease) -> Self {
        let kind = match pre.phase {
            PreReleaseType::Alpha => pep440_rs::PrereleaseKind::Alpha,
            PreReleaseType::Beta => pep440_rs::PrereleaseKind::Beta,
            PreReleaseType::ReleaseCandidate => pep440_rs::PrereleaseKind::Rc,
        };
        pep440_rs::Prerelease {
            kind,
            number: pre.number,
        }
    }
}

impl fmt::Display for PreRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.phase, self.number)
    }
}
