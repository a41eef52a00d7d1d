use crate::analyzer::ResolvedState;
use crate::domain::{BumpScope, Registry, Version, VersionBump, VersionScheme};
use crate::error::{PolyversError, Result};
use crate::git::Repository;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// What to bump, and which projects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpRequest {
    pub kind: VersionBump,
    pub scope: BumpScope,
}

/// The computed bump of one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedBump {
    pub pname: String,
    /// `None` when the project had no release yet
    pub old: Option<Version>,
    pub new: Version,
    pub kind: VersionBump,
    pub tag_name: String,
}

impl fmt::Display for PlannedBump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.old {
            Some(old) => write!(f, "{} {} → {}", self.pname, old, self.new),
            None => write!(f, "{} (unreleased) → {}", self.pname, self.new),
        }
    }
}

/// Every planned bump, validated as a whole before anything is written
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BumpPlan {
    entries: Vec<PlannedBump>,
}

impl BumpPlan {
    pub fn entries(&self) -> &[PlannedBump] {
        &self.entries
    }

    pub fn get(&self, pname: &str) -> Option<&PlannedBump> {
        self.entries.iter().find(|e| e.pname == pname)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.tag_name.clone()).collect()
    }

    /// `a 2.0.0 → 2.1.0, b 2.0.0 → 2.1.0`
    pub fn summary(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Computes and validates bump plans; never touches the repository.
pub struct BumpEngine<'a> {
    registry: &'a Registry,
}

impl<'a> BumpEngine<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        BumpEngine { registry }
    }

    /// Compute the next version of every targeted project.
    ///
    /// `states` must hold the resolved state of each targeted project.
    ///
    /// # Errors
    /// * `UnknownProject` - the scope names a project not in the registry
    /// * `VersionNotMonotonic` - a new version is not above the current one
    /// * `VersionSkew` - shared-scheme projects would diverge
    /// * `DuplicateTag` - two projects would produce the same tag
    pub fn plan(&self, request: &BumpRequest, states: &[ResolvedState]) -> Result<BumpPlan> {
        let mut entries = Vec::new();

        for project in self.registry.select(&request.scope)? {
            let state = states
                .iter()
                .find(|s| s.pname == project.pname)
                .ok_or_else(|| {
                    PolyversError::config(format!(
                        "no resolved state for project '{}'",
                        project.pname
                    ))
                })?;

            let base = state.current.clone().unwrap_or_else(Version::zero);
            let new = base.bump(&request.kind);
            if let Some(current) = &state.current {
                if new <= *current {
                    return Err(PolyversError::VersionNotMonotonic {
                        pname: project.pname.clone(),
                        current: current.to_string(),
                        new: new.to_string(),
                    });
                }
            }

            debug!(pname = %project.pname, from = %base, to = %new, kind = %request.kind, "planned");
            entries.push(PlannedBump {
                pname: project.pname.clone(),
                old: state.current.clone(),
                tag_name: project.tag_pattern.format(&new),
                new,
                kind: request.kind.clone(),
            });
        }

        self.check_scheme(&entries)?;
        check_unique_tags(&entries)?;
        Ok(BumpPlan { entries })
    }

    fn check_scheme(&self, entries: &[PlannedBump]) -> Result<()> {
        let VersionScheme::Shared { members } = self.registry.scheme() else {
            return Ok(());
        };

        let targeted: Vec<&PlannedBump> = entries
            .iter()
            .filter(|e| members.contains(&e.pname))
            .collect();
        let Some(first) = targeted.first() else {
            return Ok(());
        };

        let left_behind: Vec<&str> = members
            .iter()
            .filter(|m| !targeted.iter().any(|e| &e.pname == *m))
            .map(String::as_str)
            .collect();
        if !left_behind.is_empty() {
            return Err(PolyversError::VersionSkew(format!(
                "bumping {} would leave {} behind",
                targeted
                    .iter()
                    .map(|e| e.pname.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                left_behind.join(", ")
            )));
        }

        if targeted.iter().any(|e| e.new != first.new) {
            return Err(PolyversError::VersionSkew(
                targeted
                    .iter()
                    .map(|e| format!("{} → {}", e.pname, e.new))
                    .collect::<Vec<_>>()
                    .join(", "),
            ));
        }
        Ok(())
    }

    /// Reject plans whose tags already exist in the repository.
    pub fn check_tags_free<R: Repository>(&self, plan: &BumpPlan, repo: &R) -> Result<()> {
        for entry in plan.entries() {
            if repo.find_tag_oid(&entry.tag_name)?.is_some() {
                return Err(PolyversError::DuplicateTag(entry.tag_name.clone()));
            }
        }
        Ok(())
    }
}

fn check_unique_tags(entries: &[PlannedBump]) -> Result<()> {
    let mut seen = HashSet::new();
    match entries.iter().find(|e| !seen.insert(e.tag_name.as_str())) {
        Some(dup) => Err(PolyversError::DuplicateTag(dup.tag_name.clone())),
        None => Ok(()),
    }
}
