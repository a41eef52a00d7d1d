use std::fmt;
use std::path::PathBuf;

use crate::analyzer::ResolvedState;
use crate::domain::ProjectSpec;

/// Non-fatal conditions noticed while bumping a project.
/// These should be reported to the user, who may still go ahead.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryWarning {
    /// No tag of the project exists yet
    Unreleased { pname: String, commits: u32 },
    /// HEAD is already the tagged commit
    NoNewCommits {
        pname: String,
        latest_tag: String,
        current_commit_hash: String,
    },
    /// Tracked files under the project have uncommitted changes
    DirtyWorkingTree { pname: String, basepath: PathBuf },
    /// The project has nothing configured to engrave
    NoEngraveTargets { pname: String },
}

impl BoundaryWarning {
    /// Warnings worth showing before bumping the project in `state`
    pub fn for_state(state: &ResolvedState) -> Vec<BoundaryWarning> {
        let mut warnings = Vec::new();
        match (&state.current, &state.tag) {
            (None, _) => warnings.push(BoundaryWarning::Unreleased {
                pname: state.pname.clone(),
                commits: state.distance,
            }),
            (Some(_), Some(tag)) if state.distance == 0 => {
                warnings.push(BoundaryWarning::NoNewCommits {
                    pname: state.pname.clone(),
                    latest_tag: tag.clone(),
                    current_commit_hash: state.head_short.clone().unwrap_or_default(),
                })
            }
            _ => {}
        }
        warnings
    }

    /// Warnings about the configuration of `project`
    pub fn for_project(project: &ProjectSpec, is_dirty: bool) -> Vec<BoundaryWarning> {
        let mut warnings = Vec::new();
        if is_dirty {
            warnings.push(BoundaryWarning::DirtyWorkingTree {
                pname: project.pname.clone(),
                basepath: project.basepath.clone(),
            });
        }
        if project.engraves.is_empty() {
            warnings.push(BoundaryWarning::NoEngraveTargets {
                pname: project.pname.clone(),
            });
        }
        warnings
    }
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::Unreleased { pname, commits } => write!(
                f,
                "Project '{}' has no release tag yet ({} commits); bumping from 0.0.0",
                pname, commits
            ),
            BoundaryWarning::NoNewCommits {
                pname,
                latest_tag,
                current_commit_hash,
            } => {
                let short_hash = if current_commit_hash.len() > 7 {
                    &current_commit_hash[..7]
                } else {
                    current_commit_hash.as_str()
                };
                write!(
                    f,
                    "No new commits for '{}' since tag '{}' (current: {})",
                    pname, latest_tag, short_hash
                )
            }
            BoundaryWarning::DirtyWorkingTree { pname, basepath } => write!(
                f,
                "Project '{}' has uncommitted changes under '{}'",
                pname,
                basepath.display()
            ),
            BoundaryWarning::NoEngraveTargets { pname } => write!(
                f,
                "Project '{}' has no engrave targets; only a tag will be created",
                pname
            ),
        }
    }
}
