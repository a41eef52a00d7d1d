use crate::analyzer::history::TagHistoryReader;
use crate::domain::{ProjectSpec, PvTag, Version};
use crate::error::Result;
use crate::git::Repository;
use chrono::Local;
use tracing::{debug, warn};

/// The version state of one project, derived from the repository each run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedState {
    pub pname: String,
    /// `None` while the project is unreleased
    pub current: Option<Version>,
    /// Tag the current version was read from
    pub tag: Option<String>,
    /// Commits since that tag; all commits while unreleased
    pub distance: u32,
    /// Abbreviated HEAD hash, absent on an unborn HEAD
    pub head_short: Option<String>,
    /// Uncommitted changes to tracked files under the project basepath
    pub is_dirty: bool,
}

impl ResolvedState {
    pub fn is_unreleased(&self) -> bool {
        self.current.is_none()
    }

    /// Current version with `+N.gHASH` appended when HEAD is ahead of the tag
    pub fn describe_version(&self) -> Option<Version> {
        let version = self.current.as_ref()?;
        match &self.head_short {
            Some(hash) if self.distance > 0 => version
                .with_local_label(&format!("{}.g{}", self.distance, hash))
                .ok()
                .or_else(|| Some(version.clone())),
            _ => Some(version.clone()),
        }
    }
}

/// Determines the current version of projects from their tag history
pub struct VersionResolver<'r, R: Repository> {
    repo: &'r R,
    reader: TagHistoryReader<'r, R>,
}

impl<'r, R: Repository> VersionResolver<'r, R> {
    pub fn new(repo: &'r R) -> Self {
        VersionResolver {
            repo,
            reader: TagHistoryReader::new(repo),
        }
    }

    /// Resolve the current state of `project`.
    ///
    /// The highest version among the project's tags wins; equal versions
    /// prefer the tag closest to HEAD, then the smaller tag name.
    pub fn resolve(&self, project: &ProjectSpec) -> Result<ResolvedState> {
        let best = match self.reader.list_tags(project) {
            Ok(tags) => tags.fold(None, |best: Option<(String, PvTag)>, tag| match best {
                Some(b) if !supersedes(&tag.1, &b.1) => Some(b),
                _ => Some(tag),
            }),
            Err(e) if e.is_recoverable() => {
                debug!(pname = %project.pname, "no tags found, project is unreleased");
                None
            }
            Err(e) => return Err(e),
        };

        let head_short = match self.repo.head_oid()? {
            Some(oid) => Some(self.repo.short_id(oid)?),
            None => None,
        };
        let is_dirty = self.repo.is_dirty(Some(&project.basepath))?;

        let state = match best {
            Some((tag, pvtag)) => ResolvedState {
                pname: project.pname.clone(),
                distance: pvtag.distance(),
                tag: Some(tag),
                current: Some(pvtag.version),
                head_short,
                is_dirty,
            },
            None => ResolvedState {
                pname: project.pname.clone(),
                current: None,
                tag: None,
                distance: self.repo.count_commits()?,
                head_short,
                is_dirty,
            },
        };
        debug!(
            pname = %state.pname,
            current = ?state.current.as_ref().map(|v| v.to_string()),
            distance = state.distance,
            dirty = state.is_dirty,
            "resolved"
        );
        Ok(state)
    }

    /// Resolve several projects, keeping their order
    pub fn resolve_all<'p>(
        &self,
        projects: impl IntoIterator<Item = &'p ProjectSpec>,
    ) -> Result<Vec<ResolvedState>> {
        projects.into_iter().map(|p| self.resolve(p)).collect()
    }

    /// Describe-style version of `project`, e.g. `1.7.4.post0+2.g79ceebf8`
    pub fn describe(&self, project: &ProjectSpec) -> Result<Option<Version>> {
        Ok(self
            .reader
            .describe(project)?
            .map(|pvtag| pvtag.describe_version()))
    }

    /// [describe](Self::describe), or `default` when `project` has no
    /// matching tag or the repository cannot be described.
    pub fn describe_or(&self, project: &ProjectSpec, default: Version) -> Version {
        match self.describe(project) {
            Ok(Some(version)) => version,
            Ok(None) => default,
            Err(e) => {
                warn!(pname = %project.pname, error = %e, "describe failed, using default version");
                default
            }
        }
    }

    /// Committer date of HEAD in RFC-2822, e.g. `Sat, 14 Apr 2018 19:04:57 +0300`.
    ///
    /// Falls back to the current time for an unborn HEAD or a failing repository.
    pub fn polytime(&self) -> String {
        let time = match self.repo.head_commit_time() {
            Ok(time) => time,
            Err(e) => {
                warn!(error = %e, "cannot read HEAD commit time, using current time");
                None
            }
        };
        time.unwrap_or_else(|| Local::now().fixed_offset()).to_rfc2822()
    }
}

fn supersedes(candidate: &PvTag, best: &PvTag) -> bool {
    candidate
        .version
        .cmp(&best.version)
        .then_with(|| best.distance().cmp(&candidate.distance()))
        .is_gt()
}
