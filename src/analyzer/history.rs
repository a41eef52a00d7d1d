use crate::domain::{DescId, ProjectSpec, PvTag, TagPattern};
use crate::error::{PolyversError, Result};
use crate::git::{Repository, TagRef};
use glob::{MatchOptions, Pattern};
use tracing::trace;

/// Reads the tag history of projects from the repository (read-only)
pub struct TagHistoryReader<'r, R: Repository> {
    repo: &'r R,
}

impl<'r, R: Repository> TagHistoryReader<'r, R> {
    pub fn new(repo: &'r R) -> Self {
        TagHistoryReader { repo }
    }

    /// Tags of `project` reachable from HEAD, nearest first.
    ///
    /// Tag names are parsed lazily while iterating; names the project's
    /// pattern rejects are skipped. Every call queries the repository again.
    ///
    /// # Errors
    /// * `NoTagsFound` - no tag reachable from HEAD looks like one of this
    ///   project's tags
    pub fn list_tags<'p>(&self, project: &'p ProjectSpec) -> Result<PvTags<'p>> {
        let glob = Pattern::new(&project.tag_pattern.glob()).ok();
        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::new()
        };

        let mut refs: Vec<TagRef> = self
            .repo
            .tags_reachable_from_head()?
            .into_iter()
            .filter(|r| glob.as_ref().map_or(true, |g| g.matches_with(&r.name, options)))
            .collect();
        if refs.is_empty() {
            return Err(PolyversError::NoTagsFound(project.pname.clone()));
        }
        refs.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.name.cmp(&b.name)));

        let head_short = match self.repo.head_oid()? {
            Some(oid) => Some(self.repo.short_id(oid)?),
            None => None,
        };

        Ok(PvTags {
            refs: refs.into_iter(),
            pattern: &project.tag_pattern,
            head_short,
        })
    }

    /// The nearest tag of `project` as `git describe` reports it.
    pub fn describe(&self, project: &ProjectSpec) -> Result<Option<PvTag>> {
        let raw = self.repo.describe_head(&project.tag_pattern.glob())?;
        Ok(raw.and_then(|r| project.tag_pattern.parse(&r)))
    }
}

/// Lazy sequence of a project's tags as `(tag name, parsed tag)`;
/// see [TagHistoryReader::list_tags]
pub struct PvTags<'p> {
    refs: std::vec::IntoIter<TagRef>,
    pattern: &'p TagPattern,
    head_short: Option<String>,
}

impl Iterator for PvTags<'_> {
    type Item = (String, PvTag);

    fn next(&mut self) -> Option<(String, PvTag)> {
        for tag_ref in self.refs.by_ref() {
            match self.pattern.parse(&tag_ref.name) {
                Some(mut pvtag) => {
                    if tag_ref.distance > 0 {
                        if let Some(hash) = &self.head_short {
                            pvtag.descid = Some(DescId::new(tag_ref.distance, hash.clone()));
                        }
                    }
                    return Some((tag_ref.name, pvtag));
                }
                None => trace!(tag = %tag_ref.name, pname = self.pattern.pname(), "skipping tag"),
            }
        }
        None
    }
}
