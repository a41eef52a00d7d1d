use crate::error::{PolyversError, Result};
use crate::git::TagRef;
use chrono::{DateTime, FixedOffset};
use git2::{
    DescribeFormatOptions, DescribeOptions, ErrorClass, ErrorCode, Oid, Repository as Git2Repo,
};
use std::path::{Path, PathBuf};

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let repo = Git2Repo::discover(path).map_err(|e| {
            PolyversError::unavailable(format!(
                "{} is not inside a git repository: {}",
                path.display(),
                e.message()
            ))
        })?;

        Ok(Git2Repository { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo }
    }
}

impl super::Repository for Git2Repository {
    fn workdir(&self) -> Result<PathBuf> {
        self.repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| PolyversError::unavailable("bare repository has no working tree"))
    }

    fn head_oid(&self) -> Result<Option<Oid>> {
        match self.repo.head() {
            Ok(head) => Ok(head.target()),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn tags_reachable_from_head(&self) -> Result<Vec<TagRef>> {
        let Some(head) = self.head_oid()? else {
            return Ok(Vec::new());
        };

        let mut refs = Vec::new();
        for name in self.repo.tag_names(None)?.iter().flatten() {
            let reference = self.repo.find_reference(&format!("refs/tags/{}", name))?;
            // Tags on trees or blobs carry no version history.
            let Ok(commit) = reference.peel_to_commit() else {
                continue;
            };
            let target = commit.id();

            let distance = if target == head {
                0
            } else if self.repo.graph_descendant_of(head, target)? {
                let (ahead, _) = self.repo.graph_ahead_behind(head, target)?;
                ahead as u32
            } else {
                continue;
            };

            refs.push(TagRef {
                name: name.to_string(),
                target,
                distance,
            });
        }
        Ok(refs)
    }

    fn describe_head(&self, pattern: &str) -> Result<Option<String>> {
        if self.head_oid()?.is_none() {
            return Ok(None);
        }

        let mut opts = DescribeOptions::new();
        opts.describe_tags().pattern(pattern);

        match self.repo.describe(&opts) {
            Ok(describe) => {
                let mut format = DescribeFormatOptions::new();
                format.abbreviated_size(7);
                Ok(Some(describe.format(Some(&format))?))
            }
            // libgit2 reports "no reference found" as a generic describe error.
            Err(e) if e.code() == ErrorCode::NotFound || e.class() == ErrorClass::Describe => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn head_commit_time(&self) -> Result<Option<DateTime<FixedOffset>>> {
        let Some(head) = self.head_oid()? else {
            return Ok(None);
        };

        let time = self.repo.find_commit(head)?.time();
        let offset = FixedOffset::east_opt(time.offset_minutes() * 60).ok_or_else(|| {
            PolyversError::Git(git2::Error::from_str(&format!(
                "invalid commit time offset: {} minutes",
                time.offset_minutes()
            )))
        })?;
        Ok(DateTime::from_timestamp(time.seconds(), 0).map(|t| t.with_timezone(&offset)))
    }

    fn count_commits(&self) -> Result<u32> {
        let Some(head) = self.head_oid()? else {
            return Ok(0);
        };

        let mut revwalk = self.repo.revwalk()?;
        revwalk.push(head)?;
        Ok(revwalk.count() as u32)
    }

    fn short_id(&self, oid: Oid) -> Result<String> {
        let buf = self.repo.find_object(oid, None)?.short_id()?;
        Ok(buf.as_str().unwrap_or_default().to_string())
    }

    fn is_dirty(&self, pathspec: Option<&Path>) -> Result<bool> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(false).include_ignored(false);
        if let Some(path) = pathspec.filter(|p| !p.as_os_str().is_empty() && *p != Path::new(".")) {
            opts.pathspec(path);
        }

        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(!statuses.is_empty())
    }

    fn find_tag_oid(&self, tag_name: &str) -> Result<Option<Oid>> {
        let reference_name = format!("refs/tags/{}", tag_name);

        match self.repo.find_reference(&reference_name) {
            Ok(reference) => Ok(Some(reference.peel_to_commit()?.id())),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn stage(&self, paths: &[PathBuf]) -> Result<()> {
        let mut index = self.repo.index()?;
        for path in paths {
            index.add_path(path)?;
        }
        index.write()?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<Oid> {
        let signature = self.repo.signature()?;
        let mut index = self.repo.index()?;
        let tree = self.repo.find_tree(index.write_tree()?)?;

        let parents = match self.head_oid()? {
            Some(oid) => vec![self.repo.find_commit(oid)?],
            None => Vec::new(),
        };
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

        let oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parent_refs,
        )?;
        Ok(oid)
    }

    fn create_annotated_tag(&self, name: &str, target: Oid, message: &str) -> Result<()> {
        let object = self.repo.find_object(target, None)?;
        let signature = self.repo.signature()?;

        self.repo
            .tag(name, &object, &signature, message, false)
            .map_err(|e| {
                if e.code() == ErrorCode::Exists {
                    PolyversError::DuplicateTag(name.to_string())
                } else {
                    e.into()
                }
            })?;

        Ok(())
    }
}
