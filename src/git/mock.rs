use crate::error::{PolyversError, Result};
use crate::git::{Repository, TagRef};
use chrono::{DateTime, FixedOffset};
use git2::Oid;
use std::cell::RefCell;
use std::path::{Path, PathBuf};

/// An annotated tag recorded by [MockRepository]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockTag {
    pub name: String,
    pub target: Oid,
    pub message: String,
}

#[derive(Debug, Default)]
struct MockState {
    /// Linear history, oldest first; the last commit is HEAD
    commits: Vec<Oid>,
    commit_messages: Vec<String>,
    tags: Vec<MockTag>,
    staged: Vec<PathBuf>,
    dirty: Vec<PathBuf>,
    failing_tags: Vec<String>,
    fail_commit: bool,
    fail_short_id: bool,
    head_time: Option<DateTime<FixedOffset>>,
}

/// In-memory repository with a linear history, for testing without git
pub struct MockRepository {
    workdir: PathBuf,
    state: RefCell<MockState>,
}

impl MockRepository {
    /// Create a new empty mock repository rooted at `workdir`
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        MockRepository {
            workdir: workdir.into(),
            state: RefCell::new(MockState::default()),
        }
    }

    /// Append a commit on top of HEAD
    pub fn add_commit(&self) -> Oid {
        let mut state = self.state.borrow_mut();
        let oid = fake_oid(state.commits.len() as u32 + 1);
        state.commits.push(oid);
        state.commit_messages.push(String::new());
        oid
    }

    /// Add a tag pointing to an OID
    pub fn add_tag(&self, name: impl Into<String>, target: Oid) {
        self.state.borrow_mut().tags.push(MockTag {
            name: name.into(),
            target,
            message: String::new(),
        });
    }

    /// Mark a tracked file (relative to the working tree) as modified
    pub fn set_dirty(&self, path: impl Into<PathBuf>) {
        self.state.borrow_mut().dirty.push(path.into());
    }

    /// Make every short id lookup fail
    pub fn fail_short_id(&self) {
        self.state.borrow_mut().fail_short_id = true;
    }

    /// Committer time reported for HEAD
    pub fn set_head_time(&self, time: DateTime<FixedOffset>) {
        self.state.borrow_mut().head_time = Some(time);
    }

    /// Make creating the tag `name` fail
    pub fn fail_tag(&self, name: impl Into<String>) {
        self.state.borrow_mut().failing_tags.push(name.into());
    }

    /// Make the next commit fail
    pub fn fail_commit(&self) {
        self.state.borrow_mut().fail_commit = true;
    }

    pub fn tags(&self) -> Vec<MockTag> {
        self.state.borrow().tags.clone()
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.state.borrow().tags.iter().map(|t| t.name.clone()).collect()
    }

    pub fn staged(&self) -> Vec<PathBuf> {
        self.state.borrow().staged.clone()
    }

    /// Messages of commits created through [Repository::commit]
    pub fn commit_messages(&self) -> Vec<String> {
        self.state
            .borrow()
            .commit_messages
            .iter()
            .filter(|m| !m.is_empty())
            .cloned()
            .collect()
    }

    fn distance_from_head(state: &MockState, target: Oid) -> Option<u32> {
        let position = state.commits.iter().position(|c| *c == target)?;
        Some((state.commits.len() - 1 - position) as u32)
    }
}

fn fake_oid(n: u32) -> Oid {
    let mut bytes = [0_u8; 20];
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = (n as usize * 131 + i * 17) as u8;
    }
    Oid::from_bytes(&bytes).unwrap_or_else(|_| Oid::zero())
}

fn injected(what: &str) -> PolyversError {
    PolyversError::Git(git2::Error::from_str(&format!("injected failure: {}", what)))
}

impl Repository for MockRepository {
    fn workdir(&self) -> Result<PathBuf> {
        Ok(self.workdir.clone())
    }

    fn head_oid(&self) -> Result<Option<Oid>> {
        Ok(self.state.borrow().commits.last().copied())
    }

    fn tags_reachable_from_head(&self) -> Result<Vec<TagRef>> {
        let state = self.state.borrow();
        Ok(state
            .tags
            .iter()
            .filter_map(|t| {
                Self::distance_from_head(&state, t.target).map(|distance| TagRef {
                    name: t.name.clone(),
                    target: t.target,
                    distance,
                })
            })
            .collect())
    }

    fn describe_head(&self, pattern: &str) -> Result<Option<String>> {
        let glob = glob::Pattern::new(pattern)
            .map_err(|e| PolyversError::config(format!("invalid pattern '{}': {}", pattern, e)))?;
        let Some(head) = self.head_oid()? else {
            return Ok(None);
        };

        let nearest = self
            .tags_reachable_from_head()?
            .into_iter()
            .filter(|t| glob.matches(&t.name))
            .min_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.name.cmp(&b.name)));

        Ok(match nearest {
            Some(tag) if tag.distance == 0 => Some(tag.name),
            Some(tag) => Some(format!(
                "{}-{}-g{}",
                tag.name,
                tag.distance,
                self.short_id(head)?
            )),
            None => None,
        })
    }

    fn head_commit_time(&self) -> Result<Option<DateTime<FixedOffset>>> {
        let state = self.state.borrow();
        if state.commits.is_empty() {
            return Ok(None);
        }
        // One minute per commit from 2020-09-13 unless set explicitly.
        Ok(state.head_time.or_else(|| {
            DateTime::from_timestamp(1_600_000_000 + 60 * state.commits.len() as i64, 0)
                .map(|t| t.fixed_offset())
        }))
    }

    fn count_commits(&self) -> Result<u32> {
        Ok(self.state.borrow().commits.len() as u32)
    }

    fn short_id(&self, oid: Oid) -> Result<String> {
        if self.state.borrow().fail_short_id {
            return Err(injected("short id"));
        }
        Ok(oid.to_string()[..7].to_string())
    }

    fn is_dirty(&self, pathspec: Option<&Path>) -> Result<bool> {
        let state = self.state.borrow();
        Ok(match pathspec.filter(|p| *p != Path::new(".")) {
            Some(base) => state.dirty.iter().any(|p| p.starts_with(base)),
            None => !state.dirty.is_empty(),
        })
    }

    fn find_tag_oid(&self, tag_name: &str) -> Result<Option<Oid>> {
        Ok(self
            .state
            .borrow()
            .tags
            .iter()
            .find(|t| t.name == tag_name)
            .map(|t| t.target))
    }

    fn stage(&self, paths: &[PathBuf]) -> Result<()> {
        self.state.borrow_mut().staged.extend(paths.iter().cloned());
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<Oid> {
        if std::mem::take(&mut self.state.borrow_mut().fail_commit) {
            return Err(injected("commit"));
        }
        let oid = self.add_commit();
        let mut state = self.state.borrow_mut();
        if let Some(last) = state.commit_messages.last_mut() {
            *last = message.to_string();
        }
        state.staged.clear();
        Ok(oid)
    }

    fn create_annotated_tag(&self, name: &str, target: Oid, message: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.failing_tags.iter().any(|t| t == name) {
            return Err(injected(&format!("tag {}", name)));
        }
        if state.tags.iter().any(|t| t.name == name) {
            return Err(PolyversError::DuplicateTag(name.to_string()));
        }
        if !state.commits.contains(&target) {
            return Err(injected(&format!("unknown commit {}", target)));
        }
        state.tags.push(MockTag {
            name: name.to_string(),
            target,
            message: message.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_repository_history() {
        let repo = MockRepository::new("/repo");
        assert_eq!(repo.head_oid().unwrap(), None);

        let first = repo.add_commit();
        let second = repo.add_commit();
        assert_ne!(first, second);
        assert_eq!(repo.head_oid().unwrap(), Some(second));
        assert_eq!(repo.count_commits().unwrap(), 2);
    }

    #[test]
    fn test_mock_repository_tags_with_distance() {
        let repo = MockRepository::new("/repo");
        let first = repo.add_commit();
        repo.add_tag("a-v1.0.0", first);
        repo.add_commit();
        repo.add_commit();

        let tags = repo.tags_reachable_from_head().unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].distance, 2);
        assert_eq!(repo.find_tag_oid("a-v1.0.0").unwrap(), Some(first));
        assert_eq!(repo.find_tag_oid("a-v2.0.0").unwrap(), None);
    }

    #[test]
    fn test_mock_repository_describe() {
        let repo = MockRepository::new("/repo");
        let first = repo.add_commit();
        repo.add_tag("a-v1.0.0", first);
        assert_eq!(repo.describe_head("a-v*").unwrap().as_deref(), Some("a-v1.0.0"));

        let head = repo.add_commit();
        let expected = format!("a-v1.0.0-1-g{}", repo.short_id(head).unwrap());
        assert_eq!(repo.describe_head("a-v*").unwrap(), Some(expected));
        assert_eq!(repo.describe_head("b-v*").unwrap(), None);
    }

    #[test]
    fn test_mock_repository_commit_and_tag() {
        let repo = MockRepository::new("/repo");
        repo.add_commit();
        repo.stage(&[PathBuf::from("a/__init__.py")]).unwrap();
        assert_eq!(repo.staged().len(), 1);

        let oid = repo.commit("bump").unwrap();
        assert!(repo.staged().is_empty());
        assert_eq!(repo.commit_messages(), vec!["bump".to_string()]);

        repo.create_annotated_tag("a-v1.0.1", oid, "msg").unwrap();
        assert!(repo.create_annotated_tag("a-v1.0.1", oid, "msg").is_err());
    }

    #[test]
    fn test_mock_repository_injected_failures() {
        let repo = MockRepository::new("/repo");
        let oid = repo.add_commit();
        repo.fail_tag("b-v1.0.0");
        assert!(repo.create_annotated_tag("b-v1.0.0", oid, "").is_err());

        repo.fail_commit();
        assert!(repo.commit("x").is_err());
        assert!(repo.commit("y").is_ok());
    }

    #[test]
    fn test_mock_repository_dirty() {
        let repo = MockRepository::new("/repo");
        assert!(!repo.is_dirty(None).unwrap());
        repo.set_dirty("a/setup.py");
        assert!(repo.is_dirty(None).unwrap());
        assert!(repo.is_dirty(Some(Path::new("a"))).unwrap());
        assert!(!repo.is_dirty(Some(Path::new("b"))).unwrap());
    }
}
