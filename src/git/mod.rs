//! Git operations abstraction layer
//!
//! This module provides a trait-based abstraction over the repository
//! capabilities polyvers needs: reading tags reachable from HEAD, describing
//! HEAD, staging files, committing and creating annotated tags.
//!
//! # Overview
//!
//! The primary abstraction is the [Repository] trait. The concrete
//! implementations include:
//!
//! - [repository::Git2Repository]: A real implementation using the `git2` crate
//! - [mock::MockRepository]: An in-memory implementation for testing
//!
//! # Usage
//!
//! Most code should depend on the [Repository] trait rather than concrete
//! implementations so that any backend offering these capabilities can be
//! substituted.
//!
//! ```rust
//! # use polyvers::git::Repository;
//! # fn example<R: Repository>(repo: &R) -> polyvers::Result<()> {
//! for tag in repo.tags_reachable_from_head()? {
//!     println!("{} is {} commits behind HEAD", tag.name, tag.distance);
//! }
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::error::Result;
use chrono::{DateTime, FixedOffset};
use git2::Oid;
use std::path::{Path, PathBuf};

/// A tag whose commit is an ancestor of (or is) HEAD
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    /// Tag name without the `refs/tags/` prefix
    pub name: String,
    /// The tagged commit (annotated tags peeled)
    pub target: Oid,
    /// Commits from the tagged commit to HEAD
    pub distance: u32,
}

/// Repository capabilities used by polyvers
///
/// ## Error Handling
///
/// All methods return [crate::error::Result<T>]. Implementations map
/// underlying errors (like `git2::Error`) to [crate::error::PolyversError]
/// variants; a missing repository is
/// [RepositoryUnavailable](crate::error::PolyversError::RepositoryUnavailable).
///
/// ## Mutation
///
/// Writes take `&self`, as `git2::Repository` does. Callers only mutate
/// after a bump plan has been fully validated.
pub trait Repository {
    /// Root of the working tree
    fn workdir(&self) -> Result<PathBuf>;

    /// The commit HEAD points to
    ///
    /// # Returns
    /// * `Ok(Some(Oid))` - HEAD commit
    /// * `Ok(None)` - If HEAD is unborn (no commits yet)
    fn head_oid(&self) -> Result<Option<Oid>>;

    /// All tags pointing at HEAD or one of its ancestors
    ///
    /// Tags on unrelated branches are excluded. The order is unspecified.
    ///
    /// # Example
    /// ```rust
    /// # use polyvers::git::Repository;
    /// # fn example<R: Repository>(repo: &R) -> polyvers::Result<()> {
    /// let on_head: Vec<_> = repo
    ///     .tags_reachable_from_head()?
    ///     .into_iter()
    ///     .filter(|t| t.distance == 0)
    ///     .collect();
    /// # Ok(())
    /// # }
    /// ```
    fn tags_reachable_from_head(&self) -> Result<Vec<TagRef>>;

    /// Describe HEAD using the nearest tag matching the glob `pattern`
    ///
    /// # Returns
    /// * `Ok(Some(String))` - `name` when HEAD is tagged, `name-N-gHASH` otherwise
    /// * `Ok(None)` - If no matching tag is reachable
    fn describe_head(&self, pattern: &str) -> Result<Option<String>>;

    /// Committer time of HEAD in the offset it was recorded with
    ///
    /// # Returns
    /// * `Ok(None)` - If HEAD is unborn
    fn head_commit_time(&self) -> Result<Option<DateTime<FixedOffset>>>;

    /// Number of commits reachable from HEAD (0 when unborn)
    fn count_commits(&self) -> Result<u32>;

    /// Abbreviated hash of a commit
    fn short_id(&self, oid: Oid) -> Result<String>;

    /// Whether tracked files have uncommitted changes
    ///
    /// Untracked files are ignored. With `pathspec`, only changes below that
    /// path (relative to the working tree root) count.
    fn is_dirty(&self, pathspec: Option<&Path>) -> Result<bool>;

    /// Find a tag by name and get the commit it points to
    ///
    /// Handles both lightweight and annotated tags.
    ///
    /// # Example
    /// ```rust
    /// # use polyvers::git::Repository;
    /// # fn example<R: Repository>(repo: &R) -> polyvers::Result<()> {
    /// match repo.find_tag_oid("polyvers-v1.0.0")? {
    ///     Some(oid) => println!("Tag exists at: {}", oid),
    ///     None => println!("Tag does not exist"),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn find_tag_oid(&self, tag_name: &str) -> Result<Option<Oid>>;

    /// Add files (relative to the working tree root) to the index
    fn stage(&self, paths: &[PathBuf]) -> Result<()>;

    /// Commit the index on top of HEAD
    fn commit(&self, message: &str) -> Result<Oid>;

    /// Create an annotated tag at `target`
    ///
    /// # Returns
    /// * `Err` - If the tag already exists or `target` is unknown
    fn create_annotated_tag(&self, name: &str, target: Oid, message: &str) -> Result<()>;
}
