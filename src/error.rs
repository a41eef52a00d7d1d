use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for polyvers operations
#[derive(Error, Debug)]
pub enum PolyversError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("Unknown project '{0}'")]
    UnknownProject(String),

    #[error("Repository unavailable: {0}")]
    RepositoryUnavailable(String),

    #[error("No tags found for project '{0}'")]
    NoTagsFound(String),

    #[error("Version parsing error: {0}")]
    Version(String),

    #[error("Project '{pname}': new version {new} is not greater than current {current}")]
    VersionNotMonotonic {
        pname: String,
        current: String,
        new: String,
    },

    #[error("Version skew between projects sharing one version: {0}")]
    VersionSkew(String),

    #[error("Tag '{0}' already exists or is produced twice")]
    DuplicateTag(String),

    #[error("Engrave target missing: no match for marker '{marker}' in {}", file.display())]
    EngraveTargetMissing { file: PathBuf, marker: String },

    #[error(
        "Partial bump: commit {commit} created, tags created [{}], tags missing [{}]: {reason}",
        created.join(", "),
        missing.join(", ")
    )]
    PartialBump {
        commit: String,
        created: Vec<String>,
        missing: Vec<String>,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in polyvers
pub type Result<T> = std::result::Result<T, PolyversError>;

impl PolyversError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        PolyversError::Config(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        PolyversError::Version(msg.into())
    }

    /// Create a template error for `template`
    pub fn template(template: impl Into<String>, reason: impl Into<String>) -> Self {
        PolyversError::InvalidTemplate {
            template: template.into(),
            reason: reason.into(),
        }
    }

    /// Create a repository-unavailable error with context
    pub fn unavailable(msg: impl Into<String>) -> Self {
        PolyversError::RepositoryUnavailable(msg.into())
    }

    /// Only an empty tag history can be worked around (as "unreleased").
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PolyversError::NoTagsFound(_))
    }

    /// Process exit code for this error category.
    ///
    /// * `1` - repository, read and I/O failures
    /// * `2` - configuration errors, detected before touching the repository
    /// * `3` - plan validation failures; nothing was written
    /// * `4` - partial write; the commit exists but some tags are missing
    pub fn exit_code(&self) -> i32 {
        match self {
            PolyversError::Config(_)
            | PolyversError::InvalidTemplate { .. }
            | PolyversError::UnknownProject(_) => 2,
            PolyversError::Version(_)
            | PolyversError::VersionNotMonotonic { .. }
            | PolyversError::VersionSkew(_)
            | PolyversError::DuplicateTag(_)
            | PolyversError::EngraveTargetMissing { .. } => 3,
            PolyversError::PartialBump { .. } => 4,
            PolyversError::Git(_)
            | PolyversError::RepositoryUnavailable(_)
            | PolyversError::NoTagsFound(_)
            | PolyversError::Io(_) => 1,
        }
    }
}
