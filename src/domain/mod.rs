//! Domain logic - pure business rules independent of git operations

pub mod prerelease;
pub mod project;
pub mod tag;
pub mod template;
pub mod version;

pub use prerelease::{PreRelease, PreReleaseType};
pub use project::{BumpScope, EngraveSpec, ProjectSpec, Registry, VersionScheme};
pub use tag::{DescId, PvTag, TagPattern};
pub use version::{Version, VersionBump};
