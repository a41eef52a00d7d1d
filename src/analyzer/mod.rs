//! Read-only analysis of the repository: tag history and current versions

pub mod history;
pub mod resolver;

pub use history::{PvTags, TagHistoryReader};
pub use resolver::{ResolvedState, VersionResolver};
