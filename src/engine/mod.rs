//! Bump planning and the write side: engraving files, committing, tagging

pub mod engrave;
pub mod plan;
pub mod tag_writer;

pub use engrave::{engrave_text, Engraver, FileEdit};
pub use plan::{BumpEngine, BumpPlan, BumpRequest, PlannedBump};
pub use tag_writer::{TagWriter, WriteOutcome};
