pub mod analyzer;
pub mod boundary;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod git;
pub mod telemetry;
pub mod ui;

pub use error::{PolyversError, Result};
