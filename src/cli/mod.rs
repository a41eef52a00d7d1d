//! Workflows behind the command-line interface

pub mod orchestration;

pub use orchestration::{
    run_bump_workflow, run_status, BumpWorkflowArgs, StatusArgs, StatusEntry, WorkflowResult,
};
