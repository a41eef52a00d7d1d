//! Main workflow orchestration logic
//!
//! This module wires the analysis and engine layers into the `status` and
//! `bump` workflows. It is kept apart from main.rs so the workflows can be
//! driven programmatically (and tested) without clap or a terminal.

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::analyzer::{ResolvedState, VersionResolver};
use crate::boundary::BoundaryWarning;
use crate::domain::{BumpScope, Registry, Version, VersionBump};
use crate::engine::{BumpEngine, BumpPlan, BumpRequest, Engraver, TagWriter};
use crate::error::PolyversError;
use crate::git::Repository;

/// Arguments for the status workflow
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusArgs {
    /// Projects to show; empty means all
    pub projects: Vec<String>,

    /// Also show the describe-style version
    pub describe: bool,
}

/// One row of the status report
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEntry {
    pub state: ResolvedState,
    /// Describe-style version, when requested and a tag exists
    pub described: Option<Version>,
}

/// Arguments for the bump workflow
///
/// Mirrors the CLI Args but in a format suitable for orchestration logic.
/// This decoupling allows the workflow to be called programmatically
/// without depending on clap.
#[derive(Debug, Clone, PartialEq)]
pub struct BumpWorkflowArgs {
    pub kind: VersionBump,

    /// Explicitly named projects
    pub projects: Vec<String>,

    /// Bump every configured project
    pub all: bool,

    /// Compute and validate everything, write nothing
    pub dry_run: bool,

    /// Skip the confirmation prompt
    pub yes: bool,
}

impl BumpWorkflowArgs {
    /// Targeted projects; a lone configured project needs no naming.
    pub fn scope(&self, registry: &Registry) -> Result<BumpScope> {
        if self.all {
            return Ok(BumpScope::All);
        }
        if !self.projects.is_empty() {
            return Ok(BumpScope::Projects(self.projects.clone()));
        }
        match registry.projects() {
            [only] => Ok(BumpScope::Projects(vec![only.pname.clone()])),
            _ => Err(PolyversError::config("name the projects to bump, or pass --all").into()),
        }
    }
}

/// Result of the bump workflow
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowResult {
    /// The validated plan
    pub plan: BumpPlan,

    /// Warnings collected while resolving the targeted projects
    pub warnings: Vec<BoundaryWarning>,

    /// Files engraved (or that would be), relative to the working tree
    pub files: Vec<PathBuf>,

    /// Abbreviated id of the bump commit, if one was made
    pub commit: Option<String>,

    /// Tags created
    pub tags: Vec<String>,

    /// False for dry runs and declined confirmations
    pub applied: bool,
}

/// Status workflow: resolve the current state of projects (read-only).
pub fn run_status<R: Repository>(
    repo: &R,
    registry: &Registry,
    args: &StatusArgs,
) -> Result<Vec<StatusEntry>> {
    let projects = registry.select(&BumpScope::Projects(args.projects.clone()))?;
    let resolver = VersionResolver::new(repo);

    projects
        .into_iter()
        .map(|project| {
            let state = resolver.resolve(project)?;
            let described = if args.describe {
                resolver.describe(project)?
            } else {
                None
            };
            Ok(StatusEntry { state, described })
        })
        .collect()
}

/// Bump workflow
///
/// Orchestrates the entire bump:
/// 1. Resolve the current state of every targeted project
/// 2. Compute and validate the plan (versions, scheme, tag names)
/// 3. Compute the engraving in memory
/// 4. Ask `confirm` (unless `yes` or `dry_run`)
/// 5. Write and stage the engraved files
/// 6. Commit, then tag each project
///
/// Nothing is written before step 5, so any failure up to there leaves the
/// repository untouched. A failing commit restores the engraved files.
///
/// # Arguments
///
/// * `repo` - Repository to read and write
/// * `registry` - Validated project configuration
/// * `args` - Workflow arguments (kind, projects, all, dry_run, yes)
/// * `confirm` - Called with the preview before writing; `false` cancels
pub fn run_bump_workflow<R, F>(
    repo: &R,
    registry: &Registry,
    args: &BumpWorkflowArgs,
    confirm: F,
) -> Result<WorkflowResult>
where
    R: Repository,
    F: FnOnce(&WorkflowResult) -> Result<bool>,
{
    let request = BumpRequest {
        kind: args.kind.clone(),
        scope: args.scope(registry)?,
    };
    let targets = registry.select(&request.scope)?;

    let resolver = VersionResolver::new(repo);
    let states = resolver.resolve_all(targets.iter().copied())?;
    let mut warnings = Vec::new();
    for (project, state) in targets.iter().zip(&states) {
        warnings.extend(BoundaryWarning::for_state(state));
        warnings.extend(BoundaryWarning::for_project(project, state.is_dirty));
    }

    let engine = BumpEngine::new(registry);
    let plan = engine.plan(&request, &states)?;
    engine.check_tags_free(&plan, repo)?;

    let engraver = Engraver::new(repo.workdir()?);
    let edits = engraver.prepare(&plan, registry)?;

    let mut result = WorkflowResult {
        files: engraver.relative_paths(&edits),
        plan,
        warnings,
        commit: None,
        tags: Vec::new(),
        applied: false,
    };

    if args.dry_run {
        info!(summary = %result.plan.summary(), "dry run, nothing written");
        return Ok(result);
    }
    if !args.yes && !confirm(&result)? {
        info!("bump cancelled");
        return Ok(result);
    }

    let staged = engraver.apply(&edits, repo)?;
    let writer = TagWriter::new(repo, registry);
    let commit = match writer.commit(&result.plan, &staged) {
        Ok(commit) => commit,
        Err(e) => {
            engraver.restore(&edits, repo);
            return Err(e.into());
        }
    };

    result.tags = writer.tag(&result.plan, commit)?;
    result.commit = commit.map(|oid| repo.short_id(oid)).transpose()?;
    result.applied = true;
    Ok(result)
}
