use crate::domain::{template, Registry};
use crate::engine::plan::{BumpPlan, PlannedBump};
use crate::error::{PolyversError, Result};
use crate::git::Repository;
use git2::Oid;
use std::path::PathBuf;
use tracing::{info, warn};

/// What [TagWriter::commit_and_tag] wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// The bump commit; `None` when nothing was engraved
    pub commit: Option<Oid>,
    /// Created tags, in plan order
    pub tags: Vec<String>,
}

/// Creates the bump commit and the annotated tags of a validated plan
pub struct TagWriter<'a, R: Repository> {
    repo: &'a R,
    registry: &'a Registry,
}

impl<'a, R: Repository> TagWriter<'a, R> {
    pub fn new(repo: &'a R, registry: &'a Registry) -> Self {
        TagWriter { repo, registry }
    }

    /// One commit with the engraved files, then one annotated tag per project.
    ///
    /// A failing tag after the commit is reported as `PartialBump`; the
    /// commit is kept and the missing tags must be created by hand.
    pub fn commit_and_tag(&self, plan: &BumpPlan, engraved: &[PathBuf]) -> Result<WriteOutcome> {
        let commit = self.commit(plan, engraved)?;
        let tags = self.tag(plan, commit)?;
        Ok(WriteOutcome { commit, tags })
    }

    /// Commit the staged engraved files; skipped when there are none.
    pub fn commit(&self, plan: &BumpPlan, engraved: &[PathBuf]) -> Result<Option<Oid>> {
        if engraved.is_empty() {
            info!("nothing engraved, tagging HEAD");
            return Ok(None);
        }

        let message = self.commit_message(plan);
        let oid = self.repo.commit(&message)?;
        info!(commit = %oid, files = engraved.len(), "committed");
        Ok(Some(oid))
    }

    /// Tag `commit` (or HEAD when `None`) for every planned bump.
    pub fn tag(&self, plan: &BumpPlan, commit: Option<Oid>) -> Result<Vec<String>> {
        let target = match commit {
            Some(oid) => oid,
            None => self
                .repo
                .head_oid()?
                .ok_or_else(|| PolyversError::unavailable("cannot tag an unborn HEAD"))?,
        };

        let mut created = Vec::new();
        for (i, entry) in plan.entries().iter().enumerate() {
            let message = self.tag_message(entry);
            if let Err(e) = self.repo.create_annotated_tag(&entry.tag_name, target, &message) {
                if commit.is_none() && created.is_empty() {
                    return Err(e);
                }
                let missing: Vec<String> = plan.entries()[i..]
                    .iter()
                    .map(|e| e.tag_name.clone())
                    .collect();
                warn!(tag = %entry.tag_name, error = %e, "tag creation failed");
                return Err(PolyversError::PartialBump {
                    commit: self
                        .repo
                        .short_id(target)
                        .unwrap_or_else(|_| target.to_string()),
                    created,
                    missing,
                    reason: e.to_string(),
                });
            }
            info!(tag = %entry.tag_name, "tagged");
            created.push(entry.tag_name.clone());
        }
        Ok(created)
    }

    fn tag_message(&self, entry: &PlannedBump) -> String {
        let current = entry
            .old
            .as_ref()
            .map_or_else(|| "unreleased".to_string(), |v| v.to_string());
        template::render(
            self.registry.tag_message(),
            &[
                ("pname", &entry.pname),
                ("current_version", &current),
                ("new_version", &entry.new.to_string()),
            ],
        )
    }

    fn commit_message(&self, plan: &BumpPlan) -> String {
        let pnames: Vec<&str> = plan.entries().iter().map(|e| e.pname.as_str()).collect();
        let first = plan.entries().first();
        let current = first
            .and_then(|e| e.old.as_ref())
            .map_or_else(|| "unreleased".to_string(), |v| v.to_string());
        let new = first.map(|e| e.new.to_string()).unwrap_or_default();
        template::render(
            self.registry.commit_message(),
            &[
                ("pname", &pnames.join(", ")),
                ("current_version", &current),
                ("new_version", &new),
                ("summary", &plan.summary()),
            ],
        )
    }
}
