//! Writing bumped versions into project files
//!
//! [engrave_text] is the pure substitution; [Engraver] finds the files,
//! computes every edit in memory first, and only then writes and stages.

use crate::domain::{EngraveSpec, Registry, Version};
use crate::engine::plan::{BumpPlan, PlannedBump};
use crate::error::{PolyversError, Result};
use crate::git::Repository;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Replace every match of `marker` in `contents` with `new_version`.
///
/// When the marker has a `version` group only that span is replaced,
/// otherwise the whole match. Empty matches are ignored.
/// Returns the new contents and the number of replacements.
pub fn engrave_text(contents: &str, marker: &Regex, new_version: &str) -> (String, usize) {
    let mut out = String::with_capacity(contents.len());
    let mut last = 0;
    let mut count = 0;

    for caps in marker.captures_iter(contents) {
        let Some(whole) = caps.get(0).filter(|m| !m.as_str().is_empty()) else {
            continue;
        };
        let span = caps.name("version").unwrap_or(whole);
        out.push_str(&contents[last..span.start()]);
        out.push_str(new_version);
        last = span.end();
        count += 1;
    }
    out.push_str(&contents[last..]);
    (out, count)
}

/// A pending rewrite of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEdit {
    /// Absolute path of the file
    pub path: PathBuf,
    pub original: String,
    pub updated: String,
    pub replacements: usize,
}

/// Engraves bumped versions into the files of a working tree
pub struct Engraver {
    workdir: PathBuf,
}

impl Engraver {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Engraver {
            workdir: workdir.into(),
        }
    }

    /// Compute all file edits for `plan` without writing anything.
    ///
    /// # Errors
    /// * `EngraveTargetMissing` - a required glob matched no file, or a
    ///   required marker matched nothing in a file
    pub fn prepare(&self, plan: &BumpPlan, registry: &Registry) -> Result<Vec<FileEdit>> {
        let mut edits: BTreeMap<PathBuf, FileEdit> = BTreeMap::new();

        for entry in plan.entries() {
            let project = registry
                .get(&entry.pname)
                .ok_or_else(|| PolyversError::UnknownProject(entry.pname.clone()))?;
            let base = self.workdir.join(&project.basepath);

            for spec in &project.engraves {
                self.prepare_spec(&mut edits, &base, spec, entry)?;
            }
        }

        Ok(edits
            .into_values()
            .filter(|e| e.updated != e.original)
            .collect())
    }

    fn prepare_spec(
        &self,
        edits: &mut BTreeMap<PathBuf, FileEdit>,
        base: &Path,
        spec: &EngraveSpec,
        entry: &PlannedBump,
    ) -> Result<()> {
        let current = entry
            .old
            .clone()
            .unwrap_or_else(Version::zero)
            .to_string();
        let markers = spec.marker_regexes(&entry.pname, &current)?;
        let new_version = entry.new.to_string();

        for file in expand_globs(base, &spec.globs, spec.required)? {
            let edit = match edits.entry(file.clone()) {
                std::collections::btree_map::Entry::Occupied(e) => e.into_mut(),
                std::collections::btree_map::Entry::Vacant(e) => {
                    let original = fs::read_to_string(&file)?;
                    e.insert(FileEdit {
                        path: file.clone(),
                        updated: original.clone(),
                        original,
                        replacements: 0,
                    })
                }
            };

            for (marker, regex) in spec.markers.iter().zip(&markers) {
                let (updated, count) = engrave_text(&edit.updated, regex, &new_version);
                if count == 0 {
                    if spec.required {
                        return Err(PolyversError::EngraveTargetMissing {
                            file: file.clone(),
                            marker: marker.clone(),
                        });
                    }
                    debug!(file = %file.display(), marker = %marker, "optional marker not found");
                    continue;
                }
                debug!(file = %file.display(), count, version = %new_version, "engraved");
                edit.updated = updated;
                edit.replacements += count;
            }
        }
        Ok(())
    }

    /// Write the edits and stage them.
    ///
    /// On failure every file already written is restored.
    /// Returns the staged paths, relative to the working tree.
    pub fn apply<R: Repository>(&self, edits: &[FileEdit], repo: &R) -> Result<Vec<PathBuf>> {
        for (i, edit) in edits.iter().enumerate() {
            if let Err(e) = fs::write(&edit.path, &edit.updated) {
                restore_files(&edits[..i]);
                return Err(e.into());
            }
        }

        let paths = self.relative_paths(edits);
        if let Err(e) = repo.stage(&paths) {
            self.restore(edits, repo);
            return Err(e);
        }
        info!(files = paths.len(), "engraved");
        Ok(paths)
    }

    /// Compute, write and stage the edits for `plan`.
    pub fn engrave<R: Repository>(
        &self,
        plan: &BumpPlan,
        registry: &Registry,
        repo: &R,
    ) -> Result<Vec<PathBuf>> {
        let edits = self.prepare(plan, registry)?;
        self.apply(&edits, repo)
    }

    /// Put back the original contents of engraved files and re-stage them.
    ///
    /// Best effort: failures are only logged.
    pub fn restore<R: Repository>(&self, edits: &[FileEdit], repo: &R) {
        restore_files(edits);
        if let Err(e) = repo.stage(&self.relative_paths(edits)) {
            warn!(error = %e, "could not re-stage restored files");
        }
    }

    /// Paths of `edits` relative to the working tree
    pub fn relative_paths(&self, edits: &[FileEdit]) -> Vec<PathBuf> {
        edits
            .iter()
            .map(|e| {
                e.path
                    .strip_prefix(&self.workdir)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| e.path.clone())
            })
            .collect()
    }
}

fn restore_files(edits: &[FileEdit]) {
    for edit in edits {
        if let Err(e) = fs::write(&edit.path, &edit.original) {
            warn!(file = %edit.path.display(), error = %e, "could not restore file");
        }
    }
}

fn expand_globs(base: &Path, globs: &[String], required: bool) -> Result<Vec<PathBuf>> {
    let escaped_base = PathBuf::from(glob::Pattern::escape(&base.to_string_lossy()));
    let mut files = Vec::new();
    for pattern in globs {
        let full = base.join(pattern);
        let matches = glob::glob(&escaped_base.join(pattern).to_string_lossy()).map_err(|e| {
            PolyversError::config(format!("invalid engrave glob '{}': {}", pattern, e))
        })?;

        let mut found = false;
        for path in matches {
            let path = path.map_err(|e| PolyversError::Io(e.into_error()))?;
            if path.is_file() {
                found = true;
                files.push(path);
            }
        }
        if !found && required {
            return Err(PolyversError::EngraveTargetMissing {
                file: full,
                marker: "(no file matches)".to_string(),
            });
        }
    }
    Ok(files)
}
