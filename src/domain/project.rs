//! Validated per-project configuration and the registry of all projects

use crate::config::{Config, EngraveConfig, ProjectConfig, VersionSchemeKind};
use crate::domain::tag::{TagPattern, PVTAG_FORMAT, PVTAG_REGEX, VTAG_FORMAT, VTAG_REGEX};
use crate::domain::template;
use crate::error::{PolyversError, Result};
use regex::Regex;
use std::collections::HashSet;
use std::path::PathBuf;

const MARKER_FIELDS: &[&str] = &["pname", "current_version"];
const TAG_MESSAGE_FIELDS: &[&str] = &["pname", "current_version", "new_version"];
const COMMIT_MESSAGE_FIELDS: &[&str] = &["pname", "current_version", "new_version", "summary"];

/// Files of one project to engrave, and the markers to rewrite in them
#[derive(Debug, Clone)]
pub struct EngraveSpec {
    pub globs: Vec<String>,
    pub markers: Vec<String>,
    pub required: bool,
}

impl EngraveSpec {
    fn from_config(pname: &str, config: &EngraveConfig) -> Result<Self> {
        if config.globs.is_empty() {
            return Err(PolyversError::config(format!(
                "project '{}': engrave entry without globs",
                pname
            )));
        }
        for pattern in &config.globs {
            glob::Pattern::new(pattern).map_err(|e| {
                PolyversError::config(format!(
                    "project '{}': invalid engrave glob '{}': {}",
                    pname, pattern, e
                ))
            })?;
        }

        let spec = EngraveSpec {
            globs: config.globs.clone(),
            markers: config.markers.clone(),
            required: config.required,
        };
        for marker in &spec.markers {
            template::check_fields(marker, MARKER_FIELDS)?;
        }
        spec.marker_regexes(pname, "0.0.0")?;
        Ok(spec)
    }

    /// Compile the markers for `pname`, whose version is `current_version`.
    pub fn marker_regexes(&self, pname: &str, current_version: &str) -> Result<Vec<Regex>> {
        self.markers
            .iter()
            .map(|marker| {
                let source = template::render(
                    marker,
                    &[
                        ("pname", &regex::escape(pname)),
                        ("current_version", &regex::escape(current_version)),
                    ],
                );
                Regex::new(&source).map_err(|e| PolyversError::template(marker, e.to_string()))
            })
            .collect()
    }
}

/// A sub-project: its name, where it lives, how it is tagged and engraved
#[derive(Debug, Clone)]
pub struct ProjectSpec {
    pub pname: String,
    pub basepath: PathBuf,
    pub tag_pattern: TagPattern,
    pub engraves: Vec<EngraveSpec>,
}

impl ProjectSpec {
    fn from_config(config: &ProjectConfig, vprefix: &str, mono_project: bool) -> Result<Self> {
        validate_pname(&config.pname)?;

        let (default_format, default_regex) = if mono_project {
            (VTAG_FORMAT, VTAG_REGEX)
        } else {
            (PVTAG_FORMAT, PVTAG_REGEX)
        };
        let tag_pattern = TagPattern::new(
            &config.pname,
            vprefix,
            config.pvtag_format.as_deref().unwrap_or(default_format),
            config.pvtag_regex.as_deref().unwrap_or(default_regex),
        )?;

        let engraves = config
            .engraves
            .iter()
            .map(|e| EngraveSpec::from_config(&config.pname, e))
            .collect::<Result<Vec<_>>>()?;

        Ok(ProjectSpec {
            pname: config.pname.clone(),
            basepath: config.basepath.clone(),
            tag_pattern,
            engraves,
        })
    }
}

/// Checks a project name is a PEP-426 distribution name.
pub fn validate_pname(pname: &str) -> Result<()> {
    let bytes = pname.as_bytes();
    let edge_ok = |b: Option<&u8>| b.is_some_and(|b| b.is_ascii_alphanumeric());
    let inner_ok = bytes
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'));

    if edge_ok(bytes.first()) && edge_ok(bytes.last()) && inner_ok {
        Ok(())
    } else {
        Err(PolyversError::config(format!(
            "invalid project name '{}': expected letters, digits, '.', '_' or '-', \
             starting and ending with a letter or digit",
            pname
        )))
    }
}

/// Which projects move together
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionScheme {
    Independent,
    /// The listed projects always carry the identical version
    Shared { members: Vec<String> },
}

/// Which projects a bump targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BumpScope {
    Projects(Vec<String>),
    All,
}

/// All projects of the monorepo, in configuration order
#[derive(Debug, Clone)]
pub struct Registry {
    projects: Vec<ProjectSpec>,
    scheme: VersionScheme,
    tag_message: String,
    commit_message: String,
}

impl Registry {
    /// Validate the whole configuration; no repository access happens here.
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.projects.is_empty() {
            return Err(PolyversError::config(
                "no projects configured; add [[projects]] entries to polyvers.toml",
            ));
        }
        if config.mono_project && config.projects.len() > 1 {
            return Err(PolyversError::config(
                "mono_project tags cannot tell several projects apart",
            ));
        }

        let mut seen = HashSet::new();
        let mut projects = Vec::with_capacity(config.projects.len());
        for project in &config.projects {
            if !seen.insert(project.pname.to_lowercase()) {
                return Err(PolyversError::config(format!(
                    "project '{}' configured twice",
                    project.pname
                )));
            }
            projects.push(ProjectSpec::from_config(
                project,
                &config.tag_vprefix,
                config.mono_project,
            )?);
        }

        let scheme = match config.version_scheme {
            VersionSchemeKind::Independent => VersionScheme::Independent,
            VersionSchemeKind::Shared if config.shared_projects.is_empty() => {
                VersionScheme::Shared {
                    members: projects.iter().map(|p| p.pname.clone()).collect(),
                }
            }
            VersionSchemeKind::Shared => {
                for member in &config.shared_projects {
                    if !projects.iter().any(|p| &p.pname == member) {
                        return Err(PolyversError::config(format!(
                            "shared project '{}' is not configured",
                            member
                        )));
                    }
                }
                VersionScheme::Shared {
                    members: config.shared_projects.clone(),
                }
            }
        };

        template::check_fields(&config.tag_message, TAG_MESSAGE_FIELDS)?;
        template::check_fields(&config.commit_message, COMMIT_MESSAGE_FIELDS)?;

        Ok(Registry {
            projects,
            scheme,
            tag_message: config.tag_message.clone(),
            commit_message: config.commit_message.clone(),
        })
    }

    pub fn projects(&self) -> &[ProjectSpec] {
        &self.projects
    }

    pub fn get(&self, pname: &str) -> Option<&ProjectSpec> {
        self.projects.iter().find(|p| p.pname == pname)
    }

    pub fn scheme(&self) -> &VersionScheme {
        &self.scheme
    }

    pub fn tag_message(&self) -> &str {
        &self.tag_message
    }

    pub fn commit_message(&self) -> &str {
        &self.commit_message
    }

    /// Projects targeted by `scope`, in configuration order.
    ///
    /// An empty project list means every project.
    pub fn select(&self, scope: &BumpScope) -> Result<Vec<&ProjectSpec>> {
        match scope {
            BumpScope::All => Ok(self.projects.iter().collect()),
            BumpScope::Projects(names) if names.is_empty() => Ok(self.projects.iter().collect()),
            BumpScope::Projects(names) => {
                if let Some(unknown) = names.iter().find(|n| self.get(n).is_none()) {
                    return Err(PolyversError::UnknownProject(unknown.clone()));
                }
                Ok(self
                    .projects
                    .iter()
                    .filter(|p| names.contains(&p.pname))
                    .collect())
            }
        }
    }
}
