use crate::error::{PolyversError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file names looked up in the current directory, in order
pub const CONFIG_FILE_NAMES: &[&str] = &[".polyvers.toml", "polyvers.toml"];

/// Represents the complete configuration for polyvers.
///
/// Holds the sub-projects of the monorepo, how their versions relate to each
/// other, and the templates for tags and messages.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub version_scheme: VersionSchemeKind,

    /// Projects sharing one version when the scheme is shared; empty means all
    #[serde(default)]
    pub shared_projects: Vec<String>,

    /// Tag plain `v1.2.3` instead of `pname-v1.2.3` (single project only)
    #[serde(default)]
    pub mono_project: bool,

    #[serde(default = "default_tag_vprefix")]
    pub tag_vprefix: String,

    #[serde(default = "default_tag_message")]
    pub tag_message: String,

    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
}

/// Whether projects are versioned independently or in lock-step.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VersionSchemeKind {
    #[default]
    Independent,
    Shared,
}

/// One sub-project of the monorepo.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub pname: String,

    /// Directory of the project, relative to the repository root
    #[serde(default = "default_basepath")]
    pub basepath: PathBuf,

    #[serde(default)]
    pub pvtag_format: Option<String>,

    #[serde(default)]
    pub pvtag_regex: Option<String>,

    #[serde(default)]
    pub engraves: Vec<EngraveConfig>,
}

/// Files (relative to the project basepath) and the markers rewritten in them.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EngraveConfig {
    pub globs: Vec<String>,

    #[serde(default = "default_markers")]
    pub markers: Vec<String>,

    /// Fail the bump when a file or marker is not found
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_tag_vprefix() -> String {
    crate::domain::tag::DEFAULT_VPREFIX.to_string()
}

fn default_tag_message() -> String {
    "chore(ver): bump {pname} {current_version} → {new_version}".to_string()
}

fn default_commit_message() -> String {
    "chore(ver): bump {summary}".to_string()
}

fn default_basepath() -> PathBuf {
    PathBuf::from(".")
}

/// Matches `__version__ = "1.2.3"` and captures the version.
fn default_markers() -> Vec<String> {
    vec![r#"__version__\s*=\s*['"](?P<version>[^'"]+)['"]"#.to_string()]
}

fn default_required() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Config {
            version_scheme: VersionSchemeKind::default(),
            shared_projects: Vec::new(),
            mono_project: false,
            tag_vprefix: default_tag_vprefix(),
            tag_message: default_tag_message(),
            commit_message: default_commit_message(),
            projects: Vec::new(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| PolyversError::config(e.to_string()))
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `.polyvers.toml` then `polyvers.toml` in current directory
/// 3. `polyvers/polyvers.toml` in user config directory
/// 4. Default configuration (with no projects) if no file found
///
/// # Arguments
/// * `config_path` - Optional path to custom configuration file
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let path = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };

    let Some(path) = path else {
        tracing::debug!("no configuration file found, using defaults");
        return Ok(Config::default());
    };

    tracing::debug!(path = %path.display(), "loading configuration");
    let content = fs::read_to_string(&path).map_err(|e| {
        PolyversError::config(format!("cannot read {}: {}", path.display(), e))
    })?;
    Config::from_toml_str(&content)
        .map_err(|e| PolyversError::config(format!("{}: {}", path.display(), e)))
}

fn find_config_file() -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .or_else(|| {
            dirs::config_dir()
                .map(|dir| dir.join("polyvers").join("polyvers.toml"))
                .filter(|p| p.exists())
        })
}
