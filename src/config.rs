//! Run configuration
//!
//! A `Config` is built once at program entry from CLI flags, environment and
//! the optional `.recon.toml` in the project root. It is shared read-only as
//! `Arc<Config>` for the rest of the run.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use strum::{Display, EnumString};

use crate::invoke::Tool;

/// Project config file name, looked up in the project root
pub const CONFIG_FILE: &str = ".recon.toml";

/// Files and directories that mark a project root
const ROOT_MARKERS: &[&str] = &[
    ".git",
    "package.json",
    "Cargo.toml",
    "wrangler.toml",
    "wrangler.jsonc",
    "svelte.config.js",
];

/// Output mode for the whole invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum RenderMode {
    Human,
    Json,
}

/// Binary names for the external tools
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ToolPaths {
    #[serde(default = "default_rg")]
    pub rg: String,
    #[serde(default = "default_git")]
    pub git: String,
    #[serde(default = "default_gh")]
    pub gh: String,
}

fn default_rg() -> String {
    "rg".to_string()
}

fn default_git() -> String {
    "git".to_string()
}

fn default_gh() -> String {
    "gh".to_string()
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            rg: default_rg(),
            git: default_git(),
            gh: default_gh(),
        }
    }
}

impl ToolPaths {
    pub fn program(&self, tool: Tool) -> &str {
        match tool {
            Tool::Rg => &self.rg,
            Tool::Git => &self.git,
            Tool::Gh => &self.gh,
        }
    }
}

/// Contents of `.recon.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    /// Per-command truncation overrides, keyed by command name
    #[serde(default)]
    pub limits: HashMap<String, usize>,

    #[serde(default)]
    pub search: SearchSettings,

    #[serde(default)]
    pub tools: ToolPaths,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchSettings {
    /// Excludes added after the default list
    #[serde(default)]
    pub extra_excludes: Vec<String>,
}

/// Load `.recon.toml` from the project root
///
/// Falls back to defaults if the file doesn't exist.
pub fn load_project_config(root: &Path) -> Result<ProjectConfig> {
    let path = root.join(CONFIG_FILE);

    if !path.exists() {
        log::debug!("No {} found, using defaults", CONFIG_FILE);
        return Ok(ProjectConfig::default());
    }

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config: ProjectConfig = toml::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    log::debug!("Loaded project config from {}", path.display());
    Ok(config)
}

/// Walk up from `start` to the first directory holding a root marker
pub fn detect_root(start: &Path) -> PathBuf {
    for dir in start.ancestors() {
        if ROOT_MARKERS.iter().any(|marker| dir.join(marker).exists()) {
            return dir.to_path_buf();
        }
    }
    start.to_path_buf()
}

/// Immutable configuration for one command invocation
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root; every tool runs with this as its working directory
    pub root: PathBuf,
    pub mode: RenderMode,
    /// Machine consumer: no color, no decoration
    pub agent: bool,
    /// Pretty-print JSON output
    pub pretty: bool,
    pub color: bool,
    /// Applies to every Section when set
    pub limit_override: Option<usize>,
    /// Disable human-mode truncation
    pub show_all: bool,
    /// Whole-command timeout
    pub timeout: Option<Duration>,
    pub tools: ToolPaths,
    pub limits: HashMap<String, usize>,
    pub extra_excludes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            mode: RenderMode::Human,
            agent: false,
            pretty: false,
            color: false,
            limit_override: None,
            show_all: false,
            timeout: None,
            tools: ToolPaths::default(),
            limits: HashMap::new(),
            extra_excludes: Vec::new(),
        }
    }
}

impl Config {
    /// Merge a project config into this one
    pub fn with_project(mut self, project: ProjectConfig) -> Self {
        self.tools = project.tools;
        self.limits = project.limits;
        self.extra_excludes = project.search.extra_excludes;
        self
    }

    pub fn is_json(&self) -> bool {
        self.mode == RenderMode::Json
    }

    /// Effective truncation limit for a Section of `command`
    ///
    /// `None` means no truncation.
    pub fn effective_limit(&self, command: &str, default: usize) -> Option<usize> {
        if self.show_all {
            return None;
        }
        if let Some(limit) = self.limit_override {
            return Some(limit);
        }
        Some(self.limits.get(command).copied().unwrap_or(default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_root_walks_up() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("package.json"), "{}").unwrap();
        let nested = temp.path().join("src/lib/components");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(detect_root(&nested), temp.path());
    }

    #[test]
    fn test_load_project_config_defaults_when_missing() {
        let temp = TempDir::new().unwrap();
        let config = load_project_config(temp.path()).unwrap();
        assert!(config.limits.is_empty());
        assert_eq!(config.tools, ToolPaths::default());
    }

    #[test]
    fn test_load_project_config_partial_tools() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(CONFIG_FILE),
            "[limits]\nsearch = 40\n\n[search]\nextra_excludes = [\"fixtures/**\"]\n\n[tools]\ngh = \"/opt/gh\"\n",
        )
        .unwrap();

        let config = load_project_config(temp.path()).unwrap();
        assert_eq!(config.limits.get("search"), Some(&40));
        assert_eq!(config.search.extra_excludes, vec!["fixtures/**"]);
        assert_eq!(config.tools.gh, "/opt/gh");
        assert_eq!(config.tools.rg, "rg");
    }

    #[test]
    fn test_load_project_config_rejects_bad_toml() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(CONFIG_FILE), "[limits\n").unwrap();
        assert!(load_project_config(temp.path()).is_err());
    }

    #[test]
    fn test_effective_limit_precedence() {
        let mut config = Config::default();
        config.limits.insert("search".to_string(), 40);

        assert_eq!(config.effective_limit("search", 25), Some(40));
        assert_eq!(config.effective_limit("files", 30), Some(30));

        config.limit_override = Some(5);
        assert_eq!(config.effective_limit("search", 25), Some(5));

        config.show_all = true;
        assert_eq!(config.effective_limit("search", 25), None);
    }

    #[test]
    fn test_render_mode_parse() {
        assert_eq!("json".parse::<RenderMode>().unwrap(), RenderMode::Json);
        assert_eq!(RenderMode::Human.to_string(), "human");
    }
}
