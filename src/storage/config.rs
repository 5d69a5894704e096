//! Configuration handling for scikick
//!
//! Configuration is stored in `scikick.toml` next to `scikick.yml`
//! (project) and `~/.config/scikick/config.toml` (global). Both are
//! optional; every field has a default.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::declaration::DECLARATION_FILE;
use crate::domain::ErrorKind;

/// Project config file name
pub const PROJECT_CONFIG_FILE: &str = "scikick.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Invalid
    }
}

/// How the build planner is invoked
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlannerConfig {
    /// Planner executable
    pub program: String,

    /// Workflow file passed with `--snakefile`
    pub snakefile: Option<String>,

    /// Replaces the default dry-run arguments when set
    pub args: Option<Vec<String>>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            program: "snakemake".to_string(),
            snakefile: None,
            args: None,
        }
    }
}

impl PlannerConfig {
    /// Arguments for a dry run that reports reasons
    pub fn dry_run_args(&self) -> Vec<String> {
        if let Some(args) = &self.args {
            return args.clone();
        }
        let mut args = Vec::new();
        if let Some(snakefile) = &self.snakefile {
            args.push("--snakefile".to_string());
            args.push(snakefile.clone());
        }
        args.extend(
            ["--directory", ".", "--dryrun", "--reason"]
                .iter()
                .map(|s| s.to_string()),
        );
        args
    }
}

/// Settings for `sk mv`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct MoveConfig {
    /// Move files with `git mv`
    pub use_git: bool,
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectConfig {
    pub planner: PlannerConfig,

    pub mv: MoveConfig,

    /// Homepage source used when no single declared document is the index
    pub index_template: Option<String>,
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,

    /// Move files with `git mv` in every project
    pub use_git: bool,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from default locations
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project_root = Self::find_project_root();
        let project = match &project_root {
            Some(root) => Self::load_project_config(root)?,
            None => ProjectConfig::default(),
        };

        Ok(Self {
            project,
            global,
            project_root,
        })
    }

    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self {
            project,
            global,
            project_root: Some(project_root.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("org", "scikick", "scikick").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads project configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = project_root.join(PROJECT_CONFIG_FILE);

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")?;

        if config.planner.program.trim().is_empty() {
            return Err(ConfigError::Invalid("planner.program must not be empty".to_string()).into());
        }
        Ok(config)
    }

    /// Finds the project root by looking for `scikick.yml`
    pub fn find_project_root() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            if current.join(DECLARATION_FILE).is_file() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// True when moves should go through `git mv`
    pub fn use_git(&self) -> bool {
        self.project.mv.use_git || self.global.use_git
    }

    /// Source of the homepage used when no single document is the index
    pub fn index_template(&self) -> String {
        if let Some(template) = &self.project.index_template {
            return template.clone();
        }
        Self::global_config_dir()
            .map(|dir| dir.join("template").join("index.Rmd"))
            .filter(|path| path.is_file())
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_else(|| "template/index.Rmd".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = Config {
            project: ProjectConfig::default(),
            global: GlobalConfig::default(),
            project_root: None,
        };

        assert_eq!(config.project.planner.program, "snakemake");
        assert_eq!(config.global.default_format, OutputFormat::Text);
        assert!(!config.use_git());
    }

    #[test]
    fn parse_project_config() {
        let toml = r#"
index_template = "site/home.Rmd"

[planner]
program = "cat"
args = ["dryrun.txt"]

[mv]
use_git = true
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.planner.program, "cat");
        assert_eq!(config.planner.dry_run_args(), vec!["dryrun.txt"]);
        assert!(config.mv.use_git);
        assert_eq!(config.index_template.as_deref(), Some("site/home.Rmd"));
    }

    #[test]
    fn default_dry_run_args() {
        let planner = PlannerConfig {
            snakefile: Some("/opt/sk/Snakefile".to_string()),
            ..PlannerConfig::default()
        };
        assert_eq!(
            planner.dry_run_args(),
            vec!["--snakefile", "/opt/sk/Snakefile", "--directory", ".", "--dryrun", "--reason"]
        );
    }

    #[test]
    fn parse_global_config() {
        let toml = r#"
default_format = "json"
use_git = true
"#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.default_format, OutputFormat::Json);
        assert!(config.use_git);
    }

    #[test]
    fn project_config_from_root() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "[planner]\nprogram = \"cat\"\n",
        )
        .unwrap();

        let config = Config::for_project(dir.path()).unwrap();
        assert_eq!(config.project.planner.program, "cat");
        assert_eq!(config.project_root.as_deref(), Some(dir.path()));
    }

    #[test]
    fn empty_planner_program_is_invalid() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PROJECT_CONFIG_FILE), "[planner]\nprogram = \"\"\n").unwrap();
        assert!(Config::for_project(dir.path()).is_err());
    }

    #[test]
    fn explicit_index_template_wins() {
        let config = Config {
            project: ProjectConfig {
                index_template: Some("home/index.Rmd".to_string()),
                ..ProjectConfig::default()
            },
            global: GlobalConfig::default(),
            project_root: None,
        };
        assert_eq!(config.index_template(), "home/index.Rmd");
    }
}
