//! # Storage Layer
//!
//! Persistence for scikick projects.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Declaration | YAML | `scikick.yml` |
//! | Project config | TOML | `scikick.toml` |
//! | Global config | TOML | `~/.config/scikick/config.toml` |
//!
//! The declaration is rewritten atomically (temp file + rename) while
//! holding an `fs2` exclusive lock.
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point: declaration, graph and config of a project
//! - [`DeclarationStore`] - Read/write `scikick.yml`
//! - [`Config`] - Project and global configuration

mod config;
mod declaration;
mod project;

pub use config::{
    Config, ConfigError, GlobalConfig, MoveConfig, OutputFormat, PlannerConfig, ProjectConfig,
    PROJECT_CONFIG_FILE,
};
pub use declaration::{Declaration, DeclarationError, DeclarationStore, DECLARATION_FILE};
pub use project::{Project, ProjectError};
