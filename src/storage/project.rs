//! Project management
//!
//! A [`Project`] is opened once per command: it reads the declaration,
//! owns the document graph while the command mutates it, and writes the
//! declaration back exactly once with [`Project::save`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::declaration::{Declaration, DeclarationStore, DECLARATION_FILE};
use super::Config;
use crate::domain::{paths, DocumentGraph, ErrorKind};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a scikick project ({} not found in this or any parent directory)", DECLARATION_FILE)]
    NotInProject,

    #[error("{0} is outside the project")]
    OutsideProject(String),
}

impl ProjectError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProjectError::NotInProject => ErrorKind::NotFound,
            ProjectError::OutsideProject(_) => ErrorKind::Invalid,
        }
    }
}

/// A scikick project
pub struct Project {
    root: PathBuf,
    config: Config,
    store: DeclarationStore,
    declaration: Declaration,
    graph: DocumentGraph,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.join(DECLARATION_FILE).is_file() {
            return Err(ProjectError::NotInProject.into());
        }
        let root = root
            .canonicalize()
            .with_context(|| format!("Failed to resolve project root: {}", root.display()))?;

        let config = Config::for_project(&root)?;
        let store = DeclarationStore::for_project(&root);
        let declaration = store.read()?;
        let graph = DocumentGraph::new(
            declaration.documents.clone(),
            declaration.artifact_root.clone(),
            config.index_template(),
        );

        tracing::debug!(
            root = %root.display(),
            documents = graph.len(),
            "opened project"
        );

        Ok(Self {
            root,
            config,
            store,
            declaration,
            graph,
        })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn graph(&self) -> &DocumentGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut DocumentGraph {
        &mut self.graph
    }

    /// Problems with the declaration worth telling the user about
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings: Vec<String> = self
            .declaration
            .unknown_fields()
            .into_iter()
            .map(|field| format!("Unrecognized {} field '{}'", DECLARATION_FILE, field))
            .collect();
        warnings.extend(self.graph.warnings());
        warnings
    }

    /// Writes the (possibly mutated) graph back to the declaration
    pub fn save(&mut self) -> Result<()> {
        self.declaration.documents = self.graph.documents().clone();
        self.store.write(&self.declaration)
    }

    /// Absolute path of a project-relative key
    pub fn path_of(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// True if a project-relative path exists on disk
    pub fn exists(&self, key: &str) -> bool {
        self.path_of(key).exists()
    }

    /// Returns a relative path from the project root
    pub fn relative_path(&self, path: &Path) -> Option<PathBuf> {
        path.strip_prefix(&self.root).ok().map(|p| p.to_path_buf())
    }

    /// Converts a path given on the command line (relative to the current
    /// directory, or absolute) into a declaration key
    pub fn to_key(&self, user_path: &str) -> Result<String> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        self.key_from(&cwd, user_path)
    }

    fn key_from(&self, cwd: &Path, user_path: &str) -> Result<String> {
        let absolute = cwd.join(user_path);
        let relative = self
            .relative_path(&absolute)
            .ok_or_else(|| ProjectError::OutsideProject(user_path.to_string()))?;

        let key = paths::normalize(&relative.to_string_lossy().replace('\\', "/"));
        if key.starts_with("..") {
            return Err(ProjectError::OutsideProject(user_path.to_string()).into());
        }
        Ok(key)
    }
}
