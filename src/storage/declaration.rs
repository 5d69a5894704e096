//! Declaration store
//!
//! The project is declared in `scikick.yml` at its root:
//!
//! ```yaml
//! reportdir: report
//! analysis:
//!   code/qc.Rmd:
//!   code/model.Rmd:
//!   - code/qc.Rmd
//!   - data/counts.csv
//! ```
//!
//! The file is read whole, mutated in memory and rewritten atomically
//! (temp file + rename under an exclusive lock). Unknown top-level fields
//! and field order survive a rewrite; YAML comments do not.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::domain::{DependencyList, ErrorKind, OrderedMap};

/// File name of the declaration at the project root
pub const DECLARATION_FILE: &str = "scikick.yml";

const DOCUMENTS_FIELD: &str = "analysis";
const DOCUMENTS_ALIAS: &str = "documents";
const ROOT_FIELD: &str = "reportdir";
const ROOT_ALIAS: &str = "artifactRoot";

/// Top-level fields that are understood (or deliberately passed through)
const KNOWN_FIELDS: &[&str] = &[
    DOCUMENTS_FIELD,
    DOCUMENTS_ALIAS,
    ROOT_FIELD,
    ROOT_ALIAS,
    "version_info",
    "snakefile_args",
];

#[derive(Debug, Error)]
pub enum DeclarationError {
    #[error("{} not found", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to parse declaration: {0}")]
    Parse(String),

    #[error("Field `{field}` {problem}")]
    Field { field: String, problem: String },
}

impl DeclarationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeclarationError::NotFound(_) => ErrorKind::NotFound,
            DeclarationError::Parse(_) | DeclarationError::Field { .. } => ErrorKind::Invalid,
        }
    }
}

/// Parsed declaration plus everything needed to write it back unchanged
#[derive(Debug, Clone)]
pub struct Declaration {
    raw: Mapping,
    documents_field: &'static str,
    root_field: &'static str,
    pub documents: OrderedMap<String, DependencyList>,
    pub artifact_root: String,
}

impl Declaration {
    /// Parses declaration text. An empty file is an empty declaration.
    pub fn parse(content: &str) -> Result<Self, DeclarationError> {
        let value: Value =
            serde_yaml::from_str(content).map_err(|e| DeclarationError::Parse(e.to_string()))?;
        let raw = match value {
            Value::Null => Mapping::new(),
            Value::Mapping(map) => map,
            _ => {
                return Err(DeclarationError::Parse(
                    "top level must be a mapping".to_string(),
                ))
            }
        };

        let documents_field = if !raw.contains_key(DOCUMENTS_FIELD) && raw.contains_key(DOCUMENTS_ALIAS)
        {
            DOCUMENTS_ALIAS
        } else {
            DOCUMENTS_FIELD
        };
        let root_field = if !raw.contains_key(ROOT_FIELD) && raw.contains_key(ROOT_ALIAS) {
            ROOT_ALIAS
        } else {
            ROOT_FIELD
        };

        let documents = match raw.get(documents_field) {
            None | Some(Value::Null) => OrderedMap::new(),
            Some(value) => serde_yaml::from_value(value.clone()).map_err(|e| {
                DeclarationError::Field {
                    field: documents_field.to_string(),
                    problem: format!("must map documents to dependency lists: {}", e),
                }
            })?,
        };

        let artifact_root = match raw.get(root_field) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.trim_end_matches('/').to_string(),
            Some(_) => {
                return Err(DeclarationError::Field {
                    field: root_field.to_string(),
                    problem: "must be a directory path".to_string(),
                })
            }
        };

        Ok(Self {
            raw,
            documents_field,
            root_field,
            documents,
            artifact_root,
        })
    }

    /// Top-level fields this tool does not recognize
    pub fn unknown_fields(&self) -> Vec<String> {
        self.raw
            .keys()
            .filter_map(|k| k.as_str())
            .filter(|k| !KNOWN_FIELDS.contains(k))
            .map(str::to_string)
            .collect()
    }

    /// Renders the declaration, keeping field order and unknown fields
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        let mut raw = self.raw.clone();
        raw.insert(
            Value::String(self.root_field.to_string()),
            Value::String(self.artifact_root.clone()),
        );
        raw.insert(
            Value::String(self.documents_field.to_string()),
            serde_yaml::to_value(&self.documents)?,
        );
        serde_yaml::to_string(&raw)
    }
}

/// Reads and writes `scikick.yml`
pub struct DeclarationStore {
    path: PathBuf,
}

impl DeclarationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The declaration of the project at `project_root`
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(DECLARATION_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the declaration
    pub fn read(&self) -> Result<Declaration> {
        if !self.path.is_file() {
            return Err(DeclarationError::NotFound(self.path.clone()).into());
        }

        let mut file = File::open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        file.lock_shared()
            .context("Failed to acquire read lock on declaration")?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;

        Declaration::parse(&content)
            .with_context(|| format!("Invalid declaration: {}", self.path.display()))
    }

    /// Atomically rewrites the declaration
    pub fn write(&self, declaration: &Declaration) -> Result<()> {
        let content = declaration
            .to_yaml()
            .context("Failed to serialize declaration")?;

        let temp_path = self.path.with_extension("yml.tmp");
        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            file.lock_exclusive()
                .context("Failed to acquire write lock on declaration")?;

            let mut writer = BufWriter::new(&file);
            writer
                .write_all(content.as_bytes())
                .context("Failed to write declaration")?;
            writer.flush().context("Failed to flush declaration")?;
        }

        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        tracing::debug!(path = %self.path.display(), "declaration written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
reportdir: report/
version_info:
  snakemake: 5.4.0
analysis:
  code/qc.Rmd:
  code/model.Rmd:
  - code/qc.Rmd
  - data/counts.csv
";

    #[test]
    fn parse_sample() {
        let decl = Declaration::parse(SAMPLE).unwrap();
        assert_eq!(decl.artifact_root, "report");
        assert_eq!(
            decl.documents.keys().collect::<Vec<_>>(),
            vec!["code/qc.Rmd", "code/model.Rmd"]
        );
        assert!(decl.documents.get("code/qc.Rmd").unwrap().is_empty());
        assert_eq!(decl.documents.get("code/model.Rmd").unwrap().len(), 2);
        assert!(decl.unknown_fields().is_empty());
    }

    #[test]
    fn empty_file_is_empty_declaration() {
        let decl = Declaration::parse("").unwrap();
        assert!(decl.documents.is_empty());
        assert_eq!(decl.artifact_root, "");
    }

    #[test]
    fn aliases_are_accepted_and_kept() {
        let decl = Declaration::parse("artifactRoot: out\ndocuments:\n  a.Rmd:\n").unwrap();
        assert_eq!(decl.artifact_root, "out");
        assert_eq!(decl.documents.len(), 1);

        let yaml = decl.to_yaml().unwrap();
        assert!(yaml.starts_with("artifactRoot: out\ndocuments:"));
        assert!(!yaml.contains("analysis"));
    }

    #[test]
    fn rewrite_keeps_field_order_and_unknown_fields() {
        let mut decl = Declaration::parse("custom: 1\nanalysis:\n  a.Rmd:\nreportdir: out\n").unwrap();
        assert_eq!(decl.unknown_fields(), vec!["custom"]);

        decl.documents.insert("b.Rmd".to_string(), DependencyList::new());
        let yaml = decl.to_yaml().unwrap();
        assert_eq!(yaml, "custom: 1\nanalysis:\n  a.Rmd: null\n  b.Rmd: null\nreportdir: out\n");
    }

    #[test]
    fn malformed_documents_field_is_rejected() {
        let err = Declaration::parse("analysis: [a.Rmd]\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert!(Declaration::parse("analysis:\n  a.Rmd:\n  a.Rmd:\n").is_err());
    }

    #[test]
    fn store_round_trip() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(DECLARATION_FILE), SAMPLE).unwrap();

        let store = DeclarationStore::for_project(dir.path());
        let mut decl = store.read().unwrap();
        decl.documents.remove("code/qc.Rmd");
        store.write(&decl).unwrap();

        let reread = store.read().unwrap();
        assert_eq!(reread.documents.len(), 1);
        assert_eq!(reread.artifact_root, "report");
        assert!(!dir.path().join("scikick.yml.tmp").exists());
    }

    #[test]
    fn missing_store_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = DeclarationStore::for_project(dir.path()).read().unwrap_err();
        let err = err.downcast::<DeclarationError>().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
