//! Planner facts
//!
//! The status engine never looks at the build planner's output format.
//! A [`Planner`] turns whatever the planner reports into [`PlannerFacts`]:
//! which documents will execute, which of their inputs changed, which
//! inputs will be refreshed by an upstream job first and which outputs
//! are missing.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use thiserror::Error;

use crate::domain::{DocumentGraph, ErrorKind, GraphError};

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Failed to run planner `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Planner `{program}` exited with {status}:\n{stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Unexpected planner output at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("Failed to describe the document graph for the planner: {0}")]
    Graph(String),
}

impl PlannerError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ExternalFailure
    }
}

impl From<GraphError> for PlannerError {
    fn from(err: GraphError) -> Self {
        PlannerError::Graph(err.to_string())
    }
}

/// A source of freshness facts for one status query
pub trait Planner {
    /// Queries the planner once for the whole graph
    fn plan(&self, graph: &DocumentGraph, root: &Path) -> Result<PlannerFacts, PlannerError>;
}

/// Everything the planner reported, keyed by document source path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlannerFacts {
    scheduled: HashSet<String>,
    presentation_steps: HashSet<String>,
    missing_artifacts: HashSet<String>,
    observed_updates: HashMap<String, Vec<String>>,
    expected_updates: HashMap<String, Vec<String>>,
}

impl PlannerFacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `document` will execute
    pub fn schedule(&mut self, document: impl Into<String>) -> &mut Self {
        self.scheduled.insert(document.into());
        self
    }

    /// Records that `document` has its presentation page rebuilt
    pub fn present(&mut self, document: impl Into<String>) -> &mut Self {
        self.presentation_steps.insert(document.into());
        self
    }

    /// Records an output file that does not exist yet
    pub fn missing(&mut self, file: impl Into<String>) -> &mut Self {
        self.missing_artifacts.insert(file.into());
        self
    }

    /// Records an input of `document` that is newer than its output
    pub fn updated_input(&mut self, document: &str, file: impl Into<String>) -> &mut Self {
        push_unique(self.observed_updates.entry(document.to_string()).or_default(), file.into());
        self
    }

    /// Records an input of `document` that an upstream job will refresh
    pub fn upstream_update(&mut self, document: &str, file: impl Into<String>) -> &mut Self {
        push_unique(self.expected_updates.entry(document.to_string()).or_default(), file.into());
        self
    }

    pub fn is_scheduled(&self, document: &str) -> bool {
        self.scheduled.contains(document)
    }

    pub fn has_presentation_step(&self, document: &str) -> bool {
        self.presentation_steps.contains(document)
    }

    pub fn is_missing(&self, file: &str) -> bool {
        self.missing_artifacts.contains(file)
    }

    /// Inputs of `document` reported newer than its output
    pub fn observed_updates(&self, document: &str) -> &[String] {
        self.observed_updates
            .get(document)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Inputs of `document` that an upstream job will refresh first
    pub fn expected_updates(&self, document: &str) -> &[String] {
        self.expected_updates
            .get(document)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True if any unit reports `file` as an updated input
    pub fn reported_updated(&self, file: &str) -> bool {
        self.observed_updates
            .values()
            .any(|files| files.iter().any(|f| f == file))
    }
}

fn push_unique(files: &mut Vec<String>, file: String) {
    if !files.contains(&file) {
        files.push(file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_records_facts() {
        let mut facts = PlannerFacts::new();
        facts
            .schedule("a.Rmd")
            .missing("report/out_md/a.md")
            .updated_input("b.Rmd", "data.csv")
            .updated_input("b.Rmd", "data.csv")
            .upstream_update("b.Rmd", "report/out_md/a.md");

        assert!(facts.is_scheduled("a.Rmd"));
        assert!(!facts.is_scheduled("b.Rmd"));
        assert!(facts.is_missing("report/out_md/a.md"));
        assert_eq!(facts.observed_updates("b.Rmd"), &["data.csv".to_string()]);
        assert_eq!(facts.expected_updates("b.Rmd").len(), 1);
        assert!(facts.observed_updates("a.Rmd").is_empty());
        assert!(facts.reported_updated("data.csv"));
        assert!(!facts.reported_updated("other.csv"));
    }

    #[test]
    fn planner_errors_are_external_failures() {
        let err = PlannerError::Malformed {
            line: 3,
            reason: "Reason without a job".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::ExternalFailure);
        assert!(err.kind().is_fatal());
    }
}
