//! Status engine
//!
//! Classifies every declared document and dependency into a three-slot
//! [`Marker`] from planner facts and the files on disk.
//!
//! Candidates for each slot of a document `d`:
//!
//! | Slot | Symbol | When |
//! |------|--------|------|
//! | self | `m` | rendered artifact missing (reported or absent on disk) |
//! | self | `s` | `d`'s source is an updated input of `d` |
//! | self | `-` | the planner rebuilds `d`'s presentation page |
//! | external | `e` / `u` | an upstream rendered artifact is (or will be) newer; `e` if that document is scheduled |
//! | internal | `s` | a resource dependency is an updated input of `d` |
//!
//! Each slot takes the strongest candidate. A missing source is `???`,
//! a missing rendered artifact is `m--`.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use super::planner::{Planner, PlannerError, PlannerFacts};
use crate::domain::{DocumentGraph, GraphError, Marker, Symbol};

/// Markers for every file of the declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    markers: HashMap<String, Marker>,
    warnings: Vec<String>,
}

impl StatusReport {
    /// Computes markers from facts already gathered. A document the planner
    /// schedules with no reason visible here gets `*--` and a warning.
    pub fn compute(graph: &DocumentGraph, root: &Path, facts: &PlannerFacts) -> Self {
        let rendered_owner: HashMap<String, String> = graph
            .all_documents()
            .filter_map(|doc| {
                graph
                    .artifacts(doc)
                    .ok()
                    .map(|a| (a.rendered, doc.to_string()))
            })
            .collect();

        let mut markers = HashMap::new();
        let mut warnings = Vec::new();

        for file in graph.all_files() {
            let marker = if graph.is_document(file) {
                let marker = document_marker(graph, root, facts, &rendered_owner, file);
                if facts.is_scheduled(file) && (marker.is_current() || marker.is_present_only()) {
                    warnings.push(format!(
                        "{} is scheduled to execute for a reason the planner did not report",
                        file
                    ));
                    Marker::new(Symbol::Unexplained, Symbol::PresentOnly, Symbol::PresentOnly)
                } else {
                    marker
                }
            } else {
                resource_marker(root, facts, file)
            };
            tracing::debug!(file, %marker, "status");
            markers.insert(file.to_string(), marker);
        }

        Self { markers, warnings }
    }

    /// Queries the planner once and computes markers
    pub fn run(
        graph: &DocumentGraph,
        root: &Path,
        planner: &dyn Planner,
    ) -> Result<Self, PlannerError> {
        let facts = planner.plan(graph, root)?;
        Ok(Self::compute(graph, root, &facts))
    }

    /// Marker of a declared document or dependency
    pub fn status_of(&self, file: &str) -> Option<Marker> {
        self.markers.get(file).copied()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Listing of all documents, or of `focus` and everything it depends on
    pub fn listing(
        &self,
        graph: &DocumentGraph,
        focus: Option<&str>,
    ) -> Result<StatusListing, GraphError> {
        let documents: Vec<&str> = match focus {
            Some(doc) => graph.closure(doc)?,
            None => graph.all_documents().collect(),
        };

        let marker_of = |file: &str| self.status_of(file).unwrap_or(Marker::MISSING);
        let mut files = Vec::with_capacity(documents.len());
        let mut counts = StatusCounts::default();

        for doc in documents {
            let marker = marker_of(doc);
            counts.record(marker);
            let dependencies = graph
                .declared_dependencies(doc)?
                .iter()
                .map(|dep| FileEntry {
                    file: dep.clone(),
                    marker: marker_of(dep),
                })
                .collect();
            files.push(DocumentEntry {
                file: doc.to_string(),
                marker,
                dependencies,
            });
        }

        Ok(StatusListing {
            files,
            counts,
            warnings: self.warnings.clone(),
        })
    }
}

fn document_marker(
    graph: &DocumentGraph,
    root: &Path,
    facts: &PlannerFacts,
    rendered_owner: &HashMap<String, String>,
    doc: &str,
) -> Marker {
    if !root.join(doc).is_file() {
        return Marker::MISSING;
    }
    let rendered = match graph.artifacts(doc) {
        Ok(artifacts) => artifacts.rendered,
        Err(_) => return Marker::MISSING,
    };

    if facts.is_missing(&rendered) || !root.join(&rendered).is_file() {
        return Marker::new(Symbol::ArtifactMissing, Symbol::PresentOnly, Symbol::PresentOnly);
    }

    let observed = facts.observed_updates(doc);

    let mut own = Vec::new();
    if observed.iter().any(|f| f == doc) {
        own.push(Symbol::Stale);
    }
    if facts.has_presentation_step(doc) {
        own.push(Symbol::PresentOnly);
    }

    let external = facts
        .expected_updates(doc)
        .iter()
        .chain(observed)
        .filter(|f| **f != rendered)
        .filter_map(|f| rendered_owner.get(f))
        .filter(|owner| owner.as_str() != doc)
        .map(|owner| {
            if facts.is_scheduled(owner) {
                Symbol::UpstreamPending
            } else {
                Symbol::UpstreamUpdated
            }
        });

    let internal = graph
        .resource_dependencies(doc)
        .into_iter()
        .filter(|dep| observed.iter().any(|f| f == dep))
        .map(|_| Symbol::Stale);

    Marker::reduce(own, external, internal)
}

fn resource_marker(root: &Path, facts: &PlannerFacts, file: &str) -> Marker {
    if !root.join(file).exists() {
        Marker::MISSING
    } else if facts.reported_updated(file) {
        Marker::new(Symbol::Stale, Symbol::PresentOnly, Symbol::PresentOnly)
    } else {
        Marker::CURRENT
    }
}

/// Aggregate counts over the listed documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    /// Marker is neither blank nor `---`
    pub to_execute: usize,
    /// Marker is not blank
    pub to_present: usize,
    pub up_to_date: usize,
    pub missing: usize,
}

impl StatusCounts {
    fn record(&mut self, marker: Marker) {
        if marker.needs_execution() {
            self.to_execute += 1;
        }
        if marker.is_current() {
            self.up_to_date += 1;
        } else {
            self.to_present += 1;
        }
        if marker.is_missing() {
            self.missing += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub file: String,
    pub marker: Marker,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentEntry {
    pub file: String,
    pub marker: Marker,
    pub dependencies: Vec<FileEntry>,
}

/// What `sk status` prints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusListing {
    pub files: Vec<DocumentEntry>,
    pub counts: StatusCounts,
    pub warnings: Vec<String>,
}

impl StatusListing {
    /// Text form. Without `verbose` only documents with work to do are
    /// listed; with it every document and its dependencies are.
    pub fn render_text(&self, verbose: bool) -> String {
        let mut out = String::new();
        for entry in &self.files {
            if verbose || !entry.marker.is_current() {
                out.push_str(&format!(" {} \t{}\n", entry.marker, entry.file));
            }
            if !verbose {
                continue;
            }
            for dep in &entry.dependencies {
                if dep.marker.is_current() {
                    out.push_str(&format!(" {} \t  {}\n", dep.marker, dep.file));
                } else {
                    out.push_str(&format!("({})\t  {}\n", dep.marker, dep.file));
                }
            }
        }

        out.push_str(&format!("Scripts to execute: {}\n", self.counts.to_execute));
        out.push_str(&format!("HTMLs to compile ('---'): {}\n", self.counts.to_present));
        if verbose {
            out.push_str(&format!("Up to date ('   '): {}\n", self.counts.up_to_date));
        }
        if self.counts.missing > 0 {
            out.push_str(&format!("Missing ('???'): {}\n", self.counts.missing));
        }
        out
    }
}
