//! Document graph
//!
//! The declaration's ordered `document -> [dependency]` table plus the
//! artifact root. Resolves any identifier of a document to its full set of
//! artifact names and translates dependency lists into the files the
//! executor actually consumes (a document dependency means the upstream
//! document's rendered artifact, not its source).
//!
//! Uses petgraph for cycle detection and dependency closures.

use std::collections::{HashMap, HashSet};

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use serde::Serialize;
use thiserror::Error;

use super::document::{self, Artifacts, DependencyList, DocumentKind};
use super::error::ErrorKind;
use super::ordered::OrderedMap;
use super::paths;

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("{0} is already included")]
    DuplicateDocument(String),

    #[error("Page {key} is already to be compiled from {existing}")]
    OutputTaken { key: String, existing: String },

    #[error("Rendered artifact {name} of {document} would collide with {existing}")]
    ArtifactCollision {
        name: String,
        document: String,
        existing: String,
    },

    #[error("Self-dependency not allowed: {0}")]
    SelfDependency(String),

    #[error("Adding dependency would create a cycle: {0} -> {1}")]
    CycleDetected(String, String),
}

impl GraphError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GraphError::NotFound(_) => ErrorKind::NotFound,
            GraphError::DuplicateDocument(_)
            | GraphError::OutputTaken { .. }
            | GraphError::ArtifactCollision { .. } => ErrorKind::Collision,
            GraphError::SelfDependency(_) | GraphError::CycleDetected(_, _) => ErrorKind::Invalid,
        }
    }
}

/// How a dependency entry is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency<'a> {
    /// Another declared document; the build input is its rendered artifact
    Document(&'a str),
    /// Any other file
    Resource(&'a str),
}

/// The document playing the homepage role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDocument {
    pub artifacts: Artifacts,
    /// True when no single declared document is the index and the system
    /// template stands in
    pub fallback: bool,
}

/// One document with the files it consumes, as handed to the planner
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedDocument {
    #[serde(flatten)]
    pub artifacts: Artifacts,
    pub inputs: Vec<String>,
}

/// The in-memory document graph
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentGraph {
    documents: OrderedMap<String, DependencyList>,
    artifact_root: String,
    fallback_index: String,
}

impl DocumentGraph {
    /// Creates a graph from the declaration table
    pub fn new(
        documents: OrderedMap<String, DependencyList>,
        artifact_root: impl Into<String>,
        fallback_index: impl Into<String>,
    ) -> Self {
        Self {
            documents,
            artifact_root: artifact_root.into(),
            fallback_index: fallback_index.into(),
        }
    }

    /// The declaration table
    pub fn documents(&self) -> &OrderedMap<String, DependencyList> {
        &self.documents
    }

    pub(crate) fn documents_mut(&mut self) -> &mut OrderedMap<String, DependencyList> {
        &mut self.documents
    }

    pub fn artifact_root(&self) -> &str {
        &self.artifact_root
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Document keys in declaration order
    pub fn all_documents(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    pub fn is_document(&self, path: &str) -> bool {
        self.documents.contains_key(path)
    }

    /// Declared documents whose stem is `index`
    pub fn index_candidates(&self) -> Vec<&str> {
        self.all_documents()
            .filter(|d| document::is_index_name(d))
            .collect()
    }

    /// Kind of a declared document: `Index` only for the sole index candidate
    pub fn kind_of(&self, source: &str) -> DocumentKind {
        match self.index_candidates().as_slice() {
            [only] if *only == source => DocumentKind::Index,
            _ => DocumentKind::Regular,
        }
    }

    /// The homepage document, or the system template when none or several
    /// documents are named `index`
    pub fn index_document(&self) -> IndexDocument {
        match self.index_candidates().as_slice() {
            [only] => IndexDocument {
                artifacts: Artifacts::derive(only, DocumentKind::Index, &self.artifact_root),
                fallback: false,
            },
            _ => IndexDocument {
                artifacts: Artifacts::derive(
                    &self.fallback_index,
                    DocumentKind::Index,
                    &self.artifact_root,
                ),
                fallback: true,
            },
        }
    }

    /// Artifact names for a declared document
    pub fn artifacts(&self, source: &str) -> Result<Artifacts, GraphError> {
        if !self.is_document(source) {
            return Err(GraphError::NotFound(source.to_string()));
        }
        Ok(Artifacts::derive(
            source,
            self.kind_of(source),
            &self.artifact_root,
        ))
    }

    /// Resolves a source path, rendered artifact, presentation artifact or
    /// output key to the document's full set of names
    pub fn resolve(&self, reference: &str) -> Result<Artifacts, GraphError> {
        let reference = reference.trim_end_matches('/');
        if let Ok(artifacts) = self.artifacts(reference) {
            return Ok(artifacts);
        }
        for source in self.all_documents() {
            let artifacts = Artifacts::derive(source, self.kind_of(source), &self.artifact_root);
            if artifacts.matches(reference) {
                return Ok(artifacts);
            }
        }
        let index = self.index_document();
        if index.fallback && index.artifacts.matches(reference) {
            return Ok(index.artifacts);
        }
        Err(GraphError::NotFound(reference.to_string()))
    }

    /// Dependencies exactly as declared
    pub fn declared_dependencies(&self, source: &str) -> Result<&[String], GraphError> {
        self.documents
            .get(source)
            .map(DependencyList::as_slice)
            .ok_or_else(|| GraphError::NotFound(source.to_string()))
    }

    /// Interprets a dependency entry
    pub fn classify<'a>(&self, dep: &'a str) -> Dependency<'a> {
        if self.is_document(dep) {
            Dependency::Document(dep)
        } else {
            Dependency::Resource(dep)
        }
    }

    /// Files that must exist and be fresh before `source` executes:
    /// document dependencies become their rendered artifact, resources
    /// are passed through. Never includes `source` itself.
    pub fn dependencies_of(&self, source: &str) -> Result<Vec<String>, GraphError> {
        let deps = self.declared_dependencies(source)?;
        let mut inputs = Vec::with_capacity(deps.len());
        for dep in deps.iter().filter(|d| d.as_str() != source) {
            match self.classify(dep) {
                Dependency::Document(doc) => inputs.push(self.artifacts(doc)?.rendered),
                Dependency::Resource(file) => inputs.push(file.to_string()),
            }
        }
        Ok(inputs)
    }

    /// Declared dependencies of `source` that are other documents
    pub fn document_dependencies(&self, source: &str) -> Vec<&str> {
        self.documents
            .get(source)
            .into_iter()
            .flat_map(DependencyList::iter)
            .filter(|d| d.as_str() != source && self.is_document(d))
            .map(String::as_str)
            .collect()
    }

    /// Declared dependencies of `source` that are plain files
    pub fn resource_dependencies(&self, source: &str) -> Vec<&str> {
        self.documents
            .get(source)
            .into_iter()
            .flat_map(DependencyList::iter)
            .filter(|d| d.as_str() != source && !self.is_document(d))
            .map(String::as_str)
            .collect()
    }

    /// Every document and every dependency, each once, in declaration order
    pub fn all_files(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for (doc, deps) in self.documents.iter() {
            for file in std::iter::once(doc).chain(deps.iter()) {
                if seen.insert(file.as_str()) {
                    files.push(file.as_str());
                }
            }
        }
        files
    }

    /// Dependencies that look like documents but are not declared.
    /// They are treated as plain resources.
    pub fn dangling_dependencies(&self) -> Vec<(&str, &str)> {
        self.documents
            .iter()
            .flat_map(|(doc, deps)| deps.iter().map(move |dep| (doc.as_str(), dep.as_str())))
            .filter(|(_, dep)| document::is_supported(dep) && !self.is_document(dep))
            .collect()
    }

    /// Non-fatal problems with the declaration as it stands
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings: Vec<String> = self
            .dangling_dependencies()
            .into_iter()
            .map(|(doc, dep)| {
                format!(
                    "{} depends on {}, which is not a declared document; treating it as a plain file",
                    doc, dep
                )
            })
            .collect();

        let candidates = self.index_candidates();
        if candidates.len() > 1 {
            warnings.push(format!(
                "Multiple index documents ({}); neither is used as the homepage",
                candidates.join(", ")
            ));
        }
        warnings
    }

    /// Builds the petgraph view: one node per document, edges
    /// `dependency -> dependent` for document dependencies only
    fn digraph(&self) -> (DiGraph<&str, ()>, HashMap<&str, NodeIndex>) {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();
        for doc in self.all_documents() {
            nodes.insert(doc, graph.add_node(doc));
        }
        for doc in self.all_documents() {
            for dep in self.document_dependencies(doc) {
                graph.add_edge(nodes[dep], nodes[doc], ());
            }
        }
        (graph, nodes)
    }

    /// `source` and every document it transitively depends on, in
    /// declaration order
    pub fn closure(&self, source: &str) -> Result<Vec<&str>, GraphError> {
        if !self.is_document(source) {
            return Err(GraphError::NotFound(source.to_string()));
        }
        let (graph, nodes) = self.digraph();
        let upstream = Reversed(&graph);
        let mut dfs = Dfs::new(upstream, nodes[source]);
        let mut reached = HashSet::new();
        while let Some(idx) = dfs.next(upstream) {
            reached.insert(graph[idx]);
        }
        Ok(self
            .all_documents()
            .filter(|d| reached.contains(d))
            .collect())
    }

    /// The resolved graph handed to the planner
    pub fn resolved(&self) -> Result<Vec<ResolvedDocument>, GraphError> {
        self.all_documents()
            .map(|doc| {
                Ok(ResolvedDocument {
                    artifacts: self.artifacts(doc)?,
                    inputs: self.dependencies_of(doc)?,
                })
            })
            .collect()
    }

    /// Checks that `source` could be declared without colliding with
    /// another document (ignoring `replacing`, for renames)
    pub fn check_new_document(&self, source: &str, replacing: Option<&str>) -> Result<(), GraphError> {
        if self.is_document(source) && Some(source) != replacing {
            return Err(GraphError::DuplicateDocument(source.to_string()));
        }
        let key = paths::strip_extension(source);
        let new_name = paths::basename(key);
        for existing in self.all_documents().filter(|d| Some(*d) != replacing && *d != source) {
            if paths::strip_extension(existing) == key {
                return Err(GraphError::OutputTaken {
                    key: key.to_string(),
                    existing: existing.to_string(),
                });
            }
            // Index documents are governed by the homepage rule instead
            if !document::is_index_name(source)
                && !document::is_index_name(existing)
                && paths::stem(existing) == new_name
            {
                return Err(GraphError::ArtifactCollision {
                    name: format!("{}.md", new_name),
                    document: source.to_string(),
                    existing: existing.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Appends a document with no dependencies
    pub fn add_document(&mut self, source: &str) -> Result<(), GraphError> {
        self.insert_document(self.documents.len(), source)
    }

    /// Inserts a document with no dependencies at a position
    pub fn insert_document(&mut self, index: usize, source: &str) -> Result<(), GraphError> {
        self.check_new_document(source, None)?;
        self.documents
            .insert_at(index, source.to_string(), DependencyList::new());
        Ok(())
    }

    /// Removes a document and returns its dependencies. References to it
    /// from other documents are kept (they become plain files).
    pub fn remove_document(&mut self, source: &str) -> Result<DependencyList, GraphError> {
        self.documents
            .remove(source)
            .ok_or_else(|| GraphError::NotFound(source.to_string()))
    }

    /// Adds `dep` to `document`. Returns false if it was already present.
    pub fn add_dependency(&mut self, document: &str, dep: &str) -> Result<bool, GraphError> {
        if !self.is_document(document) {
            return Err(GraphError::NotFound(document.to_string()));
        }
        if document == dep {
            return Err(GraphError::SelfDependency(document.to_string()));
        }

        if self.is_document(dep) {
            let (mut graph, nodes) = self.digraph();
            graph.add_edge(nodes[dep], nodes[document], ());
            if is_cyclic_directed(&graph) {
                return Err(GraphError::CycleDetected(
                    document.to_string(),
                    dep.to_string(),
                ));
            }
        }

        Ok(self
            .documents
            .get_mut(document)
            .map(|deps| deps.push(dep))
            .unwrap_or(false))
    }

    /// Removes `dep` from `document`. Returns false if it was not present.
    pub fn remove_dependency(&mut self, document: &str, dep: &str) -> Result<bool, GraphError> {
        self.documents
            .get_mut(document)
            .map(|deps| deps.remove(dep))
            .ok_or_else(|| GraphError::NotFound(document.to_string()))
    }

    /// Renames a path everywhere it appears: as a document key (keeping
    /// its position) and as a dependency value (keeping list order).
    /// Returns false if `old` was referenced nowhere.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<bool, GraphError> {
        let mut found = false;
        if self.is_document(old) {
            self.check_new_document(new, Some(old))?;
            found = self.documents.rename_key(old, new.to_string());
        }
        for deps in self.documents.values_mut() {
            found |= deps.rename(old, new);
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(entries: &[(&str, &[&str])]) -> DocumentGraph {
        let documents = entries
            .iter()
            .map(|(doc, deps)| (doc.to_string(), deps.iter().copied().collect()))
            .collect();
        DocumentGraph::new(documents, "report", "/opt/sk/template/index.Rmd")
    }

    #[test]
    fn resolve_by_any_identifier() {
        let g = graph(&[("code/a.Rmd", &[]), ("code/b.R", &["code/a.Rmd"])]);

        for reference in [
            "code/a.Rmd",
            "code/a",
            "report/out_md/code/a.md",
            "report/out_html/code/a.html",
        ] {
            let a = g.resolve(reference).unwrap();
            assert_eq!(a.source, "code/a.Rmd");
            assert_eq!(a.kind, DocumentKind::Regular);
        }

        assert_eq!(
            g.resolve("code/c.Rmd"),
            Err(GraphError::NotFound("code/c.Rmd".to_string()))
        );
    }

    #[test]
    fn dependencies_translate_documents_to_rendered_artifacts() {
        let g = graph(&[
            ("code/a.Rmd", &[]),
            ("code/b.Rmd", &["code/a.Rmd", "data/x.csv", "code/b.Rmd"]),
        ]);

        let deps = g.dependencies_of("code/b.Rmd").unwrap();
        assert_eq!(deps, vec!["report/out_md/code/a.md", "data/x.csv"]);
        assert!(!deps.contains(&"code/b.Rmd".to_string()));

        assert_eq!(g.document_dependencies("code/b.Rmd"), vec!["code/a.Rmd"]);
        assert_eq!(g.resource_dependencies("code/b.Rmd"), vec!["data/x.csv"]);
    }

    #[test]
    fn single_index_document_is_the_homepage() {
        let g = graph(&[("index.Rmd", &[]), ("a.Rmd", &[])]);
        let index = g.index_document();
        assert!(!index.fallback);
        assert_eq!(index.artifacts.source, "index.Rmd");
        assert_eq!(index.artifacts.rendered, "report/out_md/index.md");
        assert_eq!(g.kind_of("index.Rmd"), DocumentKind::Index);
        assert!(g.warnings().is_empty());
    }

    #[test]
    fn missing_or_duplicate_index_uses_fallback() {
        let none = graph(&[("a.Rmd", &[])]);
        assert!(none.index_document().fallback);
        assert_eq!(
            none.resolve("index").unwrap().source,
            "/opt/sk/template/index.Rmd"
        );

        let two = graph(&[("index.Rmd", &[]), ("sub/index.Rmd", &[])]);
        let index = two.index_document();
        assert!(index.fallback);
        assert_eq!(two.kind_of("index.Rmd"), DocumentKind::Regular);
        assert_eq!(two.warnings().len(), 1);
    }

    #[test]
    fn dangling_document_dependency_is_a_warning() {
        let g = graph(&[("a.Rmd", &["gone.Rmd", "data.csv"])]);
        assert_eq!(g.dangling_dependencies(), vec![("a.Rmd", "gone.Rmd")]);
        assert_eq!(g.classify("gone.Rmd"), Dependency::Resource("gone.Rmd"));
        assert_eq!(g.dependencies_of("a.Rmd").unwrap(), vec!["gone.Rmd", "data.csv"]);
    }

    #[test]
    fn all_files_lists_each_file_once() {
        let g = graph(&[("a.Rmd", &["x.csv"]), ("b.Rmd", &["a.Rmd", "x.csv"])]);
        assert_eq!(g.all_files(), vec!["a.Rmd", "x.csv", "b.Rmd"]);
    }

    #[test]
    fn closure_follows_document_dependencies() {
        let g = graph(&[
            ("a.Rmd", &["x.csv"]),
            ("b.Rmd", &["a.Rmd"]),
            ("c.Rmd", &["b.Rmd"]),
            ("d.Rmd", &[]),
        ]);
        assert_eq!(g.closure("c.Rmd").unwrap(), vec!["a.Rmd", "b.Rmd", "c.Rmd"]);
        assert_eq!(g.closure("d.Rmd").unwrap(), vec!["d.Rmd"]);
        assert!(g.closure("x.csv").is_err());
    }

    #[test]
    fn duplicate_and_colliding_documents_rejected() {
        let mut g = graph(&[("code/a.Rmd", &[]), ("index.Rmd", &[])]);

        assert_eq!(
            g.add_document("code/a.Rmd"),
            Err(GraphError::DuplicateDocument("code/a.Rmd".to_string()))
        );
        assert!(matches!(
            g.add_document("code/a.R"),
            Err(GraphError::OutputTaken { .. })
        ));
        let err = g.add_document("other/a.ipynb").unwrap_err();
        assert!(matches!(err, GraphError::ArtifactCollision { .. }));
        assert_eq!(err.kind(), ErrorKind::Collision);

        // A second index is allowed; the homepage rule handles it
        assert!(g.add_document("sub/index.Rmd").is_ok());
        assert!(g.add_document("code/b.Rmd").is_ok());
    }

    #[test]
    fn insert_document_at_position() {
        let mut g = graph(&[("a.Rmd", &[]), ("c.Rmd", &[])]);
        g.insert_document(1, "b.Rmd").unwrap();
        assert_eq!(g.all_documents().collect::<Vec<_>>(), vec!["a.Rmd", "b.Rmd", "c.Rmd"]);
    }

    #[test]
    fn dependency_cycles_rejected() {
        let mut g = graph(&[("a.Rmd", &[]), ("b.Rmd", &["a.Rmd"]), ("c.Rmd", &["b.Rmd"])]);

        let result = g.add_dependency("a.Rmd", "c.Rmd");
        assert!(matches!(result, Err(GraphError::CycleDetected(_, _))));
        assert_eq!(
            g.add_dependency("a.Rmd", "a.Rmd"),
            Err(GraphError::SelfDependency("a.Rmd".to_string()))
        );
        assert!(g.declared_dependencies("a.Rmd").unwrap().is_empty());

        assert_eq!(g.add_dependency("c.Rmd", "a.Rmd"), Ok(true));
        assert_eq!(g.add_dependency("c.Rmd", "a.Rmd"), Ok(false));
    }

    #[test]
    fn remove_dependency_and_document() {
        let mut g = graph(&[("a.Rmd", &[]), ("b.Rmd", &["a.Rmd", "x.csv"])]);
        assert_eq!(g.remove_dependency("b.Rmd", "x.csv"), Ok(true));
        assert_eq!(g.remove_dependency("b.Rmd", "x.csv"), Ok(false));
        assert!(g.remove_dependency("z.Rmd", "x.csv").is_err());

        g.remove_document("a.Rmd").unwrap();
        assert!(!g.is_document("a.Rmd"));
        assert_eq!(g.declared_dependencies("b.Rmd").unwrap(), &["a.Rmd".to_string()]);
    }

    #[test]
    fn rename_keeps_positions() {
        let mut g = graph(&[
            ("a.Rmd", &["x.csv"]),
            ("b.Rmd", &["a.Rmd"]),
            ("c.Rmd", &["x.csv", "a.Rmd"]),
        ]);

        assert_eq!(g.rename("a.Rmd", "sub/z.Rmd"), Ok(true));
        assert_eq!(
            g.all_documents().collect::<Vec<_>>(),
            vec!["sub/z.Rmd", "b.Rmd", "c.Rmd"]
        );
        assert_eq!(
            g.declared_dependencies("c.Rmd").unwrap(),
            &["x.csv".to_string(), "sub/z.Rmd".to_string()]
        );

        assert_eq!(g.rename("x.csv", "data/x.csv"), Ok(true));
        assert_eq!(g.rename("nowhere.csv", "y.csv"), Ok(false));
        assert!(g.rename("b.Rmd", "c.Rmd").is_err());
    }
}
