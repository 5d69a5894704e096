//! Declaration editing (`add` / `del`)
//!
//! Each requested document is handled on its own: a failure is recorded
//! in the report and the remaining items still run. The caller persists
//! the graph once afterwards.

use std::fs::File;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use thiserror::Error;

use crate::domain::{is_index_name, is_supported, paths, DocumentGraph, ErrorKind, GraphError};

#[derive(Error, Debug)]
pub enum EditError {
    #[error("{0}: file names cannot contain wildcard characters (* ? [ ] {{ }} \\)")]
    Wildcard(String),

    #[error("{0}: only .R, .Rmd and .ipynb files can be added as documents")]
    UnsupportedExtension(String),

    #[error("directory {directory} does not exist (adding {file})")]
    DirectoryNotFound { file: String, directory: String },

    #[error(
        "an index file {existing} already exists; another can be added, but neither \
         will be used as the homepage (use 'sk add --force {file}' to persist)"
    )]
    IndexExists { file: String, existing: String },

    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl EditError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EditError::Wildcard(_) | EditError::UnsupportedExtension(_) => ErrorKind::Invalid,
            EditError::DirectoryNotFound { .. } => ErrorKind::NotFound,
            EditError::IndexExists { .. } => ErrorKind::Collision,
            EditError::Io { .. } => ErrorKind::ExternalFailure,
            EditError::Graph(e) => e.kind(),
        }
    }
}

/// What an edit did, item by item
#[derive(Debug, Default)]
pub struct EditReport {
    pub messages: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<EditError>,
}

impl EditReport {
    /// True when at least one item failed
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Declares `docs` (when new) and appends `deps` to each of them
pub fn add(
    root: &Path,
    graph: &mut DocumentGraph,
    docs: &[String],
    deps: &[String],
    force: bool,
) -> EditReport {
    let mut report = EditReport::default();

    for doc in docs {
        if graph.is_document(doc) && deps.is_empty() {
            report.messages.push(format!("{} is already included", doc));
        }
        if let Err(err) = add_document(root, graph, doc, force, &mut report) {
            report.errors.push(err);
            continue;
        }
        for dep in deps {
            if let Err(err) = add_dependency(root, graph, doc, dep, &mut report) {
                report.errors.push(err);
            }
        }
    }
    report
}

fn add_document(
    root: &Path,
    graph: &mut DocumentGraph,
    doc: &str,
    force: bool,
    report: &mut EditReport,
) -> Result<(), EditError> {
    if paths::has_wildcard(doc) {
        return Err(EditError::Wildcard(doc.to_string()));
    }
    if !is_supported(doc) {
        return Err(EditError::UnsupportedExtension(doc.to_string()));
    }
    if graph.is_document(doc) {
        return Ok(());
    }
    graph.check_new_document(doc, None)?;

    let directory = paths::dirname(doc);
    if !directory.is_empty() && !root.join(directory).is_dir() {
        return Err(EditError::DirectoryNotFound {
            file: doc.to_string(),
            directory: directory.to_string(),
        });
    }

    let candidates: Vec<String> = graph
        .index_candidates()
        .into_iter()
        .map(str::to_string)
        .collect();
    let is_index = is_index_name(doc);
    if is_index && candidates.len() == 1 && !force {
        return Err(EditError::IndexExists {
            file: doc.to_string(),
            existing: candidates[0].clone(),
        });
    }

    let path = root.join(doc);
    if !path.is_file() {
        File::options()
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|source| EditError::Io {
                action: "create",
                path: doc.to_string(),
                source,
            })?;
        report
            .warnings
            .push(format!("File {} doesn't exist, created an empty one", doc));
    }

    let position = insertion_point(graph, doc);
    graph.insert_document(position, doc)?;
    report.messages.push(format!("Added {}", doc));

    if is_index {
        if candidates.is_empty() {
            report.messages.push(format!(
                "An index file {} has been added and will be used as the homepage",
                doc
            ));
            touch(root, doc, report);
        } else {
            report.warnings.push(format!(
                "A redundant index file {} has been added; no declared index file will be used as the homepage",
                doc
            ));
            let fallback = graph.index_document().artifacts.source;
            touch(root, &fallback, report);
        }
    }
    Ok(())
}

/// Position right after the last document in the same tab directory, or
/// the end for documents at the top level
fn insertion_point(graph: &DocumentGraph, doc: &str) -> usize {
    let common = paths::common_dir(graph.all_documents().map(paths::dirname));
    let tab_of = |path: &str| paths::dirname(paths::strip_dir(path, &common)).to_string();

    let tab = tab_of(doc);
    if tab.is_empty() {
        return graph.len();
    }
    graph
        .all_documents()
        .enumerate()
        .filter(|(_, existing)| tab_of(existing) == tab)
        .map(|(idx, _)| idx + 1)
        .last()
        .unwrap_or(graph.len())
}

fn add_dependency(
    root: &Path,
    graph: &mut DocumentGraph,
    doc: &str,
    dep: &str,
    report: &mut EditReport,
) -> Result<(), EditError> {
    if !root.join(dep).is_file() {
        report
            .warnings
            .push(format!("{} does not exist or is not a file", dep));
    }
    if !graph.add_dependency(doc, dep)? {
        report
            .messages
            .push(format!("{} is already a dependency of {}", dep, doc));
        return Ok(());
    }

    report.messages.push(format!("Added dependency {} to {}", dep, doc));
    let trigger = if graph.is_document(dep) {
        "executions of"
    } else {
        "modifications to"
    };
    report.messages.push(format!(
        "  {} will be executed after any {} {}",
        doc, trigger, dep
    ));
    Ok(())
}

/// Removes `docs`, or only `deps` from each of them when deps are given
pub fn del(root: &Path, graph: &mut DocumentGraph, docs: &[String], deps: &[String]) -> EditReport {
    let mut report = EditReport::default();
    if graph.is_empty() {
        report.warnings.push("Nothing to remove".to_string());
        return report;
    }

    for doc in docs {
        if !graph.is_document(doc) {
            report.warnings.push(format!("File {} not included", doc));
            continue;
        }

        if deps.is_empty() {
            if let Err(err) = graph.remove_document(doc) {
                report.errors.push(err.into());
                continue;
            }
            report.messages.push(format!("{} removed", doc));
            if is_index_name(doc) {
                announce_homepage(root, graph, &mut report);
            }
        } else {
            match graph.declared_dependencies(doc) {
                Ok([]) => {
                    report
                        .warnings
                        .push(format!("File {} has no dependencies", doc));
                    continue;
                }
                Ok(_) => {}
                Err(err) => {
                    report.errors.push(err.into());
                    continue;
                }
            }
            for dep in deps {
                match graph.remove_dependency(doc, dep) {
                    Ok(true) => report.messages.push(format!("{} removed from {}", dep, doc)),
                    Ok(false) => report.warnings.push(format!("{} is not in {}", dep, doc)),
                    Err(err) => report.errors.push(err.into()),
                }
            }
        }
    }
    report
}

/// Reports which document now serves as the homepage and touches it so
/// it is rebuilt
fn announce_homepage(root: &Path, graph: &DocumentGraph, report: &mut EditReport) {
    let index = graph.index_document();
    if index.fallback {
        report
            .messages
            .push(format!("Using {} as homepage", index.artifacts.source));
    }
    touch(root, &index.artifacts.source, report);
}

/// Sets the modification time of `path` (relative to `root`, or
/// absolute) to now so the planner schedules it
fn touch(root: &Path, path: &str, report: &mut EditReport) {
    let full = root.join(path);
    if !full.is_file() {
        tracing::debug!(path, "not touching missing file");
        return;
    }
    let result = File::options()
        .write(true)
        .open(&full)
        .and_then(|file| file.set_modified(SystemTime::now()));
    if let Err(e) = result {
        report
            .warnings
            .push(format!("Could not update the timestamp of {}: {}", path, e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DependencyList;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup(entries: &[(&str, &[&str])]) -> (TempDir, DocumentGraph) {
        let dir = TempDir::new().unwrap();
        for (doc, _) in entries {
            let path = dir.path().join(doc);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
        let documents = entries
            .iter()
            .map(|(doc, deps)| (doc.to_string(), deps.iter().copied().collect::<DependencyList>()))
            .collect();
        (dir, DocumentGraph::new(documents, "report", "template/index.Rmd"))
    }

    fn keys(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn order(graph: &DocumentGraph) -> Vec<&str> {
        graph.all_documents().collect()
    }

    #[test]
    fn add_creates_missing_file_and_appends() {
        let (dir, mut graph) = setup(&[("a.Rmd", &[])]);
        let report = add(dir.path(), &mut graph, &keys(&["b.R"]), &[], false);

        assert!(!report.has_errors());
        assert!(dir.path().join("b.R").is_file());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(order(&graph), vec!["a.Rmd", "b.R"]);
    }

    #[test]
    fn add_inserts_after_last_member_of_tab() {
        let (dir, mut graph) = setup(&[
            ("a.Rmd", &[]),
            ("code/x.Rmd", &[]),
            ("code/y.Rmd", &[]),
            ("z.Rmd", &[]),
        ]);
        let report = add(dir.path(), &mut graph, &keys(&["code/w.Rmd"]), &[], false);
        assert!(!report.has_errors());
        assert_eq!(
            order(&graph),
            vec!["a.Rmd", "code/x.Rmd", "code/y.Rmd", "code/w.Rmd", "z.Rmd"]
        );
    }

    #[test]
    fn add_rejects_bad_names_item_by_item() {
        let (dir, mut graph) = setup(&[("a.Rmd", &[])]);
        let report = add(
            dir.path(),
            &mut graph,
            &keys(&["b*.Rmd", "notes.txt", "a.R", "missing/c.Rmd", "d.Rmd"]),
            &[],
            false,
        );

        let kinds: Vec<ErrorKind> = report.errors.iter().map(EditError::kind).collect();
        assert_eq!(
            kinds,
            vec![
                ErrorKind::Invalid,
                ErrorKind::Invalid,
                ErrorKind::Collision,
                ErrorKind::NotFound
            ]
        );
        assert_eq!(order(&graph), vec!["a.Rmd", "d.Rmd"]);
    }

    #[test]
    fn second_index_needs_force() {
        let (dir, mut graph) = setup(&[("index.Rmd", &[])]);
        fs::create_dir(dir.path().join("docs")).unwrap();

        let report = add(dir.path(), &mut graph, &keys(&["docs/index.Rmd"]), &[], false);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind(), ErrorKind::Collision);
        assert!(!graph.is_document("docs/index.Rmd"));

        let report = add(dir.path(), &mut graph, &keys(&["docs/index.Rmd"]), &[], true);
        assert!(!report.has_errors());
        assert!(report.warnings.iter().any(|w| w.contains("redundant index")));
        assert!(graph.index_document().fallback);
    }

    #[test]
    fn first_index_is_touched() {
        let (dir, mut graph) = setup(&[("a.Rmd", &[])]);
        let path = dir.path().join("index.Rmd");
        fs::write(&path, "").unwrap();
        let old = SystemTime::now() - Duration::from_secs(3600);
        File::options().write(true).open(&path).unwrap().set_modified(old).unwrap();

        let report = add(dir.path(), &mut graph, &keys(&["index.Rmd"]), &[], false);
        assert!(!report.has_errors());
        let mtime = fs::metadata(&path).unwrap().modified().unwrap();
        assert!(mtime > old + Duration::from_secs(1800));
    }

    #[test]
    fn add_dependencies_with_messages() {
        let (dir, mut graph) = setup(&[("a.Rmd", &[]), ("b.Rmd", &[])]);
        fs::write(dir.path().join("data.csv"), "1").unwrap();

        let report = add(
            dir.path(),
            &mut graph,
            &keys(&["b.Rmd"]),
            &keys(&["a.Rmd", "data.csv", "gone.csv"]),
            false,
        );
        assert!(!report.has_errors());
        assert_eq!(
            graph.declared_dependencies("b.Rmd").unwrap(),
            &keys(&["a.Rmd", "data.csv", "gone.csv"])
        );
        assert!(report.messages.iter().any(|m| m.contains("after any executions of a.Rmd")));
        assert!(report.messages.iter().any(|m| m.contains("after any modifications to data.csv")));
        assert_eq!(report.warnings, vec!["gone.csv does not exist or is not a file"]);

        let again = add(dir.path(), &mut graph, &keys(&["b.Rmd"]), &keys(&["a.Rmd"]), false);
        assert!(again.messages[0].contains("already a dependency"));
    }

    #[test]
    fn add_dependency_cycle_is_rejected() {
        let (dir, mut graph) = setup(&[("a.Rmd", &["b.Rmd"]), ("b.Rmd", &[])]);
        let report = add(dir.path(), &mut graph, &keys(&["b.Rmd"]), &keys(&["a.Rmd"]), false);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind(), ErrorKind::Invalid);
        assert!(graph.declared_dependencies("b.Rmd").unwrap().is_empty());
    }

    #[test]
    fn del_documents_and_dependencies() {
        let (dir, mut graph) = setup(&[("a.Rmd", &["x.csv"]), ("b.Rmd", &["a.Rmd", "y.csv"])]);

        let report = del(dir.path(), &mut graph, &keys(&["b.Rmd"]), &keys(&["y.csv", "z.csv"]));
        assert_eq!(graph.declared_dependencies("b.Rmd").unwrap(), &keys(&["a.Rmd"]));
        assert_eq!(report.warnings, vec!["z.csv is not in b.Rmd"]);

        let report = del(dir.path(), &mut graph, &keys(&["a.Rmd"]), &keys(&["x.csv"]));
        assert!(!report.has_errors());
        assert!(graph.documents().get("a.Rmd").unwrap().is_empty());

        let report = del(dir.path(), &mut graph, &keys(&["a.Rmd", "c.Rmd"]), &[]);
        assert_eq!(order(&graph), vec!["b.Rmd"]);
        assert_eq!(report.warnings, vec!["File c.Rmd not included"]);
    }

    #[test]
    fn del_index_dependency_leaves_homepage_alone() {
        let (dir, mut graph) = setup(&[("index.Rmd", &["x.csv"]), ("a.Rmd", &[])]);
        let path = dir.path().join("index.Rmd");
        let old = SystemTime::now() - Duration::from_secs(3600);
        File::options().write(true).open(&path).unwrap().set_modified(old).unwrap();

        let report = del(dir.path(), &mut graph, &keys(&["index.Rmd"]), &keys(&["x.csv"]));
        assert!(!report.has_errors());
        assert_eq!(report.messages, vec!["x.csv removed from index.Rmd"]);
        let mtime = fs::metadata(&path).unwrap().modified().unwrap();
        assert!(mtime < old + Duration::from_secs(1));
    }

    #[test]
    fn del_index_reports_homepage() {
        let (dir, mut graph) = setup(&[("index.Rmd", &[]), ("a.Rmd", &[])]);
        let report = del(dir.path(), &mut graph, &keys(&["index.Rmd"]), &[]);
        assert!(report
            .messages
            .iter()
            .any(|m| m == "Using template/index.Rmd as homepage"));
    }
}
