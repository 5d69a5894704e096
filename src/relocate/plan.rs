//! Move planning
//!
//! Validates a `mv` request against the filesystem and the declaration
//! and expands it into the file-level (old, new) pairs that execution
//! works through. Nothing is changed here.

use std::collections::HashSet;
use std::path::Path;

use walkdir::WalkDir;

use super::MoveError;
use crate::domain::{is_supported, paths, DocumentGraph};

/// One file moving from `from` to `to` (project-relative keys)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePair {
    pub from: String,
    pub to: String,
}

/// One physical move (a file or a whole directory) and the files it
/// carries along
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub from: String,
    pub to: String,
    pub pairs: Vec<MovePair>,
}

/// A validated move request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovePlan {
    pub moves: Vec<PlannedMove>,
    pub warnings: Vec<String>,
}

impl MovePlan {
    /// All file-level pairs in execution order
    pub fn pairs(&self) -> impl Iterator<Item = &MovePair> {
        self.moves.iter().flat_map(|m| m.pairs.iter())
    }
}

/// Plans moving `sources` to `dest`. All paths are project-relative keys.
///
/// Forms: several sources into an existing directory, a file to a file, a
/// file into a directory, a directory into an existing directory (nested
/// under its own name) and a directory to a new directory.
pub fn plan_move(
    root: &Path,
    graph: &DocumentGraph,
    sources: &[String],
    dest: &str,
) -> Result<MovePlan, MoveError> {
    if paths::has_wildcard(dest) {
        return Err(MoveError::Wildcard(dest.to_string()));
    }
    for source in sources {
        if !root.join(source).exists() {
            return Err(MoveError::SourceNotFound(source.clone()));
        }
    }

    let dest_path = root.join(dest);
    let dest_is_dir = dest_path.is_dir();
    if sources.len() > 1 && !dest_is_dir {
        return Err(MoveError::MultipleToFile(dest.to_string()));
    }

    let mut plan = MovePlan::default();
    for source in sources {
        let source_path = root.join(source);
        let target = if dest_is_dir {
            paths::join(dest, paths::basename(source))
        } else {
            dest.to_string()
        };

        if source_path.is_dir() {
            if paths::normalize(&target).starts_with(&format!("{}/", paths::normalize(source))) {
                return Err(MoveError::IntoItself(source.clone()));
            }
            if !dest_is_dir && dest_path.exists() {
                return Err(MoveError::DestinationExists(dest.to_string()));
            }
            let pairs = walk_files(root, source)?
                .into_iter()
                .map(|file| {
                    let to = paths::join(&target, paths::strip_dir(&file, source));
                    MovePair { from: file, to }
                })
                .collect();
            plan.moves.push(PlannedMove {
                from: source.clone(),
                to: target,
                pairs,
            });
        } else {
            if !dest_is_dir {
                check_extension_change(graph, source, &target, &mut plan.warnings)?;
            }
            plan.moves.push(PlannedMove {
                from: source.clone(),
                to: target.clone(),
                pairs: vec![MovePair {
                    from: source.clone(),
                    to: target,
                }],
            });
        }
    }

    let mut destinations = HashSet::new();
    for pair in plan.pairs() {
        check_pair(root, graph, pair)?;
        if !destinations.insert(paths::normalize(&pair.to)) {
            return Err(MoveError::DestinationExists(pair.to.clone()));
        }
    }
    Ok(plan)
}

/// Files under `dir`, as project-relative keys in a stable order
fn walk_files(root: &Path, dir: &str) -> Result<Vec<String>, MoveError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root.join(dir)).sort_by_file_name() {
        let entry = entry.map_err(|e| MoveError::Io {
            action: "read directory",
            path: dir.to_string(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            files.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
    Ok(files)
}

fn check_extension_change(
    graph: &DocumentGraph,
    source: &str,
    target: &str,
    warnings: &mut Vec<String>,
) -> Result<(), MoveError> {
    let old_ext = paths::extension(source).unwrap_or("");
    let new_ext = paths::extension(target).unwrap_or("");
    if old_ext.eq_ignore_ascii_case(new_ext) {
        return Ok(());
    }
    if graph.is_document(source) && !is_supported(target) {
        return Err(MoveError::UnsupportedExtension {
            file: target.to_string(),
            extension: new_ext.to_string(),
        });
    }
    warnings.push(format!(
        "Changing file extension of {} ({} -> {})",
        source, old_ext, new_ext
    ));
    Ok(())
}

fn check_pair(root: &Path, graph: &DocumentGraph, pair: &MovePair) -> Result<(), MoveError> {
    if paths::normalize(&pair.from) == paths::normalize(&pair.to) {
        return Err(MoveError::SameLocation(pair.from.clone()));
    }
    if paths::has_wildcard(&pair.to) {
        return Err(MoveError::Wildcard(pair.to.clone()));
    }
    if root.join(&pair.to).exists() {
        return Err(MoveError::DestinationExists(pair.to.clone()));
    }
    if graph.is_document(&pair.from) {
        graph.check_new_document(&pair.to, Some(&pair.from))?;
    }
    Ok(())
}
