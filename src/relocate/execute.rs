//! Move execution
//!
//! For every planned move the file (or directory) is moved first; only
//! then is the declaration touched. A document additionally takes its
//! rendered artifact, sidecar and media directory along, and the rendered
//! artifact keeps its modification time so the move alone never makes it
//! look stale.

use std::fs::{self, File};
use std::path::Path;
use std::process::Command;

use regex::{Captures, Regex};

use super::plan::{MovePair, MovePlan, PlannedMove};
use super::MoveError;
use crate::domain::{Artifacts, DocumentGraph, MEDIA_DIR};

/// Outcome of executing a plan
#[derive(Debug, Default)]
pub struct MoveReport {
    /// `mv <from> <to>` lines for every file and artifact moved
    pub moved: Vec<String>,
    /// Declaration updates
    pub renamed: Vec<String>,
    pub warnings: Vec<String>,
    /// Per-pair failures after the file itself was moved
    pub errors: Vec<MoveError>,
    /// A physical move failed; later moves were not attempted
    pub aborted: Option<MoveError>,
}

impl MoveReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.aborted.is_none()
    }
}

/// Executes a validated plan against the files under `root` and the graph
pub fn execute(
    root: &Path,
    graph: &mut DocumentGraph,
    plan: &MovePlan,
    use_git: bool,
) -> MoveReport {
    let mut report = MoveReport {
        warnings: plan.warnings.clone(),
        ..MoveReport::default()
    };

    for planned in &plan.moves {
        if let Err(err) = move_path(root, planned, use_git, &mut report) {
            report.aborted = Some(err);
            break;
        }
        for pair in &planned.pairs {
            if let Err(err) = update_pair(root, graph, pair, &mut report) {
                report.errors.push(err);
            }
        }
    }
    report
}

/// Step 1: the file or directory itself
fn move_path(
    root: &Path,
    planned: &PlannedMove,
    use_git: bool,
    report: &mut MoveReport,
) -> Result<(), MoveError> {
    create_parent(root, &planned.to)?;

    if use_git {
        match git_mv(root, &planned.from, &planned.to) {
            Ok(()) => {
                report.moved.push(format!("git mv {} {}", planned.from, planned.to));
                return Ok(());
            }
            Err(message) => report.warnings.push(format!(
                "git mv {} {} failed ({}); moving without git",
                planned.from, planned.to, message
            )),
        }
    }

    rename(root, &planned.from, &planned.to)?;
    report.moved.push(format!("mv {} {}", planned.from, planned.to));
    Ok(())
}

fn git_mv(root: &Path, from: &str, to: &str) -> Result<(), String> {
    let output = Command::new("git")
        .args(["mv", from, to])
        .current_dir(root)
        .output()
        .map_err(|e| e.to_string())?;
    if output.status.success() {
        Ok(())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
    }
}

/// Steps 2 and 3: declaration and artifacts for one moved file
fn update_pair(
    root: &Path,
    graph: &mut DocumentGraph,
    pair: &MovePair,
    report: &mut MoveReport,
) -> Result<(), MoveError> {
    if !graph.is_document(&pair.from) {
        if graph.rename(&pair.from, &pair.to)? {
            report
                .renamed
                .push(format!("{} renamed to {} in the declaration", pair.from, pair.to));
        } else {
            report
                .warnings
                .push(format!("{} is not referenced in the declaration", pair.from));
        }
        return Ok(());
    }

    let old = graph.artifacts(&pair.from)?;
    graph.rename(&pair.from, &pair.to)?;
    report
        .renamed
        .push(format!("{} renamed to {} in the declaration", pair.from, pair.to));

    let new = graph.artifacts(&pair.to)?;
    relocate_artifacts(root, &old, &new, report)
}

/// Moves the rendered artifact, sidecar and media directory of a document
/// to the locations derived from its new name
pub fn relocate_artifacts(
    root: &Path,
    old: &Artifacts,
    new: &Artifacts,
    report: &mut MoveReport,
) -> Result<(), MoveError> {
    if old.rendered == new.rendered {
        return Ok(());
    }

    let rendered = root.join(&new.rendered);
    let mtime = match fs::metadata(root.join(&old.rendered)) {
        Ok(meta) => Some(meta.modified().map_err(|e| io_error("read timestamp of", &old.rendered, e))?),
        Err(_) => None,
    };

    if mtime.is_some() {
        create_parent(root, &new.rendered)?;
        rename(root, &old.rendered, &new.rendered)?;
        report.moved.push(format!("mv {} {}", old.rendered, new.rendered));
    }

    let (old_sidecar, new_sidecar) = (old.sidecar(), new.sidecar());
    if root.join(&old_sidecar).is_file() {
        create_parent(root, &new_sidecar)?;
        rename(root, &old_sidecar, &new_sidecar)?;
        report.moved.push(format!("mv {} {}", old_sidecar, new_sidecar));
    }

    let (old_media, new_media) = (old.media_dir(), new.media_dir());
    if root.join(&old_media).is_dir() {
        create_parent(root, &new_media)?;
        rename(root, &old_media, &new_media)?;
        report.moved.push(format!("mv {} {}", old_media, new_media));

        if rendered.is_file() && old.media_name() != new.media_name() {
            rewrite_media_references(&rendered, old.media_name(), new.media_name())
                .map_err(|e| io_error("rewrite", &new.rendered, e))?;
        }
    }

    if let Some(mtime) = mtime {
        File::options()
            .write(true)
            .open(&rendered)
            .and_then(|file| file.set_modified(mtime))
            .map_err(|e| io_error("restore timestamp of", &new.rendered, e))?;
    }
    Ok(())
}

/// Points `output/<old>/...` references (HTML `src` attributes and
/// markdown image links) at `output/<new>/...`
fn rewrite_media_references(path: &Path, old: &str, new: &str) -> std::io::Result<()> {
    let pattern = format!(r#"(src=["']|\]\(){}/{}/"#, MEDIA_DIR, regex::escape(old));
    let re = Regex::new(&pattern).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let content = fs::read_to_string(path)?;
    let rewritten = re.replace_all(&content, |caps: &Captures| {
        format!("{}{}/{}/", &caps[1], MEDIA_DIR, new)
    });
    if rewritten != content {
        fs::write(path, rewritten.as_bytes())?;
    }
    Ok(())
}

fn create_parent(root: &Path, key: &str) -> Result<(), MoveError> {
    match root.join(key).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| io_error("create directory for", key, e))
        }
        _ => Ok(()),
    }
}

fn rename(root: &Path, from: &str, to: &str) -> Result<(), MoveError> {
    fs::rename(root.join(from), root.join(to)).map_err(|e| io_error("move", from, e))
}

fn io_error(action: &'static str, path: &str, source: std::io::Error) -> MoveError {
    MoveError::Io {
        action,
        path: path.to_string(),
        source,
    }
}
