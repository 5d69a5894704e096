//! `sk mv`

use anyhow::{bail, Result};

use super::output::Output;
use crate::relocate::{execute, plan_move};
use crate::storage::Project;

/// Moves `sources` to `dest` and keeps the declaration and artifacts in step
pub fn run(output: &Output, sources: &[String], dest: &str, git: bool) -> Result<()> {
    let mut project = Project::open_current()?;
    for warning in project.warnings() {
        output.warn(&warning);
    }

    let sources = sources
        .iter()
        .map(|s| project.to_key(s))
        .collect::<Result<Vec<_>>>()?;
    let dest = project.to_key(dest)?;

    let plan = plan_move(project.root(), project.graph(), &sources, &dest)?;
    output.verbose_ctx("mv", &format!("{} file(s) to move", plan.pairs().count()));

    let use_git = git || project.config().use_git();
    let root = project.root().to_path_buf();
    let report = execute(&root, project.graph_mut(), &plan, use_git);

    // Moves that happened are recorded even if a later one failed
    project.save()?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "success": report.is_success(),
            "moved": report.moved,
            "renamed": report.renamed,
            "warnings": report.warnings,
            "errors": report.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
            "aborted": report.aborted.as_ref().map(|e| e.to_string()),
        }));
    } else {
        for warning in &report.warnings {
            output.warn(warning);
        }
        for line in &report.moved {
            output.verbose(line);
        }
        for line in &report.renamed {
            output.success(line);
        }
        for err in &report.errors {
            output.error(&err.to_string());
        }
    }

    if let Some(err) = report.aborted {
        return Err(err.into());
    }
    if !report.errors.is_empty() {
        bail!("{} file(s) could not be fully relocated", report.errors.len());
    }
    Ok(())
}
