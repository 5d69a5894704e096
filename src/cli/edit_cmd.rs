//! `sk add` and `sk del`

use anyhow::{bail, Result};

use super::output::Output;
use crate::edit::{self, EditReport};
use crate::storage::Project;

/// Declares documents and dependencies
pub fn add(output: &Output, documents: &[String], deps: &[String], force: bool) -> Result<()> {
    let mut project = Project::open_current()?;
    for warning in project.warnings() {
        output.warn(&warning);
    }
    let (documents, deps) = keys(&project, documents, deps)?;

    let root = project.root().to_path_buf();
    let report = edit::add(&root, project.graph_mut(), &documents, &deps, force);
    finish(output, &mut project, report)
}

/// Removes documents, or some of their dependencies
pub fn del(output: &Output, documents: &[String], deps: &[String]) -> Result<()> {
    let mut project = Project::open_current()?;
    for warning in project.warnings() {
        output.warn(&warning);
    }
    let (documents, deps) = keys(&project, documents, deps)?;

    let root = project.root().to_path_buf();
    let report = edit::del(&root, project.graph_mut(), &documents, &deps);
    finish(output, &mut project, report)
}

fn keys(project: &Project, documents: &[String], deps: &[String]) -> Result<(Vec<String>, Vec<String>)> {
    let convert = |values: &[String]| {
        values
            .iter()
            .map(|v| project.to_key(v))
            .collect::<Result<Vec<_>>>()
    };
    Ok((convert(documents)?, convert(deps)?))
}

/// Persists the declaration once and reports every item
fn finish(output: &Output, project: &mut Project, report: EditReport) -> Result<()> {
    project.save()?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "success": !report.has_errors(),
            "messages": report.messages,
            "warnings": report.warnings,
            "errors": report.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
        }));
    } else {
        for message in &report.messages {
            output.success(message);
        }
        for warning in &report.warnings {
            output.warn(warning);
        }
        for err in &report.errors {
            output.error(&err.to_string());
        }
    }

    if report.has_errors() {
        bail!("{} item(s) failed", report.errors.len());
    }
    Ok(())
}
