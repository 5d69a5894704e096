//! `sk status`

use anyhow::{Context, Result};

use super::output::Output;
use crate::status::{SnakemakePlanner, StatusReport};
use crate::storage::Project;

/// Queries the planner once and prints a marker per document
pub fn run(output: &Output, document: Option<&str>) -> Result<()> {
    let project = Project::open_current()?;
    output.verbose_ctx(
        "status",
        &format!("Opened project at: {}", project.root().display()),
    );
    for warning in project.warnings() {
        output.warn(&warning);
    }

    let focus = match document {
        Some(doc) => {
            let key = project.to_key(doc)?;
            Some(project.graph().resolve(&key)?.source)
        }
        None => None,
    };

    let planner = SnakemakePlanner::from_config(&project.config().project.planner);
    let report = StatusReport::run(project.graph(), project.root(), &planner)
        .context("Failed to query the planner")?;
    let listing = report.listing(project.graph(), focus.as_deref())?;

    if output.is_json() {
        output.data(&listing);
        return Ok(());
    }

    for warning in &listing.warnings {
        output.warn(warning);
    }
    print!("{}", listing.render_text(output.is_verbose()));
    Ok(())
}
