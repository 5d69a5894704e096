//! `sk layout`

use anyhow::Result;

use super::output::Output;
use crate::domain::layout;
use crate::storage::Project;

/// Prints the tabs (or one tab's entries), reordering them first when an
/// order is given
pub fn run(output: &Output, order: &[String], submenu: Option<&str>) -> Result<()> {
    let mut project = Project::open_current()?;
    for warning in project.warnings() {
        output.warn(&warning);
    }

    if !order.is_empty() {
        let count = entries(&project, submenu)?.len();
        let permutation = layout::parse_order(order, count)?;
        output.verbose_ctx("layout", &format!("permutation: {:?}", permutation));

        match submenu {
            Some(name) => layout::reorder_submenu(project.graph_mut(), name, &permutation)?,
            None => layout::reorder_tabs(project.graph_mut(), &permutation)?,
        }
        project.save()?;
    }

    let entries = entries(&project, submenu)?;
    if output.is_json() {
        match submenu {
            Some(name) => output.data(&serde_json::json!({
                "tab": name,
                "members": entries,
            })),
            None => output.data(&layout::tabs(project.graph())),
        }
        return Ok(());
    }

    let index = project.graph().index_document();
    if submenu.is_none() && !index.fallback {
        println!("{}", index.artifacts.source);
    }
    for (i, entry) in entries.iter().enumerate() {
        println!("{}:  {}", i + 1, entry);
    }
    Ok(())
}

/// Tab names, or the members of one tab
fn entries(project: &Project, submenu: Option<&str>) -> Result<Vec<String>> {
    Ok(match submenu {
        Some(name) => layout::submenu(project.graph(), name)?,
        None => layout::tabs(project.graph())
            .into_iter()
            .map(|tab| tab.name)
            .collect(),
    })
}
