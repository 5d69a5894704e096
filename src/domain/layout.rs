//! Site layout: tabs and submenus
//!
//! Non-index documents are grouped into navigation tabs by their directory
//! relative to the deepest directory shared by all of them. Documents that
//! sit directly in that shared directory get a tab of their own.
//!
//! Reordering rewrites the declaration order; it never adds, drops or
//! edits an entry, and every reorder is checked to be a true permutation.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use super::document::DocumentKind;
use super::error::ErrorKind;
use super::graph::DocumentGraph;
use super::paths;

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("Not a tab index: {0}")]
    InvalidIndex(String),

    #[error("Order must be a unique list of indices between 1 and {count}, got {order:?}")]
    InvalidOrder { order: Vec<usize>, count: usize },

    #[error("No tab named \"{0}\"")]
    UnknownTab(String),

    #[error("Reordering with {order:?} changed the set of documents or their dependencies")]
    NotPermutation { order: Vec<usize> },
}

impl LayoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LayoutError::InvalidIndex(_) | LayoutError::InvalidOrder { .. } => ErrorKind::Invalid,
            LayoutError::UnknownTab(_) => ErrorKind::NotFound,
            LayoutError::NotPermutation { .. } => ErrorKind::Inconsistency,
        }
    }
}

/// A navigation tab and its documents in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tab {
    pub name: String,
    pub members: Vec<String>,
}

enum Group<'a> {
    Dir(&'a str),
    Root(&'a str),
}

/// Derives the tabs of the site from declaration order
pub fn tabs(graph: &DocumentGraph) -> Vec<Tab> {
    let documents: Vec<&str> = graph
        .all_documents()
        .filter(|d| graph.kind_of(d) != DocumentKind::Index)
        .collect();
    let common = paths::common_dir(documents.iter().map(|d| paths::dirname(d)));

    let mut groups: Vec<(Group, Vec<String>)> = Vec::new();
    let mut dir_slots: HashMap<&str, usize> = HashMap::new();
    for doc in &documents {
        let rel = paths::strip_dir(paths::dirname(doc), &common);
        if rel.is_empty() {
            groups.push((Group::Root(doc), vec![doc.to_string()]));
            continue;
        }
        match dir_slots.get(rel) {
            Some(&slot) => groups[slot].1.push(doc.to_string()),
            None => {
                dir_slots.insert(rel, groups.len());
                groups.push((Group::Dir(rel), vec![doc.to_string()]));
            }
        }
    }

    groups
        .into_iter()
        .map(|(group, members)| {
            let name = match group {
                Group::Dir(dir) => dir.to_string(),
                Group::Root(doc) => {
                    let stem = paths::stem(doc);
                    if dir_slots.contains_key(stem) {
                        paths::basename(doc).to_string()
                    } else {
                        stem.to_string()
                    }
                }
            };
            Tab { name, members }
        })
        .collect()
}

/// Members of the tab called `name`
pub fn submenu(graph: &DocumentGraph, name: &str) -> Result<Vec<String>, LayoutError> {
    tabs(graph)
        .into_iter()
        .find(|t| t.name == name)
        .map(|t| t.members)
        .ok_or_else(|| LayoutError::UnknownTab(name.to_string()))
}

/// Parses a user-supplied 1-based order over `count` entries into a full
/// 0-based permutation. A partial order is completed with the remaining
/// indices in their current order. With at most 9 entries a single
/// argument such as `312` is read digit by digit.
pub fn parse_order(args: &[String], count: usize) -> Result<Vec<usize>, LayoutError> {
    let compact = match args {
        [single] if count <= 9 && single.len() > 1 && single.chars().all(|c| c.is_ascii_digit()) => {
            Some(single.chars().map(|c| c.to_string()).collect::<Vec<_>>())
        }
        _ => None,
    };

    let mut order = Vec::new();
    for arg in compact.as_deref().unwrap_or(args) {
        let index: usize = arg
            .trim()
            .parse()
            .map_err(|_| LayoutError::InvalidIndex(arg.clone()))?;
        order.push(index);
    }

    let valid = order.len() <= count
        && order.iter().all(|&i| i >= 1 && i <= count)
        && order
            .iter()
            .enumerate()
            .all(|(pos, i)| !order[..pos].contains(i));
    if !valid {
        return Err(LayoutError::InvalidOrder { order, count });
    }

    let mut permutation: Vec<usize> = order.iter().map(|i| i - 1).collect();
    for i in 0..count {
        if !permutation.contains(&i) {
            permutation.push(i);
        }
    }
    Ok(permutation)
}

/// Rewrites declaration order so tabs appear in `order` (a full 0-based
/// permutation of the current tabs). Members of a tab stay in order; the
/// index document keeps its position.
pub fn reorder_tabs(graph: &mut DocumentGraph, order: &[usize]) -> Result<(), LayoutError> {
    let current = tabs(graph);
    if !is_permutation(order, current.len()) {
        return Err(LayoutError::InvalidOrder {
            order: order.iter().map(|i| i + 1).collect(),
            count: current.len(),
        });
    }

    let mut reordered = order
        .iter()
        .flat_map(|&i| current[i].members.iter().cloned());
    let mut keys = Vec::with_capacity(graph.len());
    for doc in graph.all_documents() {
        if graph.kind_of(doc) == DocumentKind::Index {
            keys.push(doc.to_string());
        } else if let Some(next) = reordered.next() {
            keys.push(next);
        }
    }

    tracing::debug!(?order, "reordering tabs");
    apply(graph, keys, order)
}

/// Permutes the members of one tab among the slots they occupy; every
/// other entry keeps its position.
pub fn reorder_submenu(
    graph: &mut DocumentGraph,
    name: &str,
    order: &[usize],
) -> Result<(), LayoutError> {
    let members = submenu(graph, name)?;
    if !is_permutation(order, members.len()) {
        return Err(LayoutError::InvalidOrder {
            order: order.iter().map(|i| i + 1).collect(),
            count: members.len(),
        });
    }

    let mut keys: Vec<String> = graph.all_documents().map(str::to_string).collect();
    let slots: Vec<usize> = members
        .iter()
        .filter_map(|m| graph.documents().position(m.as_str()))
        .collect();
    for (slot, &source) in slots.iter().zip(order) {
        keys[*slot] = members[source].clone();
    }

    tracing::debug!(tab = name, ?order, "reordering submenu");
    apply(graph, keys, order)
}

fn is_permutation(order: &[usize], count: usize) -> bool {
    let mut sorted = order.to_vec();
    sorted.sort_unstable();
    sorted == (0..count).collect::<Vec<_>>()
}

/// Rearranges the declaration to `keys` and verifies nothing but order
/// changed
fn apply(graph: &mut DocumentGraph, keys: Vec<String>, order: &[usize]) -> Result<(), LayoutError> {
    let before = graph.documents().clone();
    let fail = || LayoutError::NotPermutation {
        order: order.iter().map(|i| i + 1).collect(),
    };

    if !graph.documents_mut().arrange(&keys) {
        return Err(fail());
    }

    let after = graph.documents();
    let intact = after.len() == before.len()
        && before.iter().all(|(key, deps)| after.get(key.as_str()) == Some(deps));
    if !intact {
        *graph.documents_mut() = before;
        return Err(fail());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DependencyList;
    use proptest::prelude::*;

    fn graph(docs: &[&str]) -> DocumentGraph {
        let documents = docs
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let deps: DependencyList = if i % 2 == 0 {
                    [format!("data/{}.csv", i)].into_iter().collect()
                } else {
                    DependencyList::new()
                };
                (d.to_string(), deps)
            })
            .collect();
        DocumentGraph::new(documents, "report", "template/index.Rmd")
    }

    fn names(graph: &DocumentGraph) -> Vec<String> {
        tabs(graph).into_iter().map(|t| t.name).collect()
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tabs_group_by_relative_directory() {
        let g = graph(&[
            "index.Rmd",
            "code/qc/a.Rmd",
            "code/model/b.Rmd",
            "code/qc/c.Rmd",
            "summary.Rmd",
        ]);
        let tabs = tabs(&g);
        assert_eq!(names(&g), vec!["code/qc", "code/model", "summary"]);
        assert_eq!(tabs[0].members, vec!["code/qc/a.Rmd", "code/qc/c.Rmd"]);
    }

    #[test]
    fn common_directory_is_stripped() {
        let g = graph(&["code/qc/a.Rmd", "code/model/b.Rmd", "code/c.Rmd"]);
        assert_eq!(names(&g), vec!["qc", "model", "c"]);
    }

    #[test]
    fn singleton_name_collision_uses_file_name() {
        let g = graph(&["qc/a.Rmd", "qc.Rmd"]);
        assert_eq!(names(&g), vec!["qc", "qc.Rmd"]);
    }

    #[test]
    fn parse_order_completes_partial_orders() {
        assert_eq!(parse_order(&args(&["3"]), 3).unwrap(), vec![2, 0, 1]);
        assert_eq!(parse_order(&args(&["2", "1"]), 3).unwrap(), vec![1, 0, 2]);
        assert_eq!(parse_order(&args(&["312"]), 3).unwrap(), vec![2, 0, 1]);
        assert_eq!(parse_order(&[], 2).unwrap(), vec![0, 1]);
    }

    #[test]
    fn parse_order_rejects_bad_indices() {
        assert!(matches!(
            parse_order(&args(&["1", "1"]), 3),
            Err(LayoutError::InvalidOrder { .. })
        ));
        assert!(matches!(
            parse_order(&args(&["4"]), 3),
            Err(LayoutError::InvalidOrder { .. })
        ));
        assert!(matches!(
            parse_order(&args(&["0"]), 3),
            Err(LayoutError::InvalidOrder { .. })
        ));
        let err = parse_order(&args(&["x"]), 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[test]
    fn swap_two_tabs() {
        let mut g = graph(&["a/x.Rmd", "a/y.Rmd", "b/z.Rmd"]);
        let order = parse_order(&args(&["2", "1"]), 2).unwrap();
        reorder_tabs(&mut g, &order).unwrap();

        assert_eq!(
            g.all_documents().collect::<Vec<_>>(),
            vec!["b/z.Rmd", "a/x.Rmd", "a/y.Rmd"]
        );
        assert_eq!(names(&g), vec!["b", "a"]);
        assert_eq!(
            g.declared_dependencies("a/x.Rmd").unwrap(),
            &["data/0.csv".to_string()]
        );
    }

    #[test]
    fn index_stays_pinned() {
        let mut g = graph(&["a/x.Rmd", "index.Rmd", "b/z.Rmd", "c/w.Rmd"]);
        reorder_tabs(&mut g, &[2, 1, 0]).unwrap();
        assert_eq!(
            g.all_documents().collect::<Vec<_>>(),
            vec!["c/w.Rmd", "index.Rmd", "b/z.Rmd", "a/x.Rmd"]
        );
    }

    #[test]
    fn submenu_reorder_touches_only_its_slots() {
        let mut g = graph(&["a/x.Rmd", "b/z.Rmd", "a/y.Rmd", "a/w.Rmd"]);
        reorder_submenu(&mut g, "a", &[2, 0, 1]).unwrap();
        assert_eq!(
            g.all_documents().collect::<Vec<_>>(),
            vec!["a/w.Rmd", "b/z.Rmd", "a/x.Rmd", "a/y.Rmd"]
        );

        let err = reorder_submenu(&mut g, "nope", &[0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn non_permutation_is_rejected_without_change() {
        let mut g = graph(&["a/x.Rmd", "b/z.Rmd"]);
        let before = g.clone();
        assert!(reorder_tabs(&mut g, &[0, 0]).is_err());
        assert_eq!(g, before);
    }

    fn layout_strategy() -> impl Strategy<Value = (Vec<String>, Vec<usize>)> {
        prop::collection::vec(1usize..4, 1..7).prop_flat_map(|sizes| {
            // The root document keeps the shared directory empty
            let tab_count = sizes.len() + 1;
            let docs: Vec<String> = std::iter::once("overview.Rmd".to_string())
                .chain(sizes.iter().enumerate().flat_map(|(t, &n)| {
                    (0..n).map(move |m| format!("tab{}/doc{}.Rmd", t, m))
                }))
                .collect();
            (Just(docs), Just((0..tab_count).collect::<Vec<_>>()).prop_shuffle())
        })
    }

    proptest! {
        #[test]
        fn reorder_round_trip((docs, order) in layout_strategy()) {
            let refs: Vec<&str> = docs.iter().map(String::as_str).collect();
            let mut g = graph(&refs);
            let before_names = names(&g);
            let before = g.documents().clone();

            reorder_tabs(&mut g, &order).unwrap();

            let expected: Vec<String> = order.iter().map(|&i| before_names[i].clone()).collect();
            prop_assert_eq!(names(&g), expected);
            prop_assert_eq!(g.len(), before.len());
            for (key, deps) in before.iter() {
                prop_assert_eq!(g.documents().get(key.as_str()), Some(deps));
            }
        }
    }
}
