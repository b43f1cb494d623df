//! Dependency cycle diagnostics for a working set.
//!
//! The sorter breaks cycles on its own; this module only reports them so an
//! operator can see which historical records reference each other. Edge
//! direction is `dependent → dependency`.

#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::event::{EventId, EventSet};

/// Build the dependency graph of `working`.
///
/// Links to events outside the working set are skipped; the sorter is the
/// component that rejects them.
#[must_use]
pub fn dependency_graph(set: &EventSet, working: &[EventId]) -> DiGraph<EventId, ()> {
    let mut graph = DiGraph::with_capacity(working.len(), working.len());
    let mut nodes: HashMap<EventId, NodeIndex> = HashMap::with_capacity(working.len());

    for &id in working {
        nodes.entry(id).or_insert_with(|| graph.add_node(id));
    }

    for &id in working {
        let Some(event) = set.get(id) else {
            continue;
        };
        let from = nodes[&id];
        for dep in event.depends_on() {
            if let Some(&to) = nodes.get(dep) {
                if graph.find_edge(from, to).is_none() {
                    graph.add_edge(from, to, ());
                }
            }
        }
    }

    graph
}

/// Find every dependency cycle in `working`.
///
/// Each entry is the sorted member list of one strongly connected
/// component. Self-dependencies are reported as one-element cycles.
#[must_use]
pub fn find_dependency_cycles(set: &EventSet, working: &[EventId]) -> Vec<Vec<EventId>> {
    let graph = dependency_graph(set, working);

    let mut cycles: Vec<Vec<EventId>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|component| {
            component.len() > 1
                || component
                    .first()
                    .is_some_and(|node| graph.find_edge(*node, *node).is_some())
        })
        .map(|component| {
            let mut ids: Vec<EventId> = component.into_iter().map(|idx| graph[idx]).collect();
            ids.sort_unstable();
            ids
        })
        .collect();

    cycles.sort_unstable();
    cycles
}
