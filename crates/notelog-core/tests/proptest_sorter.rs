use std::collections::HashMap;

use notelog_core::cycles::find_dependency_cycles;
use notelog_core::{EventId, EventSorter, SortError};
use proptest::prelude::*;

use generators::*;

fn positions(order: &[EventId]) -> HashMap<EventId, usize> {
    order.iter().enumerate().map(|(pos, id)| (*id, pos)).collect()
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(512))]

    #[test]
    fn output_is_a_permutation_of_input(graph in arb_graph(40, 80)) {
        let (set, ids) = graph.build();
        let working = graph.working(&ids);
        let out = EventSorter::new(&set).order(&working).expect("in-set deps never fail");

        let mut expected = working;
        expected.sort_unstable();
        let mut actual = out;
        actual.sort_unstable();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn independent_events_come_out_in_stable_time_order(graph in arb_independent(40)) {
        let (set, ids) = graph.build();
        let working = graph.working(&ids);
        let out = EventSorter::new(&set).order(&working).expect("sort");

        let mut expected = working;
        expected.sort_by_key(|id| set[*id].when);
        prop_assert_eq!(out, expected);
    }

    #[test]
    fn dependencies_precede_dependents_when_acyclic(graph in arb_dag(40, 80)) {
        let (set, ids) = graph.build();
        let working = graph.working(&ids);
        let (out, stats) = EventSorter::new(&set).order_with_stats(&working).expect("sort");
        let pos = positions(&out);

        prop_assert_eq!(stats.broken_edges, 0);
        for &(a, b) in &graph.edges {
            prop_assert!(pos[&ids[b]] < pos[&ids[a]], "{} must precede {}", ids[b], ids[a]);
        }
    }

    #[test]
    fn cycles_terminate_and_only_break_edges_inside_them(graph in arb_graph(30, 60)) {
        let (set, ids) = graph.build();
        let working = graph.working(&ids);
        let sorter = EventSorter::new(&set);
        let out = sorter.order(&working).expect("cycles never fail");
        prop_assert_eq!(out.len(), working.len());
        prop_assert_eq!(&sorter.order(&working).expect("sort"), &out);

        let mut component: HashMap<EventId, usize> = HashMap::new();
        for (idx, cycle) in find_dependency_cycles(&set, &working).into_iter().enumerate() {
            for id in cycle {
                component.insert(id, idx);
            }
        }
        let pos = positions(&out);
        for &(a, b) in &graph.edges {
            let (a, b) = (ids[a], ids[b]);
            let same_cycle = a == b
                || matches!((component.get(&a), component.get(&b)), (Some(x), Some(y)) if x == y);
            if !same_cycle {
                prop_assert!(pos[&b] < pos[&a], "edge {} -> {} outside any cycle", a, b);
            }
        }
    }

    #[test]
    fn missing_dependency_fails_the_sort(graph in arb_dag(20, 40)) {
        prop_assume!(!graph.edges.is_empty());
        let (set, ids) = graph.build();
        let (_, dropped) = graph.edges[0];
        let working: Vec<EventId> = graph
            .working(&ids)
            .into_iter()
            .filter(|id| *id != ids[dropped])
            .collect();

        let err = EventSorter::new(&set).order(&working).expect_err("dangling dependency");
        let is_dangling = matches!(err, SortError::DependencyNotInWorkingSet { .. });
        prop_assert!(is_dangling);
    }
}
