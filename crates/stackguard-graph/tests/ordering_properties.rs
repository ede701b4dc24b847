//! Property tests for deployment ordering.

use std::collections::BTreeSet;

use proptest::prelude::*;
use stackguard_accounts::Account;
use stackguard_graph::{order, GraphError, ResourceGraph};

fn stack_name(index: usize) -> String {
    format!("stack-{index:02}")
}

/// Build a graph from node count and raw edges; `(from, to)` means `from`
/// depends on `to`.
fn build(count: usize, edges: &[(usize, usize)]) -> ResourceGraph {
    let account = Account::new("DEV", "111111111111", "us-east-2");
    let mut graph = ResourceGraph::new();
    for index in 0..count {
        graph
            .add_node(stack_name(index), account.clone())
            .expect("unique names");
    }
    for (from, to) in edges {
        graph
            .add_dependency(&stack_name(*from), &stack_name(*to))
            .expect("declared endpoints");
    }
    graph
}

/// Strategy: node count and edges that only point to lower indices (a DAG).
fn dag_strategy() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..12).prop_flat_map(|count| {
        let edges = prop::collection::vec((0..count, 0..count), 0..count * 2).prop_map(|pairs| {
            pairs
                .into_iter()
                .filter(|(a, b)| a != b)
                .map(|(a, b)| if a > b { (a, b) } else { (b, a) })
                .collect::<Vec<_>>()
        });
        (Just(count), edges)
    })
}

/// Strategy: node count and arbitrary edges, self-loops included.
fn graph_strategy() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..10).prop_flat_map(|count| {
        (
            Just(count),
            prop::collection::vec((0..count, 0..count), 0..count * 3),
        )
    })
}

proptest! {
    /// Acyclic graphs order as a permutation with every edge respected
    #[test]
    fn dag_orders_every_stack_after_its_dependencies((count, edges) in dag_strategy()) {
        let graph = build(count, &edges);
        let ordered: Vec<String> = order(&graph)
            .expect("dag must order")
            .into_iter()
            .map(|node| node.name().to_string())
            .collect();

        let unique: BTreeSet<&String> = ordered.iter().collect();
        prop_assert_eq!(ordered.len(), count);
        prop_assert_eq!(unique.len(), count);

        let position = |name: &str| ordered.iter().position(|n| n == name);
        for (from, to) in graph.edges() {
            prop_assert!(
                position(to) < position(from),
                "{} must deploy before {}",
                to,
                from
            );
        }
    }

    /// Any reported cycle is a real cycle in the graph
    #[test]
    fn reported_cycle_is_valid((count, edges) in graph_strategy()) {
        let graph = build(count, &edges);
        let edge_set: BTreeSet<(String, String)> = graph
            .edges()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();

        match order(&graph) {
            Ok(ordered) => {
                prop_assert_eq!(ordered.len(), count);
            }
            Err(GraphError::CyclicDependency(cycle)) => {
                let nodes = cycle.nodes();
                prop_assert!(!nodes.is_empty());
                let unique: BTreeSet<&String> = nodes.iter().collect();
                prop_assert_eq!(unique.len(), nodes.len());
                for (i, from) in nodes.iter().enumerate() {
                    let to = &nodes[(i + 1) % nodes.len()];
                    prop_assert!(
                        edge_set.contains(&(from.clone(), to.clone())),
                        "{} -> {} is not an edge",
                        from,
                        to
                    );
                }
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    /// Ordering the same graph twice gives the same answer
    #[test]
    fn order_is_deterministic((count, edges) in graph_strategy()) {
        let graph = build(count, &edges);
        let first = order(&graph).map(|nodes| nodes.into_iter().map(|n| n.name().to_string()).collect::<Vec<_>>());
        let second = order(&graph).map(|nodes| nodes.into_iter().map(|n| n.name().to_string()).collect::<Vec<_>>());
        prop_assert_eq!(first, second);
    }
}
