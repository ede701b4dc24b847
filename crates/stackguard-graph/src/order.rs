//! Deployment ordering
//!
//! Topological sort of the stack graph. Among stacks that are ready at the
//! same time the one with the smallest name goes first, so the same graph
//! always yields the same order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::error::{GraphError, GraphResult};
use crate::graph::ResourceGraph;
use crate::node::StackNode;

/// A dependency cycle.
///
/// Each stack depends on the next one and the last depends on the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cycle(pub Vec<String>);

impl Cycle {
    /// Stack names on the cycle.
    pub fn nodes(&self) -> &[String] {
        &self.0
    }

    /// Get the number of stacks on the cycle.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Cycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for name in &self.0 {
            write!(f, "{name} -> ")?;
        }
        match self.0.first() {
            Some(first) => write!(f, "{first}"),
            None => Ok(()),
        }
    }
}

/// Deployment order plus the waves that may apply concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    /// Stacks in deployment order
    pub order: Vec<String>,

    /// Stacks grouped by the length of their longest dependency chain
    pub waves: Vec<Vec<String>>,
}

impl DeploymentPlan {
    /// Lowercase hex SHA-256 of the ordered stack names, newline separated.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.order.join("\n").as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }

    /// Get the number of stacks.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Order the stacks so that every stack follows all of its dependencies.
///
/// # Returns
///
/// The stacks in deployment order, or `GraphError::CyclicDependency` with
/// the offending cycle
///
/// # Example
///
/// ```
/// use stackguard_accounts::Account;
/// use stackguard_graph::{order, ResourceGraph};
///
/// let dev = Account::new("DEV", "111111111111", "us-east-2");
/// let mut graph = ResourceGraph::new();
/// for name in ["Pipeline", "PolicyB", "PolicyA"] {
///     graph.add_node(name, dev.clone()).unwrap();
/// }
/// graph.add_dependency("Pipeline", "PolicyA").unwrap();
/// graph.add_dependency("Pipeline", "PolicyB").unwrap();
///
/// let names: Vec<&str> = order(&graph).unwrap().iter().map(|n| n.name()).collect();
/// assert_eq!(names, vec!["PolicyA", "PolicyB", "Pipeline"]);
/// ```
#[instrument(skip(graph), fields(stacks = graph.len()))]
pub fn order(graph: &ResourceGraph) -> GraphResult<Vec<&StackNode>> {
    let mut remaining: BTreeMap<&str, usize> = graph
        .nodes()
        .map(|node| (node.name(), node.dependencies().len()))
        .collect();

    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (from, to) in graph.edges() {
        dependents.entry(to).or_default().push(from);
    }

    let mut ready: BTreeSet<&str> = remaining
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(name, _)| *name)
        .collect();

    let mut ordered = Vec::with_capacity(graph.len());
    while let Some(name) = ready.pop_first() {
        remaining.remove(name);
        if let Some(node) = graph.node(name) {
            ordered.push(node);
        }

        for &dependent in dependents.get(name).into_iter().flatten() {
            if let Some(count) = remaining.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    if !remaining.is_empty() {
        let cycle = find_cycle(graph, &remaining);
        tracing::warn!(cycle = %cycle, "Dependency cycle detected");
        return Err(GraphError::CyclicDependency(cycle));
    }

    tracing::debug!(stacks = ordered.len(), "Ordered stacks");
    Ok(ordered)
}

/// Order the stacks and group them into deployment waves.
#[instrument(skip(graph), fields(stacks = graph.len()))]
pub fn plan(graph: &ResourceGraph) -> GraphResult<DeploymentPlan> {
    let ordered = order(graph)?;

    let mut depth: BTreeMap<&str, usize> = BTreeMap::new();
    let mut waves: Vec<Vec<String>> = Vec::new();
    for node in &ordered {
        let level = node
            .dependencies()
            .iter()
            .filter_map(|dep| depth.get(dep.as_str()))
            .map(|d| d + 1)
            .max()
            .unwrap_or(0);
        depth.insert(node.name(), level);

        if waves.len() <= level {
            waves.resize_with(level + 1, Vec::new);
        }
        waves[level].push(node.name().to_string());
    }
    for wave in &mut waves {
        wave.sort();
    }

    let plan = DeploymentPlan {
        order: ordered.iter().map(|node| node.name().to_string()).collect(),
        waves,
    };
    tracing::info!(
        stacks = plan.len(),
        waves = plan.waves.len(),
        "Built deployment plan"
    );
    Ok(plan)
}

/// Walk dependency edges among stacks Kahn's algorithm could not place.
///
/// Every such stack still has an unplaced dependency, so following the
/// smallest one from the smallest stack must revisit a stack.
fn find_cycle(graph: &ResourceGraph, remaining: &BTreeMap<&str, usize>) -> Cycle {
    let mut path: Vec<&str> = Vec::new();
    let mut current = match remaining.keys().next() {
        Some(name) => *name,
        None => return Cycle(Vec::new()),
    };

    loop {
        if let Some(start) = path.iter().position(|name| *name == current) {
            return Cycle(path[start..].iter().map(|name| name.to_string()).collect());
        }
        path.push(current);

        let next = graph.node(current).and_then(|node| {
            node.dependencies()
                .iter()
                .map(String::as_str)
                .find(|dep| remaining.contains_key(dep))
        });
        match next {
            Some(next) => current = next,
            None => return Cycle(path.iter().map(|name| name.to_string()).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackguard_accounts::Account;

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> ResourceGraph {
        let account = Account::new("DEV", "111111111111", "us-east-2");
        let mut graph = ResourceGraph::new();
        for name in nodes {
            graph.add_node(*name, account.clone()).unwrap();
        }
        for (from, to) in edges {
            graph.add_dependency(from, to).unwrap();
        }
        graph
    }

    fn names(nodes: Vec<&StackNode>) -> Vec<&str> {
        nodes.into_iter().map(StackNode::name).collect()
    }

    #[test]
    fn test_order_empty_graph() {
        let graph = ResourceGraph::new();
        assert!(order(&graph).unwrap().is_empty());
        assert!(plan(&graph).unwrap().waves.is_empty());
    }

    #[test]
    fn test_order_lexicographic_tie_break() {
        let graph = graph(&["c", "a", "b"], &[]);
        assert_eq!(names(order(&graph).unwrap()), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_order_respects_dependencies_over_names() {
        let graph = graph(&["a", "b", "z"], &[("a", "z"), ("b", "a")]);
        assert_eq!(names(order(&graph).unwrap()), vec!["z", "a", "b"]);
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let graph = graph(&["a", "b"], &[("b", "b")]);
        let err = order(&graph).unwrap_err();
        assert_eq!(err.cycle().unwrap().nodes(), ["b".to_string()]);
        assert_eq!(err.cycle().unwrap().to_string(), "b -> b");
    }

    #[test]
    fn test_cycle_reported_in_dependency_direction() {
        let graph = graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("b", "c"), ("c", "a"), ("d", "a")],
        );
        let err = order(&graph).unwrap_err();
        assert_eq!(err.error_code(), "CYCLIC_DEPENDENCY");
        let cycle = err.cycle().unwrap();
        assert_eq!(cycle.nodes(), ["a", "b", "c"].map(String::from));
        assert_eq!(cycle.to_string(), "a -> b -> c -> a");
        assert_eq!(err.to_string(), "Cyclic dependency: a -> b -> c -> a");
    }

    #[test]
    fn test_cycle_excludes_tail() {
        // d depends on the cycle but is not part of it
        let graph = graph(&["a", "b", "d"], &[("d", "a"), ("a", "b"), ("b", "a")]);
        let cycle = order(&graph).unwrap_err().cycle().cloned().unwrap();
        assert_eq!(cycle.len(), 2);
        assert!(!cycle.nodes().contains(&"d".to_string()));
    }

    #[test]
    fn test_plan_waves() {
        let graph = graph(
            &["res", "iam-dev", "iam-prod", "sso", "pipeline", "net"],
            &[
                ("iam-dev", "res"),
                ("iam-prod", "res"),
                ("sso", "iam-dev"),
                ("sso", "iam-prod"),
                ("pipeline", "sso"),
                ("pipeline", "iam-dev"),
            ],
        );
        let plan = plan(&graph).unwrap();
        assert_eq!(
            plan.order,
            vec!["net", "res", "iam-dev", "iam-prod", "sso", "pipeline"]
        );
        assert_eq!(
            plan.waves,
            vec![
                vec!["net".to_string(), "res".to_string()],
                vec!["iam-dev".to_string(), "iam-prod".to_string()],
                vec!["sso".to_string()],
                vec!["pipeline".to_string()],
            ]
        );
    }

    #[test]
    fn test_fingerprint_stable() {
        let a = plan(&graph(&["x", "y"], &[("y", "x")])).unwrap();
        let b = plan(&graph(&["y", "x"], &[("y", "x")])).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
        assert!(a.fingerprint().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let c = plan(&graph(&["x", "y"], &[("x", "y")])).unwrap();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_fingerprint_known_value() {
        let empty = DeploymentPlan {
            order: Vec::new(),
            waves: Vec::new(),
        };
        assert_eq!(
            empty.fingerprint(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
