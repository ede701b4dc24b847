//! Integration tests for deployment ordering.
//!
//! These tests model the dependency shapes the organization's stacks
//! actually have:
//! 1. Policy stacks before the permission-set stack before the pipeline
//! 2. Root DNS delegation before every child networking stack
//! 3. Cycles introduced by a bad dependency

use stackguard_accounts::{Account, AccountRegistry};
use stackguard_graph::{order, plan, GraphError, ResourceGraph};

fn names(graph: &ResourceGraph) -> Vec<String> {
    order(graph)
        .expect("graph should be acyclic")
        .into_iter()
        .map(|node| node.name().to_string())
        .collect()
}

#[test]
fn test_policy_before_permission_set_before_pipeline() {
    let registry = AccountRegistry::software_engineering();
    let root = registry.resolve("ROOT").unwrap().clone();
    let dev = registry.resolve("DEV").unwrap().clone();
    let testing = registry.resolve("TESTING").unwrap().clone();

    let mut graph = ResourceGraph::new();
    graph.add_node("Pipeline", root.clone()).unwrap();
    graph.add_node("PermissionSet", root.in_region("us-east-1")).unwrap();
    graph.add_node("IAMPolicy(TESTING)", testing).unwrap();
    graph.add_node("IAMPolicy(DEV)", dev).unwrap();

    graph.add_dependency("PermissionSet", "IAMPolicy(DEV)").unwrap();
    graph.add_dependency("PermissionSet", "IAMPolicy(TESTING)").unwrap();
    graph.add_dependency("Pipeline", "PermissionSet").unwrap();

    assert_eq!(
        names(&graph),
        vec!["IAMPolicy(DEV)", "IAMPolicy(TESTING)", "PermissionSet", "Pipeline"]
    );
}

#[test]
fn test_root_delegation_before_child_networking() {
    let registry = AccountRegistry::software_engineering();
    let root = registry.resolve("ROOT").unwrap().clone();

    let mut graph = ResourceGraph::new();
    graph.add_node("SERootNetworkingStack", root).unwrap();
    for child in registry.children() {
        let name = format!("SE{}NetworkingStack", child.name);
        graph.add_node(name.clone(), child.clone()).unwrap();
        graph.add_dependency(&name, "SERootNetworkingStack").unwrap();
    }

    let plan = plan(&graph).unwrap();
    assert_eq!(plan.order[0], "SERootNetworkingStack");
    assert_eq!(plan.waves.len(), 2);
    assert_eq!(
        plan.waves[1],
        vec![
            "SEDEVNetworkingStack",
            "SEPRODNetworkingStack",
            "SETESTINGNetworkingStack"
        ]
    );
}

#[test]
fn test_order_is_deterministic() {
    let account = Account::new("DEV", "111111111111", "us-east-2");
    let mut graph = ResourceGraph::new();
    for name in ["e", "d", "c", "b", "a"] {
        graph.add_node(name, account.clone()).unwrap();
    }
    graph.add_dependency("a", "e").unwrap();
    graph.add_dependency("c", "d").unwrap();

    let first = names(&graph);
    for _ in 0..10 {
        assert_eq!(names(&graph), first);
    }
    assert_eq!(first, vec!["b", "d", "c", "e", "a"]);
}

#[test]
fn test_cycle_aborts_ordering() {
    let account = Account::new("ROOT", "654654598073", "us-east-2");
    let mut graph = ResourceGraph::new();
    for name in ["Policies", "PermissionSets", "Pipeline"] {
        graph.add_node(name, account.clone()).unwrap();
    }
    graph.add_dependency("PermissionSets", "Policies").unwrap();
    graph.add_dependency("Pipeline", "PermissionSets").unwrap();
    graph.add_dependency("Policies", "Pipeline").unwrap();

    match plan(&graph) {
        Err(GraphError::CyclicDependency(cycle)) => {
            assert_eq!(cycle.len(), 3);
            assert_eq!(
                cycle.to_string(),
                "PermissionSets -> Policies -> Pipeline -> PermissionSets"
            );
        }
        other => panic!("expected a cycle, got {other:?}"),
    }
}

#[test]
fn test_plan_serializes_for_reports() {
    let account = Account::new("ROOT", "654654598073", "us-east-2");
    let mut graph = ResourceGraph::new();
    graph.add_node("a", account.clone()).unwrap();
    graph.add_node("b", account).unwrap();
    graph.add_dependency("b", "a").unwrap();

    let json = serde_json::to_value(plan(&graph).unwrap()).unwrap();
    assert_eq!(json["order"], serde_json::json!(["a", "b"]));
    assert_eq!(json["waves"], serde_json::json!([["a"], ["b"]]));
}
