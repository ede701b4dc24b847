//! Resource graph
//!
//! Stacks, the ordering edges between them and the trust grants they
//! declare. The graph is built once during configuration; ordering and
//! validation only ever read it.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use stackguard_accounts::Account;
use stackguard_policy::Capability;

use crate::error::{GraphError, GraphResult};
use crate::grant::{GrantCondition, TrustGrant};
use crate::node::StackNode;

/// Stacks, dependency edges and trust grants.
///
/// # Architecture
///
/// ```text
/// ResourceGraph
///   ├─ nodes:  name → StackNode { account, dependencies, managed_policies }
///   └─ grants: [TrustGrant { grantor, grantee, capability, condition }]
/// ```
///
/// Nodes are kept sorted by name and grants in declaration order, so every
/// query over a graph is deterministic.
///
/// # Example
///
/// ```
/// use stackguard_accounts::Account;
/// use stackguard_graph::ResourceGraph;
///
/// let root = Account::new("ROOT", "654654598073", "us-east-2");
/// let mut graph = ResourceGraph::new();
/// graph.add_node("Policies", root.clone()).unwrap();
/// graph.add_node("Pipeline", root).unwrap();
/// graph.add_dependency("Pipeline", "Policies").unwrap();
///
/// assert!(graph.add_dependency("Pipeline", "Missing").is_err());
/// assert_eq!(graph.dependencies_of("Pipeline").unwrap()[0].name(), "Policies");
/// ```
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceGraph {
    nodes: BTreeMap<String, StackNode>,
    grants: Vec<TrustGrant>,
}

impl ResourceGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a stack.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique stack name
    /// * `account` - Account and region the stack deploys into
    ///
    /// # Returns
    ///
    /// The new node, for setting its description or protection, or
    /// `GraphError::DuplicateNode` if the name is taken
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        account: Account,
    ) -> GraphResult<&mut StackNode> {
        let name = name.into();
        if self.nodes.contains_key(&name) {
            return Err(GraphError::DuplicateNode(name));
        }

        tracing::debug!(stack = %name, account = %account.name, "Declared stack");
        Ok(self
            .nodes
            .entry(name.clone())
            .or_insert_with(|| StackNode::new(name, account)))
    }

    /// Declare that `from` must deploy after `to`.
    ///
    /// Self-dependencies are accepted here and reported as a one-stack
    /// cycle when the graph is ordered.
    pub fn add_dependency(&mut self, from: &str, to: &str) -> GraphResult<()> {
        if !self.nodes.contains_key(to) {
            return Err(GraphError::UnknownNode(to.to_string()));
        }
        let node = self
            .nodes
            .get_mut(from)
            .ok_or_else(|| GraphError::UnknownNode(from.to_string()))?;

        if node.add_dependency(to.to_string()) {
            tracing::debug!(from, to, "Declared dependency");
        }
        Ok(())
    }

    /// Record a trust grant.
    ///
    /// # Returns
    ///
    /// Index of the grant, in declaration order
    pub fn add_trust_grant(
        &mut self,
        grantor: Account,
        grantee: Account,
        capability: Capability,
        condition: Option<GrantCondition>,
    ) -> usize {
        let mut grant = TrustGrant::new(grantor, grantee, capability);
        grant.condition = condition;
        self.push_grant(grant)
    }

    /// Record a fully built grant whose declaring stack, if named, must exist.
    pub fn add_declared_grant(&mut self, grant: TrustGrant) -> GraphResult<usize> {
        if let Some(stack) = &grant.declared_in {
            if !self.nodes.contains_key(stack) {
                return Err(GraphError::UnknownNode(stack.clone()));
            }
        }
        Ok(self.push_grant(grant))
    }

    fn push_grant(&mut self, grant: TrustGrant) -> usize {
        tracing::debug!(grant = %grant, "Declared trust grant");
        self.grants.push(grant);
        self.grants.len() - 1
    }

    /// Record that a stack provisions a customer-managed policy.
    pub fn declare_managed_policy(&mut self, stack: &str, policy: impl Into<String>) -> GraphResult<()> {
        let node = self
            .nodes
            .get_mut(stack)
            .ok_or_else(|| GraphError::UnknownNode(stack.to_string()))?;
        node.add_managed_policy(policy.into());
        Ok(())
    }

    /// Look up a stack.
    pub fn node(&self, name: &str) -> Option<&StackNode> {
        self.nodes.get(name)
    }

    /// Look up a stack for modification.
    pub fn node_mut(&mut self, name: &str) -> Option<&mut StackNode> {
        self.nodes.get_mut(name)
    }

    /// Check if a stack is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// All stacks, sorted by name.
    pub fn nodes(&self) -> impl Iterator<Item = &StackNode> {
        self.nodes.values()
    }

    /// All grants in declaration order.
    pub fn grants(&self) -> &[TrustGrant] {
        &self.grants
    }

    /// Every dependency edge as `(from, to)`, sorted.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.nodes.values().flat_map(|node| {
            node.dependencies()
                .iter()
                .map(move |dep| (node.name(), dep.as_str()))
        })
    }

    /// Stacks `name` directly depends on.
    pub fn dependencies_of(&self, name: &str) -> GraphResult<Vec<&StackNode>> {
        let node = self.require(name)?;
        Ok(node
            .dependencies()
            .iter()
            .filter_map(|dep| self.nodes.get(dep))
            .collect())
    }

    /// Stacks that directly depend on `name`.
    pub fn dependents_of(&self, name: &str) -> GraphResult<Vec<&StackNode>> {
        self.require(name)?;
        Ok(self
            .nodes
            .values()
            .filter(|node| node.dependencies().contains(name))
            .collect())
    }

    /// Every stack reachable from `name` through dependency edges.
    ///
    /// `name` itself is included only if it lies on a cycle.
    pub fn transitive_dependencies(&self, name: &str) -> GraphResult<BTreeSet<String>> {
        let node = self.require(name)?;

        let mut seen = BTreeSet::new();
        let mut stack: Vec<&str> = node.dependencies().iter().map(String::as_str).collect();
        while let Some(current) = stack.pop() {
            if !seen.insert(current.to_string()) {
                continue;
            }
            if let Some(next) = self.nodes.get(current) {
                stack.extend(next.dependencies().iter().map(String::as_str));
            }
        }
        Ok(seen)
    }

    /// Distinct accounts stacks deploy into, ignoring region.
    pub fn accounts(&self) -> Vec<&Account> {
        let mut seen = BTreeSet::new();
        self.nodes
            .values()
            .map(StackNode::account)
            .filter(|account| seen.insert((account.name.as_str(), account.id.as_str())))
            .collect()
    }

    /// Get the count of stacks.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn require(&self, name: &str) -> GraphResult<&StackNode> {
        self.nodes
            .get(name)
            .ok_or_else(|| GraphError::UnknownNode(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> Account {
        Account::new("ROOT", "654654598073", "us-east-2")
    }

    fn dev() -> Account {
        Account::new("DEV", "111111111111", "us-east-2")
    }

    fn sample() -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        graph.add_node("Resources", root()).unwrap();
        graph.add_node("IamDev", dev()).unwrap();
        graph.add_node("Sso", root().in_region("us-east-1")).unwrap();
        graph.add_node("Pipeline", root()).unwrap();
        graph.add_dependency("IamDev", "Resources").unwrap();
        graph.add_dependency("Sso", "IamDev").unwrap();
        graph.add_dependency("Pipeline", "Sso").unwrap();
        graph.add_dependency("Pipeline", "IamDev").unwrap();
        graph
    }

    #[test]
    fn test_add_node_duplicate() {
        let mut graph = sample();
        let err = graph.add_node("Resources", dev()).unwrap_err();
        assert_eq!(err, GraphError::DuplicateNode("Resources".to_string()));
        assert_eq!(graph.node("Resources").unwrap().account(), &root());
    }

    #[test]
    fn test_add_node_sets_metadata() {
        let mut graph = ResourceGraph::new();
        graph
            .add_node("Resources", root())
            .unwrap()
            .set_description("KMS key and configuration secret")
            .set_termination_protection(true);

        let node = graph.node("Resources").unwrap();
        assert_eq!(node.description(), Some("KMS key and configuration secret"));
        assert!(node.termination_protection());
    }

    #[test]
    fn test_add_dependency_unknown_endpoints() {
        let mut graph = sample();
        assert_eq!(
            graph.add_dependency("Ghost", "Resources"),
            Err(GraphError::UnknownNode("Ghost".to_string()))
        );
        assert_eq!(
            graph.add_dependency("Pipeline", "Ghost"),
            Err(GraphError::UnknownNode("Ghost".to_string()))
        );
    }

    #[test]
    fn test_self_dependency_is_accepted() {
        let mut graph = sample();
        graph.add_dependency("Resources", "Resources").unwrap();
        let deps = graph.transitive_dependencies("Resources").unwrap();
        assert!(deps.contains("Resources"));
    }

    #[test]
    fn test_dependency_queries() {
        let graph = sample();

        let deps: Vec<&str> = graph
            .dependencies_of("Pipeline")
            .unwrap()
            .iter()
            .map(|n| n.name())
            .collect();
        assert_eq!(deps, vec!["IamDev", "Sso"]);

        let dependents: Vec<&str> = graph
            .dependents_of("IamDev")
            .unwrap()
            .iter()
            .map(|n| n.name())
            .collect();
        assert_eq!(dependents, vec!["Pipeline", "Sso"]);

        let all = graph.transitive_dependencies("Pipeline").unwrap();
        assert_eq!(
            all.into_iter().collect::<Vec<_>>(),
            vec!["IamDev", "Resources", "Sso"]
        );
        assert!(graph.transitive_dependencies("Ghost").is_err());
    }

    #[test]
    fn test_edges_sorted() {
        let graph = sample();
        let edges: Vec<(&str, &str)> = graph.edges().collect();
        assert_eq!(
            edges,
            vec![
                ("IamDev", "Resources"),
                ("Pipeline", "IamDev"),
                ("Pipeline", "Sso"),
                ("Sso", "IamDev"),
            ]
        );
    }

    #[test]
    fn test_managed_policies() {
        let mut graph = sample();
        graph.declare_managed_policy("IamDev", "SE_DevFullAccess").unwrap();
        assert!(graph.node("IamDev").unwrap().provisions("SE_DevFullAccess"));
        assert!(graph.declare_managed_policy("Ghost", "SE_DevFullAccess").is_err());
    }

    #[test]
    fn test_grants_keep_declaration_order() {
        let mut graph = sample();
        let first = graph.add_trust_grant(root(), dev(), "kms:Decrypt".parse().unwrap(), None);
        let second = graph
            .add_declared_grant(
                TrustGrant::new(root(), dev(), "kms:Encrypt".parse().unwrap()).declared_in("Resources"),
            )
            .unwrap();
        assert_eq!((first, second), (0, 1));
        assert_eq!(graph.grants()[1].capability.to_string(), "kms:Encrypt");

        let err = graph
            .add_declared_grant(TrustGrant::new(root(), dev(), "kms:Encrypt".parse().unwrap()).declared_in("Ghost"))
            .unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_NODE");
        assert_eq!(graph.grants().len(), 2);
    }

    #[test]
    fn test_accounts_ignore_region() {
        let graph = sample();
        let names: Vec<&str> = graph.accounts().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["DEV", "ROOT"]);
    }
}
