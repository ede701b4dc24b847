//! Stack nodes

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use stackguard_accounts::Account;

/// An independently deployable stack.
///
/// Dependencies are stored by name and can only be added through
/// [`ResourceGraph::add_dependency`](crate::ResourceGraph::add_dependency),
/// which checks both endpoints exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackNode {
    name: String,
    account: Account,
    dependencies: BTreeSet<String>,
    description: Option<String>,
    termination_protection: bool,
    managed_policies: BTreeSet<String>,
}

impl StackNode {
    pub(crate) fn new(name: String, account: Account) -> Self {
        Self {
            name,
            account,
            dependencies: BTreeSet::new(),
            description: None,
            termination_protection: false,
            managed_policies: BTreeSet::new(),
        }
    }

    /// Stack name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Account (and region) the stack deploys into.
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Names of stacks that must deploy before this one.
    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    /// Human-readable description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether the stack is protected against deletion.
    pub fn termination_protection(&self) -> bool {
        self.termination_protection
    }

    /// Customer-managed policies this stack provisions.
    pub fn managed_policies(&self) -> &BTreeSet<String> {
        &self.managed_policies
    }

    /// Check if this stack provisions a managed policy.
    pub fn provisions(&self, policy: &str) -> bool {
        self.managed_policies.contains(policy)
    }

    /// Set the description.
    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    /// Enable or disable termination protection.
    pub fn set_termination_protection(&mut self, enabled: bool) -> &mut Self {
        self.termination_protection = enabled;
        self
    }

    pub(crate) fn add_dependency(&mut self, name: String) -> bool {
        self.dependencies.insert(name)
    }

    pub(crate) fn add_managed_policy(&mut self, policy: String) -> bool {
        self.managed_policies.insert(policy)
    }
}

impl std::fmt::Display for StackNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.name, self.account.name)
    }
}
