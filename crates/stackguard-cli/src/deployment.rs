//! A loaded deployment: everything validation and ordering need.

use stackguard_accounts::AccountRegistry;
use stackguard_graph::{DeploymentPlan, GraphResult, ResourceGraph};
use stackguard_policy::{PermissionSetSpec, TierCatalog};
use stackguard_trust::{audit_permission_sets, InMemorySecretStore, TrustValidator, Violation};

/// Accounts, tiers, stacks, grants, secrets and permission sets of one
/// deployment, built once and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Deployment {
    /// Registered accounts
    pub registry: AccountRegistry,

    /// Tier definitions
    pub tiers: TierCatalog,

    /// Stacks, dependencies and grants
    pub graph: ResourceGraph,

    /// Condition secrets known to exist
    pub secrets: InMemorySecretStore,

    /// SSO permission sets
    pub permission_sets: Vec<PermissionSetSpec>,
}

impl Deployment {
    /// Validate trust grants, then audit permission sets.
    pub fn validate(&self) -> Vec<Violation> {
        let validator = TrustValidator::new(&self.registry, &self.tiers, &self.secrets);
        let mut violations = validator.validate(&self.graph);
        violations.extend(audit_permission_sets(&self.graph, &self.permission_sets));
        violations
    }

    /// Compute the deployment plan.
    pub fn plan(&self) -> GraphResult<DeploymentPlan> {
        stackguard_graph::plan(&self.graph)
    }

    /// Record secrets known to exist, keyed by environment name.
    ///
    /// Registered names are stored under the account's secret scope; other
    /// names are treated as raw account ids.
    pub fn add_secrets<'s, I>(&mut self, secrets: I)
    where
        I: IntoIterator<Item = (&'s str, &'s str)>,
    {
        for (account, key) in secrets {
            let scope = self
                .registry
                .entry(account)
                .map(|entry| entry.account.secret_scope().to_string())
                .unwrap_or_else(|| account.to_string());
            self.secrets.insert(scope, key);
        }
    }
}
