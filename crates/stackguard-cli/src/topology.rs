//! Reference topology
//!
//! The software-engineering organization's own stacks: a DevOps resources
//! stack holding the shared KMS key and configuration secret, one IAM
//! policy stack per member account, root and per-account networking, and
//! for DevOps deployments the SSO permission-set and pipeline stacks.

use stackguard_accounts::{Account, AccountRegistry, DeploymentSettings};
use stackguard_graph::{GrantCondition, ResourceGraph, TrustGrant};
use stackguard_policy::{Capability, PermissionSetSpec, TierCatalog, TierKind};

use crate::deployment::Deployment;
use crate::error::ManifestResult;

/// Stack holding the shared KMS key and configuration secret.
pub const RESOURCES_STACK: &str = "SEDevOpsResourcesStack";

/// Stack holding the DNS delegation role in the root account.
pub const ROOT_NETWORKING_STACK: &str = "SERootNetworkingStack";

/// Stack declaring the SSO permission sets.
pub const SSO_STACK: &str = "SEIamSsoPermissionSetStack";

/// Stack holding the IAM CI/CD pipeline.
pub const PIPELINE_STACK: &str = "SEIamPipelineStack";

/// Environment name of the storage-integration partner.
pub const SNOWFLAKE: &str = "SNOWFLAKE";

/// Customer-managed policies every IAM policy stack provisions.
const POLICY_STACK_POLICIES: &[&str] = &[
    "SE_DevOpsFullAccess",
    "SE_DBFullAccess",
    "SE_DevFullAccess",
    "SE_DenyIAMRiskyActions",
    "SE_SnowflakeStorageIntegration",
];

/// Actions child accounts may perform with the shared KMS key.
const KMS_KEY_ACTIONS: &[&str] = &[
    "kms:CreateGrant",
    "kms:Decrypt",
    "kms:DescribeKey",
    "kms:Encrypt",
    "kms:GenerateDataKey*",
    "kms:ReEncrypt*",
];

/// Actions child accounts may perform on the configuration secret.
const CONFIG_SECRET_ACTIONS: &[&str] = &["secretsmanager:GetSecretValue", "secretsmanager:DescribeSecret"];

/// Actions child accounts may perform through the DNS delegation role.
const DELEGATION_ACTIONS: &[&str] = &["sts:AssumeRole", "route53:ChangeResourceRecordSets"];

/// Name of a member account's IAM policy stack (`SEIamDevStack`).
pub fn policy_stack_name(account: &Account) -> String {
    format!("SEIam{}Stack", account.capitalized_name())
}

/// Name of a member account's networking stack (`SEDEVNetworkingStack`).
pub fn networking_stack_name(account: &Account) -> String {
    format!("SE{}NetworkingStack", account.name)
}

/// Secret key holding a member account's external id for the partner role.
///
/// Named after the account id, or the environment name while the account
/// is not provisioned.
pub fn external_id_secret(account: &Account) -> String {
    format!("snowflake-external-id-{}", account.secret_scope())
}

/// Build the reference deployment.
///
/// # Arguments
///
/// * `settings` - Job role and SSO region decide which stacks exist
///
/// # Returns
///
/// The deployment, with the storage-integration partner registered as an
/// external account and no secrets recorded
pub fn reference_topology(settings: &DeploymentSettings) -> ManifestResult<Deployment> {
    let mut registry = AccountRegistry::software_engineering();
    registry.register(
        Account::new(SNOWFLAKE, "TBD", settings.default_region.clone()),
        TierKind::External,
    )?;

    let root = registry.resolve("ROOT")?.clone();
    let snowflake = registry.resolve(SNOWFLAKE)?.clone();
    let children: Vec<Account> = registry.children().into_iter().cloned().collect();

    let mut graph = ResourceGraph::new();
    graph
        .add_node(RESOURCES_STACK, root.clone())?
        .set_description("This stack contains important resources for DevOps management in SE.")
        .set_termination_protection(true);
    graph
        .add_node(ROOT_NETWORKING_STACK, root.clone())?
        .set_description("This stack contains the DNS delegation role for SE member accounts.")
        .set_termination_protection(true);

    let mut policy_stacks = Vec::with_capacity(children.len());
    for child in &children {
        let policy_stack = policy_stack_name(child);
        graph
            .add_node(&policy_stack, child.clone())?
            .set_description(format!(
                "This stack contains IAM policies for the SE {} account.",
                child.name
            ))
            .set_termination_protection(true);
        graph.add_dependency(&policy_stack, RESOURCES_STACK)?;
        for policy in POLICY_STACK_POLICIES {
            graph.declare_managed_policy(&policy_stack, *policy)?;
        }
        graph.declare_managed_policy(&policy_stack, format!("SE_CUSTOM_{}", child.name))?;

        let networking_stack = networking_stack_name(child);
        graph
            .add_node(&networking_stack, child.clone())?
            .set_description(format!(
                "This stack contains certificates, DNS records and API gateways for the SE {} account.",
                child.name
            ));
        graph.add_dependency(&networking_stack, ROOT_NETWORKING_STACK)?;

        for (actions, stack) in [
            (KMS_KEY_ACTIONS, RESOURCES_STACK),
            (CONFIG_SECRET_ACTIONS, RESOURCES_STACK),
            (DELEGATION_ACTIONS, ROOT_NETWORKING_STACK),
        ] {
            for action in actions {
                let grant = TrustGrant::new(root.clone(), child.clone(), Capability::parse(action)?)
                    .declared_in(stack);
                graph.add_declared_grant(grant)?;
            }
        }

        let partner = TrustGrant::new(child.clone(), snowflake.clone(), Capability::parse("sts:AssumeRole")?)
            .with_condition(GrantCondition::secret("sts:ExternalId", external_id_secret(child)))
            .declared_in(&policy_stack);
        graph.add_declared_grant(partner)?;

        policy_stacks.push(policy_stack);
    }

    let mut permission_sets = Vec::new();
    if settings.job_role.is_devops() {
        graph
            .add_node(SSO_STACK, root.in_region(settings.sso_region()))?
            .set_description("This stack contains SSO Permission Sets for SE accounts.")
            .set_termination_protection(true);
        graph
            .add_node(PIPELINE_STACK, root.clone())?
            .set_description("This stack contains the CI/CD pipeline for IAM permissions.")
            .set_termination_protection(true);
        graph.add_dependency(PIPELINE_STACK, SSO_STACK)?;
        for policy_stack in &policy_stacks {
            graph.add_dependency(SSO_STACK, policy_stack)?;
            graph.add_dependency(PIPELINE_STACK, policy_stack)?;
        }
        permission_sets = PermissionSetSpec::reference_sets(SSO_STACK);
    }

    for account in registry.unprovisioned() {
        tracing::warn!(account = %account.name, "Reference account is not provisioned yet");
    }
    tracing::info!(
        job_role = %settings.job_role,
        stacks = graph.len(),
        grants = graph.grants().len(),
        "Built reference topology"
    );

    Ok(Deployment {
        registry,
        tiers: TierCatalog::builtin(),
        graph,
        permission_sets,
        ..Deployment::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackguard_accounts::JobRole;
    use stackguard_trust::ViolationKind;

    fn settings(role: JobRole) -> DeploymentSettings {
        DeploymentSettings {
            job_role: role,
            sso_region: Some("us-east-1".to_string()),
            ..DeploymentSettings::default()
        }
    }

    #[test]
    fn test_engineer_topology() {
        let deployment = reference_topology(&settings(JobRole::Engineer)).unwrap();
        assert_eq!(deployment.graph.len(), 8);
        assert!(!deployment.graph.contains(SSO_STACK));
        assert!(deployment.permission_sets.is_empty());
        // 10 grants from ROOT and 1 partner grant per member account
        assert_eq!(deployment.graph.grants().len(), 33);
    }

    #[test]
    fn test_devops_topology_order() {
        let deployment = reference_topology(&settings(JobRole::DevOps)).unwrap();
        let plan = deployment.plan().unwrap();

        let position = |name: &str| plan.order.iter().position(|n| n == name).unwrap();
        assert!(position(RESOURCES_STACK) < position("SEIamDevStack"));
        assert!(position("SEIamDevStack") < position(SSO_STACK));
        assert!(position("SEIamProdStack") < position(SSO_STACK));
        assert!(position(SSO_STACK) < position(PIPELINE_STACK));
        assert!(position(ROOT_NETWORKING_STACK) < position("SEDEVNetworkingStack"));

        assert_eq!(plan.waves[0], vec![RESOURCES_STACK, ROOT_NETWORKING_STACK]);
        assert_eq!(plan.waves.last().unwrap(), &vec![PIPELINE_STACK.to_string()]);
        assert_eq!(
            deployment.graph.node(SSO_STACK).unwrap().account().region,
            "us-east-1"
        );
    }

    #[test]
    fn test_reference_findings() {
        let mut deployment = reference_topology(&settings(JobRole::DevOps)).unwrap();

        let violations = deployment.validate();
        let missing_secrets = violations
            .iter()
            .filter(|v| v.kind == ViolationKind::MissingConditionSecret)
            .count();
        assert_eq!(missing_secrets, 3);
        let unresolved: Vec<&str> = violations
            .iter()
            .filter(|v| v.kind == ViolationKind::UnresolvedPolicyReference)
            .map(|v| v.subject.as_str())
            .collect();
        assert_eq!(unresolved, vec!["SE_ROOT"]);
        assert_eq!(violations.len(), 4);

        let keys: Vec<(String, String)> = deployment
            .registry
            .children()
            .into_iter()
            .map(|child| (child.name.clone(), external_id_secret(child)))
            .collect();
        deployment.add_secrets(keys.iter().map(|(a, k)| (a.as_str(), k.as_str())));
        assert_eq!(deployment.validate().len(), 1);
    }

    #[test]
    fn test_unprovisioned_children_keep_separate_secrets() {
        let mut deployment = reference_topology(&settings(JobRole::Engineer)).unwrap();
        let dev = deployment.registry.resolve("DEV").unwrap().clone();
        deployment.add_secrets([("DEV", external_id_secret(&dev).as_str())]);

        let missing: Vec<String> = deployment
            .validate()
            .into_iter()
            .filter(|v| v.kind == ViolationKind::MissingConditionSecret)
            .map(|v| v.subject)
            .collect();
        assert_eq!(missing.len(), 2);
        assert!(missing.iter().all(|subject| !subject.starts_with("DEV ")));
    }

    #[test]
    fn test_stack_names() {
        let dev = Account::new("DEV", "TBD", "us-east-2");
        assert_eq!(policy_stack_name(&dev), "SEIamDevStack");
        assert_eq!(networking_stack_name(&dev), "SEDEVNetworkingStack");
        assert_eq!(external_id_secret(&dev), "snowflake-external-id-DEV");
        let prod = Account::new("PROD", "333333333333", "us-east-2");
        assert_eq!(external_id_secret(&prod), "snowflake-external-id-333333333333");
    }
}
