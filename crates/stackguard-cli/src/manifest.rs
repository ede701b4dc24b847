//! Deployment manifests
//!
//! A manifest is a JSON description of accounts, tiers, stacks, grants,
//! secrets and permission sets. Loading it builds a [`Deployment`]; any
//! reference to an undeclared environment or stack fails the load.
//!
//! ```json
//! {
//!   "accounts": [{ "name": "ROOT", "id": "654654598073", "tier": "root" }],
//!   "tiers": [{ "kind": "prod", "documents": ["policies/SE_CUSTOM_PROD.json"] }],
//!   "stacks": [{ "name": "SEIamProdStack", "account": "PROD", "depends_on": [] }],
//!   "grants": [{ "grantor": "ROOT", "grantee": "PROD", "capability": "kms:Decrypt" }],
//!   "secrets": { "PROD": ["snowflake-external-id-333333333333"] },
//!   "permission_sets": []
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stackguard_accounts::{Account, AccountRegistry, DEFAULT_REGION};
use stackguard_graph::{ConditionOperator, ConditionValue, GrantCondition, ResourceGraph, TrustGrant};
use stackguard_policy::{Capability, PermissionSetSpec, PermissionTier, PolicyDocument, TierCatalog, TierKind};

use crate::deployment::Deployment;
use crate::error::{ManifestError, ManifestResult};

/// Top-level manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Accounts in declaration order
    #[serde(default)]
    pub accounts: Vec<AccountSpec>,

    /// Tier overrides; tiers not listed keep their built-in definition
    #[serde(default)]
    pub tiers: Vec<TierSpec>,

    /// Stacks
    #[serde(default)]
    pub stacks: Vec<StackSpec>,

    /// Trust grants
    #[serde(default)]
    pub grants: Vec<GrantSpec>,

    /// Secret keys per environment name
    #[serde(default)]
    pub secrets: BTreeMap<String, Vec<String>>,

    /// SSO permission sets
    #[serde(default)]
    pub permission_sets: Vec<PermissionSetSpec>,
}

/// An account entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSpec {
    /// Environment name
    pub name: String,

    /// AWS account id
    pub id: String,

    /// Default region
    #[serde(default = "default_region")]
    pub region: String,

    /// Permission tier
    pub tier: TierKind,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

/// A tier definition replacing the built-in one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierSpec {
    /// Tier being defined
    pub kind: TierKind,

    /// Allow patterns
    #[serde(default)]
    pub allow: Vec<String>,

    /// Deny patterns
    #[serde(default)]
    pub deny: Vec<String>,

    /// IAM policy documents, relative to the manifest
    #[serde(default)]
    pub documents: Vec<PathBuf>,
}

/// A stack entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackSpec {
    /// Stack name
    pub name: String,

    /// Environment name of the account it deploys into
    pub account: String,

    /// Region override
    #[serde(default)]
    pub region: Option<String>,

    /// Stacks that must deploy first
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Customer-managed policies the stack provisions
    #[serde(default)]
    pub managed_policies: Vec<String>,

    /// Description
    #[serde(default)]
    pub description: Option<String>,

    /// Termination protection
    #[serde(default)]
    pub termination_protection: bool,
}

/// A grant party: an environment name, or a full account for parties
/// outside the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartySpec {
    /// Registered environment name
    Name(String),

    /// Explicit account
    Account(Account),
}

/// A grant entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantSpec {
    /// Account issuing the grant
    pub grantor: PartySpec,

    /// Account receiving it
    pub grantee: PartySpec,

    /// Capability pattern
    pub capability: String,

    /// Declaring stack
    #[serde(default)]
    pub declared_in: Option<String>,

    /// Condition
    #[serde(default)]
    pub condition: Option<ConditionSpec>,
}

/// A grant condition entry; exactly one of `value` and `secret` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionSpec {
    /// Operator, `StringEquals` if omitted
    #[serde(default)]
    pub operator: Option<String>,

    /// Condition key
    pub key: String,

    /// Inline value
    #[serde(default)]
    pub value: Option<String>,

    /// Secret key holding the value
    #[serde(default)]
    pub secret: Option<String>,
}

impl ConditionSpec {
    fn build(&self, grant: usize) -> ManifestResult<GrantCondition> {
        let invalid = |reason: String| ManifestError::InvalidCondition { grant, reason };

        let operator = match &self.operator {
            None => ConditionOperator::default(),
            Some(name) => ConditionOperator::parse(name)
                .ok_or_else(|| invalid(format!("unsupported operator `{name}`")))?,
        };
        let value = match (&self.value, &self.secret) {
            (Some(value), None) => ConditionValue::Literal(value.clone()),
            (None, Some(secret)) => ConditionValue::Secret(secret.clone()),
            (Some(_), Some(_)) => return Err(invalid("both `value` and `secret` are set".to_string())),
            (None, None) => return Err(invalid("one of `value` or `secret` is required".to_string())),
        };

        Ok(GrantCondition {
            operator,
            key: self.key.clone(),
            value,
        })
    }
}

impl Manifest {
    /// Parse a manifest from JSON.
    pub fn from_json(json: &str) -> ManifestResult<Self> {
        serde_json::from_str(json).map_err(|source| ManifestError::Json {
            path: PathBuf::from("<inline>"),
            source,
        })
    }

    /// Read a manifest file.
    pub fn from_path(path: impl AsRef<Path>) -> ManifestResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = serde_json::from_str(&contents).map_err(|source| ManifestError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loaded manifest");
        Ok(manifest)
    }

    /// Read a manifest file and build its deployment, resolving document
    /// paths against the manifest's directory.
    pub fn load(path: impl AsRef<Path>) -> ManifestResult<Deployment> {
        let path = path.as_ref();
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_path(path)?.build(base_dir)
    }

    /// Build the deployment this manifest describes.
    ///
    /// # Arguments
    ///
    /// * `base_dir` - Directory relative document paths are resolved against
    pub fn build(&self, base_dir: &Path) -> ManifestResult<Deployment> {
        let registry = self.build_registry()?;
        let tiers = self.build_tiers(base_dir)?;
        let graph = self.build_graph(&registry)?;

        let mut deployment = Deployment {
            registry,
            tiers,
            graph,
            permission_sets: self.permission_sets.clone(),
            ..Deployment::default()
        };
        for (account, keys) in &self.secrets {
            deployment.registry.resolve(account)?;
            deployment.add_secrets(keys.iter().map(|key| (account.as_str(), key.as_str())));
        }

        tracing::info!(
            accounts = deployment.registry.len(),
            stacks = deployment.graph.len(),
            grants = deployment.graph.grants().len(),
            "Built deployment from manifest"
        );
        Ok(deployment)
    }

    fn build_registry(&self) -> ManifestResult<AccountRegistry> {
        let mut registry = AccountRegistry::new();
        for spec in &self.accounts {
            registry.register(Account::new(&spec.name, &spec.id, &spec.region), spec.tier)?;
        }
        Ok(registry)
    }

    fn build_tiers(&self, base_dir: &Path) -> ManifestResult<TierCatalog> {
        let mut catalog = TierCatalog::builtin();
        for spec in &self.tiers {
            let mut tier = PermissionTier::from_patterns(spec.kind, &spec.allow, &spec.deny)?;

            let documents = spec
                .documents
                .iter()
                .map(|relative| -> ManifestResult<PolicyDocument> {
                    let path = base_dir.join(relative);
                    let document = PolicyDocument::from_path(&path)?;
                    document.check_size(&relative.display().to_string())?;
                    Ok(document)
                })
                .collect::<ManifestResult<Vec<PolicyDocument>>>()?;
            let folded = PermissionTier::from_documents(spec.kind, &documents)?;
            tier.allow.merge(&folded.allow);
            tier.deny.merge(&folded.deny);

            tracing::debug!(tier = %spec.kind, allow = tier.allow.len(), deny = tier.deny.len(), "Defined tier");
            catalog.insert(tier);
        }
        Ok(catalog)
    }

    fn build_graph(&self, registry: &AccountRegistry) -> ManifestResult<ResourceGraph> {
        let mut graph = ResourceGraph::new();

        for spec in &self.stacks {
            let account = registry.resolve(&spec.account)?;
            let account = match &spec.region {
                Some(region) => account.in_region(region),
                None => account.clone(),
            };
            let node = graph.add_node(&spec.name, account)?;
            node.set_termination_protection(spec.termination_protection);
            if let Some(description) = &spec.description {
                node.set_description(description);
            }
        }
        for spec in &self.stacks {
            for dependency in &spec.depends_on {
                graph.add_dependency(&spec.name, dependency)?;
            }
            for policy in &spec.managed_policies {
                graph.declare_managed_policy(&spec.name, policy)?;
            }
        }

        for (index, spec) in self.grants.iter().enumerate() {
            let capability = Capability::parse(&spec.capability)?;
            let mut grant = TrustGrant::new(
                resolve_party(registry, &spec.grantor)?,
                resolve_party(registry, &spec.grantee)?,
                capability,
            );
            if let Some(condition) = &spec.condition {
                grant = grant.with_condition(condition.build(index)?);
            }
            if let Some(stack) = &spec.declared_in {
                grant = grant.declared_in(stack);
            }
            graph.add_declared_grant(grant)?;
        }

        Ok(graph)
    }
}

fn resolve_party(registry: &AccountRegistry, party: &PartySpec) -> ManifestResult<Account> {
    match party {
        PartySpec::Name(name) => Ok(registry.resolve(name)?.clone()),
        PartySpec::Account(account) => Ok(account.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "accounts": [
            { "name": "ROOT", "id": "654654598073", "tier": "root" },
            { "name": "DEV", "id": "111111111111", "tier": "dev" }
        ],
        "stacks": [
            { "name": "Pipeline", "account": "ROOT", "depends_on": ["Policies"] },
            { "name": "Policies", "account": "DEV", "managed_policies": ["SE_DevFullAccess"],
              "description": "IAM policies", "termination_protection": true }
        ],
        "grants": [
            { "grantor": "ROOT", "grantee": "DEV", "capability": "kms:Decrypt", "declared_in": "Pipeline" },
            { "grantor": "DEV", "grantee": { "name": "SNOWFLAKE", "id": "999999999999", "region": "us-west-2" },
              "capability": "sts:AssumeRole",
              "condition": { "key": "sts:ExternalId", "secret": "snowflake-external-id-111111111111" } }
        ],
        "secrets": { "DEV": ["snowflake-external-id-111111111111"] }
    }"#;

    #[test]
    fn test_build_from_json() {
        let deployment = Manifest::from_json(MANIFEST).unwrap().build(Path::new(".")).unwrap();

        assert_eq!(deployment.registry.len(), 2);
        assert_eq!(deployment.tiers.len(), 6);
        assert_eq!(deployment.graph.len(), 2);
        assert_eq!(deployment.graph.grants().len(), 2);

        let policies = deployment.graph.node("Policies").unwrap();
        assert!(policies.termination_protection());
        assert!(policies.provisions("SE_DevFullAccess"));
        assert_eq!(policies.account().region, "us-east-2");

        let grant = &deployment.graph.grants()[1];
        assert_eq!(grant.grantee.name, "SNOWFLAKE");
        assert_eq!(
            grant.condition.as_ref().and_then(|c| c.secret_key()),
            Some("snowflake-external-id-111111111111")
        );
        assert_eq!(deployment.secrets.len(), 1);
    }

    #[test]
    fn test_unregistered_party_reaches_validation() {
        let deployment = Manifest::from_json(MANIFEST).unwrap().build(Path::new(".")).unwrap();
        let violations = deployment.validate();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code(), "UNKNOWN_ACCOUNT");
        assert_eq!(violations[0].grant, Some(1));
    }

    #[test]
    fn test_unknown_environment_is_fatal() {
        let manifest = Manifest::from_json(
            r#"{ "stacks": [{ "name": "Lonely", "account": "STAGING" }] }"#,
        )
        .unwrap();
        let err = manifest.build(Path::new(".")).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_ENVIRONMENT");
    }

    #[test]
    fn test_unknown_dependency_is_fatal() {
        let manifest = Manifest::from_json(
            r#"{
                "accounts": [{ "name": "ROOT", "id": "654654598073", "tier": "root" }],
                "stacks": [{ "name": "Pipeline", "account": "ROOT", "depends_on": ["Ghost"] }]
            }"#,
        )
        .unwrap();
        let err = manifest.build(Path::new(".")).unwrap_err();
        assert!(matches!(err, ManifestError::Graph(_)));
        assert_eq!(err.error_code(), "UNKNOWN_NODE");
    }

    #[test]
    fn test_condition_needs_exactly_one_value() {
        let both = ConditionSpec {
            operator: None,
            key: "sts:ExternalId".to_string(),
            value: Some("a".to_string()),
            secret: Some("b".to_string()),
        };
        assert!(matches!(both.build(4), Err(ManifestError::InvalidCondition { grant: 4, .. })));

        let neither = ConditionSpec {
            value: None,
            secret: None,
            ..both.clone()
        };
        assert!(neither.build(0).is_err());

        let bad_operator = ConditionSpec {
            operator: Some("NumericEquals".to_string()),
            secret: None,
            ..both
        };
        assert_eq!(bad_operator.build(0).unwrap_err().error_code(), "INVALID_CONDITION");
    }

    #[test]
    fn test_invalid_json() {
        let err = Manifest::from_json("{ not json").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_MANIFEST");
    }
}
