//! Trust validator
//!
//! Checks every trust grant in a graph against the account registry, the
//! tier catalog and the secret oracle. Checks run per grant in this order:
//!
//! 1. Both accounts are registered (name and id match)
//! 2. Neither party's tier denies the capability, and the grantor's tier
//!    allows it
//! 3. A secret the condition reads exists in the grantor's store
//!
//! Tier checks only consult the tiers of registered parties: an unknown
//! grantee still leaves the grantor's allow and deny checks in place.
//! Nothing short-circuits across grants: one run reports every problem.

use stackguard_accounts::{Account, AccountRegistry};
use stackguard_graph::{ResourceGraph, TrustGrant};
use stackguard_policy::{PermissionTier, TierCatalog, TierKind};
use tracing::instrument;

use crate::secrets::SecretOracle;
use crate::violation::{Violation, ViolationKind};

/// Validates trust grants.
///
/// # Example
///
/// ```
/// use stackguard_accounts::AccountRegistry;
/// use stackguard_graph::ResourceGraph;
/// use stackguard_policy::TierCatalog;
/// use stackguard_trust::{InMemorySecretStore, TrustValidator, ViolationKind};
///
/// let registry = AccountRegistry::software_engineering();
/// let tiers = TierCatalog::builtin();
/// let secrets = InMemorySecretStore::new();
///
/// let root = registry.resolve("ROOT").unwrap().clone();
/// let prod = registry.resolve("PROD").unwrap().clone();
///
/// let mut graph = ResourceGraph::new();
/// graph.add_trust_grant(root.clone(), prod.clone(), "kms:Decrypt".parse().unwrap(), None);
/// graph.add_trust_grant(prod, root, "ec2:RunInstances".parse().unwrap(), None);
///
/// let violations = TrustValidator::new(&registry, &tiers, &secrets).validate(&graph);
/// assert_eq!(violations.len(), 1);
/// assert_eq!(violations[0].kind, ViolationKind::UnauthorizedCapability);
/// assert_eq!(violations[0].grant, Some(1));
/// ```
pub struct TrustValidator<'a> {
    registry: &'a AccountRegistry,
    tiers: &'a TierCatalog,
    secrets: &'a dyn SecretOracle,
}

/// Which side of a grant an account is on.
#[derive(Debug, Clone, Copy)]
enum Party {
    Grantor,
    Grantee,
}

impl Party {
    fn as_str(&self) -> &'static str {
        match self {
            Party::Grantor => "grantor",
            Party::Grantee => "grantee",
        }
    }
}

impl<'a> TrustValidator<'a> {
    /// Create a validator.
    ///
    /// # Arguments
    ///
    /// * `registry` - Registered accounts and their tiers
    /// * `tiers` - Allow/deny definitions per tier
    /// * `secrets` - Oracle answering whether condition secrets exist
    pub fn new(
        registry: &'a AccountRegistry,
        tiers: &'a TierCatalog,
        secrets: &'a dyn SecretOracle,
    ) -> Self {
        Self {
            registry,
            tiers,
            secrets,
        }
    }

    /// Validate every grant in the graph.
    ///
    /// # Returns
    ///
    /// All violations, grouped by grant in declaration order
    #[instrument(skip_all, fields(grants = graph.grants().len()))]
    pub fn validate(&self, graph: &ResourceGraph) -> Vec<Violation> {
        let violations: Vec<Violation> = graph
            .grants()
            .iter()
            .enumerate()
            .flat_map(|(index, grant)| self.check_grant(index, grant))
            .collect();

        tracing::info!(
            grants = graph.grants().len(),
            violations = violations.len(),
            "Validated trust grants"
        );
        violations
    }

    /// Run every check against one grant.
    pub fn check_grant(&self, index: usize, grant: &TrustGrant) -> Vec<Violation> {
        tracing::debug!(index, %grant, "Checking trust grant");

        let subject = grant.to_string();
        let mut violations = Vec::new();

        let grantor_known = self.check_account(&grant.grantor, Party::Grantor, &subject, &mut violations);
        let grantee_known = self.check_account(&grant.grantee, Party::Grantee, &subject, &mut violations);

        self.check_tiers(grant, grantor_known, grantee_known, &subject, &mut violations);
        self.check_condition(grant, &subject, &mut violations);

        for violation in &mut violations {
            violation.grant = Some(index);
            tracing::warn!(code = violation.code(), grant = index, "{}", violation.message);
        }
        violations
    }

    fn check_account(
        &self,
        account: &Account,
        party: Party,
        subject: &str,
        violations: &mut Vec<Violation>,
    ) -> bool {
        if self.registry.contains(account) {
            return true;
        }

        let message = match self.registry.entry(&account.name) {
            Some(entry) => format!(
                "{} {} has account id {} but the registry has {}",
                party.as_str(),
                account.name,
                account.id,
                entry.account.id
            ),
            None => format!("{} {} is not a registered account", party.as_str(), account.name),
        };
        violations.push(Violation::new(ViolationKind::UnknownAccount, subject, message));
        false
    }

    fn tier(
        &self,
        account: &Account,
        party: Party,
        subject: &str,
        missing: &mut Vec<TierKind>,
        violations: &mut Vec<Violation>,
    ) -> Option<&'a PermissionTier> {
        let kind = self.registry.tier_of(account)?;
        let tier = self.tiers.get(kind);
        if tier.is_none() && !missing.contains(&kind) {
            missing.push(kind);
            violations.push(Violation::new(
                ViolationKind::MissingTier,
                subject,
                format!(
                    "{} {} is assigned tier {} which has no definition",
                    party.as_str(),
                    account.name,
                    kind
                ),
            ));
        }
        tier
    }

    fn check_tiers(
        &self,
        grant: &TrustGrant,
        grantor_known: bool,
        grantee_known: bool,
        subject: &str,
        violations: &mut Vec<Violation>,
    ) {
        let capability = &grant.capability;
        let mut missing = Vec::new();
        let grantor_tier = if grantor_known {
            self.tier(&grant.grantor, Party::Grantor, subject, &mut missing, violations)
        } else {
            None
        };
        let grantee_tier = if grantee_known {
            self.tier(&grant.grantee, Party::Grantee, subject, &mut missing, violations)
        } else {
            None
        };

        let denial = [(Party::Grantor, grantor_tier), (Party::Grantee, grantee_tier)]
            .into_iter()
            .find_map(|(party, tier)| {
                let tier = tier?;
                tier.deny
                    .overlapping(capability)
                    .map(|pattern| (party, tier.kind, pattern))
            });
        if let Some((party, kind, pattern)) = denial {
            violations.push(Violation::new(
                ViolationKind::DeniedByPolicy,
                subject,
                format!(
                    "{capability} is denied by the {} tier {kind} (pattern {pattern})",
                    party.as_str()
                ),
            ));
        }

        if let Some(tier) = grantor_tier {
            if !tier.allows(capability) {
                violations.push(Violation::new(
                    ViolationKind::UnauthorizedCapability,
                    subject,
                    format!(
                        "{capability} is outside the allow-set of grantor tier {}",
                        tier.kind
                    ),
                ));
            }
        }
    }

    fn check_condition(&self, grant: &TrustGrant, subject: &str, violations: &mut Vec<Violation>) {
        let Some(secret_key) = grant.condition.as_ref().and_then(|c| c.secret_key()) else {
            return;
        };
        if !self.secrets.exists(grant.grantor.secret_scope(), secret_key) {
            violations.push(Violation::new(
                ViolationKind::MissingConditionSecret,
                subject,
                format!(
                    "secret {secret_key} does not exist in account {} ({})",
                    grant.grantor.name, grant.grantor.id
                ),
            ));
        }
    }
}
