//! Permission tiers
//!
//! This module defines the permission tiers assigned to accounts and the
//! allow/deny capability sets each tier carries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::capability::Capability;
use crate::capability_set::CapabilitySet;
use crate::document::PolicyDocument;
use crate::error::{PolicyError, PolicyResult};

/// Managed policy denying risky IAM and organization actions.
///
/// Attached to every human-facing tier.
pub const DENY_IAM_RISKY_ACTIONS: &[&str] = &[
    "iam:CreateUser",
    "iam:DeleteUser",
    "iam:CreateLoginProfile",
    "iam:UpdateLoginProfile",
    "iam:DeleteLoginProfile",
    "iam:ChangePassword",
    "iam:CreateAccessKey",
    "iam:UpdateAccountPasswordPolicy",
    "iam:DeleteAccountPasswordPolicy",
    "iam:UpdateAccountName",
    "organizations:*",
    "account:*",
];

/// AWS-managed `ReadOnlyAccess`, reduced to its action families.
pub const READ_ONLY_ACCESS: &[&str] = &["*:Describe*", "*:Get*", "*:List*"];

/// Cross-account key, secret and DNS delegation actions child accounts consume.
const SHARED_RESOURCE_ACCESS: &[&str] = &[
    "kms:CreateGrant",
    "kms:Decrypt",
    "kms:DescribeKey",
    "kms:Encrypt",
    "kms:GenerateDataKey*",
    "kms:ReEncrypt*",
    "secretsmanager:GetSecretValue",
    "secretsmanager:DescribeSecret",
    "sts:AssumeRole",
    "route53:ChangeResourceRecordSets",
    "route53:GetChange",
];

const DEV_FULL_ACCESS: &[&str] = &[
    "codepipeline:*",
    "codebuild:*",
    "codecommit:*",
    "cloudformation:*",
    "lambda:*",
    "apigateway:*",
    "logs:*",
    "cloudwatch:*",
    "rds:*",
    "dynamodb:*",
    "s3:*",
    "redshift:*",
    "backup:*",
    "kms:*",
    "secretsmanager:GetSecretValue",
    "secretsmanager:DescribeSecret",
    "sts:AssumeRole",
    "route53:*",
    "acm:*",
    "ses:*",
    "sns:*",
    "ssm:*",
    "ec2:*",
];

const DEVOPS_FULL_ACCESS: &[&str] = &[
    "codepipeline:*",
    "codebuild:*",
    "codecommit:*",
    "cloudformation:*",
    "sns:*",
    "sts:AssumeRole",
    "s3:*",
];

const EXTERNAL_STORAGE_INTEGRATION: &[&str] = &[
    "sts:AssumeRole",
    "s3:GetObject",
    "s3:GetObjectVersion",
    "s3:PutObject",
    "s3:DeleteObject",
    "s3:ListBucket",
    "s3:GetBucketLocation",
];

const EXTERNAL_DENY: &[&str] = &["iam:*", "kms:*", "organizations:*"];

/// Permission tier of an account or role.
///
/// # Examples
///
/// ```
/// use stackguard_policy::TierKind;
///
/// assert_eq!(TierKind::parse("dev-ops"), Some(TierKind::DevOps));
/// assert_eq!(TierKind::parse("PROD"), Some(TierKind::Prod));
/// assert_eq!(TierKind::Root.as_str(), "root");
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    /// Development accounts
    Dev,

    /// Testing accounts
    Testing,

    /// Production accounts
    Prod,

    /// Management (organization root) account
    Root,

    /// CI/CD operators
    #[serde(rename = "devops", alias = "dev_ops", alias = "dev-ops")]
    DevOps,

    /// Principals outside the organization
    External,
}

impl TierKind {
    /// Parse tier from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "dev" | "development" => Some(TierKind::Dev),
            "testing" | "test" => Some(TierKind::Testing),
            "prod" | "production" => Some(TierKind::Prod),
            "root" | "management" => Some(TierKind::Root),
            "devops" => Some(TierKind::DevOps),
            "external" => Some(TierKind::External),
            _ => None,
        }
    }

    /// Get string representation of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            TierKind::Dev => "dev",
            TierKind::Testing => "testing",
            TierKind::Prod => "prod",
            TierKind::Root => "root",
            TierKind::DevOps => "devops",
            TierKind::External => "external",
        }
    }

    /// Get a human-readable display name for the tier.
    pub fn display_name(&self) -> &'static str {
        match self {
            TierKind::Dev => "Development",
            TierKind::Testing => "Testing",
            TierKind::Prod => "Production",
            TierKind::Root => "Root",
            TierKind::DevOps => "DevOps",
            TierKind::External => "External",
        }
    }

    /// Get all tiers.
    pub fn all() -> Vec<Self> {
        vec![
            TierKind::Dev,
            TierKind::Testing,
            TierKind::Prod,
            TierKind::Root,
            TierKind::DevOps,
            TierKind::External,
        ]
    }

    /// Check if this tier belongs to an account inside the organization.
    pub fn is_internal(&self) -> bool {
        !matches!(self, TierKind::External)
    }

    /// Get the built-in allow/deny sets for this tier.
    ///
    /// # Returns
    ///
    /// A `PermissionTier` mirroring the organization's managed policies
    pub fn default_tier(&self) -> PermissionTier {
        let (allow, deny): (Vec<&str>, &[&str]) = match self {
            TierKind::Dev => (
                [DEV_FULL_ACCESS, READ_ONLY_ACCESS].concat(),
                DENY_IAM_RISKY_ACTIONS,
            ),
            TierKind::Testing | TierKind::Prod => (
                [SHARED_RESOURCE_ACCESS, READ_ONLY_ACCESS].concat(),
                DENY_IAM_RISKY_ACTIONS,
            ),
            TierKind::Root => (vec!["*"], DENY_IAM_RISKY_ACTIONS),
            TierKind::DevOps => (
                [DEVOPS_FULL_ACCESS, READ_ONLY_ACCESS].concat(),
                DENY_IAM_RISKY_ACTIONS,
            ),
            TierKind::External => (EXTERNAL_STORAGE_INTEGRATION.to_vec(), EXTERNAL_DENY),
        };

        PermissionTier {
            kind: *self,
            allow: builtin_set(&allow),
            deny: builtin_set(deny),
        }
    }
}

impl std::fmt::Display for TierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Built-in patterns are compile-time constants; entries that fail to parse
/// are a programming error caught by the tier tests.
fn builtin_set(patterns: &[&str]) -> CapabilitySet {
    patterns
        .iter()
        .filter_map(|p| Capability::parse(p).ok())
        .collect()
}

/// Result of evaluating a capability against a tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Covered by an allow pattern and untouched by every deny pattern.
    Allow,

    /// Overlaps a deny pattern. Wins over any allow.
    ExplicitDeny,

    /// Not covered by any allow pattern.
    ImplicitDeny,
}

impl Decision {
    /// Check if the decision permits the capability.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Allowed and denied capability patterns for a tier.
///
/// Deny patterns always take precedence over allow patterns.
///
/// # Examples
///
/// ```
/// use stackguard_policy::{Decision, TierKind};
///
/// let root = TierKind::Root.default_tier();
/// assert_eq!(root.evaluate(&"kms:Decrypt".parse().unwrap()), Decision::Allow);
/// assert_eq!(root.evaluate(&"iam:CreateUser".parse().unwrap()), Decision::ExplicitDeny);
///
/// let prod = TierKind::Prod.default_tier();
/// assert_eq!(prod.evaluate(&"ec2:RunInstances".parse().unwrap()), Decision::ImplicitDeny);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionTier {
    /// The tier these rules belong to
    pub kind: TierKind,

    /// Patterns the tier may exercise or hand out
    pub allow: CapabilitySet,

    /// Patterns the tier may never exercise or hand out
    pub deny: CapabilitySet,
}

impl PermissionTier {
    /// Create an empty tier (everything implicitly denied).
    pub fn new(kind: TierKind) -> Self {
        Self {
            kind,
            allow: CapabilitySet::new(),
            deny: CapabilitySet::new(),
        }
    }

    /// Create a tier from allow/deny pattern strings.
    pub fn from_patterns<S: AsRef<str>>(kind: TierKind, allow: &[S], deny: &[S]) -> PolicyResult<Self> {
        Ok(Self {
            kind,
            allow: CapabilitySet::from_strings(allow)?,
            deny: CapabilitySet::from_strings(deny)?,
        })
    }

    /// Create a tier by folding IAM policy documents together.
    ///
    /// `Allow` statements extend the allow set, `Deny` statements the deny set.
    pub fn from_documents<'a, I>(kind: TierKind, documents: I) -> PolicyResult<Self>
    where
        I: IntoIterator<Item = &'a PolicyDocument>,
    {
        let mut tier = Self::new(kind);
        for document in documents {
            let (allow, deny) = document.capability_sets()?;
            tier.allow.merge(&allow);
            tier.deny.merge(&deny);
        }
        Ok(tier)
    }

    /// Evaluate a capability against this tier.
    pub fn evaluate(&self, capability: &Capability) -> Decision {
        if self.denies(capability) {
            Decision::ExplicitDeny
        } else if self.allow.covers(capability) {
            Decision::Allow
        } else {
            Decision::ImplicitDeny
        }
    }

    /// Check if any deny pattern overlaps the capability.
    pub fn denies(&self, capability: &Capability) -> bool {
        self.deny.overlapping(capability).is_some()
    }

    /// Check if the allow set covers the capability, ignoring denies.
    pub fn allows(&self, capability: &Capability) -> bool {
        self.allow.covers(capability)
    }

    /// Check if the tier permits the capability.
    pub fn permits(&self, capability: &Capability) -> bool {
        self.evaluate(capability).is_allowed()
    }
}

/// Tier definitions keyed by kind.
///
/// # Examples
///
/// ```
/// use stackguard_policy::{TierCatalog, TierKind};
///
/// let catalog = TierCatalog::builtin();
/// assert!(catalog.get(TierKind::Dev).is_some());
/// assert_eq!(catalog.len(), 6);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TierCatalog {
    tiers: BTreeMap<TierKind, PermissionTier>,
}

impl TierCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            tiers: BTreeMap::new(),
        }
    }

    /// Create a catalog holding the built-in definition of every tier.
    pub fn builtin() -> Self {
        TierKind::all()
            .into_iter()
            .map(|kind| kind.default_tier())
            .collect()
    }

    /// Insert or replace a tier definition.
    ///
    /// # Returns
    ///
    /// The previous definition, if one existed
    pub fn insert(&mut self, tier: PermissionTier) -> Option<PermissionTier> {
        self.tiers.insert(tier.kind, tier)
    }

    /// Get the definition for a tier.
    pub fn get(&self, kind: TierKind) -> Option<&PermissionTier> {
        self.tiers.get(&kind)
    }

    /// Get the definition for a tier by name.
    pub fn get_by_name(&self, name: &str) -> PolicyResult<&PermissionTier> {
        TierKind::parse(name)
            .and_then(|kind| self.get(kind))
            .ok_or_else(|| PolicyError::UnknownTier(name.to_string()))
    }

    /// Iterate over definitions ordered by kind.
    pub fn iter(&self) -> impl Iterator<Item = &PermissionTier> {
        self.tiers.values()
    }

    /// Get the count of definitions.
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

impl FromIterator<PermissionTier> for TierCatalog {
    fn from_iter<T: IntoIterator<Item = PermissionTier>>(iter: T) -> Self {
        let mut catalog = TierCatalog::new();
        for tier in iter {
            catalog.insert(tier);
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(s: &str) -> Capability {
        Capability::parse(s).unwrap()
    }

    #[test]
    fn test_builtin_patterns_all_parse() {
        let lists: [&[&str]; 7] = [
            DENY_IAM_RISKY_ACTIONS,
            READ_ONLY_ACCESS,
            SHARED_RESOURCE_ACCESS,
            DEV_FULL_ACCESS,
            DEVOPS_FULL_ACCESS,
            EXTERNAL_STORAGE_INTEGRATION,
            EXTERNAL_DENY,
        ];
        for list in lists {
            for pattern in list {
                assert!(Capability::parse(pattern).is_ok(), "bad builtin pattern {pattern}");
            }
        }
    }

    #[test]
    fn test_tier_parsing() {
        assert_eq!(TierKind::parse("dev"), Some(TierKind::Dev));
        assert_eq!(TierKind::parse("Production"), Some(TierKind::Prod));
        assert_eq!(TierKind::parse("dev_ops"), Some(TierKind::DevOps));
        assert_eq!(TierKind::parse("external"), Some(TierKind::External));
        assert_eq!(TierKind::parse("invalid"), None);
    }

    #[test]
    fn test_deny_wins_over_allow() {
        let tier = PermissionTier::from_patterns(TierKind::Root, &["kms:*"], &["kms:Decrypt"]).unwrap();
        assert_eq!(tier.evaluate(&cap("kms:Decrypt")), Decision::ExplicitDeny);
        assert_eq!(tier.evaluate(&cap("kms:Encrypt")), Decision::Allow);
        assert!(tier.allows(&cap("kms:Decrypt")));
        assert!(!tier.permits(&cap("kms:Decrypt")));
    }

    #[test]
    fn test_wildcard_grant_blocked_by_partial_deny() {
        let root = TierKind::Root.default_tier();
        assert_eq!(root.evaluate(&cap("iam:*")), Decision::ExplicitDeny);
        assert_eq!(root.evaluate(&cap("iam:GetRole")), Decision::Allow);
    }

    #[test]
    fn test_prod_tier_is_read_mostly() {
        let prod = TierKind::Prod.default_tier();
        assert!(prod.permits(&cap("s3:GetObject")));
        assert!(prod.permits(&cap("kms:GenerateDataKey*")));
        assert!(!prod.permits(&cap("s3:PutObject")));
        assert_eq!(prod.evaluate(&cap("iam:CreateAccessKey")), Decision::ExplicitDeny);
    }

    #[test]
    fn test_external_tier() {
        let external = TierKind::External.default_tier();
        assert!(external.permits(&cap("sts:AssumeRole")));
        assert!(external.denies(&cap("kms:Decrypt")));
        assert!(!TierKind::External.is_internal());
    }

    #[test]
    fn test_catalog_insert_replaces() {
        let mut catalog = TierCatalog::builtin();
        let previous = catalog.insert(PermissionTier::new(TierKind::Dev));
        assert!(previous.is_some());
        assert!(catalog.get(TierKind::Dev).unwrap().allow.is_empty());
        assert_eq!(catalog.len(), 6);
    }

    #[test]
    fn test_catalog_get_by_name() {
        let catalog = TierCatalog::builtin();
        assert_eq!(catalog.get_by_name("ROOT").unwrap().kind, TierKind::Root);

        let err = catalog.get_by_name("sandbox").unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_TIER");
    }
}
