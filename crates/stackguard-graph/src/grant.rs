//! Cross-account trust grants
//!
//! A grant records one account authorizing another to act on its
//! resources: assume a role, use a key, read a secret. A grant may be
//! conditioned, typically on an external id held in a secret.

use serde::{Deserialize, Serialize};
use stackguard_accounts::Account;
use stackguard_policy::Capability;

/// How a condition value is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConditionOperator {
    /// Exact string match
    #[default]
    StringEquals,

    /// Glob string match
    StringLike,
}

impl ConditionOperator {
    /// Get the IAM operator name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionOperator::StringEquals => "StringEquals",
            ConditionOperator::StringLike => "StringLike",
        }
    }

    /// Parse an IAM operator name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "stringequals" => Some(ConditionOperator::StringEquals),
            "stringlike" => Some(ConditionOperator::StringLike),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The right-hand side of a condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionValue {
    /// A value written inline
    Literal(String),

    /// A value read from the grantor's secret store under this key
    Secret(String),
}

/// A key-value constraint on a grant (e.g. `sts:ExternalId`).
///
/// # Example
///
/// ```
/// use stackguard_graph::GrantCondition;
///
/// let condition = GrantCondition::secret("sts:ExternalId", "snowflake-external-id-111111111111");
/// assert_eq!(condition.secret_key(), Some("snowflake-external-id-111111111111"));
/// assert_eq!(
///     condition.to_string(),
///     "StringEquals sts:ExternalId = secret(snowflake-external-id-111111111111)"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantCondition {
    /// Comparison operator
    #[serde(default)]
    pub operator: ConditionOperator,

    /// Condition key
    pub key: String,

    /// Expected value
    pub value: ConditionValue,
}

impl GrantCondition {
    /// A `StringEquals` condition against a literal value.
    pub fn literal(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            operator: ConditionOperator::StringEquals,
            key: key.into(),
            value: ConditionValue::Literal(value.into()),
        }
    }

    /// A `StringEquals` condition against a secret.
    pub fn secret(key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            operator: ConditionOperator::StringEquals,
            key: key.into(),
            value: ConditionValue::Secret(secret_key.into()),
        }
    }

    /// Replace the operator.
    pub fn with_operator(mut self, operator: ConditionOperator) -> Self {
        self.operator = operator;
        self
    }

    /// The secret this condition reads, if any.
    pub fn secret_key(&self) -> Option<&str> {
        match &self.value {
            ConditionValue::Secret(key) => Some(key),
            ConditionValue::Literal(_) => None,
        }
    }
}

impl std::fmt::Display for GrantCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            ConditionValue::Literal(value) => {
                write!(f, "{} {} = \"{}\"", self.operator, self.key, value)
            }
            ConditionValue::Secret(key) => {
                write!(f, "{} {} = secret({})", self.operator, self.key, key)
            }
        }
    }
}

/// One account authorizing another to use a capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustGrant {
    /// Account that owns the resource and issues the grant
    pub grantor: Account,

    /// Account receiving access
    pub grantee: Account,

    /// What the grantee may do
    pub capability: Capability,

    /// Constraint the grantee must satisfy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<GrantCondition>,

    /// Stack that declares the grant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_in: Option<String>,
}

impl TrustGrant {
    /// Create an unconditional grant.
    pub fn new(grantor: Account, grantee: Account, capability: Capability) -> Self {
        Self {
            grantor,
            grantee,
            capability,
            condition: None,
            declared_in: None,
        }
    }

    /// Attach a condition.
    pub fn with_condition(mut self, condition: GrantCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Record the declaring stack.
    pub fn declared_in(mut self, stack: impl Into<String>) -> Self {
        self.declared_in = Some(stack.into());
        self
    }

    /// Check if the grant crosses an account boundary.
    pub fn is_cross_account(&self) -> bool {
        self.grantor.name != self.grantee.name || self.grantor.id != self.grantee.id
    }
}

impl std::fmt::Display for TrustGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {}: {}",
            self.grantor.name, self.grantee.name, self.capability
        )?;
        if let Some(condition) = &self.condition {
            write!(f, " when {condition}")?;
        }
        Ok(())
    }
}
