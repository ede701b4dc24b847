//! Violations
//!
//! Validation never fails; it returns every problem it finds as a
//! [`Violation`].

use serde::{Deserialize, Serialize};

/// What kind of problem a violation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    /// A grant names an account the registry does not know
    UnknownAccount,

    /// A registered account's tier has no definition
    MissingTier,

    /// The capability is outside the grantor's allow-set
    UnauthorizedCapability,

    /// The capability overlaps a deny pattern of either party
    DeniedByPolicy,

    /// The condition's secret is absent from the grantor's store
    MissingConditionSecret,

    /// A permission set references too many policies
    PermissionSetLimitExceeded,

    /// A permission set's session duration is malformed or out of range
    InvalidSessionDuration,

    /// A permission set names a stack that is not declared
    UnknownNode,

    /// A permission set references a policy no upstream stack provisions
    UnresolvedPolicyReference,
}

impl ViolationKind {
    /// Stable code for reports.
    pub fn code(&self) -> &'static str {
        match self {
            ViolationKind::UnknownAccount => "UNKNOWN_ACCOUNT",
            ViolationKind::MissingTier => "MISSING_TIER",
            ViolationKind::UnauthorizedCapability => "UNAUTHORIZED_CAPABILITY",
            ViolationKind::DeniedByPolicy => "DENIED_BY_POLICY",
            ViolationKind::MissingConditionSecret => "MISSING_CONDITION_SECRET",
            ViolationKind::PermissionSetLimitExceeded => "PERMISSION_SET_LIMIT_EXCEEDED",
            ViolationKind::InvalidSessionDuration => "INVALID_SESSION_DURATION",
            ViolationKind::UnknownNode => "UNKNOWN_NODE",
            ViolationKind::UnresolvedPolicyReference => "UNRESOLVED_POLICY_REFERENCE",
        }
    }

    /// Check if this kind comes from checking a trust grant.
    pub fn is_grant_check(&self) -> bool {
        matches!(
            self,
            ViolationKind::UnknownAccount
                | ViolationKind::MissingTier
                | ViolationKind::UnauthorizedCapability
                | ViolationKind::DeniedByPolicy
                | ViolationKind::MissingConditionSecret
        )
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// One problem found during validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Problem kind
    pub kind: ViolationKind,

    /// Index of the offending grant, for grant checks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant: Option<usize>,

    /// What the violation is about (a grant, account or permission set)
    pub subject: String,

    /// Human-readable explanation
    pub message: String,
}

impl Violation {
    /// Create a violation.
    pub fn new(kind: ViolationKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            grant: None,
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Attach the index of the grant the violation was found on.
    pub fn for_grant(mut self, index: usize) -> Self {
        self.grant = Some(index);
        self
    }

    /// Stable code for reports.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.grant {
            Some(index) => write!(f, "[{}] grant #{} {}: {}", self.kind, index, self.subject, self.message),
            None => write!(f, "[{}] {}: {}", self.kind, self.subject, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_as_code() {
        for kind in [
            ViolationKind::UnknownAccount,
            ViolationKind::DeniedByPolicy,
            ViolationKind::UnresolvedPolicyReference,
        ] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.code());
        }
    }

    #[test]
    fn test_violation_display() {
        let violation = Violation::new(
            ViolationKind::DeniedByPolicy,
            "DEV -> ROOT: kms:Decrypt",
            "denied by root tier pattern kms:Decrypt",
        )
        .for_grant(3);
        assert_eq!(
            violation.to_string(),
            "[DENIED_BY_POLICY] grant #3 DEV -> ROOT: kms:Decrypt: denied by root tier pattern kms:Decrypt"
        );

        let audit = Violation::new(ViolationKind::UnknownNode, "SE_DEV", "stack Sso is not declared");
        assert_eq!(audit.to_string(), "[UNKNOWN_NODE] SE_DEV: stack Sso is not declared");
        assert!(!audit.kind.is_grant_check());
    }
}
