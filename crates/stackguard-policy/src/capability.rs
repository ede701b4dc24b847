//! # Capabilities
//!
//! A capability is an IAM action pattern: a service prefix and an action
//! name that may contain `*` wildcards.
//!
//! ```text
//! capability := "*" | service ":" action
//! service    := "*" | [a-z0-9-]+
//! action     := [A-Za-z0-9*]+
//! ```
//!
//! Service prefixes resolve to [`AwsService`] where possible. Matching is
//! case-insensitive, the same way IAM evaluates action names.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{PolicyError, PolicyResult};
use crate::services::AwsService;

/// Service part of a capability.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServiceSelector {
    /// `*`, matches every service.
    Any,
    /// A service from the known set.
    Known(AwsService),
    /// A well-formed prefix outside the known set (stored lowercase).
    Custom(String),
}

impl ServiceSelector {
    /// Parse a service prefix.
    ///
    /// Returns `None` if the prefix is empty, contains a partial wildcard,
    /// or contains characters outside `[a-z0-9-]`.
    pub fn parse(s: &str) -> Option<Self> {
        if s == "*" {
            return Some(ServiceSelector::Any);
        }
        if s.is_empty()
            || !s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return None;
        }
        Some(match AwsService::parse(s) {
            Some(service) => ServiceSelector::Known(service),
            None => ServiceSelector::Custom(s.to_ascii_lowercase()),
        })
    }

    /// Get the prefix as written in a policy.
    pub fn as_str(&self) -> &str {
        match self {
            ServiceSelector::Any => "*",
            ServiceSelector::Known(service) => service.as_str(),
            ServiceSelector::Custom(name) => name,
        }
    }

    /// Check whether every service selected by `other` is selected by `self`.
    pub fn covers(&self, other: &ServiceSelector) -> bool {
        match self {
            ServiceSelector::Any => true,
            _ => self == other,
        }
    }

    /// Check whether `self` and `other` select at least one common service.
    pub fn overlaps(&self, other: &ServiceSelector) -> bool {
        matches!(self, ServiceSelector::Any) || matches!(other, ServiceSelector::Any) || self == other
    }
}

/// An IAM action pattern such as `kms:Decrypt` or `kms:GenerateDataKey*`.
///
/// # Example
///
/// ```
/// use stackguard_policy::capability::Capability;
///
/// let all_kms: Capability = "kms:*".parse().unwrap();
/// let data_keys: Capability = "kms:GenerateDataKey*".parse().unwrap();
/// let decrypt: Capability = "kms:Decrypt".parse().unwrap();
///
/// assert!(all_kms.covers(&data_keys));
/// assert!(!data_keys.covers(&all_kms));
/// assert!(!data_keys.overlaps(&decrypt));
/// assert_eq!(data_keys.to_string(), "kms:GenerateDataKey*");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Capability {
    service: ServiceSelector,
    action: String,
}

impl Capability {
    /// Create a capability for a known service.
    ///
    /// # Arguments
    ///
    /// * `service` - The service prefix
    /// * `action` - Action name or pattern, e.g. `Decrypt` or `Get*`
    ///
    /// # Returns
    ///
    /// The capability, or `PolicyError::InvalidCapability` if the action is malformed
    pub fn new(service: AwsService, action: &str) -> PolicyResult<Self> {
        validate_action(action, action)?;
        Ok(Self {
            service: ServiceSelector::Known(service),
            action: action.to_string(),
        })
    }

    /// The capability that matches every action on every service (`*`).
    pub fn any() -> Self {
        Self {
            service: ServiceSelector::Any,
            action: "*".to_string(),
        }
    }

    /// Parse a capability string.
    ///
    /// # Example
    ///
    /// ```
    /// use stackguard_policy::capability::{Capability, ServiceSelector};
    /// use stackguard_policy::services::AwsService;
    ///
    /// let cap = Capability::parse("sts:AssumeRole").unwrap();
    /// assert_eq!(cap.service(), &ServiceSelector::Known(AwsService::Sts));
    /// assert_eq!(cap.action(), "AssumeRole");
    ///
    /// assert!(Capability::parse("*").unwrap().is_wildcard());
    /// assert!(Capability::parse("kms").is_err());
    /// assert!(Capability::parse("km*:Decrypt").is_err());
    /// ```
    pub fn parse(s: &str) -> PolicyResult<Self> {
        let trimmed = s.trim();
        if trimmed == "*" {
            return Ok(Self::any());
        }

        let (service, action) = trimmed
            .split_once(':')
            .ok_or_else(|| PolicyError::invalid_capability(s, "expected `service:action`"))?;

        let service = ServiceSelector::parse(service).ok_or_else(|| {
            PolicyError::invalid_capability(s, "service prefix must be `*` or [a-z0-9-]+")
        })?;
        validate_action(s, action)?;

        Ok(Self {
            service,
            action: action.to_string(),
        })
    }

    /// Get the service selector.
    pub fn service(&self) -> &ServiceSelector {
        &self.service
    }

    /// Get the action pattern as written.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Check if this capability contains a wildcard anywhere.
    pub fn is_wildcard(&self) -> bool {
        matches!(self.service, ServiceSelector::Any) || self.action.contains('*')
    }

    /// Check if this capability only names read actions.
    ///
    /// Read actions are the `Get`, `List` and `Describe` families.
    pub fn is_read_only(&self) -> bool {
        let action = self.action.to_ascii_lowercase();
        ["get", "list", "describe"]
            .iter()
            .any(|prefix| action.starts_with(prefix))
    }

    /// Check whether every action matched by `other` is matched by `self`.
    ///
    /// A `*` in `other` can only be absorbed by a `*` in `self`, so the
    /// answer is conservative: `true` always means containment.
    pub fn covers(&self, other: &Capability) -> bool {
        self.service.covers(&other.service) && glob_covers(&self.action, &other.action)
    }

    /// Check whether at least one concrete action is matched by both.
    pub fn overlaps(&self, other: &Capability) -> bool {
        self.service.overlaps(&other.service) && glob_overlaps(&self.action, &other.action)
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if matches!(self.service, ServiceSelector::Any) && self.action == "*" {
            f.write_str("*")
        } else {
            write!(f, "{}:{}", self.service.as_str(), self.action)
        }
    }
}

impl FromStr for Capability {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Capability {
    type Error = PolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Capability> for String {
    fn from(value: Capability) -> Self {
        value.to_string()
    }
}

fn validate_action(input: &str, action: &str) -> PolicyResult<()> {
    if action.is_empty() {
        return Err(PolicyError::invalid_capability(input, "action is empty"));
    }
    if !action.chars().all(|c| c.is_ascii_alphanumeric() || c == '*') {
        return Err(PolicyError::invalid_capability(
            input,
            "action must match [A-Za-z0-9*]+",
        ));
    }
    Ok(())
}

/// Memo table for the glob recursions, indexed by (i, j).
struct Memo {
    width: usize,
    cells: Vec<Option<bool>>,
}

impl Memo {
    fn new(a: usize, b: usize) -> Self {
        Self {
            width: b + 1,
            cells: vec![None; (a + 1) * (b + 1)],
        }
    }

    fn get(&self, i: usize, j: usize) -> Option<bool> {
        self.cells[i * self.width + j]
    }

    fn set(&mut self, i: usize, j: usize, value: bool) -> bool {
        self.cells[i * self.width + j] = Some(value);
        value
    }
}

fn glob_covers(pattern: &str, target: &str) -> bool {
    let a = pattern.to_ascii_lowercase().into_bytes();
    let b = target.to_ascii_lowercase().into_bytes();
    let mut memo = Memo::new(a.len(), b.len());
    covers_from(&a, &b, 0, 0, &mut memo)
}

fn covers_from(a: &[u8], b: &[u8], i: usize, j: usize, memo: &mut Memo) -> bool {
    if let Some(known) = memo.get(i, j) {
        return known;
    }
    let result = if i == a.len() {
        j == b.len()
    } else if a[i] == b'*' {
        covers_from(a, b, i + 1, j, memo) || (j < b.len() && covers_from(a, b, i, j + 1, memo))
    } else {
        j < b.len() && b[j] != b'*' && a[i] == b[j] && covers_from(a, b, i + 1, j + 1, memo)
    };
    memo.set(i, j, result)
}

fn glob_overlaps(left: &str, right: &str) -> bool {
    let a = left.to_ascii_lowercase().into_bytes();
    let b = right.to_ascii_lowercase().into_bytes();
    let mut memo = Memo::new(a.len(), b.len());
    overlaps_from(&a, &b, 0, 0, &mut memo)
}

fn overlaps_from(a: &[u8], b: &[u8], i: usize, j: usize, memo: &mut Memo) -> bool {
    if let Some(known) = memo.get(i, j) {
        return known;
    }
    let result = if i == a.len() && j == b.len() {
        true
    } else if i < a.len() && a[i] == b'*' {
        overlaps_from(a, b, i + 1, j, memo) || (j < b.len() && overlaps_from(a, b, i, j + 1, memo))
    } else if j < b.len() && b[j] == b'*' {
        overlaps_from(a, b, i, j + 1, memo) || (i < a.len() && overlaps_from(a, b, i + 1, j, memo))
    } else {
        i < a.len() && j < b.len() && a[i] == b[j] && overlaps_from(a, b, i + 1, j + 1, memo)
    };
    memo.set(i, j, result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(s: &str) -> Capability {
        Capability::parse(s).unwrap()
    }

    #[test]
    fn test_capability_parsing() {
        let c = cap("kms:Decrypt");
        assert_eq!(c.service(), &ServiceSelector::Known(AwsService::Kms));
        assert_eq!(c.action(), "Decrypt");
        assert!(!c.is_wildcard());

        let custom = cap("snowflake:Query");
        assert_eq!(custom.service(), &ServiceSelector::Custom("snowflake".to_string()));

        let any_service = cap("*:Get*");
        assert_eq!(any_service.service(), &ServiceSelector::Any);
        assert!(any_service.is_wildcard());
    }

    #[test]
    fn test_capability_parse_rejects_malformed() {
        assert!(Capability::parse("").is_err());
        assert!(Capability::parse("kms:").is_err());
        assert!(Capability::parse(":Decrypt").is_err());
        assert!(Capability::parse("kms:Decrypt:Extra").is_err());
        assert!(Capability::parse("k*s:Decrypt").is_err());
        assert!(Capability::parse("kms:Decrypt?").is_err());

        let err = Capability::parse("kms").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CAPABILITY");
    }

    #[test]
    fn test_capability_display() {
        assert_eq!(cap("*").to_string(), "*");
        assert_eq!(cap("*:*").to_string(), "*");
        assert_eq!(cap("KMS:Decrypt").to_string(), "kms:Decrypt");
        assert_eq!(cap("secretsmanager:GetSecretValue").to_string(), "secretsmanager:GetSecretValue");
    }

    #[test]
    fn test_covers_exact_and_case_insensitive() {
        assert!(cap("kms:Decrypt").covers(&cap("kms:Decrypt")));
        assert!(cap("kms:decrypt").covers(&cap("kms:Decrypt")));
        assert!(!cap("kms:Decrypt").covers(&cap("kms:Encrypt")));
        assert!(!cap("kms:Decrypt").covers(&cap("s3:Decrypt")));
    }

    #[test]
    fn test_covers_wildcards() {
        assert!(cap("*").covers(&cap("iam:CreateUser")));
        assert!(cap("kms:*").covers(&cap("kms:ReEncrypt*")));
        assert!(cap("kms:ReEncrypt*").covers(&cap("kms:ReEncryptFrom")));
        assert!(cap("kms:Re*").covers(&cap("kms:ReEncrypt*")));
        assert!(cap("*:Get*").covers(&cap("s3:GetObject")));

        assert!(!cap("kms:ReEncrypt").covers(&cap("kms:ReEncrypt*")));
        assert!(!cap("kms:ReEncryptFrom").covers(&cap("kms:ReEncrypt*")));
        assert!(!cap("s3:*").covers(&cap("*:GetObject")));
    }

    #[test]
    fn test_overlaps() {
        assert!(cap("kms:*").overlaps(&cap("kms:Decrypt")));
        assert!(cap("kms:Decrypt").overlaps(&cap("kms:*")));
        assert!(cap("kms:Gen*").overlaps(&cap("kms:*Key")));
        assert!(cap("*").overlaps(&cap("route53:ChangeResourceRecordSets")));
        assert!(cap("*:Get*").overlaps(&cap("s3:*Object")));

        assert!(!cap("kms:Decrypt").overlaps(&cap("kms:Encrypt")));
        assert!(!cap("kms:Get*").overlaps(&cap("kms:List*")));
        assert!(!cap("iam:*").overlaps(&cap("kms:*")));
    }

    #[test]
    fn test_is_read_only() {
        assert!(cap("s3:GetObject").is_read_only());
        assert!(cap("kms:DescribeKey").is_read_only());
        assert!(cap("*:List*").is_read_only());
        assert!(!cap("kms:Decrypt").is_read_only());
        assert!(!cap("*").is_read_only());
    }

    #[test]
    fn test_capability_serde_as_string() {
        let c = cap("kms:GenerateDataKey*");
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"kms:GenerateDataKey*\"");

        let back: Capability = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);

        assert!(serde_json::from_str::<Capability>("\"not a capability\"").is_err());
    }
}
