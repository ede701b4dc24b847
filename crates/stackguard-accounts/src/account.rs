//! Account domain model
//!
//! An account is one AWS account in the organization, addressed by the
//! environment name it serves (ROOT, DEV, ...).

use serde::{Deserialize, Serialize};

/// Length of a provisioned AWS account id.
pub const ACCOUNT_ID_LEN: usize = 12;

/// An AWS account bound to an environment name.
///
/// Accounts are immutable once defined. Two accounts are equal when name,
/// id and region all match.
///
/// # Examples
///
/// ```
/// use stackguard_accounts::Account;
///
/// let root = Account::new("ROOT", "654654598073", "us-east-2");
/// assert!(root.is_provisioned());
/// assert_eq!(
///     root.role_arn("ServicesDelegationRole"),
///     "arn:aws:iam::654654598073:role/ServicesDelegationRole"
/// );
///
/// let dev = Account::new("DEV", "TBD", "us-east-2");
/// assert!(!dev.is_provisioned());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Account {
    /// Environment name (e.g. `DEV`)
    pub name: String,

    /// AWS account id; `TBD` while the account is not yet created
    pub id: String,

    /// Default region for stacks in this account
    pub region: String,
}

impl Account {
    /// Creates a new account.
    pub fn new(name: impl Into<String>, id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            region: region.into(),
        }
    }

    /// Returns the same account targeted at another region.
    ///
    /// Used for stacks that must live in a service's home region, such as
    /// SSO permission sets.
    pub fn in_region(&self, region: impl Into<String>) -> Self {
        Self {
            name: self.name.clone(),
            id: self.id.clone(),
            region: region.into(),
        }
    }

    /// Check if the id is a real 12-digit account id.
    pub fn is_provisioned(&self) -> bool {
        self.id.len() == ACCOUNT_ID_LEN && self.id.chars().all(|c| c.is_ascii_digit())
    }

    /// Key the account's secrets are stored under.
    ///
    /// The account id once provisioned, the environment name before that.
    /// Unprovisioned accounts all share the `TBD` placeholder id.
    pub fn secret_scope(&self) -> &str {
        if self.is_provisioned() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Check if this is the organization's management account.
    pub fn is_root(&self) -> bool {
        self.name.eq_ignore_ascii_case("ROOT")
    }

    /// Environment name with only the first letter capitalized (`Dev`).
    ///
    /// Stack ids are derived from this form.
    pub fn capitalized_name(&self) -> String {
        let lower = self.name.to_lowercase();
        let mut chars = lower.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// ARN of an IAM role in this account.
    pub fn role_arn(&self, role_name: &str) -> String {
        format!("arn:aws:iam::{}:role/{}", self.id, role_name)
    }

    /// ARN of the account's root principal.
    pub fn principal_arn(&self) -> String {
        format!("arn:aws:iam::{}:root", self.id)
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.id, self.region)
    }
}
