//! Account registry
//!
//! A fixed mapping from environment name to account and permission tier,
//! kept in declaration order. The registry is built once during the
//! configuration pass and passed explicitly to whatever needs it.

use serde::{Deserialize, Serialize};
use stackguard_policy::TierKind;

use crate::account::Account;
use crate::error::{AccountError, AccountResult};

/// Region every reference account deploys to by default.
pub const DEFAULT_REGION: &str = "us-east-2";

/// A registered account and the tier it is governed by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEntry {
    /// The account
    pub account: Account,

    /// Permission tier assigned to the account
    pub tier: TierKind,
}

/// Environment name to account lookup table.
///
/// # Architecture
///
/// ```text
/// AccountRegistry
///   ├─ ROOT    ─→ Account + Tier::Root
///   ├─ DEV     ─→ Account + Tier::Dev
///   ├─ TESTING ─→ Account + Tier::Testing
///   └─ PROD    ─→ Account + Tier::Prod
/// ```
///
/// # Examples
///
/// ```
/// use stackguard_accounts::{Account, AccountRegistry};
/// use stackguard_policy::TierKind;
///
/// let mut registry = AccountRegistry::new();
/// registry.register(Account::new("ROOT", "654654598073", "us-east-2"), TierKind::Root).unwrap();
/// registry.register(Account::new("DEV", "111111111111", "us-east-2"), TierKind::Dev).unwrap();
///
/// assert_eq!(registry.resolve("dev").unwrap().id, "111111111111");
/// assert!(registry.resolve("PROD").is_err());
/// assert_eq!(registry.all().len(), 2);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountRegistry {
    entries: Vec<AccountEntry>,
}

impl AccountRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The organization's software-engineering accounts.
    ///
    /// ROOT is provisioned; DEV, TESTING and PROD are placeholders until
    /// their accounts are created.
    pub fn software_engineering() -> Self {
        let accounts = [
            ("ROOT", "654654598073", TierKind::Root),
            ("DEV", "TBD", TierKind::Dev),
            ("TESTING", "TBD", TierKind::Testing),
            ("PROD", "TBD", TierKind::Prod),
        ];

        Self {
            entries: accounts
                .into_iter()
                .map(|(name, id, tier)| AccountEntry {
                    account: Account::new(name, id, DEFAULT_REGION),
                    tier,
                })
                .collect(),
        }
    }

    /// Register an account under its environment name.
    ///
    /// # Arguments
    ///
    /// * `account` - The account to add
    /// * `tier` - Permission tier governing the account
    ///
    /// # Returns
    ///
    /// The registered account, or an error if the name is taken or the
    /// definition is incomplete
    pub fn register(&mut self, account: Account, tier: TierKind) -> AccountResult<&Account> {
        if account.name.trim().is_empty() {
            return Err(AccountError::InvalidAccount {
                name: account.name,
                reason: "environment name is empty".to_string(),
            });
        }
        if account.id.trim().is_empty() {
            return Err(AccountError::InvalidAccount {
                name: account.name,
                reason: "account id is empty".to_string(),
            });
        }
        if account.region.trim().is_empty() {
            return Err(AccountError::InvalidAccount {
                name: account.name,
                reason: "region is empty".to_string(),
            });
        }
        if self.entry(&account.name).is_some() {
            return Err(AccountError::DuplicateAccount(account.name));
        }

        if !account.is_provisioned() {
            tracing::warn!(
                account = %account.name,
                id = %account.id,
                "Registered account without a provisioned account id"
            );
        }

        self.entries.push(AccountEntry { account, tier });
        let index = self.entries.len() - 1;
        Ok(&self.entries[index].account)
    }

    /// Look up an account by environment name (case-insensitive).
    ///
    /// # Returns
    ///
    /// The account, or `AccountError::UnknownEnvironment`
    pub fn resolve(&self, name: &str) -> AccountResult<&Account> {
        self.entry(name)
            .map(|entry| &entry.account)
            .ok_or_else(|| AccountError::UnknownEnvironment(name.to_string()))
    }

    /// All accounts in declaration order.
    pub fn all(&self) -> Vec<&Account> {
        self.entries.iter().map(|entry| &entry.account).collect()
    }

    /// All entries in declaration order.
    pub fn entries(&self) -> &[AccountEntry] {
        &self.entries
    }

    /// Find the entry registered under a name (case-insensitive).
    pub fn entry(&self, name: &str) -> Option<&AccountEntry> {
        self.entries
            .iter()
            .find(|entry| entry.account.name.eq_ignore_ascii_case(name))
    }

    /// Find the entry for an account value.
    ///
    /// The name must be registered and the id must agree with the
    /// registered id. Region is not part of an account's identity.
    pub fn lookup(&self, account: &Account) -> Option<&AccountEntry> {
        self.entry(&account.name)
            .filter(|entry| entry.account.id == account.id)
    }

    /// Check if an account value matches a registered account.
    pub fn contains(&self, account: &Account) -> bool {
        self.lookup(account).is_some()
    }

    /// Tier of a registered account.
    pub fn tier_of(&self, account: &Account) -> Option<TierKind> {
        self.lookup(account).map(|entry| entry.tier)
    }

    /// The management account, if registered.
    pub fn root(&self) -> Option<&Account> {
        self.entries
            .iter()
            .find(|entry| entry.tier == TierKind::Root)
            .map(|entry| &entry.account)
    }

    /// Member accounts of the organization (everything internal except root).
    pub fn children(&self) -> Vec<&Account> {
        self.entries
            .iter()
            .filter(|entry| entry.tier != TierKind::Root && entry.tier.is_internal())
            .map(|entry| &entry.account)
            .collect()
    }

    /// Accounts whose id is still a placeholder.
    pub fn unprovisioned(&self) -> Vec<&Account> {
        self.entries
            .iter()
            .map(|entry| &entry.account)
            .filter(|account| !account.is_provisioned())
            .collect()
    }

    /// Get the count of accounts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
