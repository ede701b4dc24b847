//! Secret-existence oracle
//!
//! Grant conditions may read their expected value from a secret in the
//! grantor's account. Validation only needs to know whether that secret
//! exists, and the answer is supplied by the caller as already-resolved
//! data, never fetched live.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Answers whether a secret exists in an account's secret store.
pub trait SecretOracle {
    /// Check if `secret_key` exists in the store of `account_id`.
    fn exists(&self, account_id: &str, secret_key: &str) -> bool;
}

impl<F> SecretOracle for F
where
    F: Fn(&str, &str) -> bool,
{
    fn exists(&self, account_id: &str, secret_key: &str) -> bool {
        self(account_id, secret_key)
    }
}

/// Secret keys per account id, held in memory.
///
/// # Example
///
/// ```
/// use stackguard_trust::{InMemorySecretStore, SecretOracle};
///
/// let store = InMemorySecretStore::new()
///     .with_secret("111111111111", "snowflake-external-id-111111111111");
///
/// assert!(store.exists("111111111111", "snowflake-external-id-111111111111"));
/// assert!(!store.exists("222222222222", "snowflake-external-id-111111111111"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemorySecretStore {
    secrets: BTreeMap<String, BTreeSet<String>>,
}

impl InMemorySecretStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a secret.
    ///
    /// # Returns
    ///
    /// `true` if the secret was not already recorded
    pub fn insert(&mut self, account_id: impl Into<String>, secret_key: impl Into<String>) -> bool {
        self.secrets
            .entry(account_id.into())
            .or_default()
            .insert(secret_key.into())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_secret(mut self, account_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.insert(account_id, secret_key);
        self
    }

    /// Secret keys recorded for an account.
    pub fn keys_for(&self, account_id: &str) -> impl Iterator<Item = &str> {
        self.secrets
            .get(account_id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Get the total number of secrets.
    pub fn len(&self) -> usize {
        self.secrets.values().map(BTreeSet::len).sum()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SecretOracle for InMemorySecretStore {
    fn exists(&self, account_id: &str, secret_key: &str) -> bool {
        self.secrets
            .get(account_id)
            .is_some_and(|keys| keys.contains(secret_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_is_scoped_by_account() {
        let mut store = InMemorySecretStore::new();
        assert!(store.insert("111111111111", "ext-id"));
        assert!(!store.insert("111111111111", "ext-id"));
        store.insert("222222222222", "other");

        assert!(store.exists("111111111111", "ext-id"));
        assert!(!store.exists("222222222222", "ext-id"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.keys_for("222222222222").collect::<Vec<_>>(), vec!["other"]);
        assert_eq!(store.keys_for("333333333333").count(), 0);
    }

    #[test]
    fn test_closure_oracle() {
        let oracle = |account: &str, key: &str| account == "111111111111" && key.starts_with("ext");
        assert!(oracle.exists("111111111111", "ext-id"));
        assert!(!oracle.exists("111111111111", "db-password"));
    }

    #[test]
    fn test_store_serde() {
        let store: InMemorySecretStore =
            serde_json::from_str(r#"{"111111111111": ["a", "b"]}"#).unwrap();
        assert!(store.exists("111111111111", "b"));
        assert!(!store.is_empty());
    }
}
