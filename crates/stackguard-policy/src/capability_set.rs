//! # Capability Sets
//!
//! Ordered collections of capability patterns, used for the allow and deny
//! halves of a permission tier.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::capability::Capability;
use crate::error::PolicyResult;

/// A set of capability patterns.
///
/// Backed by a `BTreeSet` so iteration order, and therefore anything
/// reported from it, is stable across runs.
///
/// # Example
///
/// ```
/// use stackguard_policy::capability::Capability;
/// use stackguard_policy::capability_set::CapabilitySet;
///
/// let set = CapabilitySet::from_strings(&["kms:*", "sts:AssumeRole"]).unwrap();
///
/// assert!(set.covers(&"kms:Decrypt".parse().unwrap()));
/// assert!(!set.covers(&"iam:CreateUser".parse().unwrap()));
/// assert_eq!(set.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet {
    capabilities: BTreeSet<Capability>,
}

impl CapabilitySet {
    /// Create a new empty set.
    pub fn new() -> Self {
        Self {
            capabilities: BTreeSet::new(),
        }
    }

    /// Add a capability to the set.
    ///
    /// # Returns
    ///
    /// `true` if the capability was not already present
    pub fn add(&mut self, capability: Capability) -> bool {
        self.capabilities.insert(capability)
    }

    /// Add multiple capabilities to the set.
    pub fn add_all<I>(&mut self, capabilities: I)
    where
        I: IntoIterator<Item = Capability>,
    {
        self.capabilities.extend(capabilities);
    }

    /// Remove a capability from the set.
    pub fn remove(&mut self, capability: &Capability) -> bool {
        self.capabilities.remove(capability)
    }

    /// Parse a list of capability strings.
    ///
    /// Fails on the first malformed entry; a set built from configuration
    /// should never silently drop a pattern.
    pub fn from_strings<S: AsRef<str>>(patterns: &[S]) -> PolicyResult<Self> {
        let mut set = Self::new();
        for pattern in patterns {
            set.add(Capability::parse(pattern.as_ref())?);
        }
        Ok(set)
    }

    /// Check if the set contains exactly this pattern.
    pub fn contains(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Check if some pattern in the set covers the capability.
    pub fn covers(&self, capability: &Capability) -> bool {
        self.covering(capability).is_some()
    }

    /// Find the first pattern that covers the capability.
    pub fn covering(&self, capability: &Capability) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.covers(capability))
    }

    /// Find the first pattern that overlaps the capability.
    ///
    /// Used for deny evaluation: a deny pattern that blocks any part of a
    /// wildcard grant blocks the grant.
    pub fn overlapping(&self, capability: &Capability) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.overlaps(capability))
    }

    /// Merge another set into this one.
    pub fn merge(&mut self, other: &CapabilitySet) {
        self.capabilities
            .extend(other.capabilities.iter().cloned());
    }

    /// Iterate over the patterns in order.
    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities.iter()
    }

    /// Get the count of patterns.
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Check if every pattern of `other` is covered by this set.
    pub fn covers_all(&self, other: &CapabilitySet) -> bool {
        other.iter().all(|c| self.covers(c))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        Self {
            capabilities: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a CapabilitySet {
    type Item = &'a Capability;
    type IntoIter = std::collections::btree_set::Iter<'a, Capability>;

    fn into_iter(self) -> Self::IntoIter {
        self.capabilities.iter()
    }
}
