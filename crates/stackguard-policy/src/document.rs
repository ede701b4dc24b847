//! IAM policy documents
//!
//! Customer-managed policies are kept as JSON documents next to the
//! infrastructure code. This module reads them, folds their statements into
//! capability sets and enforces the managed-policy size limit.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::capability::Capability;
use crate::capability_set::CapabilitySet;
use crate::error::{PolicyError, PolicyResult};

/// Maximum non-whitespace characters in a managed policy.
pub const MAX_MANAGED_POLICY_CHARS: usize = 6144;

/// Policy language version written by current tooling.
pub const POLICY_VERSION: &str = "2012-10-17";

/// A value that may be written either as a single string or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// Single value
    One(T),
    /// List of values
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Borrow the values as a slice-like iterator.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value).iter(),
            OneOrMany::Many(values) => values.iter(),
        }
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(values) => values.len(),
        }
    }

    /// Check if there are no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Statement effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Grants the listed actions
    Allow,
    /// Blocks the listed actions
    Deny,
}

/// One statement of a policy document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    /// Optional statement id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,

    /// Allow or Deny
    pub effect: Effect,

    /// Action patterns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<OneOrMany<String>>,

    /// Inverted action patterns (not modelled, rejected on evaluation)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_action: Option<OneOrMany<String>>,

    /// Resource ARNs or patterns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<OneOrMany<String>>,

    /// Condition block, kept verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<serde_json::Value>,
}

impl Statement {
    fn label(&self, index: usize) -> String {
        self.sid.clone().unwrap_or_else(|| format!("#{index}"))
    }
}

/// An IAM policy document.
///
/// # Example
///
/// ```
/// use stackguard_policy::document::PolicyDocument;
///
/// let doc = PolicyDocument::from_json(r#"{
///     "Version": "2012-10-17",
///     "Statement": [
///         {"Effect": "Allow", "Action": "kms:*", "Resource": "*"},
///         {"Effect": "Deny", "Action": ["kms:ScheduleKeyDeletion"], "Resource": "*"}
///     ]
/// }"#).unwrap();
///
/// let (allow, deny) = doc.capability_sets().unwrap();
/// assert_eq!(allow.len(), 1);
/// assert_eq!(deny.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    /// Policy language version
    #[serde(default = "default_version")]
    pub version: String,

    /// Statements (a single object is accepted)
    pub statement: OneOrMany<Statement>,
}

fn default_version() -> String {
    POLICY_VERSION.to_string()
}

impl PolicyDocument {
    /// Parse a document from JSON text.
    pub fn from_json(json: &str) -> PolicyResult<Self> {
        let document: PolicyDocument = serde_json::from_str(json)?;
        if document.statement.is_empty() {
            return Err(PolicyError::InvalidDocument(
                "document has no statements".to_string(),
            ));
        }
        Ok(document)
    }

    /// Read and parse a document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> PolicyResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loaded policy document");
        Self::from_json(&text)
    }

    /// Fold statements into `(allow, deny)` capability sets.
    ///
    /// Resources and conditions are not evaluated; a statement's actions
    /// count as granted (or denied) in full.
    pub fn capability_sets(&self) -> PolicyResult<(CapabilitySet, CapabilitySet)> {
        let mut allow = CapabilitySet::new();
        let mut deny = CapabilitySet::new();

        for (index, statement) in self.statement.iter().enumerate() {
            if statement.not_action.is_some() {
                return Err(PolicyError::UnsupportedStatement {
                    sid: statement.label(index),
                    element: "NotAction".to_string(),
                });
            }
            let actions = statement.action.as_ref().ok_or_else(|| {
                PolicyError::InvalidDocument(format!(
                    "statement {} has no Action",
                    statement.label(index)
                ))
            })?;

            let target = match statement.effect {
                Effect::Allow => &mut allow,
                Effect::Deny => &mut deny,
            };
            for action in actions.iter() {
                target.add(Capability::parse(action)?);
            }
        }

        Ok((allow, deny))
    }

    /// Count the characters AWS charges against the managed-policy limit.
    ///
    /// Whitespace is not counted.
    pub fn character_count(&self) -> PolicyResult<usize> {
        let compact = serde_json::to_string(self)?;
        Ok(compact.chars().filter(|c| !c.is_whitespace()).count())
    }

    /// Fail if the document exceeds [`MAX_MANAGED_POLICY_CHARS`].
    pub fn check_size(&self, name: &str) -> PolicyResult<usize> {
        let chars = self.character_count()?;
        if chars > MAX_MANAGED_POLICY_CHARS {
            return Err(PolicyError::DocumentTooLarge {
                name: name.to_string(),
                chars,
                limit: MAX_MANAGED_POLICY_CHARS,
            });
        }
        Ok(chars)
    }
}
