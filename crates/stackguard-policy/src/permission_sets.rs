//! SSO permission sets
//!
//! Permission sets bundle managed policies for single sign-on users. AWS
//! caps how many policies a set may reference and how long its sessions
//! may last; these limits are checked here so a bad set is caught before
//! the deployment engine rejects it.

use serde::{Deserialize, Serialize};

/// Maximum customer-managed policy references per permission set.
pub const MAX_CUSTOMER_MANAGED_POLICIES: usize = 10;

/// Maximum AWS-managed policies per permission set.
pub const MAX_AWS_MANAGED_POLICIES: usize = 10;

/// Shortest allowed session, in minutes.
pub const MIN_SESSION_MINUTES: u32 = 60;

/// Longest allowed session, in minutes.
pub const MAX_SESSION_MINUTES: u32 = 12 * 60;

/// Session duration used by every reference permission set.
pub const DEFAULT_SESSION_DURATION: &str = "PT8H";

const READ_ONLY_ACCESS: &str = "ReadOnlyAccess";
const BILLING_READ_ONLY_ACCESS: &str = "AWSBillingReadOnlyAccess";

/// A permission set definition.
///
/// # Example
///
/// ```
/// use stackguard_policy::PermissionSetSpec;
///
/// let set = PermissionSetSpec::new("SE_PROD", "SEIamSsoPermissionSetStack")
///     .with_customer_managed(["SE_DenyIAMRiskyActions", "SE_CUSTOM_PROD"])
///     .with_aws_managed(["ReadOnlyAccess"]);
///
/// assert!(set.issues().is_empty());
/// assert_eq!(set.session_minutes(), Some(480));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSetSpec {
    /// Permission set name (e.g. `SE_DEV`)
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Stack that declares the permission set
    pub stack: String,

    /// Customer-managed policy names referenced by the set
    #[serde(default)]
    pub customer_managed_policies: Vec<String>,

    /// AWS-managed policy names attached to the set
    #[serde(default)]
    pub aws_managed_policies: Vec<String>,

    /// ISO-8601 session duration (e.g. `PT8H`)
    #[serde(default = "default_session_duration")]
    pub session_duration: String,
}

fn default_session_duration() -> String {
    DEFAULT_SESSION_DURATION.to_string()
}

/// A limit a permission set breaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PermissionSetIssue {
    /// More customer-managed references than allowed
    TooManyCustomerManagedPolicies {
        /// Number referenced
        count: usize,
        /// Limit
        limit: usize,
    },

    /// More AWS-managed policies than allowed
    TooManyAwsManagedPolicies {
        /// Number attached
        count: usize,
        /// Limit
        limit: usize,
    },

    /// Session duration is malformed or out of range
    InvalidSessionDuration {
        /// The value as written
        value: String,
    },
}

impl std::fmt::Display for PermissionSetIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionSetIssue::TooManyCustomerManagedPolicies { count, limit } => write!(
                f,
                "{count} customer-managed policies referenced (limit {limit})"
            ),
            PermissionSetIssue::TooManyAwsManagedPolicies { count, limit } => {
                write!(f, "{count} AWS-managed policies attached (limit {limit})")
            }
            PermissionSetIssue::InvalidSessionDuration { value } => write!(
                f,
                "session duration `{value}` must be an ISO-8601 duration between PT1H and PT12H"
            ),
        }
    }
}

impl PermissionSetSpec {
    /// Create a permission set with no policies and the default session.
    pub fn new(name: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            stack: stack.into(),
            customer_managed_policies: Vec::new(),
            aws_managed_policies: Vec::new(),
            session_duration: default_session_duration(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append customer-managed policy references.
    pub fn with_customer_managed<I, S>(mut self, policies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.customer_managed_policies
            .extend(policies.into_iter().map(Into::into));
        self
    }

    /// Append AWS-managed policies.
    pub fn with_aws_managed<I, S>(mut self, policies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aws_managed_policies
            .extend(policies.into_iter().map(Into::into));
        self
    }

    /// Set the session duration.
    pub fn with_session_duration(mut self, duration: impl Into<String>) -> Self {
        self.session_duration = duration.into();
        self
    }

    /// Session length in minutes, if the duration parses.
    pub fn session_minutes(&self) -> Option<u32> {
        parse_session_duration(&self.session_duration)
    }

    /// Collect every limit this set breaks.
    pub fn issues(&self) -> Vec<PermissionSetIssue> {
        let mut issues = Vec::new();

        if self.customer_managed_policies.len() > MAX_CUSTOMER_MANAGED_POLICIES {
            issues.push(PermissionSetIssue::TooManyCustomerManagedPolicies {
                count: self.customer_managed_policies.len(),
                limit: MAX_CUSTOMER_MANAGED_POLICIES,
            });
        }
        if self.aws_managed_policies.len() > MAX_AWS_MANAGED_POLICIES {
            issues.push(PermissionSetIssue::TooManyAwsManagedPolicies {
                count: self.aws_managed_policies.len(),
                limit: MAX_AWS_MANAGED_POLICIES,
            });
        }
        match self.session_minutes() {
            Some(minutes) if (MIN_SESSION_MINUTES..=MAX_SESSION_MINUTES).contains(&minutes) => {}
            _ => issues.push(PermissionSetIssue::InvalidSessionDuration {
                value: self.session_duration.clone(),
            }),
        }

        issues
    }

    /// The permission sets the organization's SSO stack declares.
    pub fn reference_sets(stack: &str) -> Vec<Self> {
        let managed = [READ_ONLY_ACCESS, BILLING_READ_ONLY_ACCESS];
        vec![
            Self::new("SE_DEV", stack)
                .with_description("Grants full-access to core AWS services. Intended for SE DEV OU ONLY.")
                .with_customer_managed([
                    "SE_DevOpsFullAccess",
                    "SE_DBFullAccess",
                    "SE_DevFullAccess",
                    "SE_DenyIAMRiskyActions",
                    "SE_CUSTOM_DEV",
                ])
                .with_aws_managed(managed),
            Self::new("SE_PROD", stack)
                .with_description("Allows read-only and basic/limited access to the SE PRODUCTION OU.")
                .with_customer_managed(["SE_DenyIAMRiskyActions", "SE_CUSTOM_PROD"])
                .with_aws_managed(managed),
            Self::new("SE_TESTING", stack)
                .with_description("Allows read-only and basic/limited access to the SE TESTING OU.")
                .with_customer_managed(["SE_DenyIAMRiskyActions", "SE_CUSTOM_TESTING"])
                .with_aws_managed(managed),
            Self::new("SE_ROOT", stack)
                .with_description("Allows read-only and basic/limited access to the ROOT OU.")
                .with_customer_managed(["SE_DenyIAMRiskyActions", "SE_CUSTOM_ROOT"])
                .with_aws_managed(managed),
            Self::new("SE_DEVOPS", stack)
                .with_description("Grants full-access to core CI/CD services. Intended for a DevOps person.")
                .with_customer_managed(["SE_DevOpsFullAccess"])
                .with_aws_managed(managed),
        ]
    }
}

/// Parse `PT{h}H{m}M` (either part optional, at least one present) into minutes.
fn parse_session_duration(value: &str) -> Option<u32> {
    let rest = value.strip_prefix("PT")?;
    if rest.is_empty() {
        return None;
    }

    let mut minutes: u32 = 0;
    let mut digits = String::new();
    let mut seen_hours = false;
    let mut seen_minutes = false;

    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            'H' if !seen_hours && !seen_minutes && !digits.is_empty() => {
                let hours: u32 = digits.parse().ok()?;
                minutes = minutes.checked_add(hours.checked_mul(60)?)?;
                digits.clear();
                seen_hours = true;
            }
            'M' if !seen_minutes && !digits.is_empty() => {
                let mins: u32 = digits.parse().ok()?;
                minutes = minutes.checked_add(mins)?;
                digits.clear();
                seen_minutes = true;
            }
            _ => return None,
        }
    }

    if !digits.is_empty() {
        return None;
    }
    Some(minutes)
}
