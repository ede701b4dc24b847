//! Deployment settings.
//!
//! Settings the deployment is parameterized by, loaded from environment
//! variables. The job role decides which stacks exist at all: only a DevOps
//! deployment declares the SSO permission-set and pipeline stacks.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::registry::DEFAULT_REGION;

/// Environment variable selecting the job role.
pub const JOB_ROLE_VAR: &str = "JOB_ROLE";

/// Environment variable naming the SSO home region.
pub const SSO_REGION_VAR: &str = "SSO_REGION";

/// Environment variable holding the SSO instance ARN.
pub const SSO_INSTANCE_ARN_VAR: &str = "SSO_INSTANCE_ARN";

/// Environment variable holding the services domain name.
pub const SERVICES_DOMAIN_VAR: &str = "SE_SERVICES_DOMAIN";

/// Environment variable overriding the default region.
pub const DEFAULT_REGION_VAR: &str = "STACKGUARD_DEFAULT_REGION";

/// Who is running the deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobRole {
    /// Operates the organization-wide SSO and pipeline stacks
    DevOps,

    /// Deploys the per-environment stacks only
    #[default]
    Engineer,
}

impl JobRole {
    /// Parse a job role. `DevOps` (any case) is DevOps; anything else is Engineer.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("devops") {
            JobRole::DevOps
        } else {
            JobRole::Engineer
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobRole::DevOps => "DevOps",
            JobRole::Engineer => "Engineer",
        }
    }

    /// Check if this role deploys the organization-wide stacks.
    pub fn is_devops(&self) -> bool {
        matches!(self, JobRole::DevOps)
    }
}

impl std::fmt::Display for JobRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settings for one deployment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSettings {
    /// Job role of the operator.
    pub job_role: JobRole,

    /// Home region of the SSO instance.
    pub sso_region: Option<String>,

    /// ARN of the SSO instance permission sets are created in.
    pub sso_instance_arn: Option<String>,

    /// Public domain for cross-account services.
    pub services_domain: Option<String>,

    /// Region stacks deploy to unless they say otherwise.
    pub default_region: String,
}

impl Default for DeploymentSettings {
    fn default() -> Self {
        Self {
            job_role: JobRole::Engineer,
            sso_region: None,
            sso_instance_arn: None,
            services_domain: None,
            default_region: DEFAULT_REGION.to_string(),
        }
    }
}

impl DeploymentSettings {
    /// Load settings from environment variables.
    ///
    /// Environment variables:
    /// - `JOB_ROLE`: `DevOps` for organization-wide stacks (default: Engineer)
    /// - `SSO_REGION`: SSO home region
    /// - `SSO_INSTANCE_ARN`: SSO instance ARN
    /// - `SE_SERVICES_DOMAIN`: Services domain name
    /// - `STACKGUARD_DEFAULT_REGION`: Default region (default: us-east-2)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    ///
    /// # Example
    ///
    /// ```
    /// use stackguard_accounts::{DeploymentSettings, JobRole};
    ///
    /// let settings = DeploymentSettings::from_lookup(|key| match key {
    ///     "JOB_ROLE" => Some("DevOps".to_string()),
    ///     "SSO_REGION" => Some("us-east-1".to_string()),
    ///     _ => None,
    /// });
    ///
    /// assert_eq!(settings.job_role, JobRole::DevOps);
    /// assert_eq!(settings.sso_region.as_deref(), Some("us-east-1"));
    /// assert_eq!(settings.default_region, "us-east-2");
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let default = Self::default();

        Self {
            job_role: get(JOB_ROLE_VAR)
                .map(|s| JobRole::parse(&s))
                .unwrap_or(default.job_role),
            sso_region: get(SSO_REGION_VAR),
            sso_instance_arn: get(SSO_INSTANCE_ARN_VAR),
            services_domain: get(SERVICES_DOMAIN_VAR),
            default_region: get(DEFAULT_REGION_VAR).unwrap_or(default.default_region),
        }
    }

    /// Region the SSO permission-set stack deploys to.
    pub fn sso_region(&self) -> &str {
        self.sso_region.as_deref().unwrap_or(&self.default_region)
    }

    /// Validate that the settings a deployment needs are present.
    ///
    /// The services domain is always required. A DevOps deployment also
    /// needs the SSO region and instance ARN, and the instance ARN must be
    /// an SSO instance ARN.
    pub fn validate_for_devops(&self) -> Result<(), ConfigError> {
        if self.services_domain.is_none() {
            return Err(ConfigError::MissingEnvVar(SERVICES_DOMAIN_VAR.to_string()));
        }
        if !self.job_role.is_devops() {
            return Ok(());
        }
        if self.sso_region.is_none() {
            return Err(ConfigError::MissingEnvVar(SSO_REGION_VAR.to_string()));
        }
        match &self.sso_instance_arn {
            None => Err(ConfigError::MissingEnvVar(SSO_INSTANCE_ARN_VAR.to_string())),
            Some(arn) if !arn.starts_with("arn:aws:sso:::instance/") => {
                Err(ConfigError::InvalidValue {
                    key: SSO_INSTANCE_ARN_VAR.to_string(),
                    message: format!("`{arn}` is not an SSO instance ARN"),
                })
            }
            Some(_) => Ok(()),
        }
    }
}
