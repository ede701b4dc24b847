//! # AWS Services
//!
//! Defines the service prefixes that capabilities are scoped to.
//! Services are grouped into categories so tiers can be reasoned about
//! at a coarser level than individual actions.

use serde::{Deserialize, Serialize};

/// Broad category a service belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    /// Key management and secret storage.
    Security,
    /// Principals, roles and federation.
    Identity,
    /// DNS, certificates and API front doors.
    Networking,
    /// Functions and instances.
    Compute,
    /// Source control, build and release tooling.
    DevOps,
    /// Databases, object storage and backups.
    Data,
    /// Notifications and email.
    Messaging,
    /// Organization-wide and account-wide administration.
    Management,
}

impl ServiceCategory {
    /// Get the string representation of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Security => "security",
            ServiceCategory::Identity => "identity",
            ServiceCategory::Networking => "networking",
            ServiceCategory::Compute => "compute",
            ServiceCategory::DevOps => "devops",
            ServiceCategory::Data => "data",
            ServiceCategory::Messaging => "messaging",
            ServiceCategory::Management => "management",
        }
    }
}

/// AWS services that the validator knows by name.
///
/// Services are organized by category:
/// - **Security**: Kms, SecretsManager
/// - **Identity**: Iam, Sts, Sso
/// - **Networking**: Route53, Acm, ApiGateway
/// - **Compute**: Lambda, Ec2
/// - **DevOps**: CodePipeline, CodeBuild, CodeCommit, CloudFormation
/// - **Data**: S3, DynamoDb, Rds, Redshift, Backup
/// - **Messaging**: Sns, Ses
/// - **Management**: Organizations, Account, Logs, CloudWatch, Ssm
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AwsService {
    // Security
    /// Key Management Service.
    Kms,
    /// Secrets Manager.
    SecretsManager,

    // Identity
    /// Identity and Access Management.
    Iam,
    /// Security Token Service.
    Sts,
    /// IAM Identity Center (SSO).
    Sso,

    // Networking
    /// Route 53 DNS.
    Route53,
    /// Certificate Manager.
    Acm,
    /// API Gateway.
    ApiGateway,

    // Compute
    /// Lambda functions.
    Lambda,
    /// Elastic Compute Cloud.
    Ec2,

    // DevOps
    /// CodePipeline.
    CodePipeline,
    /// CodeBuild.
    CodeBuild,
    /// CodeCommit.
    CodeCommit,
    /// CloudFormation.
    CloudFormation,

    // Data
    /// Simple Storage Service.
    S3,
    /// DynamoDB.
    DynamoDb,
    /// Relational Database Service.
    Rds,
    /// Redshift.
    Redshift,
    /// AWS Backup.
    Backup,

    // Messaging
    /// Simple Notification Service.
    Sns,
    /// Simple Email Service.
    Ses,

    // Management
    /// AWS Organizations.
    Organizations,
    /// Account settings.
    Account,
    /// CloudWatch Logs.
    Logs,
    /// CloudWatch metrics and alarms.
    CloudWatch,
    /// Systems Manager.
    Ssm,
}

impl AwsService {
    /// Get the IAM service prefix (e.g. `"secretsmanager"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            AwsService::Kms => "kms",
            AwsService::SecretsManager => "secretsmanager",
            AwsService::Iam => "iam",
            AwsService::Sts => "sts",
            AwsService::Sso => "sso",
            AwsService::Route53 => "route53",
            AwsService::Acm => "acm",
            AwsService::ApiGateway => "apigateway",
            AwsService::Lambda => "lambda",
            AwsService::Ec2 => "ec2",
            AwsService::CodePipeline => "codepipeline",
            AwsService::CodeBuild => "codebuild",
            AwsService::CodeCommit => "codecommit",
            AwsService::CloudFormation => "cloudformation",
            AwsService::S3 => "s3",
            AwsService::DynamoDb => "dynamodb",
            AwsService::Rds => "rds",
            AwsService::Redshift => "redshift",
            AwsService::Backup => "backup",
            AwsService::Sns => "sns",
            AwsService::Ses => "ses",
            AwsService::Organizations => "organizations",
            AwsService::Account => "account",
            AwsService::Logs => "logs",
            AwsService::CloudWatch => "cloudwatch",
            AwsService::Ssm => "ssm",
        }
    }

    /// Parse a service from its IAM prefix (case-insensitive).
    ///
    /// # Example
    ///
    /// ```
    /// use stackguard_policy::services::AwsService;
    ///
    /// assert_eq!(AwsService::parse("KMS"), Some(AwsService::Kms));
    /// assert_eq!(AwsService::parse("secretsmanager"), Some(AwsService::SecretsManager));
    /// assert_eq!(AwsService::parse("snowflake"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|service| service.as_str().eq_ignore_ascii_case(s))
    }

    /// Get the category this service belongs to.
    ///
    /// # Example
    ///
    /// ```
    /// use stackguard_policy::services::{AwsService, ServiceCategory};
    ///
    /// assert_eq!(AwsService::Kms.category(), ServiceCategory::Security);
    /// assert_eq!(AwsService::Route53.category(), ServiceCategory::Networking);
    /// assert_eq!(AwsService::CodeBuild.category(), ServiceCategory::DevOps);
    /// ```
    pub fn category(&self) -> ServiceCategory {
        match self {
            AwsService::Kms | AwsService::SecretsManager => ServiceCategory::Security,
            AwsService::Iam | AwsService::Sts | AwsService::Sso => ServiceCategory::Identity,
            AwsService::Route53 | AwsService::Acm | AwsService::ApiGateway => {
                ServiceCategory::Networking
            }
            AwsService::Lambda | AwsService::Ec2 => ServiceCategory::Compute,
            AwsService::CodePipeline
            | AwsService::CodeBuild
            | AwsService::CodeCommit
            | AwsService::CloudFormation => ServiceCategory::DevOps,
            AwsService::S3
            | AwsService::DynamoDb
            | AwsService::Rds
            | AwsService::Redshift
            | AwsService::Backup => ServiceCategory::Data,
            AwsService::Sns | AwsService::Ses => ServiceCategory::Messaging,
            AwsService::Organizations
            | AwsService::Account
            | AwsService::Logs
            | AwsService::CloudWatch
            | AwsService::Ssm => ServiceCategory::Management,
        }
    }

    /// Get all known services.
    pub fn all() -> Vec<Self> {
        vec![
            AwsService::Kms,
            AwsService::SecretsManager,
            AwsService::Iam,
            AwsService::Sts,
            AwsService::Sso,
            AwsService::Route53,
            AwsService::Acm,
            AwsService::ApiGateway,
            AwsService::Lambda,
            AwsService::Ec2,
            AwsService::CodePipeline,
            AwsService::CodeBuild,
            AwsService::CodeCommit,
            AwsService::CloudFormation,
            AwsService::S3,
            AwsService::DynamoDb,
            AwsService::Rds,
            AwsService::Redshift,
            AwsService::Backup,
            AwsService::Sns,
            AwsService::Ses,
            AwsService::Organizations,
            AwsService::Account,
            AwsService::Logs,
            AwsService::CloudWatch,
            AwsService::Ssm,
        ]
    }

    /// Get all services in a category.
    pub fn in_category(category: ServiceCategory) -> Vec<Self> {
        Self::all()
            .into_iter()
            .filter(|s| s.category() == category)
            .collect()
    }

    /// Check if this service governs identity or organization structure.
    ///
    /// Grants on these services are how an account escalates beyond its tier.
    pub fn is_privileged(&self) -> bool {
        matches!(
            self.category(),
            ServiceCategory::Identity | ServiceCategory::Management
        ) && !matches!(self, AwsService::Logs | AwsService::CloudWatch)
    }
}

impl std::fmt::Display for AwsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
