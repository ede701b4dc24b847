//! Run reports
//!
//! A report is what one `stackguard` invocation found: violations, the
//! deployment plan or the cycle that prevented one.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stackguard_graph::{Cycle, DeploymentPlan, GraphError, GraphResult};
use stackguard_trust::Violation;
use uuid::Uuid;

use crate::deployment::Deployment;

/// What a run checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Trust grants and permission sets
    Validate,
    /// Deployment order and waves
    Order,
    /// Both
    Check,
}

impl Command {
    /// Check if the run validates grants and permission sets.
    pub fn validates(&self) -> bool {
        matches!(self, Command::Validate | Command::Check)
    }

    /// Check if the run computes the deployment plan.
    pub fn orders(&self) -> bool {
        matches!(self, Command::Order | Command::Check)
    }

    /// Get the command name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Validate => "validate",
            Command::Order => "order",
            Command::Check => "check",
        }
    }
}

/// Result of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Unique, time-ordered run id
    pub run_id: Uuid,

    /// When the report was generated
    pub generated_at: DateTime<Utc>,

    /// Command that produced the report
    pub command: Command,

    /// Violations found
    pub violations: Vec<Violation>,

    /// Stacks in deployment order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Vec<String>>,

    /// Stacks that may deploy concurrently
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waves: Option<Vec<Vec<String>>>,

    /// Dependency cycle that prevented ordering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle: Option<Cycle>,

    /// Fingerprint of the deployment order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,

    /// Ordering failure other than a cycle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Report {
    /// Create an empty report for a command.
    pub fn new(command: Command) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            generated_at: Utc::now(),
            command,
            violations: Vec::new(),
            order: None,
            waves: None,
            cycle: None,
            fingerprint: None,
            error: None,
        }
    }

    /// Run a command against a deployment.
    pub fn generate(command: Command, deployment: &Deployment) -> Self {
        let mut report = Self::new(command);
        if command.validates() {
            report.violations = deployment.validate();
        }
        if command.orders() {
            report.record_plan(deployment.plan());
        }
        tracing::info!(
            run_id = %report.run_id,
            command = command.as_str(),
            violations = report.violations.len(),
            "Generated report"
        );
        report
    }

    /// Record the outcome of ordering.
    pub fn record_plan(&mut self, result: GraphResult<DeploymentPlan>) {
        match result {
            Ok(plan) => self.set_plan(plan),
            Err(GraphError::CyclicDependency(cycle)) => self.cycle = Some(cycle),
            Err(other) => {
                tracing::error!(code = other.error_code(), error = %other, "Ordering failed");
                self.error = Some(other.to_string());
            }
        }
    }

    /// Record a deployment plan.
    pub fn set_plan(&mut self, plan: DeploymentPlan) {
        self.fingerprint = Some(plan.fingerprint());
        self.order = Some(plan.order);
        self.waves = Some(plan.waves);
    }

    /// Check if the run found nothing wrong.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.cycle.is_none() && self.error.is_none()
    }

    /// Process exit code: 0 when clean, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.is_clean() {
            0
        } else {
            1
        }
    }

    /// Render as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Render as plain text.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "stackguard {} (run {})", self.command.as_str(), self.run_id);

        if self.command.validates() {
            if self.violations.is_empty() {
                let _ = writeln!(out, "\nNo violations.");
            } else {
                let _ = writeln!(out, "\nViolations ({}):", self.violations.len());
                for violation in &self.violations {
                    let _ = writeln!(out, "  {violation}");
                }
            }
        }

        if let Some(cycle) = &self.cycle {
            let _ = writeln!(out, "\nDependency cycle: {cycle}");
        }
        if let Some(error) = &self.error {
            let _ = writeln!(out, "\nOrdering failed: {error}");
        }
        if let Some(waves) = &self.waves {
            let _ = writeln!(out, "\nDeployment waves:");
            for (index, wave) in waves.iter().enumerate() {
                let _ = writeln!(out, "  {}. {}", index + 1, wave.join(", "));
            }
        }
        if let Some(order) = &self.order {
            let _ = writeln!(out, "\nDeployment order:");
            for (index, stack) in order.iter().enumerate() {
                let _ = writeln!(out, "  {:>2}. {stack}", index + 1);
            }
        }
        if let Some(fingerprint) = &self.fingerprint {
            let _ = writeln!(out, "\nFingerprint: {fingerprint}");
        }
        out
    }
}
