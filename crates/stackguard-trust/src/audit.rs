//! Permission-set audit
//!
//! Checks SSO permission sets against the service limits and against the
//! graph: a customer-managed policy a set references has to be provisioned
//! by a stack that deploys before the set's own stack.

use stackguard_graph::ResourceGraph;
use stackguard_policy::{PermissionSetIssue, PermissionSetSpec};
use tracing::instrument;

use crate::violation::{Violation, ViolationKind};

/// Audit permission sets, accumulating every problem.
///
/// # Example
///
/// ```
/// use stackguard_accounts::Account;
/// use stackguard_graph::ResourceGraph;
/// use stackguard_policy::PermissionSetSpec;
/// use stackguard_trust::{audit_permission_sets, ViolationKind};
///
/// let root = Account::new("ROOT", "654654598073", "us-east-2");
/// let mut graph = ResourceGraph::new();
/// graph.add_node("Policies", root.clone()).unwrap();
/// graph.add_node("Sso", root).unwrap();
/// graph.add_dependency("Sso", "Policies").unwrap();
/// graph.declare_managed_policy("Policies", "SE_DevOpsFullAccess").unwrap();
///
/// let sets = vec![
///     PermissionSetSpec::new("SE_DEVOPS", "Sso").with_customer_managed(["SE_DevOpsFullAccess"]),
///     PermissionSetSpec::new("SE_ROOT", "Sso").with_customer_managed(["SE_CUSTOM_ROOT"]),
/// ];
///
/// let violations = audit_permission_sets(&graph, &sets);
/// assert_eq!(violations.len(), 1);
/// assert_eq!(violations[0].kind, ViolationKind::UnresolvedPolicyReference);
/// ```
#[instrument(skip_all, fields(sets = sets.len()))]
pub fn audit_permission_sets(graph: &ResourceGraph, sets: &[PermissionSetSpec]) -> Vec<Violation> {
    let mut violations = Vec::new();

    for set in sets {
        tracing::debug!(permission_set = %set.name, stack = %set.stack, "Auditing permission set");

        for issue in set.issues() {
            let kind = match issue {
                PermissionSetIssue::InvalidSessionDuration { .. } => ViolationKind::InvalidSessionDuration,
                PermissionSetIssue::TooManyCustomerManagedPolicies { .. }
                | PermissionSetIssue::TooManyAwsManagedPolicies { .. } => {
                    ViolationKind::PermissionSetLimitExceeded
                }
            };
            violations.push(Violation::new(kind, &set.name, issue.to_string()));
        }

        let upstream = match graph.transitive_dependencies(&set.stack) {
            Ok(upstream) => upstream,
            Err(_) => {
                violations.push(Violation::new(
                    ViolationKind::UnknownNode,
                    &set.name,
                    format!("stack {} is not declared", set.stack),
                ));
                continue;
            }
        };

        for policy in &set.customer_managed_policies {
            let provided = upstream
                .iter()
                .filter_map(|name| graph.node(name))
                .any(|node| node.provisions(policy));
            if !provided {
                violations.push(Violation::new(
                    ViolationKind::UnresolvedPolicyReference,
                    &set.name,
                    format!(
                        "customer-managed policy {policy} is not provisioned by any stack {} depends on",
                        set.stack
                    ),
                ));
            }
        }
    }

    for violation in &violations {
        tracing::warn!(code = violation.code(), subject = %violation.subject, "{}", violation.message);
    }
    tracing::info!(sets = sets.len(), violations = violations.len(), "Audited permission sets");
    violations
}
