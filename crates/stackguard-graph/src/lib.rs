//! # Stackguard Graph
//!
//! The stack dependency graph and the order stacks deploy in.
//!
//! ## Overview
//!
//! - **Stacks**: Deployable units, each bound to one account and region
//! - **Dependencies**: Ordering edges, `from` deploys after `to`
//! - **Trust Grants**: Cross-account authorizations declared by stacks
//! - **Ordering**: Deterministic topological sort with cycle reporting
//! - **Plans**: Order plus the waves that may deploy concurrently
//!
//! ## Usage
//!
//! ```rust
//! use stackguard_accounts::Account;
//! use stackguard_graph::{plan, GraphError, ResourceGraph};
//!
//! let root = Account::new("ROOT", "654654598073", "us-east-2");
//! let mut graph = ResourceGraph::new();
//! graph.add_node("SERootNetworkingStack", root.clone()).unwrap();
//! graph.add_node("SEDevNetworkingStack", root).unwrap();
//! graph.add_dependency("SEDevNetworkingStack", "SERootNetworkingStack").unwrap();
//!
//! let plan = plan(&graph).unwrap();
//! assert_eq!(plan.order, vec!["SERootNetworkingStack", "SEDevNetworkingStack"]);
//!
//! graph.add_dependency("SERootNetworkingStack", "SEDevNetworkingStack").unwrap();
//! assert!(matches!(stackguard_graph::order(&graph), Err(GraphError::CyclicDependency(_))));
//! ```

pub mod error;
pub mod grant;
pub mod graph;
pub mod node;
pub mod order;

pub use error::{GraphError, GraphResult};
pub use grant::{ConditionOperator, ConditionValue, GrantCondition, TrustGrant};
pub use graph::ResourceGraph;
pub use node::StackNode;
pub use order::{order, plan, Cycle, DeploymentPlan};
