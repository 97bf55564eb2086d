//! Per-query agent workflow.
//!
//! A straight-line petgraph DAG: classify → retrieve_generate or
//! generate_direct → respond. No node is revisited within one request;
//! failures surface as `WorkflowError` and are mapped to a degraded
//! response at the service boundary, leaving memory untouched.

pub mod builder;
pub mod node;
pub mod nodes;
pub mod prompt;
pub mod runtime;
pub mod state;

pub use builder::build_agent_workflow;
pub use node::{Node, NodeContext, NodeOutput, WorkflowError};
pub use runtime::{WorkflowBuilder, WorkflowRuntime};
pub use state::{QueryIntent, WorkflowPath, WorkflowState};
