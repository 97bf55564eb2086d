// Workflow assembly
// classify → {retrieve_generate | generate_direct} → respond

use super::node::WorkflowError;
use super::nodes::{ClassifyNode, GenerateDirectNode, RespondNode, RetrieveGenerateNode};
use super::runtime::{WorkflowBuilder, WorkflowRuntime};

/// Build the per-query agent workflow.
pub fn build_agent_workflow() -> Result<WorkflowRuntime, WorkflowError> {
    WorkflowBuilder::new()
        .entry("classify")
        .max_steps(8)
        .node(Box::new(ClassifyNode::new()))
        .node(Box::new(RetrieveGenerateNode::new()))
        .node(Box::new(GenerateDirectNode::new()))
        .node(Box::new(RespondNode::new()))
        // Classification branches
        .conditional_edge("classify", "retrieve_generate", "retrieve")
        .conditional_edge("classify", "generate_direct", "direct")
        // Both generation paths end in respond
        .edge("retrieve_generate", "respond")
        .edge("generate_direct", "respond")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_builds_and_is_acyclic() {
        let runtime = build_agent_workflow().unwrap();
        assert!(!runtime.has_cycle());

        let mut ids = runtime.node_ids();
        ids.sort();
        assert_eq!(
            ids,
            ["classify", "generate_direct", "respond", "retrieve_generate"]
        );
    }
}
