//! petgraph-based workflow execution engine.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use super::node::{Node, NodeContext, NodeOutput, WorkflowError};
use super::state::WorkflowState;

/// Edge condition for routing between nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeCondition {
    /// Default edge, taken on `NodeOutput::Continue`.
    Always,
    /// Taken when the node branches with this label.
    OnCondition(String),
}

impl EdgeCondition {
    pub fn on(condition: impl Into<String>) -> Self {
        Self::OnCondition(condition.into())
    }
}

pub struct WorkflowRuntime {
    graph: DiGraph<Box<dyn Node>, EdgeCondition>,
    node_indices: HashMap<String, NodeIndex>,
    entry_node_id: String,
    max_steps: usize,
}

impl WorkflowRuntime {
    fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
            entry_node_id: String::new(),
            max_steps: 8,
        }
    }

    pub fn node_ids(&self) -> Vec<&str> {
        self.node_indices.keys().map(|s| s.as_str()).collect()
    }

    /// The workflow is a DAG by construction; kept for debug assertions.
    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Run the workflow to completion for one request.
    pub async fn run(
        &self,
        state: &mut WorkflowState,
        ctx: &NodeContext<'_>,
    ) -> Result<(), WorkflowError> {
        let mut current_idx = *self
            .node_indices
            .get(&self.entry_node_id)
            .ok_or_else(|| {
                WorkflowError::new(
                    "runtime",
                    format!("entry node not found: {}", self.entry_node_id),
                )
            })?;

        let mut trace: Vec<String> = Vec::new();

        for _step in 0..self.max_steps {
            let node = self
                .graph
                .node_weight(current_idx)
                .ok_or_else(|| WorkflowError::new("runtime", "node missing from graph"))?;
            let node_id = node.id();
            tracing::debug!("Executing workflow node: {}", node_id);

            let output = node.execute(state, ctx).await.map_err(|err| {
                trace
                    .iter()
                    .fold(err, |e, visited| e.with_trace_entry(visited.clone()))
            })?;
            trace.push(node_id.to_string());

            match output {
                NodeOutput::Final => return Ok(()),
                NodeOutput::Continue => {
                    current_idx = self.next_node(current_idx, None)?;
                }
                NodeOutput::Branch(condition) => {
                    current_idx = self.next_node(current_idx, Some(&condition))?;
                }
            }
        }

        Err(WorkflowError::new(
            "runtime",
            format!("maximum steps ({}) exceeded", self.max_steps),
        ))
    }

    fn next_node(
        &self,
        current_idx: NodeIndex,
        condition: Option<&str>,
    ) -> Result<NodeIndex, WorkflowError> {
        let current_id = self
            .graph
            .node_weight(current_idx)
            .map(|n| n.id())
            .unwrap_or("unknown");

        let edges: Vec<(NodeIndex, &EdgeCondition)> = self
            .graph
            .edges_directed(current_idx, Direction::Outgoing)
            .map(|edge| (edge.target(), edge.weight()))
            .collect();

        if edges.is_empty() {
            return Err(WorkflowError::new(
                current_id,
                format!("no outgoing edges from node: {}", current_id),
            ));
        }

        if let Some(cond) = condition {
            for (target, weight) in &edges {
                if let EdgeCondition::OnCondition(expected) = weight {
                    if expected == cond {
                        return Ok(*target);
                    }
                }
            }
        }

        for (target, weight) in &edges {
            if **weight == EdgeCondition::Always {
                if let Some(cond) = condition {
                    tracing::warn!(
                        "Condition '{}' unmatched at node '{}', taking default edge",
                        cond,
                        current_id
                    );
                }
                return Ok(*target);
            }
        }

        Err(WorkflowError::new(
            current_id,
            format!("no edge matches condition {:?}", condition.unwrap_or("(none)")),
        ))
    }
}

/// Fluent construction of a workflow graph.
pub struct WorkflowBuilder {
    runtime: WorkflowRuntime,
    pending_edges: Vec<(String, String, EdgeCondition)>,
}

impl WorkflowBuilder {
    pub fn new() -> Self {
        Self {
            runtime: WorkflowRuntime::new(),
            pending_edges: Vec::new(),
        }
    }

    pub fn entry(mut self, node_id: impl Into<String>) -> Self {
        self.runtime.entry_node_id = node_id.into();
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.runtime.max_steps = max_steps;
        self
    }

    pub fn node(mut self, node: Box<dyn Node>) -> Self {
        let id = node.id().to_string();
        let index = self.runtime.graph.add_node(node);
        self.runtime.node_indices.insert(id, index);
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.pending_edges
            .push((from.into(), to.into(), EdgeCondition::Always));
        self
    }

    pub fn conditional_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        self.pending_edges
            .push((from.into(), to.into(), EdgeCondition::on(condition)));
        self
    }

    pub fn build(mut self) -> Result<WorkflowRuntime, WorkflowError> {
        for (from, to, condition) in self.pending_edges {
            let from_idx = *self.runtime.node_indices.get(&from).ok_or_else(|| {
                WorkflowError::new(&from, format!("source node not found: {}", from))
            })?;
            let to_idx = *self
                .runtime
                .node_indices
                .get(&to)
                .ok_or_else(|| WorkflowError::new(&to, format!("target node not found: {}", to)))?;
            self.runtime.graph.add_edge(from_idx, to_idx, condition);
        }
        Ok(self.runtime)
    }
}

impl Default for WorkflowBuilder {
    fn default() -> Self {
        Self::new()
    }
}
