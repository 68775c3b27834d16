//! Runtime graph representation and the topological scheduler.
//!
//! The graph is built once from a [`GraphModel`], validated, and then only read.
//! Node indices follow declaration order, which is what makes scheduling
//! deterministic: among nodes that become ready at the same time, the one
//! declared first runs first.

use std::collections::{HashMap, VecDeque};

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};

use crate::{
    FlowError, Result,
    graph::{
        edge::Edge,
        node::{Node, NodeId},
    },
    model::GraphModel,
};

/// Validated dependency graph of a flow.
#[derive(Debug, Clone)]
pub struct Graph {
    graph: DiGraph<Node, Edge>,
}

impl Graph {
    /// Output a human-readable representation of the graph
    pub fn schema(&self) -> String {
        let graph = &self.graph;
        let mut lines = Vec::new();

        lines.push("=== Flow Graph ===".to_string());
        lines.push(format!("Nodes: {}, Edges: {}", graph.node_count(), graph.edge_count()));
        lines.push(String::new());

        lines.push("--- Nodes ---".to_string());
        for idx in graph.node_indices() {
            let node = &graph[idx];
            lines.push(format!("[{}] (type: {})", node.id, node.node_type));
        }
        lines.push(String::new());

        lines.push("--- Graph Structure ---".to_string());
        for idx in graph.node_indices() {
            let node = &graph[idx];
            let outgoing: Vec<String> = self.dependents(idx).into_iter().map(|target| graph[target].id.clone()).collect();

            if outgoing.is_empty() {
                lines.push(format!("{} -> (end)", node.id));
            } else {
                lines.push(format!("{} -> {}", node.id, outgoing.join(", ")));
            }
        }

        lines.join("\n")
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// get node by id
    pub fn get_node(
        &self,
        id: &NodeId,
    ) -> Option<&Node> {
        self.graph.node_indices().find(|idx| self.graph[*idx].id.eq(id)).map(|idx| &self.graph[idx])
    }

    /// all node ids in declaration order
    pub fn get_all_node_ids(&self) -> Vec<NodeId> {
        self.graph.node_indices().map(|idx| self.graph[idx].id.clone()).collect()
    }

    /// ids of the nodes `id` depends on, in edge declaration order
    pub fn dependencies(
        &self,
        id: &NodeId,
    ) -> Vec<NodeId> {
        let Some(idx) = self.graph.node_indices().find(|idx| self.graph[*idx].id.eq(id)) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self.graph.edges_directed(idx, Direction::Incoming).map(|e| (e.id(), e.source())).collect();
        edges.sort_by_key(|(edge_idx, _)| *edge_idx);
        edges.into_iter().map(|(_, source)| self.graph[source].id.clone()).collect()
    }

    /// Orders the nodes so that every edge's source precedes its target (Kahn's algorithm).
    ///
    /// Ready nodes are served FIFO, seeded in declaration order, and a node's
    /// dependents are released in edge declaration order. Fails with
    /// [`FlowError::GraphCycle`] naming the nodes that could not be ordered.
    pub fn order(&self) -> Result<Vec<Node>> {
        let graph = &self.graph;

        let mut indegree: Vec<usize> = graph.node_indices().map(|idx| graph.edges_directed(idx, Direction::Incoming).count()).collect();
        let mut queue: VecDeque<NodeIndex> = graph.node_indices().filter(|idx| indegree[idx.index()] == 0).collect();
        let mut ordered = Vec::with_capacity(graph.node_count());

        while let Some(idx) = queue.pop_front() {
            ordered.push(idx);

            for target in self.dependents(idx) {
                indegree[target.index()] -= 1;
                if indegree[target.index()] == 0 {
                    queue.push_back(target);
                }
            }
        }

        if ordered.len() < graph.node_count() {
            let nodes = graph.node_indices().filter(|idx| indegree[idx.index()] > 0).map(|idx| graph[idx].id.clone()).collect();
            return Err(FlowError::GraphCycle {
                nodes,
            });
        }

        Ok(ordered.into_iter().map(|idx| graph[idx].clone()).collect())
    }

    /// targets of the outgoing edges of `idx`, in edge declaration order
    fn dependents(
        &self,
        idx: NodeIndex,
    ) -> Vec<NodeIndex> {
        // petgraph walks outgoing edges newest first
        let mut edges: Vec<_> = self.graph.edges_directed(idx, Direction::Outgoing).map(|e| (e.id(), e.target())).collect();
        edges.sort_by_key(|(edge_idx, _)| *edge_idx);
        edges.into_iter().map(|(_, target)| target).collect()
    }
}

impl TryFrom<&GraphModel> for Graph {
    type Error = FlowError;

    fn try_from(model: &GraphModel) -> Result<Self> {
        if model.nodes.is_empty() {
            return Err(FlowError::EmptyGraph);
        }

        let mut graph: DiGraph<Node, Edge> = DiGraph::with_capacity(model.nodes.len(), model.edges.len());
        let mut nodes = HashMap::new();

        for node in model.nodes.iter() {
            let node = Node::new(node)?;
            if nodes.contains_key(&node.id) {
                return Err(FlowError::DuplicateNode(node.id));
            }
            let nid = node.id.clone();
            let node_idx = graph.add_node(node);
            nodes.insert(nid, node_idx);
        }

        for edge in model.edges.iter() {
            let edge = Edge::from(edge);
            let reference_error = |missing: &str| FlowError::GraphReference {
                from: edge.source.clone(),
                to: edge.target.clone(),
                missing: missing.to_string(),
            };
            let source = *nodes.get(&edge.source).ok_or_else(|| reference_error(&edge.source))?;
            let target = *nodes.get(&edge.target).ok_or_else(|| reference_error(&edge.target))?;
            graph.add_edge(source, target, edge);
        }

        Ok(Self {
            graph,
        })
    }
}
