use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    graph::node::NodeId,
    model::{ExecutionStatus, NodeResult},
};

/// Final event of every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionCompleteEvent {
    pub status: ExecutionStatus,
    pub duration_ms: i64,
    pub node_results: BTreeMap<NodeId, NodeResult>,
    pub failed_nodes: Vec<NodeId>,
}

/// The run failed outside of any node (setup or persistence).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionErrorEvent {
    pub error: String,
}
