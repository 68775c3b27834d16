use serde::{Deserialize, Serialize};

use crate::{graph::node::NodeId, model::NodeResult};

/// A node is about to be dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStartedEvent {
    pub node_id: NodeId,
    pub node_type: String,
    pub message: String,
    /// `<nodes finished>/<total nodes>`
    pub progress: String,
}

/// The agent process ran to exit; `result.status` tells whether the node succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeCompletedEvent {
    pub node_id: NodeId,
    pub result: NodeResult,
    pub duration_ms: i64,
}

/// The node failed, for any reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeErrorEvent {
    pub node_id: NodeId,
    pub error: String,
}
