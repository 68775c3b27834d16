use serde::{Deserialize, Serialize};

use crate::{FlowError, Result, common::Vars, model::NodeModel};

/// node id
pub type NodeId = String;

/// Runtime node bound to an agent type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Node {
    /// node id, unique within the graph
    pub id: NodeId,
    /// agent type the node dispatches to
    pub node_type: String,
    /// agent configuration
    pub config: Vars,
}

impl Node {
    pub fn new(model: &NodeModel) -> Result<Self> {
        if model.id.is_empty() {
            return Err(FlowError::Node("missing id in node".to_string()));
        }
        if model.data.node_type.is_empty() {
            return Err(FlowError::Node(format!("missing type in node {}", model.id)));
        }

        Ok(Self {
            id: model.id.clone(),
            node_type: model.data.node_type.clone(),
            config: model.data.config.clone(),
        })
    }
}
