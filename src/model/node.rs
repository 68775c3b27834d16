use serde::{Deserialize, Serialize};

use crate::common::Vars;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeModel {
    pub id: String,
    pub data: NodeDataModel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDataModel {
    /// agent type identifier, e.g. `risk` or `trading`
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub config: Vars,
}

impl NodeModel {
    pub fn new(
        id: &str,
        node_type: &str,
        config: Vars,
    ) -> Self {
        Self {
            id: id.to_string(),
            data: NodeDataModel {
                node_type: node_type.to_string(),
                config,
            },
        }
    }
}
