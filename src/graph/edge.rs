use serde::{Deserialize, Serialize};

use crate::{graph::node::NodeId, model::EdgeModel};

/// Runtime edge: `target` runs after `source`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
}

impl From<&EdgeModel> for Edge {
    fn from(model: &EdgeModel) -> Self {
        Self {
            source: model.source.clone(),
            target: model.target.clone(),
        }
    }
}
