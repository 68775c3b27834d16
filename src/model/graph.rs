use serde::{Deserialize, Serialize};

use crate::{
    FlowError, Result,
    model::{EdgeModel, NodeModel},
};

/// Graph definition as submitted by clients: `{nodes: [...], edges: [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphModel {
    #[serde(default)]
    pub nodes: Vec<NodeModel>,
    #[serde(default)]
    pub edges: Vec<EdgeModel>,
}

impl GraphModel {
    pub fn from_json(s: &str) -> Result<Self> {
        let value = serde_json::from_str::<serde_json::Value>(s).map_err(|e| FlowError::Flow(format!("{}", e)))?;
        Self::from_value(value)
    }

    /// Validates the shape against [`GraphModel::schema`] before deserializing.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        jsonschema::validate(&Self::schema(), &value)?;
        serde_json::from_value::<GraphModel>(value).map_err(|e| FlowError::Flow(format!("{}", e)))
    }

    pub fn schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "required": ["nodes"],
            "properties": {
                "nodes": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["id", "data"],
                        "properties": {
                            "id": { "type": "string", "minLength": 1 },
                            "data": {
                                "type": "object",
                                "required": ["type"],
                                "properties": {
                                    "type": { "type": "string", "minLength": 1 },
                                    "config": { "type": "object" }
                                }
                            }
                        }
                    }
                },
                "edges": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["source", "target"],
                        "properties": {
                            "source": { "type": "string" },
                            "target": { "type": "string" }
                        }
                    }
                }
            }
        })
    }
}
