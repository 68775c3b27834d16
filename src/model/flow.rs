use serde::{Deserialize, Serialize};

use crate::{FlowError, Result, model::GraphModel};

/// A named, persisted graph definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowModel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub definition: GraphModel,
}

impl FlowModel {
    pub fn from_json(s: &str) -> Result<Self> {
        let value = serde_json::from_str::<serde_json::Value>(s).map_err(|e| FlowError::Flow(format!("{}", e)))?;
        let definition = value.get("definition").ok_or(FlowError::Flow("missing definition in flow".into()))?;
        jsonschema::validate(&GraphModel::schema(), definition)?;

        serde_json::from_value::<FlowModel>(value).map_err(|e| FlowError::Flow(format!("{}", e)))
    }
}
