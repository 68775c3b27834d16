use std::collections::HashMap;

use serde_json::{Value as JsonValue, json};

use crate::{
    Result,
    store::{data::Execution, db::mem::DbDocument},
};

impl DbDocument for Execution {
    fn id(&self) -> &str {
        &self.id
    }

    fn doc(&self) -> Result<HashMap<String, JsonValue>> {
        let mut map = HashMap::new();
        map.insert("id".to_string(), json!(self.id.clone()));
        map.insert("flow_id".to_string(), json!(self.flow_id.clone()));
        map.insert("status".to_string(), json!(self.status.clone()));
        map.insert("created_at".to_string(), json!(self.created_at));
        map.insert("started_at".to_string(), json!(self.started_at));
        map.insert("ended_at".to_string(), json!(self.ended_at));
        map.insert("error_node_id".to_string(), json!(self.error_node_id.clone()));
        Ok(map)
    }
}
