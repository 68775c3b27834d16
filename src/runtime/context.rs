use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use crate::{graph::node::NodeId, runtime::RunId};

/// Outputs of the nodes that completed so far in one run.
///
/// Append-only: an entry is added once, when its node completes, and is never
/// replaced or removed. Failed nodes never get an entry, so downstream nodes
/// see their id as absent.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    run_id: RunId,
    outputs: BTreeMap<NodeId, Value>,
}

impl RunContext {
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Adds the output of a completed node. Returns `false` if `nid` already has an entry.
    pub fn add_output(
        &mut self,
        nid: NodeId,
        output: Value,
    ) -> bool {
        if self.outputs.contains_key(&nid) {
            warn!(run_id = %self.run_id, node_id = %nid, "output already recorded, keeping the first one");
            return false;
        }
        self.outputs.insert(nid, output);
        true
    }

    pub fn get(
        &self,
        nid: &str,
    ) -> Option<&Value> {
        self.outputs.get(nid)
    }

    pub fn contains(
        &self,
        nid: &str,
    ) -> bool {
        self.outputs.contains_key(nid)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// JSON object snapshot `{node_id: output}` handed to agents.
    pub fn to_value(&self) -> Value {
        Value::Object(self.outputs.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}
