//! Execution record and per-node results.
//!
//! An [`ExecutionRecord`] only moves forward:
//!
//! ```text
//! Pending ──> Running ──> Completed
//!    │           │
//!    └───────────┴──────> Failed
//! ```
//!
//! `Paused` is reserved and has no transitions into or out of it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{FlowError, Result, utils};

/// Lifecycle status of an execution.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Paused,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }

    pub fn can_transition_to(
        &self,
        next: ExecutionStatus,
    ) -> bool {
        matches!(
            (self, next),
            (ExecutionStatus::Pending, ExecutionStatus::Running)
                | (ExecutionStatus::Pending, ExecutionStatus::Failed)
                | (ExecutionStatus::Running, ExecutionStatus::Completed)
                | (ExecutionStatus::Running, ExecutionStatus::Failed)
        )
    }
}

/// Outcome of a single node.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Completed,
    Failed,
}

/// Result of dispatching one node.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct NodeResult {
    pub status: NodeStatus,
    pub duration_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_code: Option<i32>,
    /// when the result was produced, in milliseconds
    #[serde(default)]
    pub timestamp: i64,
}

impl NodeResult {
    pub fn completed(
        output: serde_json::Value,
        duration_ms: i64,
    ) -> Self {
        Self {
            status: NodeStatus::Completed,
            duration_ms,
            output: Some(output),
            error: None,
            return_code: None,
            timestamp: utils::time::time_millis(),
        }
    }

    pub fn failed(
        error: String,
        duration_ms: i64,
    ) -> Self {
        Self {
            status: NodeStatus::Failed,
            duration_ms,
            output: None,
            error: Some(error),
            return_code: None,
            timestamp: utils::time::time_millis(),
        }
    }

    pub fn with_return_code(
        mut self,
        code: Option<i32>,
    ) -> Self {
        self.return_code = code;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == NodeStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status == NodeStatus::Failed
    }
}

/// Persistent state of one run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    pub id: String,
    pub flow_id: String,
    pub status: ExecutionStatus,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub ended_at: Option<i64>,
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub node_results: BTreeMap<String, NodeResult>,
    #[serde(default)]
    pub logs: Vec<String>,
    pub error: Option<String>,
    /// first node that failed, if any
    pub error_node_id: Option<String>,
}

impl ExecutionRecord {
    /// Creates a fresh `Pending` record for the flow.
    pub fn new(flow_id: &str) -> Self {
        Self {
            id: utils::uuid(),
            flow_id: flow_id.to_string(),
            status: ExecutionStatus::Pending,
            created_at: utils::time::time_millis(),
            started_at: None,
            ended_at: None,
            duration_ms: None,
            node_results: BTreeMap::new(),
            logs: Vec::new(),
            error: None,
            error_node_id: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `Pending -> Running`, stamping `started_at`.
    pub fn start(&mut self) -> Result<()> {
        self.transition(ExecutionStatus::Running)?;
        self.started_at = Some(utils::time::time_millis());
        Ok(())
    }

    /// Records a node outcome. Only allowed while the run is `Running`.
    pub fn record_node(
        &mut self,
        node_id: &str,
        result: NodeResult,
    ) -> Result<()> {
        if self.status != ExecutionStatus::Running {
            return Err(FlowError::Runtime(format!(
                "cannot record node {} on execution {} in state {}",
                node_id, self.id, self.status
            )));
        }
        if result.is_failed() && self.error_node_id.is_none() {
            self.error_node_id = Some(node_id.to_string());
        }
        self.node_results.insert(node_id.to_string(), result);
        Ok(())
    }

    pub fn log(
        &mut self,
        line: impl Into<String>,
    ) {
        self.logs.push(line.into());
    }

    /// Ids of failed nodes, following `order` first and then any remaining ids.
    pub fn failed_nodes(
        &self,
        order: &[String],
    ) -> Vec<String> {
        let mut failed: Vec<String> = order.iter().filter(|id| self.node_results.get(*id).is_some_and(NodeResult::is_failed)).cloned().collect();
        for (id, result) in &self.node_results {
            if result.is_failed() && !failed.contains(id) {
                failed.push(id.clone());
            }
        }
        failed
    }

    /// `Running -> Completed | Failed` depending on whether any node failed.
    ///
    /// Returns the failed node ids in execution order.
    pub fn finish(
        &mut self,
        order: &[String],
    ) -> Result<Vec<String>> {
        let failed = self.failed_nodes(order);
        if failed.is_empty() {
            self.transition(ExecutionStatus::Completed)?;
        } else {
            self.transition(ExecutionStatus::Failed)?;
            self.error = Some(format!("Failed nodes: {}", failed.join(", ")));
        }
        Ok(failed)
    }

    /// Moves a non-terminal record straight to `Failed` with `error`.
    pub fn fail(
        &mut self,
        error: impl Into<String>,
    ) -> Result<()> {
        self.transition(ExecutionStatus::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    fn transition(
        &mut self,
        next: ExecutionStatus,
    ) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(FlowError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;

        if next.is_terminal() {
            let now = utils::time::time_millis();
            self.ended_at = Some(now);
            self.duration_ms = Some((now - self.started_at.unwrap_or(self.created_at)).max(0));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_new_record_is_pending() {
        let record = ExecutionRecord::new("flow-1");
        assert_eq!(record.status, ExecutionStatus::Pending);
        assert!(record.started_at.is_none());
        assert!(record.ended_at.is_none());
        assert!(record.duration_ms.is_none());
    }

    #[test]
    fn test_complete_lifecycle() {
        let mut record = ExecutionRecord::new("flow-1");
        record.start().unwrap();
        assert!(record.started_at.is_some());
        assert!(record.ended_at.is_none());

        record.record_node("A", NodeResult::completed(json!({"x": 1}), 5)).unwrap();
        let failed = record.finish(&["A".to_string()]).unwrap();

        assert!(failed.is_empty());
        assert_eq!(record.status, ExecutionStatus::Completed);
        assert!(record.ended_at.is_some());
        assert!(record.duration_ms.is_some());
        assert!(record.error.is_none());
    }

    #[test]
    fn test_failed_nodes_summary() {
        let mut record = ExecutionRecord::new("flow-1");
        record.start().unwrap();
        record.record_node("B", NodeResult::failed("boom".to_string(), 1)).unwrap();
        record.record_node("A", NodeResult::failed("bang".to_string(), 1)).unwrap();
        record.record_node("C", NodeResult::completed(json!({}), 1)).unwrap();

        let order = vec!["B".to_string(), "A".to_string(), "C".to_string()];
        let failed = record.finish(&order).unwrap();

        assert_eq!(failed, vec!["B".to_string(), "A".to_string()]);
        assert_eq!(record.status, ExecutionStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("Failed nodes: B, A"));
        assert_eq!(record.error_node_id.as_deref(), Some("B"));
    }

    #[test]
    fn test_transitions_never_regress() {
        let mut record = ExecutionRecord::new("flow-1");
        record.start().unwrap();
        record.finish(&[]).unwrap();
        let ended_at = record.ended_at;

        assert!(matches!(record.start(), Err(FlowError::InvalidTransition { .. })));
        assert!(record.fail("late").is_err());
        assert_eq!(record.status, ExecutionStatus::Completed);
        assert_eq!(record.ended_at, ended_at);
    }

    #[test]
    fn test_setup_failure_from_pending() {
        let mut record = ExecutionRecord::new("flow-1");
        record.fail("flow has no nodes to execute").unwrap();
        assert_eq!(record.status, ExecutionStatus::Failed);
        assert!(record.node_results.is_empty());
        assert!(record.ended_at.is_some());
    }

    #[test]
    fn test_record_node_requires_running() {
        let mut record = ExecutionRecord::new("flow-1");
        assert!(record.record_node("A", NodeResult::completed(json!({}), 1)).is_err());
    }

    #[test]
    fn test_paused_is_unreachable() {
        for from in [ExecutionStatus::Pending, ExecutionStatus::Running, ExecutionStatus::Completed, ExecutionStatus::Failed] {
            assert!(!from.can_transition_to(ExecutionStatus::Paused));
        }
        assert!(!ExecutionStatus::Paused.can_transition_to(ExecutionStatus::Running));
    }

    #[test]
    fn test_node_result_serialization_skips_absent_fields() {
        let result = NodeResult::failed("timed out".to_string(), 10);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], json!("failed"));
        assert!(value.get("output").is_none());
        assert!(value.get("return_code").is_none());
    }
}
