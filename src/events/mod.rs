//! Progress events pushed to the subscribers of a run.
//!
//! Events serialize as flat JSON objects tagged by `type`, e.g.
//! `{"type": "node_started", "execution_id": "...", "node_id": "A", ..., "timestamp": 1700000000000}`.

mod execution;
mod node;

pub use execution::*;
pub use node::*;
use serde::{Deserialize, Serialize};

use crate::runtime::RunId;

/// Event payload, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    NodeStarted(NodeStartedEvent),
    NodeCompleted(NodeCompletedEvent),
    NodeError(NodeErrorEvent),
    ExecutionError(ExecutionErrorEvent),
    ExecutionComplete(ExecutionCompleteEvent),
}

impl EventKind {
    pub fn str(&self) -> &str {
        match self {
            EventKind::NodeStarted(_) => "node_started",
            EventKind::NodeCompleted(_) => "node_completed",
            EventKind::NodeError(_) => "node_error",
            EventKind::ExecutionError(_) => "execution_error",
            EventKind::ExecutionComplete(_) => "execution_complete",
        }
    }
}

/// An event addressed to the subscribers of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(rename = "execution_id")]
    pub run_id: RunId,
    #[serde(flatten)]
    pub kind: EventKind,
    /// milliseconds since epoch, stamped by the broadcaster when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ProgressEvent {
    pub fn new(
        run_id: &str,
        kind: EventKind,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            kind,
            timestamp: None,
        }
    }

    pub fn with_timestamp(
        mut self,
        timestamp: i64,
    ) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.kind, EventKind::ExecutionComplete(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, EventKind::NodeError(_) | EventKind::ExecutionError(_))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let event = ProgressEvent::new(
            "run-1",
            EventKind::NodeStarted(NodeStartedEvent {
                node_id: "A".to_string(),
                node_type: "risk".to_string(),
                message: "[1/2] Executing risk (A)".to_string(),
                progress: "0/2".to_string(),
            }),
        )
        .with_timestamp(42);

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "node_started",
                "execution_id": "run-1",
                "node_id": "A",
                "node_type": "risk",
                "message": "[1/2] Executing risk (A)",
                "progress": "0/2",
                "timestamp": 42
            })
        );

        let back: ProgressEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_event_kind_names() {
        let event = ProgressEvent::new(
            "run-1",
            EventKind::NodeError(NodeErrorEvent {
                node_id: "A".to_string(),
                error: "agent not found: risk".to_string(),
            }),
        );
        assert_eq!(event.kind.str(), "node_error");
        assert!(event.is_error());
        assert!(!event.is_complete());
        assert!(serde_json::to_value(&event).unwrap().get("timestamp").is_none());
    }
}
