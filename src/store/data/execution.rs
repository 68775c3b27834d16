use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    FlowError, Result,
    model::{ExecutionRecord, ExecutionStatus},
    store::{DbCollectionIden, StoreIden},
};

/// Row of the `executions` collection. Node results and logs are stored as JSON text.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Execution {
    pub id: String,
    pub flow_id: String,
    pub status: String,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub ended_at: Option<i64>,
    pub duration_ms: Option<i64>,
    pub node_results: String,
    pub logs: String,
    pub error: Option<String>,
    pub error_node_id: Option<String>,
}

impl DbCollectionIden for Execution {
    fn iden() -> StoreIden {
        StoreIden::Executions
    }
}

impl TryFrom<&ExecutionRecord> for Execution {
    type Error = FlowError;

    fn try_from(record: &ExecutionRecord) -> Result<Self> {
        Ok(Self {
            id: record.id.clone(),
            flow_id: record.flow_id.clone(),
            status: record.status.to_string(),
            created_at: record.created_at,
            started_at: record.started_at,
            ended_at: record.ended_at,
            duration_ms: record.duration_ms,
            node_results: serde_json::to_string(&record.node_results)?,
            logs: serde_json::to_string(&record.logs)?,
            error: record.error.clone(),
            error_node_id: record.error_node_id.clone(),
        })
    }
}

impl TryFrom<&Execution> for ExecutionRecord {
    type Error = FlowError;

    fn try_from(row: &Execution) -> Result<Self> {
        let status = ExecutionStatus::from_str(&row.status).map_err(|_| FlowError::Store(format!("unknown execution status {} in {}", row.status, row.id)))?;

        Ok(Self {
            id: row.id.clone(),
            flow_id: row.flow_id.clone(),
            status,
            created_at: row.created_at,
            started_at: row.started_at,
            ended_at: row.ended_at,
            duration_ms: row.duration_ms,
            node_results: serde_json::from_str(&row.node_results)?,
            logs: serde_json::from_str(&row.logs)?,
            error: row.error.clone(),
            error_node_id: row.error_node_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Execution;
    use crate::model::{ExecutionRecord, NodeResult};

    #[test]
    fn test_record_row_conversion() {
        let mut record = ExecutionRecord::new("flow-1");
        record.start().unwrap();
        record.record_node("A", NodeResult::completed(json!({"x": 1}), 3)).unwrap();
        record.log("[1/1] Executing risk (A)");
        record.finish(&["A".to_string()]).unwrap();

        let row = Execution::try_from(&record).unwrap();
        assert_eq!(row.status, "completed");
        assert!(row.node_results.contains("\"A\""));

        assert_eq!(ExecutionRecord::try_from(&row).unwrap(), record);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let mut row = Execution::try_from(&ExecutionRecord::new("flow-1")).unwrap();
        row.status = "exploded".to_string();
        assert!(ExecutionRecord::try_from(&row).is_err());
    }
}
