//! Drives one run from `Pending` to a terminal status.
//!
//! Nodes run strictly one after another in scheduler order. A failed node is
//! recorded and the run moves on; only setup and persistence errors end a run
//! early. The record is persisted after every change so pollers always read a
//! consistent row.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::{
    Result,
    dispatcher::NodeExecutor,
    events::{EventKind, ExecutionCompleteEvent, ExecutionErrorEvent, NodeCompletedEvent, NodeErrorEvent, NodeStartedEvent, ProgressEvent},
    graph::{Graph, node::Node},
    model::{ExecutionRecord, GraphModel, NodeResult, NodeStatus},
    runtime::{Broadcaster, RunContext, RunHandle},
    store::Store,
    utils,
};

/// Reason recorded when a run is aborted without one.
const ABORTED: &str = "execution aborted";
/// Error recorded for a failed node whose executor gave none.
const NODE_FAILED: &str = "node failed";

/// Where the graph of a run comes from.
pub enum RunSource {
    /// a definition supplied by the caller
    Graph(GraphModel),
    /// the deployed definition of the record's flow, read when the run starts
    Deployed,
}

pub struct Runner {
    store: Arc<Store>,
    broadcaster: Arc<Broadcaster>,
    executor: Arc<dyn NodeExecutor>,
    handle: Arc<RunHandle>,
    record: ExecutionRecord,
}

impl Runner {
    pub fn new(
        store: Arc<Store>,
        broadcaster: Arc<Broadcaster>,
        executor: Arc<dyn NodeExecutor>,
        handle: Arc<RunHandle>,
        record: ExecutionRecord,
    ) -> Self {
        Self {
            store,
            broadcaster,
            executor,
            handle,
            record,
        }
    }

    /// Runs to completion and returns the final record. Never fails: errors end up in the record.
    pub async fn run(
        mut self,
        source: RunSource,
    ) -> ExecutionRecord {
        let order = match self.prepare(source) {
            Ok(order) => order,
            Err(e) => {
                warn!(run_id = %self.record.id, flow_id = %self.record.flow_id, "invalid flow: {}", e);
                self.fail(e.to_string()).await;
                return self.record;
            }
        };

        if let Err(e) = self.execute(&order).await {
            if self.record.is_terminal() {
                // the outcome is decided, only its last write was lost
                error!(run_id = %self.record.id, status = %self.record.status, "failed to persist finished run: {}", e);
                let ids: Vec<String> = order.iter().map(|n| n.id.clone()).collect();
                let failed = self.record.failed_nodes(&ids);
                self.complete(failed).await;
            } else {
                error!(run_id = %self.record.id, "run aborted by persistence error: {}", e);
                self.fail(e.to_string()).await;
            }
        }
        self.record
    }

    /// Loads, validates and orders the graph. Nothing has run yet when this fails.
    fn prepare(
        &self,
        source: RunSource,
    ) -> Result<Vec<Node>> {
        let model = match source {
            RunSource::Graph(model) => model,
            RunSource::Deployed => self.store.flow(&self.record.flow_id)?.definition,
        };

        let graph = Graph::try_from(&model)?;
        debug!(run_id = %self.record.id, "\n{}", graph.schema());
        graph.order()
    }

    async fn execute(
        &mut self,
        order: &[Node],
    ) -> Result<()> {
        let run_id = self.record.id.clone();
        let ids: Vec<String> = order.iter().map(|n| n.id.clone()).collect();

        self.record.start()?;
        self.save()?;
        info!(run_id = %run_id, flow_id = %self.record.flow_id, order = ?ids, "run started");

        let mut ctx = RunContext::new(&run_id);
        let total = order.len();

        for (idx, node) in order.iter().enumerate() {
            if self.handle.is_aborted() {
                break;
            }

            let message = format!("[{}/{}] Executing {} ({})", idx + 1, total, node.node_type, node.id);
            info!(run_id = %run_id, node_id = %node.id, agent = %node.node_type, "{}", message);
            self.record.log(message.clone());
            self.emit(EventKind::NodeStarted(NodeStartedEvent {
                node_id: node.id.clone(),
                node_type: node.node_type.clone(),
                message,
                progress: format!("{}/{}", idx, total),
            }))
            .await;

            let start = utils::time::time_millis();
            let aborted = self.handle.aborted();
            let dispatched = tokio::select! {
                biased;
                _ = aborted => None,
                result = self.executor.dispatch(node, &ctx) => Some(result),
            };

            let mut result = match dispatched {
                Some(Ok(result)) => {
                    self.emit(EventKind::NodeCompleted(NodeCompletedEvent {
                        node_id: node.id.clone(),
                        duration_ms: result.duration_ms,
                        result: result.clone(),
                    }))
                    .await;
                    result
                }
                Some(Err(e)) => NodeResult::failed(e.to_string(), utils::time::elapsed_millis(start)),
                None => NodeResult::failed(self.abort_reason(), utils::time::elapsed_millis(start)),
            };

            match result.status {
                NodeStatus::Completed => {
                    self.record.log(format!("{} completed in {}ms", node.node_type, result.duration_ms));
                    ctx.add_output(node.id.clone(), result.output.clone().unwrap_or(Value::Null));
                }
                NodeStatus::Failed => {
                    let error = result.error.get_or_insert_with(|| NODE_FAILED.to_string()).clone();
                    warn!(run_id = %run_id, node_id = %node.id, agent = %node.node_type, "node failed: {}", error);
                    self.record.log(format!("{} failed: {}", node.node_type, error));
                    self.emit(EventKind::NodeError(NodeErrorEvent {
                        node_id: node.id.clone(),
                        error,
                    }))
                    .await;
                }
            }

            self.record.record_node(&node.id, result)?;
            self.save()?;
        }

        if self.handle.is_aborted() {
            let reason = self.abort_reason();
            info!(run_id = %run_id, reason = %reason, "run aborted");
            self.fail(reason).await;
            return Ok(());
        }

        let failed = self.record.finish(&ids)?;
        self.save()?;
        info!(run_id = %run_id, status = %self.record.status, duration_ms = ?self.record.duration_ms, "run finished");
        self.complete(failed).await;
        Ok(())
    }

    /// Moves a non-terminal record to `Failed` with `error`, persists it and tells subscribers.
    async fn fail(
        &mut self,
        error: String,
    ) {
        self.record.log(format!("Execution failed: {}", error));
        if !self.record.is_terminal() {
            if let Err(e) = self.record.fail(error.clone()) {
                error!(run_id = %self.record.id, "{}", e);
            }
        }
        if let Err(e) = self.save() {
            error!(run_id = %self.record.id, "failed to persist failed run: {}", e);
        }

        self.emit(EventKind::ExecutionError(ExecutionErrorEvent {
            error,
        }))
        .await;
        let ids: Vec<String> = self.record.node_results.keys().cloned().collect();
        let failed = self.record.failed_nodes(&ids);
        self.complete(failed).await;
    }

    /// Sends the final event and drops the run's subscribers.
    async fn complete(
        &self,
        failed_nodes: Vec<String>,
    ) {
        self.emit(EventKind::ExecutionComplete(ExecutionCompleteEvent {
            status: self.record.status,
            duration_ms: self.record.duration_ms.unwrap_or_default(),
            node_results: self.record.node_results.clone(),
            failed_nodes,
        }))
        .await;
        self.broadcaster.close(&self.record.id);
    }

    async fn emit(
        &self,
        kind: EventKind,
    ) {
        self.broadcaster.broadcast(&self.record.id, ProgressEvent::new(&self.record.id, kind)).await;
    }

    fn save(&self) -> Result<()> {
        self.store.save_record(&self.record)
    }

    fn abort_reason(&self) -> String {
        self.handle.abort_reason().unwrap_or_else(|| ABORTED.to_string())
    }
}
