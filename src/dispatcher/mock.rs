use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::{
    Result,
    dispatcher::{ExecutorMode, NodeExecutor},
    graph::node::Node,
    model::NodeResult,
    runtime::RunContext,
    utils,
};

/// Simulates every node: waits `delay`, then completes with a canned output.
pub struct MockExecutor {
    delay: Duration,
}

impl MockExecutor {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
        }
    }
}

#[async_trait]
impl NodeExecutor for MockExecutor {
    async fn dispatch(
        &self,
        node: &Node,
        ctx: &RunContext,
    ) -> Result<NodeResult> {
        let start = utils::time::time_millis();
        debug!(run_id = ctx.run_id(), node_id = %node.id, agent = %node.node_type, "mock dispatch");

        tokio::time::sleep(self.delay).await;

        let output = json!({ "message": format!("Mock output from {}", node.node_type) });
        Ok(NodeResult::completed(output, utils::time::elapsed_millis(start)).with_return_code(Some(0)))
    }

    fn mode(&self) -> ExecutorMode {
        ExecutorMode::Mock
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::MockExecutor;
    use crate::{
        common::Vars,
        dispatcher::NodeExecutor,
        graph::node::Node,
        model::{NodeModel, NodeStatus},
        runtime::RunContext,
    };

    #[tokio::test]
    async fn test_mock_output() {
        let executor = MockExecutor::new(Duration::from_millis(10));
        let node = Node::new(&NodeModel::new("A", "risk", Vars::new())).unwrap();

        let result = executor.dispatch(&node, &RunContext::new("run-1")).await.unwrap();
        assert_eq!(result.status, NodeStatus::Completed);
        assert_eq!(result.output, Some(json!({"message": "Mock output from risk"})));
        assert!(result.duration_ms >= 0);
    }
}
