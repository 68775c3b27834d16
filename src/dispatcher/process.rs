//! Runs a node's agent as a child process.
//!
//! The agent receives its input through a temporary JSON file passed as
//! `--context-file <path>` and answers on standard output. The file lives as
//! long as the dispatch call and is removed on every exit path, the child is
//! killed if the dispatch future is dropped.
//!
//! The timeout covers the child's exit and the end of both output streams. An
//! agent that exits but leaves a background process holding its stdout open is
//! reported as timed out, and only the direct child is killed.

use std::{fmt::Display, io::Write, process::Stdio, sync::Arc, time::Duration};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::{io::AsyncReadExt, process::Command};
use tracing::{debug, info, warn};

use crate::{
    FlowError, Result,
    agent::AgentRegistry,
    dispatcher::{
        CONTEXT_FILE_ARG, ExecutorMode, NodeExecutor,
        result::{extract_output, payload},
    },
    graph::node::Node,
    model::NodeResult,
    runtime::RunContext,
    utils,
};

/// Wall-clock budget of one agent run.
pub const DEFAULT_AGENT_TIMEOUT_SECS: u64 = 300;

pub struct ProcessExecutor {
    registry: Arc<AgentRegistry>,
    timeout: Duration,
}

impl ProcessExecutor {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(DEFAULT_AGENT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> Arc<AgentRegistry> {
        self.registry.clone()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn write_input(
        node: &Node,
        ctx: &RunContext,
    ) -> Result<NamedTempFile> {
        let mut file = tempfile::Builder::new().prefix("agentflow-").suffix(".json").tempfile().map_err(|e| spawn_error(&node.node_type, e))?;
        serde_json::to_writer(&mut file, &payload(&node.config, ctx))?;
        file.flush().map_err(|e| spawn_error(&node.node_type, e))?;
        Ok(file)
    }
}

fn spawn_error(
    agent: &str,
    err: impl Display,
) -> FlowError {
    FlowError::AgentSpawn {
        agent: agent.to_string(),
        message: err.to_string(),
    }
}

#[async_trait]
impl NodeExecutor for ProcessExecutor {
    async fn dispatch(
        &self,
        node: &Node,
        ctx: &RunContext,
    ) -> Result<NodeResult> {
        let agent = node.node_type.as_str();
        let program = self.registry.resolve(agent)?;
        let input = Self::write_input(node, ctx)?;

        let (bin, args) = program.command_line();
        let mut command = Command::new(&bin);
        command
            .args(&args)
            .arg(CONTEXT_FILE_ARG)
            .arg(input.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = program.working_dir() {
            command.current_dir(dir);
        }

        let start = utils::time::time_millis();
        let mut child = command.spawn().map_err(|e| spawn_error(agent, e))?;
        debug!(run_id = ctx.run_id(), node_id = %node.id, agent, pid = ?child.id(), "agent spawned");

        let mut stdout = child.stdout.take().ok_or_else(|| spawn_error(agent, "stdout not captured"))?;
        let mut stderr = child.stderr.take().ok_or_else(|| spawn_error(agent, "stderr not captured"))?;
        let mut out = Vec::new();
        let mut err = Vec::new();

        let outcome = tokio::time::timeout(self.timeout, async {
            tokio::try_join!(child.wait(), stdout.read_to_end(&mut out), stderr.read_to_end(&mut err))
        })
        .await;

        let status = match outcome {
            Ok(Ok((status, _, _))) => status,
            Ok(Err(e)) => {
                let _ = child.kill().await;
                return Err(spawn_error(agent, e));
            }
            Err(_) => {
                warn!(run_id = ctx.run_id(), node_id = %node.id, agent, timeout_secs = self.timeout.as_secs(), "agent timed out, killing it");
                if let Err(e) = child.kill().await {
                    warn!(node_id = %node.id, agent, "failed to kill agent: {}", e);
                }
                return Err(FlowError::AgentTimeout {
                    agent: agent.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        let duration_ms = utils::time::elapsed_millis(start);
        let stdout = String::from_utf8_lossy(&out);
        let stderr = String::from_utf8_lossy(&err);
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            debug!(node_id = %node.id, agent, stderr, "agent stderr");
        }

        let output = extract_output(&stdout);
        let code = status.code();

        if status.success() {
            info!(run_id = ctx.run_id(), node_id = %node.id, agent, duration_ms, "agent completed");
            return Ok(NodeResult::completed(output, duration_ms).with_return_code(code));
        }

        let mut error = match code {
            Some(code) => format!("agent exited with code {code}"),
            None => "agent terminated by signal".to_string(),
        };
        if let Some(line) = stderr.lines().last() {
            error = format!("{error}: {line}");
        }
        warn!(run_id = ctx.run_id(), node_id = %node.id, agent, ?code, "agent failed");

        Ok(NodeResult {
            output: Some(output),
            ..NodeResult::failed(error, duration_ms)
        }
        .with_return_code(code))
    }

    fn mode(&self) -> ExecutorMode {
        ExecutorMode::Process
    }
}
