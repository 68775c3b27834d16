//! Node executors: how a single node is turned into a [`NodeResult`].
//!
//! - [`ProcessExecutor`] runs the agent as an isolated child process
//! - [`MockExecutor`] simulates agents for demos and tests

mod mock;
mod process;
mod result;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Result, graph::node::Node, model::NodeResult, runtime::RunContext};

pub use mock::MockExecutor;
pub use process::ProcessExecutor;
pub use result::{CONTEXT_FILE_ARG, HEADLESS_MODE, RAW_OUTPUT_KEY, RESULT_SENTINEL, extract_output};

/// Which [`NodeExecutor`] the engine builds from configuration.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecutorMode {
    #[default]
    Process,
    Mock,
}

#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Executes one node against the outputs collected so far.
    ///
    /// # Arguments
    ///
    /// * `node` - The [`Node`] to execute.
    /// * `ctx` - The [`RunContext`] holding the outputs of the nodes that completed before it.
    ///
    /// # Returns
    ///
    /// Returns a [`NodeResult`] once the agent ran to exit, whatever its exit code.
    /// Returns an error when the agent could not be run to completion (unknown
    /// type, spawn failure, timeout); the engine records it as a failed node.
    async fn dispatch(
        &self,
        node: &Node,
        ctx: &RunContext,
    ) -> Result<NodeResult>;

    /// Returns the [`ExecutorMode`] of the executor.
    fn mode(&self) -> ExecutorMode;
}
