//! Error types for agentflow.
//!
//! All errors are represented by the `FlowError` enum. Graph validation errors
//! abort a run before any node executes, agent errors are caught at the node
//! boundary and recorded on that node's result.

use std::{io::ErrorKind, string::FromUtf8Error};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all agentflow operations.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    /// Engine-level errors (startup, shutdown, runtime construction).
    #[error("{0}")]
    Engine(String),

    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, TOML).
    #[error("{0}")]
    Convert(String),

    /// Runtime execution errors.
    #[error("{0}")]
    Runtime(String),

    /// Storage operation errors.
    #[error("{0}")]
    Store(String),

    /// Flow definition errors.
    #[error("{0}")]
    Flow(String),

    /// Node definition errors.
    #[error("{0}")]
    Node(String),

    /// Edge definition errors.
    #[error("{0}")]
    Edge(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),

    /// Message queue errors.
    #[error("{0}")]
    Queue(String),

    /// The graph contains no nodes.
    #[error("flow has no nodes to execute")]
    EmptyGraph,

    /// Two nodes share the same id.
    #[error("duplicate node id: {0}")]
    DuplicateNode(String),

    /// An edge references a node id that is not declared.
    #[error("edge {from} -> {to} references unknown node {missing}")]
    GraphReference {
        from: String,
        to: String,
        missing: String,
    },

    /// The graph is not acyclic; `nodes` lists the nodes that could not be ordered.
    #[error("cycle detected in flow, unresolved nodes: {}", .nodes.join(", "))]
    GraphCycle {
        nodes: Vec<String>,
    },

    /// No executable is registered for the agent type.
    #[error("agent not found: {0}")]
    AgentNotFound(String),

    /// The agent process exceeded its wall-clock budget and was killed.
    #[error("agent {agent} timed out after {timeout_secs}s")]
    AgentTimeout {
        agent: String,
        timeout_secs: u64,
    },

    /// The agent process could not be spawned or its output could not be collected.
    #[error("agent {agent} failed to run: {message}")]
    AgentSpawn {
        agent: String,
        message: String,
    },

    /// The flow id does not exist in the store.
    #[error("flow {0} not found")]
    FlowNotFound(String),

    /// The execution id does not exist in the store.
    #[error("execution {0} not found")]
    ExecutionNotFound(String),

    /// An execution record was asked to move backwards in its lifecycle.
    #[error("invalid execution transition: {from} -> {to}")]
    InvalidTransition {
        from: String,
        to: String,
    },
}

impl FlowError {
    /// Whether the error invalidates the whole run before any node executes.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            FlowError::EmptyGraph
                | FlowError::DuplicateNode(_)
                | FlowError::GraphReference { .. }
                | FlowError::GraphCycle { .. }
                | FlowError::FlowNotFound(_)
                | FlowError::Flow(_)
                | FlowError::Node(_)
                | FlowError::Edge(_)
        )
    }
}

impl From<FlowError> for String {
    fn from(val: FlowError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for FlowError {
    fn from(error: std::io::Error) -> Self {
        FlowError::IoError(error.to_string())
    }
}

impl From<FlowError> for std::io::Error {
    fn from(val: FlowError) -> Self {
        #[allow(clippy::io_other_error)]
        std::io::Error::new(ErrorKind::Other, val.to_string())
    }
}

impl From<FromUtf8Error> for FlowError {
    fn from(_: FromUtf8Error) -> Self {
        FlowError::Runtime("Error with utf-8 string convert".to_string())
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(error: serde_json::Error) -> Self {
        FlowError::Convert(error.to_string())
    }
}

impl From<jsonschema::ValidationError<'_>> for FlowError {
    fn from(error: jsonschema::ValidationError<'_>) -> Self {
        FlowError::Flow(error.to_string())
    }
}
