//! # agentflow
//!
//! agentflow is an embeddable engine that runs a graph of "agent" steps as one
//! pipeline. Each agent is an external program; the engine orders the graph by
//! dependency, runs the agents one after another, feeds every agent the outputs
//! of the agents that completed before it, and streams progress to observers.
//!
//! ## Core Features
//!
//! - **Deterministic scheduling**: Kahn's algorithm with declaration-order tie breaking
//! - **Process isolation**: every node runs as a child process with a timeout
//! - **Best-effort runs**: a failed node is recorded and the run goes on
//! - **Live progress**: per-run subscribers receive node and run events
//! - **Pluggable storage**: in-memory storage (testing) and PostgreSQL (production)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use agentflow::{EngineBuilder, GraphModel};
//!
//! let engine = EngineBuilder::new().build()?;
//! engine.launch();
//!
//! let graph = GraphModel::from_json(json_str)?;
//! let record = engine.start_run("flow-1", graph)?;
//! let subscription = engine.subscribe_channel(&record.id);
//! ```

mod agent;
mod builder;
mod common;
mod config;
mod dispatcher;
mod engine;
mod error;
mod events;
mod graph;
mod model;
mod runtime;
mod store;
mod utils;

use std::sync::{Arc, RwLock};

pub use agent::{AgentProgram, AgentRegistry};
pub use builder::EngineBuilder;
pub use common::Vars;
pub use config::{Config, ExecutorConfig, PostgresConfig, StoreConfig, StoreType};
pub use dispatcher::{CONTEXT_FILE_ARG, ExecutorMode, HEADLESS_MODE, MockExecutor, NodeExecutor, ProcessExecutor, RAW_OUTPUT_KEY, RESULT_SENTINEL, extract_output};
pub use engine::{Engine, SHUTDOWN_REASON, STOP_REASON};
pub use error::FlowError;
pub use events::*;
pub use graph::{
    Graph,
    node::{Node, NodeId},
};
pub use model::*;
pub use runtime::{Broadcaster, CallbackSubscriber, ChannelSubscriber, RunContext, RunHandle, RunId, SUBSCRIPTION_BUFFER_SIZE, Subscriber, SubscriberId, Subscription};
pub use store::{PageData, Store};

/// Result type alias for agentflow operations.
pub type Result<T> = std::result::Result<T, FlowError>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;
