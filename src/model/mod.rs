mod edge;
mod execution;
mod flow;
mod graph;
mod node;

pub use edge::EdgeModel;
pub use execution::{ExecutionRecord, ExecutionStatus, NodeResult, NodeStatus};
pub use flow::FlowModel;
pub use graph::GraphModel;
pub use node::{NodeDataModel, NodeModel};
