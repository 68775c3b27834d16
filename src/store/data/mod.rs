mod execution;
mod flow;

pub use execution::Execution;
pub use flow::Flow;
