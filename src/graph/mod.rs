pub mod edge;
mod graph;
pub mod node;

pub use graph::Graph;
