//! Agent catalog: maps agent type names to executables.

mod registry;
#[cfg(all(test, unix))]
pub(crate) mod testing;

pub use registry::{AgentProgram, AgentRegistry};
