//! Shell-script agents for tests.

use std::{fs, path::Path};

use crate::agent::AgentProgram;

/// Writes `<dir>/<agent_type>_agent.sh` and returns it as a program run by `sh`.
///
/// Inside the script `$2` is the input payload file.
pub(crate) fn script_agent(
    dir: &Path,
    agent_type: &str,
    body: &str,
) -> AgentProgram {
    let path = dir.join(format!("{agent_type}_agent.sh"));
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    AgentProgram::new(agent_type, path).with_interpreter("sh")
}
