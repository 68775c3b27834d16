use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{FlowError, Result, ShareLock};

/// File name suffix (before the extension) that marks an agent executable.
const AGENT_SUFFIX: &str = "_agent";

/// An executable implementing one agent type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentProgram {
    /// agent type, e.g. `risk` for `risk_agent.py`
    pub agent_type: String,
    /// path to the agent file
    pub path: PathBuf,
    /// program used to run the file, `None` to execute it directly
    pub interpreter: Option<String>,
    /// whether the entry came from a directory scan
    #[serde(skip)]
    discovered: bool,
}

impl AgentProgram {
    pub fn new(
        agent_type: &str,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            agent_type: agent_type.to_string(),
            path: path.into(),
            interpreter: None,
            discovered: false,
        }
    }

    pub fn with_interpreter(
        mut self,
        interpreter: &str,
    ) -> Self {
        self.interpreter = Some(interpreter.to_string());
        self
    }

    /// Program and leading arguments of the command line, with the agent path made absolute.
    pub fn command_line(&self) -> (String, Vec<String>) {
        let path = std::path::absolute(&self.path).unwrap_or_else(|_| self.path.clone()).to_string_lossy().to_string();
        match &self.interpreter {
            Some(interpreter) => (interpreter.clone(), vec![path]),
            None => (path, Vec::new()),
        }
    }

    /// Directory the agent is run from.
    pub fn working_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }
}

/// Registry of agent types known to the engine.
///
/// Entries come from explicit [`register`](AgentRegistry::register) calls or
/// from scanning the agents directory for `<type>_agent[.ext]` files. Scanned
/// entries are only replaced by [`refresh`](AgentRegistry::refresh); explicit
/// registrations always take precedence.
pub struct AgentRegistry {
    dir: Option<PathBuf>,
    interpreters: HashMap<String, String>,
    agents: ShareLock<HashMap<String, AgentProgram>>,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRegistry {
    /// An empty registry without a directory to scan.
    pub fn new() -> Self {
        Self {
            dir: None,
            interpreters: HashMap::new(),
            agents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// A registry that discovers agents in `dir`; `interpreters` maps file extensions to programs.
    pub fn with_dir(
        dir: impl Into<PathBuf>,
        interpreters: HashMap<String, String>,
    ) -> Self {
        Self {
            dir: Some(dir.into()),
            interpreters,
            agents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Registers (or replaces) an agent explicitly.
    pub fn register(
        &self,
        program: AgentProgram,
    ) {
        debug!(agent = %program.agent_type, path = %program.path.display(), "register agent");
        let mut agents = self.agents.write().unwrap();
        agents.insert(
            program.agent_type.clone(),
            AgentProgram {
                discovered: false,
                ..program
            },
        );
    }

    pub fn unregister(
        &self,
        agent_type: &str,
    ) -> Option<AgentProgram> {
        self.agents.write().unwrap().remove(agent_type)
    }

    /// Looks up the executable for `agent_type`.
    pub fn resolve(
        &self,
        agent_type: &str,
    ) -> Result<AgentProgram> {
        self.agents.read().unwrap().get(agent_type).cloned().ok_or_else(|| FlowError::AgentNotFound(agent_type.to_string()))
    }

    pub fn contains(
        &self,
        agent_type: &str,
    ) -> bool {
        self.agents.read().unwrap().contains_key(agent_type)
    }

    /// All known agents sorted by type.
    pub fn list(&self) -> Vec<AgentProgram> {
        let mut agents: Vec<AgentProgram> = self.agents.read().unwrap().values().cloned().collect();
        agents.sort_by(|a, b| a.agent_type.cmp(&b.agent_type));
        agents
    }

    /// Rescans the agents directory, replacing previously discovered entries.
    ///
    /// Returns the number of agents found on disk.
    pub fn refresh(&self) -> Result<usize> {
        let Some(dir) = &self.dir else {
            return Ok(0);
        };
        let scanned = Self::discover(dir, &self.interpreters)?;
        let count = scanned.len();

        let mut agents = self.agents.write().unwrap();
        agents.retain(|_, program| !program.discovered);
        for program in scanned {
            if agents.contains_key(&program.agent_type) {
                debug!(agent = %program.agent_type, "explicit registration shadows discovered agent");
                continue;
            }
            agents.insert(program.agent_type.clone(), program);
        }

        info!(dir = %dir.display(), count, "agents refreshed");
        Ok(count)
    }

    /// Scans `dir` for agent files. A missing directory yields no agents.
    pub fn discover(
        dir: &Path,
        interpreters: &HashMap<String, String>,
    ) -> Result<Vec<AgentProgram>> {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "agents directory not found");
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?.filter_map(|entry| entry.ok().map(|e| e.path())).filter(|p| p.is_file()).collect();
        paths.sort();

        let mut found: Vec<AgentProgram> = Vec::new();
        for path in paths {
            let Some(agent_type) = Self::agent_type_of(&path) else {
                continue;
            };
            if found.iter().any(|p| p.agent_type == agent_type) {
                warn!(agent = %agent_type, path = %path.display(), "duplicate agent file ignored");
                continue;
            }

            let interpreter = path.extension().and_then(|ext| interpreters.get(&*ext.to_string_lossy())).cloned();
            debug!(agent = %agent_type, path = %path.display(), "discovered agent");
            found.push(AgentProgram {
                agent_type,
                path,
                interpreter,
                discovered: true,
            });
        }

        Ok(found)
    }

    /// `risk_agent.py` -> `risk`; files starting with `_` are private.
    fn agent_type_of(path: &Path) -> Option<String> {
        let name = path.file_name()?.to_string_lossy();
        if name.starts_with('_') || name.starts_with('.') {
            return None;
        }
        let stem = path.file_stem()?.to_string_lossy();
        stem.strip_suffix(AGENT_SUFFIX).filter(|t| !t.is_empty()).map(str::to_string)
    }
}
