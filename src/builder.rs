use std::{sync::Arc, time::Duration};

use tokio::runtime::{Builder, Runtime};
use tracing::info;

use crate::{
    Config, Engine, FlowError, Result, StoreType,
    agent::AgentRegistry,
    dispatcher::{ExecutorMode, MockExecutor, NodeExecutor, ProcessExecutor},
    store::{DbStore, MemStore, PostgresStore, Store},
};

/// Builds an [`Engine`] from a [`Config`] plus explicit overrides.
pub struct EngineBuilder {
    config: Config,
    rt: Option<Arc<Runtime>>,
    registry: Option<Arc<AgentRegistry>>,
    executor: Option<Arc<dyn NodeExecutor>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            config: Config::default(),
            rt: None,
            registry: None,
            executor: None,
        }
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn async_worker_thread_number(
        mut self,
        n: u16,
    ) -> Self {
        self.config.async_worker_thread_number = n;
        self
    }

    pub fn runtime(
        mut self,
        runtime: Arc<Runtime>,
    ) -> Self {
        self.rt = Some(runtime);
        self
    }

    pub fn store_type(
        mut self,
        store_type: StoreType,
    ) -> Self {
        self.config.store.store_type = store_type;
        self
    }

    /// Uses this registry instead of scanning `executor.agents_dir`.
    pub fn registry(
        mut self,
        registry: Arc<AgentRegistry>,
    ) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn mode(
        mut self,
        mode: ExecutorMode,
    ) -> Self {
        self.config.executor.mode = mode;
        self
    }

    /// Agent timeout of the process executor, whole seconds.
    pub fn timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.config.executor.timeout_secs = timeout.as_secs();
        self
    }

    pub fn mock_delay(
        mut self,
        delay: Duration,
    ) -> Self {
        self.config.executor.mock_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Uses a custom executor; `mode`, `timeout` and `mock_delay` are then ignored.
    pub fn executor(
        mut self,
        executor: Arc<dyn NodeExecutor>,
    ) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn build(&self) -> Result<Engine> {
        let config = &self.config;
        let runtime = match &self.rt {
            Some(rt) => rt.clone(),
            None => {
                if config.async_worker_thread_number == 0 {
                    return Err(FlowError::Config("async_worker_thread_number must be at least 1".to_string()));
                }
                Arc::new(Builder::new_multi_thread().worker_threads(config.async_worker_thread_number.into()).enable_all().build()?)
            }
        };

        let store = Store::new();
        let db: Box<dyn DbStore> = match config.store.store_type {
            StoreType::Mem => Box::new(MemStore::new()),
            StoreType::Postgres => {
                let postgres = config.store.postgres.as_ref().ok_or(FlowError::Config("postgres configuration is required when store type is postgres".to_string()))?;
                Box::new(PostgresStore::new(&postgres.database_url, runtime.clone())?)
            }
        };
        db.init(&store)?;

        let registry = match &self.registry {
            Some(registry) => registry.clone(),
            None => {
                let registry = AgentRegistry::with_dir(&config.executor.agents_dir, config.executor.interpreters.clone());
                registry.refresh()?;
                Arc::new(registry)
            }
        };

        let executor: Arc<dyn NodeExecutor> = match &self.executor {
            Some(executor) => executor.clone(),
            None => match config.executor.mode {
                ExecutorMode::Process => Arc::new(ProcessExecutor::new(registry.clone()).with_timeout(config.executor.timeout())),
                ExecutorMode::Mock => Arc::new(MockExecutor::new(config.executor.mock_delay())),
            },
        };
        info!(mode = executor.mode().as_ref(), agents = registry.list().len(), "engine built");

        Ok(Engine::new(runtime, Arc::new(store), registry, executor))
    }
}
