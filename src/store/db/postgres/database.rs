use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing::info;

use crate::{
    Result,
    store::{DbCollection, DbStore, Store, data::*},
};

use super::{DbInit, collection::*, synclient::SynClient};

/// Durable store on PostgreSQL, tables `flows` and `executions`.
pub struct PostgresStore {
    flows: Arc<FlowCollection>,
    executions: Arc<ExecutionCollection>,
}

impl DbStore for PostgresStore {
    fn init(
        &self,
        s: &Store,
    ) -> Result<()> {
        self.flows.init()?;
        self.executions.init()?;

        s.register(self.flows());
        s.register(self.executions());
        info!("postgres store initialized");
        Ok(())
    }
}

impl PostgresStore {
    pub fn new(
        db_url: &str,
        runtime: Arc<Runtime>,
    ) -> Result<Self> {
        let conn = Arc::new(SynClient::connect(db_url, runtime)?);

        Ok(Self {
            flows: Arc::new(FlowCollection::new(&conn)),
            executions: Arc::new(ExecutionCollection::new(&conn)),
        })
    }

    pub fn flows(&self) -> Arc<dyn DbCollection<Item = Flow> + Send + Sync> {
        self.flows.clone()
    }

    pub fn executions(&self) -> Arc<dyn DbCollection<Item = Execution> + Send + Sync> {
        self.executions.clone()
    }
}
