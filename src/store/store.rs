use std::{
    any::Any,
    collections::HashMap,
    convert::AsRef,
    sync::{Arc, RwLock},
};

use tracing::{debug, trace};

use crate::{
    FlowError, Result, ShareLock,
    model::{ExecutionRecord, FlowModel},
    utils,
};

use super::{DbCollection, DbCollectionIden, PageData, StoreIden, data::*, query::Query};

#[derive(Clone)]
pub struct DynDbSetRef<T>(Arc<dyn DbCollection<Item = T>>);

/// Typed registry of the collections provided by a backend.
pub struct Store {
    collections: ShareLock<HashMap<StoreIden, Arc<dyn Any + Send + Sync + 'static>>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn collection<DATA>(&self) -> Arc<dyn DbCollection<Item = DATA>>
    where
        DATA: DbCollectionIden + Send + Sync + 'static,
    {
        let collections = self.collections.read().unwrap();

        #[allow(clippy::expect_fun_call)]
        let collection = collections.get(&DATA::iden()).expect(&format!("fail to get collection: {}", DATA::iden().as_ref()));

        #[allow(clippy::expect_fun_call)]
        collection.downcast_ref::<DynDbSetRef<DATA>>().map(|v| v.0.clone()).expect(&format!("fail to get collection: {}", DATA::iden().as_ref()))
    }

    pub fn register<DATA>(
        &self,
        collection: Arc<dyn DbCollection<Item = DATA> + Send + Sync + 'static>,
    ) where
        DATA: DbCollectionIden + 'static,
    {
        let mut collections = self.collections.write().unwrap();
        collections.insert(DATA::iden(), Arc::new(DynDbSetRef::<DATA>(collection)));
    }

    pub fn flows(&self) -> Arc<dyn DbCollection<Item = Flow>> {
        self.collection()
    }

    pub fn executions(&self) -> Arc<dyn DbCollection<Item = Execution>> {
        self.collection()
    }

    /// Creates or replaces a flow definition, keeping its original `create_time`.
    pub fn deploy(
        &self,
        flow: &FlowModel,
    ) -> Result<bool> {
        trace!("store::deploy({})", flow.id);
        if flow.id.is_empty() {
            return Err(FlowError::Flow("missing id in flow".into()));
        }

        let flows = self.flows();
        let now = utils::time::time_millis();
        let mut data = Flow {
            id: flow.id.clone(),
            name: flow.name.clone(),
            desc: flow.desc.clone(),
            tags: serde_json::to_string(&flow.tags)?,
            data: serde_json::to_string(flow)?,
            create_time: now,
            update_time: 0,
        };

        if flows.exists(&flow.id)? {
            data.create_time = flows.find(&flow.id)?.create_time;
            data.update_time = now;
            debug!(flow_id = %flow.id, "flow updated");
            flows.update(&data)
        } else {
            debug!(flow_id = %flow.id, "flow created");
            flows.create(&data)
        }
    }

    /// Loads a deployed flow definition.
    pub fn flow(
        &self,
        flow_id: &str,
    ) -> Result<FlowModel> {
        let flows = self.flows();
        if !flows.exists(flow_id)? {
            return Err(FlowError::FlowNotFound(flow_id.to_string()));
        }
        flows.find(flow_id)?.model()
    }

    /// Writes the whole record, inserting it on first save.
    pub fn save_record(
        &self,
        record: &ExecutionRecord,
    ) -> Result<()> {
        let executions = self.executions();
        let data = Execution::try_from(record)?;
        if executions.exists(&record.id)? {
            executions.update(&data)?;
        } else {
            executions.create(&data)?;
        }
        trace!(run_id = %record.id, status = %record.status, "record saved");
        Ok(())
    }

    pub fn record(
        &self,
        id: &str,
    ) -> Result<ExecutionRecord> {
        let executions = self.executions();
        if !executions.exists(id)? {
            return Err(FlowError::ExecutionNotFound(id.to_string()));
        }
        ExecutionRecord::try_from(&executions.find(id)?)
    }

    /// Records of a flow, newest first.
    pub fn history(
        &self,
        flow_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<PageData<ExecutionRecord>> {
        let q = Query::new().filter("flow_id", flow_id).order("created_at", true).set_limit(limit).set_offset(offset);
        self.executions().query(&q)?.try_map(|row| ExecutionRecord::try_from(&row))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{
        FlowError,
        common::Vars,
        model::{EdgeModel, ExecutionRecord, ExecutionStatus, FlowModel, GraphModel, NodeModel, NodeResult},
        store::{DbStore, MemStore, Store},
    };

    fn store() -> Store {
        let store = Store::new();
        MemStore::new().init(&store).unwrap();
        store
    }

    fn flow(id: &str) -> FlowModel {
        FlowModel {
            id: id.to_string(),
            name: "risk pipeline".to_string(),
            desc: String::new(),
            tags: vec!["trading".to_string()],
            definition: GraphModel {
                nodes: vec![NodeModel::new("A", "risk", Vars::new()), NodeModel::new("B", "trading", Vars::new())],
                edges: vec![EdgeModel::new("A", "B")],
            },
        }
    }

    #[test]
    fn test_deploy_and_load_flow() {
        let store = store();
        assert!(store.deploy(&flow("f1")).unwrap());
        let created = store.flows().find("f1").unwrap().create_time;

        let mut changed = flow("f1");
        changed.name = "renamed".to_string();
        store.deploy(&changed).unwrap();

        let row = store.flows().find("f1").unwrap();
        assert_eq!(row.create_time, created);
        assert!(row.update_time > 0);
        assert_eq!(store.flow("f1").unwrap(), changed);
    }

    #[test]
    fn test_deploy_requires_id() {
        assert!(store().deploy(&flow("")).is_err());
    }

    #[test]
    fn test_missing_flow() {
        assert_eq!(store().flow("nope"), Err(FlowError::FlowNotFound("nope".to_string())));
    }

    #[test]
    fn test_save_record_replaces_row() {
        let store = store();
        let mut record = ExecutionRecord::new("f1");
        store.save_record(&record).unwrap();
        assert_eq!(store.record(&record.id).unwrap().status, ExecutionStatus::Pending);

        record.start().unwrap();
        record.record_node("A", NodeResult::completed(json!({"risk": "low"}), 4)).unwrap();
        record.finish(&["A".to_string()]).unwrap();
        store.save_record(&record).unwrap();

        let loaded = store.record(&record.id).unwrap();
        assert_eq!(loaded, record);
        assert_eq!(store.executions().query(&Default::default()).unwrap().count, 1);
    }

    #[test]
    fn test_missing_record() {
        assert!(matches!(store().record("nope"), Err(FlowError::ExecutionNotFound(_))));
    }

    #[test]
    fn test_history_newest_first() {
        let store = store();
        let mut ids = Vec::new();
        for i in 0..5 {
            let mut record = ExecutionRecord::new("f1");
            record.created_at = 1_000 + i;
            store.save_record(&record).unwrap();
            ids.push(record.id);
        }
        store.save_record(&ExecutionRecord::new("f2")).unwrap();

        let page = store.history("f1", 2, 0).unwrap();
        assert_eq!(page.count, 5);
        assert_eq!(page.page_count, 3);
        assert_eq!(page.rows.iter().map(|r| r.id.clone()).collect::<Vec<_>>(), vec![ids[4].clone(), ids[3].clone()]);

        let last = store.history("f1", 2, 4).unwrap();
        assert_eq!(last.page_num, 3);
        assert_eq!(last.rows.len(), 1);
        assert_eq!(last.rows[0].id, ids[0]);
    }
}
