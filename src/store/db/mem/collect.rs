use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
};

use tracing::trace;

use crate::{
    FlowError, Result, ShareLock,
    store::{DbCollection, PageData, db::mem::DbDocument, query::Query},
};

/// One in-memory collection. Rows are replaced whole under the write lock.
#[derive(Debug, Clone)]
pub struct Collect<T> {
    name: String,
    rows: ShareLock<BTreeMap<String, T>>,
}

impl<T> Collect<T> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl<T> DbCollection for Collect<T>
where
    T: DbDocument + Clone + Send + Sync,
{
    type Item = T;

    fn exists(
        &self,
        id: &str,
    ) -> Result<bool> {
        Ok(self.rows.read().unwrap().contains_key(id))
    }

    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item> {
        self.rows.read().unwrap().get(id).cloned().ok_or_else(|| FlowError::Store(format!("{} {} not found", self.name, id)))
    }

    fn query(
        &self,
        q: &Query,
    ) -> Result<PageData<Self::Item>> {
        let mut matched = Vec::new();
        for row in self.rows.read().unwrap().values() {
            let doc = row.doc()?;
            if q.is_match(&doc) {
                matched.push((doc, row.clone()));
            }
        }
        matched.sort_by(|(a, _), (b, _)| q.compare(a, b));

        let count = matched.len();
        let rows = matched.into_iter().skip(q.offset()).take(q.limit()).map(|(_, row)| row).collect();
        Ok(PageData::new(q, count, rows))
    }

    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        trace!("{}::create({})", self.name, data.id());
        let mut rows = self.rows.write().unwrap();
        if rows.contains_key(data.id()) {
            return Err(FlowError::Store(format!("{} {} already exists", self.name, data.id())));
        }
        rows.insert(data.id().to_string(), data.clone());
        Ok(true)
    }

    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        trace!("{}::update({})", self.name, data.id());
        let mut rows = self.rows.write().unwrap();
        match rows.get_mut(data.id()) {
            Some(row) => {
                *row = data.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(
        &self,
        id: &str,
    ) -> Result<bool> {
        trace!("{}::delete({})", self.name, id);
        Ok(self.rows.write().unwrap().remove(id).is_some())
    }
}
