use serde::{Deserialize, Serialize};

use crate::{
    Result,
    model::FlowModel,
    store::{DbCollectionIden, StoreIden},
};

/// Row of the `flows` collection.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Flow {
    pub id: String,
    pub name: String,
    pub desc: String,
    /// JSON array of tags
    pub tags: String,
    /// the whole [`FlowModel`] as JSON
    pub data: String,
    pub create_time: i64,
    pub update_time: i64,
}

impl Flow {
    pub fn model(&self) -> Result<FlowModel> {
        FlowModel::from_json(&self.data)
    }
}

impl DbCollectionIden for Flow {
    fn iden() -> StoreIden {
        StoreIden::Flows
    }
}
