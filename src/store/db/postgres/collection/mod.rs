mod execution;
mod flow;

use std::sync::Arc;

use sea_query::{Alias as SeaAlias, Cond, Condition, Expr as SeaExpr, Value as SeaValue};
use serde_json::Value as JsonValue;

use super::synclient::SynClient;
use crate::store::query::Query;

use crate::store::map_db_err;
pub use execution::ExecutionCollection;
pub use flow::FlowCollection;

pub type DbConnection = Arc<SynClient>;

/// Builds the `WHERE` condition of a query: every filter must hold.
pub fn into_query(q: &Query) -> Condition {
    let mut cond = Cond::all();
    for (key, value) in q.filters() {
        let col = SeaExpr::col(SeaAlias::new(key));
        cond = match value {
            JsonValue::Null => cond.add(col.is_null()),
            value => cond.add(col.eq(into_sea_value(value))),
        };
    }
    cond
}

fn into_sea_value(value: &JsonValue) -> SeaValue {
    match value {
        JsonValue::Bool(b) => (*b).into(),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().unwrap_or_default().into(),
        },
        JsonValue::String(s) => s.clone().into(),
        other => other.to_string().into(),
    }
}
