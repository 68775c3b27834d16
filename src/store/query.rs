//! Backend-neutral query over a collection: equality filters, ordering and paging.

use std::{cmp::Ordering, collections::HashMap};

use serde_json::Value as JsonValue;

/// Page size used when none is given.
pub const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub struct Query {
    filters: Vec<(String, JsonValue)>,
    order_by: Vec<(String, bool)>,
    limit: usize,
    offset: usize,
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

impl Query {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }

    /// Only keep rows whose `key` equals `value`.
    pub fn filter(
        mut self,
        key: &str,
        value: impl Into<JsonValue>,
    ) -> Self {
        self.filters.push((key.to_string(), value.into()));
        self
    }

    /// Order by `key`, descending when `rev` is set.
    pub fn order(
        mut self,
        key: &str,
        rev: bool,
    ) -> Self {
        self.order_by.push((key.to_string(), rev));
        self
    }

    /// page size, at least 1
    pub fn set_limit(
        mut self,
        limit: usize,
    ) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn set_offset(
        mut self,
        offset: usize,
    ) -> Self {
        self.offset = offset;
        self
    }

    pub fn filters(&self) -> &[(String, JsonValue)] {
        &self.filters
    }

    pub fn order_by(&self) -> &[(String, bool)] {
        &self.order_by
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether a document passes every filter.
    pub fn is_match(
        &self,
        doc: &HashMap<String, JsonValue>,
    ) -> bool {
        self.filters.iter().all(|(key, value)| doc.get(key) == Some(value))
    }

    /// Compares two documents by the ordering keys.
    pub fn compare(
        &self,
        a: &HashMap<String, JsonValue>,
        b: &HashMap<String, JsonValue>,
    ) -> Ordering {
        for (key, rev) in self.order_by.iter() {
            let ord = compare_value(a.get(key), b.get(key));
            let ord = if *rev {
                ord.reverse()
            } else {
                ord
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

fn compare_value(
    a: Option<&JsonValue>,
    b: Option<&JsonValue>,
) -> Ordering {
    match (a, b) {
        (Some(JsonValue::Number(a)), Some(JsonValue::Number(b))) => a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(Ordering::Equal),
        (Some(JsonValue::String(a)), Some(JsonValue::String(b))) => a.cmp(b),
        (Some(JsonValue::Bool(a)), Some(JsonValue::Bool(b))) => a.cmp(b),
        (Some(JsonValue::Null) | None, Some(JsonValue::Null) | None) => Ordering::Equal,
        (Some(JsonValue::Null) | None, _) => Ordering::Less,
        (_, Some(JsonValue::Null) | None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
