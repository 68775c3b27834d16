use serde::{Deserialize, Serialize};

/// `target` depends on `source`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeModel {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub source: String,
    pub target: String,
}

impl EdgeModel {
    pub fn new(
        source: &str,
        target: &str,
    ) -> Self {
        Self {
            id: format!("{}-{}", source, target),
            source: source.to_string(),
            target: target.to_string(),
        }
    }
}
