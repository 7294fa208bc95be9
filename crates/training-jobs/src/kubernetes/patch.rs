use serde::Serialize;
use serde_json::{json, Value};

use crate::{job::JobKind, Result};

/// A single JSON-Patch `replace` of one field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldPatch {
    pub path: String,
    pub value: Value,
}

impl FieldPatch {
    pub fn replace(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn suspend(kind: JobKind, suspend: bool) -> Self {
        Self::replace(kind.suspend_path(), suspend)
    }

    /// `active = false` hibernates the job through the queue
    pub fn workload_active(active: bool) -> Self {
        Self::replace("/spec/active", active)
    }

    pub fn to_json_patch(&self) -> Result<json_patch::Patch> {
        let ops = json!([{ "op": "replace", "path": self.path, "value": self.value }]);
        Ok(serde_json::from_value(ops)?)
    }
}
