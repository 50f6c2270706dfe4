//! The action value routed through reducers.
//!
//! One struct covers both shapes: a single `type`, or a `types` sequence
//! (request/success/failure) that promise-style middleware expands later.
//! All other fields ride along in `payload` and serialize flat, so an
//! `Action` is the same JSON object a reducer elsewhere would see.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,

    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Action {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    /// Multi-type action, e.g. `["LOAD", "LOAD_SUCCESS", "LOAD_FAIL"]`.
    pub fn multi<I, T>(types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            types: Some(types.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(field.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    /// The `type` string, or `""` when absent.
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or("")
    }

    /// True when a non-empty `type` is present.
    pub fn is_typed(&self) -> bool {
        !self.kind().is_empty()
    }

    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}
