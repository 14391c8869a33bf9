//! Validated value containers
//!
//! A [`ValueObject`] is what [`Schema::validate`](crate::Schema::validate) produces,
//! both for inbound JSON and for rows read back from the database.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{MetaSqlError, Result};

/// Source of column values for INSERT and UPDATE, keyed by provider name
pub trait ValueGetter {
    fn get_value(&self, name: &str) -> Option<Value>;
}

/// Validated, map-like container keyed by provider name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueObject {
    table: String,
    values: Map<String, Value>,
}

impl ValueObject {
    pub(crate) fn from_map(table: String, values: Map<String, Value>) -> Self {
        Self { table, values }
    }

    /// Table of the schema that validated this object
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Typed accessor
    ///
    /// `Ok(None)` when the field is absent or null, `Err` when the stored value
    /// cannot be read as `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|e| {
                MetaSqlError::validation(format!("Field '{}' has unexpected type: {}", name, e))
            }),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Deserialize into a caller-defined struct
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_json())?)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.values.clone())
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }
}

impl ValueGetter for ValueObject {
    fn get_value(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }
}

impl ValueGetter for Map<String, Value> {
    fn get_value(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl ValueGetter for Value {
    fn get_value(&self, name: &str) -> Option<Value> {
        self.as_object().and_then(|o| o.get(name).cloned())
    }
}
