//! String-keyed backend options with typed accessors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Configuration handed to a backend at open/init time, typically
/// deserialized from JSON. Accessors separate "absent" from "present
/// with the wrong type": the former is `Ok(None)`, the latter an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options {
    values: HashMap<String, serde_json::Value>,
}

impl Options {
    pub fn new() -> Options {
        Options::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Options {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn string_key(&self, key: &str) -> Result<Option<&str>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(serde_json::Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(StoreError::BadOption {
                key: key.to_owned(),
                expected: "string",
            }),
        }
    }

    pub fn bool_key(&self, key: &str) -> Result<Option<bool>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(serde_json::Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(StoreError::BadOption {
                key: key.to_owned(),
                expected: "bool",
            }),
        }
    }

    /// Integer accessor. Accepts integral floats as well: JSON decoders
    /// surface whole numbers as floats depending on the source.
    pub fn int_key(&self, key: &str) -> Result<Option<i64>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(serde_json::Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    return Ok(Some(i));
                }
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 => Ok(Some(f as i64)),
                    _ => Err(StoreError::BadOption {
                        key: key.to_owned(),
                        expected: "integer",
                    }),
                }
            }
            Some(_) => Err(StoreError::BadOption {
                key: key.to_owned(),
                expected: "integer",
            }),
        }
    }
}
