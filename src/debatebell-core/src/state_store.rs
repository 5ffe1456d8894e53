//! Flat key-value store used to persist timer and debate state.
//!
//! Keys are plain strings built by concatenating a caller-supplied prefix
//! with a fixed suffix (e.g. `"debate" + ".index"`), so several components
//! can share one bundle without colliding.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::DebateError;

/// A single stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    Bool(bool),
    Int(u64),
    Text(String),
    IntList(Vec<u64>),
}

/// Namespaced bag of typed values.
///
/// Getters return `None` both when a key is missing and when it holds a
/// value of a different type; callers decide how to fall back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateBundle {
    values: BTreeMap<String, StoredValue>,
}

impl StateBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u64(&mut self, key: impl Into<String>, value: u64) {
        self.values.insert(key.into(), StoredValue::Int(value));
    }

    pub fn put_bool(&mut self, key: impl Into<String>, value: bool) {
        self.values.insert(key.into(), StoredValue::Bool(value));
    }

    pub fn put_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), StoredValue::Text(value.into()));
    }

    pub fn put_u64_list(&mut self, key: impl Into<String>, values: &[u64]) {
        self.values
            .insert(key.into(), StoredValue::IntList(values.to_vec()));
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.values.get(key)? {
            StoredValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            StoredValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            StoredValue::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn get_u64_list(&self, key: &str) -> Option<&[u64]> {
        match self.values.get(key)? {
            StoredValue::IntList(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<StoredValue> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse a bundle from its JSON representation.
    pub fn from_json(content: &str) -> Result<Self, DebateError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Serialize the bundle to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, DebateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a bundle from a JSON state file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DebateError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Write the bundle to a JSON state file, replacing any previous content.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DebateError> {
        fs::write(path.as_ref(), self.to_json()?)?;
        Ok(())
    }
}
