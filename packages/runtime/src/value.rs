//! Value-typed data without remote identity.

use std::fmt::Debug;
use std::ops::Deref;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Structured data that lives inside an entity's property bag.
///
/// Client values have no path and no context; equality is by value.
pub trait ClientValue: Serialize + DeserializeOwned + Default + Clone + PartialEq + Debug {
    /// Server type name used in verbose payloads (`__metadata.type`).
    fn type_name() -> Option<&'static str> {
        None
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn from_json(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// An ordered list of client values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: DeserializeOwned"))]
pub struct ClientValueCollection<T>(Vec<T>);

impl<T> ClientValueCollection<T> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, value: T) {
        self.0.push(value);
    }

    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> Default for ClientValueCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deref for ClientValueCollection<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T> From<Vec<T>> for ClientValueCollection<T> {
    fn from(values: Vec<T>) -> Self {
        Self(values)
    }
}

impl<T> FromIterator<T> for ClientValueCollection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T> IntoIterator for ClientValueCollection<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a ClientValueCollection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<T: ClientValue> ClientValue for ClientValueCollection<T> {}
