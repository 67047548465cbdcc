//! Placeholders for values produced by service operations.

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;

use crate::error::{Error, RemoteError, Result};
use crate::sync::{read, write};

#[derive(Debug, Default)]
struct SlotState {
    operation: String,
    value: Option<serde_json::Value>,
    error: Option<RemoteError>,
}

/// Shared cell a query writes its return value into.
#[derive(Clone, Default)]
pub struct ResultSlot(Arc<RwLock<SlotState>>);

impl ResultSlot {
    fn new(operation: String) -> Self {
        Self(Arc::new(RwLock::new(SlotState {
            operation,
            ..Default::default()
        })))
    }

    pub(crate) fn resolve(&self, value: serde_json::Value) {
        let mut state = write(&self.0);
        state.value = Some(value);
        state.error = None;
    }

    pub(crate) fn fail(&self, error: RemoteError) {
        write(&self.0).error = Some(error);
    }
}

impl fmt::Debug for ResultSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = read(&self.0);
        f.debug_struct("ResultSlot")
            .field("operation", &state.operation)
            .field("resolved", &state.value.is_some())
            .finish()
    }
}

/// The typed value a service operation will return once its query has
/// been executed.
pub struct ClientResult<T> {
    slot: ResultSlot,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ClientResult<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ClientResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.slot.fmt(f)
    }
}

impl<T: DeserializeOwned> ClientResult<T> {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            slot: ResultSlot::new(operation.into()),
            _marker: PhantomData,
        }
    }

    pub fn is_resolved(&self) -> bool {
        read(&self.slot.0).value.is_some()
    }

    pub fn value(&self) -> Result<T> {
        let state = read(&self.slot.0);
        match &state.value {
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                Error::MalformedProperty {
                    property: state.operation.clone(),
                    message: e.to_string(),
                }
            }),
            None => Err(Error::ResultNotResolved {
                operation: state.operation.clone(),
            }),
        }
    }

    /// The raw JSON returned by the service.
    pub fn raw_value(&self) -> Option<serde_json::Value> {
        read(&self.slot.0).value.clone()
    }

    /// Error attached when the producing query failed.
    pub fn last_error(&self) -> Option<RemoteError> {
        read(&self.slot.0).error.clone()
    }
}

impl<T> ClientResult<T> {
    /// The shared cell a query binds into.
    pub fn slot(&self) -> &ResultSlot {
        &self.slot
    }
}
