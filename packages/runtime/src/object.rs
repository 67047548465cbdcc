//! Identity-bearing resource proxies.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::collection::{ClientObjectCollection, EntityCollection, WeakCollection};
use crate::context::ClientContext;
use crate::error::{Error, RemoteError, Result};
use crate::path::ResourcePath;
use crate::query::{DeleteEntityQuery, ReadQuery, UpdateEntityQuery};
use crate::response::is_annotation;
use crate::schema::{Entity, EntitySchema, PropertyDescriptor, PropertyKind};
use crate::sync::{read, write};

/// What [`ClientObject::get_property`] hands back.
#[derive(Debug, Clone)]
pub enum PropertyValue {
    Scalar(serde_json::Value),
    Object(ClientObject),
    Collection(EntityCollection),
}

impl PropertyValue {
    pub fn as_scalar(&self) -> Option<&serde_json::Value> {
        match self {
            PropertyValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<ClientObject> {
        match self {
            PropertyValue::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn into_collection(self) -> Option<EntityCollection> {
        match self {
            PropertyValue::Collection(collection) => Some(collection),
            _ => None,
        }
    }
}

/// Memoized navigation proxies, keyed by property name.
#[derive(Clone)]
enum Child {
    Object(ClientObject),
    Collection(EntityCollection),
}

#[derive(Default)]
struct ObjectState {
    path: Option<ResourcePath>,
    parent: Option<WeakCollection>,
    properties: BTreeMap<String, serde_json::Value>,
    dirty: BTreeSet<String>,
    children: BTreeMap<String, Child>,
    /// Navigation properties whose data arrived inline with a bind.
    expanded: BTreeSet<String>,
    last_error: Option<RemoteError>,
    deleted: bool,
}

struct ObjectInner {
    context: ClientContext,
    schema: &'static EntitySchema,
    state: RwLock<ObjectState>,
}

/// Proxy for one remote resource.
///
/// Cloning yields another handle to the same object; property writes
/// through any handle are visible through all of them. Nothing here
/// performs I/O: action methods only queue queries on the context.
#[derive(Clone)]
pub struct ClientObject {
    inner: Arc<ObjectInner>,
}

impl ClientObject {
    pub fn new(
        context: &ClientContext,
        schema: &'static EntitySchema,
        path: Option<ResourcePath>,
    ) -> Self {
        Self {
            inner: Arc::new(ObjectInner {
                context: context.clone(),
                schema,
                state: RwLock::new(ObjectState {
                    path,
                    ..Default::default()
                }),
            }),
        }
    }

    pub fn context(&self) -> &ClientContext {
        &self.inner.context
    }

    pub fn schema(&self) -> &'static EntitySchema {
        self.inner.schema
    }

    pub fn entity_type_name(&self) -> &'static str {
        self.inner.schema.entity_type_name
    }

    pub fn resource_path(&self) -> Option<ResourcePath> {
        read(&self.inner.state).path.clone()
    }

    pub(crate) fn require_path(&self) -> Result<ResourcePath> {
        self.resource_path().ok_or_else(|| Error::NotAddressable {
            entity_type: self.entity_type_name().to_string(),
        })
    }

    /// True when both handles point at the same object.
    pub fn ptr_eq(&self, other: &ClientObject) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn descriptor(&self, name: &str) -> Result<&'static PropertyDescriptor> {
        self.inner
            .schema
            .property(name)
            .ok_or_else(|| Error::UnknownProperty {
                entity_type: self.entity_type_name().to_string(),
                property: name.to_string(),
            })
    }

    fn kind_mismatch(&self, name: &str, expected: &'static str, actual: PropertyKind) -> Error {
        Error::PropertyKindMismatch {
            entity_type: self.entity_type_name().to_string(),
            property: name.to_string(),
            expected,
            actual: actual.describe(),
        }
    }

    /// Fetched or staged value, or the declared default.
    ///
    /// Navigation defaults are built on first access and memoized, so
    /// repeated reads return the same proxy.
    pub fn get_property(&self, name: &str) -> Result<PropertyValue> {
        if let Some(value) = read(&self.inner.state).properties.get(name) {
            return Ok(PropertyValue::Scalar(value.clone()));
        }
        let descriptor = self.descriptor(name)?;
        Ok(match descriptor.kind {
            PropertyKind::Entity(schema) => PropertyValue::Object(self.child_object(name, schema)),
            PropertyKind::EntityCollection(schema) => {
                PropertyValue::Collection(self.child_collection(name, schema))
            }
            kind => PropertyValue::Scalar(kind.default_json()),
        })
    }

    fn raw_value(&self, name: &str) -> Result<Option<serde_json::Value>> {
        let value = read(&self.inner.state).properties.get(name).cloned();
        if value.is_none() {
            let descriptor = self.descriptor(name)?;
            if descriptor.kind.is_navigation() {
                return Err(self.kind_mismatch(name, "a scalar or client value", descriptor.kind));
            }
        }
        Ok(value.filter(|v| !v.is_null()))
    }

    fn decode<T: DeserializeOwned>(name: &str, value: serde_json::Value) -> Result<T> {
        serde_json::from_value(value).map_err(|e| Error::MalformedProperty {
            property: name.to_string(),
            message: e.to_string(),
        })
    }

    /// Scalar reader: `None` when unset or null.
    pub fn get_scalar<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        self.raw_value(name)?
            .map(|value| Self::decode(name, value))
            .transpose()
    }

    /// Client value reader: `T::default()` when unset or null.
    pub fn get_value<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        Ok(self.get_scalar(name)?.unwrap_or_default())
    }

    pub fn get_object<T: Entity>(&self, name: &str) -> Result<T> {
        let descriptor = self.descriptor(name)?;
        match descriptor.kind {
            PropertyKind::Entity(schema) if schema.same_as(T::schema()) => {
                Ok(T::from_object(self.child_object(name, schema)))
            }
            kind => Err(self.kind_mismatch(name, "an entity", kind)),
        }
    }

    pub fn get_collection<T: Entity>(&self, name: &str) -> Result<ClientObjectCollection<T>> {
        let descriptor = self.descriptor(name)?;
        match descriptor.kind {
            PropertyKind::EntityCollection(schema) if schema.same_as(T::schema()) => {
                ClientObjectCollection::from_raw(self.child_collection(name, schema))
            }
            kind => Err(self.kind_mismatch(name, "an entity collection", kind)),
        }
    }

    fn child_object(&self, name: &str, schema: &'static EntitySchema) -> ClientObject {
        let mut state = write(&self.inner.state);
        if let Some(Child::Object(child)) = state.children.get(name) {
            return child.clone();
        }
        let path = state.path.as_ref().map(|p| p.property(name));
        let child = ClientObject::new(&self.inner.context, schema, path);
        state
            .children
            .insert(name.to_string(), Child::Object(child.clone()));
        child
    }

    fn child_collection(&self, name: &str, schema: &'static EntitySchema) -> EntityCollection {
        let mut state = write(&self.inner.state);
        if let Some(Child::Collection(child)) = state.children.get(name) {
            return child.clone();
        }
        let path = state.path.as_ref().map(|p| p.property(name));
        let child = EntityCollection::new(&self.inner.context, schema, path);
        state
            .children
            .insert(name.to_string(), Child::Collection(child.clone()));
        child
    }

    /// Stage a value for the next update. No I/O.
    pub fn set_property(&self, name: &str, value: impl Serialize) -> Result<()> {
        let descriptor = self.descriptor(name)?;
        if descriptor.kind.is_navigation() {
            return Err(Error::ReadOnlyProperty {
                entity_type: self.entity_type_name().to_string(),
                property: name.to_string(),
            });
        }
        let value = serde_json::to_value(value)?;
        let mut state = write(&self.inner.state);
        state.properties.insert(name.to_string(), value);
        state.dirty.insert(name.to_string());
        Ok(())
    }

    /// Snapshot of the property bag.
    pub fn properties(&self) -> BTreeMap<String, serde_json::Value> {
        read(&self.inner.state).properties.clone()
    }

    pub fn is_property_available(&self, name: &str) -> bool {
        let state = read(&self.inner.state);
        state.properties.contains_key(name) || state.expanded.contains(name)
    }

    /// Properties set since the last successful bind.
    pub fn dirty_properties(&self) -> Vec<String> {
        read(&self.inner.state).dirty.iter().cloned().collect()
    }

    pub fn has_changes(&self) -> bool {
        !read(&self.inner.state).dirty.is_empty()
    }

    /// Error attached by the last failed query that targeted this object.
    pub fn last_error(&self) -> Option<RemoteError> {
        read(&self.inner.state).last_error.clone()
    }

    pub fn is_deleted(&self) -> bool {
        read(&self.inner.state).deleted
    }

    /// Queue a read of the whole entity.
    pub fn load(&self) -> &Self {
        self.load_with(&[], &[])
    }

    /// Queue a read restricted to `select`, expanding `expand`.
    pub fn load_with(&self, select: &[&str], expand: &[&str]) -> &Self {
        let query = ReadQuery::object(self.clone())
            .select(select)
            .expand(expand);
        self.context().add_query(query.into());
        self
    }

    /// Queue an update carrying the properties changed so far.
    pub fn update(&self) -> &Self {
        self.context()
            .add_query(UpdateEntityQuery::new(self.clone()).into());
        self
    }

    pub fn delete_object(&self) -> &Self {
        self.context()
            .add_query(DeleteEntityQuery::new(self.clone()).into());
        self
    }

    pub fn execute_query(&self) -> Result<()> {
        self.context().execute_query()
    }

    /// Merge a response entity into the bag. Navigation data is routed to
    /// the memoized children; the dirty set is cleared.
    pub(crate) fn bind_json(&self, json: &serde_json::Value) {
        let Some(map) = json.as_object() else {
            return;
        };

        let mut navigation = Vec::new();
        {
            let mut state = write(&self.inner.state);
            for (name, value) in map {
                if is_annotation(name) {
                    continue;
                }
                match self.inner.schema.property(name).map(|d| d.kind) {
                    Some(kind) if kind.is_navigation() => {
                        state.expanded.insert(name.clone());
                        navigation.push((name, kind, value));
                    }
                    _ => {
                        state.properties.insert(name.clone(), value.clone());
                    }
                }
            }
            state.dirty.clear();
            state.last_error = None;
        }

        for (name, kind, value) in navigation {
            match kind {
                PropertyKind::Entity(schema) => self.child_object(name, schema).bind_json(value),
                PropertyKind::EntityCollection(schema) => {
                    self.child_collection(name, schema)
                        .bind_items(value.as_array().cloned().unwrap_or_default(), None, false)
                }
                _ => {}
            }
        }

        self.resolve_identity();
    }

    /// Once the key is known and the object belongs to a collection, its
    /// path becomes the collection path plus the key.
    pub(crate) fn resolve_identity(&self) {
        let schema = self.inner.schema;
        let Some(key_property) = schema.key_property else {
            return;
        };
        let (parent, key) = {
            let state = read(&self.inner.state);
            let key = state.properties.get(key_property).and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
            (state.parent.as_ref().and_then(WeakCollection::upgrade), key)
        };
        if let (Some(collection), Some(key)) = (parent, key) {
            if let Some(collection_path) = collection.resource_path() {
                self.set_resource_path(schema.key_path(&collection_path, &key));
            }
        }
    }

    /// Re-anchor this object and every memoized child.
    pub(crate) fn set_resource_path(&self, path: ResourcePath) {
        let children = {
            let mut state = write(&self.inner.state);
            if state.path.as_ref() == Some(&path) {
                return;
            }
            state.path = Some(path.clone());
            state.children.clone()
        };
        for (name, child) in children {
            match child {
                Child::Object(object) => object.set_resource_path(path.property(&name)),
                Child::Collection(collection) => collection.set_resource_path(path.property(&name)),
            }
        }
    }

    pub(crate) fn attach_to(&self, collection: &EntityCollection) {
        write(&self.inner.state).parent = Some(collection.downgrade());
        self.resolve_identity();
    }

    pub(crate) fn detach(&self) {
        write(&self.inner.state).parent = None;
    }

    /// Record a key without marking it dirty.
    pub(crate) fn seed_key(&self, key: &str) {
        if let Some(key_property) = self.inner.schema.key_property {
            write(&self.inner.state)
                .properties
                .insert(key_property.to_string(), serde_json::Value::String(key.to_string()));
        }
    }

    /// The dirty subset of the bag.
    pub(crate) fn dirty_snapshot(&self) -> serde_json::Map<String, serde_json::Value> {
        let state = read(&self.inner.state);
        state
            .dirty
            .iter()
            .filter_map(|name| {
                state
                    .properties
                    .get(name)
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect()
    }

    /// Clear dirty flags for keys whose value is still what was sent.
    pub(crate) fn clear_sent(&self, sent: &serde_json::Map<String, serde_json::Value>) {
        let mut state = write(&self.inner.state);
        let ObjectState {
            properties, dirty, ..
        } = &mut *state;
        dirty.retain(|name| properties.get(name) != sent.get(name));
        state.last_error = None;
    }

    pub(crate) fn attach_error(&self, error: RemoteError) {
        write(&self.inner.state).last_error = Some(error);
    }

    pub(crate) fn mark_deleted(&self) {
        let parent = {
            let mut state = write(&self.inner.state);
            state.deleted = true;
            state.last_error = None;
            state.parent.as_ref().and_then(WeakCollection::upgrade)
        };
        if let Some(collection) = parent {
            collection.remove_child(self);
        }
    }
}

impl fmt::Debug for ClientObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = read(&self.inner.state);
        f.debug_struct("ClientObject")
            .field("entity_type", &self.inner.schema.entity_type_name)
            .field("path", &state.path)
            .field("properties", &state.properties)
            .finish()
    }
}
