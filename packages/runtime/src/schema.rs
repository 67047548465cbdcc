//! Schema boundary: what a resource type declares about itself.
//!
//! Concrete resource crates describe each entity with a static
//! [`EntitySchema`] and wrap [`ClientObject`] in a typed [`Entity`].
//! The engine never hard-codes a property name.

use std::fmt;

use crate::context::ClientContext;
use crate::object::ClientObject;
use crate::path::{Parameters, ResourcePath};

/// How a collection item's key becomes part of its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStyle {
    /// `collection/{key}`
    Segment,
    /// `collection/{Operation}('{key}')`
    Operation(&'static str),
}

/// Shape of a declared property.
#[derive(Clone, Copy)]
pub enum PropertyKind {
    /// A primitive JSON value. Default: `null`.
    Scalar,
    /// A structured [`ClientValue`](crate::ClientValue). Default: `null`
    /// (typed readers get `T::default()`).
    Value,
    /// A list of client values. Default: `[]`.
    ValueCollection,
    /// A navigation property to a single entity. Default: a nested proxy.
    Entity(&'static EntitySchema),
    /// A navigation property to a collection. Default: a collection proxy.
    EntityCollection(&'static EntitySchema),
}

impl PropertyKind {
    pub fn describe(&self) -> &'static str {
        match self {
            PropertyKind::Scalar => "a scalar",
            PropertyKind::Value => "a client value",
            PropertyKind::ValueCollection => "a client value collection",
            PropertyKind::Entity(_) => "an entity",
            PropertyKind::EntityCollection(_) => "an entity collection",
        }
    }

    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            PropertyKind::Entity(_) | PropertyKind::EntityCollection(_)
        )
    }

    /// Default JSON for non-navigation properties.
    pub(crate) fn default_json(&self) -> serde_json::Value {
        match self {
            PropertyKind::ValueCollection => serde_json::Value::Array(Vec::new()),
            _ => serde_json::Value::Null,
        }
    }
}

// Schemas may reference themselves (a folder has folders), so Debug only
// names the target type.
impl fmt::Debug for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKind::Scalar => f.write_str("Scalar"),
            PropertyKind::Value => f.write_str("Value"),
            PropertyKind::ValueCollection => f.write_str("ValueCollection"),
            PropertyKind::Entity(s) => write!(f, "Entity({})", s.entity_type_name),
            PropertyKind::EntityCollection(s) => {
                write!(f, "EntityCollection({})", s.entity_type_name)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub kind: PropertyKind,
}

impl PropertyDescriptor {
    pub const fn scalar(name: &'static str) -> Self {
        Self {
            name,
            kind: PropertyKind::Scalar,
        }
    }

    pub const fn value(name: &'static str) -> Self {
        Self {
            name,
            kind: PropertyKind::Value,
        }
    }

    pub const fn value_collection(name: &'static str) -> Self {
        Self {
            name,
            kind: PropertyKind::ValueCollection,
        }
    }

    pub const fn entity(name: &'static str, schema: &'static EntitySchema) -> Self {
        Self {
            name,
            kind: PropertyKind::Entity(schema),
        }
    }

    pub const fn entity_collection(name: &'static str, schema: &'static EntitySchema) -> Self {
        Self {
            name,
            kind: PropertyKind::EntityCollection(schema),
        }
    }
}

/// Static description of one entity type.
#[derive(Debug)]
pub struct EntitySchema {
    pub entity_type_name: &'static str,
    pub properties: &'static [PropertyDescriptor],
    /// Property holding the server-assigned identity.
    pub key_property: Option<&'static str>,
    pub key_style: KeyStyle,
}

impl EntitySchema {
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn same_as(&self, other: &EntitySchema) -> bool {
        std::ptr::eq(self, other) || self.entity_type_name == other.entity_type_name
    }

    /// Path of the item with `key` inside the collection at `collection`.
    pub fn key_path(&self, collection: &ResourcePath, key: &str) -> ResourcePath {
        match self.key_style {
            KeyStyle::Segment => collection.key(key),
            KeyStyle::Operation(name) => {
                collection.operation(name, Some(Parameters::positional([key])))
            }
        }
    }
}

/// A typed wrapper over a [`ClientObject`].
pub trait Entity: Clone + Sized {
    fn schema() -> &'static EntitySchema;

    fn from_object(object: ClientObject) -> Self;

    fn object(&self) -> &ClientObject;

    /// A fresh, unaddressed instance.
    fn new(context: &ClientContext) -> Self {
        Self::from_object(ClientObject::new(context, Self::schema(), None))
    }

    /// An instance at a known path.
    fn at(context: &ClientContext, path: ResourcePath) -> Self {
        Self::from_object(ClientObject::new(context, Self::schema(), Some(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static NODE: EntitySchema = EntitySchema {
        entity_type_name: "test.node",
        properties: &[
            PropertyDescriptor::scalar("name"),
            PropertyDescriptor::entity_collection("children", &NODE),
        ],
        key_property: Some("id"),
        key_style: KeyStyle::Segment,
    };

    static FILE: EntitySchema = EntitySchema {
        entity_type_name: "SP.File",
        properties: &[],
        key_property: Some("ServerRelativeUrl"),
        key_style: KeyStyle::Operation("GetByUrl"),
    };

    #[test]
    fn property_lookup() {
        assert!(NODE.property("name").is_some());
        assert!(NODE.property("children").unwrap().kind.is_navigation());
        assert!(NODE.property("missing").is_none());
    }

    #[test]
    fn self_referential_debug_terminates() {
        let debug = format!("{:?}", NODE);
        assert!(debug.contains("EntityCollection(test.node)"));
    }

    #[test]
    fn key_paths() {
        let contacts = ResourcePath::parse("me/contacts").unwrap();
        assert_eq!(NODE.key_path(&contacts, "42").to_string(), "me/contacts/42");

        let files = ResourcePath::parse("web/files").unwrap();
        assert_eq!(
            FILE.key_path(&files, "/docs/a.txt").to_string(),
            "web/files/GetByUrl('/docs/a.txt')"
        );
    }

    #[test]
    fn defaults_by_kind() {
        assert_eq!(PropertyKind::Scalar.default_json(), serde_json::Value::Null);
        assert_eq!(
            PropertyKind::ValueCollection.default_json(),
            serde_json::json!([])
        );
    }
}
