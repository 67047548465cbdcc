//! Schemas and context builders shared by the unit tests.

use std::sync::Arc;

use crate::config::{ContextConfig, JsonFormat};
use crate::context::ClientContext;
use crate::object::ClientObject;
use crate::path::ResourcePath;
use crate::schema::{Entity, EntitySchema, KeyStyle, PropertyDescriptor};
use crate::MockExecutor;

pub(crate) const ROOT: &str = "https://graph.microsoft.com/v1.0";

pub(crate) static PHOTO: EntitySchema = EntitySchema {
    entity_type_name: "microsoft.graph.profilePhoto",
    properties: &[
        PropertyDescriptor::scalar("id"),
        PropertyDescriptor::scalar("height"),
        PropertyDescriptor::scalar("width"),
    ],
    key_property: Some("id"),
    key_style: KeyStyle::Segment,
};

pub(crate) static EXTENSION: EntitySchema = EntitySchema {
    entity_type_name: "microsoft.graph.extension",
    properties: &[
        PropertyDescriptor::scalar("id"),
        PropertyDescriptor::scalar("extensionName"),
    ],
    key_property: Some("id"),
    key_style: KeyStyle::Segment,
};

pub(crate) static CONTACT: EntitySchema = EntitySchema {
    entity_type_name: "microsoft.graph.contact",
    properties: &[
        PropertyDescriptor::scalar("id"),
        PropertyDescriptor::scalar("displayName"),
        PropertyDescriptor::scalar("manager"),
        PropertyDescriptor::scalar("mobilePhone"),
        PropertyDescriptor::value("homeAddress"),
        PropertyDescriptor::value_collection("emailAddresses"),
        PropertyDescriptor::entity("photo", &PHOTO),
        PropertyDescriptor::entity_collection("extensions", &EXTENSION),
    ],
    key_property: Some("id"),
    key_style: KeyStyle::Segment,
};

pub(crate) static FILE: EntitySchema = EntitySchema {
    entity_type_name: "SP.File",
    properties: &[
        PropertyDescriptor::scalar("Name"),
        PropertyDescriptor::scalar("ServerRelativeUrl"),
        PropertyDescriptor::scalar("Length"),
    ],
    key_property: Some("ServerRelativeUrl"),
    key_style: KeyStyle::Operation("GetByUrl"),
};

#[derive(Clone)]
pub(crate) struct Contact(ClientObject);

impl Entity for Contact {
    fn schema() -> &'static EntitySchema {
        &CONTACT
    }

    fn from_object(object: ClientObject) -> Self {
        Contact(object)
    }

    fn object(&self) -> &ClientObject {
        &self.0
    }
}

#[derive(Clone)]
pub(crate) struct Photo(ClientObject);

impl Entity for Photo {
    fn schema() -> &'static EntitySchema {
        &PHOTO
    }

    fn from_object(object: ClientObject) -> Self {
        Photo(object)
    }

    fn object(&self) -> &ClientObject {
        &self.0
    }
}

#[derive(Clone)]
pub(crate) struct Extension(ClientObject);

impl Entity for Extension {
    fn schema() -> &'static EntitySchema {
        &EXTENSION
    }

    fn from_object(object: ClientObject) -> Self {
        Extension(object)
    }

    fn object(&self) -> &ClientObject {
        &self.0
    }
}

pub(crate) fn context_with(mock: &MockExecutor, config: ContextConfig) -> ClientContext {
    ClientContext::new(config, Arc::new(mock.clone())).unwrap()
}

pub(crate) fn context(mock: &MockExecutor) -> ClientContext {
    context_with(mock, ContextConfig::new(ROOT))
}

pub(crate) fn verbose_context(mock: &MockExecutor) -> ClientContext {
    context_with(
        mock,
        ContextConfig::new("https://contoso.sharepoint.com/_api")
            .with_json_format(JsonFormat::Verbose),
    )
}

pub(crate) fn path(s: &str) -> ResourcePath {
    ResourcePath::parse(s).unwrap()
}

pub(crate) fn contact_at(context: &ClientContext, p: &str) -> ClientObject {
    ClientObject::new(context, &CONTACT, Some(path(p)))
}
