//! Create, update and delete.

use o365_http::{HttpRequest, Method};

use super::RenderSettings;
use crate::collection::EntityCollection;
use crate::config::JsonFormat;
use crate::error::Result;
use crate::object::ClientObject;
use crate::response;

type Properties = serde_json::Map<String, serde_json::Value>;

/// Verbose write bodies name the entity type in `__metadata`.
fn write_body(format: JsonFormat, entity_type: &str, properties: &Properties) -> serde_json::Value {
    let mut body = properties.clone();
    if format == JsonFormat::Verbose {
        body.insert(
            "__metadata".to_string(),
            serde_json::json!({ "type": entity_type }),
        );
    }
    serde_json::Value::Object(body)
}

/// POST a new entity to its collection.
#[derive(Debug, Clone)]
pub struct CreateEntityQuery {
    collection: EntityCollection,
    entity: ClientObject,
    payload: Properties,
}

impl CreateEntityQuery {
    /// The payload is the entity's staged properties at this moment.
    pub fn new(collection: EntityCollection, entity: ClientObject) -> Self {
        let payload = entity.dirty_snapshot();
        Self {
            collection,
            entity,
            payload,
        }
    }

    pub fn collection(&self) -> &EntityCollection {
        &self.collection
    }

    pub fn entity(&self) -> &ClientObject {
        &self.entity
    }

    pub fn payload(&self) -> &Properties {
        &self.payload
    }

    pub(crate) fn render(&self, settings: &RenderSettings<'_>) -> Result<HttpRequest> {
        let path = self.collection.require_path()?;
        let request = settings.request(Method::POST, settings.url(&path)?);
        Ok(settings.with_json(
            request,
            write_body(settings.format, self.entity.entity_type_name(), &self.payload),
        ))
    }

    pub(crate) fn bind(&self, body: &serde_json::Value, format: JsonFormat) {
        self.entity.bind_json(&response::entity(body, format));
    }
}

/// Send the properties changed since the last bind.
#[derive(Debug, Clone)]
pub struct UpdateEntityQuery {
    target: ClientObject,
    changes: Properties,
}

impl UpdateEntityQuery {
    /// Snapshots the dirty subset now; later edits go to the next update.
    pub fn new(target: ClientObject) -> Self {
        let changes = target.dirty_snapshot();
        Self { target, changes }
    }

    pub fn target(&self) -> &ClientObject {
        &self.target
    }

    pub fn changes(&self) -> &Properties {
        &self.changes
    }

    pub(crate) fn render(&self, settings: &RenderSettings<'_>) -> Result<HttpRequest> {
        let url = settings.url(&self.target.require_path()?)?;
        let request = settings.tunnel(Method::PATCH, url);
        Ok(settings.with_json(
            request,
            write_body(settings.format, self.target.entity_type_name(), &self.changes),
        ))
    }

    pub(crate) fn bind(&self) {
        self.target.clear_sent(&self.changes);
    }
}

#[derive(Debug, Clone)]
pub struct DeleteEntityQuery {
    target: ClientObject,
}

impl DeleteEntityQuery {
    pub fn new(target: ClientObject) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &ClientObject {
        &self.target
    }

    pub(crate) fn render(&self, settings: &RenderSettings<'_>) -> Result<HttpRequest> {
        let url = settings.url(&self.target.require_path()?)?;
        Ok(settings.tunnel(Method::DELETE, url))
    }

    pub(crate) fn bind(&self) {
        self.target.mark_deleted();
    }
}
