use o365_http::{HttpRequest, Method};

use super::{RenderSettings, Target};
use crate::collection::EntityCollection;
use crate::config::JsonFormat;
use crate::error::Result;
use crate::object::ClientObject;
use crate::response;

/// GET an entity or a collection page.
#[derive(Debug, Clone)]
pub struct ReadQuery {
    target: Target,
    select: Vec<String>,
    expand: Vec<String>,
    top: Option<usize>,
    next_link: Option<String>,
}

impl ReadQuery {
    fn new(target: Target) -> Self {
        Self {
            target,
            select: Vec::new(),
            expand: Vec::new(),
            top: None,
            next_link: None,
        }
    }

    pub fn object(object: ClientObject) -> Self {
        Self::new(Target::Object(object))
    }

    pub fn collection(collection: EntityCollection) -> Self {
        Self::new(Target::Collection(collection))
    }

    /// Follow a server next link; items are appended when bound.
    pub fn next_page(collection: EntityCollection, link: String) -> Self {
        Self {
            next_link: Some(link),
            ..Self::collection(collection)
        }
    }

    #[must_use]
    pub fn select(mut self, fields: &[&str]) -> Self {
        self.select.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    #[must_use]
    pub fn expand(mut self, fields: &[&str]) -> Self {
        self.expand.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    #[must_use]
    pub fn top(mut self, top: usize) -> Self {
        self.top = Some(top);
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub(crate) fn render(&self, settings: &RenderSettings<'_>) -> Result<HttpRequest> {
        if let Some(link) = &self.next_link {
            return Ok(settings.request(Method::GET, settings.link(link)?));
        }

        let path = self.target.require_path()?;
        let mut request = settings.request(Method::GET, settings.url(&path)?);
        if !self.select.is_empty() {
            request = request.with_query("$select", self.select.join(","));
        }
        if !self.expand.is_empty() {
            request = request.with_query("$expand", self.expand.join(","));
        }
        if let Some(top) = self.top {
            request = request.with_query("$top", top.to_string());
        }
        Ok(request)
    }

    pub(crate) fn bind(&self, body: &serde_json::Value, format: JsonFormat) -> Result<()> {
        match &self.target {
            Target::Object(object) => object.bind_json(&response::entity(body, format)),
            Target::Collection(collection) => {
                let page = response::page(body, format)?;
                collection.bind_items(page.items, page.next_link, self.next_link.is_some());
            }
        }
        Ok(())
    }
}
