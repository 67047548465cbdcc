//! Deferred remote actions.
//!
//! A [`Query`] is built by an action method, queued on the context and
//! rendered into an HTTP request only when the queue is flushed. Its
//! response is bound back into the target (or a separate return value).

mod entity;
mod read;
mod service_operation;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use o365_http::{HttpRequest, HttpResponse, Method, RequestBody};
use tracing::trace;
use url::Url;

use crate::collection::EntityCollection;
use crate::config::JsonFormat;
use crate::error::{Error, Result};
use crate::object::ClientObject;
use crate::path::ResourcePath;
use crate::result::{ClientResult, ResultSlot};

pub use entity::{CreateEntityQuery, DeleteEntityQuery, UpdateEntityQuery};
pub use read::ReadQuery;
pub use service_operation::ServiceOperationQuery;

/// Lifecycle of a query. A query is never queued twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Built,
    Queued,
    Resolved,
    Failed,
}

/// What a query addresses.
#[derive(Debug, Clone)]
pub enum Target {
    Object(ClientObject),
    Collection(EntityCollection),
}

impl Target {
    pub fn resource_path(&self) -> Option<ResourcePath> {
        match self {
            Target::Object(object) => object.resource_path(),
            Target::Collection(collection) => collection.resource_path(),
        }
    }

    pub(crate) fn require_path(&self) -> Result<ResourcePath> {
        match self {
            Target::Object(object) => object.require_path(),
            Target::Collection(collection) => collection.require_path(),
        }
    }

    pub fn entity_type_name(&self) -> &'static str {
        match self {
            Target::Object(object) => object.entity_type_name(),
            Target::Collection(collection) => collection.item_schema().entity_type_name,
        }
    }

    fn describe(&self) -> String {
        let path = self
            .resource_path()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "<unaddressed>".to_string());
        match self {
            Target::Object(_) => format!("{} at {}", self.entity_type_name(), path),
            Target::Collection(_) => format!("{} collection at {}", self.entity_type_name(), path),
        }
    }
}

impl From<ClientObject> for Target {
    fn from(object: ClientObject) -> Self {
        Target::Object(object)
    }
}

impl From<&ClientObject> for Target {
    fn from(object: &ClientObject) -> Self {
        Target::Object(object.clone())
    }
}

impl From<EntityCollection> for Target {
    fn from(collection: EntityCollection) -> Self {
        Target::Collection(collection)
    }
}

impl From<&EntityCollection> for Target {
    fn from(collection: &EntityCollection) -> Self {
        Target::Collection(collection.clone())
    }
}

/// Where a service operation's response is bound.
#[derive(Debug, Clone, Default)]
pub enum ReturnType {
    #[default]
    None,
    Object(ClientObject),
    Collection(EntityCollection),
    Result(ResultSlot),
}

impl<T> From<&ClientResult<T>> for ReturnType {
    fn from(result: &ClientResult<T>) -> Self {
        ReturnType::Result(result.slot().clone())
    }
}

/// Everything needed to turn a query into a request.
pub(crate) struct RenderSettings<'a> {
    pub(crate) service_root: &'a Url,
    pub(crate) format: JsonFormat,
}

impl RenderSettings<'_> {
    pub(crate) fn url(&self, path: &ResourcePath) -> Result<String> {
        let root = self.service_root.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{}/{}", root, path))?.to_string())
    }

    /// Resolve a server-provided link, absolute or relative to the root.
    pub(crate) fn link(&self, link: &str) -> Result<String> {
        match Url::parse(link) {
            Ok(url) => Ok(url.to_string()),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let root = self.service_root.as_str().trim_end_matches('/');
                let url = format!("{}/{}", root, link.trim_start_matches('/'));
                Ok(Url::parse(&url)?.to_string())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn request(&self, method: Method, url: String) -> HttpRequest {
        HttpRequest::new(method, url).with_header("Accept", self.format.media_type())
    }

    pub(crate) fn with_json(&self, request: HttpRequest, body: serde_json::Value) -> HttpRequest {
        request
            .with_header("Content-Type", self.format.media_type())
            .with_json_body(body)
    }

    /// Verbose writes tunnel through POST with the real verb in a header.
    pub(crate) fn tunnel(&self, method: Method, url: String) -> HttpRequest {
        match self.format {
            JsonFormat::Minimal => self.request(method, url),
            JsonFormat::Verbose => self
                .request(Method::POST, url)
                .with_header("X-HTTP-Method", method_override(method)),
        }
        .with_header("If-Match", "*")
    }
}

fn method_override(method: Method) -> &'static str {
    match method {
        Method::PATCH => "MERGE",
        other => other.as_str(),
    }
}

#[derive(Debug, Clone)]
pub enum QueryKind {
    Read(ReadQuery),
    Create(CreateEntityQuery),
    ServiceOperation(ServiceOperationQuery),
    Update(UpdateEntityQuery),
    Delete(DeleteEntityQuery),
}

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Queries that go out one request at a time, in queue order, and stop at
/// the first failure. Members after a failed one fail locally unsent.
#[derive(Debug)]
pub struct Sequence {
    label: String,
    broken: AtomicBool,
}

impl Sequence {
    pub fn new(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            broken: AtomicBool::new(false),
        })
    }

    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }

    fn break_off(&self) {
        self.broken.store(true, Ordering::Release);
    }
}

/// A queued unit of work.
#[derive(Clone)]
pub struct Query {
    kind: QueryKind,
    state: QueryState,
    on_resolved: Vec<Callback>,
    sequence: Option<Arc<Sequence>>,
}

impl Query {
    pub fn new(kind: QueryKind) -> Self {
        Self {
            kind,
            state: QueryState::Built,
            on_resolved: Vec::new(),
            sequence: None,
        }
    }

    /// Make this query a member of `sequence`. In batch mode it is sent
    /// on its own, after everything queued before it has been bound.
    #[must_use]
    pub fn in_sequence(mut self, sequence: &Arc<Sequence>) -> Self {
        self.sequence = Some(Arc::clone(sequence));
        self
    }

    pub fn is_sequenced(&self) -> bool {
        self.sequence.is_some()
    }

    /// Run `callback` after this query's response has been bound.
    #[must_use]
    pub fn on_resolved(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_resolved.push(Arc::new(callback));
        self
    }

    pub fn kind(&self) -> &QueryKind {
        &self.kind
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: QueryState) {
        self.state = state;
    }

    pub fn target(&self) -> Target {
        match &self.kind {
            QueryKind::Read(q) => q.target().clone(),
            QueryKind::Create(q) => Target::Collection(q.collection().clone()),
            QueryKind::ServiceOperation(q) => q.target().clone(),
            QueryKind::Update(q) => Target::Object(q.target().clone()),
            QueryKind::Delete(q) => Target::Object(q.target().clone()),
        }
    }

    /// Operation name for service operations.
    pub fn method_name(&self) -> Option<&str> {
        match &self.kind {
            QueryKind::ServiceOperation(q) => Some(q.method_name()),
            _ => None,
        }
    }

    /// URL parameters as JSON, for service operations.
    pub fn parameters(&self) -> Option<serde_json::Value> {
        match &self.kind {
            QueryKind::ServiceOperation(q) => q.parameters().map(|p| p.to_json()),
            _ => None,
        }
    }

    /// Request body as it will be sent, minus format annotations.
    pub fn payload(&self) -> Option<RequestBody> {
        match &self.kind {
            QueryKind::ServiceOperation(q) => q.payload().cloned(),
            QueryKind::Create(q) => Some(RequestBody::Json(serde_json::Value::Object(
                q.payload().clone(),
            ))),
            QueryKind::Update(q) => Some(RequestBody::Json(serde_json::Value::Object(
                q.changes().clone(),
            ))),
            QueryKind::Read(_) | QueryKind::Delete(_) => None,
        }
    }

    pub fn description(&self) -> String {
        let target = self.target().describe();
        match &self.kind {
            QueryKind::Read(_) => format!("read {}", target),
            QueryKind::Create(q) => format!("create {} in {}", q.entity().entity_type_name(), target),
            QueryKind::ServiceOperation(q) => format!("{} on {}", q.method_name(), target),
            QueryKind::Update(_) => format!("update {}", target),
            QueryKind::Delete(_) => format!("delete {}", target),
        }
    }

    pub(crate) fn render(&self, settings: &RenderSettings<'_>) -> Result<HttpRequest> {
        if let Some(sequence) = self.sequence.as_ref().filter(|s| s.is_broken()) {
            return Err(Error::Aborted {
                reason: format!("an earlier step of {} failed", sequence.label),
            });
        }
        let request = match &self.kind {
            QueryKind::Read(q) => q.render(settings)?,
            QueryKind::Create(q) => q.render(settings)?,
            QueryKind::ServiceOperation(q) => q.render(settings)?,
            QueryKind::Update(q) => q.render(settings)?,
            QueryKind::Delete(q) => q.render(settings)?,
        };
        trace!(method = %request.method, url = %request.path, "rendered query");
        Ok(request)
    }

    /// Bind a successful response, then run the resolution callbacks.
    pub(crate) fn bind(&self, response: &HttpResponse, format: JsonFormat) -> Result<()> {
        let body = &response.body;
        match &self.kind {
            QueryKind::Read(q) => q.bind(body, format)?,
            QueryKind::Create(q) => q.bind(body, format),
            QueryKind::ServiceOperation(q) => q.bind(body, format)?,
            QueryKind::Update(q) => q.bind(),
            QueryKind::Delete(q) => q.bind(),
        }
        for callback in &self.on_resolved {
            callback();
        }
        Ok(())
    }

    /// Attach a remote error to whatever the caller will inspect and stop
    /// the rest of this query's sequence.
    pub(crate) fn fail(&self, error: &Error) {
        if let Some(sequence) = &self.sequence {
            sequence.break_off();
        }
        let Error::Remote(remote) = error else {
            return;
        };
        if let Target::Object(object) = self.target() {
            object.attach_error(remote.clone());
        }
        if let QueryKind::Create(q) = &self.kind {
            q.entity().attach_error(remote.clone());
        }
        if let QueryKind::ServiceOperation(q) = &self.kind {
            match q.return_type() {
                ReturnType::Object(object) => object.attach_error(remote.clone()),
                ReturnType::Result(slot) => slot.fail(remote.clone()),
                ReturnType::None | ReturnType::Collection(_) => {}
            }
        }
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("callbacks", &self.on_resolved.len())
            .field("sequenced", &self.is_sequenced())
            .finish()
    }
}

macro_rules! into_query {
    ($($ty:ident => $variant:ident),*) => {
        $(
            impl From<$ty> for Query {
                fn from(query: $ty) -> Self {
                    Query::new(QueryKind::$variant(query))
                }
            }
        )*
    };
}

into_query!(
    ReadQuery => Read,
    CreateEntityQuery => Create,
    ServiceOperationQuery => ServiceOperation,
    UpdateEntityQuery => Update,
    DeleteEntityQuery => Delete
);
