//! o365: a typed client for Microsoft 365 REST and OData services.
//!
//! Resource proxies are mutated in memory and their remote actions are
//! queued; nothing touches the network until the context is executed.
//! The workspace is layered:
//!
//! - [`http`]: request/response types and the [`HttpExecutor`] transport
//! - [`runtime`]: paths, proxies, queries and the [`ClientContext`] engine
//! - [`resources`]: typed Outlook, directory and SharePoint resources
//!
//! The common types of each layer are re-exported at the root.

pub use o365_http as http;
pub use o365_resources as resources;
pub use o365_runtime as runtime;

pub use o365_http::HttpExecutor;
pub use o365_runtime::{
    ClientContext, ClientObject, ClientObjectCollection, ClientResult, ClientValue,
    ClientValueCollection, ContextConfig, Entity, Error, ErrorKind, JsonFormat, ResourcePath,
    Result,
};
