//! Deferred query and resolution engine for OData-style services.
//!
//! Resources are represented by proxies ([`ClientObject`],
//! [`ClientObjectCollection`]) bound to a [`ClientContext`]. Reading or
//! writing a proxy never touches the network: action methods queue
//! [`Query`] values, and [`ClientContext::execute_query`] sends them in
//! submission order and binds each response back into its target.
//!
//! ```no_run
//! use o365_runtime::{ClientContext, ContextConfig};
//!
//! let config = ContextConfig::new("https://graph.microsoft.com/v1.0")
//!     .with_access_token("token");
//! let context = ClientContext::connect(config)?;
//! // build proxies, call load()/update()/..., then:
//! context.execute_query()?;
//! # Ok::<(), o365_runtime::Error>(())
//! ```

mod batch;
pub mod collection;
pub mod config;
pub mod context;
pub mod error;
pub mod object;
pub mod path;
pub mod query;
mod response;
pub mod result;
pub mod schema;
mod sync;
#[cfg(test)]
mod testing;
pub mod upload;
pub mod value;

pub use collection::{ClientObjectCollection, EntityCollection};
pub use config::{BatchConfig, ContextConfig, JsonFormat};
pub use context::ClientContext;
pub use error::{Error, ErrorKind, QueryFailure, RemoteError, Result};
pub use object::{ClientObject, PropertyValue};
pub use path::{ParameterValue, Parameters, ResourcePath, Segment};
pub use query::{
    CreateEntityQuery, DeleteEntityQuery, Query, QueryKind, QueryState, ReadQuery, ReturnType,
    Sequence, ServiceOperationQuery, Target, UpdateEntityQuery,
};
pub use result::{ClientResult, ResultSlot};
pub use schema::{Entity, EntitySchema, KeyStyle, PropertyDescriptor, PropertyKind};
pub use upload::{chunk_ranges, ProgressCallback, UploadOperations, UploadSession};
pub use value::{ClientValue, ClientValueCollection};

pub use o365_http::{HttpExecutor, HttpRequest, HttpResponse, Method, RequestBody};

#[cfg(any(test, feature = "test-utils"))]
pub use o365_http::MockExecutor;
