//! # o365-http
//!
//! Transport boundary for the o365 client runtime.
//!
//! The runtime renders every deferred query into an [`HttpRequest`] and
//! hands it to an [`HttpExecutor`]. This crate owns nothing else: no auth
//! flows, no retry policy, no knowledge of OData.
//!
//! ```ignore
//! use o365_http::{HttpExecutor, HttpRequest, ReqwestExecutor};
//!
//! let executor = ReqwestExecutor::with_default_timeout()?
//!     .with_default_header("Authorization", format!("Bearer {token}"));
//!
//! let response = executor.execute(&HttpRequest::get("https://graph.microsoft.com/v1.0/me"))?;
//! assert!(response.is_success());
//! ```
//!
//! Enable the `test-utils` feature to get the scripted
//! [`MockExecutor`](executor::mock::MockExecutor) in downstream tests.

pub mod error;
pub mod executor;
pub mod types;

pub use error::Error;
pub use executor::{HttpExecutor, ReqwestExecutor};
pub use types::{HttpRequest, HttpResponse, Method, RequestBody};

#[cfg(any(test, feature = "test-utils"))]
pub use executor::mock::MockExecutor;
