//! HTTP execution abstraction.
//!
//! The runtime talks to the network only through [`HttpExecutor`], so
//! tests can swap in a scripted executor and never open a socket.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use tracing::trace;

use crate::types::{HttpRequest, HttpResponse, RequestBody};
use crate::Error;

/// Trait for executing HTTP requests.
///
/// Exactly one response (or error) corresponds to each call. Retry and
/// authentication policy belong to implementations, not to callers.
pub trait HttpExecutor: Send + Sync {
    /// Execute an HTTP request and return the response.
    ///
    /// Non-2xx statuses are returned as `Ok`; `Err` means the request never
    /// produced a response.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Error>;
}

/// Production HTTP executor using blocking reqwest.
pub struct ReqwestExecutor {
    client: Client,
    default_headers: HashMap<String, String>,
}

impl ReqwestExecutor {
    /// Create a new executor with the given timeout.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            default_headers: HashMap::new(),
        })
    }

    /// Create with default timeout of 30 seconds.
    pub fn with_default_timeout() -> Result<Self, Error> {
        Self::new(Duration::from_secs(30))
    }

    /// Add a default header that will be sent with every request
    /// (typically `Authorization`).
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    fn header_map(&self, request: &HttpRequest) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        for (name, value) in self.default_headers.iter().chain(request.headers.iter()) {
            let header_name = HeaderName::try_from(name.as_str())?;
            let header_value = HeaderValue::try_from(value.as_str())?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }
}

impl HttpExecutor for ReqwestExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        let method: http::Method = request.method.into();
        let url = url::Url::parse(&request.path)?;

        let mut req_builder = self
            .client
            .request(method, url)
            .headers(self.header_map(request)?);

        if !request.query.is_empty() {
            req_builder = req_builder.query(&request.query);
        }

        match &request.body {
            Some(RequestBody::Json(body)) => {
                req_builder = req_builder.json(body);
            }
            Some(RequestBody::Binary(bytes)) => {
                if request.header(CONTENT_TYPE.as_str()).is_none() {
                    req_builder = req_builder.header(CONTENT_TYPE, "application/octet-stream");
                }
                req_builder = req_builder.body(bytes.clone());
            }
            None => {}
        }

        trace!(method = %request.method, url = %request.path, "sending request");
        let response = req_builder.send()?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("Unknown")
            .to_string();

        let mut resp_headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                resp_headers.insert(name.to_string(), v.to_string());
            }
        }

        let body_text = response.text()?;
        let body = serde_json::from_str(&body_text).unwrap_or(serde_json::Value::Null);
        trace!(status, "received response");

        Ok(HttpResponse {
            status,
            status_text,
            headers: resp_headers,
            body,
            body_text: Some(body_text),
        })
    }
}

/// Mock HTTP executor for testing.
///
/// Scripted responses are consumed in FIFO order first; after that the
/// executor falls back to path-keyed responses, then the default response,
/// then 404.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex, MutexGuard};

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A mock HTTP executor that returns predefined responses.
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        /// Outcomes handed out in order, one per request.
        scripted: Arc<Mutex<VecDeque<Result<HttpResponse, String>>>>,
        /// Responses keyed by URL suffix.
        responses: Arc<Mutex<HashMap<String, HttpResponse>>>,
        /// Default response when no match found.
        default_response: Arc<Mutex<Option<HttpResponse>>>,
        /// Recorded requests for verification.
        recorded_requests: Arc<Mutex<Vec<HttpRequest>>>,
        /// Error message returned for every request when set.
        fail_all: Arc<Mutex<Option<String>>>,
    }

    impl MockExecutor {
        /// Create a new mock executor.
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response for the next unanswered request.
        pub fn push_response(&self, response: HttpResponse) -> &Self {
            lock(&self.scripted).push_back(Ok(response));
            self
        }

        /// Queue a transport failure for the next unanswered request.
        pub fn push_failure(&self, message: impl Into<String>) -> &Self {
            lock(&self.scripted).push_back(Err(message.into()));
            self
        }

        /// Add a response for every request whose URL ends with `path`.
        pub fn with_response(self, path: impl Into<String>, response: HttpResponse) -> Self {
            lock(&self.responses).insert(path.into(), response);
            self
        }

        /// Set a default response when no path matches.
        pub fn with_default_response(self, response: HttpResponse) -> Self {
            *lock(&self.default_response) = Some(response);
            self
        }

        /// Configure to fail all requests with an error.
        pub fn fail_with(self, message: impl Into<String>) -> Self {
            *lock(&self.fail_all) = Some(message.into());
            self
        }

        /// Get all recorded requests.
        pub fn recorded_requests(&self) -> Vec<HttpRequest> {
            lock(&self.recorded_requests).clone()
        }

        /// Clear recorded requests.
        pub fn clear_recorded(&self) {
            lock(&self.recorded_requests).clear();
        }

        /// Create a simple success response.
        pub fn success_response(body: serde_json::Value) -> HttpResponse {
            HttpResponse::json(200, body)
        }

        /// Create an OData-style error response.
        pub fn error_response(status: u16, message: &str) -> HttpResponse {
            HttpResponse::json(
                status,
                serde_json::json!({"error": {"code": status.to_string(), "message": message}}),
            )
        }

        /// Create a 404 Not Found response.
        pub fn not_found() -> HttpResponse {
            Self::error_response(404, "Not Found")
        }
    }

    impl HttpExecutor for MockExecutor {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
            lock(&self.recorded_requests).push(request.clone());

            if let Some(message) = lock(&self.fail_all).clone() {
                return Err(Error::transport(message));
            }

            if let Some(outcome) = lock(&self.scripted).pop_front() {
                return outcome.map_err(Error::transport);
            }

            let responses = lock(&self.responses);
            if let Some((_, response)) = responses
                .iter()
                .filter(|(suffix, _)| request.path.ends_with(suffix.as_str()))
                .max_by_key(|(suffix, _)| suffix.len())
            {
                return Ok(response.clone());
            }

            if let Some(ref response) = *lock(&self.default_response) {
                return Ok(response.clone());
            }

            Ok(Self::not_found())
        }
    }
}
