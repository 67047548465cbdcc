//! JSON `$batch` envelope.
//!
//! Sub-requests carry their submission position as `id`; responses are
//! matched back by that id, so the service may answer in any order.

use std::collections::{BTreeMap, HashMap};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use o365_http::{HttpRequest, HttpResponse, Method, RequestBody};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

#[derive(Debug, Serialize)]
struct BatchItem {
    id: String,
    method: Method,
    url: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct BatchReply {
    #[serde(default)]
    responses: Vec<BatchItemReply>,
}

#[derive(Debug, Deserialize)]
struct BatchItemReply {
    id: String,
    status: u16,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    body: serde_json::Value,
}

/// Request URL relative to the service root, with its query string.
fn relative_url(request: &HttpRequest, service_root: &Url) -> String {
    let root = service_root.as_str().trim_end_matches('/');
    let mut url = request
        .path
        .strip_prefix(root)
        .map(|rest| rest.trim_start_matches('/').to_string())
        .unwrap_or_else(|| request.path.clone());

    if !request.query.is_empty() {
        let pairs = request.query.iter().collect::<BTreeMap<_, _>>();
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&encoded);
    }
    url
}

fn item(id: usize, request: &HttpRequest, service_root: &Url) -> BatchItem {
    let mut headers = request
        .headers
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect::<BTreeMap<_, _>>();

    let body = request.body.as_ref().map(|body| match body {
        RequestBody::Json(value) => {
            if !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
                headers.insert("Content-Type".to_string(), "application/json".to_string());
            }
            value.clone()
        }
        RequestBody::Binary(bytes) => {
            headers.insert(
                "Content-Type".to_string(),
                "application/octet-stream".to_string(),
            );
            serde_json::Value::String(STANDARD.encode(bytes))
        }
    });

    BatchItem {
        id: id.to_string(),
        method: request.method,
        url: relative_url(request, service_root),
        headers,
        body,
    }
}

/// Wrap `requests` into one `POST {root}/$batch`.
pub(crate) fn encode(requests: &[&HttpRequest], service_root: &Url) -> HttpRequest {
    let items = requests
        .iter()
        .enumerate()
        .map(|(id, request)| item(id, request, service_root))
        .collect::<Vec<_>>();

    let root = service_root.as_str().trim_end_matches('/');
    HttpRequest::post(format!("{}/$batch", root))
        .with_header("Accept", "application/json")
        .with_header("Content-Type", "application/json")
        .with_json_body(serde_json::json!({ "requests": items }))
}

/// Split a batch response into one response per sub-request, in
/// submission order.
pub(crate) fn decode(response: &HttpResponse, expected: usize) -> Result<Vec<HttpResponse>> {
    let reply: BatchReply = serde_json::from_value(response.body.clone())?;
    let mut by_id = reply
        .responses
        .into_iter()
        .map(|r| (r.id.clone(), r))
        .collect::<HashMap<_, _>>();

    (0..expected)
        .map(|id| {
            let reply = by_id
                .remove(&id.to_string())
                .ok_or_else(|| Error::MalformedProperty {
                    property: "responses".to_string(),
                    message: format!("no response for request {}", id),
                })?;
            let mut response = HttpResponse::json(reply.status, reply.body);
            response.headers = reply.headers;
            Ok(response)
        })
        .collect()
}
