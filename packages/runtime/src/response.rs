//! Response body handling for both JSON formats.
//!
//! Verbose bodies are wrapped in `d`, carry `__metadata`/`__deferred`
//! annotations and nest collections as `{"results": [...]}`. Minimal
//! bodies use `@odata.*` annotations and a top-level `value` array.

use o365_http::HttpResponse;

use crate::config::JsonFormat;
use crate::error::{Error, RemoteError, Result};

/// Keys that describe a payload rather than belong to it.
pub(crate) fn is_annotation(key: &str) -> bool {
    key.starts_with('@')
        || key.starts_with("odata.")
        || key.contains("@odata.")
        || key == "__metadata"
        || key == "__deferred"
}

fn unwrap_verbose(body: &serde_json::Value) -> &serde_json::Value {
    body.get("d").unwrap_or(body)
}

/// A navigation link without inline data.
fn is_deferred(value: &serde_json::Value) -> bool {
    value.get("__deferred").is_some()
}

/// Strip verbose annotations and flatten `results` wrappers.
fn normalize(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(mut map) => {
            if let Some(serde_json::Value::Array(results)) = map.remove("results") {
                if map.keys().all(|k| is_annotation(k) || k == "__next" || k == "__count") {
                    return serde_json::Value::Array(results.into_iter().map(normalize).collect());
                }
                map.insert("results".to_string(), serde_json::Value::Array(results));
            }
            serde_json::Value::Object(
                map.into_iter()
                    .filter(|(k, v)| k != "__metadata" && !is_deferred(v))
                    .map(|(k, v)| (k, normalize(v)))
                    .collect(),
            )
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(normalize).collect())
        }
        other => other,
    }
}

/// Entity body in minimal-format shape.
pub(crate) fn entity(body: &serde_json::Value, format: JsonFormat) -> serde_json::Value {
    match format {
        JsonFormat::Verbose => normalize(unwrap_verbose(body).clone()),
        JsonFormat::Minimal => body.clone(),
    }
}

#[derive(Debug, Default)]
pub(crate) struct Page {
    pub(crate) items: Vec<serde_json::Value>,
    pub(crate) next_link: Option<String>,
}

/// One page of a collection response.
pub(crate) fn page(body: &serde_json::Value, format: JsonFormat) -> Result<Page> {
    let root = match format {
        JsonFormat::Verbose => unwrap_verbose(body),
        JsonFormat::Minimal => body,
    };
    let (items, next_link) = match root {
        serde_json::Value::Array(items) => (items.clone(), None),
        serde_json::Value::Object(map) => {
            let items = map
                .get("value")
                .or_else(|| map.get("results"))
                .and_then(|v| v.as_array())
                .cloned()
                .ok_or_else(|| Error::MalformedProperty {
                    property: "value".to_string(),
                    message: "response is not a collection".to_string(),
                })?;
            let next_link = ["@odata.nextLink", "odata.nextLink", "__next"]
                .iter()
                .find_map(|k| map.get(*k))
                .and_then(|v| v.as_str())
                .map(str::to_string);
            (items, next_link)
        }
        _ => {
            return Err(Error::MalformedProperty {
                property: "value".to_string(),
                message: "response is not a collection".to_string(),
            })
        }
    };
    let items = match format {
        JsonFormat::Verbose => items.into_iter().map(normalize).collect(),
        JsonFormat::Minimal => items,
    };
    Ok(Page { items, next_link })
}

/// Return value of a service operation. A body holding a single
/// `value` key, or a single key named after the operation, is unwrapped.
pub(crate) fn scalar(
    body: &serde_json::Value,
    format: JsonFormat,
    operation: &str,
) -> serde_json::Value {
    let root = entity(body, format);
    if let serde_json::Value::Object(map) = &root {
        let mut payload = map.iter().filter(|(k, _)| !is_annotation(k));
        if let (Some((key, value)), None) = (payload.next(), payload.next()) {
            if key == "value" || key == operation {
                return value.clone();
            }
        }
    }
    root
}

/// Structured error from a non-success response.
pub(crate) fn remote_error(response: &HttpResponse) -> RemoteError {
    let error = response
        .body
        .get("error")
        .or_else(|| response.body.get("odata.error"));

    let code = error
        .and_then(|e| e.get("code"))
        .and_then(|c| c.as_str())
        .map(str::to_string);

    let message = error
        .and_then(|e| e.get("message"))
        .and_then(|m| match m {
            serde_json::Value::String(s) => Some(s.clone()),
            other => other.get("value").and_then(|v| v.as_str()).map(str::to_string),
        })
        .or_else(|| {
            response
                .body_text
                .as_deref()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| response.status_text.clone());

    RemoteError {
        status: response.status,
        code,
        message,
    }
}
