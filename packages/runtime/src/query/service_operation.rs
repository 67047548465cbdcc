use o365_http::{HttpRequest, Method, RequestBody};

use super::{RenderSettings, ReturnType, Target};
use crate::config::JsonFormat;
use crate::error::Result;
use crate::path::Parameters;
use crate::response;

/// POST `{target}/{method_name}(parameters)` with an optional body.
#[derive(Debug, Clone)]
pub struct ServiceOperationQuery {
    target: Target,
    method_name: String,
    parameters: Option<Parameters>,
    payload: Option<RequestBody>,
    return_type: ReturnType,
}

impl ServiceOperationQuery {
    pub fn new(target: impl Into<Target>, method_name: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            method_name: method_name.into(),
            parameters: None,
            payload: None,
            return_type: ReturnType::None,
        }
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    #[must_use]
    pub fn with_json_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(RequestBody::Json(payload));
        self
    }

    #[must_use]
    pub fn with_binary_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(RequestBody::Binary(payload.into()));
        self
    }

    #[must_use]
    pub fn returning(mut self, return_type: impl Into<ReturnType>) -> Self {
        self.return_type = return_type.into();
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn parameters(&self) -> Option<&Parameters> {
        self.parameters.as_ref()
    }

    pub fn payload(&self) -> Option<&RequestBody> {
        self.payload.as_ref()
    }

    pub fn return_type(&self) -> &ReturnType {
        &self.return_type
    }

    pub(crate) fn render(&self, settings: &RenderSettings<'_>) -> Result<HttpRequest> {
        let path = self
            .target
            .require_path()?
            .operation(self.method_name.as_str(), self.parameters.clone());
        let request = settings.request(Method::POST, settings.url(&path)?);
        Ok(match &self.payload {
            Some(RequestBody::Json(body)) => settings.with_json(request, body.clone()),
            Some(RequestBody::Binary(bytes)) => request.with_binary_body(bytes.clone()),
            None => request,
        })
    }

    pub(crate) fn bind(&self, body: &serde_json::Value, format: JsonFormat) -> Result<()> {
        match &self.return_type {
            ReturnType::None => {}
            ReturnType::Object(object) => object.bind_json(&response::entity(body, format)),
            ReturnType::Collection(collection) => {
                let page = response::page(body, format)?;
                collection.bind_items(page.items, page.next_link, false);
            }
            ReturnType::Result(slot) => {
                slot.resolve(response::scalar(body, format, &self.method_name))
            }
        }
        Ok(())
    }
}
