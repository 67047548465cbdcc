use std::sync::Arc;

use o365_runtime::{ClientContext, ContextConfig, JsonFormat, MockExecutor};

pub(crate) const GRAPH_ROOT: &str = "https://graph.microsoft.com/v1.0";
pub(crate) const SHAREPOINT_ROOT: &str = "https://contoso.sharepoint.com/sites/docs/_api";

pub(crate) fn graph(mock: &MockExecutor) -> ClientContext {
    ClientContext::new(ContextConfig::new(GRAPH_ROOT), Arc::new(mock.clone())).unwrap()
}

pub(crate) fn sharepoint(mock: &MockExecutor) -> ClientContext {
    sharepoint_with(mock, ContextConfig::new(SHAREPOINT_ROOT))
}

pub(crate) fn sharepoint_with(mock: &MockExecutor, config: ContextConfig) -> ClientContext {
    ClientContext::new(config, Arc::new(mock.clone())).unwrap()
}

pub(crate) fn sharepoint_verbose(mock: &MockExecutor) -> ClientContext {
    let config = ContextConfig::new(SHAREPOINT_ROOT).with_json_format(JsonFormat::Verbose);
    ClientContext::new(config, Arc::new(mock.clone())).unwrap()
}
