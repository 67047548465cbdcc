//! Search relevance judgments.

use o365_runtime::{
    ClientContext, ClientResult, Entity, EntitySchema, KeyStyle, ResourcePath,
    ServiceOperationQuery,
};
use serde_json::json;

use crate::macros::entity;

pub static RANKING_LABELING: EntitySchema = EntitySchema {
    entity_type_name: "Microsoft.SharePoint.Client.Search.Query.RankingLabeling",
    properties: &[],
    key_property: None,
    key_style: KeyStyle::Segment,
};

entity! {
    /// Gets and adds relevance judgments for search results.
    RankingLabeling => RANKING_LABELING
}

impl RankingLabeling {
    /// The service singleton, addressed by its type name.
    pub fn open(context: &ClientContext) -> Self {
        Self::at(context, ResourcePath::root(RANKING_LABELING.entity_type_name))
    }

    /// Queue normalization of `url`. The normalized form resolves to the
    /// same document.
    pub fn normalize_result_url(&self, url: &str) -> ClientResult<String> {
        let result = ClientResult::new("NormalizeResultUrl");
        let query = ServiceOperationQuery::new(&self.0, "NormalizeResultUrl")
            .with_json_payload(json!({ "url": url }))
            .returning(&result);
        self.0.context().add_query(query.into());
        result
    }
}
