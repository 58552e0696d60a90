use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::debug;

use skein_core::error::{Result, SkeinError};
use skein_core::traits::Tool;
use skein_core::types::ToolResult;

use crate::guests::GuestIndex;

const MAX_RESULTS: usize = 3;

pub struct GuestInfoTool {
    index: Arc<GuestIndex>,
}

impl GuestInfoTool {
    pub fn new(index: Arc<GuestIndex>) -> Self {
        Self { index }
    }
}

#[derive(Deserialize)]
struct GuestInfoInput {
    query: String,
}

impl Tool for GuestInfoTool {
    fn name(&self) -> &str {
        "guest_info_retriever"
    }

    fn description(&self) -> &str {
        "Retrieves detailed information about gala guests based on their name or relation."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The name or relation of the guest you want information about."
                }
            },
            "required": ["query"]
        })
    }

    fn timeout_secs(&self) -> u64 {
        10
    }

    fn execute(&self, input: serde_json::Value) -> BoxFuture<'_, Result<ToolResult>> {
        Box::pin(async move {
            let params: GuestInfoInput = serde_json::from_value(input)
                .map_err(|e| SkeinError::ToolValidation(e.to_string()))?;

            let hits = self.index.search(&params.query, MAX_RESULTS)?;
            debug!(query = %params.query, hits = hits.len(), "Guest lookup");

            if hits.is_empty() {
                return Ok(ToolResult::success("No matching guest information found."));
            }
            let docs: Vec<String> = hits.iter().map(|g| g.document()).collect();
            Ok(ToolResult::success(docs.join("\n\n")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> GuestInfoTool {
        GuestInfoTool::new(Arc::new(GuestIndex::bundled().unwrap()))
    }

    #[tokio::test]
    async fn test_lookup_by_name() {
        let result = tool()
            .execute(serde_json::json!({"query": "Lady Ada Lovelace"}))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert!(result.content.starts_with("Name: Ada Lovelace\n"));
        assert!(result.content.contains("Email: ada.lovelace@example.com"));
    }

    #[tokio::test]
    async fn test_no_match() {
        let result = tool()
            .execute(serde_json::json!({"query": "zeppelin"}))
            .await
            .unwrap();
        assert_eq!(result.content, "No matching guest information found.");
    }

    #[tokio::test]
    async fn test_missing_query_is_validation_error() {
        let result = tool().execute(serde_json::json!({})).await;
        assert!(matches!(result, Err(SkeinError::ToolValidation(_))));
    }
}
