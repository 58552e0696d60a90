use futures::future::BoxFuture;
use serde_json::{json, Value};
use tracing::debug;

use skein_core::error::{Result, SkeinError};
use skein_core::traits::Tool;
use skein_core::types::ToolResult;

const MAX_TOPICS: usize = 5;

/// Web search over the DuckDuckGo Instant Answer API.
pub struct WebSearchTool {
    endpoint: String,
    http: reqwest::Client,
}

impl WebSearchTool {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            http: reqwest::Client::new(),
        }
    }
}

fn tool_error(message: impl std::fmt::Display) -> SkeinError {
    SkeinError::ToolExecution {
        tool: "web_search".into(),
        message: message.to_string(),
    }
}

/// Render an Instant Answer response: the answer or abstract first, then
/// related topics (nested topic groups are flattened).
pub(crate) fn format_instant_answer(body: &Value, max_topics: usize) -> String {
    let mut sections = Vec::new();

    if let Some(answer) = body["Answer"].as_str().filter(|s| !s.is_empty()) {
        sections.push(answer.to_string());
    }
    if let Some(text) = body["AbstractText"].as_str().filter(|s| !s.is_empty()) {
        let heading = body["Heading"].as_str().unwrap_or("");
        let url = body["AbstractURL"].as_str().unwrap_or("");
        let mut block = if heading.is_empty() {
            text.to_string()
        } else {
            format!("**{}**\n{}", heading, text)
        };
        if !url.is_empty() {
            block.push_str(&format!("\nURL: {}", url));
        }
        sections.push(block);
    }

    let mut topics = Vec::new();
    collect_topics(&body["RelatedTopics"], &mut topics);
    for (text, url) in topics.into_iter().take(max_topics) {
        if url.is_empty() {
            sections.push(text);
        } else {
            sections.push(format!("{}\nURL: {}", text, url));
        }
    }

    if sections.is_empty() {
        "No results found.".to_string()
    } else {
        sections.join("\n\n---\n\n")
    }
}

fn collect_topics(value: &Value, out: &mut Vec<(String, String)>) {
    let Some(items) = value.as_array() else {
        return;
    };
    for item in items {
        if let Some(text) = item["Text"].as_str() {
            let url = item["FirstURL"].as_str().unwrap_or("");
            out.push((text.to_string(), url.to_string()));
        } else {
            collect_topics(&item["Topics"], out);
        }
    }
}

impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information. Returns an instant answer and related topics."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                }
            },
            "required": ["query"]
        })
    }

    fn timeout_secs(&self) -> u64 {
        20
    }

    fn execute(&self, input: serde_json::Value) -> BoxFuture<'_, Result<ToolResult>> {
        Box::pin(async move {
            let query = input["query"]
                .as_str()
                .ok_or_else(|| SkeinError::ToolValidation("'query' must be a string".into()))?;

            debug!(query = %query, "Web search");

            let resp = self
                .http
                .get(&self.endpoint)
                .query(&[
                    ("q", query),
                    ("format", "json"),
                    ("no_html", "1"),
                    ("skip_disambig", "1"),
                ])
                .send()
                .await
                .map_err(tool_error)?;

            if !resp.status().is_success() {
                return Err(tool_error(format!("HTTP {}", resp.status())));
            }

            let body: Value = resp.json().await.map_err(tool_error)?;
            Ok(ToolResult::success(format_instant_answer(&body, MAX_TOPICS)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_abstract_and_topics() {
        let body = json!({
            "Heading": "Emmanuel Macron",
            "AbstractText": "Emmanuel Macron is a French politician.",
            "AbstractURL": "https://en.wikipedia.org/wiki/Emmanuel_Macron",
            "RelatedTopics": [
                {"Text": "President of France", "FirstURL": "https://duckduckgo.com/President_of_France"},
                {"Name": "Politics", "Topics": [
                    {"Text": "Renaissance (party)", "FirstURL": "https://duckduckgo.com/Renaissance"}
                ]}
            ]
        });
        let out = format_instant_answer(&body, 5);
        let sections: Vec<&str> = out.split("\n\n---\n\n").collect();
        assert_eq!(sections.len(), 3);
        assert!(sections[0].starts_with("**Emmanuel Macron**\nEmmanuel Macron is a French politician."));
        assert!(sections[0].ends_with("URL: https://en.wikipedia.org/wiki/Emmanuel_Macron"));
        assert!(sections[2].starts_with("Renaissance (party)"));
    }

    #[test]
    fn test_format_caps_topics() {
        let topics: Vec<Value> = (0..10)
            .map(|i| json!({"Text": format!("topic {}", i), "FirstURL": ""}))
            .collect();
        let out = format_instant_answer(&json!({"RelatedTopics": topics}), 2);
        assert_eq!(out, "topic 0\n\n---\n\ntopic 1");
    }

    #[test]
    fn test_format_empty() {
        let body = json!({"AbstractText": "", "RelatedTopics": []});
        assert_eq!(format_instant_answer(&body, 5), "No results found.");
    }

    #[tokio::test]
    async fn test_missing_query() {
        let tool = WebSearchTool::new("http://127.0.0.1:9");
        let result = tool.execute(json!({})).await;
        assert!(matches!(result, Err(SkeinError::ToolValidation(_))));
    }
}
