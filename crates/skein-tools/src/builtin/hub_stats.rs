use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::{debug, warn};

use skein_core::error::{Result, SkeinError};
use skein_core::traits::Tool;
use skein_core::types::ToolResult;

/// Most downloaded model of an author on the Hugging Face Hub.
pub struct HubStatsTool {
    endpoint: String,
    http: reqwest::Client,
}

impl HubStatsTool {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            http: reqwest::Client::new(),
        }
    }

    async fn top_model(&self, author: &str) -> Result<Option<HubModel>> {
        let failed = |message: String| SkeinError::ToolExecution {
            tool: "get_hub_stats".into(),
            message,
        };

        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("author", author),
                ("sort", "downloads"),
                ("direction", "-1"),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(failed(format!("HTTP {}", resp.status())));
        }

        let models: Vec<HubModel> = resp.json().await.map_err(|e| failed(e.to_string()))?;
        Ok(models.into_iter().next())
    }
}

#[derive(Debug, Deserialize)]
struct HubModel {
    #[serde(alias = "modelId")]
    id: String,
    #[serde(default)]
    downloads: u64,
}

/// `1234567` -> `"1,234,567"`.
pub(crate) fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl Tool for HubStatsTool {
    fn name(&self) -> &str {
        "get_hub_stats"
    }

    fn description(&self) -> &str {
        "Fetches the most downloaded model from a specific author on the Hugging Face Hub."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "author": {
                    "type": "string",
                    "description": "Hub user or organisation, e.g. 'Qwen' or 'facebook'"
                }
            },
            "required": ["author"]
        })
    }

    fn timeout_secs(&self) -> u64 {
        20
    }

    fn execute(&self, input: serde_json::Value) -> BoxFuture<'_, Result<ToolResult>> {
        Box::pin(async move {
            let author = input["author"]
                .as_str()
                .ok_or_else(|| SkeinError::ToolValidation("'author' must be a string".into()))?;

            // Lookup failures are reported to the model as text
            let result = match self.top_model(author).await {
                Ok(Some(model)) => {
                    debug!(author, model = %model.id, downloads = model.downloads, "Hub stats");
                    ToolResult::success(format!(
                        "The most downloaded model by {} is {} with {} downloads.",
                        author,
                        model.id,
                        group_thousands(model.downloads)
                    ))
                }
                Ok(None) => ToolResult::success(format!("No models found for author {}.", author)),
                Err(e) => {
                    warn!(author, error = %e, "Hub stats lookup failed");
                    ToolResult::error(format!("Error fetching models for {}: {}", author, e))
                }
            };
            Ok(result)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one HTTP response with the given status and JSON body.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{}/api/models", addr)
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(12_345_678), "12,345,678");
    }

    #[tokio::test]
    async fn test_most_downloaded_model() {
        let url = serve_once(
            "200 OK",
            r#"[{"id":"Qwen/Qwen2.5-7B-Instruct","downloads":12345678}]"#,
        )
        .await;
        let result = HubStatsTool::new(&url)
            .execute(serde_json::json!({"author": "Qwen"}))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(
            result.content,
            "The most downloaded model by Qwen is Qwen/Qwen2.5-7B-Instruct with 12,345,678 downloads."
        );
    }

    #[tokio::test]
    async fn test_no_models() {
        let url = serve_once("200 OK", "[]").await;
        let result = HubStatsTool::new(&url)
            .execute(serde_json::json!({"author": "nobody"}))
            .await
            .unwrap();
        assert_eq!(result.content, "No models found for author nobody.");
    }

    #[tokio::test]
    async fn test_http_error_becomes_message() {
        let url = serve_once("500 Internal Server Error", "{}").await;
        let result = HubStatsTool::new(&url)
            .execute(serde_json::json!({"author": "facebook"}))
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(result.content.starts_with("Error fetching models for facebook: "));
        assert!(result.content.contains("HTTP 500"));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_a_tool_error() {
        let url = serve_once("503 Service Unavailable", "{}").await;
        let err = HubStatsTool::new(&url).top_model("Qwen").await.unwrap_err();
        match err {
            SkeinError::ToolExecution { tool, message } => {
                assert_eq!(tool, "get_hub_stats");
                assert!(message.starts_with("HTTP 503"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
