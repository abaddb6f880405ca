//! Web search backed by the Tavily search API

use super::{Tool, ToolContext, ToolOutput};
use crate::config::{SearchConfig, SearchDepth};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::Write as _;
use std::time::Duration;

const TAVILY_URL: &str = "https://api.tavily.com/search";
const SNIPPET_CHARS: usize = 600;

pub struct WebSearchTool {
    client: Client,
    api_key: String,
    max_results: u32,
    depth: SearchDepth,
}

#[derive(Debug, Deserialize)]
struct SearchInput {
    query: String,
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: u32,
    search_depth: &'static str,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

impl WebSearchTool {
    /// `None` when no API key is configured.
    pub fn from_config(config: &SearchConfig) -> Option<Self> {
        let api_key = config.api_key.clone().filter(|k| !k.is_empty())?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| tracing::warn!(error = %e, "Failed to build search client"))
            .ok()?;
        Some(Self {
            client,
            api_key,
            max_results: config.max_results,
            depth: config.depth,
        })
    }

    async fn search(&self, query: &str) -> Result<Vec<TavilyResult>, String> {
        let body = TavilyRequest {
            query,
            max_results: self.max_results,
            search_depth: self.depth.as_str(),
        };
        let response = self
            .client
            .post(TAVILY_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Search request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("Search failed with HTTP {status}: {text}"));
        }

        response
            .json::<TavilyResponse>()
            .await
            .map(|r| r.results)
            .map_err(|e| format!("Failed to parse search response: {e}"))
    }
}

fn format_results(query: &str, results: &[TavilyResult]) -> String {
    if results.is_empty() {
        return format!("No results for \"{query}\".");
    }
    let mut out = format!("Results for \"{query}\":\n");
    for (i, result) in results.iter().enumerate() {
        let snippet: String = result.content.chars().take(SNIPPET_CHARS).collect();
        let _ = write!(
            out,
            "\n{}. {} ({})\n   {}\n",
            i + 1,
            result.title,
            result.url,
            snippet.trim()
        );
    }
    out
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &'static str {
        "web_search"
    }

    fn description(&self) -> String {
        "Search the web for current, authoritative material on a subject. Use it to check facts, find good examples and see how a topic is usually taught.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["query"],
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to search for"
                }
            }
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        let query = match serde_json::from_value::<SearchInput>(input) {
            Ok(SearchInput { query }) if !query.trim().is_empty() => query,
            Ok(_) => return ToolOutput::error("query must not be empty"),
            Err(e) => return ToolOutput::error(format!("Invalid input: {e}")),
        };

        tracing::debug!(session_id = %ctx.session_id, query = %query, "Web search");

        tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => ToolOutput::error("Search cancelled"),
            result = self.search(&query) => match result {
                Ok(results) => ToolOutput::success(format_results(&query, &results)),
                Err(e) => {
                    tracing::warn!(session_id = %ctx.session_id, error = %e, "Web search failed");
                    ToolOutput::error(e)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn tool() -> WebSearchTool {
        WebSearchTool::from_config(&SearchConfig {
            api_key: Some("tvly-test".to_string()),
            ..SearchConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_no_key_no_tool() {
        assert!(WebSearchTool::from_config(&SearchConfig::default()).is_none());
    }

    #[tokio::test]
    async fn test_rejects_empty_query() {
        let ctx = ToolContext::new(CancellationToken::new(), "s1");
        let out = tool().run(json!({"query": "  "}), ctx.clone()).await;
        assert!(!out.success);
        let out = tool().run(json!({"q": "rust"}), ctx).await;
        assert!(out.output.starts_with("Invalid input"));
    }

    #[tokio::test]
    async fn test_cancelled_before_request() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let out = tool()
            .run(json!({"query": "rust ownership"}), ToolContext::new(cancel, "s1"))
            .await;
        assert_eq!(out.output, "Search cancelled");
    }

    #[test]
    fn test_request_wire_format() {
        let body = TavilyRequest {
            query: "rust",
            max_results: 5,
            search_depth: SearchDepth::Advanced.as_str(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, json!({"query": "rust", "max_results": 5, "search_depth": "advanced"}));
    }

    #[test]
    fn test_format_results() {
        let results = vec![TavilyResult {
            title: "The Book".to_string(),
            url: "https://doc.rust-lang.org/book/".to_string(),
            content: "y".repeat(1000),
        }];
        let text = format_results("ownership", &results);
        assert!(text.starts_with("Results for \"ownership\":"));
        assert!(text.contains("1. The Book (https://doc.rust-lang.org/book/)"));
        assert_eq!(text.matches('y').count(), SNIPPET_CHARS);
        assert_eq!(format_results("x", &[]), "No results for \"x\".");
    }
}
