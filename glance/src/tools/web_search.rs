//! Web search tool backed by the `DuckDuckGo` Lite HTML interface.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ToolError;
use crate::tool::Tool;

// Patterns for the Lite result table
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a([^>]*class=['"]result-link['"][^>]*)>(.*?)</a>"#).expect("valid regex")
});
static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href=['"]([^'"]+)['"]"#).expect("valid regex"));
static SNIPPET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class=['"]result-snippet['"][^>]*>(.*?)</td>"#).expect("valid regex")
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Web search tool the agent can call to ground its answers.
#[derive(Debug, Clone)]
pub struct WebSearchTool {
    /// Maximum number of results to return.
    pub max_results: usize,
    base_url: String,
    client: reqwest::Client,
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self {
            max_results: Self::DEFAULT_MAX_RESULTS,
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            client: reqwest::Client::new(),
        }
    }
}

/// Arguments for web search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchArgs {
    /// The search query to perform.
    pub query: String,
}

/// A single search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Title of the result.
    pub title: String,
    /// URL of the result.
    pub link: String,
    /// Description/snippet of the result.
    pub description: String,
}

impl WebSearchTool {
    /// `DuckDuckGo` Lite endpoint.
    pub const DEFAULT_BASE_URL: &'static str = "https://lite.duckduckgo.com/lite/";
    /// Default number of results handed to the model.
    pub const DEFAULT_MAX_RESULTS: usize = 5;

    const USER_AGENT: &'static str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

    /// Create a new web search tool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum results.
    #[must_use]
    pub const fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Point the tool at a different search endpoint.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Parse results into markdown format.
    fn format_results(results: &[SearchResult]) -> String {
        let mut output = String::from("## Search Results\n\n");
        for result in results {
            output.push_str(&format!(
                "[{}]({})\n{}\n\n",
                result.title, result.link, result.description
            ));
        }
        output
    }

    /// Perform the search and return at most `max_results` hits.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ToolError> {
        let url = format!("{}?q={}", self.base_url, urlencoding::encode(query));

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, Self::USER_AGENT)
            .send()
            .await
            .map_err(|e| ToolError::execution(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ToolError::execution(format!(
                "Search returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ToolError::execution(format!("Failed to read response: {e}")))?;

        let results = Self::parse_lite_html(&html);
        debug!(query, found = results.len(), "web search completed");

        Ok(results.into_iter().take(self.max_results).collect())
    }

    /// Parse a `DuckDuckGo` Lite HTML response.
    ///
    /// Result anchors carry `class='result-link'`; snippets live in the
    /// following `result-snippet` cell, in the same order.
    fn parse_lite_html(html: &str) -> Vec<SearchResult> {
        let mut results = Vec::new();

        let snippets: Vec<String> = SNIPPET_RE
            .captures_iter(html)
            .map(|c| c.get(1).map(|m| clean_text(m.as_str())).unwrap_or_default())
            .collect();

        for (i, link_cap) in LINK_RE.captures_iter(html).enumerate() {
            let attrs = link_cap.get(1).map(|m| m.as_str()).unwrap_or_default();
            let title = link_cap
                .get(2)
                .map(|m| clean_text(m.as_str()))
                .unwrap_or_default();
            let link = HREF_RE
                .captures(attrs)
                .and_then(|c| c.get(1))
                .map(|m| resolve_link(m.as_str()))
                .unwrap_or_default();

            if !link.is_empty() && !title.is_empty() {
                results.push(SearchResult {
                    title,
                    link,
                    description: snippets.get(i).cloned().unwrap_or_default(),
                });
            }
        }

        results
    }
}

/// Strip inline tags and decode the handful of entities the Lite page emits.
fn clean_text(fragment: &str) -> String {
    TAG_RE
        .replace_all(fragment, "")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .trim()
        .to_owned()
}

/// Unwrap `DuckDuckGo` redirect links (`//duckduckgo.com/l/?uddg=...`).
fn resolve_link(href: &str) -> String {
    let href = href.replace("&amp;", "&");
    if let Some(pos) = href.find("uddg=") {
        let encoded = href[pos + 5..].split('&').next().unwrap_or_default();
        if let Ok(decoded) = urlencoding::decode(encoded) {
            return decoded.into_owned();
        }
    }
    if href.starts_with("//") {
        return format!("https:{href}");
    }
    href
}

#[async_trait]
impl Tool for WebSearchTool {
    const NAME: &'static str = "web_search";
    type Args = WebSearchArgs;
    type Output = String;
    type Error = ToolError;

    fn description(&self) -> String {
        "Performs a web search for a query and returns the top search results formatted as markdown.".to_owned()
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query to perform"
                }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let results = self.search(&args.query).await?;

        if results.is_empty() {
            return Err(ToolError::execution(
                "No results found! Try a less restrictive/shorter query.",
            ));
        }

        Ok(Self::format_results(&results))
    }
}
