//! Gemini API client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method};
use serde_json::json;

use crate::chat::ChatRequest;
use crate::error::{LlmError, Result};
use crate::message::{ContentPart, Message, Role};
use crate::tool::ToolDefinition;

use super::config::GeminiConfig;
use super::types::{
    FileData, FunctionCall, FunctionDeclaration, FunctionResponse, GeminiContent,
    GeminiErrorResponse, GeminiPart, GeminiTool, GenerateContentRequest, InlineData,
};

/// Gemini API client.
///
/// One client serves both content generation and the Files API, so the
/// same value can be shared as the agent's provider and the media store.
#[derive(Debug, Clone)]
pub struct Gemini {
    pub(crate) config: Arc<GeminiConfig>,
    pub(crate) client: Client,
}

impl Gemini {
    /// Create a new Gemini client with the given configuration.
    ///
    /// # Errors
    ///
    /// Fails when the API key is empty or the HTTP client cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(LlmError::auth("gemini", "API key is required").into());
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        let client = builder
            .build()
            .map_err(|e| LlmError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Create a client from environment variables.
    ///
    /// # Errors
    ///
    /// Fails when no API key is set in the environment.
    pub fn from_env() -> Result<Self> {
        let config = GeminiConfig::from_env()?;
        Self::new(config)
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Get the default model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Build the `generateContent` URL for a model.
    pub(crate) fn generate_url(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/v1beta/models/{model}:generateContent", self.base_url())
    }

    /// Build the resumable upload URL.
    pub(crate) fn upload_url(&self) -> String {
        format!("{}/upload/v1beta/files", self.base_url())
    }

    /// Build the URL of a file resource (`files/abc123`).
    pub(crate) fn file_url(&self, name: &str) -> String {
        format!("{}/v1beta/{name}", self.base_url())
    }

    /// Build an authenticated request.
    pub(crate) fn build_request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("x-goog-api-key", &self.config.api_key)
    }

    /// Convert a single part to Gemini format.
    fn convert_part(part: &ContentPart) -> GeminiPart {
        match part {
            ContentPart::Text { text } => GeminiPart::text(text.clone()),
            ContentPart::InlineData { mime_type, data } => GeminiPart {
                inline_data: Some(InlineData {
                    mime_type: mime_type.clone(),
                    data: data.clone(),
                }),
                ..GeminiPart::default()
            },
            ContentPart::FileData {
                mime_type,
                file_uri,
            } => GeminiPart {
                file_data: Some(FileData {
                    mime_type: mime_type.clone(),
                    file_uri: file_uri.clone(),
                }),
                ..GeminiPart::default()
            },
        }
    }

    /// Convert a non-system message to a Gemini turn.
    pub(crate) fn convert_message(msg: &Message) -> GeminiContent {
        match msg.role {
            Role::Tool => {
                let name = msg.name.clone().unwrap_or_default();
                let content = msg.text().unwrap_or_default();
                GeminiContent {
                    role: Some("user".to_owned()),
                    parts: vec![GeminiPart {
                        function_response: Some(FunctionResponse {
                            name,
                            response: json!({ "content": content }),
                        }),
                        ..GeminiPart::default()
                    }],
                }
            }
            Role::Assistant => {
                let mut parts: Vec<GeminiPart> = msg.parts.iter().map(Self::convert_part).collect();
                parts.extend(msg.tool_calls.iter().map(|tc| GeminiPart {
                    function_call: Some(FunctionCall {
                        name: tc.name.clone(),
                        args: tc.arguments.clone(),
                    }),
                    ..GeminiPart::default()
                }));
                GeminiContent {
                    role: Some("model".to_owned()),
                    parts,
                }
            }
            Role::User | Role::System => GeminiContent {
                role: Some("user".to_owned()),
                parts: msg.parts.iter().map(Self::convert_part).collect(),
            },
        }
    }

    /// Convert messages into a system instruction and alternating turns.
    ///
    /// Gemini rejects consecutive turns with the same role, so adjacent
    /// turns (e.g. several tool responses) are merged.
    pub(crate) fn convert_messages(
        messages: &[Message],
    ) -> (Option<GeminiContent>, Vec<GeminiContent>) {
        let system_parts: Vec<GeminiPart> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .flat_map(|m| m.parts.iter().map(Self::convert_part))
            .collect();

        let mut contents: Vec<GeminiContent> = Vec::new();
        for msg in messages.iter().filter(|m| m.role != Role::System) {
            let turn = Self::convert_message(msg);
            match contents.last_mut() {
                Some(last) if last.role == turn.role => last.parts.extend(turn.parts),
                _ => contents.push(turn),
            }
        }

        let system = (!system_parts.is_empty()).then(|| GeminiContent {
            role: None,
            parts: system_parts,
        });
        (system, contents)
    }

    /// Convert `ToolDefinition` to a Gemini function declaration.
    pub(crate) fn convert_tool(tool: &ToolDefinition) -> FunctionDeclaration {
        FunctionDeclaration {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        }
    }

    /// Resolve the model for a request.
    pub(crate) fn request_model<'a>(&'a self, request: &'a ChatRequest) -> &'a str {
        if request.model.is_empty() {
            &self.config.model
        } else {
            &request.model
        }
    }

    /// Build the request body.
    pub(crate) fn build_body(request: &ChatRequest) -> GenerateContentRequest {
        let (system_instruction, contents) = Self::convert_messages(&request.messages);

        let tools = request.tools.as_ref().map(|tools| {
            vec![GeminiTool {
                function_declarations: tools.iter().map(Self::convert_tool).collect(),
            }]
        });

        GenerateContentRequest {
            contents,
            system_instruction,
            tools,
        }
    }

    /// Parse an error response from Gemini.
    pub(crate) fn parse_error(status: u16, body: &str) -> LlmError {
        if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(body) {
            let error = error_response.error;
            let code = error.status.unwrap_or_else(|| status.to_string());

            return match status {
                401 | 403 => LlmError::auth("gemini", error.message),
                429 => LlmError::rate_limited("gemini"),
                _ => LlmError::provider_code("gemini", code, error.message),
            };
        }

        LlmError::http_status(status, body.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::message::ToolCall;

    fn client() -> Gemini {
        Gemini::new(GeminiConfig::new("key").with_base_url("http://localhost:1/")).unwrap()
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = Gemini::new(GeminiConfig::default()).unwrap_err();
        assert!(err.to_string().contains("API key is required"));
    }

    #[test]
    fn test_urls() {
        let gemini = client();
        assert_eq!(
            gemini.generate_url("models/gemini-2.0-flash-exp"),
            "http://localhost:1/v1beta/models/gemini-2.0-flash-exp:generateContent"
        );
        assert_eq!(gemini.upload_url(), "http://localhost:1/upload/v1beta/files");
        assert_eq!(gemini.file_url("files/abc"), "http://localhost:1/v1beta/files/abc");
    }

    #[test]
    fn test_system_messages_become_instruction() {
        let messages = vec![Message::system("be brief"), Message::user("hi")];
        let (system, contents) = Gemini::convert_messages(&messages);
        let system = system.unwrap();
        assert!(system.role.is_none());
        assert_eq!(system.parts[0].text.as_deref(), Some("be brief"));
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].role.as_deref(), Some("user"));
    }

    #[test]
    fn test_media_parts_conversion() {
        let msg = Message::user("what happens?")
            .part(ContentPart::file("video/mp4", "https://files/abc"))
            .part(ContentPart::inline_bytes("image/jpeg", b"jpg"));
        let turn = Gemini::convert_message(&msg);
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["parts"][1]["fileData"]["fileUri"], "https://files/abc");
        assert_eq!(json["parts"][1]["fileData"]["mimeType"], "video/mp4");
        assert_eq!(json["parts"][2]["inlineData"]["mimeType"], "image/jpeg");
    }

    #[test]
    fn test_tool_round_trip_merges_turns() {
        let messages = vec![
            Message::user("q"),
            Message::assistant_with_tool_calls(vec![
                ToolCall::new("call_0", "web_search", json!({"query": "a"})),
                ToolCall::new("call_1", "web_search", json!({"query": "b"})),
            ]),
            Message::tool_response("call_0", "web_search", "A"),
            Message::tool_response("call_1", "web_search", "B"),
        ];
        let (_, contents) = Gemini::convert_messages(&messages);
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1].role.as_deref(), Some("model"));
        assert_eq!(contents[1].parts.len(), 2);
        assert_eq!(contents[2].role.as_deref(), Some("user"));
        assert_eq!(contents[2].parts.len(), 2);
        let resp = contents[2].parts[1].function_response.as_ref().unwrap();
        assert_eq!(resp.name, "web_search");
        assert_eq!(resp.response["content"], "B");
    }

    #[test]
    fn test_build_body_tools() {
        let tool = ToolDefinition::new("web_search", "search", json!({"type": "object"}));
        let request = ChatRequest::new("").user("hi").tools(vec![tool]);
        let body = serde_json::to_value(Gemini::build_body(&request)).unwrap();
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "web_search"
        );
        assert!(body.get("generationConfig").is_none());
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_request_model_defaults() {
        let gemini = client();
        assert_eq!(
            gemini.request_model(&ChatRequest::new("")),
            "gemini-2.0-flash-exp"
        );
        assert_eq!(gemini.request_model(&ChatRequest::new("other")), "other");
    }

    #[test]
    fn test_parse_error() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert!(matches!(
            Gemini::parse_error(403, body),
            LlmError::Auth { .. }
        ));
        assert!(matches!(
            Gemini::parse_error(429, body),
            LlmError::RateLimited { .. }
        ));
        assert!(matches!(
            Gemini::parse_error(400, body),
            LlmError::Provider { ref code, .. } if code.as_deref() == Some("INVALID_ARGUMENT")
        ));
        assert!(matches!(
            Gemini::parse_error(502, "<html>"),
            LlmError::HttpStatus { status: 502, .. }
        ));
    }
}
