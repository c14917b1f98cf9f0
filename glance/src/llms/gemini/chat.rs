//! Gemini `ChatProvider` implementation.

use async_trait::async_trait;
use reqwest::Method;
use tracing::debug;

use crate::chat::{ChatProvider, ChatRequest, ChatResponse, StopReason, Usage};
use crate::error::{LlmError, Result};
use crate::message::{ContentPart, Message, Role, ToolCall};

use super::client::Gemini;
use super::types::GenerateContentResponse;

impl Gemini {
    /// Parse the response into `ChatResponse`.
    pub(crate) fn parse_response(response: GenerateContentResponse) -> Result<ChatResponse> {
        let Some(candidate) = response.candidates.into_iter().next() else {
            if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(LlmError::provider_code(
                    "gemini",
                    reason,
                    "Prompt was blocked by safety filters",
                )
                .into());
            }
            return Err(LlmError::response_format("at least one candidate", "empty candidates").into());
        };

        let mut parts = Vec::new();
        let mut tool_calls = Vec::new();
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(text) = part.text {
                parts.push(ContentPart::text(text));
            }
            if let Some(call) = part.function_call {
                tool_calls.push(ToolCall::new(
                    format!("call_{}", tool_calls.len()),
                    call.name,
                    call.args,
                ));
            }
        }

        let stop_reason = if tool_calls.is_empty() {
            match candidate.finish_reason.as_deref() {
                Some("MAX_TOKENS") => StopReason::Length,
                Some("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII") => {
                    StopReason::ContentFilter
                }
                // "STOP", None, and any other value defaults to Stop
                _ => StopReason::Stop,
            }
        } else {
            StopReason::ToolCalls
        };

        let message = Message {
            tool_calls,
            ..Message::with_parts(Role::Assistant, parts)
        };

        let mut chat_response = ChatResponse::new(message).with_stop_reason(stop_reason);
        if let Some(usage) = response.usage_metadata {
            chat_response = chat_response.with_usage(Usage {
                prompt_tokens: usage.prompt_token_count,
                completion_tokens: usage.candidates_token_count,
                total_tokens: usage.total_token_count,
            });
        }
        chat_response.model = response.model_version;
        Ok(chat_response)
    }
}

#[async_trait]
impl ChatProvider for Gemini {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = self.generate_url(self.request_model(request));
        let body = Self::build_body(request);
        debug!(
            model = self.request_model(request),
            turns = body.contents.len(),
            "sending generateContent request"
        );

        let response = self
            .build_request(Method::POST, &url)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::from)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status.as_u16(), &error_text).into());
        }

        let response_text = response.text().await.map_err(LlmError::from)?;
        let parsed: GenerateContentResponse =
            serde_json::from_str(&response_text).map_err(|e| {
                LlmError::response_format(
                    "valid Gemini response",
                    format!("parse error: {e}, response: {response_text}"),
                )
            })?;

        Self::parse_response(parsed)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        self.model()
    }

    fn supports_vision(&self) -> bool {
        true
    }
}
