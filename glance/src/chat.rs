//! Chat types and the provider trait for LLM operations.
//!
//! This module provides:
//! - [`ChatRequest`]: Request parameters for a single model turn
//! - [`ChatResponse`]: The model's reply
//! - [`ChatProvider`]: Core trait implemented by model backends
//!
//! # Example
//!
//! ```rust,ignore
//! use glance::prelude::*;
//!
//! let request = ChatRequest::new("gemini-2.0-flash-exp")
//!     .system("You are helpful.")
//!     .user("Hello!");
//!
//! let response = provider.chat(&request).await?;
//! println!("{}", response.text().unwrap_or_default());
//! ```

use std::ops::AddAssign;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;
use crate::tool::ToolDefinition;

/// A chat request to an LLM.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier. Empty means the provider's default model.
    #[serde(default)]
    pub model: String,

    /// Conversation messages.
    #[serde(default)]
    pub messages: Vec<Message>,

    /// Tools available for the model to call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
}

impl ChatRequest {
    /// Creates a new request with the specified model.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Adds a system message.
    #[must_use]
    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::system(content));
        self
    }

    /// Adds a user message.
    #[must_use]
    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    /// Adds an arbitrary message.
    #[must_use]
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Replaces all messages.
    #[must_use]
    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    /// Sets the available tools. An empty list clears them.
    #[must_use]
    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = if tools.is_empty() { None } else { Some(tools) };
        self
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum StopReason {
    /// Natural end of the answer.
    #[default]
    Stop,
    /// Output token limit reached.
    Length,
    /// The model wants tools to be called.
    ToolCalls,
    /// Output blocked by a safety filter.
    ContentFilter,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt (including media).
    pub prompt_tokens: u32,
    /// Tokens generated.
    pub completion_tokens: u32,
    /// Total tokens billed.
    pub total_tokens: u32,
}

impl Usage {
    /// Create usage from prompt and completion counts.
    #[must_use]
    pub const fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(rhs.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(rhs.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(rhs.total_tokens);
    }
}

/// A chat response from an LLM.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The generated message.
    pub message: Message,

    /// Why the model stopped generating.
    pub stop_reason: StopReason,

    /// Token usage statistics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Model identifier reported by the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ChatResponse {
    /// Creates a new response with a message.
    #[must_use]
    pub const fn new(message: Message) -> Self {
        Self {
            message,
            stop_reason: StopReason::Stop,
            usage: None,
            model: None,
        }
    }

    /// Creates a response from text content.
    #[must_use]
    pub fn from_text(content: impl Into<String>) -> Self {
        Self::new(Message::assistant(content))
    }

    /// Sets the stop reason.
    #[must_use]
    pub const fn with_stop_reason(mut self, reason: StopReason) -> Self {
        self.stop_reason = reason;
        self
    }

    /// Sets usage statistics.
    #[must_use]
    pub const fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Returns the text content of the response.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        self.message.text()
    }

    /// Returns `true` if the response contains tool calls.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        self.message.has_tool_calls()
    }
}

/// Trait for providers that support chat completions.
///
/// Implemented by every model backend; the agent only talks to this trait.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a chat request and receive a complete response.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Name of this provider, used in errors and logs.
    fn provider_name(&self) -> &'static str;

    /// Default model for this provider.
    fn default_model(&self) -> &str;

    /// Check if this provider accepts image and video inputs.
    fn supports_vision(&self) -> bool {
        false
    }
}

/// Type alias for an Arc-wrapped `ChatProvider`.
pub type SharedChatProvider = std::sync::Arc<dyn ChatProvider>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::message::Role;

    mod chat_request {
        use super::*;

        #[test]
        fn new_creates_with_model() {
            let req = ChatRequest::new("gemini-2.0-flash-exp");
            assert_eq!(req.model, "gemini-2.0-flash-exp");
            assert!(req.messages.is_empty());
            assert!(req.tools.is_none());
        }

        #[test]
        fn builder_appends_messages() {
            let req = ChatRequest::new("m").system("be brief").user("hi");
            assert_eq!(req.messages.len(), 2);
            assert_eq!(req.messages[0].role, Role::System);
            assert_eq!(req.messages[1].role, Role::User);
        }

        #[test]
        fn empty_tools_are_cleared() {
            let req = ChatRequest::new("m").tools(Vec::new());
            assert!(req.tools.is_none());
        }
    }

    mod usage {
        use super::*;

        #[test]
        fn new_computes_total() {
            let usage = Usage::new(120, 30);
            assert_eq!(usage.total_tokens, 150);
        }

        #[test]
        fn add_assign_accumulates() {
            let mut total = Usage::default();
            total += Usage::new(10, 5);
            total += Usage::new(1, 1);
            assert_eq!(total, Usage::new(11, 6));
        }
    }

    mod chat_response {
        use super::*;

        #[test]
        fn from_text_is_complete_answer() {
            let resp = ChatResponse::from_text("done");
            assert_eq!(resp.text().as_deref(), Some("done"));
            assert_eq!(resp.stop_reason, StopReason::Stop);
            assert!(!resp.has_tool_calls());
        }

        #[test]
        fn with_usage_sets_usage() {
            let resp = ChatResponse::from_text("x").with_usage(Usage::new(1, 2));
            assert_eq!(resp.usage.unwrap().total_tokens, 3);
        }
    }
}
