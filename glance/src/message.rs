//! Message types for agent-model communication.
//!
//! This module defines the provider-neutral message format exchanged between
//! the agent and a chat backend. Media travels as content parts: images are
//! embedded inline, videos are referenced by the URI a remote store assigned.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message providing instructions.
    System,
    /// User message.
    User,
    /// Assistant (model) message.
    Assistant,
    /// Tool response message.
    Tool,
}

impl Role {
    /// Get the string representation of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// A single piece of message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },
    /// Bytes embedded in the request, base64 encoded.
    InlineData {
        /// MIME type of the data (e.g. `image/jpeg`).
        mime_type: String,
        /// Base64 encoded payload.
        data: String,
    },
    /// Reference to a file previously registered with the provider.
    FileData {
        /// MIME type of the file (e.g. `video/mp4`).
        mime_type: String,
        /// URI assigned by the remote store.
        file_uri: String,
    },
}

impl ContentPart {
    /// Create a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create an inline part from raw bytes.
    #[must_use]
    pub fn inline_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::InlineData {
            mime_type: mime_type.into(),
            data: BASE64.encode(bytes),
        }
    }

    /// Create a file reference part.
    #[must_use]
    pub fn file(mime_type: impl Into<String>, file_uri: impl Into<String>) -> Self {
        Self::FileData {
            mime_type: mime_type.into(),
            file_uri: file_uri.into(),
        }
    }

    /// Returns the text if this is a text part.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier, used to pair the response with the request.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// Arguments as a JSON object.
    pub arguments: Value,
}

impl ToolCall {
    /// Create a new tool call.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// A chat message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender.
    pub role: Role,
    /// Content parts, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<ContentPart>,
    /// Tool calls made by the model (assistant messages only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Tool call ID (tool messages only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool name (tool messages only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    /// Create a message with the given role and parts.
    #[must_use]
    pub const fn with_parts(role: Role, parts: Vec<ContentPart>) -> Self {
        Self {
            role,
            parts,
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Create a new system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_parts(Role::System, vec![ContentPart::text(content)])
    }

    /// Create a new user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_parts(Role::User, vec![ContentPart::text(content)])
    }

    /// Create a new assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_parts(Role::Assistant, vec![ContentPart::text(content)])
    }

    /// Create an assistant message carrying tool calls.
    #[must_use]
    pub fn assistant_with_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::with_parts(Role::Assistant, Vec::new())
        }
    }

    /// Create a tool response message.
    #[must_use]
    pub fn tool_response(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
            ..Self::with_parts(Role::Tool, vec![ContentPart::text(content)])
        }
    }

    /// Append a content part.
    #[must_use]
    pub fn part(mut self, part: ContentPart) -> Self {
        self.parts.push(part);
        self
    }

    /// Concatenated text of all text parts, or `None` if there are none.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self.parts.iter().filter_map(ContentPart::as_text).collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }

    /// Check if this message has tool calls.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::with_parts(Role::Assistant, Vec::new())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn user_message_has_single_text_part() {
        let msg = Message::user("What is in this video?");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text().as_deref(), Some("What is in this video?"));
        assert_eq!(msg.parts.len(), 1);
    }

    #[test]
    fn parts_are_appended_in_order() {
        let msg = Message::user("describe")
            .part(ContentPart::file("video/mp4", "https://files/abc"))
            .part(ContentPart::inline_bytes("image/jpeg", b"\xFF\xD8\xFF"));
        assert_eq!(msg.parts.len(), 3);
        assert!(matches!(msg.parts[1], ContentPart::FileData { .. }));
    }

    #[test]
    fn inline_bytes_are_base64() {
        let part = ContentPart::inline_bytes("image/png", b"hi");
        assert_eq!(
            part,
            ContentPart::InlineData {
                mime_type: "image/png".into(),
                data: "aGk=".into()
            }
        );
    }

    #[test]
    fn text_is_none_without_text_parts() {
        let msg = Message::assistant_with_tool_calls(vec![ToolCall::new(
            "call_0",
            "web_search",
            serde_json::json!({"query": "rust"}),
        )]);
        assert!(msg.text().is_none());
        assert!(msg.has_tool_calls());
    }

    #[test]
    fn tool_response_carries_id_and_name() {
        let msg = Message::tool_response("call_0", "web_search", "results");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_0"));
        assert_eq!(msg.name.as_deref(), Some("web_search"));
    }

    #[test]
    fn serializes_parts_with_type_tag() {
        let json = serde_json::to_value(ContentPart::file("video/mp4", "uri")).unwrap();
        assert_eq!(json["type"], "file_data");
        assert_eq!(json["file_uri"], "uri");
    }
}
