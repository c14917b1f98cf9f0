//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types and traits for easy access.
//!
//! # Usage
//!
//! ```rust,ignore
//! use glance::prelude::*;
//! ```

pub use crate::agent::{Agent, MediaRef, RunOutput, ToolCallRecord};
pub use crate::analysis::{
    Analysis, AnalysisConfig, AnalysisStatus, Analyzer, EMPTY_PROMPT_MESSAGE, NO_MEDIA_MESSAGE,
    video_prompt,
};
pub use crate::chat::{
    ChatProvider, ChatRequest, ChatResponse, SharedChatProvider, StopReason, Usage,
};
pub use crate::error::{Error, LlmError, MediaError, Result, ToolError};
pub use crate::llms::{Gemini, GeminiConfig};
pub use crate::media::{
    Bounds, FileState, MediaKind, MediaStore, NormalizedImage, PollPolicy, RemoteFile,
    SharedMediaStore, UploadedMedia,
};
pub use crate::message::{ContentPart, Message, Role, ToolCall};
pub use crate::tool::{BoxedTool, DynTool, Tool, ToolBox, ToolDefinition};
pub use crate::tools::WebSearchTool;
