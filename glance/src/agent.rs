//! The multimodal agent.
//!
//! An [`Agent`] owns its [`SharedChatProvider`] and a [`ToolBox`]. A run
//! sends one user turn (the prompt plus any attached media) and then drives
//! the tool loop:
//!
//! 1. Call the model with the conversation and the tool definitions
//! 2. If the model asks for tools, execute them and append the results
//! 3. Repeat until the model answers with text or `max_steps` is reached
//!
//! Whether and when to search is left entirely to the model.
//!
//! # Example
//!
//! ```rust,ignore
//! use glance::prelude::*;
//!
//! let agent = Agent::new("Multimodal Analyst", Arc::new(gemini))
//!     .markdown(true)
//!     .tool(WebSearchTool::new());
//!
//! let output = agent.run("What breed is this dog?", MediaRef::images([path])).await?;
//! println!("{}", output.content);
//! ```

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{Instrument as _, debug, error, info, info_span, warn};

use crate::chat::{ChatRequest, SharedChatProvider, StopReason, Usage};
use crate::error::{Error, Result};
use crate::media::RemoteFile;
use crate::message::{ContentPart, Message, Role};
use crate::tool::{Tool, ToolBox};

/// Instruction appended when markdown output is enabled.
const MARKDOWN_INSTRUCTION: &str = "Use markdown to format your answers.";

/// Media attached to a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MediaRef {
    /// Text only.
    #[default]
    None,
    /// Videos already registered with the provider's media store.
    Videos(Vec<RemoteFile>),
    /// Local image files, sent inline.
    Images(Vec<PathBuf>),
}

impl MediaRef {
    /// Attach a single registered video.
    #[must_use]
    pub fn video(file: RemoteFile) -> Self {
        Self::Videos(vec![file])
    }

    /// Attach local images.
    #[must_use]
    pub fn images(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self::Images(paths.into_iter().map(Into::into).collect())
    }

    /// Returns `true` when nothing is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::Videos(v) => v.is_empty(),
            Self::Images(i) => i.is_empty(),
        }
    }

    /// Convert the attachments into content parts.
    async fn into_parts(self) -> Result<Vec<ContentPart>> {
        match self {
            Self::None => Ok(Vec::new()),
            Self::Videos(files) => Ok(files
                .into_iter()
                .map(|f| ContentPart::file(f.mime_type, f.uri))
                .collect()),
            Self::Images(paths) => {
                let mut parts = Vec::with_capacity(paths.len());
                for path in paths {
                    let bytes = tokio::fs::read(&path).await?;
                    let mime = mime_guess::from_path(&path).first_or_octet_stream();
                    parts.push(ContentPart::inline_bytes(mime.essence_str(), &bytes));
                }
                Ok(parts)
            }
        }
    }
}

/// A tool invocation made during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Tool name.
    pub name: String,
    /// Arguments the model supplied.
    pub arguments: Value,
    /// Whether the tool returned successfully.
    pub success: bool,
}

/// Result of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    /// Final answer text.
    pub content: String,
    /// Number of model calls made.
    pub steps: usize,
    /// Token usage summed over all steps.
    pub usage: Usage,
    /// Tools invoked, in order.
    pub tool_calls: Vec<ToolCallRecord>,
}

/// A configured agent.
///
/// Cheap to share behind an `Arc`; a run borrows the agent immutably, so
/// concurrent runs are independent.
pub struct Agent {
    /// Agent name, used in logs.
    pub name: String,
    /// System instructions.
    pub instructions: String,
    /// Model identifier. Empty means the provider's default.
    pub model: String,
    /// Ask the model to format answers as markdown.
    pub markdown: bool,
    /// Maximum number of model calls per run.
    pub max_steps: usize,
    provider: SharedChatProvider,
    tools: ToolBox,
}

impl Agent {
    /// Default step limit.
    pub const DEFAULT_MAX_STEPS: usize = 10;

    /// Create an agent backed by `provider`.
    #[must_use]
    pub fn new(name: impl Into<String>, provider: SharedChatProvider) -> Self {
        Self {
            name: name.into(),
            instructions: String::new(),
            model: String::new(),
            markdown: false,
            max_steps: Self::DEFAULT_MAX_STEPS,
            provider,
            tools: ToolBox::new(),
        }
    }

    /// Set the system instructions.
    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Set the model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Enable or disable markdown output.
    #[must_use]
    pub const fn markdown(mut self, markdown: bool) -> Self {
        self.markdown = markdown;
        self
    }

    /// Set the step limit.
    #[must_use]
    pub const fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Add a tool.
    #[must_use]
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self
    where
        T::Output: 'static,
    {
        self.tools.add(tool);
        self
    }

    /// Tools available to the model.
    #[must_use]
    pub const fn tools(&self) -> &ToolBox {
        &self.tools
    }

    /// The model this agent will call.
    #[must_use]
    pub fn resolved_model(&self) -> &str {
        if self.model.is_empty() {
            self.provider.default_model()
        } else {
            &self.model
        }
    }

    /// System prompt sent with every request.
    #[must_use]
    pub fn system_prompt(&self) -> String {
        let mut lines: Vec<&str> = Vec::new();
        if !self.instructions.is_empty() {
            lines.push(&self.instructions);
        }
        if self.markdown {
            lines.push(MARKDOWN_INSTRUCTION);
        }
        lines.join("\n")
    }

    /// Answer `prompt` about the attached `media`.
    ///
    /// # Errors
    ///
    /// Fails when an attached image cannot be read, the provider rejects
    /// media, a model call fails, the answer is blocked, or the step limit
    /// is exceeded. Tool failures are reported to the model instead.
    pub async fn run(&self, prompt: &str, media: MediaRef) -> Result<RunOutput> {
        let span = info_span!(
            "agent",
            agent.name = %self.name,
            agent.model = %self.resolved_model(),
            agent.max_steps = self.max_steps,
        );
        self.run_inner(prompt, media).instrument(span).await
    }

    async fn run_inner(&self, prompt: &str, media: MediaRef) -> Result<RunOutput> {
        if !media.is_empty() && !self.provider.supports_vision() {
            return Err(Error::agent(format!(
                "Provider '{}' does not accept media input",
                self.provider.provider_name()
            )));
        }

        let mut parts = media.into_parts().await?;
        let media_count = parts.len();
        parts.push(ContentPart::text(prompt));

        let mut messages = Vec::new();
        let system_prompt = self.system_prompt();
        if !system_prompt.is_empty() {
            messages.push(Message::system(system_prompt));
        }
        messages.push(Message::with_parts(Role::User, parts));

        info!(agent = %self.name, media = media_count, "Agent run started");

        let definitions = self.tools.definitions();
        let mut output = RunOutput::default();

        for step in 1..=self.max_steps {
            debug!(agent = %self.name, step, "Starting step");

            let request = ChatRequest::new(self.model.clone())
                .messages(messages.clone())
                .tools(definitions.clone());

            let response = self.provider.chat(&request).await.map_err(|e| {
                error!(error = %e, agent = %self.name, step, "LLM call failed");
                e
            })?;

            output.steps = step;
            if let Some(usage) = response.usage {
                output.usage += usage;
            }

            if !response.has_tool_calls() {
                if response.stop_reason == StopReason::ContentFilter {
                    return Err(Error::agent("Response was blocked by the model's safety filters"));
                }
                output.content = response.text().unwrap_or_default();
                info!(
                    agent = %self.name,
                    steps = step,
                    total_tokens = output.usage.total_tokens,
                    "Agent run completed",
                );
                return Ok(output);
            }

            let calls = response.message.tool_calls.clone();
            messages.push(response.message);

            for call in calls {
                debug!(tool = %call.name, args = %call.arguments, "Calling tool");
                let (content, success) =
                    match self.tools.call(&call.name, call.arguments.clone()).await {
                        Ok(Value::String(s)) => (s, true),
                        Ok(value) => (value.to_string(), true),
                        Err(e) => {
                            warn!(tool = %call.name, error = %e, "Tool call failed");
                            (format!("Error: {e}"), false)
                        }
                    };
                messages.push(Message::tool_response(&call.id, &call.name, content));
                output.tool_calls.push(ToolCallRecord {
                    name: call.name,
                    arguments: call.arguments,
                    success,
                });
            }
        }

        let err = Error::max_steps(self.max_steps);
        error!(error = %err, agent = %self.name, "Max steps exceeded");
        Err(err)
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("markdown", &self.markdown)
            .field("max_steps", &self.max_steps)
            .field("provider", &self.provider.provider_name())
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}
