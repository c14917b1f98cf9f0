//! Configuration schema definitions.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields a runnable configuration once an API key is supplied.

use std::net::SocketAddr;
use std::time::Duration;

use glance::media::{Bounds, PollPolicy};
use glance::prelude::GeminiConfig as ClientConfig;
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Gemini provider configuration.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Agent configuration.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Web search tool configuration.
    #[serde(default)]
    pub search: SearchConfig,

    /// Media handling configuration.
    #[serde(default)]
    pub media: MediaConfig,

    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Google Gemini provider config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key. Usually left empty and supplied through `GEMINI_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base URL override.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model used by the agent.
    #[serde(default = "default_model")]
    pub model: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Timeout in seconds for each video upload request.
    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout_secs: u64,
}

fn default_base_url() -> String {
    ClientConfig::DEFAULT_BASE_URL.to_owned()
}

fn default_model() -> String {
    ClientConfig::DEFAULT_MODEL.to_owned()
}

const fn default_timeout_secs() -> u64 {
    ClientConfig::DEFAULT_TIMEOUT_SECS
}

const fn default_upload_timeout_secs() -> u64 {
    ClientConfig::DEFAULT_UPLOAD_TIMEOUT_SECS
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            upload_timeout_secs: default_upload_timeout_secs(),
        }
    }
}

impl GeminiConfig {
    /// Build the client configuration, if an API key is present.
    #[must_use]
    pub fn client_config(&self) -> Option<ClientConfig> {
        let key = self.api_key.as_deref().filter(|k| !k.trim().is_empty())?;
        Some(
            ClientConfig::new(key)
                .with_base_url(&self.base_url)
                .with_model(&self.model)
                .with_timeout(self.timeout_secs)
                .with_upload_timeout(self.upload_timeout_secs),
        )
    }
}

/// Agent configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Display name of the agent.
    #[serde(default = "default_agent_name")]
    pub name: String,
    /// Maximum model calls per request.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Ask the model to answer in markdown.
    #[serde(default = "default_true")]
    pub markdown: bool,
    /// Extra system instructions.
    #[serde(default)]
    pub instructions: Option<String>,
}

fn default_agent_name() -> String {
    "Multimodal Analyst".to_owned()
}

const fn default_max_steps() -> usize {
    glance::agent::Agent::DEFAULT_MAX_STEPS
}

const fn default_true() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            max_steps: default_max_steps(),
            markdown: true,
            instructions: None,
        }
    }
}

/// Web search tool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Give the agent the web search tool.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Results returned per search.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Search endpoint override.
    #[serde(default)]
    pub base_url: Option<String>,
}

const fn default_max_results() -> usize {
    glance::tools::WebSearchTool::DEFAULT_MAX_RESULTS
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_results: default_max_results(),
            base_url: None,
        }
    }
}

/// Media handling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Thumbnail width bound.
    #[serde(default = "default_max_width")]
    pub max_width: u32,
    /// Thumbnail height bound.
    #[serde(default = "default_max_height")]
    pub max_height: u32,
    /// Seconds between status reads while a video is processing.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Seconds to wait for a video before giving up.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

const fn default_max_width() -> u32 {
    Bounds::DEFAULT.max_width
}

const fn default_max_height() -> u32 {
    Bounds::DEFAULT.max_height
}

const fn default_poll_interval_secs() -> u64 {
    PollPolicy::DEFAULT_INTERVAL.as_secs()
}

const fn default_poll_timeout_secs() -> u64 {
    PollPolicy::DEFAULT_TIMEOUT.as_secs()
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_width: default_max_width(),
            max_height: default_max_height(),
            poll_interval_secs: default_poll_interval_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

impl MediaConfig {
    /// Thumbnail bounds.
    #[must_use]
    pub const fn bounds(&self) -> Bounds {
        Bounds::new(self.max_width, self.max_height)
    }

    /// Readiness polling policy.
    #[must_use]
    pub const fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_secs(self.poll_interval_secs),
            Duration::from_secs(self.poll_timeout_secs),
        )
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted request body, in megabytes.
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_owned()
}

const fn default_port() -> u16 {
    8501
}

const fn default_max_upload_mb() -> usize {
    200
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Body limit in bytes.
    #[must_use]
    pub const fn body_limit(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl AppConfig {
    /// Validate the configuration and return any issues found.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.gemini.client_config().is_none() {
            issues.push(ConfigIssue::error(
                "gemini.api_key",
                "No API key set. Set GEMINI_API_KEY or gemini.api_key.",
            ));
        }

        if self.agent.max_steps == 0 {
            issues.push(ConfigIssue::error(
                "agent.max_steps",
                "Max steps must be at least 1",
            ));
        }

        if self.media.max_width == 0 || self.media.max_height == 0 {
            issues.push(ConfigIssue::error(
                "media",
                "Thumbnail bounds must be at least 1x1",
            ));
        }

        if self.media.poll_interval_secs == 0 {
            issues.push(ConfigIssue::warning(
                "media.poll_interval_secs",
                "Poll interval is 0, the file status will be read in a tight loop",
            ));
        }

        if self.media.poll_timeout_secs < self.media.poll_interval_secs {
            issues.push(ConfigIssue::warning(
                "media.poll_timeout_secs",
                "Poll timeout is shorter than the interval, videos will be read at most once",
            ));
        }

        if self.search.enabled && self.search.max_results == 0 {
            issues.push(ConfigIssue::warning(
                "search.max_results",
                "Search is enabled but returns no results",
            ));
        }

        if self.server.bind_address().parse::<SocketAddr>().is_err() {
            issues.push(ConfigIssue::error(
                "server.host",
                format!("{:?} is not a valid bind address", self.server.bind_address()),
            ));
        }

        if self.server.max_upload_mb == 0 {
            issues.push(ConfigIssue::error(
                "server.max_upload_mb",
                "Upload limit must be at least 1 MB",
            ));
        }

        issues
    }

    /// Check if the configuration is valid (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate()
            .iter()
            .all(|issue| issue.level != IssueLevel::Error)
    }

    /// Merge environment variables into the configuration.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_vars(|name| std::env::var(name).ok())
    }

    /// Merge variables from `lookup`. Variables win over file values.
    #[must_use]
    pub fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup("GEMINI_API_KEY").or_else(|| lookup("GOOGLE_API_KEY")) {
            self.gemini.api_key = Some(key);
        }
        if let Some(url) = lookup("GEMINI_BASE_URL") {
            self.gemini.base_url = url;
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            self.gemini.model = model;
        }
        self
    }
}

/// Configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    /// Issue severity level.
    pub level: IssueLevel,
    /// Configuration path (e.g., "gemini.api_key").
    pub path: String,
    /// Human-readable message.
    pub message: String,
}

impl ConfigIssue {
    /// Create an error-level issue.
    #[must_use]
    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Error,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a warning-level issue.
    #[must_use]
    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Warning,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.level {
            IssueLevel::Error => "ERROR",
            IssueLevel::Warning => "WARN",
        };
        write!(f, "[{}] {}: {}", prefix, self.path, self.message)
    }
}

/// Severity level for configuration issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueLevel {
    /// Error that prevents the app from running correctly.
    Error,
    /// Warning about potential issues.
    Warning,
}
