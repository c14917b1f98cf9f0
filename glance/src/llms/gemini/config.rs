//! Gemini client configuration.

use crate::error::{LlmError, Result};

/// Configuration for the Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Base URL for the API (defaults to Google's endpoint).
    pub base_url: String,
    /// Default model to use.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Timeout for each Files API upload request, in seconds. Replaces
    /// `timeout_secs` for uploads.
    pub upload_timeout_secs: u64,
}

impl GeminiConfig {
    /// Default Gemini API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";
    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "gemini-2.0-flash-exp";
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
    /// Default upload timeout. Large videos over slow links take minutes.
    pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 600;

    /// Creates a new configuration with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Reads from:
    /// - `GEMINI_API_KEY` (or `GOOGLE_API_KEY`) - Required API key
    /// - `GEMINI_BASE_URL` - Optional base URL
    /// - `GEMINI_MODEL` - Optional default model
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .map_err(|_| LlmError::auth("gemini", "GEMINI_API_KEY environment variable not set"))?;

        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_owned());

        let model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| Self::DEFAULT_MODEL.to_owned());

        Ok(Self {
            api_key,
            base_url,
            model,
            ..Self::default()
        })
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the default model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Sets the upload timeout.
    #[must_use]
    pub const fn with_upload_timeout(mut self, secs: u64) -> Self {
        self.upload_timeout_secs = secs;
        self
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            model: Self::DEFAULT_MODEL.to_owned(),
            timeout_secs: Some(Self::DEFAULT_TIMEOUT_SECS),
            upload_timeout_secs: Self::DEFAULT_UPLOAD_TIMEOUT_SECS,
        }
    }
}
