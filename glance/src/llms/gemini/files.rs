//! Gemini Files API: resumable uploads and status lookups.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use tracing::debug;

use crate::error::{LlmError, Result};
use crate::media::{FileState, MediaStore, RemoteFile};

use super::client::Gemini;
use super::types::{GeminiFile, UploadFileMetadata, UploadFileResponse, UploadStartRequest};

/// Map an API state string to a [`FileState`].
///
/// `STATE_UNSPECIFIED` and unknown values are treated as still processing;
/// the poll timeout bounds how long that can last.
fn parse_state(state: Option<&str>) -> FileState {
    match state {
        Some("ACTIVE") => FileState::Active,
        Some("FAILED") => FileState::Failed,
        _ => FileState::Processing,
    }
}

impl From<GeminiFile> for RemoteFile {
    fn from(file: GeminiFile) -> Self {
        Self {
            state: parse_state(file.state.as_deref()),
            error: file.error.map(|e| e.message).filter(|m| !m.is_empty()),
            name: file.name,
            uri: file.uri,
            mime_type: file.mime_type,
        }
    }
}

impl Gemini {
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let error_text = response.text().await.unwrap_or_default();
        Err(Self::parse_error(status.as_u16(), &error_text).into())
    }

    async fn parse_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        expected: &str,
    ) -> Result<T> {
        let text = response.text().await.map_err(LlmError::from)?;
        serde_json::from_str(&text).map_err(|e| {
            LlmError::response_format(expected, format!("parse error: {e}, response: {text}"))
                .into()
        })
    }

    /// Upload raw bytes as a file resource.
    ///
    /// Starts a resumable session, then sends the bytes and finalizes in a
    /// single request.
    ///
    /// # Errors
    ///
    /// Returns an error if either request fails or the session URL is missing.
    pub async fn upload_bytes(
        &self,
        display_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<RemoteFile> {
        let timeout = Duration::from_secs(self.config.upload_timeout_secs);
        let start = self
            .build_request(Method::POST, &self.upload_url())
            .timeout(timeout)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&UploadStartRequest {
                file: UploadFileMetadata {
                    display_name: display_name.to_owned(),
                },
            })
            .send()
            .await
            .map_err(LlmError::from)?;
        let start = Self::check(start).await?;

        let session_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or_else(|| LlmError::response_format("x-goog-upload-url header", "none"))?;
        debug!(display_name, len = bytes.len(), "started resumable upload");

        let finish = self
            .build_request(Method::POST, &session_url)
            .timeout(timeout)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await
            .map_err(LlmError::from)?;
        let finish = Self::check(finish).await?;

        let uploaded: UploadFileResponse = Self::parse_json(finish, "uploaded file").await?;
        Ok(uploaded.file.into())
    }

    /// Fetch the current state of a file resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a file.
    pub async fn get_file(&self, name: &str) -> Result<RemoteFile> {
        let response = self
            .build_request(Method::GET, &self.file_url(name))
            .send()
            .await
            .map_err(LlmError::from)?;
        let response = Self::check(response).await?;
        let file: GeminiFile = Self::parse_json(response, "file resource").await?;
        Ok(file.into())
    }
}

#[async_trait]
impl MediaStore for Gemini {
    async fn upload(&self, path: &Path, mime_type: &str) -> Result<RemoteFile> {
        let bytes = tokio::fs::read(path).await?;
        let display_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload");
        self.upload_bytes(display_name, mime_type, bytes).await
    }

    async fn status(&self, name: &str) -> Result<RemoteFile> {
        self.get_file(name).await
    }
}
