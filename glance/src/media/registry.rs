//! Remote media registration and readiness polling.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{Instrument as _, debug, info, info_span};

use crate::error::{MediaError, Result};

/// Processing state of a remotely registered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    /// Still being ingested; cannot be referenced yet.
    Processing,
    /// Ready for inference.
    Active,
    /// Ingestion failed permanently.
    Failed,
}

impl FileState {
    /// Get the string representation of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "PROCESSING",
            Self::Active => "ACTIVE",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to a file held by a remote media store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Resource name used for status lookups (e.g. `files/abc123`).
    pub name: String,
    /// URI the model uses to reference the file.
    pub uri: String,
    /// MIME type recorded by the store.
    pub mime_type: String,
    /// Current processing state.
    pub state: FileState,
    /// Failure reason, when the store reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RemoteFile {
    /// Create a handle in the given state.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        uri: impl Into<String>,
        mime_type: impl Into<String>,
        state: FileState,
    ) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            mime_type: mime_type.into(),
            state,
            error: None,
        }
    }

    /// Returns `true` once the file can be referenced by the model.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == FileState::Active
    }
}

/// A remote store that ingests media for later inference.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload the file at `path` and return its initial handle.
    async fn upload(&self, path: &Path, mime_type: &str) -> Result<RemoteFile>;

    /// Re-fetch the handle for `name`.
    async fn status(&self, name: &str) -> Result<RemoteFile>;
}

/// Type alias for an Arc-wrapped `MediaStore`.
pub type SharedMediaStore = Arc<dyn MediaStore>;

/// How often and how long to wait for a file to become active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between status reads.
    pub interval: Duration,
    /// Give up once this much time has passed since the upload returned.
    pub timeout: Duration,
}

impl PollPolicy {
    /// Default delay between status reads.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);
    /// Default overall wait.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

    /// Create a policy.
    #[must_use]
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL, Self::DEFAULT_TIMEOUT)
    }
}

/// Poll `file` until it is active.
///
/// `file` counts as the first observation; every tick sleeps for
/// `policy.interval` and then reads the status once.
///
/// # Errors
///
/// [`MediaError::RemoteFailed`] if the store reports a failure,
/// [`MediaError::Timeout`] once `policy.timeout` has passed, or any error
/// from the status call itself.
pub async fn wait_until_active(
    store: &dyn MediaStore,
    mut file: RemoteFile,
    policy: PollPolicy,
) -> Result<RemoteFile> {
    let started = Instant::now();
    let mut observations: u32 = 1;

    loop {
        match file.state {
            FileState::Active => {
                info!(
                    name = %file.name,
                    observations,
                    waited = ?started.elapsed(),
                    "remote file is active"
                );
                return Ok(file);
            }
            FileState::Failed => {
                let message = file
                    .error
                    .unwrap_or_else(|| "processing failed".to_owned());
                return Err(MediaError::remote_failed(file.name, message).into());
            }
            FileState::Processing => {}
        }

        let waited = started.elapsed();
        if waited >= policy.timeout {
            return Err(MediaError::Timeout {
                name: file.name,
                waited,
            }
            .into());
        }

        tokio::time::sleep(policy.interval).await;
        file = store.status(&file.name).await?;
        observations += 1;
        debug!(name = %file.name, state = %file.state, observations, "polled remote file");
    }
}

/// Upload `path` and wait until the store reports it active.
///
/// # Errors
///
/// Any upload error, plus the errors of [`wait_until_active`].
pub async fn register_and_wait(
    store: &dyn MediaStore,
    path: &Path,
    mime_type: &str,
    policy: PollPolicy,
) -> Result<RemoteFile> {
    let span = info_span!("register_media", path = %path.display(), mime_type);
    async {
        let file = store.upload(path, mime_type).await?;
        info!(name = %file.name, state = %file.state, "uploaded media");
        wait_until_active(store, file, policy).await
    }
    .instrument(span)
    .await
}
