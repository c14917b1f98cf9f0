//! One interaction: uploaded media plus a question in, a rendered outcome out.
//!
//! [`Analyzer`] is constructed once at startup with a shared [`Agent`] and a
//! [`MediaStore`] and is then used by every request. Each call returns an
//! [`Analysis`] rather than an error: every failure is scoped to the request
//! and turned into a user-facing message.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{Instrument as _, info, info_span, warn};

use crate::agent::{Agent, MediaRef, RunOutput};
use crate::error::{Error, Result};
use crate::media::{
    Bounds, MediaKind, NormalizedImage, PollPolicy, SharedMediaStore, UploadedMedia,
    normalize_image, register_and_wait, with_temp_asset,
};

/// Shown when neither a video nor an image was submitted.
pub const NO_MEDIA_MESSAGE: &str = "Please upload a video or image to begin analysis.";
/// Shown when the question is empty.
pub const EMPTY_PROMPT_MESSAGE: &str = "Please enter your question.";

/// Wrap a question about a video in the research prompt.
#[must_use]
pub fn video_prompt(question: &str) -> String {
    format!(
        "First analyze this video and then answer the following question using both \
         the video analysis and web research: {question}\n\n\
         Provide a comprehensive response focusing on practical, actionable information."
    )
}

/// Tunables for the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Image thumbnail bounds.
    pub bounds: Bounds,
    /// Remote readiness polling.
    pub poll: PollPolicy,
    /// Directory for temporary files; the OS temp dir when `None`.
    pub scratch_dir: Option<PathBuf>,
}

/// Outcome of an interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// The agent answered.
    Answered(RunOutput),
    /// Input needs attention; nothing was sent to the agent.
    Warning {
        /// Message for the user.
        message: String,
    },
    /// The request failed.
    Failed {
        /// Message for the user.
        message: String,
    },
    /// Nothing to do yet.
    Info {
        /// Message for the user.
        message: String,
    },
}

impl AnalysisStatus {
    fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Returns `true` if the agent produced an answer.
    #[must_use]
    pub const fn is_answered(&self) -> bool {
        matches!(self, Self::Answered(_))
    }
}

/// Everything the page needs to render one interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Which flow handled the request.
    pub kind: Option<MediaKind>,
    /// Normalized thumbnail, for images that decoded.
    pub preview: Option<NormalizedImage>,
    /// Result or message.
    pub status: AnalysisStatus,
}

impl Analysis {
    fn new(kind: Option<MediaKind>, status: AnalysisStatus) -> Self {
        Self {
            kind,
            preview: None,
            status,
        }
    }

    /// Answer text, if the agent answered.
    #[must_use]
    pub fn answer(&self) -> Option<&str> {
        match &self.status {
            AnalysisStatus::Answered(out) => Some(&out.content),
            _ => None,
        }
    }

    /// Heading shown above the answer.
    #[must_use]
    pub fn heading(&self) -> Option<&'static str> {
        self.kind
            .filter(|_| self.status.is_answered())
            .map(MediaKind::result_heading)
    }
}

/// Runs the video and image flows against a shared agent.
#[derive(Clone)]
pub struct Analyzer {
    agent: Arc<Agent>,
    store: SharedMediaStore,
    config: AnalysisConfig,
}

impl fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer")
            .field("agent", &self.agent)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Analyzer {
    /// Create an analyzer with default settings.
    #[must_use]
    pub fn new(agent: Arc<Agent>, store: SharedMediaStore) -> Self {
        Self {
            agent,
            store,
            config: AnalysisConfig::default(),
        }
    }

    /// Replace the settings.
    #[must_use]
    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// The shared agent.
    #[must_use]
    pub const fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    /// Current settings.
    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Route a submission: a video wins over an image, nothing yields a hint.
    pub async fn analyze(
        &self,
        video: Option<UploadedMedia>,
        image: Option<UploadedMedia>,
        prompt: &str,
    ) -> Analysis {
        match (video, image) {
            (Some(video), _) => self.analyze_video(video, prompt).await,
            (None, Some(image)) => self.analyze_image(image, prompt).await,
            (None, None) => Analysis::new(None, AnalysisStatus::Info {
                message: NO_MEDIA_MESSAGE.to_owned(),
            }),
        }
    }

    /// Register a video remotely and ask the agent about it.
    pub async fn analyze_video(&self, video: UploadedMedia, prompt: &str) -> Analysis {
        let kind = Some(MediaKind::Video);
        if prompt.trim().is_empty() {
            return Analysis::new(kind, AnalysisStatus::warning(EMPTY_PROMPT_MESSAGE));
        }

        let span = info_span!("analysis", kind = "video", file = %video.file_name(), len = video.len());
        let status = match self.run_video(video, prompt).instrument(span).await {
            Ok(out) => AnalysisStatus::Answered(out),
            Err(e) => {
                warn!(error = %e, "video analysis failed");
                AnalysisStatus::failed(format!("An error occurred: {e}"))
            }
        };
        Analysis::new(kind, status)
    }

    async fn run_video(&self, video: UploadedMedia, prompt: &str) -> Result<RunOutput> {
        let mime_type = video.mime_type();
        let store = self.store.as_ref();
        let agent = self.agent.as_ref();
        let poll = self.config.poll;
        let prompt = video_prompt(prompt);

        with_temp_asset(
            self.config.scratch_dir.as_deref(),
            MediaKind::Video.temp_suffix(),
            video.bytes(),
            |path| async move {
                let file = register_and_wait(store, &path, &mime_type, poll).await?;
                info!(name = %file.name, "video ready, invoking agent");
                agent.run(&prompt, MediaRef::video(file)).await
            },
        )
        .await
    }

    /// Normalize an image, then ask the agent about it.
    ///
    /// The thumbnail is returned even when the question is missing.
    pub async fn analyze_image(&self, image: UploadedMedia, prompt: &str) -> Analysis {
        let kind = Some(MediaKind::Image);
        let span = info_span!("analysis", kind = "image", file = %image.file_name(), len = image.len());

        async {
            let normalized = match self.normalize(image).await {
                Ok(normalized) => normalized,
                Err(e) => {
                    warn!(error = %e, "image normalization failed");
                    return Analysis::new(
                        kind,
                        AnalysisStatus::failed(format!(
                            "An error occurred while processing the image: {e}"
                        )),
                    );
                }
            };
            info!(width = normalized.width, height = normalized.height, "image normalized");

            let status = if prompt.trim().is_empty() {
                AnalysisStatus::warning(EMPTY_PROMPT_MESSAGE)
            } else {
                match self.run_image(&normalized, prompt).await {
                    Ok(out) => AnalysisStatus::Answered(out),
                    Err(e) => {
                        warn!(error = %e, "image analysis failed");
                        AnalysisStatus::failed(format!("An error occurred during analysis: {e}"))
                    }
                }
            };

            Analysis {
                kind,
                preview: Some(normalized),
                status,
            }
        }
        .instrument(span)
        .await
    }

    async fn normalize(&self, image: UploadedMedia) -> Result<NormalizedImage> {
        let bounds = self.config.bounds;
        let extension = image.extension().to_owned();
        let bytes = image.into_bytes();
        tokio::task::spawn_blocking(move || normalize_image(&bytes, &extension, bounds))
            .await
            .map_err(|e| Error::agent(format!("Image worker failed: {e}")))?
            .map_err(Error::from)
    }

    async fn run_image(&self, image: &NormalizedImage, prompt: &str) -> Result<RunOutput> {
        let agent = self.agent.as_ref();
        with_temp_asset(
            self.config.scratch_dir.as_deref(),
            MediaKind::Image.temp_suffix(),
            &image.jpeg,
            |path| async move { agent.run(prompt, MediaRef::images([path])).await },
        )
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use tokio::time::Instant;

    use super::*;
    use crate::chat::{ChatProvider, ChatRequest, ChatResponse};
    use crate::media::{FileState, MediaStore, RemoteFile};
    use crate::message::ContentPart;

    /// Provider that records requests and answers from a script.
    #[derive(Default)]
    struct FakeProvider {
        answers: Mutex<VecDeque<Result<ChatResponse>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl FakeProvider {
        fn answering(text: &str) -> Arc<Self> {
            let provider = Self::default();
            provider
                .answers
                .lock()
                .unwrap()
                .push_back(Ok(ChatResponse::from_text(text)));
            Arc::new(provider)
        }

        fn failing(message: &str) -> Arc<Self> {
            let provider = Self::default();
            provider
                .answers
                .lock()
                .unwrap()
                .push_back(Err(Error::agent(message)));
            Arc::new(provider)
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn last_user_parts(&self) -> Vec<ContentPart> {
            let requests = self.requests.lock().unwrap();
            requests[0].messages.last().unwrap().parts.clone()
        }
    }

    #[async_trait]
    impl ChatProvider for FakeProvider {
        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
            self.requests.lock().unwrap().push(request.clone());
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::agent("no scripted answer")))
        }

        fn provider_name(&self) -> &'static str {
            "fake"
        }

        fn default_model(&self) -> &str {
            "fake-model"
        }

        fn supports_vision(&self) -> bool {
            true
        }
    }

    /// Store that checks the temp file and replays states.
    struct FakeStore {
        upload_state: FileState,
        statuses: Mutex<VecDeque<FileState>>,
        uploads: Mutex<Vec<(PathBuf, bool, String)>>,
        status_calls: Mutex<Vec<Instant>>,
    }

    impl FakeStore {
        fn new(upload_state: FileState, statuses: &[FileState]) -> Arc<Self> {
            Arc::new(Self {
                upload_state,
                statuses: Mutex::new(statuses.iter().copied().collect()),
                uploads: Mutex::new(Vec::new()),
                status_calls: Mutex::new(Vec::new()),
            })
        }

        fn uploads(&self) -> Vec<(PathBuf, bool, String)> {
            self.uploads.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MediaStore for FakeStore {
        async fn upload(&self, path: &Path, mime_type: &str) -> Result<RemoteFile> {
            self.uploads
                .lock()
                .unwrap()
                .push((path.to_path_buf(), path.exists(), mime_type.to_owned()));
            Ok(RemoteFile::new("files/vid", "https://files/vid", mime_type, self.upload_state))
        }

        async fn status(&self, name: &str) -> Result<RemoteFile> {
            self.status_calls.lock().unwrap().push(Instant::now());
            let state = self
                .statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(FileState::Processing);
            let mut file = RemoteFile::new(name, "https://files/vid", "video/mp4", state);
            if state == FileState::Failed {
                file.error = Some("corrupt container".into());
            }
            Ok(file)
        }
    }

    fn analyzer(
        provider: Arc<FakeProvider>,
        store: Arc<FakeStore>,
        scratch: &Path,
    ) -> Analyzer {
        let agent = Agent::new("Multimodal Analyst", provider).markdown(true);
        Analyzer::new(Arc::new(agent), store).with_config(AnalysisConfig {
            scratch_dir: Some(scratch.to_path_buf()),
            ..AnalysisConfig::default()
        })
    }

    fn scratch_entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    mod video_flow {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn polls_until_active_then_answers() {
            let scratch = tempfile::tempdir().unwrap();
            let provider = FakeProvider::answering("Wear a helmet.");
            let store = FakeStore::new(
                FileState::Processing,
                &[FileState::Processing, FileState::Active],
            );
            let analyzer = analyzer(provider.clone(), store.clone(), scratch.path());
            let video = UploadedMedia::video("ride.mov", b"moov".to_vec()).unwrap();

            let started = Instant::now();
            let analysis = analyzer.analyze_video(video, "Is this safe?").await;

            assert_eq!(analysis.answer(), Some("Wear a helmet."));
            assert_eq!(analysis.heading(), Some("Result"));
            assert_eq!(store.status_calls.lock().unwrap().len(), 2);
            assert!(started.elapsed() >= Duration::from_secs(4));

            let uploads = store.uploads();
            assert_eq!(uploads.len(), 1);
            let (path, existed, mime) = &uploads[0];
            assert!(*existed);
            assert!(path.starts_with(scratch.path()));
            assert!(path.to_string_lossy().ends_with(".mp4"));
            assert_eq!(mime, "video/mov");
            assert_eq!(scratch_entries(scratch.path()), 0);

            let parts = provider.last_user_parts();
            assert_eq!(parts[0], ContentPart::file("video/mp4", "https://files/vid"));
            let text = parts[1].as_text().unwrap();
            assert!(text.starts_with("First analyze this video"));
            assert!(text.contains("Is this safe?"));
        }

        #[tokio::test]
        async fn empty_prompt_warns_without_remote_calls() {
            let scratch = tempfile::tempdir().unwrap();
            let provider = FakeProvider::answering("unused");
            let store = FakeStore::new(FileState::Active, &[]);
            let analyzer = analyzer(provider.clone(), store.clone(), scratch.path());
            let video = UploadedMedia::video("a.mp4", b"x".to_vec()).unwrap();

            let analysis = analyzer.analyze_video(video, "   ").await;

            assert_eq!(
                analysis.status,
                AnalysisStatus::Warning {
                    message: EMPTY_PROMPT_MESSAGE.into()
                }
            );
            assert_eq!(provider.calls(), 0);
            assert!(store.uploads().is_empty());
            assert_eq!(scratch_entries(scratch.path()), 0);
        }

        #[tokio::test]
        async fn agent_failure_is_reported_and_cleaned_up() {
            let scratch = tempfile::tempdir().unwrap();
            let provider = FakeProvider::failing("model unavailable");
            let store = FakeStore::new(FileState::Active, &[]);
            let analyzer = analyzer(provider, store.clone(), scratch.path());
            let video = UploadedMedia::video("a.mp4", b"x".to_vec()).unwrap();

            let analysis = analyzer.analyze_video(video, "what?").await;

            let AnalysisStatus::Failed { message } = &analysis.status else {
                panic!("expected failure, got {:?}", analysis.status);
            };
            assert!(message.starts_with("An error occurred: "));
            assert!(message.contains("model unavailable"));
            assert!(analysis.heading().is_none());
            assert_eq!(store.uploads().len(), 1);
            assert_eq!(scratch_entries(scratch.path()), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn remote_failure_skips_agent() {
            let scratch = tempfile::tempdir().unwrap();
            let provider = FakeProvider::answering("unused");
            let store = FakeStore::new(FileState::Processing, &[FileState::Failed]);
            let analyzer = analyzer(provider.clone(), store, scratch.path());
            let video = UploadedMedia::video("a.avi", b"x".to_vec()).unwrap();

            let analysis = analyzer.analyze_video(video, "what?").await;

            let AnalysisStatus::Failed { message } = &analysis.status else {
                panic!("expected failure");
            };
            assert!(message.contains("corrupt container"));
            assert_eq!(provider.calls(), 0);
            assert_eq!(scratch_entries(scratch.path()), 0);
        }
    }

    mod image_flow {
        use super::*;

        #[tokio::test]
        async fn normalizes_and_answers() {
            let scratch = tempfile::tempdir().unwrap();
            let provider = FakeProvider::answering("A black square.");
            let store = FakeStore::new(FileState::Active, &[]);
            let analyzer = analyzer(provider.clone(), store.clone(), scratch.path());
            let image = UploadedMedia::image("big.png", png(1000, 1000)).unwrap();

            let analysis = analyzer.analyze_image(image, "What is this?").await;

            assert_eq!(analysis.answer(), Some("A black square."));
            assert_eq!(analysis.heading(), Some("AI Response"));
            let preview = analysis.preview.as_ref().unwrap();
            assert_eq!((preview.width, preview.height), (300, 300));
            assert!(store.uploads().is_empty());
            assert_eq!(scratch_entries(scratch.path()), 0);

            let parts = provider.last_user_parts();
            assert_eq!(
                parts[0],
                ContentPart::inline_bytes("image/jpeg", &preview.jpeg)
            );
            assert_eq!(parts[1].as_text(), Some("What is this?"));
        }

        #[tokio::test]
        async fn empty_task_keeps_preview_and_skips_agent() {
            let scratch = tempfile::tempdir().unwrap();
            let provider = FakeProvider::answering("unused");
            let analyzer = analyzer(
                provider.clone(),
                FakeStore::new(FileState::Active, &[]),
                scratch.path(),
            );
            let image = UploadedMedia::image("a.jpg", png(20, 10)).unwrap();

            let analysis = analyzer.analyze_image(image, "").await;

            assert!(analysis.preview.is_some());
            assert!(matches!(analysis.status, AnalysisStatus::Warning { .. }));
            assert_eq!(provider.calls(), 0);
            assert_eq!(scratch_entries(scratch.path()), 0);
        }

        #[tokio::test]
        async fn undecodable_image_is_reported() {
            let scratch = tempfile::tempdir().unwrap();
            let provider = FakeProvider::answering("unused");
            let analyzer = analyzer(
                provider.clone(),
                FakeStore::new(FileState::Active, &[]),
                scratch.path(),
            );
            let image = UploadedMedia::image("a.jfif", b"not a jpeg".to_vec()).unwrap();

            let analysis = analyzer.analyze_image(image, "what?").await;

            let AnalysisStatus::Failed { message } = &analysis.status else {
                panic!("expected failure");
            };
            assert!(message.starts_with("An error occurred while processing the image: "));
            assert!(analysis.preview.is_none());
            assert_eq!(provider.calls(), 0);
        }

        #[tokio::test]
        async fn agent_failure_is_reported_and_cleaned_up() {
            let scratch = tempfile::tempdir().unwrap();
            let analyzer = analyzer(
                FakeProvider::failing("quota exceeded"),
                FakeStore::new(FileState::Active, &[]),
                scratch.path(),
            );
            let image = UploadedMedia::image("a.png", png(10, 10)).unwrap();

            let analysis = analyzer.analyze_image(image, "what?").await;

            let AnalysisStatus::Failed { message } = &analysis.status else {
                panic!("expected failure");
            };
            assert!(message.starts_with("An error occurred during analysis: "));
            assert!(message.contains("quota exceeded"));
            assert!(analysis.preview.is_some());
            assert_eq!(scratch_entries(scratch.path()), 0);
        }
    }

    mod routing {
        use super::*;

        #[tokio::test]
        async fn nothing_uploaded_is_info() {
            let scratch = tempfile::tempdir().unwrap();
            let analyzer = analyzer(
                FakeProvider::answering("unused"),
                FakeStore::new(FileState::Active, &[]),
                scratch.path(),
            );
            let analysis = analyzer.analyze(None, None, "hello").await;
            assert_eq!(
                analysis.status,
                AnalysisStatus::Info {
                    message: NO_MEDIA_MESSAGE.into()
                }
            );
            assert!(analysis.kind.is_none());
        }

        #[tokio::test]
        async fn video_takes_precedence_over_image() {
            let scratch = tempfile::tempdir().unwrap();
            let store = FakeStore::new(FileState::Active, &[]);
            let analyzer = analyzer(
                FakeProvider::answering("ok"),
                store.clone(),
                scratch.path(),
            );
            let video = UploadedMedia::video("a.mp4", b"v".to_vec()).unwrap();
            let image = UploadedMedia::image("a.png", png(4, 4)).unwrap();

            let analysis = analyzer.analyze(Some(video), Some(image), "what?").await;

            assert_eq!(analysis.kind, Some(MediaKind::Video));
            assert!(analysis.preview.is_none());
            assert_eq!(store.uploads().len(), 1);
        }
    }

    #[test]
    fn video_prompt_wraps_question() {
        let prompt = video_prompt("How do I fix it?");
        assert!(prompt.contains("using both the video analysis and web research: How do I fix it?"));
        assert!(prompt.ends_with("practical, actionable information."));
    }

    #[test]
    fn status_serializes_with_tag() {
        let json = serde_json::to_value(AnalysisStatus::warning("x")).unwrap();
        assert_eq!(json["status"], "warning");
        assert_eq!(json["message"], "x");
    }
}
