use axum::Json;
use axum::extract::{Multipart, State};
use axum::response::Html;
use glance::prelude::*;
use serde_json::{Value, json};
use tracing::{Instrument as _, debug, info, info_span, warn};
use uuid::Uuid;

use super::AppState;
use crate::error::Result;
use crate::render::AnalysisView;

const INDEX_HTML: &str = include_str!("../../assets/index.html");

pub(super) async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub(super) async fn healthz(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model": state.analyzer().agent().resolved_model(),
    }))
}

/// A file field as received, before intake checks.
#[derive(Debug)]
struct RawUpload {
    file_name: String,
    bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct AnalyzeForm {
    video: Option<RawUpload>,
    image: Option<RawUpload>,
    prompt: String,
}

async fn read_form(multipart: &mut Multipart) -> Result<AnalyzeForm> {
    let mut form = AnalyzeForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "video" | "image" => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let bytes = field.bytes().await?;
                // Browsers send an empty part for an untouched file input.
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                let upload = Some(RawUpload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
                if name == "video" {
                    form.video = upload;
                } else {
                    form.image = upload;
                }
            }
            "prompt" => form.prompt = field.text().await?,
            other => debug!(field = other, "ignoring form field"),
        }
    }

    Ok(form)
}

/// Check an upload against the allowlist for `kind`.
///
/// A rejected upload is dropped and its warning pushed onto `rejected`, so
/// the other field can still be analyzed.
fn intake(
    kind: MediaKind,
    raw: Option<RawUpload>,
    rejected: &mut Vec<Analysis>,
) -> Option<UploadedMedia> {
    let raw = raw?;
    match UploadedMedia::new(kind, raw.file_name, raw.bytes) {
        Ok(media) => Some(media),
        Err(e) => {
            warn!(%kind, error = %e, "dropping rejected upload");
            rejected.push(Analysis {
                kind: Some(kind),
                preview: None,
                status: AnalysisStatus::Warning {
                    message: e.to_string(),
                },
            });
            None
        }
    }
}

pub(super) async fn analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisView>> {
    let request_id = Uuid::new_v4();
    let form = read_form(&mut multipart).await?;

    let span = info_span!("analyze", %request_id);
    let analysis = async move {
        info!(
            video = form.video.is_some(),
            image = form.image.is_some(),
            prompt_len = form.prompt.len(),
            "analysis requested"
        );
        let mut rejected = Vec::new();
        let video = intake(MediaKind::Video, form.video, &mut rejected);
        let image = intake(MediaKind::Image, form.image, &mut rejected);
        if video.is_none()
            && image.is_none()
            && let Some(warning) = rejected.into_iter().next()
        {
            return warning;
        }
        state.analyzer().analyze(video, image, &form.prompt).await
    }
    .instrument(span)
    .await;

    Ok(Json(AnalysisView::new(request_id, &analysis)))
}
