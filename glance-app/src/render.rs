//! Turning an [`Analysis`] into what the page shows.

use glance::analysis::{Analysis, AnalysisStatus};
use glance::media::MediaKind;
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};
use serde::Serialize;
use uuid::Uuid;

/// Schemes a rendered link or image may point at.
const ALLOWED_SCHEMES: [&str; 3] = ["http://", "https://", "mailto:"];

fn is_allowed_url(url: &str) -> bool {
    let url = url.trim_start().to_ascii_lowercase();
    ALLOWED_SCHEMES.iter().any(|scheme| url.starts_with(scheme))
}

/// Render markdown to HTML.
///
/// Raw HTML in the model output is escaped rather than passed through, and
/// link and image targets outside [`ALLOWED_SCHEMES`] are emptied.
#[must_use]
pub fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES;
    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) if !is_allowed_url(&dest_url) => Event::Start(Tag::Link {
            link_type,
            dest_url: CowStr::Borrowed(""),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) if !is_allowed_url(&dest_url) => Event::Start(Tag::Image {
            link_type,
            dest_url: CowStr::Borrowed(""),
            title,
            id,
        }),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Banner severity, mirrored by CSS classes on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    /// The agent answered.
    Answered,
    /// Input needs attention.
    Warning,
    /// The request failed.
    Error,
    /// Nothing to do yet.
    Info,
}

/// Thumbnail shown next to the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    /// `data:` URL of the JPEG thumbnail.
    pub src: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// JSON body returned by `POST /api/analyze`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisView {
    /// Id attached to the request's log span.
    pub request_id: Uuid,
    /// `video`, `image`, or absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    /// Outcome class.
    pub level: Level,
    /// Heading above the answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<&'static str>,
    /// Banner text for non-answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Answer as markdown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    /// Answer rendered to HTML.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Image thumbnail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<Preview>,
    /// Names of the tools the agent used.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools_used: Vec<String>,
}

impl AnalysisView {
    /// Build the view for an analysis.
    #[must_use]
    pub fn new(request_id: Uuid, analysis: &Analysis) -> Self {
        let mut view = Self {
            request_id,
            kind: analysis.kind.map(MediaKind::as_str),
            level: Level::Info,
            heading: analysis.heading(),
            message: None,
            markdown: None,
            html: None,
            preview: analysis.preview.as_ref().map(|p| Preview {
                src: p.data_url(),
                width: p.width,
                height: p.height,
            }),
            tools_used: Vec::new(),
        };

        match &analysis.status {
            AnalysisStatus::Answered(out) => {
                view.level = Level::Answered;
                view.html = Some(markdown_to_html(&out.content));
                view.markdown = Some(out.content.clone());
                view.tools_used = out.tool_calls.iter().map(|c| c.name.clone()).collect();
            }
            AnalysisStatus::Warning { message } => {
                view.level = Level::Warning;
                view.message = Some(message.clone());
            }
            AnalysisStatus::Failed { message } => {
                view.level = Level::Error;
                view.message = Some(message.clone());
            }
            AnalysisStatus::Info { message } => {
                view.message = Some(message.clone());
            }
        }
        view
    }
}
