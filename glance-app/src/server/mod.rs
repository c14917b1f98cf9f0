//! HTTP surface: the page, the analyze endpoint and a health check.

mod handlers;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use glance::prelude::*;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};

use crate::config::AppConfig;
use crate::error::{AppError, Result};

/// State shared by every request.
#[derive(Debug, Clone)]
pub struct AppState {
    analyzer: Arc<Analyzer>,
}

impl AppState {
    /// Wrap an analyzer.
    #[must_use]
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
        }
    }

    /// The shared analyzer.
    #[must_use]
    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }
}

/// Build the Gemini client, agent and analyzer described by `config`.
///
/// # Errors
///
/// Returns an error if no API key is configured or the client cannot be
/// created.
pub fn build_analyzer(config: &AppConfig) -> Result<Analyzer> {
    let client_config = config
        .gemini
        .client_config()
        .ok_or_else(|| AppError::invalid_config("no Gemini API key; set GEMINI_API_KEY"))?;
    let gemini = Arc::new(Gemini::new(client_config)?);

    let mut agent = Agent::new(&config.agent.name, Arc::clone(&gemini) as SharedChatProvider)
        .model(&config.gemini.model)
        .markdown(config.agent.markdown)
        .max_steps(config.agent.max_steps);
    if let Some(instructions) = &config.agent.instructions {
        agent = agent.instructions(instructions);
    }
    if config.search.enabled {
        let mut search = WebSearchTool::new().with_max_results(config.search.max_results);
        if let Some(url) = &config.search.base_url {
            search = search.with_base_url(url);
        }
        agent = agent.tool(search);
    }
    info!(
        agent = %agent.name,
        model = %config.gemini.model,
        tools = agent.tools().len(),
        "agent ready"
    );

    Ok(
        Analyzer::new(Arc::new(agent), gemini).with_config(AnalysisConfig {
            bounds: config.media.bounds(),
            poll: config.media.poll_policy(),
            scratch_dir: None,
        }),
    )
}

/// Build the router.
pub fn router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/healthz", get(handlers::healthz))
        .route(
            "/api/analyze",
            post(handlers::analyze).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Serve until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve<F>(config: &AppConfig, analyzer: Analyzer, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_addr = config.server.bind_address();
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("glance listening on http://{}", listener.local_addr()?);

    let app = router(AppState::new(analyzer), config.server.body_limit());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("server stopped");
    Ok(())
}
