//! Glance CLI
//!
//! Serves the analysis page, or answers a single question about a local file.

#![allow(clippy::print_stdout)] // CLI program intentionally uses stdout

use clap::{Args, Parser, Subcommand};
use glance::prelude::*;
use glance_app::config::{self, AppConfig, IssueLevel};
use glance_app::error::{AppError, Result};
use glance_app::server;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Glance - ask a multimodal agent about videos and images
#[derive(Parser)]
#[command(name = "glance")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = "GLANCE_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init(InitArgs),

    /// Start the web app
    Serve(ServeArgs),

    /// Ask one question about a local video or image
    Ask(AskArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for the init command
#[derive(Args)]
struct InitArgs {
    /// Force overwrite existing configuration
    #[arg(short, long)]
    force: bool,
}

/// Arguments for the serve command
#[derive(Args)]
struct ServeArgs {
    /// Bind address (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Model to use (overrides config)
    #[arg(short, long)]
    model: Option<String>,
}

/// Arguments for the ask command
#[derive(Args)]
struct AskArgs {
    /// Video (mp4, mov, avi) or image (jpg, jpeg, png, jfif) to analyze
    file: PathBuf,

    /// Question about the file
    prompt: String,

    /// Model to use (overrides config)
    #[arg(short, long)]
    model: Option<String>,
}

/// Arguments for the config command
#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Show configuration file path
    Path,
    /// Validate configuration
    Validate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");

    match rt.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging with the given verbosity level.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "glance_app={level},glance={level},tower_http={level},{}",
            if verbosity >= 2 { "debug" } else { "warn" }
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let path = cli.config.unwrap_or_else(config::config_path);
    match cli.command {
        Commands::Init(args) => cmd_init(args, &path).await,
        Commands::Serve(args) => cmd_serve(args, &path).await,
        Commands::Ask(args) => cmd_ask(args, &path).await,
        Commands::Config(args) => cmd_config(args, &path).await,
    }
}

/// Load config and refuse to continue on errors.
async fn load_checked(path: &Path) -> Result<AppConfig> {
    let config = config::load_config(Some(path)).await?;
    let issues = config.validate();
    for issue in &issues {
        match issue.level {
            IssueLevel::Error => tracing::error!("{issue}"),
            IssueLevel::Warning => tracing::warn!("{issue}"),
        }
    }
    if !config.is_valid() {
        return Err(AppError::invalid_config(format!(
            "{} error(s) in {}",
            issues
                .iter()
                .filter(|i| i.level == IssueLevel::Error)
                .count(),
            path.display()
        )));
    }
    Ok(config)
}

async fn cmd_init(args: InitArgs, path: &Path) -> Result<()> {
    if !config::init_config(path, args.force).await? {
        println!("Configuration already exists at: {}", path.display());
        println!("Use --force to overwrite.");
        return Ok(());
    }

    println!("Configuration created: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. export GEMINI_API_KEY=<key>");
    println!("  2. glance serve");

    Ok(())
}

async fn cmd_serve(args: ServeArgs, path: &Path) -> Result<()> {
    let mut config = load_checked(path).await?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(model) = args.model {
        config.gemini.model = model;
    }

    let analyzer = server::build_analyzer(&config)?;
    println!(
        "Open http://{} in your browser. Press Ctrl+C to stop.",
        config.server.bind_address()
    );

    server::serve(&config, analyzer, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        println!("\nShutting down...");
    })
    .await
}

async fn cmd_ask(args: AskArgs, path: &Path) -> Result<()> {
    let mut config = load_checked(path).await?;
    if let Some(model) = args.model {
        config.gemini.model = model;
    }
    let analyzer = server::build_analyzer(&config)?;

    let file_name = args
        .file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_owned();
    let kind = kind_for(&file_name);
    let bytes = tokio::fs::read(&args.file).await?;
    let media =
        UploadedMedia::new(kind, file_name, bytes).map_err(|e| AppError::Glance(e.into()))?;

    println!("{}", spinner_text(media.kind()));
    let analysis = match media.kind() {
        MediaKind::Video => analyzer.analyze(Some(media), None, &args.prompt).await,
        MediaKind::Image => analyzer.analyze(None, Some(media), &args.prompt).await,
    };

    match &analysis.status {
        AnalysisStatus::Answered(out) => {
            if let Some(heading) = analysis.heading() {
                println!("\n## {heading}\n");
            }
            println!("{}", out.content);
            Ok(())
        }
        AnalysisStatus::Warning { message } | AnalysisStatus::Info { message } => {
            println!("{message}");
            Ok(())
        }
        AnalysisStatus::Failed { message } => {
            Err(AppError::Glance(Error::agent(message.as_str())))
        }
    }
}

/// Video extensions go to the video flow; anything else is tried as an image.
fn kind_for(file_name: &str) -> MediaKind {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    if MediaKind::Video.accepts(extension) {
        MediaKind::Video
    } else {
        MediaKind::Image
    }
}

const fn spinner_text(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Video => "Processing video and researching...",
        MediaKind::Image => "AI is thinking... 🤖",
    }
}

async fn cmd_config(args: ConfigArgs, path: &Path) -> Result<()> {
    match args.command {
        ConfigCommands::Path => {
            println!("{}", path.display());
        }
        ConfigCommands::Show => {
            let mut config = config::load_config(Some(path)).await?;
            if config.gemini.api_key.is_some() {
                config.gemini.api_key = Some("********".into());
            }
            let rendered = toml::to_string_pretty(&config).map_err(config::ConfigError::from)?;
            println!("# {}", path.display());
            println!("{rendered}");
        }
        ConfigCommands::Validate => {
            let config = config::load_config(Some(path)).await?;
            let issues = config.validate();
            if issues.is_empty() {
                println!("Configuration is valid");
            }
            for issue in &issues {
                println!("{issue}");
            }
            if !config.is_valid() {
                return Err(AppError::invalid_config("validation failed"));
            }
        }
    }

    Ok(())
}
