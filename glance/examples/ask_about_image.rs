//! Ask the agent a question about a local image.
//!
//! # Running
//!
//! ```bash
//! export GEMINI_API_KEY=your_key_here
//! cargo run --example ask_about_image -- photo.jpg "What is in this picture?"
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::sync::Arc;

use glance::prelude::*;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let (Some(path), Some(question)) = (args.next(), args.next()) else {
        eprintln!("usage: ask_about_image <image> <question>");
        std::process::exit(2);
    };

    let gemini = Arc::new(Gemini::from_env()?);
    let agent = Agent::new("Multimodal Analyst", Arc::clone(&gemini) as SharedChatProvider)
        .markdown(true)
        .tool(WebSearchTool::new());
    let analyzer = Analyzer::new(Arc::new(agent), gemini);

    let bytes = tokio::fs::read(&path).await?;
    let image = UploadedMedia::image(path, bytes)?;
    let analysis = analyzer.analyze(None, Some(image), &question).await;

    match &analysis.status {
        AnalysisStatus::Answered(out) => {
            println!("{}", out.content);
            println!("---");
            println!(
                "steps: {}, tokens: {}, tools: {:?}",
                out.steps,
                out.usage.total_tokens,
                out.tool_calls.iter().map(|c| &c.name).collect::<Vec<_>>()
            );
        }
        AnalysisStatus::Warning { message }
        | AnalysisStatus::Failed { message }
        | AnalysisStatus::Info { message } => eprintln!("{message}"),
    }

    Ok(())
}
