mod config;
mod errors;
mod i18n;
mod models;
mod render;
mod routes;
mod state;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::models::resume::Resume;
use crate::render::Renderer;
use crate::routes::build_router;
use crate::state::{Access, AppState};

#[derive(Debug, Parser)]
#[command(name = "vitae", version, about = "Render JSON Resume documents to localized HTML")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API (default).
    Serve,
    /// Render a single resume and exit.
    Render {
        /// Resume JSON file, or `-` for stdin.
        #[arg(short, long, default_value = "-")]
        input: String,
        /// Output HTML file. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging. Logs go to stderr so `render` can write HTML to stdout.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(AppState::build(config, Access::Api)?).await,
        Command::Render { input, output } => {
            let state = AppState::build(config, Access::Local)?;
            render_once(&state.renderer, &input, output).await
        }
    }
}

async fn serve(state: AppState) -> Result<()> {
    info!("Starting Vitae API v{}", env!("CARGO_PKG_VERSION"));

    let port = state.config.port;
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn render_once(renderer: &Renderer, input: &str, output: Option<PathBuf>) -> Result<()> {
    let raw = if input == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("Failed to read resume from stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read resume from {input}"))?
    };

    let resume: Resume = serde_json::from_str(&raw).context("Invalid resume document")?;
    let html = renderer
        .render(resume)
        .await
        .map_err(|e| anyhow::anyhow!(e.detail()))?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, html.as_bytes())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(html.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}
