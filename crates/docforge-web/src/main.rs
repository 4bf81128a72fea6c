//! docforge web - HTTP server converting documents to PDF.

use anyhow::{Context, Result};
use clap::Parser;
use docforge_core::AppConfig;
use docforge_web::{AppState, router};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "docforge-web")]
#[command(author, version, about = "Document to PDF conversion server", long_about = None)]
struct Args {
    /// Configuration file (default: ~/.config/docforge/config.toml or ./config.toml)
    #[arg(short, long, env = "DOCFORGE_CONFIG")]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, env = "DOCFORGE_HOST")]
    host: Option<String>,

    /// Port to bind to
    #[arg(short, long, env = "DOCFORGE_PORT")]
    port: Option<u16>,

    /// Directory for staged files
    #[arg(long, env = "DOCFORGE_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Office suite executable
    #[arg(long, env = "DOCFORGE_OFFICE_BINARY")]
    office_binary: Option<String>,

    /// Office conversion timeout in seconds
    #[arg(long, env = "DOCFORGE_OFFICE_TIMEOUT")]
    office_timeout: Option<u64>,

    /// Whole-request timeout in seconds
    #[arg(long, env = "DOCFORGE_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.scratch_dir {
            config.scratch.dir.clone_from(dir);
        }
        if let Some(binary) = &self.office_binary {
            config.office.binary.clone_from(binary);
        }
        if let Some(secs) = self.office_timeout {
            config.office.timeout_secs = secs;
        }
        if let Some(secs) = self.request_timeout {
            config.server.request_timeout_secs = secs;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load(),
    };
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    let state = Arc::new(AppState::new(config));
    state
        .converter
        .scratch()
        .ensure()
        .await
        .context("Failed to create scratch directory")?;

    // Remove files left behind by crashed or killed conversions
    let sweep_secs = state.config.scratch.sweep_interval_secs;
    if sweep_secs > 0 {
        let sweep_state = Arc::clone(&state);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(sweep_secs));
            loop {
                interval.tick().await;
                sweep_state.sweep_scratch().await;
            }
        });
    }

    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port)
        .parse()
        .context("Invalid listen address")?;
    info!(
        "Starting server at http://{} (office backend: {}, scratch: {})",
        addr,
        state.converter.office_backend(),
        state.converter.scratch().root().display()
    );

    let app = router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
