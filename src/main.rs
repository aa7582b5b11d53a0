use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sliderule::{FileServer, ServerConfig};

/// Serve a directory of static files over HTTP.
#[derive(Debug, Parser)]
#[command(name = "sliderule", version, about)]
struct Args {
    /// Directory to serve.
    directory: PathBuf,

    /// Port to listen on.
    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    /// Host to bind to.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Disable conditional caching; every response carries full content.
    #[arg(long = "nocache")]
    no_cache: bool,

    /// Comma-separated list of origins allowed to read responses.
    /// `*` allows every origin.
    #[arg(long = "cors-allow-origin", value_delimiter = ',', default_value = "*")]
    cors_allow_origin: Vec<String>,

    /// Render an HTML listing when a directory is requested.
    #[arg(long)]
    listing: bool,

    /// Also log individual incoming requests.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_directives = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directives.into()),
        )
        .init();

    let origins = args
        .cors_allow_origin
        .iter()
        .map(|origin| origin.trim().to_owned())
        .filter(|origin| !origin.is_empty())
        .collect();

    let config = ServerConfig::new(args.directory)
        .with_host(args.host)
        .with_port(args.port)
        .with_listing(args.listing)
        .with_no_cache(args.no_cache)
        .with_allowed_origins(origins);

    if let Err(err) = FileServer::new(config).run(shutdown_signal()).await {
        error!(error = %err, "server failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Resolves when the process receives SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(_) => {
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }

    info!("shutdown signal received, draining connections");
}
