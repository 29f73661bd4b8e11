//! HTML to PDF conversion service.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                  HTML2PDF SERVICE                      │
//!                     │                                                        │
//!  POST /upload       │  ┌─────────┐   ┌──────────┐   ┌──────────────────┐    │
//!  ───────────────────┼─▶│  http   │──▶│ storage  │──▶│  render pool     │    │
//!                     │  │ upload  │   │ (upload) │   │  → chromium      │    │
//!                     │  └────┬────┘   └──────────┘   └────────┬─────────┘    │
//!                     │       │                                │              │
//!  { pdfFile }        │       ▼                                ▼              │
//!  ◀──────────────────┼── response ◀────────────────── storage (output)       │
//!                     │                                                        │
//!  GET /uploads/{f}   │  ┌──────────────────────┐   ┌──────────────────────┐  │
//!  ───────────────────┼─▶│ ServeDir (uploads/)  │   │ reaper (retained     │  │
//!                     │  └──────────────────────┘   │ failed inputs)       │  │
//!                     │                             └──────────────────────┘  │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use html2pdf_service::config::load_or_default;
use html2pdf_service::lifecycle::{wait_for_signal, Shutdown};
use html2pdf_service::observability::{logging, metrics};
use html2pdf_service::HttpServer;

#[derive(Parser)]
#[command(name = "html2pdf-service")]
#[command(about = "Convert uploaded HTML documents to PDF", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_or_default(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);

    tracing::info!("html2pdf-service v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        storage = %config.storage.directory.display(),
        max_concurrent_renders = config.renderer.max_concurrent,
        render_timeout_secs = config.renderer.render_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    HttpServer::new(config).run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
