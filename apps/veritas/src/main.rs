//! # Veritas - Claim Verification Server
//!
//! The main binary for Veritas.
//!
//! This application provides:
//! - HTTP API server (axum-based, with SSE progress)
//! - CLI interface for indexing, search and claim verification
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      apps/veritas (THE BINARY)                  │
//! │                                                                 │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐    │
//! │  │   CLI       │    │   HTTP API  │    │  Collaborators   │    │
//! │  │  (clap)     │    │   (axum)    │    │ (Ollama, Google) │    │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘    │
//! │         │                  │                    │              │
//! │         └──────────► claim pipeline ◄───────────┘              │
//! │                            ▼                                   │
//! │                    ┌───────────────┐                           │
//! │                    │ veritas-core  │                           │
//! │                    │ (THE LOGIC)   │                           │
//! │                    └───────────────┘                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! veritas server --host 0.0.0.0 --port 8000
//!
//! # CLI operations
//! veritas status
//! veritas index --strategy chunk_pool
//! veritas search "vacinas causam autismo" --method hybrid
//! veritas verify "Vacinas causam autismo" --mode fallback_hybrid
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use veritas::cli;

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // VERITAS_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("VERITAS_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "veritas=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Veritas startup banner.
fn print_banner() {
    println!(
        r#"
  ██╗   ██╗███████╗██████╗ ██╗████████╗ █████╗ ███████╗
  ██║   ██║██╔════╝██╔══██╗██║╚══██╔══╝██╔══██╗██╔════╝
  ██║   ██║█████╗  ██████╔╝██║   ██║   ███████║███████╗
  ╚██╗ ██╔╝██╔══╝  ██╔══██╗██║   ██║   ██╔══██║╚════██║
   ╚████╔╝ ███████╗██║  ██║██║   ██║   ██║  ██║███████║
    ╚═══╝  ╚══════╝╚═╝  ╚═╝╚═╝   ╚═╝   ╚═╝  ╚═╝╚══════╝

  Claim Verification Server v{}

  Questions • Evidence • Verdict
"#,
        env!("CARGO_PKG_VERSION")
    );
}
