//! # Taxoscope - Lazy Taxonomy Graph Server
//!
//! The main binary for the Taxoscope taxonomy explorer.
//!
//! This application provides:
//! - HTTP REST API server (axum-based) with a live session event stream
//! - CLI interface for one-off lookups and headless exploration
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   apps/taxoscope (THE BINARY)                   │
//! │                                                                 │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐     │
//! │  │   CLI       │    │   HTTP API  │    │  Session Driver  │     │
//! │  │  (clap)     │    │   (axum)    │    │  (tokio task)    │     │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘     │
//! │         │                  │                    │               │
//! │         └──────────────────┼────────────────────┘               │
//! │                            ▼                                    │
//! │       ┌────────────────┐       ┌─────────────────────────┐      │
//! │       │ taxoscope-core │       │ Store (ArangoDB/fixture)│      │
//! │       │  (THE ENGINE)  │       │       (reqwest)         │      │
//! │       └────────────────┘       └─────────────────────────┘      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server against ArangoDB
//! taxoscope --config taxoscope.toml serve --port 8080
//!
//! # Offline demo against a JSON fixture
//! taxoscope --fixture fixtures/animalia.json explore --depth 3
//!
//! # One-off lookups
//! taxoscope root
//! taxoscope children phylum 1734
//! ```

use clap::Parser;
use taxoscope::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // TAXOSCOPE_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("TAXOSCOPE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taxoscope=info,tower_http=debug".into());

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

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Taxoscope startup banner.
fn print_banner() {
    println!(
        r#"
  ▀█▀ ▄▀█ ▀▄▀ █▀█ █▀ █▀▀ █▀█ █▀█ █▀▀
   █  █▀█ █ █ █▄█ ▄█ █▄▄ █▄█ █▀▀ ██▄

  Lazy Taxonomy Graph v{}

  Kingdom → Phylum → Class → Order → Family → Genus → Species
"#,
        env!("CARGO_PKG_VERSION")
    );
}
