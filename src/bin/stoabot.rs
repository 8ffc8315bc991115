//! `stoabot` binary.
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Log filter (default: `warn,stoabot=info`)
//! - Everything read by [`stoabot::utilities::config::AppConfig`]; a `.env`
//!   file in the working directory is loaded first.
//!
//! # Usage
//!
//! ```bash
//! stoabot post-fact --subject chess --dry-run
//! stoabot ingest --path quotes.txt --fetch 5
//! stoabot health
//! ```

use clap::Parser;
use stoabot::cli::{self, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries post text and status lines.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,stoabot=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("stoabot {}", stoabot::VERSION);
    cli::run(cli).await?;
    Ok(())
}
