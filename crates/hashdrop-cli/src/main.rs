//! Hashdrop CLI - upload a file, share a link
//!
//! Hashdrop serves a small web page where files can be uploaded. Every file
//! gets a link derived from its SHA-256, and the links follow a local ngrok
//! agent's public URL whenever one is running.
//!
//! ## Quick Start
//!
//! ```bash
//! # Serve on port 5000
//! hashdrop serve
//!
//! # Make links public (separate terminal)
//! ngrok http 5000
//! ```

#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

use anyhow::Result;
use clap::Parser;

mod commands;

use commands::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => commands::serve::run(args).await,
        Command::Probe(args) => commands::probe::run(args).await,
        Command::Config(args) => commands::config::run(args),
        Command::Completions(args) => {
            commands::completions::run(args.shell);
            Ok(())
        }
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("warn,hashdrop=info,hashdrop_core=info,tower_http=info")
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
