//! Serve command implementation.

use anyhow::{Context, Result};
use hashdrop_core::config::Config;
use hashdrop_core::web::{WebServer, WebServerConfig};
use tokio::signal;

use super::ServeArgs;

/// Apply command-line overrides on top of the loaded configuration.
fn apply_overrides(config: &mut Config, args: ServeArgs) {
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(dir) = args.upload_dir {
        config.server.upload_dir = dir;
    }
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(agent) = args.agent {
        config.tunnel.api_url = agent;
    }
}

/// Run the serve command.
pub async fn run(args: ServeArgs) -> Result<()> {
    let mut config = super::load_config();
    apply_overrides(&mut config, args);
    config.validate().context("Invalid configuration")?;

    let server_config = WebServerConfig::from_config(&config)?;
    let port = server_config.port;

    println!();
    println!("Hashdrop v{}", hashdrop_core::VERSION);
    println!("{}", "─".repeat(40));
    println!();
    println!("  Local:    http://localhost:{}", port);
    println!("  Uploads:  {}", server_config.upload_dir.display());
    println!("  Tunnel:   run `ngrok http {}` for public links", port);
    println!();
    println!("Press Ctrl+C to stop the server.");

    WebServer::new(server_config)
        .run(shutdown_signal())
        .await
        .context("Server failed")?;

    println!();
    println!("Server stopped.");

    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
