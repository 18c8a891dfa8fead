//! Probe command implementation.
//!
//! Runs one discovery round against the tunnel agent and reports which
//! tunnel, if any, would be used for share links.

use anyhow::Result;
use hashdrop_core::tunnel::{EndpointResolver, EndpointState, Tunnel};

use super::ProbeArgs;

/// Run the probe command.
pub async fn run(args: ProbeArgs) -> Result<()> {
    let mut config = super::load_config();
    if let Some(agent) = args.agent {
        config.tunnel.api_url = agent;
    }
    let port = args.port.unwrap_or(config.server.port);

    let resolver = EndpointResolver::new(port, &config.tunnel);
    let agent_url = resolver.agent().tunnels_url();

    match resolver.agent().tunnels().await {
        Ok(tunnels) => {
            let state = resolver.apply(&tunnels).await;
            if args.json {
                let output = serde_json::json!({
                    "agentReachable": true,
                    "agentUrl": agent_url,
                    "port": port,
                    "tunnels": tunnels,
                    "endpoint": state,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_report(&agent_url, port, &tunnels, &state);
            }
        }
        Err(e) => {
            if args.json {
                let output = serde_json::json!({
                    "agentReachable": false,
                    "agentUrl": agent_url,
                    "port": port,
                    "error": e.to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!();
                println!("Tunnel agent at {} is not reachable.", agent_url);
                println!("  {}", e);
                if let Some(suggestion) = e.suggestion() {
                    println!();
                    println!("{}", suggestion);
                }
                println!();
            }
        }
    }

    Ok(())
}

fn print_report(agent_url: &str, port: u16, tunnels: &[Tunnel], state: &EndpointState) {
    println!();
    println!("Tunnel agent: {}", agent_url);
    println!("{}", "─".repeat(50));

    if tunnels.is_empty() {
        println!("  No active tunnels.");
    }
    for tunnel in tunnels {
        let marker = if state.url() == Some(tunnel.public_url.trim_end_matches('/')) {
            "*"
        } else {
            " "
        };
        println!(
            " {} {:<28} -> {}  ({})",
            marker, tunnel.public_url, tunnel.config.addr, tunnel.proto
        );
    }

    println!();
    match state.url() {
        Some(url) => println!("Links for port {} will use {}", port, url),
        None => println!(
            "No tunnel serves port {}; links will use http://localhost:{}",
            port, port
        ),
    }
    println!();
}
