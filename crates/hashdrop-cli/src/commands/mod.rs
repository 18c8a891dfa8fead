//! CLI command definitions and handlers.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

pub mod completions;
pub mod config;
pub mod probe;
pub mod serve;

/// Load configuration with graceful fallback to defaults.
///
/// A missing file already yields defaults; a file that fails to parse is
/// reported and ignored so the server still starts.
pub fn load_config() -> hashdrop_core::config::Config {
    match hashdrop_core::config::Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Ignoring unreadable configuration: {}", e);
            hashdrop_core::config::Config::default()
        }
    }
}

/// Hashdrop - upload a file, share a link
#[derive(Parser)]
#[command(name = "hashdrop")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand)]
pub enum Command {
    /// Start the file sharing server
    Serve(ServeArgs),
    /// Ask the tunnel agent for a public URL once
    Probe(ProbeArgs),
    /// Manage configuration
    Config(ConfigArgs),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the serve command
#[derive(Parser)]
pub struct ServeArgs {
    /// Port to listen on (default from config, 5000)
    pub port: Option<u16>,

    /// Directory for uploaded files
    #[arg(short, long)]
    pub upload_dir: Option<PathBuf>,

    /// Address to bind
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Tunnel agent API base URL
    #[arg(long, env = "HASHDROP_AGENT_URL")]
    pub agent: Option<String>,
}

/// Arguments for the probe command
#[derive(Parser)]
pub struct ProbeArgs {
    /// Local port the tunnel should forward to (default from config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Tunnel agent API base URL
    #[arg(long, env = "HASHDROP_AGENT_URL")]
    pub agent: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the config command
#[derive(Parser)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show all configuration
    Show,
    /// Show the configuration file path
    Path,
    /// Reset to defaults
    Reset,
}

/// Arguments for the completions command
#[derive(Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: ShellType,
}

/// Supported shells
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShellType {
    /// Bash
    Bash,
    /// Zsh
    Zsh,
    /// Fish
    Fish,
    /// PowerShell
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish
    Elvish,
}
