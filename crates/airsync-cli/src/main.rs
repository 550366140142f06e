//! airsync CLI - Command-line interface for airsync
//!
//! Provides commands for:
//! - Probing the server's protocol versions and commands
//! - Locating the sync endpoint of a mailbox through autodiscover
//! - Inspecting and validating the configuration file

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    autodiscover::AutodiscoverCommand, config::ConfigCommand, options::OptionsCommand, Context,
};

#[derive(Debug, Parser)]
#[command(name = "airsync", version, about = "Mobile groupware sync client")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show protocol versions and commands offered by the server
    Options(OptionsCommand),
    /// Find the sync endpoint for a mailbox
    Autodiscover(AutodiscoverCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let ctx = Context::new(cli.config.as_deref(), cli.json);

    // RUST_LOG wins, then -v/-vv, then logging.level from the config file
    let filter = match cli.verbose {
        0 => ctx.load_config_or_default().logging.level,
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Options(cmd) => cmd.execute(&ctx).await,
        Commands::Autodiscover(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
    }
}
