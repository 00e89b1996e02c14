//! CAN IDS stream CLI
//!
//! Terminal client for the prediction stream server: streams a category's
//! live predictions, lists categories and checks server health.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{categories, health, stream};

/// CAN IDS stream CLI
#[derive(Parser)]
#[command(name = "canids")]
#[command(author, version, about = "CLI for the CAN IDS prediction stream", long_about = None)]
pub struct Cli {
    /// Server URL (can also be set via CANIDS_URL env var)
    #[arg(long, env = "CANIDS_URL", default_value = "http://127.0.0.1:8000")]
    pub url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stream live predictions for an attack category
    Stream {
        /// Category key (e.g. DoS, Fuzzy, Impersonation, Attack-Free)
        attack: String,
    },

    /// List the categories the server can stream
    Categories,

    /// Show server health and readiness
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let client = client::ApiClient::new(&cli.url)?;

    let result = match &cli.command {
        Commands::Stream { attack } => stream::stream_attack(&client, attack, cli.format).await,
        Commands::Categories => categories::list_categories(&client, cli.format).await,
        Commands::Health => health::show_health(&client, cli.format).await,
    };

    if let Err(e) = &result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
