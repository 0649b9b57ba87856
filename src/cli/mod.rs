pub mod client;
pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use client::ApiClient;

#[derive(Parser)]
#[command(name = "energy-admin")]
#[command(about = "Energy Admin CLI - EAN checks and pipeline overview against the Energy Admin API")]
#[command(version)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "ENERGY_ADMIN_URL",
        default_value = "http://localhost:3000",
        help = "Base URL of the API server"
    )]
    pub server: String,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Validate and look up EAN codes")]
    Ean {
        #[command(subcommand)]
        cmd: commands::ean::EanCommands,
    },

    #[command(about = "Check server health status from the /health endpoint")]
    Health,

    #[command(about = "Show the connection pipeline")]
    Pipeline(commands::pipeline::PipelineArgs),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let client = ApiClient::new(&cli.server)?;

    match cli.command {
        Commands::Ean { cmd } => commands::ean::handle(cmd, &client, output_format).await,
        Commands::Health => commands::health::handle(&client, output_format).await,
        Commands::Pipeline(args) => commands::pipeline::handle(args, &client, output_format).await,
    }
}
