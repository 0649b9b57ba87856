use clap::Subcommand;

use crate::cli::client::ApiClient;
use crate::cli::utils::{field, output_error, output_success};
use crate::cli::OutputFormat;
use crate::ean::EanCheck;

#[derive(Subcommand)]
pub enum EanCommands {
    #[command(about = "Check an EAN code locally (18 digits, 87 prefix enables lookup)")]
    Validate {
        #[arg(help = "EAN code")]
        code: String,
    },

    #[command(about = "Look up connection details for a Dutch EAN code via the server")]
    Lookup {
        #[arg(help = "EAN code")]
        code: String,
    },
}

pub async fn handle(cmd: EanCommands, client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        EanCommands::Validate { code } => {
            let check = EanCheck::of(&code);
            match &check.message {
                None => {
                    let message = if check.auto_lookup {
                        format!("{} is valid (lookup available)", check.ean)
                    } else {
                        format!("{} is valid", check.ean)
                    };
                    output_success(&output_format, &message, Some(serde_json::to_value(&check)?))
                }
                Some(message) => {
                    output_error(&output_format, message, Some("INVALID_EAN"))?;
                    std::process::exit(2);
                }
            }
        }
        EanCommands::Lookup { code } => {
            let path = format!("/api/ean/{}/lookup", code.trim());
            let details = client.get(&path, &[]).await?;
            match output_format {
                OutputFormat::Json => output_success(&output_format, "EAN found", Some(details)),
                OutputFormat::Text => {
                    println!("EAN:           {}", field(&details, "ean"));
                    println!("Address:       {}", field(&details, "address"));
                    println!("Postal code:   {}", field(&details, "postal_code"));
                    println!("City:          {}", field(&details, "city"));
                    println!("Type:          {}", field(&details, "connection_type"));
                    println!("Capacity:      {}", field(&details, "capacity"));
                    println!("Grid operator: {}", field(&details, "grid_operator"));
                    Ok(())
                }
            }
        }
    }
}
