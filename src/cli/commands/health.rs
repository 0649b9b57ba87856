use crate::cli::client::ApiClient;
use crate::cli::utils::{field, output_success};
use crate::cli::OutputFormat;

pub async fn handle(client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let health = client.get("/health", &[]).await?;
    let message = format!(
        "Server is {} (database {}, EAN lookup {})",
        field(&health, "status"),
        field(&health, "database"),
        field(&health, "ean_lookup")
    );
    output_success(&output_format, &message, Some(health))
}
