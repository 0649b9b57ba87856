use clap::Args;
use serde_json::Value;

use crate::cli::client::ApiClient;
use crate::cli::utils::{field, output_success, print_table};
use crate::cli::OutputFormat;

#[derive(Args)]
pub struct PipelineArgs {
    #[arg(long, short, help = "Search address, city, organization or EAN")]
    pub q: Option<String>,

    #[arg(long, help = "Status tab (all, NEW, IN_PROGRESS, OFFER_SENT, OFFER_ACCEPTED, COMPLETED)")]
    pub tab: Option<String>,

    #[arg(long, default_value = "list", help = "list or kanban")]
    pub view: String,

    #[arg(long, help = "Include marked connections")]
    pub include_marked: bool,
}

fn connection_row(connection: &Value) -> Vec<String> {
    vec![
        field(connection, "status").to_string(),
        field(connection, "connection_type").to_string(),
        field(connection, "address").to_string(),
        field(connection, "city").to_string(),
        field(connection, "ean").to_string(),
        field(connection, "organization_name").to_string(),
    ]
}

const HEADERS: [&str; 6] = ["STATUS", "TYPE", "ADDRESS", "CITY", "EAN", "ORGANIZATION"];

pub async fn handle(args: PipelineArgs, client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut query = vec![("view", args.view.clone())];
    if let Some(q) = args.q {
        query.push(("q", q));
    }
    if let Some(tab) = args.tab {
        query.push(("tab", tab));
    }
    if args.include_marked {
        query.push(("include_marked", "true".to_string()));
    }

    let page = client.get("/api/connections", &query).await?;
    if let OutputFormat::Json = output_format {
        return output_success(&output_format, "Pipeline loaded", Some(page));
    }

    if let Some(columns) = page.pointer("/counts/columns").and_then(Value::as_array) {
        let summary: Vec<String> = columns
            .iter()
            .map(|c| format!("{} {}", field(c, "status"), c.get("count").and_then(Value::as_u64).unwrap_or(0)))
            .collect();
        println!("{}", summary.join(" | "));
    }

    match page.get("view").and_then(Value::as_str) {
        Some("kanban") => {
            let columns = page.pointer("/board/columns").and_then(Value::as_array).cloned().unwrap_or_default();
            for column in columns {
                let items = column.get("items").and_then(Value::as_array).cloned().unwrap_or_default();
                println!("\n{} ({})", field(&column, "status"), items.len());
                let rows: Vec<Vec<String>> = items.iter().map(connection_row).collect();
                if !rows.is_empty() {
                    print_table(&HEADERS, &rows);
                }
            }
        }
        _ => {
            let items = page.get("items").and_then(Value::as_array).cloned().unwrap_or_default();
            println!();
            if items.is_empty() {
                println!("No connections found");
            } else {
                let rows: Vec<Vec<String>> = items.iter().map(connection_row).collect();
                print_table(&HEADERS, &rows);
            }
        }
    }
    Ok(())
}
