//! Server health and readiness

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::client::{ApiClient, HealthResponse, ReadinessResponse};
use crate::output::{color_status, print_table, OutputFormat};

#[derive(Tabled, Serialize)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

#[derive(Serialize)]
struct HealthReport {
    health: HealthResponse,
    readiness: ReadinessResponse,
}

/// Print component health; fails if the server is unhealthy or not ready
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let (_, health): (_, HealthResponse) = client.get_with_status("healthz").await?;
    let (_, readiness): (_, ReadinessResponse) = client.get_with_status("readyz").await?;

    match format {
        OutputFormat::Json => {
            let report = HealthReport {
                health: health.clone(),
                readiness: readiness.clone(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            println!("{}", "Server Health".bold());
            println!("{}", "=".repeat(40));
            println!("Status: {}", color_status(&health.status));
            let ready = if readiness.ready { "ready" } else { "not ready" };
            match &readiness.reason {
                Some(reason) => println!("Ready:  {} ({})", color_status(ready), reason),
                None => println!("Ready:  {}", color_status(ready)),
            }
            println!();

            let mut rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, component)| ComponentRow {
                    name: name.clone(),
                    status: color_status(&component.status),
                    message: component.message.clone().unwrap_or_default(),
                })
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            print_table(&rows, format);
        }
    }

    if health.status == "unhealthy" || !readiness.ready {
        anyhow::bail!("Server is not serving sessions");
    }
    Ok(())
}
