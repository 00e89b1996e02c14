//! Category listing

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::client::{ApiClient, CategoryInfo};
use crate::output::{color_status, print_table, print_warning, OutputFormat};

#[derive(Tabled, Serialize)]
struct CategoryRow {
    #[tabled(rename = "Category")]
    key: String,
    #[tabled(rename = "Dataset")]
    dataset: String,
}

/// List the categories the server can stream
pub async fn list_categories(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let categories: Vec<CategoryInfo> = client.get("api/v1/categories").await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&categories)?);
        }
        OutputFormat::Table => {
            let rows: Vec<CategoryRow> = categories
                .iter()
                .map(|c| CategoryRow {
                    key: c.key.clone(),
                    dataset: color_status(if c.available { "available" } else { "missing" }),
                })
                .collect();
            print_table(&rows, format);

            if categories.iter().any(|c| !c.available) {
                print_warning("Sessions for missing datasets will fail");
            }
        }
    }

    Ok(())
}
