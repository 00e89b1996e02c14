//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format (one document per line when streaming)
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "ready" | "available" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" | "not ready" | "missing" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Label for display; `-` when the stream produced no prediction
pub fn format_label(label: Option<i64>) -> String {
    match label {
        Some(label) => label.to_string(),
        None => "-".to_string(),
    }
}
