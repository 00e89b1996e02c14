//! Live prediction stream for one attack category

use anyhow::{Context, Result};
use chrono::Local;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::client::{ApiClient, ServerMessage};
use crate::output::{format_label, print_info, print_success, print_table, OutputFormat};

/// Row for the interval summary table
#[derive(Tabled, Serialize)]
struct IntervalRow {
    #[tabled(rename = "Interval")]
    interval: usize,
    #[tabled(rename = "Prediction")]
    prediction: i64,
    #[tabled(rename = "Received")]
    received_at: String,
}

/// What the session has produced so far
#[derive(Debug, Default)]
struct StreamProgress {
    intervals: Vec<(i64, String)>,
    verdict: Option<Option<i64>>,
}

impl StreamProgress {
    /// Record one message; true once the final verdict has arrived.
    /// An error message ends the session with that error.
    fn record(&mut self, message: &ServerMessage, received_at: String) -> Result<bool> {
        match message {
            ServerMessage::Prediction {
                prediction,
                is_final: false,
            } => {
                let label = prediction.context("Interval prediction without a label")?;
                self.intervals.push((label, received_at));
                Ok(false)
            }
            ServerMessage::Prediction {
                prediction,
                is_final: true,
            } => {
                self.verdict = Some(*prediction);
                Ok(true)
            }
            ServerMessage::Error { error } => anyhow::bail!("Server error: {}", error),
        }
    }

    fn rows(&self) -> Vec<IntervalRow> {
        self.intervals
            .iter()
            .enumerate()
            .map(|(i, (prediction, received_at))| IntervalRow {
                interval: i + 1,
                prediction: *prediction,
                received_at: received_at.clone(),
            })
            .collect()
    }
}

/// Stream a category until the final verdict
pub async fn stream_attack(client: &ApiClient, attack: &str, format: OutputFormat) -> Result<()> {
    let mut stream = client.open_stream(attack).await?;
    let mut progress = StreamProgress::default();

    if let OutputFormat::Table = format {
        print_info(&format!("Streaming predictions for {}", attack.cyan()));
    }

    while let Some(message) = stream.next_message().await? {
        let received_at = Local::now().format("%H:%M:%S").to_string();

        if let OutputFormat::Json = format {
            println!("{}", serde_json::to_string(&message)?);
        }

        let done = progress.record(&message, received_at.clone())?;

        if let OutputFormat::Table = format {
            if let ServerMessage::Prediction {
                prediction,
                is_final: false,
            } = &message
            {
                println!(
                    "{}  Interval {:>2}  prediction {}",
                    received_at.dimmed(),
                    progress.intervals.len(),
                    format_label(*prediction).bold()
                );
            }
        }

        if done {
            break;
        }
    }

    let verdict = progress
        .verdict
        .context("Server closed the stream before the final prediction")?;

    if let OutputFormat::Table = format {
        println!();
        print_table(&progress.rows(), format);
        print_success(&format!(
            "Final prediction for {}: {}",
            attack,
            format_label(verdict).bold()
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interim(label: i64) -> ServerMessage {
        ServerMessage::Prediction {
            prediction: Some(label),
            is_final: false,
        }
    }

    #[test]
    fn test_progress_collects_intervals_until_verdict() {
        let mut progress = StreamProgress::default();

        assert!(!progress.record(&interim(1), "10:00:05".into()).unwrap());
        assert!(!progress.record(&interim(0), "10:00:10".into()).unwrap());
        let done = progress
            .record(
                &ServerMessage::Prediction {
                    prediction: Some(1),
                    is_final: true,
                },
                "10:00:10".into(),
            )
            .unwrap();

        assert!(done);
        assert_eq!(progress.verdict, Some(Some(1)));

        let rows = progress.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].interval, 2);
        assert_eq!(rows[1].prediction, 0);
    }

    #[test]
    fn test_progress_empty_verdict() {
        let mut progress = StreamProgress::default();
        let done = progress
            .record(
                &ServerMessage::Prediction {
                    prediction: None,
                    is_final: true,
                },
                "10:00:00".into(),
            )
            .unwrap();

        assert!(done);
        assert_eq!(progress.verdict, Some(None));
        assert!(progress.rows().is_empty());
    }

    #[test]
    fn test_progress_fails_on_server_error() {
        let mut progress = StreamProgress::default();
        let err = progress
            .record(
                &ServerMessage::Error {
                    error: "Invalid attack type".into(),
                },
                "10:00:00".into(),
            )
            .unwrap_err();

        assert!(err.to_string().contains("Invalid attack type"));
    }
}
