//! Shared fixtures for the server integration tests

#![allow(dead_code)]

use canids_lib::{
    classifier::Classifier,
    dataset::{BatchView, DatasetCatalog},
    health::HealthRegistry,
    models::Label,
    observability::StreamMetrics,
    session::{SessionConfig, SessionContext},
};
use canids_server::api::AppState;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Labels every row the same
pub struct ConstantClassifier(pub Label);

impl Classifier for ConstantClassifier {
    fn predict(&self, batch: BatchView<'_>) -> anyhow::Result<Vec<Label>> {
        Ok(vec![self.0; batch.rows()])
    }

    fn description(&self) -> String {
        format!("constant:{}", self.0)
    }
}

/// 12 rows of `Timestamp,id,Flag`
pub fn write_dataset(path: &Path) {
    let mut csv = String::from("Timestamp,id,Flag\n");
    for i in 0..12 {
        let flag = if i % 3 == 0 { "T" } else { "R" };
        csv.push_str(&format!("{}.0,{},{}\n", 1000 + i, i * 7, flag));
    }
    std::fs::write(path, csv).unwrap();
}

/// Two rows per batch, two batches per interval, three intervals
pub fn fast_config() -> SessionConfig {
    SessionConfig {
        rows_per_batch: 2,
        batches_per_interval: 2,
        interval_delay: Duration::from_millis(10),
        total_intervals: 3,
    }
}

/// State with "DoS" backed by a real file and "Fuzzy" pointing nowhere
pub fn app_state(root: &Path) -> Arc<AppState> {
    let dos = root.join("dos.csv");
    write_dataset(&dos);

    let catalog = DatasetCatalog::new()
        .with_entry("DoS", dos)
        .with_entry("Fuzzy", root.join("missing.csv"));

    let ctx = SessionContext::new(
        Arc::new(ConstantClassifier(1)),
        Arc::new(catalog),
        fast_config(),
    );

    Arc::new(AppState::new(
        HealthRegistry::new(),
        StreamMetrics::new(),
        Arc::new(ctx),
        root.join("assets"),
    ))
}
