//! Server configuration

use anyhow::{Context, Result};
use canids_lib::dataset::{DatasetCatalog, DEFAULT_DATASETS, DEFAULT_TIMESTAMP_COLUMN};
use canids_lib::session::{
    SessionConfig, DEFAULT_BATCHES_PER_INTERVAL, DEFAULT_ROWS_PER_BATCH, DEFAULT_TOTAL_INTERVALS,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file read when `CANIDS_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "canids.toml";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Trained ONNX classifier, loaded once at startup
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Input width the classifier was trained on. When set, the model's input
    /// is pinned to `[rows_per_batch, feature_count]`.
    #[serde(default)]
    pub feature_count: Option<usize>,

    /// Holds `templates/` and `static/`
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,

    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: String,

    /// Category key to CSV path. A list rather than a table so the keys keep
    /// their case (`DoS`, `Attack-Free`).
    #[serde(default = "default_datasets")]
    pub datasets: Vec<DatasetEntry>,

    #[serde(default)]
    pub stream: StreamSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatasetEntry {
    pub key: String,
    pub path: PathBuf,
}

/// Pacing of a stream session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamSettings {
    #[serde(default = "default_rows_per_batch")]
    pub rows_per_batch: usize,

    #[serde(default = "default_batches_per_interval")]
    pub batches_per_interval: usize,

    #[serde(default = "default_interval_delay_ms")]
    pub interval_delay_ms: u64,

    #[serde(default = "default_total_intervals")]
    pub total_intervals: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            rows_per_batch: default_rows_per_batch(),
            batches_per_interval: default_batches_per_interval(),
            interval_delay_ms: default_interval_delay_ms(),
            total_intervals: default_total_intervals(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/svm_model.onnx")
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}

fn default_timestamp_column() -> String {
    DEFAULT_TIMESTAMP_COLUMN.to_string()
}

fn default_datasets() -> Vec<DatasetEntry> {
    DEFAULT_DATASETS
        .iter()
        .map(|(key, path)| DatasetEntry {
            key: key.to_string(),
            path: PathBuf::from(path),
        })
        .collect()
}

fn default_rows_per_batch() -> usize {
    DEFAULT_ROWS_PER_BATCH
}

fn default_batches_per_interval() -> usize {
    DEFAULT_BATCHES_PER_INTERVAL
}

fn default_interval_delay_ms() -> u64 {
    5000
}

fn default_total_intervals() -> usize {
    DEFAULT_TOTAL_INTERVALS
}

impl ServerConfig {
    /// Load from the TOML file named by `CANIDS_CONFIG` (or `canids.toml`),
    /// overridden by `CANIDS_*` environment variables.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os("CANIDS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    /// Same as [`ServerConfig::load`] with an explicit file. A missing file is
    /// not an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("CANIDS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

        let parsed: ServerConfig = config
            .try_deserialize()
            .context("Invalid server configuration")?;
        parsed.session_config()?;
        Ok(parsed)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Validated pacing for the session controller
    pub fn session_config(&self) -> Result<SessionConfig> {
        let session = SessionConfig {
            rows_per_batch: self.stream.rows_per_batch,
            batches_per_interval: self.stream.batches_per_interval,
            interval_delay: Duration::from_millis(self.stream.interval_delay_ms),
            total_intervals: self.stream.total_intervals,
        };
        session.validate()?;
        Ok(session)
    }

    pub fn catalog(&self) -> DatasetCatalog {
        self.datasets
            .iter()
            .map(|entry| (entry.key.clone(), entry.path.clone()))
            .collect()
    }

    /// Pinned classifier input shape, if the width is configured
    pub fn model_input_shape(&self) -> Option<(usize, usize)> {
        self.feature_count
            .map(|width| (self.stream.rows_per_batch, width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, TempDir};

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ServerConfig::load_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.port, 8000);
        assert_eq!(config.listen_addr(), "0.0.0.0:8000");
        assert_eq!(config.model_path, PathBuf::from("models/svm_model.onnx"));
        assert_eq!(config.timestamp_column, "Timestamp");
        assert_eq!(config.feature_count, None);
        assert_eq!(config.assets_dir, PathBuf::from("assets"));
        assert_eq!(config.stream, StreamSettings::default());

        let session = config.session_config().unwrap();
        assert_eq!(session.rows_per_batch, 15);
        assert_eq!(session.batches_per_interval, 20);
        assert_eq!(session.interval_delay, Duration::from_secs(5));
        assert_eq!(session.total_intervals, 12);
    }

    #[test]
    fn test_default_catalog_has_can_categories() {
        let dir = TempDir::new().unwrap();
        let config = ServerConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        let catalog = config.catalog();

        let keys: Vec<&str> = catalog.keys().collect();
        assert_eq!(keys, vec!["Attack-Free", "DoS", "Fuzzy", "Impersonation"]);
        assert!(catalog
            .resolve("DoS")
            .unwrap()
            .starts_with("extracted_feature/CAN_attack_dataset1"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = write_toml(
            r#"
port = 9100
feature_count = 7
timestamp_column = "Time"

[stream]
rows_per_batch = 4
interval_delay_ms = 250

[[datasets]]
key = "DoS"
path = "/data/dos.csv"
"#,
        );

        let config = ServerConfig::load_from(file.path()).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.timestamp_column, "Time");
        assert_eq!(config.model_input_shape(), Some((4, 7)));
        assert_eq!(config.stream.batches_per_interval, 20);

        let session = config.session_config().unwrap();
        assert_eq!(session.interval_delay, Duration::from_millis(250));

        let catalog = config.catalog();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.resolve("DoS"), Some(Path::new("/data/dos.csv")));
        assert_eq!(catalog.resolve("dos"), None);
    }

    #[test]
    fn test_zero_rows_per_batch_is_rejected() {
        let file = write_toml("[stream]\nrows_per_batch = 0\n");
        assert!(ServerConfig::load_from(file.path()).is_err());
    }
}
