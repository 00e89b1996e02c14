//! CAN IDS stream server
//!
//! Serves the category pages and streams live classifier predictions for
//! replayed CAN traffic over WebSocket.

use anyhow::{Context, Result};
use canids_lib::{
    classifier::{Classifier, OnnxClassifier},
    dataset::Preprocessor,
    health::{components, ComponentStatus, HealthRegistry},
    observability::{StreamMetrics, StructuredLogger},
    session::SessionContext,
};
use canids_server::{api, config::ServerConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting canids-server");

    let config = ServerConfig::load()?;
    let session_config = config.session_config()?;
    info!(
        addr = %config.listen_addr(),
        model = %config.model_path.display(),
        categories = config.datasets.len(),
        "Server configured"
    );

    let health_registry = HealthRegistry::new();

    // The classifier is loaded once and shared read-only by every session
    let onnx = OnnxClassifier::load(&config.model_path, config.model_input_shape())
        .with_context(|| format!("Failed to load classifier {}", config.model_path.display()))?;
    let onnx = Arc::new(onnx);
    info!(model = %onnx.model_path().display(), "Classifier loaded");
    let classifier: Arc<dyn Classifier> = onnx.clone();
    health_registry.register(components::CLASSIFIER).await;

    let catalog = config.catalog();
    match health_registry.check_catalog(&catalog).await {
        ComponentStatus::Healthy => {}
        status => warn!(
            status = ?status,
            missing = ?catalog.missing(),
            "Some dataset files are missing"
        ),
    }

    let metrics = StreamMetrics::new();
    metrics.set_model_info(&classifier.description());

    let logger = StructuredLogger::new(config.listen_addr());
    logger.log_startup(SERVER_VERSION, &classifier.description(), catalog.len());

    let session_ctx = SessionContext::new(classifier, Arc::new(catalog), session_config)
        .with_preprocessor(Preprocessor::new(config.timestamp_column.clone()))
        .with_logger(logger.clone());

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics,
        Arc::new(session_ctx),
        config.assets_dir.clone(),
    ));

    let listener = tokio::net::TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr()))?;

    // Mark server as ready after initialization
    health_registry.set_ready(true).await;

    let shutdown_logger = logger.clone();
    api::serve(listener, app_state, async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        shutdown_logger.log_shutdown("SIGINT received");
    })
    .await?;

    let stats = onnx.stats();
    info!(
        inferences = stats.total_inferences,
        slow_inferences = stats.slow_inferences,
        "Shut down"
    );
    Ok(())
}
