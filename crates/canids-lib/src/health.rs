//! Liveness and readiness of the stream server
//!
//! Two components are tracked: the classifier, which is loaded once at
//! startup, and the dataset catalog, graded by how many files exist.

use crate::dataset::DatasetCatalog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Ordered from best to worst, so the overall status is the maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Some categories still stream
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_operational(&self) -> bool {
        *self != ComponentStatus::Unhealthy
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

impl HealthResponse {
    fn from_components(components: BTreeMap<String, ComponentHealth>) -> Self {
        let status = components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);
        Self { status, components }
    }
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub mod components {
    pub const CLASSIFIER: &str = "classifier";
    pub const DATASETS: &str = "datasets";
}

/// Shared, cloneable view of component health
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<BTreeMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components.write().await.insert(name.to_string(), health);
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Grade the catalog: all files present is healthy, some missing is
    /// degraded, none present (or no categories) is unhealthy.
    pub async fn check_catalog(&self, catalog: &DatasetCatalog) -> ComponentStatus {
        let missing = catalog.missing();
        let health = if catalog.is_empty() {
            ComponentHealth::unhealthy("No dataset categories configured")
        } else if missing.len() == catalog.len() {
            ComponentHealth::unhealthy("No dataset files found")
        } else if !missing.is_empty() {
            ComponentHealth::degraded(format!("Missing datasets: {}", missing.join(", ")))
        } else {
            ComponentHealth::healthy()
        };

        let status = health.status;
        self.update(components::DATASETS, health).await;
        status
    }

    pub async fn health(&self) -> HealthResponse {
        HealthResponse::from_components(self.components.read().await.clone())
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let reason = if !*self.ready.read().await {
            Some("Server not yet initialized")
        } else if !self.health().await.status.is_operational() {
            Some("Critical component unhealthy")
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason: reason.map(str::to_string),
        }
    }
}
