//! Application state shared across all handlers.

use std::sync::Arc;

use procfile_core::config::AppConfig;
use procfile_service::ServiceContainer;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Stores and services
    pub services: ServiceContainer,
}

impl AppState {
    /// Creates the state from loaded configuration and built services.
    pub fn new(config: AppConfig, services: ServiceContainer) -> Self {
        Self {
            config: Arc::new(config),
            services,
        }
    }
}
