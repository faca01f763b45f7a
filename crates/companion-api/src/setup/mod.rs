//! Application setup and initialization
//!
//! Boot order: configuration check, telemetry, tenant registry, storage
//! clients, shared state, routes.

pub mod proxy;
pub mod routes;
pub mod server;
pub mod storage;

use crate::auth::AuthGate;
use crate::constants::AUTH_TIMEOUT;
use crate::services::upload::UploadBroker;
use crate::state::AppState;
use anyhow::{Context, Result};
use companion_core::{Config, EnvTenantSource, TenantRegistry};
use companion_storage::StorageProvider;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    companion_infra::init_telemetry(config.log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment,
        require_auth = config.require_auth,
        "Configuration loaded and validated successfully"
    );

    let registry = Arc::new(
        TenantRegistry::register(&config.brands, &EnvTenantSource, &config.tenant_defaults())
            .context("Failed to register brands")?,
    );
    tracing::info!(brands = registry.len(), "Tenant registry ready");

    let storage = storage::setup_storage(&config, &registry);
    let state = build_state(&config, registry, storage)?;
    let router = routes::setup_routes(&config, state.clone(), None)?;

    Ok((state, router))
}

/// Assemble the shared state from an already built registry and storage provider.
pub fn build_state(
    config: &Config,
    registry: Arc<TenantRegistry>,
    storage: Arc<dyn StorageProvider>,
) -> Result<Arc<AppState>> {
    let auth = AuthGate::new(AUTH_TIMEOUT).context("Failed to build auth HTTP client")?;

    Ok(Arc::new(AppState {
        registry,
        broker: UploadBroker::new(storage),
        auth,
        require_auth: config.require_auth,
    }))
}
