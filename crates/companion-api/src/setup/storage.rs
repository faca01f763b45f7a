//! Storage client setup

use companion_core::{Config, TenantRegistry};
use companion_storage::{S3StorageProvider, StorageProvider};
use std::sync::Arc;

/// S3 clients for every registered tenant. Explicit-credential tenants get a
/// dedicated client now; the shared default-chain client is created on first use.
pub fn setup_storage(config: &Config, registry: &TenantRegistry) -> Arc<dyn StorageProvider> {
    let provider = S3StorageProvider::new(registry.all(), config.aws_region.clone());

    for tenant in registry.all() {
        if !tenant.storage.has_bucket() {
            tracing::warn!(
                tenant_id = %tenant.id,
                "No S3 bucket configured; upload routes will answer 400 for this brand"
            );
        }
    }

    Arc::new(provider)
}
