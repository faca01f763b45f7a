use super::builder::{build_tenant, TenantDefaults};
use super::slug::{normalize_slug, tenant_config_key};
use super::source::TenantConfigSource;
use crate::models::Tenant;
use crate::AppError;
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable, insertion-ordered set of tenants built once at boot.
///
/// The first slug of the de-duplicated configured list is the default tenant.
#[derive(Debug, Clone)]
pub struct TenantRegistry {
    tenants: Vec<Arc<Tenant>>,
    index: HashMap<String, usize>,
}

/// Split a comma-separated slug list, normalize each entry, drop empties and
/// duplicates while keeping first-seen order.
pub fn parse_slug_list(raw: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    raw.split(',')
        .map(normalize_slug)
        .filter(|slug| !slug.is_empty())
        .filter(|slug| seen.insert(slug.clone()))
        .collect()
}

impl TenantRegistry {
    pub fn register(
        raw_slug_list: &str,
        source: &dyn TenantConfigSource,
        defaults: &TenantDefaults,
    ) -> Result<Self, AppError> {
        let slugs = parse_slug_list(raw_slug_list);
        if slugs.is_empty() {
            return Err(AppError::Configuration(
                "No brands configured. Set COMPANION_BRANDS.".to_string(),
            ));
        }

        let mut tenants = Vec::with_capacity(slugs.len());
        for slug in &slugs {
            let blob = source.tenant_blob(&tenant_config_key(slug));
            let tenant = build_tenant(slug, blob.as_deref(), defaults)?;
            tracing::info!(
                tenant_id = %tenant.id,
                auth_enabled = tenant.auth_enabled(),
                providers = tenant.providers.len(),
                "Registered tenant"
            );
            tenants.push(tenant);
        }

        Self::from_tenants(tenants)
    }

    /// Build a registry from already constructed tenants. Later duplicates of an
    /// id are dropped.
    pub fn from_tenants(tenants: Vec<Tenant>) -> Result<Self, AppError> {
        let mut ordered = Vec::with_capacity(tenants.len());
        let mut index = HashMap::with_capacity(tenants.len());

        for tenant in tenants {
            if index.contains_key(&tenant.id) {
                continue;
            }
            index.insert(tenant.id.clone(), ordered.len());
            ordered.push(Arc::new(tenant));
        }

        if ordered.is_empty() {
            return Err(AppError::Configuration(
                "Tenant registry cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            tenants: ordered,
            index,
        })
    }

    /// Exact lookup on the normalized identifier.
    pub fn resolve(&self, identifier: &str) -> Option<Arc<Tenant>> {
        let slug = normalize_slug(identifier);
        if slug.is_empty() {
            return None;
        }
        self.index.get(&slug).map(|&i| Arc::clone(&self.tenants[i]))
    }

    pub fn all(&self) -> &[Arc<Tenant>] {
        &self.tenants
    }

    pub fn default_tenant(&self) -> Option<Arc<Tenant>> {
        self.tenants.first().cloned()
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}
