//! Where per-tenant configuration blobs come from.

use std::collections::HashMap;

/// Lookup of a tenant's raw JSON configuration blob by its upper-snake key.
pub trait TenantConfigSource {
    fn tenant_blob(&self, key: &str) -> Option<String>;
}

/// Reads blobs from process environment variables (`MY_BRAND='{...}'`).
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvTenantSource;

impl TenantConfigSource for EnvTenantSource {
    fn tenant_blob(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

/// In-memory source, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MapTenantSource {
    blobs: HashMap<String, String>,
}

impl MapTenantSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, blob: impl Into<String>) -> Self {
        self.blobs.insert(key.into(), blob.into());
        self
    }
}

impl TenantConfigSource for MapTenantSource {
    fn tenant_blob(&self, key: &str) -> Option<String> {
        self.blobs.get(key).cloned()
    }
}
