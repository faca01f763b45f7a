//! Tenant registry: normalization, per-tenant configuration and lookup.

mod builder;
mod registry;
mod slug;
mod source;

pub use builder::{build_tenant, TenantDefaults};
pub use registry::{parse_slug_list, TenantRegistry};
pub use slug::{normalize_slug, tenant_config_key};
pub use source::{EnvTenantSource, MapTenantSource, TenantConfigSource};
