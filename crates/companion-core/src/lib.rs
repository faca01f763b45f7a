//! Companion Core Library
//!
//! This crate provides the domain models, error types, configuration and the
//! tenant registry shared by every Companion gateway component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod options;
pub mod tenant;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    AuthEndpoint, AuthUser, CorsOrigin, Identity, Protocol, Provider, ProviderCredentials, ServerSettings,
    StorageCredentials, StorageSettings, Tenant,
};
pub use options::{companion_options, CompanionOptions};
pub use tenant::{
    build_tenant, normalize_slug, EnvTenantSource, MapTenantSource, TenantConfigSource,
    TenantDefaults, TenantRegistry,
};
