pub mod identity;
pub mod tenant;

pub use identity::{AuthUser, Identity};
pub use tenant::{
    AuthEndpoint, CorsOrigin, Protocol, Provider, ProviderCredentials, ServerSettings, StorageCredentials,
    StorageSettings, Tenant,
};
