//! Seam for the OAuth provider proxy (Google Drive, Dropbox, ...).
//!
//! The proxy engine is an external component. Given one tenant's
//! [`CompanionOptions`] it returns a router that the gateway nests under the
//! tenant's mount path, next to `/api`.

use axum::Router;
use companion_core::{CompanionOptions, Tenant};

pub trait ProviderProxy: Send + Sync {
    /// Routes for one tenant. They must not claim paths under `/api`.
    fn router(&self, tenant: &Tenant, options: CompanionOptions) -> Router;
}
