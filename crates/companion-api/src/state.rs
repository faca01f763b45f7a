//! Application state shared by every handler.

use crate::auth::AuthGate;
use crate::services::upload::UploadBroker;
use companion_core::TenantRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Immutable after boot.
    pub registry: Arc<TenantRegistry>,
    pub broker: UploadBroker,
    pub auth: AuthGate,
    /// Upload routes use the required auth gate instead of the optional one.
    pub require_auth: bool,
}
