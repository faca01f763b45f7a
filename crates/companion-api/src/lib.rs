//! Companion API Library
//!
//! HTTP surface of the upload gateway: tenant resolution, authentication
//! gates, the upload broker and application setup.

mod api_doc;
pub mod constants;
mod handlers;
pub mod middleware;
pub mod services;
pub mod setup;

// Public modules
pub mod auth;
pub mod error;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use services::upload::UploadBroker;
pub use setup::proxy::ProviderProxy;
