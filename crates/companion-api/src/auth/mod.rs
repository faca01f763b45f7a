//! Caller authentication against each tenant's auth endpoint.

pub mod gate;
pub mod middleware;
pub mod token;

pub use gate::AuthGate;
pub use middleware::{attach_identity, require_identity, CurrentIdentity};
pub use token::extract_token;
