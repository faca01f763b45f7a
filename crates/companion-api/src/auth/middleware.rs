//! Authentication gates for the upload routes.
//!
//! Both gates run after tenant resolution and read the [`ResolvedTenant`]
//! extension. The optional gate never fails a request; the required gate
//! answers 400 without a tenant and 401 without an accepted token.

use super::token::extract_token;
use crate::error::HttpAppError;
use crate::middleware::ResolvedTenant;
use crate::state::AppState;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use companion_core::{AppError, Identity};
use std::convert::Infallible;
use std::sync::Arc;

/// Attach the caller's identity when a token is present and accepted.
pub async fn attach_identity(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(ResolvedTenant(tenant)) = request.extensions().get::<ResolvedTenant>().cloned()
    else {
        return next.run(request).await;
    };

    if let Some(token) = extract_token(request.headers(), request.uri(), &tenant) {
        let identity = state.auth.authenticate(&token, &tenant).await;
        if !identity.is_rejected() {
            request.extensions_mut().insert(identity);
        }
    }

    next.run(request).await
}

/// Refuse the request unless the tenant's auth endpoint accepts its token.
pub async fn require_identity(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(ResolvedTenant(tenant)) = request.extensions().get::<ResolvedTenant>().cloned()
    else {
        return HttpAppError(AppError::TenantUnresolved).into_response();
    };

    let Some(token) = extract_token(request.headers(), request.uri(), &tenant) else {
        return HttpAppError(AppError::Unauthenticated("No token provided".to_string()))
            .into_response();
    };

    let identity = state.auth.authenticate(&token, &tenant).await;
    if identity.is_rejected() {
        tracing::info!(tenant_id = %tenant.id, "Rejected request with invalid token");
        return HttpAppError(AppError::Unauthenticated(
            "Invalid or expired token".to_string(),
        ))
        .into_response();
    }

    request.extensions_mut().insert(identity);
    next.run(request).await
}

/// Identity attached by a gate. Requests the optional gate let through without
/// a token carry [`Identity::Disabled`], so key derivation falls back to
/// `metadata.user` exactly as for a tenant without authentication.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentIdentity(
            parts
                .extensions
                .get::<Identity>()
                .cloned()
                .unwrap_or(Identity::Disabled),
        ))
    }
}
