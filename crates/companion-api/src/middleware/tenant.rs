//! Per-request tenant resolution.
//!
//! Precedence: the tenant whose mount path the request came in on, then the
//! `brand` query parameter, then the `x-brand` header, then the registry's
//! default tenant. An identifier that names no tenant is a 404; it never falls
//! through to the default.

use crate::constants::{BRAND_HEADER, BRAND_QUERY};
use crate::error::HttpAppError;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use companion_core::{AppError, Tenant, TenantRegistry};
use std::sync::Arc;

/// Where a router is mounted: under one tenant's path, or unscoped.
#[derive(Debug, Clone)]
pub struct TenantScope {
    registry: Arc<TenantRegistry>,
    mounted: Option<Arc<Tenant>>,
}

impl TenantScope {
    pub fn mounted(registry: Arc<TenantRegistry>, tenant: Arc<Tenant>) -> Self {
        Self {
            registry,
            mounted: Some(tenant),
        }
    }

    pub fn unscoped(registry: Arc<TenantRegistry>) -> Self {
        Self {
            registry,
            mounted: None,
        }
    }

    /// `Ok(None)` only when no identifier was given and the registry has no default.
    pub fn resolve(&self, headers: &HeaderMap, uri: &Uri) -> Result<Option<Arc<Tenant>>, AppError> {
        if let Some(tenant) = &self.mounted {
            return Ok(Some(Arc::clone(tenant)));
        }

        let identifier = brand_query(uri).or_else(|| {
            headers
                .get(BRAND_HEADER)
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        });

        match identifier {
            Some(identifier) => self
                .registry
                .resolve(&identifier)
                .map(Some)
                .ok_or(AppError::TenantNotFound(identifier)),
            None => Ok(self.registry.default_tenant()),
        }
    }
}

fn brand_query(uri: &Uri) -> Option<String> {
    uri.query().and_then(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(name, value)| name == BRAND_QUERY && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    })
}

pub async fn resolve_tenant(
    State(scope): State<TenantScope>,
    mut request: Request,
    next: Next,
) -> Response {
    match scope.resolve(request.headers(), request.uri()) {
        Ok(Some(tenant)) => {
            request.extensions_mut().insert(ResolvedTenant(tenant));
        }
        Ok(None) => {}
        Err(e) => return HttpAppError(e).into_response(),
    }

    next.run(request).await
}

/// Tenant resolved for the current request.
#[derive(Debug, Clone)]
pub struct ResolvedTenant(pub Arc<Tenant>);

impl<S> FromRequestParts<S> for ResolvedTenant
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ResolvedTenant>()
            .cloned()
            .ok_or(HttpAppError(AppError::TenantUnresolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use companion_core::{MapTenantSource, TenantDefaults};

    fn registry() -> Arc<TenantRegistry> {
        Arc::new(
            TenantRegistry::register("acme,beta", &MapTenantSource::new(), &TenantDefaults::default())
                .unwrap(),
        )
    }

    fn resolved_id(scope: &TenantScope, headers: &HeaderMap, uri: &str) -> Option<String> {
        scope
            .resolve(headers, &uri.parse().unwrap())
            .unwrap()
            .map(|t| t.id.clone())
    }

    #[test]
    fn test_query_wins_over_header_and_default() {
        let scope = TenantScope::unscoped(registry());
        let mut headers = HeaderMap::new();
        headers.insert(BRAND_HEADER, HeaderValue::from_static("acme"));

        assert_eq!(resolved_id(&scope, &headers, "/api?brand=Beta").as_deref(), Some("beta"));
        assert_eq!(resolved_id(&scope, &headers, "/api").as_deref(), Some("acme"));
        assert_eq!(resolved_id(&scope, &HeaderMap::new(), "/api").as_deref(), Some("acme"));
    }

    #[test]
    fn test_unknown_identifier_is_not_found() {
        let scope = TenantScope::unscoped(registry());
        let err = scope
            .resolve(&HeaderMap::new(), &"/api?brand=nope".parse().unwrap())
            .unwrap_err();
        assert!(matches!(err, AppError::TenantNotFound(ref id) if id == "nope"));
    }

    #[test]
    fn test_mount_path_wins() {
        let registry = registry();
        let beta = registry.resolve("beta").unwrap();
        let scope = TenantScope::mounted(registry, beta);
        assert_eq!(
            resolved_id(&scope, &HeaderMap::new(), "/beta/api?brand=acme").as_deref(),
            Some("beta")
        );
    }
}
