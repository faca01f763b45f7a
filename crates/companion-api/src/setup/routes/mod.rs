//! Route configuration and setup.
//!
//! Every tenant is mounted at its own path (`/{slug}`) with its own CORS
//! policy. The upload routes live under `/{slug}/api` and again under the
//! unscoped `/api`, where the tenant comes from the `brand` query parameter,
//! the `x-brand` header or the default tenant.

mod uppy;

use super::proxy::ProviderProxy;
use crate::auth::{attach_identity, require_identity};
use crate::constants::API_BASE;
use crate::handlers;
use crate::middleware::{resolve_tenant, TenantScope};
use crate::state::AppState;
use axum::{
    http::{request::Parts, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use companion_core::{companion_options, Config, Tenant};
use companion_infra::request_id_middleware;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

const CORS_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// Setup all application routes
pub fn setup_routes(
    config: &Config,
    state: Arc<AppState>,
    proxy: Option<Arc<dyn ProviderProxy>>,
) -> Result<Router<()>, anyhow::Error> {
    let mut app = public_routes(state.clone());

    for tenant in state.registry.all() {
        let scope = TenantScope::mounted(state.registry.clone(), Arc::clone(tenant));
        let mut tenant_router = Router::new().nest(API_BASE, upload_routes(&state, scope));

        if let Some(proxy) = &proxy {
            tenant_router = tenant_router.merge(proxy.router(tenant, companion_options(tenant)));
        }

        app = app.nest(tenant.mount_path(), tenant_router.layer(tenant_cors(tenant)));
        tracing::info!(tenant_id = %tenant.id, path = %tenant.mount_path(), "Mounted tenant routes");
    }

    let unscoped = upload_routes(&state, TenantScope::unscoped(state.registry.clone()))
        .layer(setup_cors(config));

    let app = app
        .nest(API_BASE, unscoped)
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware));

    Ok(app)
}

fn public_routes(state: Arc<AppState>) -> Router<()> {
    Router::new()
        .route("/healthz", get(handlers::health::healthz))
        .route("/api/brands", get(handlers::brands::list_brands))
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
        .with_state(state)
}

/// Upload routes behind tenant resolution and the configured auth gate.
fn upload_routes(state: &Arc<AppState>, scope: TenantScope) -> Router<()> {
    let routes = uppy::routes();

    // Layers run outermost first: tenant resolution, then the auth gate.
    let routes = if state.require_auth {
        routes.layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_identity,
        ))
    } else {
        routes.layer(axum::middleware::from_fn_with_state(
            state.clone(),
            attach_identity,
        ))
    };

    routes
        .layer(axum::middleware::from_fn_with_state(scope, resolve_tenant))
        .with_state(state.clone())
}

fn tenant_cors(tenant: &Arc<Tenant>) -> CorsLayer {
    let tenant = Arc::clone(tenant);
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .map(|origin| tenant.allows_origin(origin))
                    .unwrap_or(false)
            },
        ))
        .allow_methods(CORS_METHODS)
        .allow_headers(Any)
}

fn setup_cors(config: &Config) -> CorsLayer {
    if config.cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(CORS_METHODS)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(CORS_METHODS)
            .allow_headers(Any)
    }
}
