use crate::state::AppState;
use axum::{extract::State, Json};
use companion_core::{Provider, Tenant};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BrandSummary {
    pub id: String,
    pub display_name: String,
    /// Mount path of the tenant's routes.
    pub path: String,
    pub providers_enabled: Vec<Provider>,
}

impl From<&Tenant> for BrandSummary {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id.clone(),
            display_name: tenant.display_name.clone(),
            path: tenant.mount_path().to_string(),
            providers_enabled: tenant.providers_enabled(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BrandsResponse {
    pub brands: Vec<BrandSummary>,
}

/// List registered tenants in registration order
#[utoipa::path(
    get,
    path = "/api/brands",
    tag = "brands",
    responses((status = 200, description = "Registered brands", body = BrandsResponse))
)]
pub async fn list_brands(State(state): State<Arc<AppState>>) -> Json<BrandsResponse> {
    Json(BrandsResponse {
        brands: state
            .registry
            .all()
            .iter()
            .map(|tenant| BrandSummary::from(tenant.as_ref()))
            .collect(),
    })
}
