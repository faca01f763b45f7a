//! OpenAPI documentation, served at `/api/openapi.json`.
//!
//! Tenant-scoped paths are documented under `/{brand}/api`. The same routes are
//! also served unscoped under `/api`, resolving the tenant by the `brand` query
//! parameter, the `x-brand` header or the default tenant.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use crate::services::upload;
use companion_core::models;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Companion Gateway API",
        version = "0.1.0",
        description = "Multi-tenant broker for direct-to-S3 uploads. Signs single PUT uploads and the multipart protocol on behalf of each brand."
    ),
    paths(
        handlers::health::healthz,
        handlers::brands::list_brands,
        handlers::sign_s3::sign_s3_query,
        handlers::sign_s3::sign_s3_body,
        handlers::multipart::create_multipart,
        handlers::multipart::sign_part,
        handlers::multipart::list_parts,
        handlers::multipart::complete_multipart,
        handlers::multipart::abort_multipart,
    ),
    components(schemas(
        error::ErrorResponse,
        handlers::health::HealthResponse,
        handlers::brands::BrandSummary,
        handlers::brands::BrandsResponse,
        models::Provider,
        upload::SignS3Params,
        upload::SignedPut,
        upload::CreateMultipartRequest,
        upload::MultipartCreated,
        upload::SignedPart,
        upload::PartDescriptor,
        upload::CompleteMultipartRequest,
        upload::MultipartCompleted,
    )),
    tags(
        (name = "health", description = "Liveness"),
        (name = "brands", description = "Registered tenants"),
        (name = "uploads", description = "Presigned single and multipart uploads"),
    )
)]
pub struct ApiDoc;
