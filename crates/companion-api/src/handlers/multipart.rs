//! Multipart upload handlers. The object key travels in the `key` query
//! parameter on every call after creation.

use crate::auth::CurrentIdentity;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson, ValidatedQuery};
use crate::middleware::ResolvedTenant;
use crate::services::upload::{
    metadata_bag, CompleteMultipartRequest, CreateMultipartRequest, KeyQuery, MultipartCompleted,
    MultipartCreated, PartDescriptor, SignedPart,
};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Start a multipart upload
#[utoipa::path(
    post,
    path = "/{brand}/api/uppy/s3/multipart",
    tag = "uploads",
    params(("brand" = String, Path, description = "Tenant slug")),
    request_body = CreateMultipartRequest,
    responses(
        (status = 200, description = "Multipart upload created", body = MultipartCreated),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
pub async fn create_multipart(
    State(state): State<Arc<AppState>>,
    ResolvedTenant(tenant): ResolvedTenant,
    CurrentIdentity(identity): CurrentIdentity,
    ValidatedJson(request): ValidatedJson<CreateMultipartRequest>,
) -> Result<Json<MultipartCreated>, HttpAppError> {
    let mut metadata = metadata_bag(request.metadata);
    let created = state
        .broker
        .create_multipart(
            &tenant,
            request.filename.as_ref().and_then(Value::as_str),
            request.file_type.as_ref().and_then(Value::as_str),
            &identity,
            metadata.as_mut(),
        )
        .await?;
    Ok(Json(created))
}

/// Presign the upload of one part
#[utoipa::path(
    get,
    path = "/{brand}/api/uppy/s3/multipart/{upload_id}/{part_number}",
    tag = "uploads",
    params(
        ("brand" = String, Path, description = "Tenant slug"),
        ("upload_id" = String, Path, description = "Multipart upload id"),
        ("part_number" = String, Path, description = "Part number, 1 to 10000"),
        ("key" = String, Query, description = "Object key returned at creation")
    ),
    responses(
        (status = 200, description = "Presigned part URL", body = SignedPart),
        (status = 400, description = "Invalid part number or missing key", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
pub async fn sign_part(
    State(state): State<Arc<AppState>>,
    ResolvedTenant(tenant): ResolvedTenant,
    Path((upload_id, part_number)): Path<(String, String)>,
    ValidatedQuery(query): ValidatedQuery<KeyQuery>,
) -> Result<Json<SignedPart>, HttpAppError> {
    let signed = state
        .broker
        .sign_part(&tenant, &upload_id, &part_number, query.key.as_deref())
        .await?;
    Ok(Json(signed))
}

/// List the parts uploaded so far, for resuming
#[utoipa::path(
    get,
    path = "/{brand}/api/uppy/s3/multipart/{upload_id}",
    tag = "uploads",
    params(
        ("brand" = String, Path, description = "Tenant slug"),
        ("upload_id" = String, Path, description = "Multipart upload id"),
        ("key" = String, Query, description = "Object key returned at creation")
    ),
    responses(
        (status = 200, description = "Parts ordered by part number", body = [PartDescriptor]),
        (status = 400, description = "Missing key", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
pub async fn list_parts(
    State(state): State<Arc<AppState>>,
    ResolvedTenant(tenant): ResolvedTenant,
    Path(upload_id): Path<String>,
    ValidatedQuery(query): ValidatedQuery<KeyQuery>,
) -> Result<Json<Vec<PartDescriptor>>, HttpAppError> {
    let parts = state
        .broker
        .list_parts(&tenant, &upload_id, query.key.as_deref())
        .await?;
    Ok(Json(parts))
}

/// Complete a multipart upload
#[utoipa::path(
    post,
    path = "/{brand}/api/uppy/s3/multipart/{upload_id}/complete",
    tag = "uploads",
    params(
        ("brand" = String, Path, description = "Tenant slug"),
        ("upload_id" = String, Path, description = "Multipart upload id"),
        ("key" = String, Query, description = "Object key returned at creation")
    ),
    request_body = CompleteMultipartRequest,
    responses(
        (status = 200, description = "Object assembled", body = MultipartCompleted),
        (status = 400, description = "Invalid parts or missing key", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
pub async fn complete_multipart(
    State(state): State<Arc<AppState>>,
    ResolvedTenant(tenant): ResolvedTenant,
    Path(upload_id): Path<String>,
    ValidatedQuery(query): ValidatedQuery<KeyQuery>,
    ValidatedJson(request): ValidatedJson<CompleteMultipartRequest>,
) -> Result<Json<MultipartCompleted>, HttpAppError> {
    let completed = state
        .broker
        .complete_multipart(&tenant, &upload_id, query.key.as_deref(), request.parts.as_ref())
        .await?;
    Ok(Json(completed))
}

/// Abort a multipart upload
#[utoipa::path(
    delete,
    path = "/{brand}/api/uppy/s3/multipart/{upload_id}",
    tag = "uploads",
    params(
        ("brand" = String, Path, description = "Tenant slug"),
        ("upload_id" = String, Path, description = "Multipart upload id"),
        ("key" = String, Query, description = "Object key returned at creation")
    ),
    responses(
        (status = 200, description = "Upload aborted"),
        (status = 400, description = "Missing key", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
pub async fn abort_multipart(
    State(state): State<Arc<AppState>>,
    ResolvedTenant(tenant): ResolvedTenant,
    Path(upload_id): Path<String>,
    ValidatedQuery(query): ValidatedQuery<KeyQuery>,
) -> Result<Json<Value>, HttpAppError> {
    state
        .broker
        .abort_multipart(&tenant, &upload_id, query.key.as_deref())
        .await?;
    Ok(Json(json!({})))
}
